use clap::Parser;
use config::{validate, ArgCheck, CliError, FASTA_EXTENSIONS};
use std::path::PathBuf;

use crate::utils::Strategy;

#[derive(Debug, Parser)]
#[command(version, about = "Count exact genome-wide occurrences of sgRNA target sequences")]
pub struct Args {
    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "Path to genome FASTA [.fa, .fasta, .fna, .gz]"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'q',
        long = "queries",
        required = false,
        value_name = "PATH",
        help = "File with one target sequence per line ['+' delimiters allowed]"
    )]
    pub queries: Option<PathBuf>,

    #[arg(
        short = 's',
        long = "sequences",
        required = false,
        value_name = "SEQS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Target sequences delimited by comma"
    )]
    pub sequences: Vec<String>,

    #[arg(
        short = 'o',
        long = "outdir",
        required = false,
        value_name = "PATH",
        default_value = ".",
        help = "Output directory"
    )]
    pub outdir: PathBuf,

    #[arg(
        long = "strategy",
        value_enum,
        default_value_t = Strategy::Aho,
        help = "Exact matching strategy"
    )]
    pub strategy: Strategy,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,
}

impl ArgCheck for Args {
    fn check(&self) -> Result<(), CliError> {
        validate(&self.fasta, &FASTA_EXTENSIONS)?;

        match self.queries.as_ref() {
            Some(queries) if !queries.is_file() => {
                return Err(CliError::InvalidInput(format!(
                    "ERROR: {:?} is not a file",
                    queries
                )))
            }
            None if self.sequences.is_empty() => {
                return Err(CliError::InvalidInput(
                    "ERROR: provide --queries and/or --sequences".to_string(),
                ))
            }
            _ => (),
        }

        self.check_outdir()
    }

    fn get_refflat(&self) -> Option<&PathBuf> {
        None
    }

    fn get_gtf(&self) -> Option<&PathBuf> {
        None
    }

    fn get_fasta(&self) -> Option<&PathBuf> {
        Some(&self.fasta)
    }

    fn get_outdir(&self) -> &PathBuf {
        &self.outdir
    }
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}
