use clap::Parser;
use config::{ArgCheck, CliError, InlineEditor, DEFAULT_HALF_WIDTH};
use std::path::PathBuf;

use crate::core::window::ExonSelection;

#[derive(Debug, Parser)]
#[command(version, about = "Design base-editing sgRNAs at the splice sites of the genes of interest")]
pub struct Args {
    #[arg(
        short = 'r',
        long = "refflat",
        required = false,
        value_name = "PATH",
        conflicts_with = "gtf",
        help = "Path to refFlat annotation [.txt, .refflat, .tsv, .gz]"
    )]
    pub refflat: Option<PathBuf>,

    #[arg(
        long = "gtf",
        required = false,
        value_name = "PATH",
        help = "Path to GTF annotation, converted to refFlat on the fly"
    )]
    pub gtf: Option<PathBuf>,

    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "Path to genome FASTA [.fa, .fasta, .fna, .gz]"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'g',
        long = "genes",
        required = false,
        value_name = "GENES",
        value_delimiter = ',',
        num_args = 1..,
        help = "Gene symbols or transcript names delimited by comma"
    )]
    pub genes: Vec<String>,

    #[arg(
        long = "gene-file",
        required = false,
        value_name = "PATH",
        help = "File with one gene symbol or transcript name per line"
    )]
    pub gene_file: Option<PathBuf>,

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
        short = 'p',
        long = "preset",
        required = false,
        value_name = "KEYS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Base editor presets delimited by comma [see `altex presets`]"
    )]
    pub preset: Vec<String>,

    #[arg(
        long = "be-file",
        required = false,
        value_name = "PATH",
        help = "Base editor file [.csv, .tsv, .txt]"
    )]
    pub be_file: Option<PathBuf>,

    #[arg(long = "be-name", value_name = "NAME", help = "Inline base editor name")]
    pub be_name: Option<String>,

    #[arg(long = "be-pam", value_name = "PAM", help = "Inline base editor PAM [IUPAC]")]
    pub be_pam: Option<String>,

    #[arg(
        long = "be-start",
        value_name = "INT",
        help = "Inline base editor editing window start [1-indexed from the PAM side]"
    )]
    pub be_start: Option<String>,

    #[arg(
        long = "be-end",
        value_name = "INT",
        help = "Inline base editor editing window end [1-indexed from the PAM side]"
    )]
    pub be_end: Option<String>,

    #[arg(long = "be-type", value_name = "TYPE", help = "Inline base editor type [cbe, abe]")]
    pub be_type: Option<String>,

    #[arg(
        short = 'w',
        long = "half-width",
        value_name = "INT",
        default_value_t = DEFAULT_HALF_WIDTH,
        help = "Half width of the splice-site windows [min 25]"
    )]
    pub half_width: u64,

    #[arg(
        short = 'e',
        long = "exons",
        value_enum,
        default_value_t = ExonSelection::All,
        help = "Exons to design guides for"
    )]
    pub exons: ExonSelection,

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
        self.validate_args()?;

        // INFO: splice offsets are fixed relative to the window center
        if self.half_width < DEFAULT_HALF_WIDTH {
            return Err(CliError::InvalidInput(format!(
                "ERROR: --half-width {} is below the minimum of {}",
                self.half_width, DEFAULT_HALF_WIDTH
            )));
        }

        Ok(())
    }

    fn get_refflat(&self) -> Option<&PathBuf> {
        self.refflat.as_ref()
    }

    fn get_gtf(&self) -> Option<&PathBuf> {
        self.gtf.as_ref()
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

    pub fn inline_editor(&self) -> InlineEditor {
        InlineEditor {
            name: self.be_name.clone(),
            pam: self.be_pam.clone(),
            window_start: self.be_start.clone(),
            window_end: self.be_end.clone(),
            editor_type: self.be_type.clone(),
        }
    }
}
