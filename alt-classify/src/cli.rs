use clap::Parser;
use config::ArgCheck;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Classify the exons of the genes of interest by splicing event")]
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
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,
}

impl ArgCheck for Args {
    fn get_refflat(&self) -> Option<&PathBuf> {
        self.refflat.as_ref()
    }

    fn get_gtf(&self) -> Option<&PathBuf> {
        self.gtf.as_ref()
    }

    fn get_fasta(&self) -> Option<&PathBuf> {
        None
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
