use clap::Parser;
use config::{validate, ArgCheck, CliError, GTF_EXTENSIONS, RUN_PREFIX};
use std::path::PathBuf;

use alt_offtarget::Strategy;

#[derive(Debug, Parser)]
#[command(version, about = "Design base-editing sgRNAs at alternative splice sites, end to end")]
#[group(skip)]
pub struct Args {
    #[command(flatten)]
    pub design: alt_design::cli::Args,

    #[arg(
        short = 'a',
        long = "assembly",
        value_name = "NAME",
        default_value = "hg38",
        help = "Genome assembly name, used in the custom track description"
    )]
    pub assembly: String,

    #[arg(
        long = "prefix",
        value_name = "PREFIX",
        default_value = RUN_PREFIX,
        help = "Prefix of every output file"
    )]
    pub prefix: String,

    #[arg(
        long = "strategy",
        value_enum,
        default_value_t = Strategy::Aho,
        help = "Exact matching strategy for off-target counting"
    )]
    pub strategy: Strategy,
}

impl ArgCheck for Args {
    fn check(&self) -> Result<(), CliError> {
        self.design.check()?;

        if self.prefix.trim().is_empty() || self.prefix.contains('/') {
            return Err(CliError::InvalidInput(format!(
                "ERROR: invalid output prefix '{}'",
                self.prefix
            )));
        }

        Ok(())
    }

    fn get_refflat(&self) -> Option<&PathBuf> {
        self.design.get_refflat()
    }

    fn get_gtf(&self) -> Option<&PathBuf> {
        self.design.get_gtf()
    }

    fn get_fasta(&self) -> Option<&PathBuf> {
        self.design.get_fasta()
    }

    fn get_outdir(&self) -> &PathBuf {
        self.design.get_outdir()
    }
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}

#[derive(Debug, Parser)]
#[command(about = "Convert a GTF annotation into refFlat rows")]
pub struct GtfArgs {
    #[arg(
        long = "gtf",
        required = true,
        value_name = "PATH",
        help = "Path to GTF annotation [.gtf, .gz]"
    )]
    pub gtf: PathBuf,

    #[arg(
        short = 'o',
        long = "output",
        required = true,
        value_name = "PATH",
        help = "Path to the refFlat output"
    )]
    pub output: PathBuf,
}

impl GtfArgs {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec!["gtf2refflat".to_string()];
        full_args.extend(args);

        GtfArgs::parse_from(full_args)
    }

    pub fn check(&self) -> Result<(), CliError> {
        validate(&self.gtf, &GTF_EXTENSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse_with_flattened_design_args() {
        let args = Args::from(
            [
                "--refflat",
                "genes.txt",
                "--fasta",
                "genome.fa",
                "--genes",
                "SRSF1",
                "--prefix",
                "srsf1",
                "--strategy",
                "naive",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );

        assert_eq!(args.prefix, "srsf1");
        assert_eq!(args.assembly, "hg38");
        assert_eq!(args.strategy, Strategy::Naive);
        assert_eq!(args.design.genes, vec!["SRSF1".to_string()]);
        assert_eq!(args.design.fasta, PathBuf::from("genome.fa"));
    }

    #[test]
    fn test_run_command_is_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
