use anyhow::Result;
use config::ArgCheck;
use std::path::PathBuf;

pub mod cli;
pub mod core;
pub mod utils;

pub use crate::core::{classify_gene, classify_genes, ClassifiedGene, ClassifiedTranscript, ClassifyStats};
pub use crate::utils::SpliceLabel;

pub fn lib_alt_classify(args: Vec<String>) -> Result<PathBuf> {
    let args = cli::Args::from(args);
    args.check()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()?;
    pool.install(|| crate::core::classify_exons(args))
}
