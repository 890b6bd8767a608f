use anyhow::Result;
use config::ArgCheck;
use std::path::PathBuf;

pub mod cli;
pub mod core;
pub mod utils;

pub use crate::core::{count_offtargets, count_records, OfftargetCounts};
pub use crate::utils::{AhoCounter, ExactCounter, NaiveCounter, Strategy};

pub fn lib_alt_offtarget(args: Vec<String>) -> Result<PathBuf> {
    let args = cli::Args::from(args);
    args.check()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()?;
    pool.install(|| crate::core::offtarget(args))
}
