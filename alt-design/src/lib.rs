use anyhow::Result;
use config::ArgCheck;
use std::path::PathBuf;

pub mod cli;
pub mod core;
pub mod utils;

pub use crate::core::engine::{design_sgrna, CompiledEditor, SgrnaInfo};
pub use crate::core::window::{ExonSelection, SpliceWindow, TargetExon};
pub use crate::core::{design, editors_from_args, Design, DesignStats, DesignedGuide};

pub fn lib_alt_design(args: Vec<String>) -> Result<PathBuf> {
    let args = cli::Args::from(args);
    args.check()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()?;
    pool.install(|| crate::core::design_guides(args))
}
