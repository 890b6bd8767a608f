use clap::{self, Parser};
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use alt_design::{cli::Args, core::design_guides};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();
    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .unwrap();

    let output = design_guides(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });
    info!("Designed sgRNAs written to {}", output.display());

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
