/// altex: base-editing sgRNA design at alternative splice sites
///
/// This is the entry point for the altex CLI.
/// It parses the subcommand and hands the remaining
/// arguments to the matching stage crate:
///
/// - run: full pipeline [classify -> design -> offtarget -> outputs]
/// - classify: splicing-event classification of exons
/// - design: splice-window extraction and sgRNA design
/// - offtarget: genome-wide exact off-target counting
/// - gtf2refflat: GTF to refFlat conversion
/// - presets: built-in base editors
///
/// Every stage is also shipped as its own binary
/// (alt-classify, alt-design, alt-offtarget) and the
/// shared constants/configuration live in 'config'.
///
/// To get help on the subcommands, you can run:
///
/// ```shell
/// altex design -- --help
/// ```
///
use clap::{Args, Parser, Subcommand};
use log::{error, info, Level};
use simple_logger::init_with_level;

use alt_classify::lib_alt_classify;
use alt_design::lib_alt_design;
use alt_offtarget::lib_alt_offtarget;
use altex::{lib, lib_gtf2refflat, presets};

#[derive(Parser)]
#[command(name = "altex")]
#[command(about = "altex: base-editing sgRNA design at alternative splice sites")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Alejandro Gonzales-Irribarren, 2025")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "run")]
    Run(StageArgs),
    #[command(name = "classify")]
    Classify(StageArgs),
    #[command(name = "design")]
    Design(StageArgs),
    #[command(name = "offtarget")]
    Offtarget(StageArgs),
    #[command(name = "gtf2refflat")]
    Gtf2Refflat(StageArgs),
    #[command(name = "presets")]
    Presets,
}

#[derive(Args)]
struct StageArgs {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => lib(args.args).map(|paths| paths.table),
        Commands::Classify(args) => lib_alt_classify(args.args),
        Commands::Design(args) => lib_alt_design(args.args),
        Commands::Offtarget(args) => lib_alt_offtarget(args.args),
        Commands::Gtf2Refflat(args) => lib_gtf2refflat(args.args),
        Commands::Presets => {
            presets().iter().for_each(|line| println!("{}", line));
            return;
        }
    };

    match result {
        Ok(output) => info!("Output written to {}", output.display()),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
