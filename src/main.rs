mod cli;
mod merge;
mod parse;

use anyhow::Result;
use clap::Parser;
use cli::Args;
use tracing_subscriber::filter::LevelFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);
    merge::run(args)
}

/// Map the -v/-d flags onto a log level; warnings always show.
fn init_logging(args: &Args) {
    let level = if args.debug {
        LevelFilter::DEBUG
    } else if args.verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}
