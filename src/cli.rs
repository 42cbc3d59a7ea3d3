use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Merge per-source statistics CSV files into one combined file."
)]
pub struct Args {
    /// Input statistics CSV files, one per data source
    #[arg(required = true)]
    pub csv_files: Vec<PathBuf>,

    /// Output file for the combined statistics
    #[arg(short = 'o', long = "output-file")]
    pub output_file: PathBuf,

    /// Report each file as it is parsed
    #[arg(short, long)]
    pub verbose: bool,

    /// Also report time keys that are missing sources
    #[arg(short, long)]
    pub debug: bool,
}
