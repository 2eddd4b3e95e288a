mod common;
mod level;
mod pyramid;
mod reprocess;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "retile")]
#[command(about = "NODATA-aware raster tile pyramid tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build one zoom level up or down from a directory of tiles
    Level(level::Args),
    /// Downsample a zoom level repeatedly into a full pyramid
    Pyramid(pyramid::Args),
    /// Recompress tiles in place, optionally renaming them
    Reprocess(reprocess::Args),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger from RUST_LOG environment variable
    // Example: RUST_LOG=info retile pyramid tiles --max-zoom 12
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Level(args) => level::run(args),
        Commands::Pyramid(args) => pyramid::run(args),
        Commands::Reprocess(args) => reprocess::run(args),
    }
}
