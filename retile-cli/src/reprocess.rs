//! Reprocess subcommand
//!
//! Re-encodes every tile with maximum compression, renaming it when the templates differ.

use std::path::PathBuf;

use clap::Parser;
use retile::{NamingTemplate, RetileError, TileIndex};

use crate::common::{PoolArgs, report};

#[derive(Parser, Debug)]
#[command(about = "Recompress tiles in place, optionally renaming them")]
pub struct Args {
    /// Directory holding the tiles
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Current naming template of the tiles (osm, zxy or xyz)
    #[arg(long, value_name = "TEMPLATE", default_value_t = NamingTemplate::Osm)]
    in_template: NamingTemplate,

    #[command(flatten)]
    pool: PoolArgs,
}

pub fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let index = TileIndex::scan(&args.input, args.in_template)?;
    if index.is_empty() {
        return Err(RetileError::NoTiles(args.input).into());
    }
    let stats = args.pool.retiler().reprocess_all(&index)?;
    report(&stats)
}
