//! Pyramid subcommand
//!
//! Downsamples `ROOT/{max-zoom}` level by level, writing every coarser level below `ROOT`.

use std::path::PathBuf;

use clap::Parser;
use retile::{Interpolation, NamingTemplate};

use crate::common::{PoolArgs, report};

#[derive(Parser, Debug)]
#[command(about = "Downsample a zoom level repeatedly into a full pyramid")]
pub struct Args {
    /// Directory holding one subdirectory per zoom level
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Most detailed zoom level, which must already exist
    #[arg(long, value_name = "Z")]
    max_zoom: u8,

    /// Coarsest zoom level to build
    #[arg(long, value_name = "Z", default_value_t = 0)]
    min_zoom: u8,

    /// Downsampling algorithm (average, bilinear, lanczos3 or lanczos5)
    #[arg(long, value_name = "ALGORITHM", default_value_t = Interpolation::Lanczos3)]
    interp: Interpolation,

    /// Naming template of the tiles at the maximum zoom (osm, zxy or xyz)
    #[arg(long, value_name = "TEMPLATE", default_value_t = NamingTemplate::Osm)]
    in_template: NamingTemplate,

    #[command(flatten)]
    pool: PoolArgs,
}

pub fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.min_zoom > args.max_zoom {
        return Err(format!(
            "--min-zoom {} is above --max-zoom {}",
            args.min_zoom, args.max_zoom
        )
        .into());
    }

    let levels = args.pool.retiler().interpolation(args.interp).build_pyramid(
        &args.root,
        args.in_template,
        args.max_zoom,
        args.min_zoom,
    )?;

    for (stats, z) in levels.iter().zip((args.min_zoom..args.max_zoom).rev()) {
        println!("zoom {z}:");
        report(stats)?;
    }
    Ok(())
}
