//! Level subcommand
//!
//! Builds the next coarser or finer zoom level of a tile directory.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use retile::{EnlargeOptions, Interpolation, NamingTemplate, RetileError, TileIndex, ZoomDirection};

use crate::common::{PoolArgs, report};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Zoom {
    /// Enlarge every tile into its children
    In,
    /// Combine siblings into their parent
    Out,
}

impl From<Zoom> for ZoomDirection {
    fn from(zoom: Zoom) -> Self {
        match zoom {
            Zoom::In => Self::In,
            Zoom::Out => Self::Out,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Build one zoom level up or down from a directory of tiles")]
pub struct Args {
    /// Directory holding the source tiles
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory the new level is written to
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Zoom direction
    #[arg(long, value_enum, default_value_t = Zoom::Out)]
    zoom: Zoom,

    /// Resampling algorithm (default: epx to zoom in, lanczos3 to zoom out)
    #[arg(long, value_name = "ALGORITHM")]
    interp: Option<Interpolation>,

    /// Naming template of the source tiles (osm, zxy or xyz)
    #[arg(long, value_name = "TEMPLATE", default_value_t = NamingTemplate::Osm)]
    in_template: NamingTemplate,

    /// Also recompress every source tile in place, renamed to the output template
    #[arg(long)]
    reprocess: bool,

    /// Number of levels to descend when zooming in
    #[arg(long, value_name = "D", default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=8))]
    zoom_delta: u8,

    /// Fill NODATA gaps with neighborhood means before kernel enlargement
    #[arg(long)]
    fill_neighborhood: bool,

    /// Restore the NODATA footprint after kernel enlargement
    #[arg(long)]
    mask: bool,

    #[command(flatten)]
    pool: PoolArgs,
}

pub fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let index = TileIndex::scan(&args.input, args.in_template)?;
    if index.is_empty() {
        return Err(RetileError::NoTiles(args.input).into());
    }

    let mut retiler = args
        .pool
        .retiler()
        .reprocess(args.reprocess)
        .zoom_delta(args.zoom_delta)
        .enlarge_options(EnlargeOptions {
            fill_neighborhood: args.fill_neighborhood,
            mask_output: args.mask,
        });
    if let Some(interp) = args.interp {
        retiler = retiler.interpolation(interp);
    }

    let stats = retiler.run(args.zoom.into(), &index, &args.output)?;
    report(&stats)
}
