//! Options shared by every subcommand.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use retile::{NamingTemplate, PngStore, RetileStats, Retiler};

#[derive(Args, Debug)]
pub struct PoolArgs {
    /// Naming template of written tiles (osm, zxy or xyz)
    #[arg(long, value_name = "TEMPLATE", default_value_t = NamingTemplate::Osm)]
    pub out_template: NamingTemplate,

    /// Number of threads encoding and writing tiles
    #[arg(long, value_name = "N", default_value_t = 32)]
    pub workers: usize,

    /// Seconds to wait for outstanding writes at the end of each level
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub drain_timeout: u64,
}

impl PoolArgs {
    /// A PNG-backed retiler configured from these options.
    pub fn retiler(&self) -> Retiler<'static, PngStore> {
        Retiler::new(Arc::new(PngStore::new()))
            .output_template(self.out_template)
            .workers(self.workers)
            .drain_timeout(Duration::from_secs(self.drain_timeout))
    }
}

/// Prints the counters of one run, failing if any tile could not be written.
pub fn report(stats: &RetileStats) -> Result<(), Box<dyn std::error::Error>> {
    println!("source tiles: {}", stats.source_tiles());
    println!("unreadable tiles: {}", stats.unreadable_tiles());
    println!("skipped as empty: {}", stats.empty_skipped());
    println!("written: {}", stats.completed());
    if stats.drain_timed_out() {
        println!("still writing when the drain timeout passed");
    }
    if stats.failed() > 0 {
        return Err(format!("{} tiles failed to write", stats.failed()).into());
    }
    Ok(())
}
