//! Fetch one world extent into a PNG.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tilemosaic::composite::CompositeData;
use tilemosaic::geom::WorldRect;
use tilemosaic::receiver::ChannelReceiver;
use tilemosaic::request::{Projection, Request};
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for `tilemosaic fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// World extent in degrees: MINX,MINY,WIDTH,HEIGHT
    #[arg(long, value_parser = parse_extent, allow_hyphen_values = true)]
    pub extent: WorldRect,

    /// Resolution in pixels per degree
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub ppd: u32,

    /// Output PNG path
    #[arg(long)]
    pub output: PathBuf,

    /// WMS GetMap endpoint (overrides config)
    #[arg(long)]
    pub url: Option<String>,

    /// WMS layer name (overrides config)
    #[arg(long)]
    pub layer: Option<String>,

    /// Bypass the disk cache
    #[arg(long)]
    pub no_cache: bool,

    /// Do not show stale placeholders while downloading
    #[arg(long)]
    pub no_fuzzy: bool,

    /// Enable debug logging, echoed to stdout
    #[arg(long)]
    pub debug: bool,
}

/// Parses `MINX,MINY,WIDTH,HEIGHT`.
fn parse_extent(value: &str) -> Result<WorldRect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in extent '{}': {}", value, e))?;

    match parts.as_slice() {
        [x, y, w, h] => Ok(WorldRect::new(*x, *y, *w, *h)),
        _ => Err(format!(
            "extent must be MINX,MINY,WIDTH,HEIGHT, got {} values",
            parts.len()
        )),
    }
}

/// Run the fetch command.
pub async fn run(args: FetchArgs) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("fetch");

    let source = runner.create_source(args.url.clone(), args.layer.clone())?;
    let service = runner.create_service(args.no_cache, args.no_fuzzy)?;
    let request = Request::new(source, args.extent, args.ppd, Projection::default())?;

    let (width, height) = CompositeData::new(Arc::clone(&request)).dimensions();
    println!("Fetching {} at {} px/deg", args.extent, args.ppd);
    println!("  Source: {}", request.source().name());
    println!("  Output: {} ({}x{} px)", args.output.display(), width, height);
    println!();

    let (receiver, mut updates) = ChannelReceiver::new();
    let handle = service.fetch(Arc::clone(&request), receiver);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let finished = loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(data) => {
                    let progress = handle.progress();
                    println!(
                        "  {:>3}/{} tiles resolved, {:>5.1}% final, {:>5.1}% placeholder",
                        progress.tiles.saturating_sub(progress.pending),
                        progress.tiles,
                        data.finished_fraction() * 100.0,
                        area_percent(&data, data.fuzzy_area().area()),
                    );
                    if data.is_finished() {
                        break data;
                    }
                }
                None => {
                    service.shutdown();
                    return Err(CliError::Cancelled);
                }
            },
            _ = &mut ctrl_c => {
                println!();
                println!("Interrupted, cancelling...");
                handle.cancel();
                service.shutdown();
                return Err(CliError::Cancelled);
            }
        }
    };

    handle.flush_cache_writes().await;
    service.shutdown();

    let failed = handle.tiles().iter().filter(|t| t.has_error()).count();
    let missing = finished.missing_area().area();
    let missing_percent = area_percent(&finished, missing);

    finished
        .into_image()
        .save(&args.output)
        .map_err(|error| CliError::FileWrite {
            path: args.output.display().to_string(),
            error,
        })?;

    info!(
        output = %args.output.display(),
        failed_tiles = failed,
        missing_area = missing,
        "Composite written"
    );
    println!();
    println!("Saved {}", args.output.display());
    if failed > 0 || missing > 0.0 {
        println!(
            "  {} tile(s) failed; {:.2} sq deg ({:.1}%) missing",
            failed, missing, missing_percent
        );
    }

    Ok(())
}

fn area_percent(data: &CompositeData, area: f64) -> f64 {
    let total = data.request().extent().area();
    if total > 0.0 {
        area / total * 100.0
    } else {
        0.0
    }
}
