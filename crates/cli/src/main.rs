//! swathflow CLI - drainage networks and topographic swaths from DEMs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use swathflow_algorithms::conditioning::NoDataPolicy;
use swathflow_algorithms::pipeline::{extract_streams, StreamExtractionParams};
use swathflow_algorithms::swath::{extract_swath, DisplayMode, SwathDisplay, SwathParams};
use swathflow_core::io::{load_dem, write_geotiff, DemSource};
use swathflow_core::Raster;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "swathflow")]
#[command(author, version, about = "Drainage networks and topographic swaths from DEMs", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a DEM (.tif, .tiff, .asc, .txt)
    Info {
        /// Input DEM
        input: PathBuf,
    },
    /// Extract a stream network
    Streams {
        /// Input DEM
        input: PathBuf,
        /// Minimum drainage area of a channel (map units squared)
        #[arg(short = 'a', long)]
        threshold_area: f64,
        /// Persistence name: writes NAME.json and NAME_streams.geojson
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// No-data policy: "auto", "none" or an expression such as "z <= 0"
        #[arg(long)]
        nodata: Option<String>,
        /// Minimum flat area for --nodata auto (map units squared)
        #[arg(long, default_value = "100000")]
        min_flat_area: f64,
        /// Resample the DEM before routing
        #[arg(long)]
        resample: bool,
        /// Target cell size when resampling (default: ceiling of native)
        #[arg(long)]
        target_cellsize: Option<f64>,
        /// Also write the stream mask as GeoTIFF
        #[arg(long)]
        mask: Option<PathBuf>,
    },
    /// Extract a swath profile along a path
    Swath {
        /// Input DEM
        input: PathBuf,
        /// Path vertices in map coordinates: "x1,y1;x2,y2;..."
        #[arg(short, long)]
        path: String,
        /// Swath width (map units)
        #[arg(short, long)]
        width: f64,
        /// Sample spacing (default: DEM cell size)
        #[arg(long)]
        spacing: Option<f64>,
        /// Centre-line smoothing distance
        #[arg(long, default_value = "0")]
        smoothing: f64,
        /// Vertical exaggeration of the plot
        #[arg(long, default_value = "10")]
        exaggeration: f64,
        /// Plot every observation
        #[arg(long)]
        scatter: bool,
        /// Plot observation density
        #[arg(long)]
        heatmap: bool,
        /// Build the plot content and include it in the output
        #[arg(long)]
        render: bool,
        /// Write the result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_dem(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading DEM...");
    let raster = load_dem(DemSource::Path(path.to_path_buf()))
        .with_context(|| format!("Failed to read DEM {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_path(s: &str) -> Result<Vec<(f64, f64)>> {
    s.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .with_context(|| format!("Expected x,y but got '{}'", pair))?;
            let x: f64 = x.trim().parse().with_context(|| format!("Invalid x in '{}'", pair))?;
            let y: f64 = y.trim().parse().with_context(|| format!("Invalid y in '{}'", pair))?;
            Ok((x, y))
        })
        .collect()
}

/// NaN becomes JSON null
fn num(v: f64) -> Value {
    if v.is_finite() {
        json!(v)
    } else {
        Value::Null
    }
}

fn display_json(display: &SwathDisplay) -> Value {
    match display {
        SwathDisplay::Envelope { rows, exaggeration } => json!({
            "mode": "envelope",
            "exaggeration": exaggeration,
            "rows": rows
                .iter()
                .map(|e| json!([num(e.distance), num(e.min), num(e.mean), num(e.max)]))
                .collect::<Vec<_>>(),
        }),
        SwathDisplay::Scatter { points, exaggeration } => json!({
            "mode": "scatter",
            "exaggeration": exaggeration,
            "points": points.iter().map(|&(d, z)| json!([d, z])).collect::<Vec<_>>(),
        }),
        SwathDisplay::Heatmap { heatmap, exaggeration } => json!({
            "mode": "heatmap",
            "exaggeration": exaggeration,
            "edges": heatmap.edges,
            "centers": heatmap.centers,
            "distances": heatmap.distances,
            "counts": heatmap
                .counts
                .rows()
                .into_iter()
                .map(|row| row.iter().map(|&c| num(c)).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        }),
    }
}

fn write_json(value: &Value, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    let text = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_dem(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Streams ──────────────────────────────────────────────────
        Commands::Streams {
            input,
            threshold_area,
            output,
            nodata,
            min_flat_area,
            resample,
            target_cellsize,
            mask,
        } => {
            let policy: NoDataPolicy = match nodata {
                Some(text) => text.parse().context("Invalid --nodata")?,
                None => NoDataPolicy::None,
            };
            let params = StreamExtractionParams {
                threshold_area,
                output,
                nodata: policy,
                min_flat_area,
                resample,
                target_cellsize,
                ..Default::default()
            };

            let pb = spinner("Extracting streams...");
            let start = Instant::now();
            let result = extract_streams(input.as_path(), &params)
                .context("Failed to extract streams")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            println!(
                "DEM: {} x {} @ {} after conditioning",
                result.dem.cols(),
                result.dem.rows(),
                result.dem.cell_size()
            );
            println!("Threshold: {} cells", result.min_area_pixels);
            println!(
                "Streams: {} segments, max Strahler order {}, {:.1} total length",
                result.streams.len(),
                result.streams.max_order(),
                result.streams.total_length()
            );
            for warning in &result.warnings {
                println!("Warning: {}", warning);
            }

            if let Some(path) = &mask {
                let pb = spinner("Writing stream mask...");
                write_geotiff(&result.stream_mask, path).context("Failed to write stream mask")?;
                pb.finish_and_clear();
                done("Stream mask", path, elapsed);
            }
            match &result.persisted {
                Some(paths) => {
                    done("Stream outputs", &paths.container, elapsed);
                    println!("Stream network saved to: {}", paths.streams.display());
                }
                None => println!("  Processing time: {:.2?}", elapsed),
            }
        }

        // ── Swath ────────────────────────────────────────────────────
        Commands::Swath {
            input,
            path,
            width,
            spacing,
            smoothing,
            exaggeration,
            scatter,
            heatmap,
            render,
            output,
        } => {
            let mode = DisplayMode::from_flags(scatter, heatmap)
                .context("Choose at most one of --scatter and --heatmap")?;
            let points = parse_path(&path)?;
            if points.len() < 2 {
                bail!("A swath path needs at least 2 points, got {}", points.len());
            }

            let dem = read_dem(&input)?;
            let params = SwathParams {
                spacing,
                smoothing,
                exaggeration,
                mode,
                render,
            };

            let pb = spinner("Sampling swath...");
            let start = Instant::now();
            let result =
                extract_swath(&dem, points, width, &params).context("Failed to extract swath")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            let valid = result.envelope.iter().filter(|e| e.is_valid()).count();
            println!(
                "Swath: {} stations ({} with data), length {:.1}",
                result.sample.station_count(),
                valid,
                result.path.length()
            );
            println!("Bends: {:?}", result.bends);

            match &output {
                Some(out) => {
                    let mut value = json!({
                        "width": width,
                        "bends": result.bends,
                        "offsets": result.sample.offsets,
                        "centerline": result
                            .centerline()
                            .iter()
                            .map(|&(x, y)| json!([x, y]))
                            .collect::<Vec<_>>(),
                        "envelope": result
                            .envelope
                            .iter()
                            .map(|e| json!([num(e.distance), num(e.min), num(e.mean), num(e.max)]))
                            .collect::<Vec<_>>(),
                    });
                    if let Some(display) = &result.display {
                        value["display"] = display_json(display);
                    }
                    write_json(&value, out)?;
                    done("Swath", out, elapsed);
                }
                None => {
                    for e in result.envelope.iter().filter(|e| e.is_valid()) {
                        println!(
                            "  {:>10.1}  min {:>9.2}  mean {:>9.2}  max {:>9.2}",
                            e.distance, e.min, e.mean, e.max
                        );
                    }
                    println!("  Processing time: {:.2?}", elapsed);
                }
            }
        }
    }

    Ok(())
}
