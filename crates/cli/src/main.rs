//! Firefuel CLI - disturbance-driven FM40 fuel model updates

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use firefuel_algorithms::{combine_dist, convert_bs_to_dist, update_fm40, RuleTable};
use firefuel_core::{Error, RasterSource, ReadWindow, SweepMode};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "firefuel")]
#[command(author, version, about = "Update FM40 fuel models from burn-severity evidence", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Distribute tile processing over a worker pool.
    ///
    /// Sequential processing is the default; measure before assuming the
    /// pool wins on your storage.
    #[arg(short, long, global = true)]
    parallel: bool,

    /// Number of worker threads (default: all available)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Convert a burn-severity raster to a DIST raster
    Convert {
        /// Input burn-severity raster
        bs: PathBuf,
        /// Raster whose grid the output is aligned to (the FM40 raster)
        #[arg(long)]
        align_to: PathBuf,
        /// Output DIST raster
        output: PathBuf,
        /// Target year for the fuel update
        #[arg(long)]
        effective_year: i32,
        /// Calendar year of the fire (default: 4-digit year in the filename)
        #[arg(long)]
        fire_year: Option<i32>,
    },
    /// Combine DIST rasters, keeping the most impactful disturbance
    Combine {
        /// Input DIST rasters, most significant first among equal ranks
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output combined DIST raster
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Update an FM40 raster from a combined DIST raster and a ruleset
    Update {
        /// Baseline FM40 raster
        fm40: PathBuf,
        /// Combined DIST raster
        dist: PathBuf,
        /// Ruleset CSV (DIST_code, original_FM40_code, new_FM40_code)
        #[arg(short, long)]
        ruleset: PathBuf,
        /// Output updated FM40 raster
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Full pipeline: convert each year's severity raster, combine, update
    Run {
        /// Baseline FM40 raster to be updated
        #[arg(long)]
        fm40: PathBuf,
        /// Folder containing burn-severity rasters (year in each filename)
        #[arg(long)]
        bs_dir: PathBuf,
        /// Burn-severity years to process (e.g. 2016 2017)
        #[arg(long, num_args = 1.., required = true)]
        years: Vec<i32>,
        /// Target year for the fuel update
        #[arg(long)]
        effective_year: i32,
        /// Ruleset CSV
        #[arg(long)]
        ruleset: PathBuf,
        /// Output directory
        #[arg(long)]
        out_dir: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Extract a 4-digit year from a filename
fn fire_year_from_filename(path: &Path) -> Result<i32, Error> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let re = Regex::new(r"(\d{4})").expect("year pattern is valid");
    re.captures(&name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or(Error::YearNotInFilename(name))
}

/// Find the severity raster for a year by filename match
fn find_bs_raster(bs_dir: &Path, year: i32) -> Result<PathBuf> {
    let needle = year.to_string();
    let mut matches: Vec<PathBuf> = std::fs::read_dir(bs_dir)
        .with_context(|| format!("Failed to read {}", bs_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension().is_some_and(|e| e.eq_ignore_ascii_case("tif"))
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().contains(&needle))
        })
        .collect();
    matches.sort();

    match matches.len() {
        0 => bail!(
            "No burn-severity raster for year {} in {}",
            year,
            bs_dir.display()
        ),
        1 => {}
        n => warn!(year, count = n, "multiple rasters match year; using the first"),
    }
    Ok(matches.remove(0))
}

fn open_reference_grid(path: &Path) -> Result<firefuel_core::GridDescriptor> {
    let pb = spinner("Reading reference grid...");
    let source = RasterSource::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    pb.finish_and_clear();
    Ok(source.descriptor().clone())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok(); // Ignore if already initialized
    }

    let mode = if cli.parallel {
        SweepMode::Parallel
    } else {
        SweepMode::Sequential
    };

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let source = RasterSource::open(&input)
                .with_context(|| format!("Failed to open {}", input.display()))?;
            let desc = source.descriptor();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {}", desc.width, desc.height);
            println!("Cell size: {}", desc.transform.cell_size());
            println!(
                "Origin: ({:.6}, {:.6})",
                desc.transform.origin_x, desc.transform.origin_y
            );
            if let Some(crs) = &desc.crs {
                println!("CRS: {}", crs);
            }
            println!("Datatype: {:?}", desc.dtype);
            if let Some(nodata) = desc.nodata {
                println!("NoData: {}", nodata);
            }
        }

        // ── Convert ──────────────────────────────────────────────────
        Commands::Convert {
            bs,
            align_to,
            output,
            effective_year,
            fire_year,
        } => {
            let fire_year = match fire_year {
                Some(year) => year,
                None => fire_year_from_filename(&bs)?,
            };
            let grid = open_reference_grid(&align_to)?;

            let start = Instant::now();
            let path = convert_bs_to_dist(&bs, fire_year, effective_year, &output, &grid, mode)
                .with_context(|| format!("Failed to convert {}", bs.display()))?;
            done("DIST raster", &path, start.elapsed());
        }

        // ── Combine ──────────────────────────────────────────────────
        Commands::Combine { inputs, output } => {
            let start = Instant::now();
            let path = combine_dist(&inputs, &output, mode)
                .context("Failed to combine DIST rasters")?;
            done("Combined DIST raster", &path, start.elapsed());
        }

        // ── Update ───────────────────────────────────────────────────
        Commands::Update {
            fm40,
            dist,
            ruleset,
            output,
        } => {
            let rules = RuleTable::from_csv(&ruleset)
                .with_context(|| format!("Failed to load ruleset {}", ruleset.display()))?;

            let start = Instant::now();
            let path = update_fm40(&fm40, &dist, &rules, &output, mode)
                .with_context(|| format!("Failed to update {}", fm40.display()))?;
            done("Updated FM40 raster", &path, start.elapsed());
        }

        // ── Run ──────────────────────────────────────────────────────
        Commands::Run {
            fm40,
            bs_dir,
            years,
            effective_year,
            ruleset,
            out_dir,
        } => {
            let rules = RuleTable::from_csv(&ruleset)
                .with_context(|| format!("Failed to load ruleset {}", ruleset.display()))?;

            let dist_dir = out_dir.join("dists");
            std::fs::create_dir_all(&dist_dir)
                .with_context(|| format!("Failed to create {}", dist_dir.display()))?;

            let grid = open_reference_grid(&fm40)?;

            // Step 1: one DIST raster per fire year, aligned to the FM40 grid
            let mut dist_paths = Vec::new();
            for year in &years {
                let bs_path = find_bs_raster(&bs_dir, *year)?;
                let fire_year = fire_year_from_filename(&bs_path)?;

                let stem = bs_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                let dist_path =
                    dist_dir.join(format!("{stem}_dist_{fire_year}_for_{effective_year}.tif"));

                if dist_path.exists() {
                    info!(path = %dist_path.display(), "DIST raster exists; skipping conversion");
                    dist_paths.push(dist_path);
                    continue;
                }

                let start = Instant::now();
                let path = convert_bs_to_dist(
                    &bs_path,
                    fire_year,
                    effective_year,
                    &dist_path,
                    &grid,
                    mode,
                )
                .with_context(|| format!("Failed to convert {}", bs_path.display()))?;
                done("DIST raster", &path, start.elapsed());
                dist_paths.push(path);
            }

            if dist_paths.is_empty() {
                bail!("No DIST rasters produced; nothing to combine");
            }

            // Step 2: merge into one composite disturbance layer
            let combined_path = dist_dir.join(format!("dist_combined_{effective_year}.tif"));
            if combined_path.exists() {
                info!(path = %combined_path.display(), "combined DIST exists; skipping combine");
            } else {
                let start = Instant::now();
                let path = combine_dist(&dist_paths, &combined_path, mode)
                    .context("Failed to combine DIST rasters")?;
                done("Combined DIST raster", &path, start.elapsed());
            }

            // Step 3: apply the ruleset to the baseline FM40
            let updated_path = out_dir.join(format!("fm40_updated_{effective_year}.tif"));
            if updated_path.exists() {
                info!(path = %updated_path.display(), "updated FM40 exists; skipping update");
            } else {
                let start = Instant::now();
                let path = update_fm40(&fm40, &combined_path, &rules, &updated_path, mode)
                    .with_context(|| format!("Failed to update {}", fm40.display()))?;
                done("Updated FM40 raster", &path, start.elapsed());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_year_from_filename() {
        let year = fire_year_from_filename(Path::new("mtbs_CONUS_2017.tif")).unwrap();
        assert_eq!(year, 2017);
    }

    #[test]
    fn test_fire_year_takes_first_match() {
        let year = fire_year_from_filename(Path::new("bs_2016_for_2018.tif")).unwrap();
        assert_eq!(year, 2016);
    }

    #[test]
    fn test_missing_year_is_config_error() {
        let result = fire_year_from_filename(Path::new("mtbs_conus.tif"));
        assert!(matches!(result, Err(Error::YearNotInFilename(_))));
    }
}
