//! firewatch CLI: rank fire-camera placements on a terrain raster.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use firewatch_engine::provider::{ElevationProvider, PreloadedGrid};
use firewatch_engine::types::{BoundingBox, LineOfSightModel, RankingOrder};
use firewatch_engine::{EngineParams, EngineResult};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "firewatch")]
#[command(about = "Choose fire-surveillance camera sites by viewshed overlap and triangulation angle")]
#[command(version)]
struct Cli {
    /// Engine parameters as JSON; individual flags override its fields.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Elevation grid as a JSON array of rows. Falls back to synthetic terrain when the
    /// file cannot be read; malformed contents are an error.
    #[arg(long)]
    dem: Option<PathBuf>,

    /// Bounding box: min_lon min_lat max_lon max_lat.
    #[arg(long, num_args = 4, value_names = ["MIN_LON", "MIN_LAT", "MAX_LON", "MAX_LAT"], allow_negative_numbers = true)]
    bbox: Option<Vec<f64>>,

    /// Ground resolution (meters per pixel).
    #[arg(long)]
    resolution: Option<f64>,

    /// Local-maximum window size in pixels.
    #[arg(long)]
    neighborhood: Option<usize>,

    /// Number of candidate sites kept.
    #[arg(long)]
    top_k: Option<usize>,

    /// Sample lattice stride in pixels.
    #[arg(long)]
    stride: Option<usize>,

    /// Camera mast height in meters.
    #[arg(long)]
    observer_height: Option<f64>,

    /// Points sampled per sightline.
    #[arg(long)]
    ray_samples: Option<usize>,

    /// Seed for the synthetic terrain noise.
    #[arg(long)]
    seed: Option<u64>,

    /// Side length of the synthetic terrain grid.
    #[arg(long)]
    synthetic_size: Option<usize>,

    #[arg(long, value_enum)]
    line_of_sight: Option<LosArg>,

    #[arg(long, value_enum)]
    ranking: Option<RankingArg>,

    /// Number of ranked combinations to print.
    #[arg(long, default_value = "5")]
    top: usize,

    /// Print the full result as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LosArg {
    FlatHorizon,
    ElevationProfile,
}

impl From<LosArg> for LineOfSightModel {
    fn from(arg: LosArg) -> Self {
        match arg {
            LosArg::FlatHorizon => LineOfSightModel::FlatHorizon,
            LosArg::ElevationProfile => LineOfSightModel::ElevationProfile,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RankingArg {
    LowestError,
    WidestIntersection,
}

impl From<RankingArg> for RankingOrder {
    fn from(arg: RankingArg) -> Self {
        match arg {
            RankingArg::LowestError => RankingOrder::LowestError,
            RankingArg::WidestIntersection => RankingOrder::WidestIntersection,
        }
    }
}

fn build_params(cli: &Cli) -> CliResult<EngineParams> {
    let mut params: EngineParams = match &cli.params {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => EngineParams::default(),
    };

    if let Some(b) = &cli.bbox {
        params.bbox = BoundingBox::new(b[0], b[1], b[2], b[3]);
    }
    if let Some(v) = cli.resolution {
        params.resolution = v;
    }
    if let Some(v) = cli.neighborhood {
        params.neighborhood_size = v;
    }
    if let Some(v) = cli.top_k {
        params.top_k = v;
    }
    if let Some(v) = cli.stride {
        params.sample_stride = v;
    }
    if let Some(v) = cli.observer_height {
        params.observer_height = v;
    }
    if let Some(v) = cli.ray_samples {
        params.ray_cast_samples = v;
    }
    if let Some(v) = cli.seed {
        params.seed = v;
    }
    if let Some(v) = cli.synthetic_size {
        params.synthetic.size = v;
    }
    if let Some(v) = cli.line_of_sight {
        params.line_of_sight = v.into();
    }
    if let Some(v) = cli.ranking {
        params.ranking = v.into();
    }
    Ok(params)
}

/// Preloaded DEM from `path`, or `None` when the file cannot be read.
fn load_dem(path: &Path) -> CliResult<Option<PreloadedGrid>> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("could not read {}: {}", path.display(), e);
            return Ok(None);
        }
    };
    let provider = PreloadedGrid::from_json_rows(&json)
        .map_err(|e| format!("malformed elevation grid {}: {}", path.display(), e))?;
    Ok(Some(provider))
}

fn print_report(result: &EngineResult, top: usize) {
    println!(
        "grid {}x{}{}",
        result.grid_width,
        result.grid_height,
        if result.used_fallback { " (synthetic)" } else { "" }
    );

    println!("\nCandidate sites:");
    println!("{:>6} {:>5} {:>5} {:>9}", "id", "x", "y", "elev");
    for site in &result.candidates {
        println!("{}", site);
    }

    println!("\nTop {} camera combinations:", top.min(result.results.len()));
    println!(
        "{:<20} {:>8} {:>10} {:>10}",
        "cams", "coverage", "mean_deg", "p95_deg"
    );
    for r in result.results.iter().take(top) {
        println!("{}", r);
    }

    match result.best() {
        Ok(best) => println!("\nBest cameras: {}", best.cams.join(", ")),
        Err(reason) => println!("\nNo placement: {}", reason),
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let params = build_params(&cli)?;

    let dem = match &cli.dem {
        Some(path) => load_dem(path)?,
        None => None,
    };
    let provider = dem.as_ref().map(|p| p as &dyn ElevationProvider);
    let result = firewatch_engine::run(&params, provider)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result, cli.top);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn flags_override_params_file() {
        let tmp = tempdir().unwrap();
        let params_path = tmp.path().join("params.json");
        std::fs::write(
            &params_path,
            r#"{"seed": 7, "top_k": 4, "sample_stride": 9, "observer_height": 12.0,
                "synthetic": {"size": 80, "noise_std": 0.5}}"#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "firewatch",
            "--params",
            params_path.to_str().unwrap(),
            "--top-k",
            "8",
            "--seed",
            "99",
            "--synthetic-size",
            "40",
            "--bbox",
            "-1.0",
            "2.0",
            "3.0",
            "4.0",
            "--line-of-sight",
            "elevation-profile",
            "--ranking",
            "widest-intersection",
        ]);
        let params = build_params(&cli).unwrap();

        assert_eq!(params.top_k, 8);
        assert_eq!(params.seed, 99);
        assert_eq!(params.synthetic.size, 40);
        assert_eq!(params.bbox, BoundingBox::new(-1.0, 2.0, 3.0, 4.0));
        assert_eq!(params.line_of_sight, LineOfSightModel::ElevationProfile);
        assert_eq!(params.ranking, RankingOrder::WidestIntersection);
        // fields without a flag keep the file's values
        assert_eq!(params.sample_stride, 9);
        assert_eq!(params.observer_height, 12.0);
        assert_eq!(params.synthetic.noise_std, 0.5);
        // fields in neither keep the defaults
        assert_eq!(params.neighborhood_size, 15);
    }

    #[test]
    fn no_params_file_uses_defaults() {
        let cli = Cli::parse_from(["firewatch", "--stride", "3"]);
        let params = build_params(&cli).unwrap();
        assert_eq!(params.sample_stride, 3);
        assert_eq!(params.top_k, 12);
        assert_eq!(cli.top, 5);
    }

    #[test]
    fn unreadable_dem_falls_back() {
        let tmp = tempdir().unwrap();
        assert!(load_dem(&tmp.path().join("missing.json")).unwrap().is_none());
    }

    #[test]
    fn malformed_dem_is_an_error() {
        let tmp = tempdir().unwrap();
        let ragged = tmp.path().join("ragged.json");
        std::fs::write(&ragged, "[[1.0, 2.0], [3.0]]").unwrap();
        assert!(load_dem(&ragged).is_err());

        let garbage = tmp.path().join("garbage.json");
        std::fs::write(&garbage, "not json").unwrap();
        assert!(load_dem(&garbage).is_err());
    }

    #[test]
    fn valid_dem_is_served() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("dem.json");
        std::fs::write(&path, "[[1.0, 2.0], [3.0, 4.0]]").unwrap();
        let provider = load_dem(&path).unwrap().unwrap();
        let grid = provider
            .fetch_elevation(&BoundingBox::default(), 30.0)
            .unwrap();
        assert_eq!((grid.width(), grid.height()), (2, 2));
    }
}
