//! End-to-end placement run.
//!
//! elevation → candidates → viewsheds → combination search → ranked report.
//! Each stage only borrows the artifacts of the previous ones.

use std::time::Instant;

use tracing::{info, warn};

use crate::candidates::extract_candidates;
use crate::error::Result;
use crate::grid::ElevationGrid;
use crate::optimize::{optimize, sample_lattice};
use crate::provider::{fetch_or_synthesize, ElevationProvider, SyntheticTerrain};
use crate::types::{EngineParams, EngineResult};
use crate::viewshed::compute_viewsheds;

/// Fetch elevation (falling back to synthetic terrain) and analyse it.
pub fn run(params: &EngineParams, provider: Option<&dyn ElevationProvider>) -> Result<EngineResult> {
    params.validate()?;
    let fallback = SyntheticTerrain::from_params(&params.synthetic, params.seed);
    let (grid, used_fallback) =
        fetch_or_synthesize(provider, &fallback, &params.bbox, params.resolution)?;
    let mut result = analyze(&grid, params)?;
    result.used_fallback = used_fallback;
    Ok(result)
}

/// Run every stage on an elevation grid already in hand.
///
/// An empty or featureless grid is not an error: the report simply has no
/// candidates or no results, and [`EngineResult::best`] says why.
pub fn analyze(grid: &ElevationGrid, params: &EngineParams) -> Result<EngineResult> {
    params.validate()?;
    let started = Instant::now();

    let candidates = extract_candidates(grid, params.neighborhood_size, params.top_k);
    info!(
        "{} candidate sites on {}x{} grid",
        candidates.len(),
        grid.width(),
        grid.height()
    );

    let viewsheds = compute_viewsheds(grid, &candidates, &params.ray_cast())?;
    info!("{} viewsheds in {:.2?}", viewsheds.len(), started.elapsed());

    let sample_points = sample_lattice(grid.width(), grid.height(), params.sample_stride);
    let results = optimize(&candidates, &viewsheds, &sample_points, &params.search_options())?;

    let result = EngineResult {
        grid_width: grid.width(),
        grid_height: grid.height(),
        used_fallback: false,
        camera_count: params.camera_count,
        sample_count: sample_points.len(),
        candidates,
        results,
    };
    match result.best() {
        Ok(best) => info!(
            "best {} (coverage {:.3}, p95 {:.2}°) after {:.2?}",
            best.cams.join(","),
            best.coverage,
            best.p95_error_degrees,
            started.elapsed()
        ),
        Err(reason) => warn!("no placement: {}", reason),
    }
    Ok(result)
}

/// JSON in, JSON out: `EngineParams` → `EngineResult` on synthetic terrain.
pub fn run_json(params_json: &str) -> Result<String> {
    let params: EngineParams = serde_json::from_str(params_json)?;
    let result = run(&params, None)?;
    Ok(serde_json::to_string(&result)?)
}
