//! Elevation sources.
//!
//! Real DEM services live outside this crate; they plug in through
//! [`ElevationProvider`]. [`SyntheticTerrain`] is always available and is
//! what the pipeline falls back to when a provider cannot answer.

use rand_distr::{Distribution, Normal};
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::grid::ElevationGrid;
use crate::prng::Pcg32;
use crate::types::{BoundingBox, SyntheticParams};

/// Anything that can turn a bounding box into an elevation raster.
pub trait ElevationProvider {
    /// Human-readable source name for logs.
    fn name(&self) -> &str;

    /// Elevation grid (meters) covering `bbox` at `resolution` meters per pixel.
    fn fetch_elevation(&self, bbox: &BoundingBox, resolution: f64) -> Result<ElevationGrid>;
}

// -- Synthetic surface ---------------------------------------------

/// Deterministic ridge-and-peak surface with seeded Gaussian noise.
///
/// `200 + 40 sin(1.2X) cos(1.5Y) + 30 exp(-((X-4)^2 + (Y-2.5)^2))` sampled
/// on a `size × size` lattice spanning `[0, 6]` in both axes.
#[derive(Debug, Clone)]
pub struct SyntheticTerrain {
    pub size: usize,
    pub noise_std: f64,
    pub seed: u64,
}

impl SyntheticTerrain {
    pub fn new(size: usize, noise_std: f64, seed: u64) -> Self {
        SyntheticTerrain {
            size,
            noise_std,
            seed,
        }
    }

    pub fn from_params(params: &SyntheticParams, seed: u64) -> Self {
        Self::new(params.size, params.noise_std, seed)
    }

    /// Noise-free surface height at lattice coordinates `(x, y)` in `[0, 6]`.
    pub fn surface(x: f64, y: f64) -> f64 {
        let ridge = 40.0 * (x * 1.2).sin() * (y * 1.5).cos();
        let peak = 30.0 * (-((x - 4.0).powi(2) + (y - 2.5).powi(2))).exp();
        200.0 + ridge + peak
    }

    /// Sample the surface, adding `N(0, noise_std)` per pixel when `noise_std > 0`.
    pub fn generate(&self) -> Result<ElevationGrid> {
        if !(self.noise_std.is_finite() && self.noise_std >= 0.0) {
            return Err(EngineError::InvalidParams(format!(
                "noise_std must be finite and non-negative, got {}",
                self.noise_std
            )));
        }
        let noise = Normal::new(0.0, self.noise_std).map_err(|e| {
            EngineError::InvalidParams(format!("noise_std {}: {}", self.noise_std, e))
        })?;
        let axis = linspace(0.0, 6.0, self.size);
        let mut rng = Pcg32::new(self.seed, 0);
        let noisy = self.noise_std > 0.0;
        Ok(ElevationGrid::from_fn(self.size, self.size, |x, y| {
            let base = Self::surface(axis[x], axis[y]);
            if noisy {
                base + noise.sample(&mut rng)
            } else {
                base
            }
        }))
    }
}

impl ElevationProvider for SyntheticTerrain {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_elevation(&self, bbox: &BoundingBox, _resolution: f64) -> Result<ElevationGrid> {
        bbox.validate()?;
        self.generate()
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            values[n - 1] = stop;
            values
        }
    }
}

// -- Preloaded raster ----------------------------------------------

/// Serves a grid that is already in memory, e.g. a DEM tile loaded by the CLI.
#[derive(Debug, Clone)]
pub struct PreloadedGrid {
    grid: ElevationGrid,
    coverage: Option<BoundingBox>,
}

impl PreloadedGrid {
    /// A grid that answers for any bounding box.
    pub fn new(grid: ElevationGrid) -> Self {
        PreloadedGrid {
            grid,
            coverage: None,
        }
    }

    /// A grid that only answers for boxes inside `coverage`.
    pub fn with_coverage(grid: ElevationGrid, coverage: BoundingBox) -> Self {
        PreloadedGrid {
            grid,
            coverage: Some(coverage),
        }
    }

    /// Parse a JSON array of rows (`[[z00, z01, ...], [z10, ...], ...]`).
    pub fn from_json_rows(json: &str) -> Result<Self> {
        let rows: Vec<Vec<f64>> = serde_json::from_str(json)?;
        Ok(Self::new(ElevationGrid::from_rows(rows)?))
    }
}

impl ElevationProvider for PreloadedGrid {
    fn name(&self) -> &str {
        "preloaded"
    }

    fn fetch_elevation(&self, bbox: &BoundingBox, _resolution: f64) -> Result<ElevationGrid> {
        if let Some(coverage) = &self.coverage {
            if !coverage.covers(bbox) {
                return Err(EngineError::ProviderUnavailable(format!(
                    "requested box [{}, {}, {}, {}] outside preloaded coverage",
                    bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat
                )));
            }
        }
        Ok(self.grid.clone())
    }
}

// -- Fallback ------------------------------------------------------

/// Ask `provider` for elevation; on `ProviderUnavailable` use `fallback`.
///
/// Returns the grid and whether the fallback produced it. Errors other than
/// unavailability (bad bounding box, malformed data) are propagated.
pub fn fetch_or_synthesize(
    provider: Option<&dyn ElevationProvider>,
    fallback: &SyntheticTerrain,
    bbox: &BoundingBox,
    resolution: f64,
) -> Result<(ElevationGrid, bool)> {
    if let Some(provider) = provider {
        match provider.fetch_elevation(bbox, resolution) {
            Ok(grid) => {
                info!(
                    "elevation from {}: {}x{}",
                    provider.name(),
                    grid.width(),
                    grid.height()
                );
                return Ok((grid, false));
            }
            Err(EngineError::ProviderUnavailable(reason)) => {
                warn!(
                    "{} provider unavailable ({}); using synthetic terrain",
                    provider.name(),
                    reason
                );
            }
            Err(e) => return Err(e),
        }
    }

    let grid = fallback.fetch_elevation(bbox, resolution)?;
    info!(
        "synthetic elevation: {}x{} (seed {}, noise σ {})",
        grid.width(),
        grid.height(),
        fallback.seed,
        fallback.noise_std
    );
    Ok((grid, true))
}
