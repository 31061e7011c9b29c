//! Viewshed computation by ray sampling over the elevation raster.
//!
//! For each target pixel, a fixed number of points is sampled along the
//! straight segment from observer to target (pixel space, truncated to
//! integer indices). Interior samples are tested against the sightline
//! model; the two endpoints never block.

use rayon::prelude::*;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::grid::{ElevationGrid, VisibilityGrid};
use crate::types::{CandidateSite, LineOfSightModel};

/// Sightline sampling parameters shared by every observer in a run.
#[derive(Debug, Clone, Copy)]
pub struct RayCast {
    /// Mast height above ground in meters.
    pub observer_height: f64,
    /// Points sampled per sightline, endpoints included.
    pub samples: usize,
    pub model: LineOfSightModel,
}

impl Default for RayCast {
    fn default() -> Self {
        RayCast {
            observer_height: 20.0,
            samples: 80,
            model: LineOfSightModel::FlatHorizon,
        }
    }
}

/// Visibility of every pixel from `(observer_x, observer_y)`.
pub fn compute_viewshed(
    grid: &ElevationGrid,
    observer_x: usize,
    observer_y: usize,
    ray: &RayCast,
) -> Result<VisibilityGrid> {
    if !grid.contains(observer_x, observer_y) {
        return Err(EngineError::InvalidObserver {
            x: observer_x,
            y: observer_y,
            width: grid.width(),
            height: grid.height(),
        });
    }

    let width = grid.width();
    let observer_elevation = grid.at(observer_x, observer_y) + ray.observer_height;

    let mut cells = vec![false; width * grid.height()];
    cells
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = (x, y) == (observer_x, observer_y)
                    || !sightline_blocked(
                        grid,
                        (observer_x, observer_y),
                        observer_elevation,
                        (x, y),
                        ray,
                    );
            }
        });

    Ok(VisibilityGrid::new(
        width,
        grid.height(),
        (observer_x, observer_y),
        cells,
    ))
}

/// One viewshed per candidate, in candidate order.
pub fn compute_viewsheds(
    grid: &ElevationGrid,
    candidates: &[CandidateSite],
    ray: &RayCast,
) -> Result<Vec<VisibilityGrid>> {
    candidates
        .par_iter()
        .map(|site| {
            let vis = compute_viewshed(grid, site.x, site.y, ray)?;
            debug!(
                "viewshed {} at ({}, {}): {:.1}% visible",
                site.id,
                site.x,
                site.y,
                vis.visible_fraction() * 100.0
            );
            Ok(vis)
        })
        .collect()
}

/// True when any interior sample along observer → target blocks the view.
fn sightline_blocked(
    grid: &ElevationGrid,
    (ox, oy): (usize, usize),
    observer_elevation: f64,
    (tx, ty): (usize, usize),
    ray: &RayCast,
) -> bool {
    let n = ray.samples;
    if n < 3 {
        return false;
    }

    let div = (n - 1) as f64;
    let (start_x, start_y) = (ox as f64, oy as f64);
    let step_x = (tx as f64 - start_x) / div;
    let step_y = (ty as f64 - start_y) / div;
    let max_x = grid.width() - 1;
    let max_y = grid.height() - 1;
    let target_elevation = grid.at(tx, ty);

    (1..n - 1).any(|i| {
        let xi = ((i as f64 * step_x + start_x) as usize).min(max_x);
        let yi = ((i as f64 * step_y + start_y) as usize).min(max_y);
        match ray.model {
            LineOfSightModel::FlatHorizon => grid.at(xi, yi) > observer_elevation,
            LineOfSightModel::ElevationProfile => {
                // samples truncated onto either endpoint pixel cannot occlude it
                if (xi, yi) == (ox, oy) || (xi, yi) == (tx, ty) {
                    return false;
                }
                let t = i as f64 / div;
                let sightline = observer_elevation + (target_elevation - observer_elevation) * t;
                grid.at(xi, yi) > sightline
            }
        }
    })
}
