//! Ridge and peak candidate extraction.
//!
//! A pixel is a candidate when no pixel in its `neighborhood × neighborhood`
//! window is higher. Flat plateaus therefore yield clusters of adjacent
//! candidates; they are kept as-is.

use tracing::debug;

use crate::grid::ElevationGrid;
use crate::types::CandidateSite;

/// Local maxima of `grid`, highest first, at most `top_k` of them.
///
/// Ids are `P{i}` with `i` the position of the pixel in row-major scan
/// order, so they stay stable regardless of `top_k`. Equal elevations keep
/// scan order.
pub fn extract_candidates(
    grid: &ElevationGrid,
    neighborhood_size: usize,
    top_k: usize,
) -> Vec<CandidateSite> {
    if grid.is_empty() {
        return Vec::new();
    }

    let filtered = grid.maximum_filter(neighborhood_size);
    let width = grid.width();

    let mut maxima: Vec<CandidateSite> = Vec::new();
    for y in 0..grid.height() {
        for x in 0..width {
            let elevation = grid.at(x, y);
            if elevation == filtered[y * width + x] {
                let id = format!("P{}", maxima.len());
                maxima.push(CandidateSite::new(id, x, y, elevation));
            }
        }
    }

    let found = maxima.len();
    maxima.sort_by(|a, b| b.elevation.total_cmp(&a.elevation));
    maxima.truncate(top_k);
    debug!(
        "{} local maxima (window {}), keeping {}",
        found,
        neighborhood_size,
        maxima.len()
    );
    maxima
}
