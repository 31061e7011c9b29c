//! Elevation and visibility rasters.
//!
//! Both grids are stored row-major in a flat `Vec` and indexed by pixel
//! coordinates `(x, y)` with `x` the column and `y` the row. Neither type
//! exposes mutation once built; downstream stages share them by `&`.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Dense terrain elevation raster in meters.
///
/// Serialized as an array of rows; deserialization goes through
/// [`ElevationGrid::from_rows`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct ElevationGrid {
    width: usize,
    height: usize,
    cells: Vec<f64>,
}

impl ElevationGrid {
    /// Build a grid from rows of elevations (`rows[y][x]`).
    ///
    /// An empty row list yields an empty grid. Ragged rows and non-finite
    /// values are rejected.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().all(Vec::is_empty) {
            return Ok(Self::empty());
        }

        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(EngineError::InvalidDimensions {
                    row: y,
                    expected: width,
                    actual: row.len(),
                });
            }
            if let Some(x) = row.iter().position(|v| !v.is_finite()) {
                return Err(EngineError::InvalidElevation { x, y });
            }
            cells.extend(row);
        }

        Ok(ElevationGrid {
            width,
            height,
            cells,
        })
    }

    /// Rows of elevations (`rows[y][x]`), the inverse of [`Self::from_rows`].
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.width == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.width).map(<[f64]>::to_vec).collect()
    }

    /// Build a grid by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        if width == 0 || height == 0 {
            return Self::empty();
        }
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        ElevationGrid {
            width,
            height,
            cells,
        }
    }

    pub fn flat(width: usize, height: usize, elevation: f64) -> Self {
        Self::from_fn(width, height, |_, _| elevation)
    }

    pub fn empty() -> Self {
        ElevationGrid {
            width: 0,
            height: 0,
            cells: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Elevation at `(x, y)`. Panics when out of range, like slice indexing.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f64 {
        self.cells[y * self.width + x]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if self.contains(x, y) {
            Some(self.at(x, y))
        } else {
            None
        }
    }

    /// Highest and lowest elevation, `None` for an empty grid.
    pub fn range(&self) -> Option<(f64, f64)> {
        let first = *self.cells.first()?;
        Some(self.cells.iter().fold((first, first), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        }))
    }

    /// Sliding-window maximum with a `size × size` window.
    ///
    /// The window at `i` covers `i - size/2 ..= i - size/2 + size - 1`,
    /// clipped to the grid. Computed separably: rows first, then columns.
    pub fn maximum_filter(&self, size: usize) -> Vec<f64> {
        let size = size.max(1);
        let (w, h) = (self.width, self.height);
        if w == 0 || h == 0 {
            return Vec::new();
        }

        let mut horizontal = vec![0.0; w * h];
        for y in 0..h {
            let row = &self.cells[y * w..(y + 1) * w];
            for x in 0..w {
                let (lo, hi) = window_bounds(x, size, w);
                horizontal[y * w + x] = row[lo..=hi]
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max);
            }
        }

        let mut filtered = vec![0.0; w * h];
        for x in 0..w {
            for y in 0..h {
                let (lo, hi) = window_bounds(y, size, h);
                filtered[y * w + x] = (lo..=hi)
                    .map(|yy| horizontal[yy * w + x])
                    .fold(f64::NEG_INFINITY, f64::max);
            }
        }
        filtered
    }
}

impl TryFrom<Vec<Vec<f64>>> for ElevationGrid {
    type Error = EngineError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<ElevationGrid> for Vec<Vec<f64>> {
    fn from(grid: ElevationGrid) -> Self {
        grid.to_rows()
    }
}

/// Inclusive window `[lo, hi]` around `i` for a filter of `size`, clipped to `0..len`.
fn window_bounds(i: usize, size: usize, len: usize) -> (usize, usize) {
    let before = size / 2;
    let after = size - 1 - before;
    (i.saturating_sub(before), (i + after).min(len - 1))
}

/// Boolean line-of-sight raster for a single observer pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityGrid {
    width: usize,
    height: usize,
    observer: (usize, usize),
    cells: Vec<bool>,
}

impl VisibilityGrid {
    pub(crate) fn new(width: usize, height: usize, observer: (usize, usize), cells: Vec<bool>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        VisibilityGrid {
            width,
            height,
            observer,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel the grid was computed from.
    pub fn observer(&self) -> (usize, usize) {
        self.observer
    }

    #[inline]
    pub fn is_visible(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.width + x]
    }

    pub fn visible_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v).count()
    }

    /// Fraction of the grid visible from the observer.
    pub fn visible_fraction(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.visible_count() as f64 / self.cells.len() as f64
    }
}
