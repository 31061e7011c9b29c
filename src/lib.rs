//! Firewatch placement engine.
//!
//! Picks mast sites for fire-surveillance cameras on a terrain raster:
//! ridge/peak candidates are extracted, a viewshed is ray-cast from each,
//! and every camera triple is ranked by how well its sightlines cover and
//! triangulate a lattice of target points.
//!
//! With the `python` feature, exposes `optimize_json` to Python: it
//! accepts a JSON string (engine params) and returns a JSON string
//! (engine result).

pub mod candidates;
pub mod error;
pub mod grid;
pub mod optimize;
pub mod pipeline;
pub mod prng;
pub mod provider;
pub mod triangulation;
pub mod types;
pub mod viewshed;

pub use error::{EngineError, Result};
pub use grid::{ElevationGrid, VisibilityGrid};
pub use pipeline::{analyze, run, run_json};
pub use types::{CandidateSite, EngineParams, EngineResult, EvaluationResult};

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;

    /// Run the placement engine on synthetic terrain.
    ///
    /// Takes a JSON string matching `EngineParams` and returns a JSON
    /// string matching `EngineResult`.
    #[pyfunction]
    fn optimize_json(params_json: &str) -> PyResult<String> {
        crate::pipeline::run_json(params_json).map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                "placement engine failed: {e}"
            ))
        })
    }

    /// Firewatch Rust engine, importable from Python.
    #[pymodule]
    fn firewatch_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(optimize_json, m)?)?;
        Ok(())
    }
}
