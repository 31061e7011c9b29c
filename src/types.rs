//! Data types for the engine's JSON interchange format.
//!
//! `EngineParams` is what callers hand in (every field has a default, so
//! `{}` is a valid request); `EngineResult` is what comes back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::optimize::SearchOptions;
use crate::viewshed::RayCast;

// -- Geography -----------------------------------------------------

/// Geographic bounding box in degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        BoundingBox {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let coords = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(EngineError::InvalidParams(
                "bounding box has non-finite coordinates".into(),
            ));
        }
        if self.min_lon >= self.max_lon || self.min_lat >= self.max_lat {
            return Err(EngineError::InvalidParams(format!(
                "degenerate bounding box [{}, {}, {}, {}]",
                self.min_lon, self.min_lat, self.max_lon, self.max_lat
            )));
        }
        Ok(())
    }

    /// True when `other` lies entirely inside this box.
    pub fn covers(&self, other: &BoundingBox) -> bool {
        other.min_lon >= self.min_lon
            && other.min_lat >= self.min_lat
            && other.max_lon <= self.max_lon
            && other.max_lat <= self.max_lat
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox::new(128.0, 35.5, 128.06, 35.56)
    }
}

// -- Candidate sites / results -------------------------------------

/// A ridge or peak pixel considered for a camera mast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSite {
    pub id: String,
    pub x: usize,
    pub y: usize,
    pub elevation: f64,
}

impl CandidateSite {
    pub fn new(id: impl Into<String>, x: usize, y: usize, elevation: f64) -> Self {
        CandidateSite {
            id: id.into(),
            x,
            y,
            elevation,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

impl fmt::Display for CandidateSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6} {:5} {:5} {:9.2}", self.id, self.x, self.y, self.elevation)
    }
}

/// Score of one camera combination over the sample lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub cams: Vec<String>,
    pub coverage: f64,
    pub mean_error_degrees: f64,
    pub p95_error_degrees: f64,
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} {:8.3} {:10.3} {:10.3}",
            self.cams.join(","),
            self.coverage,
            self.mean_error_degrees,
            self.p95_error_degrees
        )
    }
}

// -- Options -------------------------------------------------------

/// How the viewshed decides whether terrain blocks a sightline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOfSightModel {
    /// Terrain blocks when it rises above the observer's own elevation.
    #[default]
    FlatHorizon,
    /// Terrain blocks when it rises above the straight sightline from the
    /// observer down (or up) to the target's ground elevation.
    ElevationProfile,
}

/// Sort order for evaluated combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingOrder {
    /// Ascending p95 angle, then descending coverage.
    #[default]
    LowestError,
    /// Descending p95 angle, then descending coverage.
    WidestIntersection,
}

/// Thresholds that stop the combination search early.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceCriteria {
    pub max_p95_error_degrees: f64,
    #[serde(default)]
    pub min_coverage: f64,
}

impl AcceptanceCriteria {
    pub fn accepts(&self, result: &EvaluationResult) -> bool {
        result.p95_error_degrees <= self.max_p95_error_degrees
            && result.coverage >= self.min_coverage
    }
}

fn default_synthetic_size() -> usize {
    200
}
fn default_noise_std() -> f64 {
    1.0
}

/// Procedural surface used when no real elevation source answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticParams {
    #[serde(default = "default_synthetic_size")]
    pub size: usize,
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            size: default_synthetic_size(),
            noise_std: default_noise_std(),
        }
    }
}

// -- Engine I/O ----------------------------------------------------

fn default_seed() -> u64 {
    42
}
fn default_resolution() -> f64 {
    30.0
}
fn default_neighborhood_size() -> usize {
    15
}
fn default_top_k() -> usize {
    12
}
fn default_sample_stride() -> usize {
    6
}
fn default_observer_height() -> f64 {
    20.0
}
fn default_ray_cast_samples() -> usize {
    80
}
fn default_camera_count() -> usize {
    3
}
fn default_min_visible() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub bbox: BoundingBox,
    /// Ground resolution in meters per pixel.
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default = "default_neighborhood_size")]
    pub neighborhood_size: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_sample_stride")]
    pub sample_stride: usize,
    /// Mast height above ground in meters.
    #[serde(default = "default_observer_height")]
    pub observer_height: f64,
    #[serde(default = "default_ray_cast_samples")]
    pub ray_cast_samples: usize,
    #[serde(default = "default_camera_count")]
    pub camera_count: usize,
    /// Cameras that must see a sample point for it to count as covered.
    #[serde(default = "default_min_visible")]
    pub min_visible: usize,
    #[serde(default)]
    pub line_of_sight: LineOfSightModel,
    #[serde(default)]
    pub ranking: RankingOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance: Option<AcceptanceCriteria>,
    #[serde(default)]
    pub synthetic: SyntheticParams,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            bbox: BoundingBox::default(),
            resolution: default_resolution(),
            neighborhood_size: default_neighborhood_size(),
            top_k: default_top_k(),
            sample_stride: default_sample_stride(),
            observer_height: default_observer_height(),
            ray_cast_samples: default_ray_cast_samples(),
            camera_count: default_camera_count(),
            min_visible: default_min_visible(),
            line_of_sight: LineOfSightModel::default(),
            ranking: RankingOrder::default(),
            acceptance: None,
            synthetic: SyntheticParams::default(),
        }
    }
}

impl EngineParams {
    pub fn validate(&self) -> Result<()> {
        self.bbox.validate()?;
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(EngineError::InvalidParams(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if !self.observer_height.is_finite() {
            return Err(EngineError::InvalidParams(
                "observer_height must be finite".into(),
            ));
        }
        if self.camera_count < 2 {
            return Err(EngineError::InvalidParams(format!(
                "camera_count must be at least 2, got {}",
                self.camera_count
            )));
        }
        if self.min_visible < 2 || self.min_visible > self.camera_count {
            return Err(EngineError::InvalidParams(format!(
                "min_visible must lie in 2..={}, got {}",
                self.camera_count, self.min_visible
            )));
        }
        Ok(())
    }
    /// Viewshed settings carried by these parameters.
    pub fn ray_cast(&self) -> RayCast {
        RayCast {
            observer_height: self.observer_height,
            samples: self.ray_cast_samples,
            model: self.line_of_sight,
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            camera_count: self.camera_count,
            min_visible: self.min_visible,
            ranking: self.ranking,
            acceptance: self.acceptance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    pub grid_width: usize,
    pub grid_height: usize,
    /// True when the synthetic surface stood in for the requested source.
    #[serde(default)]
    pub used_fallback: bool,
    pub camera_count: usize,
    pub sample_count: usize,
    pub candidates: Vec<CandidateSite>,
    pub results: Vec<EvaluationResult>,
}

impl EngineResult {
    /// Top-ranked combination, or the condition explaining why there is none.
    pub fn best(&self) -> Result<&EvaluationResult> {
        if let Some(best) = self.results.first() {
            return Ok(best);
        }
        if self.candidates.is_empty() {
            Err(EngineError::NoCandidates)
        } else if self.candidates.len() < self.camera_count {
            Err(EngineError::InsufficientCandidates {
                required: self.camera_count,
                available: self.candidates.len(),
            })
        } else {
            Err(EngineError::NoViableCoverage)
        }
    }

    pub fn candidate(&self, id: &str) -> Option<&CandidateSite> {
        self.candidates.iter().find(|c| c.id == id)
    }
}

// -- Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_result(candidates: Vec<CandidateSite>) -> EngineResult {
        EngineResult {
            grid_width: 10,
            grid_height: 10,
            used_fallback: false,
            camera_count: 3,
            sample_count: 4,
            candidates,
            results: vec![],
        }
    }

    #[test]
    fn empty_params_use_defaults() {
        let params: EngineParams = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(params.neighborhood_size, 15);
        assert_eq!(params.top_k, 12);
        assert_eq!(params.sample_stride, 6);
        assert_eq!(params.observer_height, 20.0);
        assert_eq!(params.ray_cast_samples, 80);
        assert_eq!(params.camera_count, 3);
        assert_eq!(params.min_visible, 2);
        assert_eq!(params.bbox, BoundingBox::new(128.0, 35.5, 128.06, 35.56));
        assert_eq!(params.line_of_sight, LineOfSightModel::FlatHorizon);
        assert_eq!(params.synthetic.size, 200);
        assert!(params.acceptance.is_none());
        params.validate().expect("defaults are valid");
    }

    #[test]
    fn params_round_trip() {
        let json = r#"{
            "seed": 9,
            "bbox": {"min_lon": 127.0, "min_lat": 36.0, "max_lon": 127.1, "max_lat": 36.1},
            "top_k": 5,
            "line_of_sight": "elevation_profile",
            "ranking": "widest_intersection",
            "acceptance": {"max_p95_error_degrees": 10.0},
            "synthetic": {"size": 64}
        }"#;
        let params: EngineParams = serde_json::from_str(json).expect("deserialize");
        assert_eq!(params.seed, 9);
        assert_eq!(params.top_k, 5);
        assert_eq!(params.line_of_sight, LineOfSightModel::ElevationProfile);
        assert_eq!(params.ranking, RankingOrder::WidestIntersection);
        assert_eq!(params.synthetic.size, 64);
        assert_eq!(params.synthetic.noise_std, 1.0);
        let acceptance = params.acceptance.expect("acceptance");
        assert_eq!(acceptance.min_coverage, 0.0);

        let out = serde_json::to_string(&params).expect("serialize");
        let _: EngineParams = serde_json::from_str(&out).expect("re-deserialize");
    }

    #[test]
    fn stage_settings_follow_params() {
        let params: EngineParams = serde_json::from_str(
            r#"{"observer_height": 35.0, "ray_cast_samples": 120, "line_of_sight": "elevation_profile",
                "camera_count": 4, "min_visible": 3, "ranking": "widest_intersection",
                "acceptance": {"max_p95_error_degrees": 5.0, "min_coverage": 0.8}}"#,
        )
        .expect("deserialize");

        let ray = params.ray_cast();
        assert_eq!(ray.observer_height, 35.0);
        assert_eq!(ray.samples, 120);
        assert_eq!(ray.model, LineOfSightModel::ElevationProfile);

        let search = params.search_options();
        assert_eq!(search.camera_count, 4);
        assert_eq!(search.min_visible, 3);
        assert_eq!(search.ranking, RankingOrder::WidestIntersection);
        assert_eq!(search.acceptance.map(|a| a.min_coverage), Some(0.8));
    }

    #[test]
    fn invalid_params_rejected() {
        let mut params = EngineParams::default();
        params.min_visible = 4;
        assert!(matches!(params.validate(), Err(EngineError::InvalidParams(_))));

        let mut params = EngineParams::default();
        params.bbox = BoundingBox::new(1.0, 1.0, 0.0, 2.0);
        assert!(params.validate().is_err());

        let mut params = EngineParams::default();
        params.resolution = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn bbox_covers() {
        let outer = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.covers(&BoundingBox::new(1.0, 1.0, 2.0, 2.0)));
        assert!(!outer.covers(&BoundingBox::new(-1.0, 1.0, 2.0, 2.0)));
    }

    #[test]
    fn best_reports_missing_solution() {
        assert!(matches!(empty_result(vec![]).best(), Err(EngineError::NoCandidates)));

        let two = vec![
            CandidateSite::new("P0", 0, 0, 1.0),
            CandidateSite::new("P1", 1, 0, 1.0),
        ];
        assert!(matches!(
            empty_result(two.clone()).best(),
            Err(EngineError::InsufficientCandidates { required: 3, available: 2 })
        ));

        let mut three = two;
        three.push(CandidateSite::new("P2", 2, 0, 1.0));
        assert!(matches!(empty_result(three).best(), Err(EngineError::NoViableCoverage)));
    }

    #[test]
    fn acceptance_thresholds() {
        let criteria = AcceptanceCriteria {
            max_p95_error_degrees: 10.0,
            min_coverage: 0.5,
        };
        let mut result = EvaluationResult {
            cams: vec!["P0".into(), "P1".into(), "P2".into()],
            coverage: 0.6,
            mean_error_degrees: 4.0,
            p95_error_degrees: 9.0,
        };
        assert!(criteria.accepts(&result));
        result.coverage = 0.4;
        assert!(!criteria.accepts(&result));
    }

    #[test]
    fn result_serializes() {
        let result = empty_result(vec![CandidateSite::new("P3", 4, 5, 210.5)]);
        let json = serde_json::to_string(&result).expect("serialize");
        assert!(json.contains("\"id\":\"P3\""));
        assert!(json.contains("\"used_fallback\":false"));
    }
}
