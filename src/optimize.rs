//! Exhaustive search over camera combinations.
//!
//! Every combination of `camera_count` candidates is scored on a coarse
//! lattice of target points: a point is covered when at least
//! `min_visible` of the cameras see it, and each covered point contributes
//! its triangulation angle. Combinations are then ranked by the 95th
//! percentile of those angles, with coverage as tie-breaker.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::error::{EngineError, Result};
use crate::grid::VisibilityGrid;
use crate::triangulation::{sightline_min_angle, Vec2};
use crate::types::{AcceptanceCriteria, CandidateSite, EvaluationResult, RankingOrder};

/// Search knobs. Defaults: triples, two-of-three coverage, lowest error first.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub camera_count: usize,
    pub min_visible: usize,
    pub ranking: RankingOrder,
    pub acceptance: Option<AcceptanceCriteria>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            camera_count: 3,
            min_visible: 2,
            ranking: RankingOrder::LowestError,
            acceptance: None,
        }
    }
}

/// Regular lattice of target pixels, `x` outer and `y` inner.
pub fn sample_lattice(width: usize, height: usize, stride: usize) -> Vec<(usize, usize)> {
    let stride = stride.max(1);
    let mut points = Vec::with_capacity(width.div_ceil(stride) * height.div_ceil(stride));
    for x in (0..width).step_by(stride) {
        for y in (0..height).step_by(stride) {
            points.push((x, y));
        }
    }
    points
}

// -- Combinations --------------------------------------------------

/// `k`-element index combinations of `0..n` in lexicographic order.
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Combinations {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }

        let k = self.indices.len();
        // rightmost index that can still move right
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                return None;
            }
            i -= 1;
            if self.indices[i] != i + self.n - k {
                break;
            }
        }
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}

// -- Scoring -------------------------------------------------------

/// Linear-interpolated percentile of an ascending slice; `q` in `[0, 100]`.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (q / 100.0).clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Score one camera combination, `None` when no covered point can be scored.
pub fn evaluate_combination(
    sites: &[&CandidateSite],
    viewsheds: &[&VisibilityGrid],
    sample_points: &[(usize, usize)],
    min_visible: usize,
) -> Option<EvaluationResult> {
    if sample_points.is_empty() {
        return None;
    }
    let cams: Vec<Vec2> = sites.iter().map(|s| s.position()).collect();

    let mut covered = 0usize;
    let mut errors: Vec<f64> = Vec::new();
    for &(px, py) in sample_points {
        let seen = viewsheds.iter().filter(|v| v.is_visible(px, py)).count();
        if seen < min_visible {
            continue;
        }
        covered += 1;
        match sightline_min_angle(&cams, (px as f64, py as f64)) {
            Ok(angle) => errors.push(angle),
            Err(e) => trace!("skipping sample ({}, {}): {}", px, py, e),
        }
    }

    if errors.is_empty() {
        return None;
    }

    let mean = errors.iter().sum::<f64>() / errors.len() as f64;
    errors.sort_by(f64::total_cmp);
    let p95 = percentile(&errors, 95.0)?;

    Some(EvaluationResult {
        cams: sites.iter().map(|s| s.id.clone()).collect(),
        coverage: covered as f64 / sample_points.len() as f64,
        mean_error_degrees: mean.to_degrees(),
        p95_error_degrees: p95.to_degrees(),
    })
}

fn compare(a: &EvaluationResult, b: &EvaluationResult, order: RankingOrder) -> Ordering {
    let by_error = match order {
        RankingOrder::LowestError => a.p95_error_degrees.total_cmp(&b.p95_error_degrees),
        RankingOrder::WidestIntersection => b.p95_error_degrees.total_cmp(&a.p95_error_degrees),
    };
    by_error.then_with(|| b.coverage.total_cmp(&a.coverage))
}

/// Stable sort by the ranking order; equal keys keep enumeration order.
pub fn rank_results(results: &mut [EvaluationResult], order: RankingOrder) {
    results.sort_by(|a, b| compare(a, b, order));
}

// -- Search --------------------------------------------------------

/// Evaluate and rank every combination of `options.camera_count` candidates.
///
/// `viewsheds[i]` must belong to `candidates[i]`. With acceptance criteria
/// set, the search runs serially and stops at the first combination that
/// meets them; only the combinations evaluated so far are ranked.
pub fn optimize(
    candidates: &[CandidateSite],
    viewsheds: &[VisibilityGrid],
    sample_points: &[(usize, usize)],
    options: &SearchOptions,
) -> Result<Vec<EvaluationResult>> {
    check_inputs(candidates, viewsheds, sample_points)?;
    if options.camera_count < 2 || options.min_visible > options.camera_count {
        return Err(EngineError::InvalidParams(format!(
            "cannot require {} of {} cameras",
            options.min_visible, options.camera_count
        )));
    }

    let evaluate = |combo: &[usize]| {
        let sites: Vec<&CandidateSite> = combo.iter().map(|&i| &candidates[i]).collect();
        let sheds: Vec<&VisibilityGrid> = combo.iter().map(|&i| &viewsheds[i]).collect();
        evaluate_combination(&sites, &sheds, sample_points, options.min_visible)
    };

    let combos = Combinations::new(candidates.len(), options.camera_count);
    let mut results: Vec<EvaluationResult> = match &options.acceptance {
        None => {
            let combos: Vec<Vec<usize>> = combos.collect();
            debug!("evaluating {} combinations", combos.len());
            combos
                .par_iter()
                .map(|c| evaluate(c))
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        }
        Some(criteria) => {
            let mut evaluated = Vec::new();
            for combo in combos {
                if let Some(result) = evaluate(&combo) {
                    let accepted = criteria.accepts(&result);
                    evaluated.push(result);
                    if accepted {
                        info!(
                            "accepted {} after {} scored combinations",
                            evaluated[evaluated.len() - 1].cams.join(","),
                            evaluated.len()
                        );
                        break;
                    }
                }
            }
            evaluated
        }
    };

    rank_results(&mut results, options.ranking);
    info!(
        "{} scored combinations from {} candidates over {} sample points",
        results.len(),
        candidates.len(),
        sample_points.len()
    );
    Ok(results)
}

fn check_inputs(
    candidates: &[CandidateSite],
    viewsheds: &[VisibilityGrid],
    sample_points: &[(usize, usize)],
) -> Result<()> {
    if candidates.len() != viewsheds.len() {
        return Err(EngineError::DimensionMismatch {
            expected: format!("{} viewsheds", candidates.len()),
            actual: format!("{} viewsheds", viewsheds.len()),
        });
    }
    let Some(first) = viewsheds.first() else {
        return Ok(());
    };
    let dims = (first.width(), first.height());
    for (site, vis) in candidates.iter().zip(viewsheds) {
        if (vis.width(), vis.height()) != dims {
            return Err(EngineError::DimensionMismatch {
                expected: format!("{}x{} viewshed", dims.0, dims.1),
                actual: format!("{}x{} viewshed", vis.width(), vis.height()),
            });
        }
        if vis.observer() != (site.x, site.y) {
            return Err(EngineError::DimensionMismatch {
                expected: format!("viewshed from ({}, {}) for {}", site.x, site.y, site.id),
                actual: format!("viewshed from {:?}", vis.observer()),
            });
        }
    }
    if let Some(&(x, y)) = sample_points.iter().find(|&&(x, y)| x >= dims.0 || y >= dims.1) {
        return Err(EngineError::DimensionMismatch {
            expected: format!("sample points inside {}x{}", dims.0, dims.1),
            actual: format!("sample point ({}, {})", x, y),
        });
    }
    Ok(())
}
