//! Angular triangulation quality.
//!
//! The quality proxy for a target is the smallest angle between any two
//! camera sightlines meeting at it. Near-zero angles (and, for a pair,
//! near-π angles) mean the bearings barely constrain the intersection.

use crate::error::{EngineError, Result};

pub type Vec2 = (f64, f64);

/// Angle between two plane vectors, in `[0, π]`.
///
/// The cosine is clamped to `[-1, 1]` before `acos` so rounding can never
/// leave the domain. A zero-length input is ill-conditioned.
pub fn angle_between(a: Vec2, b: Vec2) -> Result<f64> {
    let norm_a = a.0.hypot(a.1);
    let norm_b = b.0.hypot(b.1);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(EngineError::IllConditionedGeometry);
    }
    let (ua, ub) = ((a.0 / norm_a, a.1 / norm_a), (b.0 / norm_b, b.1 / norm_b));
    let cos = (ua.0 * ub.0 + ua.1 * ub.1).clamp(-1.0, 1.0);
    Ok(cos.acos())
}

/// Minimum pairwise angle between the three sightlines `target - cam`.
///
/// Symmetric in the camera arguments.
pub fn triangulation_error(cam_a: Vec2, cam_b: Vec2, cam_c: Vec2, target: Vec2) -> Result<f64> {
    sightline_min_angle(&[cam_a, cam_b, cam_c], target)
}

/// Minimum pairwise sightline angle at `target` for any number of cameras.
///
/// Fewer than two cameras define no angle and are ill-conditioned.
pub fn sightline_min_angle(cams: &[Vec2], target: Vec2) -> Result<f64> {
    if cams.len() < 2 {
        return Err(EngineError::IllConditionedGeometry);
    }
    let sightlines: Vec<Vec2> = cams
        .iter()
        .map(|&(cx, cy)| (target.0 - cx, target.1 - cy))
        .collect();

    let mut min_angle = f64::INFINITY;
    for i in 0..sightlines.len() {
        for j in i + 1..sightlines.len() {
            min_angle = min_angle.min(angle_between(sightlines[i], sightlines[j])?);
        }
    }
    Ok(min_angle)
}
