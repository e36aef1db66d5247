use nalgebra::Vector3;
use rayon::prelude::*;

use crate::terrain::TerrainProbe;

/// Signed penetration `δ = (p - terrain(p_xy)) · n̂` for each given point.
///
/// A point with `δ >= 0` is inactive for this step. Terrain queries that
/// return non-finite values propagate into a non-finite `δ`, which simply
/// fails the `δ < 0` activity test downstream. There is no error path
/// here.
pub fn detect_penetrations(positions: &[Vector3<f64>], terrain: &dyn TerrainProbe) -> Vec<f64> {
    positions
        .par_iter()
        .map(|p| {
            let h = Vector3::new(0.0, 0.0, p.z - terrain.height(p.x, p.y));
            h.dot(&terrain.normal(p.x, p.y))
        })
        .collect()
}

/// A point is active (in contact) this step iff its penetration is negative.
pub fn is_active(penetration: f64) -> bool {
    penetration < 0.0
}
