use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use crate::kinematics::{ContactPoint, KinematicsProvider};
use crate::params::ContactParams;

const REGULARIZATION_EPSILON: f64 = 1e-12;

/// Per-point output of the impedance/regularization law: the reference
/// acceleration fed into the Delassus right-hand side, the diagonal
/// regularization block added to `A`, and the effective stiffness/damping
/// used both here and by the L-BFGS warm start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularizerOutput {
    pub a_ref: Vector3<f64>,
    pub r_diag: Vector3<f64>,
    pub k_f: f64,
    pub d_f: f64,
}

/// The impedance profile ξ(δ), as a function of the scalar `x = |δ| / width`.
fn impedance_shape(x: f64, params: &ContactParams) -> f64 {
    let mid = params.midpoint;
    let p = params.power;

    let a = x.powf(p) / mid.powf(p - 1.0);
    let b = 1.0 - (1.0 - x).powf(p) / (1.0 - mid).powf(p - 1.0);
    if x < mid {
        a
    } else {
        b
    }
}

/// Computes the impedance ξ for a given penetration.
fn impedance(penetration: f64, params: &ContactParams) -> f64 {
    let x = penetration.abs() / params.width;
    let y = impedance_shape(x, params);
    let raw = (params.d_min + y * (params.d_max - params.d_min)).clamp(params.d_min, params.d_max);
    if x > 1.0 {
        params.d_max
    } else {
        raw
    }
}

/// Effective stiffness/damping, picking the explicit-spring-damper branch
/// when the configured value is negative, and the (Ω, ζ)-derived branch
/// otherwise.
fn effective_stiffness_damping(params: &ContactParams) -> (f64, f64) {
    let k_f = if params.stiffness < 0.0 {
        -params.stiffness / params.d_max.powi(2)
    } else {
        1.0 / (params.d_max * params.time_constant * params.damping_coefficient).powi(2)
    };

    let d_f = if params.damping < 0.0 {
        -params.damping / params.d_max
    } else {
        2.0 / (params.d_max * params.time_constant)
    };

    (k_f, d_f)
}

/// Computes the full regularizer output for a single contact point.
///
/// `link_inertia` is the owning link's 6x6 spatial inertia; only its
/// upper-left 3x3 translational block is used.
pub fn regularize_point(
    penetration: f64,
    velocity: Vector3<f64>,
    link_inertia_translational: Matrix3<f64>,
    params: &ContactParams,
) -> RegularizerOutput {
    let position = Vector3::new(0.0, 0.0, penetration);

    let xi = impedance(penetration, params);
    let (k_f, d_f) = effective_stiffness_damping(params);

    let a_ref = -(velocity * d_f + position * (k_f * xi));

    let inv_inertia_diag = Vector3::new(
        1.0 / link_inertia_translational[(0, 0)],
        1.0 / link_inertia_translational[(1, 1)],
        1.0 / link_inertia_translational[(2, 2)],
    );
    let mu = params.mu;
    let r_scale = (2.0 * mu * mu * (1.0 - xi) / (xi + REGULARIZATION_EPSILON)) * (1.0 + mu * mu);
    let r_diag = inv_inertia_diag * r_scale;

    let active = if penetration < 0.0 { 1.0 } else { 0.0 };

    RegularizerOutput {
        a_ref: a_ref * active,
        r_diag: r_diag * active,
        k_f: k_f * active,
        d_f: d_f * active,
    }
}

/// Maps [`regularize_point`] over every contact point, in parallel,
/// looking up each point's owning link's translational inertia block.
pub fn regularize(
    points: &[ContactPoint],
    kinematics: &dyn KinematicsProvider,
    params: &ContactParams,
) -> Vec<RegularizerOutput> {
    points
        .par_iter()
        .map(|point| {
            let inertia = kinematics.link_spatial_inertia(point.owner_link);
            let translational = inertia.fixed_view::<3, 3>(0, 0).into_owned();
            regularize_point(point.penetration, point.velocity, translational, params)
        })
        .collect()
}
