use nalgebra::{DMatrix, DVector, Vector3};

use crate::delassus;
use crate::error::ContactSolverError;
use crate::kinematics::{ContactPoint, DynamicsSnapshot, KinematicsProvider};
use crate::lbfgs::{self, LbfgsOptions};
use crate::params::ContactParams;
use crate::penetration::detect_penetrations;
use crate::projector::project_forces;
use crate::regularizer::regularize;
use crate::terrain::TerrainProbe;

/// Solver diagnostics. Always populated (the distilled model leaves this
/// all-zero): `iterations` and `final_gradient_norm` come straight out of
/// the L-BFGS state, so callers can tell convergence from a stall without
/// re-deriving anything.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct ContactDiagnostics {
    pub iterations: usize,
    pub final_gradient_norm: f64,
}

fn check_shape(what: &'static str, expected: usize, actual: usize) -> Result<(), ContactSolverError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ContactSolverError::ShapeMismatch { what, expected, actual })
    }
}

/// Computes inertial-frame contact wrenches for the given enabled contact
/// points.
///
/// Returns an empty `0 x 6` matrix with zeroed diagnostics, without
/// invoking L-BFGS at all, when `enabled_point_indices` is empty.
pub fn compute_contact_forces(
    kinematics: &dyn KinematicsProvider,
    terrain: &dyn TerrainProbe,
    params: &ContactParams,
    enabled_point_indices: &[usize],
    link_forces: Option<&DMatrix<f64>>,
    joint_forces: Option<&DVector<f64>>,
    solver: &LbfgsOptions,
) -> Result<(DMatrix<f64>, ContactDiagnostics), ContactSolverError> {
    solver.validated()?;

    if enabled_point_indices.is_empty() {
        log::debug!("no enabled contact points, skipping L-BFGS");
        return Ok((
            DMatrix::zeros(0, 6),
            ContactDiagnostics {
                iterations: 0,
                final_gradient_norm: 0.0,
            },
        ));
    }

    let num_links = kinematics.num_links();
    let num_joints = kinematics.num_joints();

    let link_forces_owned = match link_forces {
        Some(lf) => {
            check_shape("link_forces rows", num_links, lf.nrows())?;
            check_shape("link_forces cols", 6, lf.ncols())?;
            lf.clone()
        }
        None => DMatrix::zeros(num_links, 6),
    };
    let joint_forces_owned = match joint_forces {
        Some(jf) => {
            check_shape("joint_forces len", num_joints, jf.len())?;
            jf.clone()
        }
        None => DVector::zeros(num_joints),
    };

    let (positions, velocities) = kinematics.point_positions_velocities(enabled_point_indices);
    let transforms = kinematics.point_world_transforms(enabled_point_indices);
    let jacobians = kinematics.point_translational_jacobians(enabled_point_indices);
    let jacobian_derivatives = kinematics.point_translational_jacobian_derivatives(enabled_point_indices);
    let penetrations = detect_penetrations(&positions, terrain);

    let nv = kinematics.num_velocities();
    let points: Vec<ContactPoint> = enabled_point_indices
        .iter()
        .enumerate()
        .map(|(i, &idx)| {
            let active = penetrations[i] < 0.0;
            let zero = DMatrix::<f64>::zeros(3, nv);
            ContactPoint {
                position: positions[i],
                velocity: velocities[i],
                penetration: penetrations[i],
                owner_link: kinematics.point_owner_link(idx),
                jacobian: if active { jacobians[i].clone() } else { zero.clone() },
                jacobian_dot: if active { jacobian_derivatives[i].clone() } else { zero },
                world_transform: transforms[i],
            }
        })
        .collect();

    let snapshot = DynamicsSnapshot {
        velocity: kinematics.generalized_velocity(),
        free_acceleration: kinematics.free_generalized_acceleration(&link_forces_owned, &joint_forces_owned),
        mass_matrix: kinematics.mass_matrix(),
    };

    let regularized = regularize(&points, kinematics, params);
    let (a, b) = delassus::assemble(&points, &snapshot, &regularized);

    // Warm start from the linear Hunt/Crossley force prediction, not a_ref.
    let n_c = points.len();
    let mut x0 = DVector::<f64>::zeros(3 * n_c);
    for (i, (point, reg)) in points.iter().zip(regularized.iter()).enumerate() {
        let hunt_crossley = Vector3::new(0.0, 0.0, reg.k_f * point.penetration) + point.velocity * reg.d_f;
        x0.rows_mut(3 * i, 3).copy_from(&hunt_crossley);
    }

    let result = lbfgs::minimize(&a, &b, x0, solver);
    let wrenches = project_forces(&result.x, &points);

    Ok((
        wrenches,
        ContactDiagnostics {
            iterations: result.iterations,
            final_gradient_norm: result.final_gradient_norm,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::TestKinematics;
    use crate::terrain::FlatTerrain;
    use approx::assert_relative_eq;

    #[test]
    fn empty_enabled_set_short_circuits_without_lbfgs() {
        let kinematics = TestKinematics::single_link_identity(3, 6);
        let terrain = FlatTerrain::default();
        let params = ContactParams::default();
        let solver = LbfgsOptions::default();

        let (wrenches, diagnostics) =
            compute_contact_forces(&kinematics, &terrain, &params, &[], None, None, &solver).unwrap();

        assert_eq!(wrenches.nrows(), 0);
        assert_eq!(wrenches.ncols(), 6);
        assert_eq!(diagnostics.iterations, 0);
    }

    #[test]
    fn single_active_point_produces_nonzero_upward_force() {
        let mut kinematics = TestKinematics::single_link_identity(1, 6);
        kinematics.positions[0] = nalgebra::Vector3::new(0.0, 0.0, -0.01);
        let terrain = FlatTerrain::default();
        let params = ContactParams::default();
        let solver = LbfgsOptions::default();

        let (wrenches, diagnostics) =
            compute_contact_forces(&kinematics, &terrain, &params, &[0], None, None, &solver).unwrap();

        assert_eq!(wrenches.nrows(), 1);
        assert!(wrenches[(0, 2)] > 0.0, "expected an upward normal force, got {}", wrenches[(0, 2)]);
        assert!(diagnostics.iterations >= 1);
    }

    #[test]
    fn inactive_point_yields_zero_row() {
        let mut kinematics = TestKinematics::single_link_identity(1, 6);
        kinematics.positions[0] = nalgebra::Vector3::new(0.0, 0.0, 0.05);
        let terrain = FlatTerrain::default();
        let params = ContactParams::default();
        let solver = LbfgsOptions::default();

        let (wrenches, _) = compute_contact_forces(&kinematics, &terrain, &params, &[0], None, None, &solver).unwrap();
        for c in 0..6 {
            assert_relative_eq!(wrenches[(0, c)], 0.0);
        }
    }

    #[test]
    fn two_points_mixed_active_inactive_only_active_row_nonzero() {
        let mut kinematics = TestKinematics::single_link_identity(2, 6);
        kinematics.positions[0] = nalgebra::Vector3::new(0.0, 0.0, -0.02);
        kinematics.positions[1] = nalgebra::Vector3::new(1.0, 0.0, 0.02);
        let terrain = FlatTerrain::default();
        let params = ContactParams::default();
        let solver = LbfgsOptions::default();

        let (wrenches, _) =
            compute_contact_forces(&kinematics, &terrain, &params, &[0, 1], None, None, &solver).unwrap();

        assert!(wrenches[(0, 2)] > 0.0);
        for c in 0..6 {
            assert_relative_eq!(wrenches[(1, c)], 0.0);
        }
    }

    #[test]
    fn shape_mismatched_link_forces_is_rejected() {
        let kinematics = TestKinematics::single_link_identity(1, 6);
        let terrain = FlatTerrain::default();
        let params = ContactParams::default();
        let solver = LbfgsOptions::default();
        let bad_link_forces = DMatrix::<f64>::zeros(5, 6);

        let result = compute_contact_forces(
            &kinematics,
            &terrain,
            &params,
            &[0],
            Some(&bad_link_forces),
            None,
            &solver,
        );
        assert!(matches!(result, Err(ContactSolverError::ShapeMismatch { .. })));
    }

    #[test]
    fn invalid_solver_options_is_rejected() {
        let kinematics = TestKinematics::single_link_identity(1, 6);
        let terrain = FlatTerrain::default();
        let params = ContactParams::default();
        let solver = LbfgsOptions {
            tol: -1.0,
            ..Default::default()
        };

        let result = compute_contact_forces(&kinematics, &terrain, &params, &[0], None, None, &solver);
        assert!(matches!(result, Err(ContactSolverError::InvalidSolverOptions { .. })));
    }

    #[test]
    fn ordering_of_enabled_points_does_not_change_per_point_results() {
        let mut kinematics = TestKinematics::single_link_identity(2, 6);
        kinematics.positions[0] = nalgebra::Vector3::new(0.0, 0.0, -0.02);
        kinematics.positions[1] = nalgebra::Vector3::new(1.0, 0.0, -0.03);
        let terrain = FlatTerrain::default();
        let params = ContactParams::default();
        let solver = LbfgsOptions::default();

        let (forward, _) =
            compute_contact_forces(&kinematics, &terrain, &params, &[0, 1], None, None, &solver).unwrap();
        let (reversed, _) =
            compute_contact_forces(&kinematics, &terrain, &params, &[1, 0], None, None, &solver).unwrap();

        for c in 0..6 {
            assert_relative_eq!(forward[(0, c)], reversed[(1, c)], epsilon = 1e-9);
            assert_relative_eq!(forward[(1, c)], reversed[(0, c)], epsilon = 1e-9);
        }
    }
}
