use nalgebra::{DMatrix, DVector, Vector3, Vector6};

use crate::kinematics::ContactPoint;

/// Converts a mixed-frame contact force (pure translation, origin at the
/// contact point) into an inertial-frame spatial wrench `[force; moment]`,
/// with `moment = position x force`.
pub fn mixed_to_inertial_wrench(position: Vector3<f64>, force_linear: Vector3<f64>) -> Vector6<f64> {
    let moment = position.cross(&force_linear);
    Vector6::new(
        force_linear.x,
        force_linear.y,
        force_linear.z,
        moment.x,
        moment.y,
        moment.z,
    )
}

/// Reshapes the flat L-BFGS solution (`3` entries per contact point, in
/// the same order as `points`) into an `n_c x 6` matrix of inertial-frame
/// wrenches, one row per point.
///
/// Inactive points are forced to the zero wrench regardless of what the
/// solver produced for their (supposedly already-zero) subspace. This is
/// a belt-and-suspenders re-assertion of the zeroing invariant at the
/// crate's output boundary, not a correction of solver behavior.
pub fn project_forces(solution: &DVector<f64>, points: &[ContactPoint]) -> DMatrix<f64> {
    let n_c = points.len();
    let mut wrenches = DMatrix::<f64>::zeros(n_c, 6);

    for (i, point) in points.iter().enumerate() {
        if !point.is_active() {
            continue;
        }

        let force_linear = Vector3::new(solution[3 * i], solution[3 * i + 1], solution[3 * i + 2]);
        let wrench = mixed_to_inertial_wrench(point.position, force_linear);
        wrenches.row_mut(i).copy_from_slice(wrench.as_slice());
    }

    wrenches
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;

    fn point(position: Vector3<f64>, penetration: f64) -> ContactPoint {
        ContactPoint {
            position,
            velocity: Vector3::zeros(),
            penetration,
            owner_link: 0,
            jacobian: DMatrix::zeros(3, 6),
            jacobian_dot: DMatrix::zeros(3, 6),
            world_transform: Matrix4::identity(),
        }
    }

    #[test]
    fn wrench_moment_is_position_cross_force() {
        let position = Vector3::new(1.0, 0.0, 0.0);
        let force = Vector3::new(0.0, 0.0, 1.0);
        let wrench = mixed_to_inertial_wrench(position, force);
        assert_eq!(wrench.fixed_rows::<3>(0).into_owned(), force);
        assert_eq!(wrench.fixed_rows::<3>(3).into_owned(), position.cross(&force));
    }

    #[test]
    fn inactive_point_row_is_zero_regardless_of_solution() {
        let points = vec![point(Vector3::new(1.0, 2.0, 3.0), 0.01)];
        let solution = DVector::from_row_slice(&[5.0, 6.0, 7.0]);
        let wrenches = project_forces(&solution, &points);
        assert_eq!(wrenches.row(0), DMatrix::zeros(1, 6).row(0));
    }

    #[test]
    fn active_point_row_matches_expected_wrench() {
        let points = vec![point(Vector3::new(0.0, 0.0, -0.01), -0.01)];
        let solution = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        let wrenches = project_forces(&solution, &points);
        let expected = mixed_to_inertial_wrench(Vector3::new(0.0, 0.0, -0.01), Vector3::new(1.0, 2.0, 3.0));
        for c in 0..6 {
            assert_eq!(wrenches[(0, c)], expected[c]);
        }
    }

    #[test]
    fn two_points_occupy_independent_rows() {
        let points = vec![
            point(Vector3::new(0.0, 0.0, -0.01), -0.01),
            point(Vector3::new(1.0, 0.0, -0.01), -0.01),
        ];
        let solution = DVector::from_row_slice(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let wrenches = project_forces(&solution, &points);
        assert_eq!(wrenches[(0, 0)], 1.0);
        assert_eq!(wrenches[(1, 1)], 1.0);
    }
}
