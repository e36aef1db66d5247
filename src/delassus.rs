use nalgebra::{DMatrix, DVector, SVD};

use crate::kinematics::{ContactPoint, DynamicsSnapshot};
use crate::regularizer::RegularizerOutput;

/// Assembles the regularized Delassus system `A x + b` from the stacked
/// per-contact Jacobians, the dynamics snapshot, and the regularizer
/// output.
///
/// `G = J M^-1 J^T` is computed via a minimum-norm least-squares solve of
/// `M X = J^T` rather than an explicit inverse of `M`, so a singular or
/// near-singular mass matrix (e.g. from redundant contacts) degrades
/// gracefully instead of panicking.
pub fn assemble(
    points: &[ContactPoint],
    snapshot: &DynamicsSnapshot,
    regularized: &[RegularizerOutput],
) -> (DMatrix<f64>, DVector<f64>) {
    let n_c = points.len();
    let nv = snapshot.mass_matrix.nrows();

    let mut j_stack = DMatrix::<f64>::zeros(3 * n_c, nv);
    let mut j_dot_stack = DMatrix::<f64>::zeros(3 * n_c, nv);
    for (i, point) in points.iter().enumerate() {
        j_stack.view_mut((3 * i, 0), (3, nv)).copy_from(&point.jacobian);
        j_dot_stack
            .view_mut((3 * i, 0), (3, nv))
            .copy_from(&point.jacobian_dot);
    }

    let mut a_ref = DVector::<f64>::zeros(3 * n_c);
    let mut r_diag = DVector::<f64>::zeros(3 * n_c);
    for (i, reg) in regularized.iter().enumerate() {
        a_ref.rows_mut(3 * i, 3).copy_from(&reg.a_ref);
        r_diag.rows_mut(3 * i, 3).copy_from(&reg.r_diag);
    }

    let svd = SVD::new(snapshot.mass_matrix.clone(), true, true);
    let m_inv_j_t = svd
        .solve(&j_stack.transpose(), 1e-12)
        .unwrap_or_else(|_| DMatrix::zeros(nv, 3 * n_c));

    let mut a = &j_stack * &m_inv_j_t;
    for i in 0..3 * n_c {
        a[(i, i)] += r_diag[i];
    }

    let b = &j_stack * &snapshot.free_acceleration + &j_dot_stack * &snapshot.velocity - &a_ref;

    (a, b)
}
