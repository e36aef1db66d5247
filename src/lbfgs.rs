use std::collections::VecDeque;

use nalgebra::{DMatrix, DVector};

use crate::error::ContactSolverError;

/// Options for the L-BFGS loop. Every field is a concrete scalar, so the
/// struct is trivially comparable and safe to use as a cache key by an
/// embedding application, the same requirement the source model enforces
/// at runtime by hashing an options dict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbfgsOptions {
    /// Gradient-norm convergence tolerance.
    pub tol: f64,
    /// Maximum number of L-BFGS iterations.
    pub maxiter: usize,
    /// Number of `(s, y)` curvature pairs retained.
    pub memory_size: usize,
    /// Initial step length tried by the line search.
    pub initial_step: f64,
    /// Armijo sufficient-decrease coefficient.
    pub c1: f64,
    /// Wolfe curvature coefficient.
    pub c2: f64,
    /// Maximum number of backtracking steps per line search.
    pub max_line_search_steps: usize,
    /// Step-length shrink factor used while backtracking.
    pub backtracking_shrink: f64,
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            tol: 1e-6,
            maxiter: 50,
            memory_size: 10,
            initial_step: 1.0,
            c1: 1e-4,
            c2: 0.9,
            max_line_search_steps: 20,
            backtracking_shrink: 0.5,
        }
    }
}

impl LbfgsOptions {
    pub fn validated(self) -> Result<Self, ContactSolverError> {
        let reason = if self.tol <= 0.0 {
            Some("tol must be > 0")
        } else if self.memory_size == 0 {
            Some("memory_size must be > 0")
        } else if self.initial_step <= 0.0 {
            Some("initial_step must be > 0")
        } else if !(0.0 < self.c1 && self.c1 < self.c2 && self.c2 < 1.0) {
            Some("solver options must satisfy 0 < c1 < c2 < 1")
        } else if self.max_line_search_steps == 0 {
            Some("max_line_search_steps must be > 0")
        } else if !(0.0 < self.backtracking_shrink && self.backtracking_shrink < 1.0) {
            Some("backtracking_shrink must be in (0, 1)")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ContactSolverError::InvalidSolverOptions { reason }),
            None => Ok(self),
        }
    }
}

/// The outcome of [`minimize`]: the best iterate found and enough state to
/// populate [`crate::ContactDiagnostics`].
#[derive(Debug, Clone)]
pub struct LbfgsResult {
    pub x: DVector<f64>,
    pub iterations: usize,
    pub final_gradient_norm: f64,
}

fn objective_and_gradient(a: &DMatrix<f64>, b: &DVector<f64>, x: &DVector<f64>) -> (f64, DVector<f64>) {
    let residual = a * x + b;
    let f = residual.dot(&residual);
    let grad = a.transpose() * residual * 2.0;
    (f, grad)
}

/// Two-loop recursion computing the L-BFGS search direction from the
/// curvature memory. Falls back to steepest descent when the memory is
/// empty (the first iteration) or the resulting direction is not a
/// descent direction.
fn search_direction(grad: &DVector<f64>, memory: &VecDeque<(DVector<f64>, DVector<f64>)>) -> DVector<f64> {
    if memory.is_empty() {
        return -grad;
    }

    let m = memory.len();
    let mut q = grad.clone();
    let mut alpha = vec![0.0; m];
    let mut rho = vec![0.0; m];

    for (i, (s, y)) in memory.iter().enumerate().rev() {
        rho[i] = 1.0 / y.dot(s);
        alpha[i] = rho[i] * s.dot(&q);
        q -= y * alpha[i];
    }

    let (s_last, y_last) = memory.back().expect("memory checked non-empty above");
    let gamma = s_last.dot(y_last) / y_last.dot(y_last);
    let mut z = q * gamma;

    for (i, (s, y)) in memory.iter().enumerate() {
        let beta = rho[i] * y.dot(&z);
        z += s * (alpha[i] - beta);
    }

    let direction = -z;
    if direction.dot(grad) < 0.0 {
        direction
    } else {
        -grad
    }
}

/// Backtracking line search. Tries to satisfy the (weak) Wolfe conditions
/// starting from `options.initial_step`; if no step within
/// `max_line_search_steps` satisfies at least the Armijo sufficient
/// decrease condition without increasing the objective, the search
/// returns a zero step so the caller's objective value never increases.
/// This keeps the outer loop's objective sequence non-increasing even
/// when the direction is poorly scaled.
#[allow(clippy::too_many_arguments)]
fn line_search(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    x: &DVector<f64>,
    f0: f64,
    grad0: &DVector<f64>,
    direction: &DVector<f64>,
    options: &LbfgsOptions,
) -> (DVector<f64>, f64, DVector<f64>) {
    let directional_derivative = grad0.dot(direction);

    let mut best: Option<(DVector<f64>, f64, DVector<f64>)> = None;
    let mut step = options.initial_step;

    for _ in 0..options.max_line_search_steps {
        let candidate_x = x + direction * step;
        let (candidate_f, candidate_grad) = objective_and_gradient(a, b, &candidate_x);

        let armijo = candidate_f <= f0 + options.c1 * step * directional_derivative;
        if armijo && candidate_f <= f0 {
            let curvature = candidate_grad.dot(direction) >= options.c2 * directional_derivative;
            if curvature {
                return (candidate_x, candidate_f, candidate_grad);
            }
            best = Some((candidate_x, candidate_f, candidate_grad));
        }

        step *= options.backtracking_shrink;
    }

    best.unwrap_or_else(|| (x.clone(), f0, grad0.clone()))
}

/// Minimizes `f(x) = ||A x + b||^2` with L-BFGS, starting from `x0`.
///
/// The continuation predicate is `(k == 0) || (k < maxiter && ||grad|| >=
/// tol)`: the `k == 0` disjunct forces at least one iteration even if the
/// warm start already satisfies the tolerance, so the returned state
/// always reflects at least one curvature update.
pub fn minimize(a: &DMatrix<f64>, b: &DVector<f64>, x0: DVector<f64>, options: &LbfgsOptions) -> LbfgsResult {
    let mut x = x0;
    let (mut f, mut grad) = objective_and_gradient(a, b, &x);
    let mut memory: VecDeque<(DVector<f64>, DVector<f64>)> = VecDeque::with_capacity(options.memory_size);
    let mut k = 0usize;

    while k == 0 || (k < options.maxiter && grad.norm() >= options.tol) {
        let direction = search_direction(&grad, &memory);
        let (new_x, new_f, new_grad) = line_search(a, b, &x, f, &grad, &direction, options);

        let s = &new_x - &x;
        let y = &new_grad - &grad;
        let curvature = s.dot(&y);
        if curvature > 1e-10 {
            if memory.len() == options.memory_size {
                memory.pop_front();
            }
            memory.push_back((s, y));
        }

        x = new_x;
        f = new_f;
        grad = new_grad;
        k += 1;

        if k >= options.maxiter && grad.norm() >= options.tol {
            log::debug!(
                "L-BFGS reached maxiter={} without satisfying tol={} (||grad||={})",
                options.maxiter,
                options.tol,
                grad.norm()
            );
        }
    }

    LbfgsResult {
        x,
        iterations: k,
        final_gradient_norm: grad.norm(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn minimizes_simple_quadratic() {
        let a = DMatrix::<f64>::identity(3, 3);
        let b = DVector::from_row_slice(&[1.0, -2.0, 3.0]);
        let result = minimize(&a, &b, DVector::zeros(3), &LbfgsOptions::default());
        assert_relative_eq!(result.x[0], -1.0, epsilon = 1e-4);
        assert_relative_eq!(result.x[1], 2.0, epsilon = 1e-4);
        assert_relative_eq!(result.x[2], -3.0, epsilon = 1e-4);
    }

    #[test]
    fn zero_iterations_when_maxiter_zero_still_runs_one_step() {
        let a = DMatrix::<f64>::identity(2, 2);
        let b = DVector::from_row_slice(&[1.0, 1.0]);
        let options = LbfgsOptions {
            maxiter: 0,
            ..Default::default()
        };
        let result = minimize(&a, &b, DVector::zeros(2), &options);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn objective_is_non_increasing_along_iterates() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0]);
        let b = DVector::from_row_slice(&[1.0, -2.0, 0.5]);
        let options = LbfgsOptions::default();

        let mut x = DVector::<f64>::zeros(3);
        let mut prev_f = {
            let r = &a * &x + &b;
            r.dot(&r)
        };
        let mut memory: VecDeque<(DVector<f64>, DVector<f64>)> = VecDeque::new();
        let mut grad = objective_and_gradient(&a, &b, &x).1;

        for _ in 0..options.maxiter {
            let direction = search_direction(&grad, &memory);
            let (new_x, new_f, new_grad) = line_search(&a, &b, &x, prev_f, &grad, &direction, &options);
            assert!(new_f <= prev_f + 1e-9);
            let s = &new_x - &x;
            let y = &new_grad - &grad;
            if s.dot(&y) > 1e-10 {
                memory.push_back((s, y));
            }
            x = new_x;
            prev_f = new_f;
            grad = new_grad;
        }
    }

    #[test]
    fn options_validation_rejects_bad_wolfe_constants() {
        let options = LbfgsOptions {
            c1: 0.9,
            c2: 0.1,
            ..Default::default()
        };
        assert!(options.validated().is_err());
    }
}
