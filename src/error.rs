use thiserror::Error;

/// Errors raised at the boundary of the contact solver.
///
/// Numerical hazards (NaN/Inf produced by degenerate inputs) are not
/// represented here. They are allowed to propagate into the output, per
/// the branch-free formulation the solver is built around.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ContactSolverError {
    #[error("invalid contact params: {reason}")]
    InvalidParams { reason: &'static str },

    #[error("invalid solver options: {reason}")]
    InvalidSolverOptions { reason: &'static str },

    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}
