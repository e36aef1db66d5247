use nalgebra::{DMatrix, DVector};

use crate::error::ContactSolverError;
use crate::kinematics::KinematicsProvider;
use crate::lbfgs::LbfgsOptions;
use crate::params::ContactParams;
use crate::solver::{compute_contact_forces, ContactDiagnostics};
use crate::terrain::TerrainProbe;

/// Bundles a [`ContactParams`], a [`TerrainProbe`], and [`LbfgsOptions`]
/// for repeated use against varying kinematic snapshots, mirroring the
/// source model's `RelaxedRigidContacts::build`. The free function
/// [`compute_contact_forces`] remains the primary entry point; this is a
/// convenience wrapper around it for callers that reuse the same terrain
/// and tuning across many steps.
pub struct ContactSolver {
    pub params: ContactParams,
    pub terrain: Box<dyn TerrainProbe>,
    pub solver_options: LbfgsOptions,
}

impl ContactSolver {
    /// Builds a solver, validating `solver_options` up front so a bad
    /// configuration fails at construction rather than on first use.
    pub fn new(
        params: ContactParams,
        terrain: Box<dyn TerrainProbe>,
        solver_options: LbfgsOptions,
    ) -> Result<Self, ContactSolverError> {
        let solver_options = solver_options.validated()?;
        Ok(Self {
            params,
            terrain,
            solver_options,
        })
    }

    pub fn compute_contact_forces(
        &self,
        kinematics: &dyn KinematicsProvider,
        enabled_point_indices: &[usize],
        link_forces: Option<&DMatrix<f64>>,
        joint_forces: Option<&DVector<f64>>,
    ) -> Result<(DMatrix<f64>, ContactDiagnostics), ContactSolverError> {
        compute_contact_forces(
            kinematics,
            self.terrain.as_ref(),
            &self.params,
            enabled_point_indices,
            link_forces,
            joint_forces,
            &self.solver_options,
        )
    }
}
