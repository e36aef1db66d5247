use nalgebra::{DMatrix, DVector, Matrix4, Matrix6, Vector3};

/// Read-only adapter over an external rigid-body library.
///
/// This trait is the seam between the contact solver and whatever forward
/// kinematics / dynamics library the embedding simulation uses (ABA, CRB,
/// RNEA, spatial-inertia composition, velocity-representation conversions,
/// none of that lives in this crate). All per-point arrays are indexed
/// in the caller-supplied enabled-set order, not in the provider's own
/// internal point numbering.
pub trait KinematicsProvider: Send + Sync {
    /// World positions and mixed-frame linear velocities of the given
    /// collidable points, one row per entry of `enabled`.
    fn point_positions_velocities(&self, enabled: &[usize]) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>);

    /// World transforms `W_H_C` of the implicit contact frames, one per
    /// entry of `enabled`.
    fn point_world_transforms(&self, enabled: &[usize]) -> Vec<Matrix4<f64>>;

    /// Translational Jacobians (`3 x (6+n)`, mixed representation), one
    /// per entry of `enabled`.
    fn point_translational_jacobians(&self, enabled: &[usize]) -> Vec<DMatrix<f64>>;

    /// Time derivatives of the translational Jacobians, one per entry of
    /// `enabled`.
    fn point_translational_jacobian_derivatives(&self, enabled: &[usize]) -> Vec<DMatrix<f64>>;

    /// The `(6+n) x (6+n)` symmetric positive-definite mass matrix.
    fn mass_matrix(&self) -> DMatrix<f64>;

    /// Free generalized acceleration (gravity + bias + applied forces),
    /// in mixed representation.
    fn free_generalized_acceleration(
        &self,
        link_forces: &DMatrix<f64>,
        joint_forces: &DVector<f64>,
    ) -> DVector<f64>;

    /// Generalized velocity, in mixed representation.
    fn generalized_velocity(&self) -> DVector<f64>;

    /// The 6x6 spatial inertia of a link. Only the upper-left 3x3
    /// translational block is used by the core.
    fn link_spatial_inertia(&self, link_index: usize) -> Matrix6<f64>;

    /// The link that rigidly owns the given collidable point.
    fn point_owner_link(&self, point_index: usize) -> usize;

    fn num_links(&self) -> usize;
    fn num_joints(&self) -> usize;
    /// Size of the generalized velocity vector, `6 + num_joints()`.
    fn num_velocities(&self) -> usize;
}

/// A stored-data [`KinematicsProvider`] that performs no actual forward
/// kinematics or dynamics; it exists for tests, the benchmark, and as a
/// worked example of the trait's contract.
///
/// Applied forces are ignored by [`free_generalized_acceleration`] (this
/// fixture has no dynamics model to route them through). Real embeddings
/// wire up a library capable of ABA/CRB/RNEA instead.
///
/// [`free_generalized_acceleration`]: KinematicsProvider::free_generalized_acceleration
#[derive(Debug, Clone)]
pub struct TestKinematics {
    pub positions: Vec<Vector3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
    pub transforms: Vec<Matrix4<f64>>,
    pub jacobians: Vec<DMatrix<f64>>,
    pub jacobian_derivatives: Vec<DMatrix<f64>>,
    pub mass_matrix: DMatrix<f64>,
    pub free_acceleration: DVector<f64>,
    pub velocity: DVector<f64>,
    pub link_inertias: Vec<Matrix6<f64>>,
    pub owner_links: Vec<usize>,
    pub num_joints: usize,
}

impl TestKinematics {
    /// Builds a fixture with `n_points` collidable points all owned by a
    /// single free-floating link (link 0), with an identity mass matrix
    /// sized `num_velocities x num_velocities` and zero free acceleration
    /// and generalized velocity. Individual fields can be overwritten
    /// after construction to set up specific scenarios.
    pub fn single_link_identity(n_points: usize, num_velocities: usize) -> Self {
        let identity_jacobian = {
            let mut j = DMatrix::<f64>::zeros(3, num_velocities);
            for i in 0..3.min(num_velocities) {
                j[(i, i)] = 1.0;
            }
            j
        };

        Self {
            positions: vec![Vector3::zeros(); n_points],
            velocities: vec![Vector3::zeros(); n_points],
            transforms: vec![Matrix4::identity(); n_points],
            jacobians: vec![identity_jacobian.clone(); n_points],
            jacobian_derivatives: vec![DMatrix::<f64>::zeros(3, num_velocities); n_points],
            mass_matrix: DMatrix::<f64>::identity(num_velocities, num_velocities),
            free_acceleration: DVector::<f64>::zeros(num_velocities),
            velocity: DVector::<f64>::zeros(num_velocities),
            link_inertias: vec![Matrix6::identity(); 1],
            owner_links: vec![0; n_points],
            num_joints: num_velocities.saturating_sub(6),
        }
    }
}

impl KinematicsProvider for TestKinematics {
    fn point_positions_velocities(&self, enabled: &[usize]) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>) {
        let p = enabled.iter().map(|&i| self.positions[i]).collect();
        let v = enabled.iter().map(|&i| self.velocities[i]).collect();
        (p, v)
    }

    fn point_world_transforms(&self, enabled: &[usize]) -> Vec<Matrix4<f64>> {
        enabled.iter().map(|&i| self.transforms[i]).collect()
    }

    fn point_translational_jacobians(&self, enabled: &[usize]) -> Vec<DMatrix<f64>> {
        enabled.iter().map(|&i| self.jacobians[i].clone()).collect()
    }

    fn point_translational_jacobian_derivatives(&self, enabled: &[usize]) -> Vec<DMatrix<f64>> {
        enabled
            .iter()
            .map(|&i| self.jacobian_derivatives[i].clone())
            .collect()
    }

    fn mass_matrix(&self) -> DMatrix<f64> {
        self.mass_matrix.clone()
    }

    fn free_generalized_acceleration(
        &self,
        _link_forces: &DMatrix<f64>,
        _joint_forces: &DVector<f64>,
    ) -> DVector<f64> {
        self.free_acceleration.clone()
    }

    fn generalized_velocity(&self) -> DVector<f64> {
        self.velocity.clone()
    }

    fn link_spatial_inertia(&self, link_index: usize) -> Matrix6<f64> {
        self.link_inertias[link_index]
    }

    fn point_owner_link(&self, point_index: usize) -> usize {
        self.owner_links[point_index]
    }

    fn num_links(&self) -> usize {
        self.link_inertias.len()
    }

    fn num_joints(&self) -> usize {
        self.num_joints
    }

    fn num_velocities(&self) -> usize {
        self.mass_matrix.nrows()
    }
}

/// Per-step, per-point data assembled from a [`KinematicsProvider`] and a
/// terrain probe. Ephemeral: built, consumed, and discarded within a
/// single `compute_contact_forces` call.
#[derive(Debug, Clone)]
pub struct ContactPoint {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub penetration: f64,
    pub owner_link: usize,
    /// `3 x (6+n)`, zeroed if the point is inactive (`penetration >= 0`).
    pub jacobian: DMatrix<f64>,
    /// `3 x (6+n)`, zeroed if the point is inactive.
    pub jacobian_dot: DMatrix<f64>,
    pub world_transform: Matrix4<f64>,
}

impl ContactPoint {
    pub fn is_active(&self) -> bool {
        self.penetration < 0.0
    }
}

/// Per-step dynamics state shared by all contact points.
#[derive(Debug, Clone)]
pub struct DynamicsSnapshot {
    pub velocity: DVector<f64>,
    pub free_acceleration: DVector<f64>,
    pub mass_matrix: DMatrix<f64>,
}
