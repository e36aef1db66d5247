//! Relaxed-rigid contact solver for floating-base articulated rigid
//! bodies.
//!
//! Given a snapshot of kinematic and dynamic state (via
//! [`KinematicsProvider`]) and a terrain description (via
//! [`TerrainProbe`]), [`compute_contact_forces`] returns per-contact-point
//! inertial-frame wrenches that enforce approximate non-penetration,
//! Coulomb friction, and constraint stabilization. The contact model is
//! "relaxed": rather than solving a hard complementarity problem, it
//! minimizes a regularized quadratic with a warm-started L-BFGS loop,
//! trading exactness for a formulation that stays smooth and
//! branch-free across the active/inactive contact boundary.

mod contact_solver;
mod delassus;
mod error;
mod kinematics;
mod lbfgs;
mod params;
mod penetration;
mod projector;
mod regularizer;
mod solver;
mod terrain;

pub use contact_solver::ContactSolver;
pub use error::ContactSolverError;
pub use kinematics::{ContactPoint, DynamicsSnapshot, KinematicsProvider, TestKinematics};
pub use lbfgs::{LbfgsOptions, LbfgsResult};
pub use params::{ContactParams, ContactParamsBuilder};
pub use penetration::{detect_penetrations, is_active};
pub use projector::mixed_to_inertial_wrench;
pub use regularizer::{regularize, regularize_point, RegularizerOutput};
pub use solver::{compute_contact_forces, ContactDiagnostics};
pub use terrain::{FlatTerrain, TerrainProbe};
