//! Discrete differential operators over a fixed set of locations.
//!
//! The feature pipeline is pointwise; the only stencil-coupled operations it
//! needs are gradients, a tensor divergence and the wall distance, all
//! supplied by the caller's discretization through this trait.

use crate::types::{Tensor, Vec3};

/// Discretization interface.
///
/// Conventions follow finite-volume codes:
/// - `grad_vector(U)[i, j] = ∂U_j/∂x_i`, i.e. the transpose of the Jacobian
/// - `div_tensor(T)_j = ∂T_ij/∂x_i`
///
/// Every operator returns exactly one value per location.
pub trait Discretization: Send + Sync {
    /// Number of locations (cells or points).
    fn n_locations(&self) -> usize;

    /// Gradient of a scalar field.
    fn grad_scalar(&self, field: &[f64]) -> Vec<Vec3>;

    /// Gradient of a vector field (Jacobian transpose).
    fn grad_vector(&self, field: &[Vec3]) -> Vec<Tensor>;

    /// Divergence of a tensor field.
    fn div_tensor(&self, field: &[Tensor]) -> Vec<Vec3>;

    /// Distance from each location to the nearest wall.
    fn wall_distance(&self) -> Vec<f64>;
}
