//! Core value types and pointwise tensor algebra.
//!
//! This module defines the algebraic kinds a field can hold:
//! - scalars (`f64`)
//! - 3-vectors ([`Vec3`])
//! - general second-order tensors ([`Tensor`])
//! - symmetric second-order tensors ([`SymmTensor`])
//!
//! and the handful of tensor operations the feature formulas are written in
//! (symmetric/antisymmetric parts, deviator, Frobenius magnitude, the
//! antisymmetric embedding of a vector).

use nalgebra::{Matrix3, Vector3, Vector6};

/// A 3D vector (velocity, gradient of a scalar, ...).
pub type Vec3 = Vector3<f64>;

/// A general 3x3 tensor, row-major in the sense `t[(i, j)]`.
pub type Tensor = Matrix3<f64>;

/// Symmetric second-order tensor stored as six independent components.
///
/// Components are ordered as: [xx, xy, xz, yy, yz, zz]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmTensor(pub Vector6<f64>);

impl SymmTensor {
    /// Create a symmetric tensor from its six components.
    pub fn new(components: [f64; 6]) -> Self {
        Self(Vector6::from_row_slice(&components))
    }

    /// Zero tensor.
    pub fn zero() -> Self {
        Self(Vector6::zeros())
    }

    /// Symmetric part of a general tensor, `½(t + tᵀ)`.
    pub fn from_tensor(t: &Tensor) -> Self {
        Self::new([
            t[(0, 0)],
            0.5 * (t[(0, 1)] + t[(1, 0)]),
            0.5 * (t[(0, 2)] + t[(2, 0)]),
            t[(1, 1)],
            0.5 * (t[(1, 2)] + t[(2, 1)]),
            t[(2, 2)],
        ])
    }

    /// Expand to the full 3x3 matrix.
    pub fn to_tensor(&self) -> Tensor {
        let s = &self.0;
        Matrix3::new(
            s[0], s[1], s[2],
            s[1], s[3], s[4],
            s[2], s[4], s[5],
        )
    }

    /// Trace (sum of the normal components).
    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[3] + self.0[5]
    }

    /// Frobenius magnitude; off-diagonal components count twice.
    pub fn magnitude(&self) -> f64 {
        let s = &self.0;
        (s[0] * s[0]
            + s[3] * s[3]
            + s[5] * s[5]
            + 2.0 * (s[1] * s[1] + s[2] * s[2] + s[4] * s[4]))
            .sqrt()
    }
}

impl From<SymmTensor> for Tensor {
    fn from(s: SymmTensor) -> Self {
        s.to_tensor()
    }
}

/// Symmetric part `½(t + tᵀ)`.
pub fn symm(t: &Tensor) -> Tensor {
    0.5 * (t + t.transpose())
}

/// Twice the symmetric part `t + tᵀ`.
pub fn two_symm(t: &Tensor) -> Tensor {
    t + t.transpose()
}

/// Antisymmetric part `½(t - tᵀ)`.
pub fn skew(t: &Tensor) -> Tensor {
    0.5 * (t - t.transpose())
}

/// Deviatoric part `t - ⅓tr(t)I`.
pub fn dev(t: &Tensor) -> Tensor {
    t - Tensor::identity() * (t.trace() / 3.0)
}

/// Frobenius magnitude `sqrt(t : t)`.
pub fn magnitude(t: &Tensor) -> f64 {
    t.norm()
}

/// Squared Frobenius magnitude `t : t`.
pub fn magnitude_squared(t: &Tensor) -> f64 {
    t.norm_squared()
}

/// Second principal invariant `½(tr(t)² - tr(t·t))`.
pub fn second_invariant(t: &Tensor) -> f64 {
    let tr = t.trace();
    0.5 * (tr * tr - (t * t).trace())
}

/// Antisymmetric tensor of a vector (its cross-product operator).
///
/// For `v = (v0, v1, v2)` the result satisfies `A(v)·x = v × x`:
///
/// ```text
/// |  0   -v2   v1 |
/// |  v2   0   -v0 |
/// | -v1   v0   0  |
/// ```
pub fn antisymmetric_from_vector(v: &Vec3) -> Tensor {
    Matrix3::new(
        0.0, -v[2], v[1],
        v[2], 0.0, -v[0],
        -v[1], v[0], 0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Tensor {
        Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0)
    }

    #[test]
    fn test_symm_skew_split() {
        let t = sample();
        let recombined = symm(&t) + skew(&t);
        assert_relative_eq!(recombined, t, epsilon = 1e-14);
        assert_relative_eq!(symm(&t), symm(&t).transpose(), epsilon = 1e-14);
        assert_relative_eq!(skew(&t), -skew(&t).transpose(), epsilon = 1e-14);
    }

    #[test]
    fn test_dev_is_traceless() {
        let t = sample();
        assert_relative_eq!(dev(&t).trace(), 0.0, epsilon = 1e-13);
        // Off-diagonals untouched
        assert_eq!(dev(&t)[(0, 1)], t[(0, 1)]);
    }

    #[test]
    fn test_symm_tensor_round_trip_and_magnitude() {
        let s = SymmTensor::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let full = s.to_tensor();
        assert_eq!(SymmTensor::from_tensor(&full), s);
        assert_relative_eq!(s.magnitude(), magnitude(&full), epsilon = 1e-12);
        assert_relative_eq!(s.trace(), full.trace(), epsilon = 1e-14);
    }

    #[test]
    fn test_antisymmetric_embedding_is_cross_product() {
        let v = Vec3::new(0.3, -1.2, 2.5);
        let x = Vec3::new(-0.7, 0.4, 1.1);
        let a = antisymmetric_from_vector(&v);
        assert_relative_eq!(a * x, v.cross(&x), epsilon = 1e-14);
        assert_relative_eq!(a, v.cross_matrix(), epsilon = 1e-14);
        assert_relative_eq!(a, -a.transpose(), epsilon = 1e-14);
    }

    #[test]
    fn test_second_invariant_diagonal() {
        // For diag(a, b, c): I2 = ab + bc + ca
        let t = Tensor::from_diagonal(&Vec3::new(2.0, 3.0, 5.0));
        assert_relative_eq!(second_invariant(&t), 6.0 + 15.0 + 10.0, epsilon = 1e-12);
    }
}
