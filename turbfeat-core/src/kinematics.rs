//! Kinematic tensors from the velocity field.
//!
//! The discretization returns `G = grad(U)` with `G_ij = ∂U_j/∂x_i`, the
//! transpose of the conventional Jacobian. From it:
//! - `gradU = Gᵀ` (Jacobian, `gradU_ij = ∂U_i/∂x_j`)
//! - `S = symm(G)`
//! - `R = -skew(G)`, which is `skew(gradU)`
//! - `DUDt = U · G`, the advective part of the material derivative

use crate::dimension::dims;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::types::{skew, SymmTensor, Tensor, Vec3};
use rayon::prelude::*;

/// Conventional velocity-gradient Jacobian from the raw operator output.
pub fn jacobian(raw: &Tensor) -> Tensor {
    raw.transpose()
}

/// Strain-rate tensor.
pub fn strain_rate(raw: &Tensor) -> SymmTensor {
    SymmTensor::from_tensor(raw)
}

/// Rotation-rate tensor.
pub fn rotation_rate(raw: &Tensor) -> Tensor {
    -skew(raw)
}

/// Advective term `(U·G)_j = U_i ∂U_j/∂x_i`.
pub fn advection(u: &Vec3, raw: &Tensor) -> Vec3 {
    raw.transpose() * u
}

/// Kinematic fields of one velocity field.
#[derive(Debug, Clone)]
pub struct KinematicFields {
    pub grad_u: Field<Tensor>,
    pub s: Field<SymmTensor>,
    pub r: Field<Tensor>,
    pub dudt: Field<Vec3>,
}

impl KinematicFields {
    /// Build gradU, S, R and DUDt from U and its raw gradient.
    pub fn compute(u: &Field<Vec3>, raw_grad: &[Tensor]) -> Result<Self> {
        let n = u.len();
        Error::check_len("gradU", n, raw_grad.len())?;

        let grad_u = raw_grad.par_iter().map(jacobian).collect();
        let s = raw_grad.par_iter().map(strain_rate).collect();
        let r = raw_grad.par_iter().map(rotation_rate).collect();
        let dudt = u
            .values()
            .par_iter()
            .zip(raw_grad.par_iter())
            .map(|(u, g)| advection(u, g))
            .collect();

        Ok(Self {
            grad_u: Field::new("gradU", dims::RATE, grad_u),
            s: Field::new("S", dims::RATE, s),
            r: Field::new("R", dims::RATE, r),
            dudt: Field::new("DUDt", dims::ACCELERATION, dudt),
        })
    }

    /// Append a suffix to every field name (`SMean`, `RMean`, ...).
    pub fn with_suffix(self, suffix: &str) -> Self {
        let rename = |name: &str| format!("{}{}", name, suffix);
        Self {
            grad_u: self.grad_u.renamed(rename("gradU")),
            s: self.s.renamed(rename("S")),
            r: self.r.renamed(rename("R")),
            dudt: self.dudt.renamed(rename("DUDt")),
        }
    }
}
