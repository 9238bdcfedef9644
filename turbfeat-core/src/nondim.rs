//! Non-dimensional generators of the tensor basis.
//!
//! `Ŝ = T_t_nut·S` and `R̂ = T_t_nut·R`. Gradients of scalar fields enter the
//! basis through their antisymmetric embedding `A(∇φ)` scaled by `C_Ak` (for p
//! and k) or `C_Ao` (for ω).

use crate::dimension::{dims, Dimension};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::types::{antisymmetric_from_vector, SymmTensor, Tensor, Vec3};
use rayon::prelude::*;

/// Scalar fields whose gradient can generate an antisymmetric tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradientSource {
    Pressure,
    Tke,
    Omega,
}

impl GradientSource {
    /// Suffix of the output names (`Ap`, `Akhat`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            GradientSource::Pressure => "p",
            GradientSource::Tke => "k",
            GradientSource::Omega => "o",
        }
    }

    /// Dimension of the unscaled tensor, that of the gradient.
    pub fn dimension(self) -> Dimension {
        match self {
            GradientSource::Pressure | GradientSource::Tke => dims::ACCELERATION,
            GradientSource::Omega => dims::OMEGA_GRADIENT,
        }
    }
}

/// Ŝ and R̂.
#[derive(Debug, Clone)]
pub struct ScaledKinematics {
    pub shat: Field<Tensor>,
    pub rhat: Field<Tensor>,
}

impl ScaledKinematics {
    pub fn compute(t_t_nut: &[f64], s: &[SymmTensor], r: &[Tensor]) -> Result<Self> {
        let n = t_t_nut.len();
        Error::check_len("S", n, s.len())?;
        Error::check_len("R", n, r.len())?;

        let shat = t_t_nut
            .par_iter()
            .zip(s.par_iter())
            .map(|(t, s)| s.to_tensor() * *t)
            .collect();
        let rhat = t_t_nut
            .par_iter()
            .zip(r.par_iter())
            .map(|(t, r)| r * *t)
            .collect();

        Ok(Self {
            shat: Field::new("Shat", dims::DIMENSIONLESS, shat),
            rhat: Field::new("Rhat", dims::DIMENSIONLESS, rhat),
        })
    }
}

/// Antisymmetric tensor of a scalar gradient and its scaled form.
#[derive(Debug, Clone)]
pub struct AntisymmetricPair {
    pub source: GradientSource,
    pub a: Field<Tensor>,
    pub a_hat: Field<Tensor>,
}

impl AntisymmetricPair {
    /// `A = A(∇φ)` and `Â = c·A`.
    pub fn compute(source: GradientSource, grad: &[Vec3], scale: &[f64]) -> Result<Self> {
        let suffix = source.suffix();
        Error::check_len(&format!("C for A{}", suffix), grad.len(), scale.len())?;

        let a: Vec<Tensor> = grad.par_iter().map(antisymmetric_from_vector).collect();
        let a_hat = a
            .par_iter()
            .zip(scale.par_iter())
            .map(|(a, c)| a * *c)
            .collect();

        Ok(Self {
            source,
            a: Field::new(format!("A{}", suffix), source.dimension(), a),
            a_hat: Field::new(format!("A{}hat", suffix), dims::DIMENSIONLESS, a_hat),
        })
    }
}
