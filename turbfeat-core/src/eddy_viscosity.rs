//! Optimal eddy viscosity of reference (LES/DNS) data.
//!
//! At each location the anisotropy is fitted with the linear eddy-viscosity
//! model `a ≈ -2·νt·S` over the six independent components, as a
//! non-negative least-squares problem without intercept. What the fit leaves
//! unexplained is the non-linear remainder
//!
//! ```text
//! a⊥ = a + 2·νt·S
//! b⊥ = a⊥ / (2·max(k, k_small))
//! ```
//!
//! whose divergence is the perturbation force vector.

use crate::dimension::dims;
use crate::discretization::Discretization;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::turbulence::Guards;
use crate::types::{SymmTensor, Vec3};
use rayon::prelude::*;

/// Result of a single-location fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NnlsFit {
    pub nut: f64,
    /// Coefficient of determination of the fitted components.
    pub r2: f64,
}

/// Non-negative least-squares fit of `a = -2·νt·S`.
pub fn nnls_fit(s: &SymmTensor, a: &SymmTensor) -> NnlsFit {
    let x = s.0 * -2.0;
    let xx = x.dot(&x);
    let nut = if xx > 0.0 {
        (x.dot(&a.0) / xx).max(0.0)
    } else {
        0.0
    };
    let predicted = x * nut;
    NnlsFit {
        nut,
        r2: r2_score(a.0.as_slice(), predicted.as_slice()),
    }
}

/// Coefficient of determination `1 - SS_res/SS_tot`.
///
/// A constant target scores 1 when predicted exactly and 0 otherwise.
pub fn r2_score(target: &[f64], predicted: &[f64]) -> f64 {
    let n = target.len() as f64;
    let mean = target.iter().sum::<f64>() / n;
    let ss_tot: f64 = target.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = target
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Non-linear part of the anisotropy, `a + 2·νt·S`.
pub fn aperp(a: &SymmTensor, s: &SymmTensor, nut: f64) -> SymmTensor {
    SymmTensor(a.0 + s.0 * (2.0 * nut))
}

/// `a⊥ / (2·max(k, k_small))`
pub fn bperp(aperp: &SymmTensor, k: f64, guards: &Guards) -> SymmTensor {
    SymmTensor(aperp.0 / (2.0 * k.max(guards.k_small)))
}

/// Eddy-viscosity fit over all locations.
#[derive(Debug, Clone)]
pub struct EddyViscosityFit {
    pub nut: Field<f64>,
    /// Absent for a fit with a supplied eddy viscosity.
    pub r2: Option<Field<f64>>,
    pub aperp: Field<SymmTensor>,
    /// Present when k was supplied.
    pub bperp: Option<Field<SymmTensor>>,
}

impl EddyViscosityFit {
    /// Fit the optimal non-negative eddy viscosity at every location.
    pub fn optimal(
        s: &[SymmTensor],
        a: &[SymmTensor],
        k: Option<&[f64]>,
        guards: &Guards,
    ) -> Result<Self> {
        Error::check_len("a", s.len(), a.len())?;
        let fits: Vec<NnlsFit> = s
            .par_iter()
            .zip(a.par_iter())
            .map(|(s, a)| nnls_fit(s, a))
            .collect();

        let nut: Vec<f64> = fits.iter().map(|f| f.nut).collect();
        let r2 = fits.iter().map(|f| f.r2).collect();
        let mut fit = Self::with_eddy_viscosity(s, a, &nut, k, guards)?;
        fit.r2 = Some(Field::new("r2_nnls", dims::DIMENSIONLESS, r2));
        Ok(fit)
    }

    /// Remainder with respect to a supplied eddy viscosity, typically the
    /// νt of a RANS simulation of the same case.
    pub fn with_eddy_viscosity(
        s: &[SymmTensor],
        a: &[SymmTensor],
        nut: &[f64],
        k: Option<&[f64]>,
        guards: &Guards,
    ) -> Result<Self> {
        let n = s.len();
        Error::check_len("a", n, a.len())?;
        Error::check_len("nut", n, nut.len())?;

        let aperp_values: Vec<SymmTensor> = (0..n)
            .into_par_iter()
            .map(|i| aperp(&a[i], &s[i], nut[i]))
            .collect();

        let bperp_values = match k {
            Some(k) => {
                Error::check_len("k", n, k.len())?;
                let values = aperp_values
                    .par_iter()
                    .zip(k.par_iter())
                    .map(|(ap, k)| bperp(ap, *k, guards))
                    .collect();
                Some(Field::new("bperp_nnls", dims::DIMENSIONLESS, values))
            }
            None => None,
        };

        Ok(Self {
            nut: Field::new("nut_nnls", dims::KINEMATIC_VISCOSITY, nut.to_vec()),
            r2: None,
            aperp: Field::new("aperp_nnls", dims::SPECIFIC_ENERGY, aperp_values),
            bperp: bperp_values,
        })
    }

    /// Perturbation force vector `∇·a⊥`.
    pub fn perturbation_force<D>(&self, discretization: &D) -> Result<Field<Vec3>>
    where
        D: Discretization + ?Sized,
    {
        self.aperp.check_len(discretization.n_locations())?;
        let tensors: Vec<_> = self.aperp.values().iter().map(|a| a.to_tensor()).collect();
        Ok(Field::new(
            "pfv",
            dims::ACCELERATION,
            discretization.div_tensor(&tensors),
        ))
    }
}
