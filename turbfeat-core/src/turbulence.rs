//! Turbulence features: time scales, Reynolds stress, anisotropy and the
//! q1..q9 scalar features.
//!
//! Every formula is pointwise. Denominators that can vanish on a degenerate
//! location (k, ε, ω, y, ‖S‖²) are floored by the constants in [`Guards`], so
//! the outputs stay finite; degeneracy is never reported as an error.
//! Negative k is clipped to zero under square roots.
//!
//! Three sources of Reynolds stress are supported:
//! - RANS: Boussinesq eddy-viscosity stress `(2/3)k·I - νt·dev(2S)`
//! - LES: resolved `UPrime2Mean` plus an eddy-viscosity subgrid part
//! - DNS: the stress tensor is read directly and `k = ½tr(τ)`

use crate::dimension::dims;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::types::{dev, magnitude, magnitude_squared, SymmTensor, Tensor, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Model constant β* = Cμ of the k-ω closures.
pub const C_MU: f64 = 0.09;

/// Number of q features.
pub const N_Q: usize = 9;

/// Floors applied to denominators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Guards {
    /// Floor on ‖S‖² in q1.
    pub small_s2: f64,
    /// Floor on 2k when normalizing the anisotropy tensor.
    pub k_small: f64,
    /// Floor on the cross-diffusion term in q7.
    pub q7_floor: f64,
    /// Floor on every other denominator.
    pub denominator_floor: f64,
}

impl Default for Guards {
    fn default() -> Self {
        Self {
            small_s2: 1e-30,
            k_small: 1e-10,
            q7_floor: 0.5e-10,
            denominator_floor: 1e-30,
        }
    }
}

impl Guards {
    /// Check that every floor is positive and finite.
    pub fn validate(&self) -> Result<()> {
        let floors = [
            ("small_s2", self.small_s2),
            ("k_small", self.k_small),
            ("q7_floor", self.q7_floor),
            ("denominator_floor", self.denominator_floor),
        ];
        for (name, value) in floors {
            if !(value > 0.0) || !value.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "guard {} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    fn floor(&self, x: f64) -> f64 {
        x.max(self.denominator_floor)
    }
}

fn sqrt_k(k: f64) -> f64 {
    k.max(0.0).sqrt()
}

/// ε of an ω-based closure.
pub fn epsilon_from_omega(k: f64, omega: f64) -> f64 {
    C_MU * k * omega
}

/// ω of an ε-based closure.
pub fn omega_from_epsilon(k: f64, epsilon: f64, guards: &Guards) -> f64 {
    epsilon / guards.floor(C_MU * k)
}

/// Local turbulence time scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScales {
    /// `k/ε`
    pub t_t_ke: f64,
    /// `νt/k`
    pub t_t_nut: f64,
    /// Kolmogorov time `sqrt(ν/ε)`
    pub t_k: f64,
}

impl TimeScales {
    pub fn new(k: f64, epsilon: f64, nut: f64, nu: f64, guards: &Guards) -> Self {
        let eps = guards.floor(epsilon);
        Self {
            t_t_ke: k / eps,
            t_t_nut: nut / guards.floor(k),
            t_k: (nu.max(0.0) / eps).sqrt(),
        }
    }
}

/// `C_Ak = νt/k^1.5`, normalizes the gradients of k and p.
pub fn c_ak(k: f64, nut: f64, guards: &Guards) -> f64 {
    nut / guards.floor(sqrt_k(k) * k)
}

/// `C_Ao = νt/(sqrt(k)·ω)`, normalizes the gradient of ω.
pub fn c_ao(k: f64, omega: f64, nut: f64, guards: &Guards) -> f64 {
    nut / guards.floor(sqrt_k(k) * omega)
}

/// Boussinesq Reynolds stress `(2/3)k·I - νt·dev(2S)`.
pub fn eddy_viscosity_stress(k: f64, nut: f64, s: &Tensor) -> Tensor {
    Tensor::identity() * (2.0 / 3.0 * k) - dev(&(2.0 * s)) * nut
}

/// Anisotropy `a = dev(τ)` and its normalized form `b = a / max(k_small, 2k)`.
pub fn anisotropy(tau: &Tensor, k: f64, guards: &Guards) -> (Tensor, Tensor) {
    let a = dev(tau);
    let b = a / guards.k_small.max(2.0 * k);
    (a, b)
}

/// Pointwise inputs of the q features.
#[derive(Debug, Clone, Copy)]
pub struct QInputs<'a> {
    pub k: f64,
    pub epsilon: f64,
    pub omega: f64,
    pub nu: f64,
    pub y: f64,
    pub s: &'a Tensor,
    pub r: &'a Tensor,
    pub turb_r: &'a Tensor,
    pub grad_k: &'a Vec3,
    pub grad_omega: &'a Vec3,
}

/// The nine q features, q1 first.
pub fn q_features(q: &QInputs<'_>, guards: &Guards) -> [f64; N_Q] {
    let s2 = magnitude_squared(q.s);
    let r2 = magnitude_squared(q.r);
    let sk = sqrt_k(q.k);
    let t_t_ke = q.k / guards.floor(q.epsilon);

    let q1 = 0.5 * (r2 - s2) / s2.max(guards.small_s2);
    let q2 = (sk * q.y / guards.floor(50.0 * q.nu)).min(2.0);
    let q3 = t_t_ke * s2.sqrt();
    let q4 = magnitude(q.turb_r) / guards.floor(q.k);

    let y2 = q.y * q.y;
    let q5 = sk / guards.floor(C_MU * q.omega * q.y);
    let q6 = 500.0 * q.nu / guards.floor(y2 * q.omega);
    let cross = y2 * q.grad_k.dot(q.grad_omega) / guards.floor(q.omega);
    let q7 = 2.0 * q.k / cross.max(guards.q7_floor);
    let q8 = q5.max(q6).min(q7);
    let q9 = q8.powi(4).tanh();

    [q1, q2, q3, q4, q5, q6, q7, q8, q9]
}

/// Name of the i-th q feature, 1-based.
pub fn q_name(i: usize) -> String {
    format!("q{}", i)
}

/// Inputs of the RANS turbulence builder, one slice entry per location.
#[derive(Debug, Clone, Copy)]
pub struct RansInputs<'a> {
    pub k: &'a [f64],
    pub epsilon: &'a [f64],
    pub omega: &'a [f64],
    pub nut: &'a [f64],
    pub nu: &'a [f64],
    pub y: &'a [f64],
    pub s: &'a [SymmTensor],
    pub r: &'a [Tensor],
    pub grad_k: &'a [Vec3],
    pub grad_omega: &'a [Vec3],
}

impl RansInputs<'_> {
    fn check(&self) -> Result<usize> {
        let n = self.k.len();
        let lengths = [
            ("epsilon", self.epsilon.len()),
            ("omega", self.omega.len()),
            ("nut", self.nut.len()),
            ("nu", self.nu.len()),
            ("wallDistance", self.y.len()),
            ("S", self.s.len()),
            ("R", self.r.len()),
            ("gradk", self.grad_k.len()),
            ("gradomega", self.grad_omega.len()),
        ];
        for (name, found) in lengths {
            Error::check_len(name, n, found)?;
        }
        Ok(n)
    }
}

#[derive(Debug, Clone, Copy)]
struct RansPoint {
    scales: TimeScales,
    c_ak: f64,
    c_ao: f64,
    turb_r: SymmTensor,
    a: SymmTensor,
    b: SymmTensor,
    q: [f64; N_Q],
}

/// Turbulence fields of a RANS snapshot.
#[derive(Debug, Clone)]
pub struct RansTurbulence {
    pub t_t_ke: Field<f64>,
    pub t_t_nut: Field<f64>,
    pub t_k: Field<f64>,
    pub c_ak: Field<f64>,
    pub c_ao: Field<f64>,
    pub turb_r: Field<SymmTensor>,
    pub a: Field<SymmTensor>,
    pub b: Field<SymmTensor>,
    /// q1..q9 in order.
    pub q: Vec<Field<f64>>,
}

impl RansTurbulence {
    pub fn compute(inputs: &RansInputs<'_>, guards: &Guards) -> Result<Self> {
        let n = inputs.check()?;
        let points: Vec<RansPoint> = (0..n)
            .into_par_iter()
            .map(|i| rans_point(inputs, i, guards))
            .collect();

        let scalar = |name: &str, dim, f: fn(&RansPoint) -> f64| {
            Field::new(name, dim, points.iter().map(f).collect())
        };
        let tensor = |name: &str, dim, f: fn(&RansPoint) -> SymmTensor| {
            Field::new(name, dim, points.iter().map(f).collect())
        };
        let q = (0..N_Q)
            .map(|j| {
                Field::new(
                    q_name(j + 1),
                    dims::DIMENSIONLESS,
                    points.iter().map(|p| p.q[j]).collect(),
                )
            })
            .collect();

        Ok(Self {
            t_t_ke: scalar("T_t_ke", dims::TIME, |p| p.scales.t_t_ke),
            t_t_nut: scalar("T_t_nut", dims::TIME, |p| p.scales.t_t_nut),
            t_k: scalar("T_k", dims::TIME, |p| p.scales.t_k),
            c_ak: scalar("C_Ak", dims::C_AK, |p| p.c_ak),
            c_ao: scalar("C_Ao", dims::C_AO, |p| p.c_ao),
            turb_r: tensor("turbR", dims::SPECIFIC_ENERGY, |p| p.turb_r),
            a: tensor("a", dims::SPECIFIC_ENERGY, |p| p.a),
            b: tensor("b", dims::DIMENSIONLESS, |p| p.b),
            q,
        })
    }
}

fn rans_point(inputs: &RansInputs<'_>, i: usize, guards: &Guards) -> RansPoint {
    let k = inputs.k[i];
    let nut = inputs.nut[i];
    let omega = inputs.omega[i];
    let s = inputs.s[i].to_tensor();

    let turb_r = eddy_viscosity_stress(k, nut, &s);
    let (a, b) = anisotropy(&turb_r, k, guards);
    let q = q_features(
        &QInputs {
            k,
            epsilon: inputs.epsilon[i],
            omega,
            nu: inputs.nu[i],
            y: inputs.y[i],
            s: &s,
            r: &inputs.r[i],
            turb_r: &turb_r,
            grad_k: &inputs.grad_k[i],
            grad_omega: &inputs.grad_omega[i],
        },
        guards,
    );

    RansPoint {
        scales: TimeScales::new(k, inputs.epsilon[i], nut, inputs.nu[i], guards),
        c_ak: c_ak(k, nut, guards),
        c_ao: c_ao(k, omega, nut, guards),
        turb_r: SymmTensor::from_tensor(&turb_r),
        a: SymmTensor::from_tensor(&a),
        b: SymmTensor::from_tensor(&b),
        q,
    }
}

/// Reynolds stress of time-averaged LES data.
#[derive(Debug, Clone)]
pub struct LesStress {
    pub subgrid_tau: Field<SymmTensor>,
    pub tau: Field<SymmTensor>,
    pub a: Field<SymmTensor>,
    pub b: Field<SymmTensor>,
    /// `½tr(τ)`
    pub k_tau: Field<f64>,
}

impl LesStress {
    /// Resolved stress plus eddy-viscosity subgrid stress.
    ///
    /// `s_mean` is the strain rate of the mean velocity.
    pub fn compute(
        u_prime2_mean: &[SymmTensor],
        k_mean: &[f64],
        nut_mean: &[f64],
        s_mean: &[SymmTensor],
        guards: &Guards,
    ) -> Result<Self> {
        let n = u_prime2_mean.len();
        Error::check_len("kMean", n, k_mean.len())?;
        Error::check_len("nutMean", n, nut_mean.len())?;
        Error::check_len("SMean", n, s_mean.len())?;

        let points: Vec<[SymmTensor; 4]> = (0..n)
            .into_par_iter()
            .map(|i| {
                let subgrid = eddy_viscosity_stress(k_mean[i], nut_mean[i], &s_mean[i].to_tensor());
                let tau = u_prime2_mean[i].to_tensor() + subgrid;
                let (a, b) = anisotropy(&tau, 0.5 * tau.trace(), guards);
                [
                    SymmTensor::from_tensor(&subgrid),
                    SymmTensor::from_tensor(&tau),
                    SymmTensor::from_tensor(&a),
                    SymmTensor::from_tensor(&b),
                ]
            })
            .collect();

        let column = |name: &str, dim, j: usize| {
            Field::new(name, dim, points.iter().map(|p| p[j]).collect())
        };
        let k_tau = points.iter().map(|p| 0.5 * p[1].trace()).collect();

        Ok(Self {
            subgrid_tau: column("subgrid_tauMean", dims::SPECIFIC_ENERGY, 0),
            tau: column("tauMean", dims::SPECIFIC_ENERGY, 1),
            a: column("aMean", dims::SPECIFIC_ENERGY, 2),
            b: column("bMean", dims::DIMENSIONLESS, 3),
            k_tau: Field::new("kMean_tauMean", dims::SPECIFIC_ENERGY, k_tau),
        })
    }
}

/// Anisotropy of a directly resolved Reynolds stress.
#[derive(Debug, Clone)]
pub struct DnsStress {
    pub k: Field<f64>,
    pub a: Field<SymmTensor>,
    pub b: Field<SymmTensor>,
}

impl DnsStress {
    pub fn compute(tau: &[SymmTensor], guards: &Guards) -> Self {
        let points: Vec<(f64, SymmTensor, SymmTensor)> = tau
            .par_iter()
            .map(|t| {
                let t = t.to_tensor();
                let k = 0.5 * t.trace();
                let (a, b) = anisotropy(&t, k, guards);
                (k, SymmTensor::from_tensor(&a), SymmTensor::from_tensor(&b))
            })
            .collect();

        Self {
            k: Field::new("k", dims::SPECIFIC_ENERGY, points.iter().map(|p| p.0).collect()),
            a: Field::new("a", dims::SPECIFIC_ENERGY, points.iter().map(|p| p.1).collect()),
            b: Field::new("b", dims::DIMENSIONLESS, points.iter().map(|p| p.2).collect()),
        }
    }
}
