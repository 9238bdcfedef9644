//! Tensor basis features.
//!
//! Two libraries are built from the non-dimensional generators:
//!
//! - the Pope basis `T1..T10` of Ŝ and R̂ together with its scalar invariants
//!   `λ1..λ5`;
//! - the Wu integrity basis `B1..B47` of {Ŝ, R̂, Âx, Ây}, of which only the
//!   first and second invariants `I1_i = tr(B_i)` and
//!   `I2_i = ½(tr(B_i)² - tr(B_i·B_i))` are kept.
//!
//! Both are tables: consumers key the features by their 1-based index, so the
//! order of [`POPE_BASIS`] and [`INTEGRITY_BASIS`] is part of the output
//! format.

use crate::dimension::dims;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::types::{second_invariant, SymmTensor, Tensor};
use rayon::prelude::*;

pub const N_POPE: usize = 10;
pub const N_LAMBDA: usize = 5;
pub const N_INTEGRITY: usize = 47;

/// A generator of the integrity basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generator {
    /// Ŝ
    S,
    /// R̂
    R,
    /// First antisymmetric tensor, Âo or Âp.
    X,
    /// Second antisymmetric tensor, Âk.
    Y,
}

use Generator::{R, S, X, Y};

/// Wu integrity basis as left-to-right products of generators.
#[rustfmt::skip]
pub const INTEGRITY_BASIS: [&[Generator]; N_INTEGRITY] = [
    &[S, S],                // B1
    &[S, S, S],             // B2
    &[R, R],                // B3
    &[X, X],                // B4
    &[Y, Y],                // B5
    &[R, R, S],             // B6
    &[R, R, S, S],          // B7
    &[R, R, S, R, S, S],    // B8
    &[X, X, S],             // B9
    &[X, X, S, S],          // B10
    &[X, X, S, X, S, S],    // B11
    &[Y, Y, S],             // B12
    &[Y, Y, S, S],          // B13
    &[Y, Y, S, Y, S, S],    // B14
    &[R, X],                // B15
    &[X, Y],                // B16
    &[R, Y],                // B17
    &[R, X, S],             // B18
    &[R, X, S, S],          // B19
    &[R, R, X, S],          // B20
    &[X, X, R, S],          // B21
    &[R, R, X, S, S],       // B22
    &[X, X, R, S, S],       // B23
    &[R, R, S, X, S, S],    // B24
    &[X, X, S, R, S, S],    // B25
    &[R, Y, S],             // B26
    &[R, Y, S, S],          // B27
    &[R, R, Y, S],          // B28
    &[Y, Y, R, S],          // B29
    &[R, R, Y, S, S],       // B30
    &[Y, Y, R, S, S],       // B31
    &[R, R, S, Y, S, S],    // B32
    &[Y, Y, S, R, S, S],    // B33
    &[X, Y, S],             // B34
    &[X, Y, S, S],          // B35
    &[X, X, Y, S],          // B36
    &[Y, Y, X, S],          // B37
    &[X, X, Y, S, S],       // B38
    &[Y, Y, X, S, S],       // B39
    &[X, X, S, Y, S, S],    // B40
    &[Y, Y, S, X, S, S],    // B41
    &[R, X, Y],             // B42
    &[R, X, Y, S],          // B43
    &[R, Y, X, S],          // B44
    &[R, X, Y, S, S],       // B45
    &[R, Y, X, S, S],       // B46
    &[R, X, S, Y, S, S],    // B47
];

/// Generator values at one location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Generators {
    pub s: Tensor,
    pub r: Tensor,
    pub x: Tensor,
    pub y: Tensor,
}

impl Generators {
    pub fn get(&self, g: Generator) -> &Tensor {
        match g {
            S => &self.s,
            R => &self.r,
            X => &self.x,
            Y => &self.y,
        }
    }

    /// Left-to-right product of a generator sequence.
    pub fn product(&self, sequence: &[Generator]) -> Tensor {
        sequence
            .iter()
            .fold(Tensor::identity(), |acc, &g| acc * self.get(g))
    }

    /// All 47 integrity basis tensors, B1 first.
    pub fn integrity_basis(&self) -> [Tensor; N_INTEGRITY] {
        std::array::from_fn(|i| self.product(INTEGRITY_BASIS[i]))
    }
}

/// First and second invariants of a basis tensor.
pub fn invariants(b: &Tensor) -> (f64, f64) {
    (b.trace(), second_invariant(b))
}

/// A Pope basis term as a function of (Ŝ, R̂).
pub type PopeTerm = fn(&Tensor, &Tensor) -> Tensor;

fn t1(s: &Tensor, _r: &Tensor) -> Tensor {
    *s
}

fn t2(s: &Tensor, r: &Tensor) -> Tensor {
    s * r - r * s
}

fn t3(s: &Tensor, _r: &Tensor) -> Tensor {
    let ss = s * s;
    ss - Tensor::identity() * (ss.trace() / 3.0)
}

fn t4(_s: &Tensor, r: &Tensor) -> Tensor {
    let rr = r * r;
    rr - Tensor::identity() * (rr.trace() / 3.0)
}

fn t5(s: &Tensor, r: &Tensor) -> Tensor {
    let ss = s * s;
    r * ss - ss * r
}

fn t6(s: &Tensor, r: &Tensor) -> Tensor {
    let rr = r * r;
    rr * s + s * rr - Tensor::identity() * (2.0 / 3.0 * (s * rr).trace())
}

fn t7(s: &Tensor, r: &Tensor) -> Tensor {
    let rr = r * r;
    r * s * rr - rr * s * r
}

fn t8(s: &Tensor, r: &Tensor) -> Tensor {
    let ss = s * s;
    s * r * ss - ss * r * s
}

fn t9(s: &Tensor, r: &Tensor) -> Tensor {
    let ss = s * s;
    let rr = r * r;
    rr * ss + ss * rr - Tensor::identity() * (2.0 / 3.0 * (ss * rr).trace())
}

fn t10(s: &Tensor, r: &Tensor) -> Tensor {
    let ss = s * s;
    let rr = r * r;
    r * ss * rr - rr * ss * r
}

/// Pope basis T1..T10.
pub const POPE_BASIS: [PopeTerm; N_POPE] = [t1, t2, t3, t4, t5, t6, t7, t8, t9, t10];

/// Evaluate every Pope term.
pub fn pope_basis(s: &Tensor, r: &Tensor) -> [Tensor; N_POPE] {
    std::array::from_fn(|i| POPE_BASIS[i](s, r))
}

/// λ1..λ5 = tr(ŜŜ), tr(R̂R̂), tr(ŜŜŜ), tr(R̂R̂Ŝ), tr(R̂R̂ŜŜ).
pub fn lambdas(s: &Tensor, r: &Tensor) -> [f64; N_LAMBDA] {
    let ss = s * s;
    let rr = r * r;
    [
        ss.trace(),
        rr.trace(),
        (ss * s).trace(),
        (rr * s).trace(),
        (rr * ss).trace(),
    ]
}

/// Persisted Pope basis fields.
#[derive(Debug, Clone)]
pub struct PopeFields {
    /// T1..T10
    pub t: Vec<Field<SymmTensor>>,
    /// lambda1..lambda5
    pub lambda: Vec<Field<f64>>,
}

impl PopeFields {
    pub fn compute(shat: &[Tensor], rhat: &[Tensor]) -> Result<Self> {
        Error::check_len("Rhat", shat.len(), rhat.len())?;

        let points: Vec<([SymmTensor; N_POPE], [f64; N_LAMBDA])> = shat
            .par_iter()
            .zip(rhat.par_iter())
            .map(|(s, r)| {
                let t = pope_basis(s, r);
                (std::array::from_fn(|i| SymmTensor::from_tensor(&t[i])), lambdas(s, r))
            })
            .collect();

        let t = (0..N_POPE)
            .map(|i| {
                Field::new(
                    format!("T{}", i + 1),
                    dims::DIMENSIONLESS,
                    points.iter().map(|p| p.0[i]).collect(),
                )
            })
            .collect();
        let lambda = (0..N_LAMBDA)
            .map(|i| {
                Field::new(
                    format!("lambda{}", i + 1),
                    dims::DIMENSIONLESS,
                    points.iter().map(|p| p.1[i]).collect(),
                )
            })
            .collect();

        Ok(Self { t, lambda })
    }
}

/// Invariants of the integrity basis, and optionally the basis itself.
#[derive(Debug, Clone)]
pub struct IntegrityFields {
    /// I1_1..I1_47
    pub i1: Vec<Field<f64>>,
    /// I2_1..I2_47
    pub i2: Vec<Field<f64>>,
    /// B1..B47, only when requested.
    pub basis: Option<Vec<Field<Tensor>>>,
}

impl IntegrityFields {
    pub fn compute(
        shat: &[Tensor],
        rhat: &[Tensor],
        x: &[Tensor],
        y: &[Tensor],
        keep_basis: bool,
    ) -> Result<Self> {
        let n = shat.len();
        Error::check_len("Rhat", n, rhat.len())?;
        Error::check_len("Ax", n, x.len())?;
        Error::check_len("Ay", n, y.len())?;

        let generators = |i: usize| Generators {
            s: shat[i],
            r: rhat[i],
            x: x[i],
            y: y[i],
        };

        // Tensors are dropped as soon as their invariants are taken
        let points: Vec<[(f64, f64); N_INTEGRITY]> = (0..n)
            .into_par_iter()
            .map(|i| generators(i).integrity_basis().map(|b| invariants(&b)))
            .collect();

        let invariant_field = |prefix: &str, i: usize, f: fn(&(f64, f64)) -> f64| {
            Field::new(
                format!("{}_{}", prefix, i + 1),
                dims::DIMENSIONLESS,
                points.iter().map(|p| f(&p[i])).collect(),
            )
        };
        let i1 = (0..N_INTEGRITY)
            .map(|i| invariant_field("I1", i, |p| p.0))
            .collect();
        let i2 = (0..N_INTEGRITY)
            .map(|i| invariant_field("I2", i, |p| p.1))
            .collect();

        let basis = keep_basis.then(|| {
            INTEGRITY_BASIS
                .par_iter()
                .enumerate()
                .map(|(j, sequence)| {
                    let values = (0..n).map(|i| generators(i).product(sequence)).collect();
                    Field::new(format!("B{}", j + 1), dims::DIMENSIONLESS, values)
                })
                .collect()
        });

        Ok(Self { i1, i2, basis })
    }
}
