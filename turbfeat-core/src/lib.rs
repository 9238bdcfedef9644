//! TurbFeat Core - turbulence feature extraction
//!
//! Derives machine-learning features from converged CFD fields:
//! - Velocity-gradient kinematics (S, R, material derivative)
//! - Turbulence time scales, Boussinesq stress and anisotropy
//! - Scalar features q1..q9 and Pope's ten-tensor basis with λ1..λ5
//! - The 47-tensor integrity basis of Wu et al. and its invariants
//! - Optimal eddy-viscosity fits of LES/DNS reference data
//!
//! # Architecture
//!
//! The pipeline is built around these core abstractions:
//!
//! - [`FieldSource`] / [`FieldSink`]: Named fields per time directory
//! - [`Discretization`] trait: Gradient, divergence and wall distance
//! - [`PipelineConfig`]: Variant selection and numerical guards
//! - [`pipeline::run`]: Pointwise stages, parallel over locations with Rayon

pub mod types;
pub mod dimension;
pub mod field;
pub mod io;
pub mod discretization;
pub mod grid;
pub mod kinematics;
pub mod turbulence;
pub mod nondim;
pub mod basis;
pub mod eddy_viscosity;
pub mod features;
pub mod config;
pub mod pipeline;
pub mod error;

pub use types::{SymmTensor, Tensor, Vec3};
pub use dimension::{dims, Dimension};
pub use field::{Field, FieldData, FieldKind, FieldSet, OutputField};
pub use io::{FieldSink, FieldSource, MemorySink, MemorySource};
pub use discretization::Discretization;
pub use grid::{Boundary, UniformGrid};
pub use turbulence::Guards;
pub use features::{FeatureStack, FeatureTable};
pub use config::{PipelineConfig, Variant};
pub use pipeline::{run, run_and_write, PipelineOutput, PipelineStats};
pub use error::{Error, Result};
