//! Pipeline configuration.
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid RANS
//! configuration that reads ω and a `nu` field.
//!
//! ```json
//! {
//!   "variant": "rans",
//!   "antisymmetric_source": "pressure_gradient",
//!   "dissipation": "omega",
//!   "viscosity": { "uniform": 1.5e-5 },
//!   "guards": { "k_small": 1e-10 },
//!   "output": { "write_integrity_basis": false },
//!   "n_threads": 4
//! }
//! ```

use crate::error::{Error, Result};
use crate::turbulence::Guards;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which derived-field set to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Full RANS feature set: kinematics, q1..q9, Pope and Wu bases.
    #[default]
    Rans,
    /// Reduced RANS set: kinematics, turbR and its divergence, q1..q4 and
    /// extra gradients.
    RansOmegaLean,
    /// Time-averaged LES statistics.
    Les,
    /// DNS Reynolds stress.
    Dns,
}

/// Where the Reynolds stress comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReynoldsStressSource {
    /// Boussinesq stress of the RANS eddy viscosity.
    EddyViscosity,
    /// Resolved LES stress plus an eddy-viscosity subgrid part.
    ResolvedPlusSubgrid,
    /// Stress field read as input.
    Direct,
}

/// Which scalar gradients generate the antisymmetric basis tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntisymmetricSource {
    /// Âp from ∇p.
    PressureGradient,
    /// Âo from ∇ω.
    OmegaGradient,
    /// Both families are written; the basis uses Âo.
    Both,
}

/// Turbulence dissipation variable stored in the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Dissipation {
    /// Specific dissipation rate ω; ε = Cμ·k·ω.
    #[default]
    Omega,
    /// Dissipation rate ε; ω = ε/(Cμ·k).
    Epsilon,
}

/// Molecular viscosity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Viscosity {
    /// Same value everywhere.
    Uniform(f64),
    /// Read the `nu` field.
    #[default]
    Field,
}

/// What the pipeline hands to the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Also write B1..B47 (otherwise only their invariants).
    #[serde(default)]
    pub write_integrity_basis: bool,

    /// Echo the primary fields used (p, wallDistance, epsilon, ...).
    #[serde(default = "default_true")]
    pub write_inputs: bool,

    /// Fit the optimal eddy viscosity of LES/DNS data.
    #[serde(default)]
    pub eddy_viscosity_fit: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            write_integrity_basis: false,
            write_inputs: default_true(),
            eddy_viscosity_fit: false,
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub variant: Variant,

    /// Override of the variant's antisymmetric tensor source.
    #[serde(default)]
    pub antisymmetric_source: Option<AntisymmetricSource>,

    #[serde(default)]
    pub dissipation: Dissipation,

    #[serde(default)]
    pub viscosity: Viscosity,

    #[serde(default)]
    pub guards: Guards,

    #[serde(default)]
    pub output: OutputConfig,

    /// Worker threads (0 = rayon global pool).
    #[serde(default)]
    pub n_threads: usize,
}

/// Stages a variant runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub reynolds_stress: ReynoldsStressSource,
    /// `None` when no tensor basis is computed.
    pub antisymmetric: Option<AntisymmetricSource>,
    /// Number of q features written (q1..qn).
    pub n_q: usize,
    /// divturbR, gradepsilon and gradnut.
    pub extra_gradients: bool,
}

impl Capabilities {
    pub fn tensor_basis(&self) -> bool {
        self.antisymmetric.is_some()
    }
}

impl PipelineConfig {
    /// Default configuration of a variant.
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        self.guards.validate()?;

        if let Viscosity::Uniform(nu) = self.viscosity {
            if !nu.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "uniform viscosity must be finite, got {}",
                    nu
                )));
            }
            if nu <= 0.0 {
                warn!("Non-positive uniform viscosity {}, q2 and q6 will be degenerate", nu);
            }
        }

        if self.antisymmetric_source.is_some() && self.variant != Variant::Rans {
            return Err(Error::InvalidConfig(format!(
                "antisymmetric_source only applies to the rans variant, not {:?}",
                self.variant
            )));
        }

        if self.output.eddy_viscosity_fit && !matches!(self.variant, Variant::Les | Variant::Dns) {
            return Err(Error::InvalidConfig(
                "eddy_viscosity_fit needs reference data (les or dns variant)".to_string(),
            ));
        }

        Ok(())
    }

    /// Stages of the configured variant.
    pub fn capabilities(&self) -> Capabilities {
        match self.variant {
            Variant::Rans => Capabilities {
                reynolds_stress: ReynoldsStressSource::EddyViscosity,
                antisymmetric: Some(
                    self.antisymmetric_source
                        .unwrap_or(AntisymmetricSource::OmegaGradient),
                ),
                n_q: 9,
                extra_gradients: false,
            },
            Variant::RansOmegaLean => Capabilities {
                reynolds_stress: ReynoldsStressSource::EddyViscosity,
                antisymmetric: None,
                n_q: 4,
                extra_gradients: true,
            },
            Variant::Les => Capabilities {
                reynolds_stress: ReynoldsStressSource::ResolvedPlusSubgrid,
                antisymmetric: None,
                n_q: 0,
                extra_gradients: false,
            },
            Variant::Dns => Capabilities {
                reynolds_stress: ReynoldsStressSource::Direct,
                antisymmetric: None,
                n_q: 0,
                extra_gradients: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.variant, Variant::Rans);
        assert_eq!(config.viscosity, Viscosity::Field);
        assert!(config.output.write_inputs);
        assert_eq!(
            config.capabilities().antisymmetric,
            Some(AntisymmetricSource::OmegaGradient)
        );
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let json = r#"{
            "variant": "rans",
            "antisymmetric_source": "pressure_gradient",
            "dissipation": "epsilon",
            "viscosity": { "uniform": 1.5e-5 },
            "guards": { "k_small": 1e-8 },
            "output": { "write_integrity_basis": true },
            "n_threads": 2
        }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();
        assert_eq!(config.dissipation, Dissipation::Epsilon);
        assert_eq!(config.viscosity, Viscosity::Uniform(1.5e-5));
        assert_eq!(config.guards.k_small, 1e-8);
        // Unset guards keep their defaults
        assert_eq!(config.guards.small_s2, 1e-30);
        assert!(config.output.write_integrity_basis);
        assert!(config.output.write_inputs);
        assert_eq!(config.n_threads, 2);
        assert_eq!(
            config.capabilities().antisymmetric,
            Some(AntisymmetricSource::PressureGradient)
        );
    }

    #[test]
    fn test_variant_capabilities() {
        let lean = PipelineConfig::for_variant(Variant::RansOmegaLean).capabilities();
        assert!(!lean.tensor_basis());
        assert_eq!(lean.n_q, 4);
        assert!(lean.extra_gradients);

        let dns = PipelineConfig::for_variant(Variant::Dns).capabilities();
        assert_eq!(dns.reynolds_stress, ReynoldsStressSource::Direct);
        assert_eq!(dns.n_q, 0);
    }

    #[test]
    fn test_invalid_configs() {
        let bad_guard = r#"{ "guards": { "denominator_floor": 0.0 } }"#;
        assert!(matches!(
            PipelineConfig::from_json_str(bad_guard),
            Err(Error::InvalidConfig(_))
        ));

        let misplaced = r#"{ "variant": "les", "antisymmetric_source": "both" }"#;
        assert!(PipelineConfig::from_json_str(misplaced).is_err());

        let fit_on_rans = r#"{ "output": { "eddy_viscosity_fit": true } }"#;
        assert!(PipelineConfig::from_json_str(fit_on_rans).is_err());

        assert!(matches!(
            PipelineConfig::from_json_str("{ not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut config = PipelineConfig::for_variant(Variant::Les);
        config.output.eddy_viscosity_fit = true;
        config.viscosity = Viscosity::Uniform(1e-5);
        let json = config.to_json_string().unwrap();
        let parsed = PipelineConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_file("/nonexistent/turbfeat.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
