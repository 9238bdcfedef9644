//! Physical dimension metadata for fields.
//!
//! Every field carries the exponents of mass, length and time of the quantity
//! it holds. The numerics never consult them; they are bookkeeping for the
//! writer and for consistency checks in tests.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub m: i8,
    pub l: i8,
    pub t: i8,
}

impl Dimension {
    pub const fn new(m: i8, l: i8, t: i8) -> Self {
        Self { m, l, t }
    }

    pub const fn dimensionless() -> Self {
        Self::new(0, 0, 0)
    }

    /// Square root, defined only when every exponent is even.
    pub fn sqrt(self) -> Option<Self> {
        if self.m % 2 == 0 && self.l % 2 == 0 && self.t % 2 == 0 {
            Some(Self::new(self.m / 2, self.l / 2, self.t / 2))
        } else {
            None
        }
    }

    pub fn is_dimensionless(self) -> bool {
        self == Self::dimensionless()
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::dimensionless()
    }
}

impl std::ops::Mul for Dimension {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::new(self.m + rhs.m, self.l + rhs.l, self.t + rhs.t)
    }
}

impl std::ops::Div for Dimension {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Self::new(self.m - rhs.m, self.l - rhs.l, self.t - rhs.t)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Dimension::dimensionless() {
            return write!(f, "1");
        }
        write!(f, "M^{} L^{} T^{}", self.m, self.l, self.t)
    }
}

/// Dimensions of the quantities the pipeline reads and writes.
///
/// Pressure is kinematic (divided by density), as in incompressible solvers.
pub mod dims {
    use super::Dimension;

    pub const DIMENSIONLESS: Dimension = Dimension::new(0, 0, 0);
    pub const LENGTH: Dimension = Dimension::new(0, 1, 0);
    pub const TIME: Dimension = Dimension::new(0, 0, 1);
    pub const VELOCITY: Dimension = Dimension::new(0, 1, -1);
    pub const ACCELERATION: Dimension = Dimension::new(0, 1, -2);
    pub const RATE: Dimension = Dimension::new(0, 0, -1);
    pub const KINEMATIC_PRESSURE: Dimension = Dimension::new(0, 2, -2);
    pub const SPECIFIC_ENERGY: Dimension = Dimension::new(0, 2, -2);
    pub const DISSIPATION_RATE: Dimension = Dimension::new(0, 2, -3);
    pub const KINEMATIC_VISCOSITY: Dimension = Dimension::new(0, 2, -1);
    /// Gradient of specific dissipation rate ω.
    pub const OMEGA_GRADIENT: Dimension = Dimension::new(0, -1, -1);
    /// νt / k^1.5, normalizes gradients of k and p.
    pub const C_AK: Dimension = Dimension::new(0, -1, 2);
    /// νt / (sqrt(k)·ω), normalizes the gradient of ω.
    pub const C_AO: Dimension = Dimension::new(0, 1, 1);
    /// Gradient of νt.
    pub const VISCOSITY_GRADIENT: Dimension = Dimension::new(0, 1, -1);
    /// Gradient of ε.
    pub const DISSIPATION_GRADIENT: Dimension = Dimension::new(0, 1, -3);

    /// Dimension of a solver field the pipeline reads, by its field name.
    pub fn of_input(name: &str) -> Option<Dimension> {
        let dimension = match name {
            "U" | "UMean" => VELOCITY,
            "p" | "pMean" => KINEMATIC_PRESSURE,
            "k" | "kMean" | "tau" | "UPrime2Mean" => SPECIFIC_ENERGY,
            "epsilon" => DISSIPATION_RATE,
            "omega" => RATE,
            "nu" | "nut" | "nutMean" => KINEMATIC_VISCOSITY,
            "wallDistance" => LENGTH,
            _ => return None,
        };
        Some(dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::dims::*;
    use super::*;

    #[test]
    fn test_normalized_antisymmetric_tensors_are_dimensionless() {
        // Akhat = C_Ak * grad(k)
        assert!((C_AK * ACCELERATION).is_dimensionless());
        // Aphat = C_Ak * grad(p)
        assert!((C_AK * ACCELERATION).is_dimensionless());
        // Aohat = C_Ao * grad(omega)
        assert!((C_AO * OMEGA_GRADIENT).is_dimensionless());
    }

    #[test]
    fn test_normalizing_constants_from_inputs() {
        let k = SPECIFIC_ENERGY;
        let sqrt_k = k.sqrt().unwrap();
        assert_eq!(sqrt_k, VELOCITY);
        assert_eq!(KINEMATIC_VISCOSITY / (sqrt_k * k), C_AK);
        assert_eq!(KINEMATIC_VISCOSITY / (sqrt_k * RATE), C_AO);
    }

    #[test]
    fn test_time_scales() {
        // k / epsilon, nut / k and sqrt(nu / epsilon) are all times
        assert_eq!(SPECIFIC_ENERGY / DISSIPATION_RATE, TIME);
        assert_eq!(KINEMATIC_VISCOSITY / SPECIFIC_ENERGY, TIME);
        assert_eq!((KINEMATIC_VISCOSITY / DISSIPATION_RATE).sqrt(), Some(TIME));
        assert_eq!(LENGTH.sqrt(), None);
    }

    #[test]
    fn test_input_dimensions_by_name() {
        assert_eq!(of_input("U"), Some(VELOCITY));
        assert_eq!(of_input("p"), Some(KINEMATIC_PRESSURE));
        assert_eq!(of_input("tau"), Some(SPECIFIC_ENERGY));
        assert_eq!(of_input("nutMean"), Some(KINEMATIC_VISCOSITY));
        assert_eq!(of_input("omega"), Some(RATE));
        assert_eq!(of_input("q1"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(DIMENSIONLESS.to_string(), "1");
        assert_eq!(VELOCITY.to_string(), "M^0 L^1 T^-1");
    }
}
