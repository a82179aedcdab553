//! Linear bias correction of modelled quantities.

use serde::{Deserialize, Serialize};

/// `x' = alpha * x + beta`, fitted per country against measured production.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCorrection {
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default)]
    pub beta: f64,
}

fn default_alpha() -> f64 {
    1.0
}

impl Default for LinearCorrection {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LinearCorrection {
    pub const IDENTITY: LinearCorrection = LinearCorrection {
        alpha: 1.0,
        beta: 0.0,
    };

    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Build from stored coefficients ordered `[alpha, beta]`.
    pub fn from_coefficients(values: &[f64]) -> Option<Self> {
        match values {
            [alpha, beta, ..] => Some(Self::new(*alpha, *beta)),
            _ => None,
        }
    }

    pub fn coefficients(&self) -> [f64; 2] {
        [self.alpha, self.beta]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        self.alpha * value + self.beta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_by_default() {
        let correction = LinearCorrection::default();
        assert!(correction.is_identity());
        assert_eq!(correction.apply(7.5), 7.5);
    }

    #[test]
    fn test_from_coefficients() {
        let correction = LinearCorrection::from_coefficients(&[0.8, 0.5]).unwrap();
        assert_eq!(correction.apply(10.0), 8.5);
        assert!(LinearCorrection::from_coefficients(&[0.8]).is_none());
    }

    #[test]
    fn test_yaml_defaults() {
        let correction: LinearCorrection = serde_yaml::from_str("beta: 0.2").unwrap();
        assert_eq!(correction, LinearCorrection::new(1.0, 0.2));
    }
}
