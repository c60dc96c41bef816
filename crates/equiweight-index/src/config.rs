//! Engine configuration.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};

/// Default number of constituents.
pub const DEFAULT_INDEX_SIZE: usize = 100;

/// Default level of the index on its anchor date.
pub const DEFAULT_BASE_VALUE: f64 = 100.0;

/// Index construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Maximum number of constituents per date.
    pub size: usize,
    /// Index level on the first processed date.
    pub base_value: f64,
}

impl IndexConfig {
    /// Create a configuration.
    pub const fn new(size: usize, base_value: f64) -> Self {
        Self { size, base_value }
    }

    /// Check that the size is positive and the base value is a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(IndexError::InvalidConfig(
                "index size must be greater than zero".to_string(),
            ));
        }
        if !self.base_value.is_finite() || self.base_value <= 0.0 {
            return Err(IndexError::InvalidConfig(format!(
                "base value must be positive, got {}",
                self.base_value
            )));
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_SIZE, DEFAULT_BASE_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.size, 100);
        assert_eq!(config.base_value, 100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        assert!(IndexConfig::new(0, 100.0).validate().is_err());
        assert!(IndexConfig::new(10, 0.0).validate().is_err());
        assert!(IndexConfig::new(10, -1.0).validate().is_err());
        assert!(IndexConfig::new(10, f64::NAN).validate().is_err());
    }
}
