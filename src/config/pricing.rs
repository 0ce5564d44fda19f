//! Shipping rate configuration loading from config.toml
//!
//! The `[pricing]` table sets the freight rate per cubic meter, the minimum
//! charge for a single item and the USD to GHS exchange rate. A missing file
//! falls back to the built-in defaults.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Freight pricing used to cost items.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Pricing {
    /// Freight charge per cubic meter, in USD
    pub rate_per_cbm_usd: f64,
    /// Smallest amount charged for any item, in USD
    pub minimum_charge_usd: f64,
    /// Cedis per US dollar
    pub usd_to_ghs: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            rate_per_cbm_usd: 250.0,
            minimum_charge_usd: 10.0,
            usd_to_ghs: 15.5,
        }
    }
}

/// Structure of the whole config.toml file
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    pricing: Pricing,
}

impl Pricing {
    /// Parses pricing from TOML text.
    ///
    /// # Errors
    /// Returns an error if the TOML is invalid or any rate is not a positive
    /// finite number (the minimum charge may be zero).
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        file.pricing.validate()?;
        Ok(file.pricing)
    }

    fn validate(&self) -> Result<()> {
        if !(self.rate_per_cbm_usd.is_finite() && self.rate_per_cbm_usd > 0.0) {
            return Err(Error::Config {
                message: format!("rate_per_cbm_usd must be positive, got {}", self.rate_per_cbm_usd),
            });
        }
        if !(self.usd_to_ghs.is_finite() && self.usd_to_ghs > 0.0) {
            return Err(Error::Config {
                message: format!("usd_to_ghs must be positive, got {}", self.usd_to_ghs),
            });
        }
        if !(self.minimum_charge_usd.is_finite() && self.minimum_charge_usd >= 0.0) {
            return Err(Error::Config {
                message: format!(
                    "minimum_charge_usd cannot be negative, got {}",
                    self.minimum_charge_usd
                ),
            });
        }
        Ok(())
    }
}

/// Loads pricing from a TOML file, using defaults when the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_pricing<P: AsRef<Path>>(path: P) -> Result<Pricing> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        tracing::info!(
            "No pricing file at {:?}, using default rates",
            path_ref
        );
        return Ok(Pricing::default());
    }

    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;
    let pricing = Pricing::from_toml_str(&contents)?;
    tracing::info!(?pricing, "Loaded pricing from {:?}", path_ref);
    Ok(pricing)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_pricing() -> Result<()> {
        let pricing = Pricing::from_toml_str(
            r"
            [pricing]
            rate_per_cbm_usd = 300.0
            minimum_charge_usd = 15.0
            usd_to_ghs = 12.0
            ",
        )?;
        assert_eq!(pricing.rate_per_cbm_usd, 300.0);
        assert_eq!(pricing.minimum_charge_usd, 15.0);
        assert_eq!(pricing.usd_to_ghs, 12.0);
        Ok(())
    }

    #[test]
    fn test_partial_table_keeps_defaults() -> Result<()> {
        let pricing = Pricing::from_toml_str("[pricing]\nusd_to_ghs = 14.0\n")?;
        assert_eq!(pricing.usd_to_ghs, 14.0);
        assert_eq!(pricing.rate_per_cbm_usd, Pricing::default().rate_per_cbm_usd);

        let empty = Pricing::from_toml_str("")?;
        assert_eq!(empty, Pricing::default());
        Ok(())
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        assert!(Pricing::from_toml_str("[pricing]\nrate_per_cbm_usd = 0.0\n").is_err());
        assert!(Pricing::from_toml_str("[pricing]\nusd_to_ghs = -1.0\n").is_err());
        assert!(Pricing::from_toml_str("[pricing]\nminimum_charge_usd = -5.0\n").is_err());
        assert!(Pricing::from_toml_str("[pricing\n").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() -> Result<()> {
        let pricing = load_pricing("definitely/not/here/config.toml")?;
        assert_eq!(pricing, Pricing::default());
        Ok(())
    }
}
