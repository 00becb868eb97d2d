//! Service configuration from environment variables.

use std::path::PathBuf;
use thiserror::Error;
use crate::domain::value_objects::Region;
use crate::store::RemovePolicy;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub snapshot_dir: PathBuf,
    pub remove_policy: RemovePolicy,
    pub default_region: Region,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Loads `.env` if present, then reads the process environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_config(|key| std::env::var(key))
}

/// Parses configuration through `lookup` so tests can feed a plain map.
pub fn build_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };
    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar { var: var.to_string(), reason };

    let port = or_default("PORT", "8083")
        .parse::<u16>()
        .map_err(|e| invalid("PORT", e.to_string()))?;
    let remove_policy = or_default("CART_REMOVE_POLICY", "legacy")
        .parse::<RemovePolicy>()
        .map_err(|e| invalid("CART_REMOVE_POLICY", e))?;
    let default_region = or_default("CART_DEFAULT_REGION", "oman")
        .parse::<Region>()
        .map_err(|e| invalid("CART_DEFAULT_REGION", e))?;

    Ok(AppConfig {
        port,
        snapshot_dir: PathBuf::from(or_default("CART_SNAPSHOT_DIR", "./data/carts")),
        remove_policy,
        default_region,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, std::env::VarError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned().ok_or(std::env::VarError::NotPresent)
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = build_config(lookup(&[])).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.snapshot_dir, PathBuf::from("./data/carts"));
        assert_eq!(config.remove_policy, RemovePolicy::Legacy);
        assert_eq!(config.default_region, Region::Oman);
    }

    #[test]
    fn test_reads_overrides() {
        let config = build_config(lookup(&[
            ("PORT", "9000"),
            ("CART_SNAPSHOT_DIR", "/var/lib/carts"),
            ("CART_REMOVE_POLICY", "exact"),
            ("CART_DEFAULT_REGION", "uae"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.remove_policy, RemovePolicy::Exact);
        assert_eq!(config.default_region, Region::Emirates);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = build_config(lookup(&[("CART_REMOVE_POLICY", "sometimes")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "CART_REMOVE_POLICY"));
        assert!(build_config(lookup(&[("PORT", "http")])).is_err());
    }
}
