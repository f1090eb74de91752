//! Configuration parsing
//!
//! TOML is the primary format, JSON is accepted as well.

use contracts::{ContractError, DriveConfig};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<DriveConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<DriveConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to `format`
pub fn parse(content: &str, format: ConfigFormat) -> Result<DriveConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_defaults() {
        let config = parse_toml("[odometry]\nfrequency_hz = 200.0\n").unwrap();
        assert_eq!(config.odometry.frequency_hz, 200.0);
        assert_eq!(config.odometry.main_loop_period_s, 0.02);
        assert_eq!(config.modules.len(), 4);
    }

    #[test]
    fn test_parse_module_gear_ratio() {
        let content = r#"
[[modules]]
index = 0
name = "solo"
absolute_offset_deg = 12.5
drive_gear_ratio = { numerator = 6.75, denominator = 1.0 }
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.modules.len(), 1);
        assert_eq!(config.modules[0].drive_gear_ratio.value(), 6.75);
        assert_eq!(
            config.modules[0].turn_gear_ratio,
            contracts::GearRatio::swerve_turn()
        );
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{ "gyro": { "yaw_rate_frequency_hz": 50.0 } }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.gyro.yaw_rate_frequency_hz, 50.0);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
