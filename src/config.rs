use crate::model::ConfigError;
use crate::normalizer::{Normalizer, DEFAULT_LABEL_REMAPS, DEFAULT_RISK_FACTORS};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Regression-log files to analyze.
    pub inputs: Vec<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Risk-factor code -> display label.
    #[serde(default = "default_risk_factors")]
    pub risk_factors: HashMap<String, String>,
    /// Label corrections applied after the code lookup.
    #[serde(default = "default_label_remaps")]
    pub label_remaps: HashMap<String, String>,
}

impl AppConfig {
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.risk_factors.clone(), self.label_remaps.clone())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("tables")
}

fn default_database_path() -> String {
    "results.db".to_string()
}

fn default_risk_factors() -> HashMap<String, String> {
    to_map(&DEFAULT_RISK_FACTORS)
}

fn default_label_remaps() -> HashMap<String, String> {
    to_map(&DEFAULT_LABEL_REMAPS)
}

fn to_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    if config.inputs.is_empty() {
        return Err(ConfigError::NoInputs);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_tables() {
        let config = parse_config(r#"{ "inputs": ["regress.csv"] }"#).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("tables"));
        assert_eq!(config.database_path, "results.db");
        assert_eq!(config.risk_factors.get("bp_dia").unwrap(), "Diastolic Blood Pressure");
        assert_eq!(config.label_remaps.len(), 2);
        assert_eq!(config.normalizer().resolve_label("glc_met"), "Glucose Metabolism");
    }

    #[test]
    fn test_custom_tables_replace_defaults() {
        let config = parse_config(
            r#"{
                "inputs": ["a.csv", "b.csv"],
                "risk_factors": { "sbp": "Systolic Blood Pressure" },
                "label_remaps": {}
            }"#,
        )
        .unwrap();
        assert_eq!(config.inputs.len(), 2);
        assert_eq!(config.normalizer().resolve_label("sbp"), "Systolic Blood Pressure");
        assert_eq!(config.normalizer().resolve_label("bp_di"), "bp_di");
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(matches!(parse_config(r#"{ "inputs": [] }"#), Err(ConfigError::NoInputs)));
        assert!(matches!(parse_config("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "inputs": ["x.csv"], "output_dir": "out" }}"#).unwrap();
        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(matches!(load_config("/nonexistent/config.json"), Err(ConfigError::Io(_))));
    }
}
