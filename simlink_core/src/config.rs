// simlink_core/src/config.rs

//! Observation and action schema loading.
//!
//! Both files are JSON. The observation schema never fails to load: any
//! problem is logged and the built-in default schema is used instead.

use crate::error::ConfigError;
use crate::types::{ActionConfig, ActionSpec, ObservationConfig, ObservationSpec};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

// --- File Layout ---
// Specs may live under a named section or directly at the root.

#[derive(Deserialize)]
struct RawObservationSpec {
    entity_name: Option<String>,
    field_type: Option<String>,
    #[serde(default)]
    component: String,
    #[serde(default)]
    output_name: String,
}

#[derive(Deserialize)]
struct RawSection<T> {
    specs: Option<Vec<T>>,
}

#[derive(Deserialize)]
struct RawObservationFile {
    observation_config: Option<RawSection<RawObservationSpec>>,
    specs: Option<Vec<RawObservationSpec>>,
}

#[derive(Deserialize)]
struct RawActionFile {
    action_config: Option<RawSection<ActionSpec>>,
    specs: Option<Vec<ActionSpec>>,
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

// =========================================================================
// == Observation Schema ==
// =========================================================================

/// Parses an observation schema. Specs without `entity_name` or
/// `field_type` are dropped; an empty result is an error.
pub fn parse_observation_config(text: &str) -> Result<ObservationConfig, ConfigError> {
    let raw: RawObservationFile = serde_json::from_str(text)?;
    let raw_specs = raw
        .observation_config
        .and_then(|section| section.specs)
        .or(raw.specs)
        .unwrap_or_default();

    let specs: Vec<ObservationSpec> = raw_specs
        .into_iter()
        .filter_map(|raw| {
            let entity_name = raw.entity_name?;
            let field_type = raw.field_type?;
            let mut spec = ObservationSpec {
                entity_name,
                field_type,
                component: raw.component,
                output_name: raw.output_name,
            };
            if spec.output_name.is_empty() {
                spec.output_name = format!("{}.{}", spec.entity_name, spec.field_key());
            }
            Some(spec)
        })
        .collect();

    if specs.is_empty() {
        return Err(ConfigError::EmptySpecs);
    }
    Ok(ObservationConfig { specs })
}

pub fn try_load_observation_config(path: impl AsRef<Path>) -> Result<ObservationConfig, ConfigError> {
    parse_observation_config(&read_file(path.as_ref())?)
}

/// Loads the observation schema, falling back to the default on any error.
pub fn load_observation_config(path: impl AsRef<Path>) -> ObservationConfig {
    let path = path.as_ref();
    match try_load_observation_config(path) {
        Ok(config) => {
            info!(
                "Loaded {} observation specs from '{}'",
                config.len(),
                path.display()
            );
            config
        }
        Err(err) => {
            warn!("{}. Using default observation schema.", err);
            ObservationConfig::default()
        }
    }
}

// =========================================================================
// == Action Schema ==
// =========================================================================

pub fn parse_action_config(text: &str) -> Result<ActionConfig, ConfigError> {
    let raw: RawActionFile = serde_json::from_str(text)?;
    let specs = raw
        .action_config
        .and_then(|section| section.specs)
        .or(raw.specs)
        .unwrap_or_default();

    if specs.is_empty() {
        return Err(ConfigError::EmptyActions);
    }
    Ok(ActionConfig { specs })
}

pub fn load_action_config(path: impl AsRef<Path>) -> Result<ActionConfig, ConfigError> {
    let config = parse_action_config(&read_file(path.as_ref())?)?;
    info!(
        "Loaded {} action specs from '{}'",
        config.specs.len(),
        path.as_ref().display()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const OBSERVATION_JSON: &str = r#"{
        "observation_config": {
            "specs": [
                {"entity_name": "girona", "field_type": "position", "component": "x", "output_name": "x"},
                {"entity_name": "imu", "field_type": "imu.rotation", "component": "yaw", "output_name": "yaw"},
                {"field_type": "position", "component": "y", "output_name": "dropped"},
                {"entity_name": "girona", "component": "z", "output_name": "dropped too"},
                {"entity_name": "thr1", "field_type": "setpoint"}
            ]
        }
    }"#;

    #[test]
    fn test_parse_drops_incomplete_specs() {
        let config = parse_observation_config(OBSERVATION_JSON).unwrap();
        let names: Vec<_> = config.specs.iter().map(|s| s.output_name.as_str()).collect();
        assert_eq!(names, ["x", "yaw", "thr1.setpoint"]);
        assert_eq!(config.specs[1].field_key(), "imu.rotation.yaw");
    }

    #[test]
    fn test_root_level_specs_accepted() {
        let text = r#"{"specs": [{"entity_name": "r", "field_type": "position", "component": "x"}]}"#;
        let config = parse_observation_config(text).unwrap();
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_empty_or_invalid_schema_is_error() {
        assert!(matches!(
            parse_observation_config(r#"{"observation_config": {"specs": []}}"#),
            Err(ConfigError::EmptySpecs)
        ));
        assert!(matches!(
            parse_observation_config("{not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_load_falls_back_to_default() {
        let missing = load_observation_config("/definitely/not/here.json");
        assert_eq!(missing, ObservationConfig::default());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        assert_eq!(load_observation_config(file.path()), ObservationConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", OBSERVATION_JSON).unwrap();
        assert_eq!(load_observation_config(file.path()).len(), 3);
    }

    #[test]
    fn test_action_config_defaults_bounds() {
        let text = r#"{
            "action_config": {
                "specs": [
                    {"actuator_name": "thr1", "action_type": "VELOCITY", "output_name": "t1"},
                    {"actuator_name": "joint", "action_type": "POSITION", "min_value": -3.0, "max_value": 3.0}
                ]
            }
        }"#;
        let config = parse_action_config(text).unwrap();
        assert_eq!(config.specs.len(), 2);
        assert_eq!(config.specs[0].min_value, -1.0);
        assert_eq!(config.specs[0].max_value, 1.0);
        assert_eq!(config.specs[1].max_value, 3.0);

        assert!(matches!(
            parse_action_config(r#"{"action_config": {}}"#),
            Err(ConfigError::EmptyActions)
        ));
    }
}
