// simlink_core/src/types.rs

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// --- Observation Schema ---

/// One slot of the observation vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpec {
    pub entity_name: String,
    pub field_type: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub output_name: String,
}

impl ObservationSpec {
    pub fn new(entity_name: &str, field_type: &str, component: &str, output_name: &str) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            field_type: field_type.to_string(),
            component: component.to_string(),
            output_name: output_name.to_string(),
        }
    }

    /// The registry key: `field_type.component`, or just `field_type`
    /// when the component is empty.
    pub fn field_key(&self) -> String {
        if self.component.is_empty() {
            self.field_type.clone()
        } else {
            format!("{}.{}", self.field_type, self.component)
        }
    }

    pub fn is_collision(&self) -> bool {
        self.field_type == "collision"
    }
}

/// The ordered observation schema. Index `i` of every observation vector
/// is produced by `specs[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationConfig {
    pub specs: Vec<ObservationSpec>,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            specs: vec![
                ObservationSpec::new("girona", "position", "x", "robot_x"),
                ObservationSpec::new("girona", "position", "y", "robot_y"),
                ObservationSpec::new("girona", "position", "z", "robot_z"),
                ObservationSpec::new("girona", "rotation", "yaw", "robot_yaw"),
                ObservationSpec::new("girona", "collision", "binary", "collision_flag"),
            ],
        }
    }
}

impl ObservationConfig {
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

// --- Action Schema ---

fn default_min() -> f32 {
    -1.0
}

fn default_max() -> f32 {
    1.0
}

/// One slot of the controller's action vector and the actuator write it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub actuator_name: String,
    pub action_type: String,
    #[serde(default)]
    pub output_name: String,
    #[serde(default = "default_min")]
    pub min_value: f32,
    #[serde(default = "default_max")]
    pub max_value: f32,
}

impl ActionSpec {
    /// Clamps a raw action into `[min_value, max_value]`.
    pub fn clamp(&self, value: f32) -> f32 {
        let (lo, hi) = if self.min_value <= self.max_value {
            (self.min_value, self.max_value)
        } else {
            (self.max_value, self.min_value)
        };
        value.clamp(lo, hi)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionConfig {
    pub specs: Vec<ActionSpec>,
}

// --- Requests ---

/// Pose target for one robot, as carried by a RESET request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotResetInfo {
    pub name: String,
    pub position: Vec<f64>,
    pub rotation: Vec<f64>,
}

/// actuator name -> (verb -> value)
pub type CommandTable = HashMap<String, HashMap<String, f32>>;

/// Entity names the controller asked to observe. Empty means "all".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservationFilter {
    names: HashSet<String>,
}

impl ObservationFilter {
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_relevant(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ObservationFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key_joins_component() {
        let spec = ObservationSpec::new("girona", "rotation", "yaw", "robot_yaw");
        assert_eq!(spec.field_key(), "rotation.yaw");

        let bare = ObservationSpec::new("imu", "imu.rotation.roll", "", "roll");
        assert_eq!(bare.field_key(), "imu.rotation.roll");
    }

    #[test]
    fn test_default_observation_config() {
        let config = ObservationConfig::default();
        let names: Vec<_> = config.specs.iter().map(|s| s.output_name.as_str()).collect();
        assert_eq!(
            names,
            ["robot_x", "robot_y", "robot_z", "robot_yaw", "collision_flag"]
        );
        assert!(config.specs[4].is_collision());
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let mut filter = ObservationFilter::default();
        assert!(filter.is_relevant("girona"));
        assert!(filter.is_relevant("anything"));

        filter.insert("girona");
        assert!(filter.is_relevant("girona"));
        assert!(!filter.is_relevant("bluerov"));

        filter.clear();
        assert!(filter.is_relevant("bluerov"));
    }

    #[test]
    fn test_action_spec_clamp_handles_swapped_bounds() {
        let spec = ActionSpec {
            actuator_name: "thr1".into(),
            action_type: "VELOCITY".into(),
            output_name: String::new(),
            min_value: 2.0,
            max_value: -2.0,
        };
        assert_eq!(spec.clamp(5.0), 2.0);
        assert_eq!(spec.clamp(-5.0), -2.0);
        assert_eq!(spec.clamp(0.5), 0.5);
    }
}
