// simlink_core/src/dispatcher.rs

use crate::engine::{ActuatorControl, ActuatorId, ServoControlMode, SimulationEngine};
use crate::error::DispatchIssue;
use crate::types::CommandTable;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Command verbs understood by the dispatcher. Matching is exact, so
/// `velocity` is an unknown verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Velocity,
    Torque,
    Position,
}

impl Verb {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "VELOCITY" => Some(Verb::Velocity),
            "TORQUE" => Some(Verb::Torque),
            "POSITION" => Some(Verb::Position),
            _ => None,
        }
    }
}

/// A single write performed on an actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlWrite {
    ServoVelocity(f64),
    ServoPosition(f64),
    ThrusterSetpoint(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedWrite {
    pub actuator: String,
    pub write: ControlWrite,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub applied: Vec<AppliedWrite>,
    pub issues: Vec<DispatchIssue>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Applies a command table to the engine's actuators.
///
/// Writes are immediate and never advance time. With several verbs for the
/// same actuator the last write wins; the order is unspecified.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActuatorDispatcher;

impl ActuatorDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, commands: &CommandTable, engine: &mut dyn SimulationEngine) -> DispatchReport {
        let mut report = DispatchReport::default();
        if commands.is_empty() {
            return report;
        }
        let mut seen: HashSet<&str> = HashSet::new();

        let mut index = 0;
        loop {
            let id = ActuatorId(index);
            index += 1;

            let Some(view) = engine.actuator(id) else {
                break;
            };
            let Some((name, verbs)) = commands.get_key_value(view.name) else {
                continue;
            };
            seen.insert(name.as_str());
            let type_name = view.type_name.to_string();

            let Some(control) = engine.actuator_control(id) else {
                continue;
            };
            match control {
                ActuatorControl::Servo(servo) => {
                    for (raw_verb, &value) in verbs {
                        let value = f64::from(value);
                        let write = match Verb::parse(raw_verb) {
                            Some(Verb::Velocity | Verb::Torque) => {
                                servo.set_control_mode(ServoControlMode::Velocity);
                                servo.set_desired_velocity(value);
                                ControlWrite::ServoVelocity(value)
                            }
                            Some(Verb::Position) => {
                                servo.set_control_mode(ServoControlMode::Position);
                                servo.set_desired_position(value);
                                ControlWrite::ServoPosition(value)
                            }
                            None => {
                                report.issues.push(DispatchIssue::UnknownVerb {
                                    actuator: name.clone(),
                                    verb: raw_verb.clone(),
                                    kind: "servo",
                                });
                                continue;
                            }
                        };
                        report.applied.push(AppliedWrite {
                            actuator: name.clone(),
                            write,
                        });
                    }
                }
                ActuatorControl::Thruster(thruster) => {
                    for (raw_verb, &value) in verbs {
                        let value = f64::from(value);
                        match Verb::parse(raw_verb) {
                            Some(Verb::Velocity | Verb::Torque) => {
                                thruster.set_setpoint(value);
                                report.applied.push(AppliedWrite {
                                    actuator: name.clone(),
                                    write: ControlWrite::ThrusterSetpoint(value),
                                });
                            }
                            _ => report.issues.push(DispatchIssue::UnknownVerb {
                                actuator: name.clone(),
                                verb: raw_verb.clone(),
                                kind: "thruster",
                            }),
                        }
                    }
                }
                ActuatorControl::Unsupported => {
                    report.issues.push(DispatchIssue::UnsupportedActuator {
                        actuator: name.clone(),
                        type_name,
                    });
                }
            }
        }

        let mut unknown: Vec<&String> = commands
            .keys()
            .filter(|name| !seen.contains(name.as_str()))
            .collect();
        unknown.sort();
        for name in unknown {
            report.issues.push(DispatchIssue::UnknownActuator(name.clone()));
        }

        for issue in &report.issues {
            warn!("[ActuatorDispatcher] {}", issue);
        }
        debug!("[ActuatorDispatcher] applied {} writes", report.applied.len());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ServoControlMode;
    use crate::test_support::MockEngine;
    use std::collections::HashMap;

    fn table(entries: &[(&str, &str, f32)]) -> CommandTable {
        let mut table: CommandTable = HashMap::new();
        for (actuator, verb, value) in entries {
            table
                .entry(actuator.to_string())
                .or_default()
                .insert(verb.to_string(), *value);
        }
        table
    }

    #[test]
    fn test_thruster_velocity_touches_only_target() {
        let mut engine = MockEngine::new()
            .with_thruster("thr1")
            .with_thruster("thr2")
            .with_servo("joint");
        let report = ActuatorDispatcher::new().apply(&table(&[("thr1", "VELOCITY", 5.0)]), &mut engine);

        assert!(report.is_clean());
        assert_eq!(engine.thruster("thr1").setpoint, 5.0);
        assert_eq!(engine.thruster("thr2").setpoint, 0.0);
        assert_eq!(engine.servo("joint").desired_velocity, 0.0);
        assert_eq!(
            report.applied,
            vec![AppliedWrite {
                actuator: "thr1".into(),
                write: ControlWrite::ThrusterSetpoint(5.0),
            }]
        );
        assert_eq!(engine.steps, 0);
    }

    #[test]
    fn test_servo_modes() {
        let mut engine = MockEngine::new().with_servo("a").with_servo("b");
        let commands = table(&[("a", "TORQUE", 0.5), ("b", "POSITION", -1.0)]);
        ActuatorDispatcher::new().apply(&commands, &mut engine);

        assert_eq!(engine.servo("a").mode, ServoControlMode::Velocity);
        assert_eq!(engine.servo("a").desired_velocity, 0.5);
        assert_eq!(engine.servo("b").mode, ServoControlMode::Position);
        assert_eq!(engine.servo("b").desired_position, -1.0);
    }

    #[test]
    fn test_unknown_verbs_and_kinds_are_reported() {
        let mut engine = MockEngine::new()
            .with_thruster("thr1")
            .with_servo("joint")
            .with_unsupported("light", "Light");
        let commands = table(&[
            ("thr1", "POSITION", 1.0),
            ("joint", "SPIN", 1.0),
            ("light", "VELOCITY", 1.0),
            ("ghost", "VELOCITY", 1.0),
            ("thr1", "velocity", 2.0),
        ]);
        let report = ActuatorDispatcher::new().apply(&commands, &mut engine);

        assert_eq!(engine.thruster("thr1").setpoint, 0.0);
        assert!(report.applied.is_empty());
        assert_eq!(report.issues.len(), 5);
        assert!(report.issues.contains(&DispatchIssue::UnknownVerb {
            actuator: "thr1".into(),
            verb: "velocity".into(),
            kind: "thruster",
        }));
        assert!(report.issues.contains(&DispatchIssue::UnknownVerb {
            actuator: "thr1".into(),
            verb: "POSITION".into(),
            kind: "thruster",
        }));
        assert!(report.issues.contains(&DispatchIssue::UnknownVerb {
            actuator: "joint".into(),
            verb: "SPIN".into(),
            kind: "servo",
        }));
        assert!(report.issues.contains(&DispatchIssue::UnsupportedActuator {
            actuator: "light".into(),
            type_name: "Light".into(),
        }));
        assert_eq!(
            report.issues.last(),
            Some(&DispatchIssue::UnknownActuator("ghost".into()))
        );
    }

    #[test]
    fn test_verbs_match_exactly() {
        assert_eq!(Verb::parse("VELOCITY"), Some(Verb::Velocity));
        assert_eq!(Verb::parse("TORQUE"), Some(Verb::Torque));
        assert_eq!(Verb::parse("POSITION"), Some(Verb::Position));
        assert_eq!(Verb::parse("Velocity"), None);
        assert_eq!(Verb::parse(" POSITION"), None);
    }

    #[test]
    fn test_empty_table_is_noop() {
        let mut engine = MockEngine::new().with_thruster("thr1");
        let report = ActuatorDispatcher::new().apply(&CommandTable::new(), &mut engine);
        assert_eq!(report, DispatchReport::default());
    }
}
