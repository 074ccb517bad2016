// simlink_core/src/test_support.rs

//! A scripted in-memory engine shared by the unit tests of this crate.

use crate::engine::*;
use nalgebra::{Isometry3, Translation3, UnitQuaternion};

pub struct MockRobot {
    pub name: String,
    pub pose: Isometry3<f64>,
}

pub struct MockSensor {
    pub name: String,
    pub kind: SensorKind,
    pub sample: Vec<f64>,
}

#[derive(Default)]
pub struct MockServo {
    pub state: ServoState,
}

impl ServoControl for MockServo {
    fn set_control_mode(&mut self, mode: ServoControlMode) {
        self.state.mode = mode;
    }

    fn set_desired_velocity(&mut self, velocity: f64) {
        self.state.desired_velocity = velocity;
    }

    fn set_desired_position(&mut self, position: f64) {
        self.state.desired_position = position;
    }
}

#[derive(Default)]
pub struct MockThruster {
    pub state: ThrusterState,
}

impl ThrusterControl for MockThruster {
    fn set_setpoint(&mut self, setpoint: f64) {
        self.state.setpoint = setpoint;
    }
}

pub enum MockActuatorKind {
    Servo(MockServo),
    Thruster(MockThruster),
    Other(String),
}

pub struct MockActuator {
    pub name: String,
    pub kind: MockActuatorKind,
}

#[derive(Default)]
pub struct MockEngine {
    pub robots: Vec<MockRobot>,
    pub sensors: Vec<MockSensor>,
    pub actuators: Vec<MockActuator>,
    pub contacts: Vec<Contact>,
    pub time: f64,
    pub steps: usize,
    pub refuse_respawn: bool,
}

impl MockEngine {
    pub const DT: f64 = 0.01;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_robot(self, name: &str, position: [f64; 3]) -> Self {
        let pose = Isometry3::from_parts(
            Translation3::new(position[0], position[1], position[2]),
            UnitQuaternion::identity(),
        );
        self.with_robot_pose(name, pose)
    }

    pub fn with_robot_pose(mut self, name: &str, pose: Isometry3<f64>) -> Self {
        self.robots.push(MockRobot {
            name: name.to_string(),
            pose,
        });
        self
    }

    pub fn with_sensor(mut self, name: &str, kind: SensorKind, sample: Vec<f64>) -> Self {
        self.sensors.push(MockSensor {
            name: name.to_string(),
            kind,
            sample,
        });
        self
    }

    pub fn with_imu(self, name: &str, sample: [f64; 9]) -> Self {
        self.with_sensor(name, SensorKind::Imu, sample.to_vec())
    }

    pub fn with_servo(mut self, name: &str) -> Self {
        self.actuators.push(MockActuator {
            name: name.to_string(),
            kind: MockActuatorKind::Servo(MockServo::default()),
        });
        self
    }

    pub fn with_thruster(mut self, name: &str) -> Self {
        self.actuators.push(MockActuator {
            name: name.to_string(),
            kind: MockActuatorKind::Thruster(MockThruster::default()),
        });
        self
    }

    pub fn with_unsupported(mut self, name: &str, type_name: &str) -> Self {
        self.actuators.push(MockActuator {
            name: name.to_string(),
            kind: MockActuatorKind::Other(type_name.to_string()),
        });
        self
    }

    pub fn with_contact(mut self, body_a: &str, body_b: &str) -> Self {
        self.contacts.push(Contact {
            body_a: body_a.to_string(),
            body_b: body_b.to_string(),
        });
        self
    }

    pub fn servo(&self, name: &str) -> &ServoState {
        self.actuators
            .iter()
            .find_map(|a| match &a.kind {
                MockActuatorKind::Servo(servo) if a.name == name => Some(&servo.state),
                _ => None,
            })
            .expect("no such servo")
    }

    pub fn thruster(&self, name: &str) -> &ThrusterState {
        self.actuators
            .iter()
            .find_map(|a| match &a.kind {
                MockActuatorKind::Thruster(thruster) if a.name == name => Some(&thruster.state),
                _ => None,
            })
            .expect("no such thruster")
    }
}

impl SimulationEngine for MockEngine {
    fn robot(&self, id: RobotId) -> Option<RobotView<'_>> {
        self.robots.get(id.0).map(|r| RobotView {
            name: &r.name,
            pose: r.pose,
        })
    }

    fn sensor(&self, id: SensorId) -> Option<SensorView<'_>> {
        self.sensors.get(id.0).map(|s| SensorView {
            name: &s.name,
            kind: s.kind,
            last_sample: &s.sample,
        })
    }

    fn actuator(&self, id: ActuatorId) -> Option<ActuatorView<'_>> {
        self.actuators.get(id.0).map(|a| match &a.kind {
            MockActuatorKind::Servo(servo) => ActuatorView {
                name: &a.name,
                type_name: "servo",
                state: ActuatorState::Servo(servo.state),
            },
            MockActuatorKind::Thruster(thruster) => ActuatorView {
                name: &a.name,
                type_name: "thruster",
                state: ActuatorState::Thruster(thruster.state),
            },
            MockActuatorKind::Other(type_name) => ActuatorView {
                name: &a.name,
                type_name,
                state: ActuatorState::Unsupported,
            },
        })
    }

    fn actuator_control(&mut self, id: ActuatorId) -> Option<ActuatorControl<'_>> {
        self.actuators.get_mut(id.0).map(|a| match &mut a.kind {
            MockActuatorKind::Servo(servo) => ActuatorControl::Servo(servo),
            MockActuatorKind::Thruster(thruster) => ActuatorControl::Thruster(thruster),
            MockActuatorKind::Other(_) => ActuatorControl::Unsupported,
        })
    }

    fn respawn_robot(&mut self, id: RobotId, pose: Isometry3<f64>) -> bool {
        if self.refuse_respawn {
            return false;
        }
        match self.robots.get_mut(id.0) {
            Some(robot) => {
                robot.pose = pose;
                true
            }
            None => false,
        }
    }

    fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn simulation_time(&self) -> f64 {
        self.time
    }

    fn step(&mut self) {
        self.time += Self::DT;
        self.steps += 1;
    }
}
