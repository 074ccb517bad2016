// simlink_core/src/registry.rs

//! Dotted field path → extractor dispatch tables.
//!
//! There is one table per entity category. Each maps an exact key such as
//! `"rotation.yaw"` or `"imu.angular_velocity.z"` to a small tagged value
//! describing what to read. Extraction is a pure read of the engine; it never
//! advances time.

use crate::collision::CollisionRule;
use crate::engine::{
    ActuatorId, ActuatorState, RobotId, SensorId, SensorKind, ServoControlMode, SimulationEngine,
};
use crate::error::ExtractionError;
use nalgebra::{Quaternion, UnitQuaternion};
use std::collections::HashMap;

/// Everything an extractor is allowed to look at.
#[derive(Clone, Copy)]
pub struct QueryContext<'a> {
    pub engine: &'a dyn SimulationEngine,
    pub collision: &'a CollisionRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotField {
    PositionX,
    PositionY,
    PositionZ,
    Roll,
    Pitch,
    Yaw,
    Collision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EulerAngle {
    Roll,
    Pitch,
    Yaw,
}

/// How a value is read out of a sensor's last sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorRead {
    /// One channel, as sampled.
    Channel(usize),
    /// One Euler ZYX angle of the `x, y, z, w` quaternion stored in the four
    /// channels starting at `first`.
    QuaternionEuler { first: usize, angle: EulerAngle },
}

/// What to read from a sensor. `kind == None` accepts any scalar sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorField {
    pub kind: Option<SensorKind>,
    pub read: SensorRead,
}

impl SensorField {
    pub const fn of(kind: SensorKind, channel: usize) -> Self {
        Self {
            kind: Some(kind),
            read: SensorRead::Channel(channel),
        }
    }

    pub const fn any(channel: usize) -> Self {
        Self {
            kind: None,
            read: SensorRead::Channel(channel),
        }
    }

    pub const fn euler(kind: SensorKind, first: usize, angle: EulerAngle) -> Self {
        Self {
            kind: Some(kind),
            read: SensorRead::QuaternionEuler { first, angle },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorField {
    ServoPosition,
    ServoVelocity,
    ServoDesiredPosition,
    ServoDesiredVelocity,
    ThrusterSetpoint,
    ThrusterThrust,
    ThrusterTorque,
    ThrusterOmega,
    /// Servo: the desired value of the active control mode. Thruster: setpoint.
    Setpoint,
}

/// Dynamic generic channel keys: `sensor.channel0`, `sensor.channel1`, ...
const GENERIC_CHANNEL_PREFIX: &str = "sensor.channel";

#[derive(Debug, Clone)]
pub struct FieldRegistry {
    robot: HashMap<String, RobotField>,
    sensor: HashMap<String, SensorField>,
    actuator: HashMap<String, ActuatorField>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FieldRegistry {
    /// An empty registry. Every lookup fails until fields are registered.
    pub fn empty() -> Self {
        Self {
            robot: HashMap::new(),
            sensor: HashMap::new(),
            actuator: HashMap::new(),
        }
    }

    /// The full built-in key set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();

        // --- Robot ---
        registry.register_robot_field("position.x", RobotField::PositionX);
        registry.register_robot_field("position.y", RobotField::PositionY);
        registry.register_robot_field("position.z", RobotField::PositionZ);
        registry.register_robot_field("rotation.roll", RobotField::Roll);
        registry.register_robot_field("rotation.pitch", RobotField::Pitch);
        registry.register_robot_field("rotation.yaw", RobotField::Yaw);
        registry.register_robot_field("collision.binary", RobotField::Collision);

        // --- Sensors ---
        use SensorKind::*;
        let channels: &[(&str, SensorKind, usize)] = &[
            ("imu.rotation.roll", Imu, 0),
            ("imu.rotation.pitch", Imu, 1),
            ("imu.rotation.yaw", Imu, 2),
            ("imu.angular_velocity.x", Imu, 3),
            ("imu.angular_velocity.y", Imu, 4),
            ("imu.angular_velocity.z", Imu, 5),
            ("imu.linear_acceleration.x", Imu, 6),
            ("imu.linear_acceleration.y", Imu, 7),
            ("imu.linear_acceleration.z", Imu, 8),
            ("odom.position.x", Odometry, 0),
            ("odom.position.y", Odometry, 1),
            ("odom.position.z", Odometry, 2),
            ("odom.linear_velocity.x", Odometry, 3),
            ("odom.linear_velocity.y", Odometry, 4),
            ("odom.linear_velocity.z", Odometry, 5),
            ("odom.orientation.x", Odometry, 6),
            ("odom.orientation.y", Odometry, 7),
            ("odom.orientation.z", Odometry, 8),
            ("odom.orientation.w", Odometry, 9),
            ("odom.angular_velocity.x", Odometry, 10),
            ("odom.angular_velocity.y", Odometry, 11),
            ("odom.angular_velocity.z", Odometry, 12),
            ("gps.latitude", Gps, 0),
            ("gps.longitude", Gps, 1),
            ("gps.north", Gps, 2),
            ("gps.east", Gps, 3),
            ("pressure.value", Pressure, 0),
            ("pressure.depth", Pressure, 0),
            ("ft.force.x", ForceTorque, 0),
            ("ft.force.y", ForceTorque, 1),
            ("ft.force.z", ForceTorque, 2),
            ("ft.torque.x", ForceTorque, 3),
            ("ft.torque.y", ForceTorque, 4),
            ("ft.torque.z", ForceTorque, 5),
            ("dvl.velocity.x", Dvl, 0),
            ("dvl.velocity.y", Dvl, 1),
            ("dvl.velocity.z", Dvl, 2),
            ("dvl.altitude", Dvl, 3),
            ("encoder.angle", Encoder, 0),
            ("encoder.angular_velocity", Encoder, 1),
            ("profiler.range", Profiler, 0),
            ("multibeam.range", Multibeam, 0),
        ];
        for (key, kind, channel) in channels {
            registry.register_sensor_field(key, SensorField::of(*kind, *channel));
        }
        registry.register_sensor_field("sensor.value", SensorField::any(0));
        registry.register_sensor_field("odom.rotation.roll", SensorField::euler(Odometry, 6, EulerAngle::Roll));
        registry.register_sensor_field("odom.rotation.pitch", SensorField::euler(Odometry, 6, EulerAngle::Pitch));
        registry.register_sensor_field("odom.rotation.yaw", SensorField::euler(Odometry, 6, EulerAngle::Yaw));

        // --- Actuators ---
        registry.register_actuator_field("servo.position", ActuatorField::ServoPosition);
        registry.register_actuator_field("servo.velocity", ActuatorField::ServoVelocity);
        registry.register_actuator_field("servo.desired_position", ActuatorField::ServoDesiredPosition);
        registry.register_actuator_field("servo.desired_velocity", ActuatorField::ServoDesiredVelocity);
        registry.register_actuator_field("thruster.setpoint", ActuatorField::ThrusterSetpoint);
        registry.register_actuator_field("thruster.thrust", ActuatorField::ThrusterThrust);
        registry.register_actuator_field("thruster.torque", ActuatorField::ThrusterTorque);
        registry.register_actuator_field("thruster.omega", ActuatorField::ThrusterOmega);
        registry.register_actuator_field("setpoint", ActuatorField::Setpoint);

        registry
    }

    // --- Registration ---
    // Registering an existing key replaces its extractor.

    pub fn register_robot_field(&mut self, key: &str, field: RobotField) {
        self.robot.insert(key.to_string(), field);
    }

    pub fn register_sensor_field(&mut self, key: &str, field: SensorField) {
        self.sensor.insert(key.to_string(), field);
    }

    pub fn register_actuator_field(&mut self, key: &str, field: ActuatorField) {
        self.actuator.insert(key.to_string(), field);
    }

    // --- Lookup ---

    pub fn robot_field(&self, key: &str) -> Option<RobotField> {
        self.robot.get(key).copied()
    }

    pub fn sensor_field(&self, key: &str) -> Option<SensorField> {
        if let Some(field) = self.sensor.get(key) {
            return Some(*field);
        }
        key.strip_prefix(GENERIC_CHANNEL_PREFIX)
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<usize>().ok())
            .map(SensorField::any)
    }

    pub fn actuator_field(&self, key: &str) -> Option<ActuatorField> {
        self.actuator.get(key).copied()
    }

    /// True if `key` is known to at least one registry.
    pub fn is_known(&self, key: &str) -> bool {
        self.robot_field(key).is_some()
            || self.sensor_field(key).is_some()
            || self.actuator_field(key).is_some()
    }

    // --- Extraction ---

    pub fn extract_robot(
        &self,
        ctx: QueryContext<'_>,
        id: RobotId,
        key: &str,
    ) -> Result<f64, ExtractionError> {
        let field = self.robot_field(key).ok_or_else(|| ExtractionError::UnknownField {
            registry: "robot",
            key: key.to_string(),
        })?;
        let robot = ctx
            .engine
            .robot(id)
            .ok_or_else(|| ExtractionError::EntityNotFound(format!("robot #{}", id.0)))?;

        let translation = robot.pose.translation.vector;
        let value = match field {
            RobotField::PositionX => translation.x,
            RobotField::PositionY => translation.y,
            RobotField::PositionZ => translation.z,
            RobotField::Roll => robot.pose.rotation.euler_angles().0,
            RobotField::Pitch => robot.pose.rotation.euler_angles().1,
            RobotField::Yaw => robot.pose.rotation.euler_angles().2,
            RobotField::Collision => ctx.collision.flag(ctx.engine, robot.name),
        };
        Ok(value)
    }

    pub fn extract_sensor(
        &self,
        ctx: QueryContext<'_>,
        id: SensorId,
        key: &str,
    ) -> Result<f64, ExtractionError> {
        let field = self.sensor_field(key).ok_or_else(|| ExtractionError::UnknownField {
            registry: "sensor",
            key: key.to_string(),
        })?;
        let sensor = ctx
            .engine
            .sensor(id)
            .ok_or_else(|| ExtractionError::EntityNotFound(format!("sensor #{}", id.0)))?;

        if !sensor.kind.is_scalar() {
            return Err(ExtractionError::NotScalar(sensor.name.to_string()));
        }
        if let Some(expected) = field.kind {
            if expected != sensor.kind {
                return Err(ExtractionError::SensorKindMismatch {
                    sensor: sensor.name.to_string(),
                    expected,
                    found: sensor.kind,
                });
            }
        }

        let channel = |index: usize| {
            sensor
                .last_sample
                .get(index)
                .copied()
                .ok_or_else(|| ExtractionError::ChannelOutOfRange {
                    sensor: sensor.name.to_string(),
                    channel: index,
                    available: sensor.last_sample.len(),
                })
        };

        match field.read {
            SensorRead::Channel(index) => channel(index),
            SensorRead::QuaternionEuler { first, angle } => {
                let (x, y, z, w) = (
                    channel(first)?,
                    channel(first + 1)?,
                    channel(first + 2)?,
                    channel(first + 3)?,
                );
                // A zero quaternion yields NaN, which the assembler reports.
                let (roll, pitch, yaw) =
                    UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)).euler_angles();
                Ok(match angle {
                    EulerAngle::Roll => roll,
                    EulerAngle::Pitch => pitch,
                    EulerAngle::Yaw => yaw,
                })
            }
        }
    }

    pub fn extract_actuator(
        &self,
        ctx: QueryContext<'_>,
        id: ActuatorId,
        key: &str,
    ) -> Result<f64, ExtractionError> {
        let field = self.actuator_field(key).ok_or_else(|| ExtractionError::UnknownField {
            registry: "actuator",
            key: key.to_string(),
        })?;
        let actuator = ctx
            .engine
            .actuator(id)
            .ok_or_else(|| ExtractionError::EntityNotFound(format!("actuator #{}", id.0)))?;

        let value = match (field, actuator.state) {
            (ActuatorField::ServoPosition, ActuatorState::Servo(s)) => Some(s.position),
            (ActuatorField::ServoVelocity, ActuatorState::Servo(s)) => Some(s.velocity),
            (ActuatorField::ServoDesiredPosition, ActuatorState::Servo(s)) => Some(s.desired_position),
            (ActuatorField::ServoDesiredVelocity, ActuatorState::Servo(s)) => Some(s.desired_velocity),
            (ActuatorField::Setpoint, ActuatorState::Servo(s)) => Some(match s.mode {
                ServoControlMode::Position => s.desired_position,
                ServoControlMode::Velocity => s.desired_velocity,
            }),
            (ActuatorField::ThrusterSetpoint | ActuatorField::Setpoint, ActuatorState::Thruster(t)) => {
                Some(t.setpoint)
            }
            (ActuatorField::ThrusterThrust, ActuatorState::Thruster(t)) => Some(t.thrust),
            (ActuatorField::ThrusterTorque, ActuatorState::Thruster(t)) => Some(t.torque),
            (ActuatorField::ThrusterOmega, ActuatorState::Thruster(t)) => Some(t.omega),
            _ => None,
        };

        value.ok_or_else(|| ExtractionError::ActuatorKindMismatch {
            actuator: actuator.name.to_string(),
            key: key.to_string(),
        })
    }
}
