// simlink_core/src/engine.rs

use nalgebra::Isometry3;
use std::fmt;

// --- Entity Handles ---
// Handles are plain enumeration indices. They are only meaningful for the
// duration of one request because the engine may rebuild its entity set.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RobotId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SensorId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActuatorId(pub usize);

/// Everything an entity name can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Robot(RobotId),
    Sensor(SensorId),
    Actuator(ActuatorId),
}

// =========================================================================
// == Sensors ==
// =========================================================================

/// The runtime category of a sensor. Field keys are only valid for the
/// category they are namespaced under (`imu.*` needs an `Imu`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Imu,
    Odometry,
    Gps,
    Pressure,
    ForceTorque,
    Dvl,
    Encoder,
    Profiler,
    Multibeam,
    /// Vision sensors produce images, not scalar samples.
    Camera,
}

impl SensorKind {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, SensorKind::Camera)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Imu => "imu",
            SensorKind::Odometry => "odometry",
            SensorKind::Gps => "gps",
            SensorKind::Pressure => "pressure",
            SensorKind::ForceTorque => "force-torque",
            SensorKind::Dvl => "dvl",
            SensorKind::Encoder => "encoder",
            SensorKind::Profiler => "profiler",
            SensorKind::Multibeam => "multibeam",
            SensorKind::Camera => "camera",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =========================================================================
// == Actuators ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServoControlMode {
    #[default]
    Position,
    Velocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ServoState {
    pub position: f64,
    pub velocity: f64,
    pub desired_position: f64,
    pub desired_velocity: f64,
    pub mode: ServoControlMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThrusterState {
    pub setpoint: f64,
    pub thrust: f64,
    pub torque: f64,
    pub omega: f64,
}

/// Read-only state of an actuator, tagged by its runtime kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorState {
    Servo(ServoState),
    Thruster(ThrusterState),
    Unsupported,
}

impl ActuatorState {
    pub fn kind_str(&self) -> &'static str {
        match self {
            ActuatorState::Servo(_) => "servo",
            ActuatorState::Thruster(_) => "thruster",
            ActuatorState::Unsupported => "unsupported",
        }
    }
}

/// Control surface of a servo joint.
pub trait ServoControl {
    fn set_control_mode(&mut self, mode: ServoControlMode);
    fn set_desired_velocity(&mut self, velocity: f64);
    fn set_desired_position(&mut self, position: f64);
}

/// Control surface of a thruster. Thrusters have a single setpoint.
pub trait ThrusterControl {
    fn set_setpoint(&mut self, setpoint: f64);
}

/// Mutable access to an actuator's control surface, tagged by kind.
pub enum ActuatorControl<'a> {
    Servo(&'a mut dyn ServoControl),
    Thruster(&'a mut dyn ThrusterControl),
    Unsupported,
}

// =========================================================================
// == Views ==
// =========================================================================

#[derive(Debug, Clone, Copy)]
pub struct RobotView<'a> {
    pub name: &'a str,
    /// World pose of the robot's base link.
    pub pose: Isometry3<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct SensorView<'a> {
    pub name: &'a str,
    pub kind: SensorKind,
    /// The most recent sample, one value per channel. Empty for non-scalar sensors.
    pub last_sample: &'a [f64],
}

#[derive(Debug, Clone, Copy)]
pub struct ActuatorView<'a> {
    pub name: &'a str,
    /// The engine's own type label, used for diagnostics on unsupported kinds.
    pub type_name: &'a str,
    pub state: ActuatorState,
}

/// A pair of bodies that were in contact during the last tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub body_a: String,
    pub body_b: String,
}

// --- SIMULATION ENGINE TRAIT ---
// The narrow contract the bridge needs from a simulator. The reference host
// implements it for its kinematic scene; tests implement it with a mock.
pub trait SimulationEngine {
    /// Returns the robot at `id`, or `None` once the enumeration is exhausted.
    fn robot(&self, id: RobotId) -> Option<RobotView<'_>>;

    /// Returns the sensor at `id`, or `None` once the enumeration is exhausted.
    fn sensor(&self, id: SensorId) -> Option<SensorView<'_>>;

    /// Returns the actuator at `id`, or `None` once the enumeration is exhausted.
    fn actuator(&self, id: ActuatorId) -> Option<ActuatorView<'_>>;

    /// Mutable control surface of the actuator at `id`.
    fn actuator_control(&mut self, id: ActuatorId) -> Option<ActuatorControl<'_>>;

    /// Teleports a robot to `pose`, zeroing its velocities.
    /// Returns `false` if the engine refused (e.g. `id` is stale).
    fn respawn_robot(&mut self, id: RobotId, pose: Isometry3<f64>) -> bool;

    /// Contacts reported by the last completed tick.
    fn contacts(&self) -> &[Contact];

    /// Current simulation time in seconds.
    fn simulation_time(&self) -> f64;

    /// Advances the simulation by exactly one tick.
    fn step(&mut self);
}
