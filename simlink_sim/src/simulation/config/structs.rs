// simlink_sim/src/simulation/config/structs.rs

use bevy::prelude::Resource;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use simlink_core::engine::SensorKind;
use std::path::PathBuf;

use crate::simulation::utils::serde_helpers;

// =========================================================================
// == Host Settings ==
// =========================================================================

/// # HostSettings
/// Everything the host process needs before the scene exists. Read from
/// `simlink.toml`, then `SIMLINK_*` environment variables, then CLI flags.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Address the bridge reply socket binds to.
    pub bind_address: String,
    /// Simulation ticks per second. One tick is `1 / step_frequency` seconds.
    pub step_frequency: f64,
    pub observation_config: PathBuf,
    pub scenario: PathBuf,
    /// Receive timeout in milliseconds. `None` blocks forever.
    pub recv_timeout_ms: Option<u64>,
    pub max_frame_len: usize,
    /// Body names that count as a collision for `collision_flag`.
    pub collision_targets: Vec<String>,
    /// How long the app loop sleeps between polls while idle.
    pub idle_poll_ms: u64,
    /// Optional telemetry publisher address.
    pub telemetry_address: Option<String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5555".to_string(),
            step_frequency: 100.0,
            observation_config: "assets/observation_config.json".into(),
            scenario: "assets/scenarios/girona_tank.toml".into(),
            recv_timeout_ms: None,
            max_frame_len: 1 << 20,
            collision_targets: vec!["Tank".to_string()],
            idle_poll_ms: 1,
            telemetry_address: None,
        }
    }
}

impl HostSettings {
    /// Tick length in seconds.
    pub fn step_dt(&self) -> f64 {
        if self.step_frequency > 0.0 {
            1.0 / self.step_frequency
        } else {
            0.01
        }
    }
}

// =========================================================================
// == Scenario ==
// =========================================================================

/// # ScenarioConfig
/// The scene the host simulates, parsed from a scenario TOML file.
#[derive(Resource, Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub robots: Vec<RobotConfig>,
    #[serde(default)]
    pub thrusters: Vec<ThrusterConfig>,
    #[serde(default)]
    pub servos: Vec<ServoConfig>,
    /// Actuators the bridge knows by name but cannot drive.
    #[serde(default)]
    pub lights: Vec<LightConfig>,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
    #[serde(default)]
    pub statics: Vec<StaticBodyConfig>,
}

impl ScenarioConfig {
    /// The scene used when no scenario file can be read: one vehicle with
    /// two thrusters, an IMU, and a tank to bump into.
    pub fn fallback() -> Self {
        Self {
            simulation: SimulationSection::default(),
            robots: vec![RobotConfig::named("girona")],
            thrusters: vec![
                ThrusterConfig::on("thr1", "girona", Vector3::x(), Vector3::new(0.0, 0.3, 0.0)),
                ThrusterConfig::on("thr2", "girona", Vector3::x(), Vector3::new(0.0, -0.3, 0.0)),
            ],
            servos: Vec::new(),
            lights: Vec::new(),
            sensors: vec![SensorConfig {
                name: "imu".to_string(),
                kind: SensorKindConfig::Imu,
                parent: "girona".to_string(),
                noise_stddev: 0.0,
                max_range: default_max_range(),
            }],
            statics: vec![StaticBodyConfig {
                name: "Tank".to_string(),
                position: Vector3::new(10.0, 0.0, 0.0),
                radius: 1.0,
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Seed for sensor noise. Unseeded runs draw from OS entropy.
    pub seed: Option<u64>,
    /// Gravity in m/s^2, world frame. Only the IMU sees it; robots are
    /// neutrally buoyant.
    #[serde(default = "default_gravity")]
    pub gravity: [f64; 3],
    /// Height of the flat seafloor used for DVL altitude.
    #[serde(default = "default_seafloor")]
    pub seafloor_z: f64,
    /// `[lat, lon]` in degrees of the world origin, for GPS.
    #[serde(default = "default_gps_origin")]
    pub gps_origin: [f64; 2],
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: None,
            gravity: default_gravity(),
            seafloor_z: default_seafloor(),
            gps_origin: default_gps_origin(),
        }
    }
}

fn default_gravity() -> [f64; 3] {
    [0.0, 0.0, -9.81]
}

fn default_seafloor() -> f64 {
    -20.0
}

fn default_gps_origin() -> [f64; 2] {
    [41.7777, 3.0333]
}

// =========================================================================
// == Helper Structs for Nested Configuration ==
// =========================================================================

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    #[serde(deserialize_with = "serde_helpers::vec3_from_array", default = "zero_vector")]
    pub translation: Vector3<f64>,

    #[serde(
        deserialize_with = "serde_helpers::quat_from_euler_deg",
        default = "identity_rotation"
    )]
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }
}

fn zero_vector() -> Vector3<f64> {
    Vector3::zeros()
}

fn identity_rotation() -> UnitQuaternion<f64> {
    UnitQuaternion::identity()
}

fn forward() -> Vector3<f64> {
    Vector3::x()
}

impl Pose {
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotConfig {
    pub name: String,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default = "default_mass")]
    pub mass: f64,
    /// Radius of the bounding sphere used for contacts and inertia.
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// Linear drag coefficient, 1/s.
    #[serde(default = "default_drag")]
    pub linear_drag: f64,
    /// Angular drag coefficient, 1/s.
    #[serde(default = "default_drag")]
    pub angular_drag: f64,
}

impl RobotConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pose: Pose::default(),
            mass: default_mass(),
            radius: default_radius(),
            linear_drag: default_drag(),
            angular_drag: default_drag(),
        }
    }
}

fn default_mass() -> f64 {
    100.0
}

fn default_radius() -> f64 {
    0.5
}

fn default_drag() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrusterConfig {
    pub name: String,
    /// Name of the robot the thruster pushes.
    pub robot: String,
    /// Thrust axis in the robot's body frame.
    #[serde(deserialize_with = "serde_helpers::vec3_from_array", default = "forward")]
    pub direction: Vector3<f64>,
    /// Mount point relative to the robot's origin, body frame.
    #[serde(deserialize_with = "serde_helpers::vec3_from_array", default = "zero_vector")]
    pub lever_arm: Vector3<f64>,
    /// Thrust in newtons at a setpoint of 1.0.
    #[serde(default = "default_max_thrust")]
    pub max_thrust: f64,
    /// First-order lag of the propeller, seconds.
    #[serde(default = "default_time_constant")]
    pub time_constant: f64,
    /// Reaction torque per newton of thrust.
    #[serde(default = "default_torque_coefficient")]
    pub torque_coefficient: f64,
}

impl ThrusterConfig {
    pub fn on(name: &str, robot: &str, direction: Vector3<f64>, lever_arm: Vector3<f64>) -> Self {
        Self {
            name: name.to_string(),
            robot: robot.to_string(),
            direction,
            lever_arm,
            max_thrust: default_max_thrust(),
            time_constant: default_time_constant(),
            torque_coefficient: default_torque_coefficient(),
        }
    }
}

fn default_max_thrust() -> f64 {
    100.0
}

fn default_time_constant() -> f64 {
    0.1
}

fn default_torque_coefficient() -> f64 {
    0.02
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServoConfig {
    pub name: String,
    /// Proportional gain used in position mode, 1/s.
    #[serde(default = "default_servo_gain")]
    pub gain: f64,
    /// Joint speed limit, rad/s.
    #[serde(default = "default_servo_speed")]
    pub max_velocity: f64,
    /// `[min, max]` joint position, rad.
    pub limits: Option<[f64; 2]>,
}

fn default_servo_gain() -> f64 {
    5.0
}

fn default_servo_speed() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightConfig {
    pub name: String,
}

/// Sensor kinds as written in scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SensorKindConfig {
    Imu,
    Odometry,
    Gps,
    Pressure,
    ForceTorque,
    Dvl,
    Encoder,
    Profiler,
    Multibeam,
    Camera,
}

impl From<SensorKindConfig> for SensorKind {
    fn from(kind: SensorKindConfig) -> Self {
        match kind {
            SensorKindConfig::Imu => SensorKind::Imu,
            SensorKindConfig::Odometry => SensorKind::Odometry,
            SensorKindConfig::Gps => SensorKind::Gps,
            SensorKindConfig::Pressure => SensorKind::Pressure,
            SensorKindConfig::ForceTorque => SensorKind::ForceTorque,
            SensorKindConfig::Dvl => SensorKind::Dvl,
            SensorKindConfig::Encoder => SensorKind::Encoder,
            SensorKindConfig::Profiler => SensorKind::Profiler,
            SensorKindConfig::Multibeam => SensorKind::Multibeam,
            SensorKindConfig::Camera => SensorKind::Camera,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    pub name: String,
    pub kind: SensorKindConfig,
    /// Robot name, or servo name for encoders.
    pub parent: String,
    /// Standard deviation of additive Gaussian noise on every channel.
    #[serde(default)]
    pub noise_stddev: f64,
    /// Maximum range for range-finding sensors, meters.
    #[serde(default = "default_max_range")]
    pub max_range: f64,
}

fn default_max_range() -> f64 {
    50.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticBodyConfig {
    pub name: String,
    #[serde(deserialize_with = "serde_helpers::vec3_from_array")]
    pub position: Vector3<f64>,
    pub radius: f64,
}
