// simlink_sim/src/simulation/core/world.rs

//! The kinematic scene the host steps.
//!
//! Robots are neutrally buoyant rigid spheres driven by thrusters and
//! slowed by linear drag. Servos are free-standing joints. Sensors sample
//! their parent after every tick. Contacts are sphere overlaps.

use bevy::prelude::*;
use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use simlink_core::engine::{
    ActuatorControl, ActuatorId, ActuatorState, ActuatorView, Contact, RobotId, RobotView,
    SensorId, SensorKind, SensorView, ServoControl, ServoControlMode, ServoState,
    SimulationEngine, ThrusterControl, ThrusterState,
};

use super::prng::simulation_rng;
use crate::simulation::config::structs::{
    RobotConfig, ScenarioConfig, SensorConfig, ServoConfig, ThrusterConfig,
};

const EARTH_RADIUS: f64 = 6_378_137.0;
const MIN_MASS: f64 = 1e-3;

// =========================================================================
// == Bodies ==
// =========================================================================

#[derive(Debug, Clone)]
pub struct RobotBody {
    pub name: String,
    pub pose: Isometry3<f64>,
    /// World frame.
    pub linear_velocity: Vector3<f64>,
    /// Body frame.
    pub angular_velocity: Vector3<f64>,
    /// World frame, from the last tick.
    pub linear_acceleration: Vector3<f64>,
    pub mass: f64,
    pub radius: f64,
    pub linear_drag: f64,
    pub angular_drag: f64,
    /// Body-frame force applied by the thrusters during the last tick.
    pub net_force: Vector3<f64>,
    pub net_torque: Vector3<f64>,
}

impl RobotBody {
    fn from_config(config: &RobotConfig) -> Self {
        Self {
            name: config.name.clone(),
            pose: config.pose.to_isometry(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            linear_acceleration: Vector3::zeros(),
            mass: config.mass.max(MIN_MASS),
            radius: config.radius.max(0.0),
            linear_drag: config.linear_drag,
            angular_drag: config.angular_drag,
            net_force: Vector3::zeros(),
            net_torque: Vector3::zeros(),
        }
    }

    /// Solid-sphere moment of inertia.
    fn inertia(&self) -> f64 {
        (0.4 * self.mass * self.radius * self.radius).max(MIN_MASS)
    }

    fn integrate(&mut self, dt: f64) {
        let world_force = self.pose.rotation * self.net_force;
        let acceleration = world_force / self.mass - self.linear_velocity * self.linear_drag;
        let previous = self.linear_velocity;
        self.linear_velocity += acceleration * dt;
        self.pose.translation.vector += self.linear_velocity * dt;
        self.linear_acceleration = (self.linear_velocity - previous) / dt;

        let angular_acceleration =
            self.net_torque / self.inertia() - self.angular_velocity * self.angular_drag;
        self.angular_velocity += angular_acceleration * dt;
        self.pose.rotation *= UnitQuaternion::from_scaled_axis(self.angular_velocity * dt);
    }

    fn respawn(&mut self, pose: Isometry3<f64>) {
        self.pose = pose;
        self.linear_velocity = Vector3::zeros();
        self.angular_velocity = Vector3::zeros();
        self.linear_acceleration = Vector3::zeros();
        self.net_force = Vector3::zeros();
        self.net_torque = Vector3::zeros();
    }
}

#[derive(Debug, Clone)]
pub struct StaticBody {
    pub name: String,
    pub position: Vector3<f64>,
    pub radius: f64,
}

// =========================================================================
// == Actuators ==
// =========================================================================

#[derive(Debug, Clone)]
pub struct ThrusterUnit {
    /// Index of the robot this thruster pushes, if it was found.
    pub robot: Option<usize>,
    /// Unit thrust axis, body frame.
    pub direction: Vector3<f64>,
    pub lever_arm: Vector3<f64>,
    pub max_thrust: f64,
    pub time_constant: f64,
    pub torque_coefficient: f64,
    pub state: ThrusterState,
}

impl ThrusterUnit {
    fn update(&mut self, dt: f64) {
        let target = self.state.setpoint.clamp(-1.0, 1.0);
        let alpha = if self.time_constant > 0.0 {
            (dt / self.time_constant).min(1.0)
        } else {
            1.0
        };
        self.state.omega += (target - self.state.omega) * alpha;
        self.state.thrust = self.max_thrust * self.state.omega;
        self.state.torque = self.torque_coefficient * self.state.thrust;
    }
}

impl ThrusterControl for ThrusterUnit {
    fn set_setpoint(&mut self, setpoint: f64) {
        self.state.setpoint = setpoint;
    }
}

#[derive(Debug, Clone)]
pub struct ServoJoint {
    pub gain: f64,
    pub max_velocity: f64,
    pub limits: Option<(f64, f64)>,
    pub state: ServoState,
}

impl ServoJoint {
    fn from_config(config: &ServoConfig) -> Self {
        Self {
            gain: config.gain,
            max_velocity: config.max_velocity.abs(),
            limits: config.limits.map(|[a, b]| (a.min(b), a.max(b))),
            state: ServoState::default(),
        }
    }

    fn update(&mut self, dt: f64) {
        let commanded = match self.state.mode {
            ServoControlMode::Position => self.gain * (self.state.desired_position - self.state.position),
            ServoControlMode::Velocity => self.state.desired_velocity,
        };
        let velocity = commanded.clamp(-self.max_velocity, self.max_velocity);

        let mut position = self.state.position + velocity * dt;
        if let Some((lo, hi)) = self.limits {
            position = position.clamp(lo, hi);
        }
        self.state.velocity = (position - self.state.position) / dt;
        self.state.position = position;
    }
}

impl ServoControl for ServoJoint {
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

#[derive(Debug, Clone)]
pub enum SimActuatorKind {
    Thruster(ThrusterUnit),
    Servo(ServoJoint),
    /// Lights and anything else the bridge cannot command.
    Light,
}

#[derive(Debug, Clone)]
pub struct SimActuator {
    pub name: String,
    pub kind: SimActuatorKind,
}

impl SimActuator {
    fn type_name(&self) -> &'static str {
        match self.kind {
            SimActuatorKind::Thruster(_) => "Thruster",
            SimActuatorKind::Servo(_) => "Servo",
            SimActuatorKind::Light => "Light",
        }
    }

    fn state(&self) -> ActuatorState {
        match &self.kind {
            SimActuatorKind::Thruster(t) => ActuatorState::Thruster(t.state),
            SimActuatorKind::Servo(s) => ActuatorState::Servo(s.state),
            SimActuatorKind::Light => ActuatorState::Unsupported,
        }
    }
}

// =========================================================================
// == Sensors ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorParent {
    Robot(usize),
    Actuator(usize),
    Detached,
}

#[derive(Debug, Clone)]
pub struct SimSensor {
    pub name: String,
    pub kind: SensorKind,
    pub parent: SensorParent,
    pub noise: Option<Normal<f64>>,
    pub max_range: f64,
    pub sample: Vec<f64>,
}

/// Number of channels a sensor kind reports.
pub fn channel_count(kind: SensorKind) -> usize {
    match kind {
        SensorKind::Imu => 9,
        SensorKind::Odometry => 13,
        SensorKind::Gps => 4,
        SensorKind::Pressure => 1,
        SensorKind::ForceTorque => 6,
        SensorKind::Dvl => 4,
        SensorKind::Encoder => 2,
        SensorKind::Profiler | SensorKind::Multibeam => 1,
        SensorKind::Camera => 0,
    }
}

/// Read-only view of the scene used to compute noiseless sensor readings.
struct Measurement<'a> {
    robots: &'a [RobotBody],
    actuators: &'a [SimActuator],
    statics: &'a [StaticBody],
    gravity: Vector3<f64>,
    seafloor_z: f64,
    gps_origin: [f64; 2],
}

impl Measurement<'_> {
    fn measure(&self, sensor: &SimSensor) -> Vec<f64> {
        let kind = sensor.kind;
        match sensor.parent {
            _ if kind == SensorKind::Camera => Vec::new(),
            SensorParent::Robot(index) => match self.robots.get(index) {
                Some(robot) => self.measure_robot(kind, robot, sensor.max_range),
                None => vec![0.0; channel_count(kind)],
            },
            SensorParent::Actuator(index) => match self.actuators.get(index).map(|a| &a.kind) {
                Some(SimActuatorKind::Servo(servo)) if kind == SensorKind::Encoder => {
                    vec![servo.state.position, servo.state.velocity]
                }
                _ => vec![0.0; channel_count(kind)],
            },
            SensorParent::Detached => vec![0.0; channel_count(kind)],
        }
    }

    fn measure_robot(&self, kind: SensorKind, robot: &RobotBody, max_range: f64) -> Vec<f64> {
        let position = robot.pose.translation.vector;
        let rotation = robot.pose.rotation;
        match kind {
            SensorKind::Imu => {
                let (roll, pitch, yaw) = rotation.euler_angles();
                let w = robot.angular_velocity;
                // Specific force: what an accelerometer at rest reads is -gravity.
                let a = rotation.inverse() * (robot.linear_acceleration - self.gravity);
                vec![roll, pitch, yaw, w.x, w.y, w.z, a.x, a.y, a.z]
            }
            SensorKind::Odometry => {
                let v = robot.linear_velocity;
                let w = robot.angular_velocity;
                vec![
                    position.x, position.y, position.z, v.x, v.y, v.z, rotation.i, rotation.j,
                    rotation.k, rotation.w, w.x, w.y, w.z,
                ]
            }
            SensorKind::Gps => {
                let [lat0, lon0] = self.gps_origin;
                let north = position.y;
                let east = position.x;
                let lat = lat0 + (north / EARTH_RADIUS).to_degrees();
                let lon = lon0 + (east / (EARTH_RADIUS * lat0.to_radians().cos())).to_degrees();
                vec![lat, lon, north, east]
            }
            SensorKind::Pressure => vec![(-position.z).max(0.0)],
            SensorKind::ForceTorque => {
                let f = robot.net_force;
                let t = robot.net_torque;
                vec![f.x, f.y, f.z, t.x, t.y, t.z]
            }
            SensorKind::Dvl => {
                let v = rotation.inverse() * robot.linear_velocity;
                vec![v.x, v.y, v.z, position.z - self.seafloor_z]
            }
            SensorKind::Profiler | SensorKind::Multibeam => {
                let range = self
                    .statics
                    .iter()
                    .map(|body| (body.position - position).norm() - body.radius - robot.radius)
                    .fold(max_range, f64::min);
                vec![range.clamp(0.0, max_range)]
            }
            SensorKind::Encoder | SensorKind::Camera => vec![0.0; channel_count(kind)],
        }
    }
}

// =========================================================================
// == Scene ==
// =========================================================================

/// The whole simulated scene. Implements the bridge's engine contract.
#[derive(Resource)]
pub struct SceneWorld {
    robots: Vec<RobotBody>,
    actuators: Vec<SimActuator>,
    sensors: Vec<SimSensor>,
    statics: Vec<StaticBody>,
    contacts: Vec<Contact>,
    time: f64,
    dt: f64,
    gravity: Vector3<f64>,
    seafloor_z: f64,
    gps_origin: [f64; 2],
    rng: ChaCha8Rng,
}

impl SceneWorld {
    pub fn from_scenario(scenario: &ScenarioConfig, dt: f64) -> Self {
        let robots: Vec<RobotBody> = scenario.robots.iter().map(RobotBody::from_config).collect();
        let robot_index = |name: &str| robots.iter().position(|r| r.name == name);

        let mut actuators = Vec::new();
        for config in &scenario.thrusters {
            actuators.push(SimActuator {
                name: config.name.clone(),
                kind: SimActuatorKind::Thruster(build_thruster(config, robot_index(&config.robot))),
            });
        }
        for config in &scenario.servos {
            actuators.push(SimActuator {
                name: config.name.clone(),
                kind: SimActuatorKind::Servo(ServoJoint::from_config(config)),
            });
        }
        for config in &scenario.lights {
            actuators.push(SimActuator {
                name: config.name.clone(),
                kind: SimActuatorKind::Light,
            });
        }

        let sensors = scenario
            .sensors
            .iter()
            .map(|config| build_sensor(config, &robots, &actuators))
            .collect();

        let statics = scenario
            .statics
            .iter()
            .map(|s| StaticBody {
                name: s.name.clone(),
                position: s.position,
                radius: s.radius.max(0.0),
            })
            .collect();

        let [gx, gy, gz] = scenario.simulation.gravity;
        let mut world = Self {
            robots,
            actuators,
            sensors,
            statics,
            contacts: Vec::new(),
            time: 0.0,
            dt: if dt > 0.0 { dt } else { 0.01 },
            gravity: Vector3::new(gx, gy, gz),
            seafloor_z: scenario.simulation.seafloor_z,
            gps_origin: scenario.simulation.gps_origin,
            rng: simulation_rng(scenario.simulation.seed),
        };
        world.refresh_sensors();
        world.detect_contacts();

        info!(
            "Scene built: {} robots, {} actuators, {} sensors, {} static bodies",
            world.robots.len(),
            world.actuators.len(),
            world.sensors.len(),
            world.statics.len()
        );
        world
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn robots(&self) -> &[RobotBody] {
        &self.robots
    }

    pub fn robot_by_name(&self, name: &str) -> Option<&RobotBody> {
        self.robots.iter().find(|r| r.name == name)
    }

    pub fn actuators(&self) -> &[SimActuator] {
        &self.actuators
    }

    pub fn sensors(&self) -> &[SimSensor] {
        &self.sensors
    }

    /// Advances actuators and robots by one tick and advances the clock.
    pub fn integrate(&mut self) {
        let dt = self.dt;
        for robot in &mut self.robots {
            robot.net_force = Vector3::zeros();
            robot.net_torque = Vector3::zeros();
        }

        for actuator in &mut self.actuators {
            match &mut actuator.kind {
                SimActuatorKind::Thruster(thruster) => {
                    thruster.update(dt);
                    if let Some(robot) = thruster.robot.and_then(|i| self.robots.get_mut(i)) {
                        let force = thruster.direction * thruster.state.thrust;
                        robot.net_force += force;
                        robot.net_torque += thruster.lever_arm.cross(&force)
                            + thruster.direction * thruster.state.torque;
                    }
                }
                SimActuatorKind::Servo(servo) => servo.update(dt),
                SimActuatorKind::Light => {}
            }
        }

        for robot in &mut self.robots {
            robot.integrate(dt);
        }
        self.time += dt;
    }

    /// Resamples every sensor from the current state.
    pub fn refresh_sensors(&mut self) {
        let measurement = Measurement {
            robots: &self.robots,
            actuators: &self.actuators,
            statics: &self.statics,
            gravity: self.gravity,
            seafloor_z: self.seafloor_z,
            gps_origin: self.gps_origin,
        };
        for sensor in &mut self.sensors {
            let mut sample = measurement.measure(sensor);
            if let Some(noise) = &sensor.noise {
                for value in &mut sample {
                    *value += noise.sample(&mut self.rng);
                }
            }
            sensor.sample = sample;
        }
    }

    /// Rebuilds the contact list from sphere overlaps.
    pub fn detect_contacts(&mut self) {
        self.contacts.clear();
        for (i, robot) in self.robots.iter().enumerate() {
            let position = robot.pose.translation.vector;
            for body in &self.statics {
                if (body.position - position).norm() <= body.radius + robot.radius {
                    self.contacts.push(Contact {
                        body_a: robot.name.clone(),
                        body_b: body.name.clone(),
                    });
                }
            }
            for other in &self.robots[i + 1..] {
                if (other.pose.translation.vector - position).norm() <= other.radius + robot.radius {
                    self.contacts.push(Contact {
                        body_a: robot.name.clone(),
                        body_b: other.name.clone(),
                    });
                }
            }
        }
    }
}

fn build_thruster(config: &ThrusterConfig, robot: Option<usize>) -> ThrusterUnit {
    if robot.is_none() {
        warn!(
            "Thruster '{}' references unknown robot '{}'; it will push nothing",
            config.name, config.robot
        );
    }
    let direction = config
        .direction
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::x);
    ThrusterUnit {
        robot,
        direction,
        lever_arm: config.lever_arm,
        max_thrust: config.max_thrust,
        time_constant: config.time_constant,
        torque_coefficient: config.torque_coefficient,
        state: ThrusterState::default(),
    }
}

fn build_sensor(config: &SensorConfig, robots: &[RobotBody], actuators: &[SimActuator]) -> SimSensor {
    let kind = SensorKind::from(config.kind);
    let parent = if let Some(i) = robots.iter().position(|r| r.name == config.parent) {
        SensorParent::Robot(i)
    } else if let Some(i) = actuators.iter().position(|a| a.name == config.parent) {
        SensorParent::Actuator(i)
    } else {
        warn!(
            "Sensor '{}' references unknown parent '{}'; it will read zeros",
            config.name, config.parent
        );
        SensorParent::Detached
    };

    let noise = if config.noise_stddev > 0.0 {
        match Normal::new(0.0, config.noise_stddev) {
            Ok(normal) => Some(normal),
            Err(e) => {
                warn!("Sensor '{}' has invalid noise: {}", config.name, e);
                None
            }
        }
    } else {
        None
    };

    SimSensor {
        name: config.name.clone(),
        kind,
        parent,
        noise,
        max_range: config.max_range,
        sample: vec![0.0; channel_count(kind)],
    }
}

// =========================================================================
// == Engine Contract ==
// =========================================================================

impl SimulationEngine for SceneWorld {
    fn robot(&self, id: RobotId) -> Option<RobotView<'_>> {
        self.robots.get(id.0).map(|robot| RobotView {
            name: &robot.name,
            pose: robot.pose,
        })
    }

    fn sensor(&self, id: SensorId) -> Option<SensorView<'_>> {
        self.sensors.get(id.0).map(|sensor| SensorView {
            name: &sensor.name,
            kind: sensor.kind,
            last_sample: &sensor.sample,
        })
    }

    fn actuator(&self, id: ActuatorId) -> Option<ActuatorView<'_>> {
        self.actuators.get(id.0).map(|actuator| ActuatorView {
            name: &actuator.name,
            type_name: actuator.type_name(),
            state: actuator.state(),
        })
    }

    fn actuator_control(&mut self, id: ActuatorId) -> Option<ActuatorControl<'_>> {
        self.actuators.get_mut(id.0).map(|actuator| match &mut actuator.kind {
            SimActuatorKind::Thruster(thruster) => ActuatorControl::Thruster(thruster),
            SimActuatorKind::Servo(servo) => ActuatorControl::Servo(servo),
            SimActuatorKind::Light => ActuatorControl::Unsupported,
        })
    }

    fn respawn_robot(&mut self, id: RobotId, pose: Isometry3<f64>) -> bool {
        let Some(robot) = self.robots.get_mut(id.0) else {
            return false;
        };
        robot.respawn(pose);
        // The reply to a reset is observed before the next tick.
        self.refresh_sensors();
        self.detect_contacts();
        true
    }

    fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn simulation_time(&self) -> f64 {
        self.time
    }

    fn step(&mut self) {
        self.integrate();
        self.refresh_sensors();
        self.detect_contacts();
    }
}
