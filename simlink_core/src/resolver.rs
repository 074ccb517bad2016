// simlink_core/src/resolver.rs

//! Name → handle resolution by sequential scan.
//!
//! Nothing is cached: the engine may rebuild its scene between resets, and a
//! stale index would silently serve a removed entity. Entity counts are in
//! the tens, so an O(n) scan per lookup is cheap.

use crate::engine::{ActuatorId, EntityRef, RobotId, SensorId, SimulationEngine};

pub fn find_robot(engine: &dyn SimulationEngine, name: &str) -> Option<RobotId> {
    let mut index = 0;
    while let Some(robot) = engine.robot(RobotId(index)) {
        if robot.name == name {
            return Some(RobotId(index));
        }
        index += 1;
    }
    None
}

pub fn find_sensor(engine: &dyn SimulationEngine, name: &str) -> Option<SensorId> {
    let mut index = 0;
    while let Some(sensor) = engine.sensor(SensorId(index)) {
        if sensor.name == name {
            return Some(SensorId(index));
        }
        index += 1;
    }
    None
}

pub fn find_actuator(engine: &dyn SimulationEngine, name: &str) -> Option<ActuatorId> {
    let mut index = 0;
    while let Some(actuator) = engine.actuator(ActuatorId(index)) {
        if actuator.name == name {
            return Some(ActuatorId(index));
        }
        index += 1;
    }
    None
}

/// Resolves `name` trying robots, then sensors, then actuators.
/// If several kinds share a name, the first in that order wins.
pub fn resolve(engine: &dyn SimulationEngine, name: &str) -> Option<EntityRef> {
    find_robot(engine, name)
        .map(EntityRef::Robot)
        .or_else(|| find_sensor(engine, name).map(EntityRef::Sensor))
        .or_else(|| find_actuator(engine, name).map(EntityRef::Actuator))
}

/// Names of every entity the engine currently exposes, per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityInventory {
    pub robots: Vec<String>,
    pub sensors: Vec<String>,
    pub actuators: Vec<String>,
}

impl EntityInventory {
    pub fn collect(engine: &dyn SimulationEngine) -> Self {
        let mut inventory = Self::default();

        let mut index = 0;
        while let Some(robot) = engine.robot(RobotId(index)) {
            inventory.robots.push(robot.name.to_string());
            index += 1;
        }

        index = 0;
        while let Some(sensor) = engine.sensor(SensorId(index)) {
            inventory.sensors.push(sensor.name.to_string());
            index += 1;
        }

        index = 0;
        while let Some(actuator) = engine.actuator(ActuatorId(index)) {
            inventory.actuators.push(actuator.name.to_string());
            index += 1;
        }

        inventory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;

    #[test]
    fn test_find_returns_first_match_by_index() {
        let engine = MockEngine::new()
            .with_robot("girona", [0.0, 0.0, 0.0])
            .with_robot("bluerov", [1.0, 0.0, 0.0])
            .with_thruster("thr1");

        assert_eq!(find_robot(&engine, "bluerov"), Some(RobotId(1)));
        assert_eq!(find_robot(&engine, "thr1"), None);
        assert_eq!(find_actuator(&engine, "thr1"), Some(ActuatorId(0)));
        assert_eq!(find_sensor(&engine, "girona"), None);
    }

    #[test]
    fn test_resolve_prefers_robot_then_sensor_then_actuator() {
        let engine = MockEngine::new()
            .with_imu("shared", [0.0; 9])
            .with_thruster("shared")
            .with_robot("shared", [0.0, 0.0, 0.0])
            .with_thruster("only_actuator");

        assert_eq!(resolve(&engine, "shared"), Some(EntityRef::Robot(RobotId(0))));
        assert_eq!(
            resolve(&engine, "only_actuator"),
            Some(EntityRef::Actuator(ActuatorId(1)))
        );
        assert_eq!(resolve(&engine, "missing"), None);
    }

    #[test]
    fn test_resolution_sees_rebuilt_scene() {
        let mut engine = MockEngine::new().with_robot("girona", [0.0, 0.0, 0.0]);
        assert!(find_robot(&engine, "girona").is_some());

        engine.robots.clear();
        assert!(find_robot(&engine, "girona").is_none());
    }

    #[test]
    fn test_inventory_lists_all_kinds() {
        let engine = MockEngine::new()
            .with_robot("girona", [0.0, 0.0, 0.0])
            .with_imu("imu", [0.0; 9])
            .with_servo("joint")
            .with_thruster("thr1");

        let inventory = EntityInventory::collect(&engine);
        assert_eq!(inventory.robots, vec!["girona"]);
        assert_eq!(inventory.sensors, vec!["imu"]);
        assert_eq!(inventory.actuators, vec!["joint", "thr1"]);
    }
}
