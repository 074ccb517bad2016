// simlink_sim/src/simulation/plugins/telemetry.rs

//! Optional per-tick telemetry fan-out.
//!
//! After every tick each robot the controller asked about (or every robot,
//! if it asked about none) is published as
//! `[x, y, z, roll, pitch, yaw]` doubles under its own name, followed by
//! the simulation time under `sim_time`.

use crate::prelude::*;
use crate::simulation::core::app_state::{SimulationSet, StepGate};
use crate::simulation::core::world::SceneWorld;
use crate::simulation::plugins::bridge::Coordinator;

pub const SIM_TIME_TITLE: &str = "sim_time";

#[derive(Resource)]
pub struct TelemetryLink {
    publisher: TelemetryPublisher,
    next_id: i32,
}

impl TelemetryLink {
    pub fn new(publisher: TelemetryPublisher) -> Self {
        Self {
            publisher,
            next_id: 0,
        }
    }

    pub fn publisher(&self) -> &TelemetryPublisher {
        &self.publisher
    }

    fn publish(&mut self, title: &str, value: TelemetryValue) {
        self.publisher.publish(self.next_id, title, &value);
        self.next_id = self.next_id.wrapping_add(1);
    }
}

pub struct TelemetryPlugin;

impl Plugin for TelemetryPlugin {
    fn build(&self, app: &mut App) {
        let address = app
            .world()
            .get_resource::<HostSettings>()
            .and_then(|settings| settings.telemetry_address.clone());
        let Some(address) = address else {
            return;
        };

        match TelemetryPublisher::bind(address.as_str()) {
            Ok(publisher) => {
                app.insert_resource(TelemetryLink::new(publisher)).add_systems(
                    Update,
                    publish_telemetry.in_set(SimulationSet::Telemetry),
                );
            }
            Err(e) => error!("[Telemetry] Failed to bind {}: {}. Telemetry disabled.", address, e),
        }
    }
}

fn publish_telemetry(
    mut link: ResMut<TelemetryLink>,
    gate: Res<StepGate>,
    world: Res<SceneWorld>,
    coordinator: Option<Res<Coordinator>>,
) {
    link.publisher.accept_pending();
    if !gate.stepped() || link.publisher.subscriber_count() == 0 {
        return;
    }

    for robot in world.robots() {
        let relevant = coordinator
            .as_ref()
            .map_or(true, |c| c.0.filter().is_relevant(&robot.name));
        if !relevant {
            continue;
        }
        let p = robot.pose.translation.vector;
        let (roll, pitch, yaw) = robot.pose.rotation.euler_angles();
        link.publish(
            &robot.name,
            TelemetryValue::Doubles(vec![p.x, p.y, p.z, roll, pitch, yaw]),
        );
    }
    link.publish(SIM_TIME_TITLE, TelemetryValue::Double(world.simulation_time()));
}
