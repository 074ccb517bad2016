// simlink_sim/src/simulation/core/simulation_setup.rs

use crate::prelude::*;
use crate::simulation::core::app_state::{step_granted, SimulationSet, StepGate};
use crate::simulation::core::world::SceneWorld;

pub struct SimulationSetupPlugin;

impl Plugin for SimulationSetupPlugin {
    fn build(&self, app: &mut App) {
        // This plugin's job is to read the config and build the scene resource.
        let dt = app
            .world()
            .get_resource::<HostSettings>()
            .map(HostSettings::step_dt)
            .unwrap_or_else(|| HostSettings::default().step_dt());

        let world = match app.world().get_resource::<ScenarioConfig>() {
            Some(scenario) => SceneWorld::from_scenario(scenario, dt),
            None => {
                warn!("No ScenarioConfig resource; using the built-in scene");
                SceneWorld::from_scenario(&ScenarioConfig::fallback(), dt)
            }
        };

        app.insert_resource(world).init_resource::<StepGate>();

        // --- CONFIGURE THE LOCKSTEP CYCLE ---
        // Intake decides whether this update ticks; the tick sets are gated on it.
        app.configure_sets(
            Update,
            (
                SimulationSet::Intake,
                SimulationSet::Dynamics.run_if(step_granted),
                SimulationSet::Sensors.run_if(step_granted),
                SimulationSet::Contacts.run_if(step_granted),
                SimulationSet::Reply,
                SimulationSet::Telemetry,
            )
                .chain(), // .chain() enforces the order of the tuples/sets
        );

        app.add_systems(
            Update,
            (
                advance_dynamics.in_set(SimulationSet::Dynamics),
                sample_sensors.in_set(SimulationSet::Sensors),
                detect_contacts.in_set(SimulationSet::Contacts),
            ),
        );
    }
}

fn advance_dynamics(mut world: ResMut<SceneWorld>) {
    world.integrate();
}

fn sample_sensors(mut world: ResMut<SceneWorld>) {
    world.refresh_sensors();
}

fn detect_contacts(mut world: ResMut<SceneWorld>) {
    world.detect_contacts();
}
