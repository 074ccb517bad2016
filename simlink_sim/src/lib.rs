// simlink_sim/src/lib.rs

use bevy::prelude::*;

// Import the plugins defined within the simulation crate.
use crate::simulation::core::simulation_setup::SimulationSetupPlugin;
use crate::simulation::plugins::bridge::BridgePlugin;
use crate::simulation::plugins::telemetry::TelemetryPlugin;

// This prelude is for convenience for other files WITHIN the simlink_sim crate.
pub mod prelude;

// This module contains all the simulation-specific logic.
pub mod cli;
pub mod simulation;

/// The main plugin that brings together all the host parts.
///
/// Insert `HostSettings` and `ScenarioConfig` (and optionally an
/// `ObservationSchema`) before adding it; the plugins read them at build time.
pub struct SimlinkSimulationPlugin;

impl Plugin for SimlinkSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            // Builds the scene and the lockstep schedule.
            SimulationSetupPlugin,
            // Accepts the controller and serves RESET/CMD/EXIT.
            BridgePlugin,
            // Publishes robot poses after each tick, if configured.
            TelemetryPlugin,
        ));
    }
}
