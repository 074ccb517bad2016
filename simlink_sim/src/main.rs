// simlink_sim/src/main.rs

//! The `simlink` host: a headless scene stepped in lockstep with an
//! external controller.
//!
//! To run it:
//! `cargo run --bin simlink -- --settings assets/simlink.toml`

use std::time::Duration;

// --- Bevy Imports ---
use bevy::{app::ScheduleRunnerPlugin, log::LogPlugin, prelude::*};
use clap::Parser;

// --- Project-Specific Imports ---
use simlink_sim::cli::Cli;
use simlink_sim::simulation::config::{load_scenario, load_settings, HostSettings};
use simlink_sim::SimlinkSimulationPlugin;

fn main() -> AppExit {
    let cli = Cli::parse();
    let mut app = App::new();

    // --- 1. Logging first, so configuration problems are visible ---
    app.add_plugins(LogPlugin {
        level: bevy::log::Level::INFO,
        filter: "info,simlink_sim=debug,simlink_core=debug".to_string(),
        ..default()
    });

    // --- 2. Load Host Settings and Scenario ---
    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid host settings: {}. Using defaults.", e);
            let mut settings = HostSettings::default();
            cli.apply_overrides(&mut settings);
            settings
        }
    };
    let scenario = load_scenario(&settings.scenario);
    let idle = Duration::from_millis(settings.idle_poll_ms);

    // --- 3. Headless core plugins, then our resources and plugin ---
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(idle)))
        .insert_resource(cli)
        .insert_resource(settings)
        .insert_resource(scenario)
        .add_plugins(SimlinkSimulationPlugin);

    // --- 4. Run the App ---
    info!("Starting simlink host...");
    app.run()
}
