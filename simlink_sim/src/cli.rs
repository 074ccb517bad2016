// simlink_sim/src/cli.rs

use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

use crate::simulation::config::HostSettings;

/// simlink: steps a simulated scene in lockstep with an external controller.
///
/// Flags given here override the settings file and the environment.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the host settings TOML file.
    #[arg(short, long, default_value = "assets/simlink.toml")]
    pub settings: PathBuf,

    /// The scenario TOML file to simulate.
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// The observation schema JSON file.
    #[arg(short, long)]
    pub observations: Option<PathBuf>,

    /// Address to accept the controller on, e.g. `127.0.0.1:5555`.
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Simulation ticks per second.
    #[arg(short, long)]
    pub frequency: Option<f64>,

    /// Publish per-step telemetry on this address.
    #[arg(long)]
    pub telemetry: Option<String>,

    /// Give up waiting on a request after this many milliseconds, then wait again.
    #[arg(long)]
    pub recv_timeout_ms: Option<u64>,
}

impl Cli {
    pub fn apply_overrides(&self, settings: &mut HostSettings) {
        if let Some(scenario) = &self.scenario {
            settings.scenario = scenario.clone();
        }
        if let Some(observations) = &self.observations {
            settings.observation_config = observations.clone();
        }
        if let Some(bind) = &self.bind {
            settings.bind_address = bind.clone();
        }
        if let Some(frequency) = self.frequency {
            settings.step_frequency = frequency;
        }
        if let Some(telemetry) = &self.telemetry {
            settings.telemetry_address = Some(telemetry.clone());
        }
        if let Some(timeout) = self.recv_timeout_ms {
            settings.recv_timeout_ms = Some(timeout);
        }
    }
}
