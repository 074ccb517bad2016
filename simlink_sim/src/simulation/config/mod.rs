// simlink_sim/src/simulation/config/mod.rs

//! Loads host settings and scenarios from disk.
//!
//! Settings layer in order: built-in defaults, `simlink.toml`, `SIMLINK_*`
//! environment variables, CLI flags. A scenario that cannot be read is
//! replaced by [`ScenarioConfig::fallback`].

pub mod structs;

use bevy::prelude::*;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use crate::cli::Cli;
pub use structs::{HostSettings, ScenarioConfig};

/// Builds the settings figment without CLI overrides.
pub fn settings_figment(path: impl AsRef<Path>) -> Figment {
    Figment::from(Serialized::defaults(HostSettings::default()))
        .merge(Toml::file(path.as_ref()))
        .merge(Env::prefixed("SIMLINK_"))
}

pub fn load_settings(cli: &Cli) -> Result<HostSettings, figment::Error> {
    if !cli.settings.exists() {
        warn!(
            "Settings file '{}' not found, using defaults",
            cli.settings.display()
        );
    }
    let mut settings: HostSettings = settings_figment(&cli.settings).extract()?;
    cli.apply_overrides(&mut settings);
    Ok(settings)
}

pub fn try_load_scenario(path: impl AsRef<Path>) -> Result<ScenarioConfig, figment::Error> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(figment::Error::from(format!(
            "scenario file '{}' not found",
            path.display()
        )));
    }
    Figment::new().merge(Toml::file(path)).extract()
}

/// Loads the scenario, falling back to the built-in scene on any error.
pub fn load_scenario(path: impl AsRef<Path>) -> ScenarioConfig {
    let path = path.as_ref();
    info!("Loading scenario from: {}", path.display());
    match try_load_scenario(path) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!("Failed to load scenario: {}. Using the built-in scene.", e);
            ScenarioConfig::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use structs::SensorKindConfig;

    const SCENARIO: &str = r#"
        [simulation]
        seed = 7

        [[robots]]
        name = "girona"
        pose = { translation = [1.0, 2.0, -3.0], rotation = [0.0, 0.0, 90.0] }

        [[thrusters]]
        name = "thr1"
        robot = "girona"
        direction = [1.0, 0.0, 0.0]

        [[sensors]]
        name = "depth"
        kind = "Pressure"
        parent = "girona"
        noise_stddev = 0.01

        [[statics]]
        name = "Tank"
        position = [5.0, 0.0, 0.0]
        radius = 2.0
    "#;

    fn write_temp(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", text).unwrap();
        file
    }

    #[test]
    fn test_scenario_parses() {
        let file = write_temp(SCENARIO);
        let scenario = try_load_scenario(file.path()).unwrap();

        assert_eq!(scenario.simulation.seed, Some(7));
        assert_eq!(scenario.robots.len(), 1);
        let pose = scenario.robots[0].pose;
        assert_relative_eq!(pose.translation.z, -3.0);
        assert_relative_eq!(pose.rotation.euler_angles().2, 90f64.to_radians(), epsilon = 1e-9);
        assert_relative_eq!(scenario.robots[0].mass, 100.0);
        assert_relative_eq!(scenario.thrusters[0].max_thrust, 100.0);
        assert_eq!(scenario.sensors[0].kind, SensorKindConfig::Pressure);
        assert_eq!(scenario.statics[0].name, "Tank");
    }

    #[test]
    fn test_unknown_field_rejected_and_fallback_used() {
        let file = write_temp("[[robots]]\nname = \"r\"\nwheels = 4\n");
        assert!(try_load_scenario(file.path()).is_err());

        let scenario = load_scenario(file.path());
        assert_eq!(scenario.robots[0].name, "girona");
        assert!(try_load_scenario("/no/such/scenario.toml").is_err());
    }

    #[test]
    fn test_settings_file_layers_over_defaults() {
        let file = write_temp("bind_address = \"0.0.0.0:6000\"\nstep_frequency = 50.0\n");
        let settings: HostSettings = settings_figment(file.path()).extract().unwrap();

        assert_eq!(settings.bind_address, "0.0.0.0:6000");
        assert_relative_eq!(settings.step_dt(), 0.02);
        assert_eq!(settings.collision_targets, vec!["Tank".to_string()]);
        assert_eq!(settings.recv_timeout_ms, None);
    }
}
