// simlink_sim/tests/shipped_assets.rs

use std::path::PathBuf;

use simlink_core::config::{parse_action_config, try_load_observation_config};
use simlink_core::protocol::StepCoordinator;
use simlink_sim::prelude::*;
use simlink_sim::simulation::config::{settings_figment, try_load_scenario};

fn asset(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("assets").join(path)
}

#[test]
fn test_default_assets_load_and_observe_cleanly() {
    let settings: HostSettings = settings_figment(asset("simlink.toml")).extract().unwrap();
    assert_eq!(settings.collision_targets, vec!["Tank".to_string()]);

    let scenario = try_load_scenario(asset("scenarios/girona_tank.toml")).unwrap();
    let observations = try_load_observation_config(asset("observation_config.json")).unwrap();
    let actions =
        parse_action_config(&std::fs::read_to_string(asset("action_config.json")).unwrap()).unwrap();

    let mut world = SceneWorld::from_scenario(&scenario, settings.step_dt());
    let assembler = ObservationAssembler::new(
        observations,
        FieldRegistry::with_defaults(),
        CollisionRule::new(settings.collision_targets.iter().cloned()),
    );

    // Every shipped observation and action names something in the shipped scene.
    for spec in &assembler.config().specs {
        assert!(
            assembler.extract(&world, spec).is_ok(),
            "'{}' does not resolve",
            spec.output_name
        );
    }
    let mut coordinator = StepCoordinator::new(assembler);
    let command = simlink_core::client::encode_command(&actions, &[1.0, 1.0, 0.0, 0.5], &[]).unwrap();
    let request = CommandProcessor::new().classify(&command);
    let reply = coordinator.execute(&request, &mut world);

    assert!(coordinator.last_dispatch().is_clean());
    assert!(matches!(reply, Reply::Observation(ref v) if v.len() == 11));
}
