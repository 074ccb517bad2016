// simlink_sim/src/simulation/plugins/mod.rs

pub mod bridge;
pub mod telemetry;
