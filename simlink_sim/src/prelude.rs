// simlink_sim/src/prelude.rs

// Re-export the entire Bevy prelude for convenience.
pub use bevy::prelude::*;

// Re-export the entire simlink_core prelude so plugins can reach the engine
// contract, the pipeline, and the transports directly.
pub use simlink_core::prelude::*;

// Re-export common host-specific types for easy access in other plugins.
pub use crate::simulation::config::structs::*;
pub use crate::simulation::core::app_state::{PendingReply, SimulationSet, StepGate};
pub use crate::simulation::core::world::SceneWorld;
pub use crate::simulation::plugins::bridge::{BridgeAddress, BridgePlugin, Coordinator, ObservationSchema};
pub use crate::simulation::plugins::telemetry::TelemetryPlugin;
