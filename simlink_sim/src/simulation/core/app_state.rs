// simlink_sim/src/simulation/core/app_state.rs

use bevy::{ecs::schedule::SystemSet, prelude::*};

// =========================================================================
// == Main Simulation Sets (The "Lockstep Cycle") ==
// =========================================================================

/// One app update either idles or serves exactly one request. The sets run
/// in this order every update; the tick sets only run when a step is granted.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    // --- Phase 1: Request intake ---
    /// Takes at most one request from the bridge thread and applies it to
    /// the scene. Decides whether this update steps.
    Intake,

    // --- Phase 2: One simulation tick ---
    /// Actuator response and rigid-body integration.
    Dynamics,
    /// Resample every sensor from the new state.
    Sensors,
    /// Rebuild the contact list.
    Contacts,

    // --- Phase 3: Reply ---
    /// Answers the request that asked for a post-tick observation.
    Reply,

    // --- Phase 4: Side channels ---
    Telemetry,
}

/// What the current update still owes the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingReply {
    #[default]
    None,
    /// Observe the scene after the tick and reply with it.
    ObservationAfterStep,
}

/// Per-update handshake between intake and the tick systems.
#[derive(Resource, Debug, Default)]
pub struct StepGate {
    granted: bool,
    pending: PendingReply,
    stepped: bool,
    /// Ticks taken since startup.
    pub steps: u64,
}

impl StepGate {
    pub fn grant(&mut self, pending: PendingReply) {
        self.granted = true;
        self.pending = pending;
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }

    /// Whether the update that just finished took a tick.
    pub fn stepped(&self) -> bool {
        self.stepped
    }

    /// Clears the grant and returns what is owed.
    pub fn finish(&mut self) -> PendingReply {
        self.stepped = self.granted;
        if self.granted {
            self.steps += 1;
        }
        self.granted = false;
        std::mem::take(&mut self.pending)
    }
}

/// Run condition for the tick sets.
pub fn step_granted(gate: Res<StepGate>) -> bool {
    gate.is_granted()
}
