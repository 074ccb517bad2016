// simlink_core/src/prelude.rs

// --- Engine Contract ---
pub use crate::engine::{
    ActuatorControl, ActuatorId, ActuatorState, ActuatorView, Contact, EntityRef, RobotId,
    RobotView, SensorId, SensorKind, SensorView, ServoControl, ServoControlMode, ServoState,
    SimulationEngine, ThrusterControl, ThrusterState,
};

// --- Data Model ---
pub use crate::collision::CollisionRule;
pub use crate::types::{
    ActionConfig, ActionSpec, CommandTable, ObservationConfig, ObservationFilter,
    ObservationSpec, RobotResetInfo,
};

// --- Pipeline ---
pub use crate::assembler::ObservationAssembler;
pub use crate::command::{CommandBatch, CommandProcessor, Request};
pub use crate::dispatcher::{ActuatorDispatcher, DispatchReport};
pub use crate::registry::FieldRegistry;
pub use crate::reset::apply_resets;

// --- Protocol & Transport ---
pub use crate::client::BridgeClient;
pub use crate::protocol::{
    BridgeSession, EngineHandler, Exchange, Reply, RequestHandler, StepCoordinator,
};
pub use crate::transport::{
    ReplyTransport, RequestTransport, TcpReplySocket, TcpRequestSocket, TelemetryPublisher,
    TelemetryValue,
};

// --- Errors ---
pub use crate::error::{
    ClientError, ConfigError, DispatchIssue, ExtractionError, ParseIssue, ResetIssue,
    TransportError,
};
