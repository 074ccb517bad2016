// simlink_core/src/error.rs

//! Typed error values for every recoverable failure in the bridge.
//!
//! None of these are fatal: parse and dispatch issues are collected into
//! reports and logged, extraction errors collapse to the sentinel value, and
//! configuration errors fall back to the default schema.

use crate::engine::SensorKind;
use std::io;
use thiserror::Error;

/// A diagnostic raised while decoding a request payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseIssue {
    #[error("unknown request prefix '{0}'")]
    UnknownPrefix(String),

    #[error("invalid number '{token}' in field '{field}', field dropped")]
    InvalidNumber { field: String, token: String },

    #[error("field '{field}' expects a bracketed list of numbers")]
    ExpectedArray { field: String },

    #[error("field 'name' expects a quoted string")]
    ExpectedString,

    #[error("unexpected '{found}' at byte {offset}")]
    UnexpectedChar { offset: usize, found: char },

    #[error("nested object at byte {offset} is not supported, object skipped")]
    NestedObject { offset: usize },

    #[error("object starting at byte {offset} is never closed")]
    UnterminatedObject { offset: usize },

    #[error("reset object #{index} has no 'name', object skipped")]
    MissingName { index: usize },

    #[error("missing 'OBS:' marker in command payload")]
    MissingObsMarker,

    #[error("invalid command format '{0}', expected 'actuator:verb:value'")]
    InvalidCommandFormat(String),

    #[error("invalid value for {actuator}:{verb} -> '{token}'")]
    InvalidCommandValue {
        actuator: String,
        verb: String,
        token: String,
    },
}

/// Why a single observation could not be extracted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("entity '{0}' not found")]
    EntityNotFound(String),

    #[error("no {registry} extractor for field '{key}'")]
    UnknownField { registry: &'static str, key: String },

    #[error("sensor '{sensor}' is {found}, field expects {expected}")]
    SensorKindMismatch {
        sensor: String,
        expected: SensorKind,
        found: SensorKind,
    },

    #[error("sensor '{0}' does not produce scalar samples")]
    NotScalar(String),

    #[error("sensor '{sensor}' has {available} channels, channel {channel} requested")]
    ChannelOutOfRange {
        sensor: String,
        channel: usize,
        available: usize,
    },

    #[error("actuator '{actuator}' cannot provide field '{key}'")]
    ActuatorKindMismatch { actuator: String, key: String },
}

/// A problem met while applying a command batch to the actuators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchIssue {
    #[error("unknown command '{verb}' for {kind} '{actuator}'")]
    UnknownVerb {
        actuator: String,
        verb: String,
        kind: &'static str,
    },

    #[error("actuator type not supported: '{actuator}' ({type_name})")]
    UnsupportedActuator { actuator: String, type_name: String },

    #[error("no live actuator named '{0}'")]
    UnknownActuator(String),
}

/// A problem met while repositioning robots.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResetIssue {
    #[error("robot not found for reset: '{0}'")]
    RobotNotFound(String),

    #[error("invalid position for robot '{robot}', expected 3 values, got {len}")]
    InvalidPosition { robot: String, len: usize },

    #[error("rotation for robot '{robot}' has {len} values, keeping current rotation")]
    RotationIgnored { robot: String, len: usize },

    #[error("engine refused to respawn robot '{0}'")]
    RespawnRejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no observation specs configured")]
    EmptySpecs,

    #[error("no action specs configured")]
    EmptyActions,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("receive timed out")]
    Timeout,

    #[error("peer disconnected")]
    Disconnected,

    #[error("frame of {length} bytes exceeds the {max} byte limit")]
    FrameTooLarge { length: usize, max: usize },

    #[error("message has more than {max} frames")]
    TooManyFrames { max: usize },

    #[error("message is not valid UTF-8")]
    InvalidUtf8,

    #[error("out of order: {0}")]
    OutOfOrder(&'static str),

    #[error("channel closed")]
    ChannelClosed,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("action vector has {got} values, action config expects {expected}")]
    ActionSizeMismatch { expected: usize, got: usize },

    #[error("server rejected the request as invalid")]
    Rejected,

    #[error("cannot encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}
