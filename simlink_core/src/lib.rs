// simlink_core/src/lib.rs

// Engine-agnostic half of the simulation bridge: wire parsing, field
// extraction, actuator dispatch and the request/reply cycle.
pub mod assembler;
pub mod client;
pub mod collision;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod registry;
pub mod reset;
pub mod resolver;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
