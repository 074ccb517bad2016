// simlink_core/src/command/mod.rs

//! Request classification and payload decoding.

pub mod action;
pub mod reset;

pub use action::{parse_command_payload, CommandBatch};
pub use reset::parse_reset_payload;

use crate::error::ParseIssue;
use crate::types::{CommandTable, ObservationFilter, RobotResetInfo};
use tracing::warn;

pub const RESET_PREFIX: &str = "RESET";
pub const CMD_PREFIX: &str = "CMD";
pub const EXIT_PREFIX: &str = "EXIT";

/// A fully decoded request, ready to hand to the stepping loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Reset(Vec<RobotResetInfo>),
    Command(CommandBatch),
    Exit,
    /// Unknown prefix. Carries the prefix as received.
    Invalid(String),
}

impl Request {
    pub fn label(&self) -> &'static str {
        match self {
            Request::Reset(_) => RESET_PREFIX,
            Request::Command(_) => CMD_PREFIX,
            Request::Exit => EXIT_PREFIX,
            Request::Invalid(_) => "INVALID",
        }
    }
}

/// Splits `PREFIX:body` at the first colon. A message without a colon is
/// all prefix.
pub fn split_prefix(message: &str) -> (&str, &str) {
    message.split_once(':').unwrap_or((message, ""))
}

/// Holds the command table and observation filter of the current cycle.
///
/// Both are cleared and rebuilt by every CMD; nothing carries over.
#[derive(Debug, Default)]
pub struct CommandProcessor {
    commands: CommandTable,
    filter: ObservationFilter,
    issues: Vec<ParseIssue>,
}

impl CommandProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one wire message. Diagnostics are logged and kept until the
    /// next call.
    pub fn classify(&mut self, message: &str) -> Request {
        self.issues.clear();
        let message = message.trim();
        let (prefix, body) = split_prefix(message);

        let request = match prefix {
            RESET_PREFIX => Request::Reset(self.parse_reset_command(body)),
            CMD_PREFIX => {
                self.parse_action_commands(body);
                Request::Command(CommandBatch {
                    commands: self.commands.clone(),
                    filter: self.filter.clone(),
                })
            }
            EXIT_PREFIX => Request::Exit,
            other => {
                self.issues.push(ParseIssue::UnknownPrefix(other.to_string()));
                Request::Invalid(other.to_string())
            }
        };

        for issue in &self.issues {
            warn!("[CommandProcessor] {}", issue);
        }
        request
    }

    pub fn parse_reset_command(&mut self, body: &str) -> Vec<RobotResetInfo> {
        let (robots, issues) = parse_reset_payload(body);
        self.issues.extend(issues);
        robots
    }

    /// Clears the previous cycle, then parses `body` into the command table
    /// and observation filter.
    pub fn parse_action_commands(&mut self, body: &str) {
        self.clear();
        let (batch, issues) = parse_command_payload(body);
        self.commands = batch.commands;
        self.filter = batch.filter;
        self.issues.extend(issues);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.filter.clear();
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn relevant_observations(&self) -> &ObservationFilter {
        &self.filter
    }

    pub fn is_object_relevant(&self, name: &str) -> bool {
        self.filter.is_relevant(name)
    }

    /// Diagnostics raised by the most recent call.
    pub fn issues(&self) -> &[ParseIssue] {
        &self.issues
    }
}
