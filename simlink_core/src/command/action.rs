// simlink_core/src/command/action.rs

use crate::error::ParseIssue;
use crate::types::{CommandTable, ObservationFilter};

const OBS_MARKER: &str = "OBS:";

/// The decoded body of a CMD request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBatch {
    pub commands: CommandTable,
    pub filter: ObservationFilter,
}

impl CommandBatch {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.filter.is_empty()
    }

    /// Number of (actuator, verb) entries.
    pub fn command_count(&self) -> usize {
        self.commands.values().map(|verbs| verbs.len()).sum()
    }
}

/// Parses `<actuator>:<VERB>:<value>;...;OBS:<name>;<name>;...`.
///
/// Without the `OBS:` marker nothing is parsed and the batch is empty.
pub fn parse_command_payload(body: &str) -> (CommandBatch, Vec<ParseIssue>) {
    let mut batch = CommandBatch::default();
    let mut issues = Vec::new();

    let Some(marker) = body.find(OBS_MARKER) else {
        issues.push(ParseIssue::MissingObsMarker);
        return (batch, issues);
    };
    let (command_part, filter_part) = (&body[..marker], &body[marker + OBS_MARKER.len()..]);

    for token in command_part.split(';').map(str::trim).filter(|t| !t.is_empty()) {
        match parse_command_token(token) {
            Ok((actuator, verb, value)) => {
                batch
                    .commands
                    .entry(actuator.to_string())
                    .or_default()
                    .insert(verb.to_string(), value);
            }
            Err(issue) => issues.push(issue),
        }
    }

    for name in filter_part.split(';').map(str::trim).filter(|n| !n.is_empty()) {
        batch.filter.insert(name);
    }

    (batch, issues)
}

fn parse_command_token(token: &str) -> Result<(&str, &str, f32), ParseIssue> {
    let parts: Vec<&str> = token.split(':').map(str::trim).collect();
    let [actuator, verb, raw_value] = parts.as_slice() else {
        return Err(ParseIssue::InvalidCommandFormat(token.to_string()));
    };
    if actuator.is_empty() || verb.is_empty() {
        return Err(ParseIssue::InvalidCommandFormat(token.to_string()));
    }

    match raw_value.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok((*actuator, *verb, value)),
        _ => Err(ParseIssue::InvalidCommandValue {
            actuator: actuator.to_string(),
            verb: verb.to_string(),
            token: raw_value.to_string(),
        }),
    }
}
