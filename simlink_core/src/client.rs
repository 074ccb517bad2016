// simlink_core/src/client.rs

//! Controller side of the bridge.

use crate::error::ClientError;
use crate::protocol::Reply;
use crate::transport::{RequestTransport, TcpRequestSocket};
use crate::types::{ActionConfig, RobotResetInfo};
use std::net::ToSocketAddrs;
use tracing::{debug, warn};

/// `RESET:` payload for a list of robots. An empty list keeps every
/// robot where it is.
pub fn encode_reset(robots: &[RobotResetInfo]) -> Result<String, ClientError> {
    if robots.is_empty() {
        return Ok("RESET:{}".to_string());
    }
    Ok(format!("RESET:{}", serde_json::to_string(robots)?))
}

/// `CMD:` payload mapping `actions[i]` onto `config.specs[i]`, clamped to
/// each action's `[min_value, max_value]`.
pub fn encode_command(
    config: &ActionConfig,
    actions: &[f32],
    observe: &[&str],
) -> Result<String, ClientError> {
    if actions.len() != config.specs.len() {
        return Err(ClientError::ActionSizeMismatch {
            expected: config.specs.len(),
            got: actions.len(),
        });
    }

    let commands: Vec<String> = config
        .specs
        .iter()
        .zip(actions)
        .map(|(spec, &value)| {
            format!("{}:{}:{}", spec.actuator_name, spec.action_type, spec.clamp(value))
        })
        .collect();

    let mut message = String::from("CMD:");
    for command in &commands {
        message.push_str(command);
        message.push(';');
    }
    message.push_str("OBS:");
    message.push_str(&observe.join(";"));
    Ok(message)
}

pub struct BridgeClient<T: RequestTransport> {
    transport: T,
    actions: ActionConfig,
    observation_size: Option<usize>,
}

impl BridgeClient<TcpRequestSocket> {
    pub fn connect(addr: impl ToSocketAddrs, actions: ActionConfig) -> Result<Self, ClientError> {
        Ok(Self::new(TcpRequestSocket::connect(addr)?, actions))
    }
}

impl<T: RequestTransport> BridgeClient<T> {
    pub fn new(transport: T, actions: ActionConfig) -> Self {
        Self {
            transport,
            actions,
            observation_size: None,
        }
    }

    /// Expected observation length. Replies of another length are logged.
    pub fn with_observation_size(mut self, size: usize) -> Self {
        self.observation_size = Some(size);
        self
    }

    pub fn action_config(&self) -> &ActionConfig {
        &self.actions
    }

    pub fn action_size(&self) -> usize {
        self.actions.specs.len()
    }

    fn exchange(&mut self, message: &str) -> Result<Reply, ClientError> {
        debug!("Sending command: {}", message);
        let text = self.transport.request(message)?;
        Reply::decode(&text)
    }

    fn expect_observation(&mut self, message: &str) -> Result<Vec<f32>, ClientError> {
        match self.exchange(message)? {
            Reply::Observation(values) => {
                if let Some(expected) = self.observation_size {
                    if values.len() != expected {
                        warn!(
                            "Observation size mismatch: expected {}, got {}",
                            expected,
                            values.len()
                        );
                    }
                }
                Ok(values)
            }
            Reply::Invalid => Err(ClientError::Rejected),
            Reply::ExitAck => Err(ClientError::UnexpectedReply(Reply::ExitAck.encode())),
        }
    }

    pub fn reset(&mut self, robots: &[RobotResetInfo]) -> Result<Vec<f32>, ClientError> {
        let message = encode_reset(robots)?;
        self.expect_observation(&message)
    }

    /// Sends one action vector and returns the observation after the tick.
    pub fn step(&mut self, actions: &[f32]) -> Result<Vec<f32>, ClientError> {
        self.step_observing(actions, &[])
    }

    pub fn step_observing(&mut self, actions: &[f32], observe: &[&str]) -> Result<Vec<f32>, ClientError> {
        let message = encode_command(&self.actions, actions, observe)?;
        self.expect_observation(&message)
    }

    pub fn exit(mut self) -> Result<(), ClientError> {
        match self.exchange("EXIT")? {
            Reply::ExitAck => Ok(()),
            other => Err(ClientError::UnexpectedReply(other.encode())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandProcessor, Request};
    use crate::types::ActionSpec;

    fn actions() -> ActionConfig {
        ActionConfig {
            specs: vec![
                ActionSpec {
                    actuator_name: "thr1".into(),
                    action_type: "VELOCITY".into(),
                    output_name: "t1".into(),
                    min_value: -1.0,
                    max_value: 1.0,
                },
                ActionSpec {
                    actuator_name: "joint".into(),
                    action_type: "POSITION".into(),
                    output_name: "j".into(),
                    min_value: -3.0,
                    max_value: 3.0,
                },
            ],
        }
    }

    #[test]
    fn test_command_encoding_parses_back() {
        let message = encode_command(&actions(), &[0.5, 9.0], &["girona"]).unwrap();
        assert_eq!(message, "CMD:thr1:VELOCITY:0.5;joint:POSITION:3;OBS:girona");

        let Request::Command(batch) = CommandProcessor::new().classify(&message) else {
            panic!("expected a command");
        };
        assert_eq!(batch.commands["thr1"]["VELOCITY"], 0.5);
        assert_eq!(batch.commands["joint"]["POSITION"], 3.0);
    }

    #[test]
    fn test_action_size_mismatch() {
        assert!(matches!(
            encode_command(&actions(), &[0.5], &[]),
            Err(ClientError::ActionSizeMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_reset_encoding_parses_back() {
        assert_eq!(encode_reset(&[]).unwrap(), "RESET:{}");

        let robots = vec![RobotResetInfo {
            name: "girona".into(),
            position: vec![1.0, 2.0, 3.0],
            rotation: vec![0.0, 0.0, 1.5],
        }];
        let message = encode_reset(&robots).unwrap();
        assert_eq!(CommandProcessor::new().classify(&message), Request::Reset(robots));
    }
}
