// simlink_core/src/protocol.rs

//! The lockstep request/reply cycle.
//!
//! `BridgeSession` owns the wire side: receive, classify, hand the request
//! to a [`RequestHandler`], reply exactly once. `StepCoordinator` owns the
//! simulation side: apply the request to the engine, decide when to step,
//! and assemble the observation reply.

use crate::assembler::ObservationAssembler;
use crate::command::{CommandProcessor, Request};
use crate::dispatcher::{ActuatorDispatcher, DispatchReport};
use crate::engine::SimulationEngine;
use crate::error::{ClientError, TransportError};
use crate::reset::{apply_resets, ResetReport};
use crate::transport::ReplyTransport;
use crate::types::ObservationFilter;
use tracing::{debug, info, warn};

pub const EXIT_ACK: &str = "EXIT OK";
pub const INVALID_REPLY: &str = "INVALID";

// =========================================================================
// == Replies ==
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Observation(Vec<f32>),
    ExitAck,
    Invalid,
}

impl Reply {
    /// Wire form. Observations are a JSON array with six decimals.
    pub fn encode(&self) -> String {
        match self {
            Reply::Observation(values) => {
                let body: Vec<String> = values.iter().map(|v| format!("{:.6}", v)).collect();
                format!("[{}]", body.join(","))
            }
            Reply::ExitAck => EXIT_ACK.to_string(),
            Reply::Invalid => INVALID_REPLY.to_string(),
        }
    }

    pub fn decode(text: &str) -> Result<Self, ClientError> {
        let text = text.trim();
        match text {
            EXIT_ACK => Ok(Reply::ExitAck),
            INVALID_REPLY => Ok(Reply::Invalid),
            _ if text.starts_with('[') => serde_json::from_str::<Vec<f32>>(text)
                .map(Reply::Observation)
                .map_err(|_| ClientError::UnexpectedReply(text.to_string())),
            _ => Err(ClientError::UnexpectedReply(text.to_string())),
        }
    }
}

// =========================================================================
// == Simulation Side ==
// =========================================================================

/// What the stepping loop must do to finish a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Exchange {
    /// Send the reply now, then advance one tick (RESET).
    ReplyThenStep(Reply),
    /// Advance one tick, then reply with a fresh observation (CMD).
    StepThenObserve,
    /// Reply without stepping.
    Reply(Reply),
    /// Reply, then shut down.
    Shutdown(Reply),
}

/// Applies decoded requests to an engine.
#[derive(Debug, Clone)]
pub struct StepCoordinator {
    assembler: ObservationAssembler,
    dispatcher: ActuatorDispatcher,
    filter: ObservationFilter,
    last_dispatch: DispatchReport,
    last_reset: ResetReport,
}

impl StepCoordinator {
    pub fn new(assembler: ObservationAssembler) -> Self {
        Self {
            assembler,
            dispatcher: ActuatorDispatcher::new(),
            filter: ObservationFilter::default(),
            last_dispatch: DispatchReport::default(),
            last_reset: ResetReport::default(),
        }
    }

    pub fn assembler(&self) -> &ObservationAssembler {
        &self.assembler
    }

    /// The observation filter of the last CMD.
    pub fn filter(&self) -> &ObservationFilter {
        &self.filter
    }

    pub fn last_dispatch(&self) -> &DispatchReport {
        &self.last_dispatch
    }

    pub fn last_reset(&self) -> &ResetReport {
        &self.last_reset
    }

    /// Applies the request to the engine. Does not step.
    pub fn prepare(&mut self, request: &Request, engine: &mut dyn SimulationEngine) -> Exchange {
        match request {
            Request::Reset(resets) => {
                self.last_reset = apply_resets(resets, engine);
                Exchange::ReplyThenStep(self.observe(engine))
            }
            Request::Command(batch) => {
                self.filter = batch.filter.clone();
                self.last_dispatch = self.dispatcher.apply(&batch.commands, engine);
                Exchange::StepThenObserve
            }
            Request::Exit => Exchange::Shutdown(Reply::ExitAck),
            Request::Invalid(prefix) => {
                warn!("Rejecting request with prefix '{}'", prefix);
                Exchange::Reply(Reply::Invalid)
            }
        }
    }

    pub fn observe(&self, engine: &dyn SimulationEngine) -> Reply {
        Reply::Observation(self.assembler.observation_vector(engine))
    }

    /// Runs a whole request synchronously, stepping the engine itself.
    pub fn execute(&mut self, request: &Request, engine: &mut dyn SimulationEngine) -> Reply {
        match self.prepare(request, engine) {
            Exchange::ReplyThenStep(reply) => {
                engine.step();
                reply
            }
            Exchange::StepThenObserve => {
                engine.step();
                self.observe(engine)
            }
            Exchange::Reply(reply) | Exchange::Shutdown(reply) => reply,
        }
    }
}

// =========================================================================
// == Wire Side ==
// =========================================================================

/// Turns a decoded request into exactly one reply.
pub trait RequestHandler {
    fn handle(&mut self, request: Request) -> Result<Reply, TransportError>;
}

/// Handles requests inline against an engine owned by the caller.
pub struct EngineHandler<'a> {
    pub coordinator: &'a mut StepCoordinator,
    pub engine: &'a mut dyn SimulationEngine,
}

impl RequestHandler for EngineHandler<'_> {
    fn handle(&mut self, request: Request) -> Result<Reply, TransportError> {
        Ok(self.coordinator.execute(&request, self.engine))
    }
}

pub struct BridgeSession<T: ReplyTransport> {
    transport: T,
    processor: CommandProcessor,
    served: usize,
}

impl<T: ReplyTransport> BridgeSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            processor: CommandProcessor::new(),
            served: 0,
        }
    }

    pub fn processor(&self) -> &CommandProcessor {
        &self.processor
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Requests answered so far.
    pub fn served(&self) -> usize {
        self.served
    }

    /// Receives and answers one request. Returns `Ok(true)` after EXIT.
    pub fn serve_one(&mut self, handler: &mut dyn RequestHandler) -> Result<bool, TransportError> {
        let message = match self.transport.recv_request() {
            Ok(message) => message,
            Err(TransportError::InvalidUtf8) => {
                self.transport.send_reply(INVALID_REPLY)?;
                self.served += 1;
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        let request = self.processor.classify(&message);
        let shutdown = request == Request::Exit;
        debug!("Handling {} request", request.label());

        let reply = match handler.handle(request) {
            Ok(reply) => reply,
            Err(err) => {
                // The peer still gets its one reply before we give up.
                if let Err(send_err) = self.transport.send_reply(INVALID_REPLY) {
                    warn!("Could not send INVALID after a handler failure: {}", send_err);
                }
                return Err(err);
            }
        };
        self.transport.send_reply(&reply.encode())?;
        self.served += 1;
        Ok(shutdown)
    }

    /// Serves requests until EXIT.
    ///
    /// Receive timeouts are logged and the loop keeps waiting. A request
    /// that is not valid UTF-8 is answered with `INVALID`. A peer
    /// disconnect is survived when `reconnect` is set (the transport
    /// accepts a new controller on the next receive).
    pub fn serve(&mut self, handler: &mut dyn RequestHandler, reconnect: bool) -> Result<usize, TransportError> {
        loop {
            match self.serve_one(handler) {
                Ok(true) => {
                    info!("EXIT acknowledged after {} requests", self.served);
                    return Ok(self.served);
                }
                Ok(false) => {}
                Err(TransportError::Timeout) => {
                    debug!("No request yet, still waiting");
                }
                Err(TransportError::Disconnected) if reconnect => {
                    warn!("Controller went away, waiting for a new connection");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionRule;
    use crate::registry::FieldRegistry;
    use crate::test_support::MockEngine;
    use crate::transport::{memory_pair, RequestTransport};
    use crate::types::ObservationConfig;
    use std::thread;

    fn coordinator() -> StepCoordinator {
        StepCoordinator::new(ObservationAssembler::new(
            ObservationConfig::default(),
            FieldRegistry::default(),
            CollisionRule::default(),
        ))
    }

    #[test]
    fn test_reply_encoding() {
        assert_eq!(
            Reply::Observation(vec![0.12, 1.45]).encode(),
            "[0.120000,1.450000]"
        );
        assert_eq!(Reply::Observation(vec![]).encode(), "[]");
        assert_eq!(Reply::ExitAck.encode(), "EXIT OK");
        assert_eq!(Reply::decode("[1.000000,-2.500000]").unwrap(), Reply::Observation(vec![1.0, -2.5]));
        assert_eq!(Reply::decode("INVALID").unwrap(), Reply::Invalid);
        assert!(Reply::decode("garbage").is_err());
    }

    #[test]
    fn test_reset_replies_before_stepping() {
        let mut engine = MockEngine::new().with_robot("girona", [0.0; 3]);
        let mut coordinator = coordinator();
        let request = Request::Reset(vec![crate::types::RobotResetInfo {
            name: "girona".into(),
            position: vec![1.0, 2.0, 3.0],
            rotation: vec![0.0, 0.0, 0.0],
        }]);

        let exchange = coordinator.prepare(&request, &mut engine);
        assert_eq!(
            exchange,
            Exchange::ReplyThenStep(Reply::Observation(vec![1.0, 2.0, 3.0, 0.0, 0.0]))
        );
        assert_eq!(engine.steps, 0);

        coordinator.execute(&request, &mut engine);
        assert_eq!(engine.steps, 1);
    }

    #[test]
    fn test_command_steps_then_observes() {
        let mut engine = MockEngine::new()
            .with_robot("girona", [0.0; 3])
            .with_thruster("thr1");
        let mut coordinator = coordinator();
        let mut processor = CommandProcessor::new();

        let request = processor.classify("CMD:thr1:VELOCITY:5.0;OBS:girona");
        let reply = coordinator.execute(&request, &mut engine);

        assert_eq!(engine.steps, 1);
        assert_eq!(engine.thruster("thr1").setpoint, 5.0);
        assert!(matches!(reply, Reply::Observation(ref v) if v.len() == 5));
        assert!(!coordinator.filter().is_relevant("ds"));
        assert_eq!(coordinator.last_dispatch().applied.len(), 1);
    }

    #[test]
    fn test_exit_and_invalid_do_not_step() {
        let mut engine = MockEngine::new();
        let mut coordinator = coordinator();
        assert_eq!(coordinator.execute(&Request::Exit, &mut engine), Reply::ExitAck);
        assert_eq!(
            coordinator.execute(&Request::Invalid("PING".into()), &mut engine),
            Reply::Invalid
        );
        assert_eq!(engine.steps, 0);
    }

    #[test]
    fn test_session_serves_until_exit() {
        let (server, mut client) = memory_pair();

        let handle = thread::spawn(move || {
            let mut engine = MockEngine::new().with_robot("girona", [0.0; 3]).with_thruster("thr1");
            let mut coordinator = coordinator();
            let mut session = BridgeSession::new(server);
            let mut handler = EngineHandler {
                coordinator: &mut coordinator,
                engine: &mut engine,
            };
            let served = session.serve(&mut handler, false).unwrap();
            (served, engine.steps)
        });

        let reset = client
            .request(r#"RESET:{"name":"girona","position":[1,2,3],"rotation":[0,0,0]}"#)
            .unwrap();
        assert_eq!(reset, "[1.000000,2.000000,3.000000,0.000000,0.000000]");
        assert_eq!(client.request("HELLO").unwrap(), "INVALID");
        assert!(client.request("CMD:thr1:VELOCITY:1.0;OBS:").unwrap().starts_with('['));
        assert_eq!(client.request("EXIT").unwrap(), "EXIT OK");

        let (served, steps) = handle.join().unwrap();
        assert_eq!(served, 4);
        assert_eq!(steps, 2);
    }

    struct HungUpTransport {
        attempted_replies: usize,
    }

    impl ReplyTransport for HungUpTransport {
        fn recv_request(&mut self) -> Result<String, TransportError> {
            Ok("CMD:thr1:VELOCITY:1.0;OBS:".to_string())
        }

        fn send_reply(&mut self, _reply: &str) -> Result<(), TransportError> {
            self.attempted_replies += 1;
            Err(TransportError::Disconnected)
        }
    }

    struct FailingHandler;

    impl RequestHandler for FailingHandler {
        fn handle(&mut self, _request: Request) -> Result<Reply, TransportError> {
            Err(TransportError::ChannelClosed)
        }
    }

    #[test]
    fn test_handler_error_survives_failed_invalid_reply() {
        let mut session = BridgeSession::new(HungUpTransport { attempted_replies: 0 });
        let result = session.serve_one(&mut FailingHandler);

        // The handler failure is what the caller sees, not the send failure.
        assert!(matches!(result, Err(TransportError::ChannelClosed)));
        assert_eq!(session.transport().attempted_replies, 1);
        assert_eq!(session.served(), 0);
    }

    #[test]
    fn test_session_survives_malformed_frames() {
        use crate::transport::frame::{self, DEFAULT_MAX_FRAME_LEN};
        use crate::transport::{TcpReplySocket, TcpRequestSocket};
        use std::net::TcpStream;

        let socket = TcpReplySocket::bind("127.0.0.1:0").unwrap().with_max_frame_len(256);
        let addr = socket.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut engine = MockEngine::new().with_robot("girona", [0.0; 3]).with_thruster("thr1");
            let mut coordinator = coordinator();
            let mut session = BridgeSession::new(socket);
            let mut handler = EngineHandler {
                coordinator: &mut coordinator,
                engine: &mut engine,
            };
            let served = session.serve(&mut handler, true).unwrap();
            (served, engine.steps)
        });

        let mut raw = TcpStream::connect(addr).unwrap();
        frame::write_message(&mut raw, &[b"CMD:thr1:VELOCITY:\xff;OBS:"]).unwrap();
        assert_eq!(frame::read_text(&mut raw, DEFAULT_MAX_FRAME_LEN).unwrap(), "INVALID");

        // Same connection keeps working.
        frame::write_text(&mut raw, "CMD:thr1:VELOCITY:1.0;OBS:").unwrap();
        assert!(frame::read_text(&mut raw, DEFAULT_MAX_FRAME_LEN).unwrap().starts_with('['));

        // Oversized: the connection is dropped, the bridge keeps listening.
        frame::write_message(&mut raw, &[&[b'x'; 1024]]).unwrap();
        drop(raw);

        let mut client = TcpRequestSocket::connect(addr).unwrap();
        assert_eq!(client.request("EXIT").unwrap(), "EXIT OK");

        let (served, steps) = handle.join().unwrap();
        assert_eq!(served, 3);
        assert_eq!(steps, 1);
    }
}
