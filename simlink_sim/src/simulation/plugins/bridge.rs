// simlink_sim/src/simulation/plugins/bridge.rs

//! Runs the bridge protocol on its own thread and feeds the app loop.
//!
//! The bridge thread owns the socket: it receives, classifies, and replies.
//! The app loop owns the scene: it takes one request per update from a
//! channel, applies it, steps if the request asks for it, and sends the
//! reply back. The thread starts receiving only after the app signals
//! that the scene is built.

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};
use std::net::SocketAddr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use simlink_core::config::load_observation_config;

use crate::prelude::*;
use crate::simulation::core::app_state::{PendingReply, SimulationSet, StepGate};
use crate::simulation::core::world::SceneWorld;

// --- Resources ---

/// Overrides the observation schema file named in the settings.
#[derive(Resource, Debug, Clone)]
pub struct ObservationSchema(pub ObservationConfig);

/// The address the bridge actually bound, useful when binding port 0.
#[derive(Resource, Debug, Clone, Copy)]
pub struct BridgeAddress(pub SocketAddr);

#[derive(Resource)]
pub struct Coordinator(pub StepCoordinator);

/// App-side ends of the bridge channels.
#[derive(Resource)]
struct BridgeLink {
    ready: Sender<()>,
    requests: Receiver<Request>,
    replies: Sender<Reply>,
    thread: Option<JoinHandle<Result<usize, TransportError>>>,
}

impl BridgeLink {
    fn send(&self, reply: Reply) {
        if self.replies.send(reply).is_err() {
            warn!("[Bridge] Bridge thread is gone; dropping reply");
        }
    }

    /// Waits for the bridge thread to finish flushing its last reply.
    fn join(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        match handle.join() {
            Ok(Ok(served)) => info!("[Bridge] Thread finished after {} requests", served),
            Ok(Err(e)) => error!("[Bridge] Thread stopped: {}", e),
            Err(_) => error!("[Bridge] Thread panicked"),
        }
    }
}

// --- Bridge Thread ---

/// Forwards each request to the app loop and waits for its reply.
struct ChannelHandler {
    requests: Sender<Request>,
    replies: Receiver<Reply>,
}

impl RequestHandler for ChannelHandler {
    fn handle(&mut self, request: Request) -> Result<Reply, TransportError> {
        self.requests
            .send(request)
            .map_err(|_| TransportError::ChannelClosed)?;
        self.replies.recv().map_err(|_| TransportError::ChannelClosed)
    }
}

fn run_bridge(
    socket: TcpReplySocket,
    ready: Receiver<()>,
    requests: Sender<Request>,
    replies: Receiver<Reply>,
) -> Result<usize, TransportError> {
    ready.recv().map_err(|_| TransportError::ChannelClosed)?;
    info!("[Bridge] Scene ready, waiting for a controller");

    let mut session = BridgeSession::new(socket);
    let mut handler = ChannelHandler { requests, replies };
    session.serve(&mut handler, true)
}

// =========================================================================
// == Plugin ==
// =========================================================================

pub struct BridgePlugin;

impl Plugin for BridgePlugin {
    fn build(&self, app: &mut App) {
        let settings = app
            .world()
            .get_resource::<HostSettings>()
            .cloned()
            .unwrap_or_default();

        let schema = match app.world().get_resource::<ObservationSchema>() {
            Some(schema) => schema.0.clone(),
            None => load_observation_config(&settings.observation_config),
        };
        let assembler = ObservationAssembler::new(
            schema,
            FieldRegistry::with_defaults(),
            CollisionRule::new(settings.collision_targets.iter().cloned()),
        );
        assembler.log_specs();

        let socket = match TcpReplySocket::bind(&settings.bind_address) {
            Ok(socket) => socket
                .with_recv_timeout(settings.recv_timeout_ms.map(Duration::from_millis))
                .with_max_frame_len(settings.max_frame_len),
            Err(e) => {
                error!(
                    "[Bridge] Failed to bind {}: {}",
                    settings.bind_address, e
                );
                app.add_systems(Startup, exit_with_error);
                return;
            }
        };
        match socket.local_addr() {
            Ok(addr) => {
                info!("[Bridge] Listening on {}", addr);
                app.insert_resource(BridgeAddress(addr));
            }
            Err(e) => warn!("[Bridge] Could not read the bound address: {}", e),
        }

        // One outstanding request at a time.
        let (ready_tx, ready_rx) = bounded::<()>(1);
        let (request_tx, request_rx) = bounded::<Request>(1);
        let (reply_tx, reply_rx) = bounded::<Reply>(1);

        let thread = match thread::Builder::new()
            .name("simlink-bridge".to_string())
            .spawn(move || run_bridge(socket, ready_rx, request_tx, reply_rx))
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("[Bridge] Failed to start the bridge thread: {}", e);
                app.add_systems(Startup, exit_with_error);
                return;
            }
        };

        app.insert_resource(Coordinator(StepCoordinator::new(assembler)))
            .insert_resource(BridgeLink {
                ready: ready_tx,
                requests: request_rx,
                replies: reply_tx,
                thread: Some(thread),
            })
            .add_systems(Startup, signal_ready)
            .add_systems(
                Update,
                (
                    intake_request.in_set(SimulationSet::Intake),
                    reply_after_step.in_set(SimulationSet::Reply),
                ),
            );
    }
}

// =========================================================================
// == Systems ==
// =========================================================================

fn exit_with_error(mut exit: EventWriter<AppExit>) {
    exit.write(AppExit::error());
}

fn signal_ready(link: Res<BridgeLink>) {
    if link.ready.try_send(()).is_err() {
        warn!("[Bridge] Bridge thread did not take the ready signal");
    }
}

/// Takes at most one request and applies it to the scene.
fn intake_request(
    mut link: ResMut<BridgeLink>,
    mut coordinator: ResMut<Coordinator>,
    mut world: ResMut<SceneWorld>,
    mut gate: ResMut<StepGate>,
    mut exit: EventWriter<AppExit>,
    mut bridge_down: Local<bool>,
) {
    let request = match link.requests.try_recv() {
        Ok(request) => request,
        Err(TryRecvError::Empty) => return,
        Err(TryRecvError::Disconnected) => {
            if !*bridge_down {
                *bridge_down = true;
                link.join();
                exit.write(AppExit::error());
            }
            return;
        }
    };

    match coordinator.0.prepare(&request, &mut *world) {
        Exchange::ReplyThenStep(reply) => {
            link.send(reply);
            gate.grant(PendingReply::None);
        }
        Exchange::StepThenObserve => gate.grant(PendingReply::ObservationAfterStep),
        Exchange::Reply(reply) => link.send(reply),
        Exchange::Shutdown(reply) => {
            link.send(reply);
            info!("[Bridge] EXIT received, shutting down");
            link.join();
            exit.write(AppExit::Success);
        }
    }
}

/// Closes the update: replies with the post-tick observation if one is owed.
fn reply_after_step(
    link: Res<BridgeLink>,
    coordinator: Res<Coordinator>,
    world: Res<SceneWorld>,
    mut gate: ResMut<StepGate>,
) {
    if gate.finish() == PendingReply::ObservationAfterStep {
        link.send(coordinator.0.observe(&*world));
    }
}
