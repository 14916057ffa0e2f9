// relay-server/src/actors/peer_actor.rs
use actix::{Actor, ActorContext, AsyncContext, Handler, Message, StreamHandler};
use actix_web_actors::ws;
use common::messages::WireMessage;
use common::models::session::PeerRole;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::session_registry::SessionRegistry;

/// Command pushed into a connection actor's mailbox by the registry or by
/// the opposite peer. The mailbox is the only writer to the socket.
#[derive(Debug, Message)]
#[rtype(result = "()")]
pub enum PeerCommand {
    /// Write a frame to the socket verbatim.
    Frame(String),
    /// Close the socket with the given code and stop the actor.
    Close {
        code: ws::CloseCode,
        reason: &'static str,
    },
}

/// One relay WebSocket connection.
///
/// The actor registers itself into the session on start, forwards every
/// inbound text frame to the opposite peer without inspecting it, and
/// releases its slot on stop. Handshake-time validation has already
/// happened in the route handler; the only failure left here is losing a
/// register race, which closes with policy code 1008.
pub struct PeerActor {
    session_id: String,
    role: PeerRole,
    registry: Arc<SessionRegistry>,
    /// Set once registration succeeds; identity for the release.
    conn_id: Option<u64>,
    last_heartbeat: Instant,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
}

impl PeerActor {
    pub fn new(session_id: String, role: PeerRole, registry: Arc<SessionRegistry>) -> Self {
        Self {
            session_id,
            role,
            registry,
            conn_id: None,
            last_heartbeat: Instant::now(),
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_timeout: Duration::from_secs(30),
        }
    }

    // Heartbeat with timeout detection
    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > act.heartbeat_timeout {
                tracing::warn!(
                    "{} heartbeat timeout on session {}",
                    act.role,
                    act.session_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Relay an inbound frame to the opposite peer, or report its absence
    /// back to the sender.
    fn forward(&self, payload: String, ctx: &mut ws::WebsocketContext<Self>) {
        match self.registry.get_peer(&self.session_id, self.role) {
            Some(peer) => {
                tracing::debug!(
                    "Forwarding {} byte frame from {} on session {}",
                    payload.len(),
                    self.role,
                    self.session_id
                );
                peer.push(payload);
            }
            None => {
                ctx.text(WireMessage::peer_not_connected().to_json());
            }
        }
    }
}

impl Actor for PeerActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.last_heartbeat = Instant::now();
        self.heartbeat(ctx);

        // Registering from started() means no forwarded frame can be queued
        // for this connection before the ready frame below is written.
        let recipient = ctx.address().recipient();
        match self
            .registry
            .register_connection(&self.session_id, self.role, recipient)
        {
            Some(outcome) => {
                self.conn_id = Some(outcome.conn_id);
                ctx.text(WireMessage::Ready.to_json());

                // A DApp attaching while a Mobile already holds the session
                // is a reconnect from the wallet's point of view.
                if self.role == PeerRole::Dapp {
                    if let Some(mobile) = outcome.peer {
                        mobile.push(WireMessage::DappReconnected.to_json());
                    }
                }
            }
            None => {
                tracing::warn!(
                    "{} lost register race on session {}",
                    self.role,
                    self.session_id
                );
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Policy,
                    description: Some("Session not found or already locked".to_string()),
                }));
                ctx.stop();
            }
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let Some(conn_id) = self.conn_id else {
            return;
        };

        let released =
            self.registry
                .unregister_connection(&self.session_id, self.role, conn_id);

        // Only the connection that actually held the slot advertises its
        // departure; a replaced DApp closing late stays silent.
        if released {
            if let Some(peer) = self.registry.get_peer(&self.session_id, self.role) {
                peer.push(WireMessage::peer_disconnected().to_json());
            }
        }
    }
}

impl Handler<PeerCommand> for PeerActor {
    type Result = ();

    fn handle(&mut self, msg: PeerCommand, ctx: &mut Self::Context) -> Self::Result {
        match msg {
            PeerCommand::Frame(content) => ctx.text(content),
            PeerCommand::Close { code, reason } => {
                ctx.close(Some(ws::CloseReason {
                    code,
                    description: Some(reason.to_string()),
                }));
                ctx.stop();
            }
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PeerActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.forward(text.to_string(), ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                // The protocol is JSON text; binary is refused, not relayed.
                self.last_heartbeat = Instant::now();
                ctx.text(WireMessage::binary_not_supported().to_json());
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(
                    "{} closing connection on session {}: {:?}",
                    self.role,
                    self.session_id,
                    reason
                );
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                self.last_heartbeat = Instant::now();
                tracing::trace!("Received continuation frame on session {}", self.session_id);
            }
            Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(e) => {
                tracing::error!(
                    "WebSocket protocol error from {} on session {}: {}",
                    self.role,
                    self.session_id,
                    e
                );
                ctx.stop();
            }
        }
    }
}
