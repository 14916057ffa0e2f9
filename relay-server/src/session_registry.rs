// relay-server/src/session_registry.rs
use actix::Recipient;
use actix_web_actors::ws::CloseCode;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use common::models::session::{
    PeerRole, Session, SessionMetadata, SessionStatus, CONNECTED_TTL_MS, SESSION_ID_LEN,
    SESSION_SECRET_LEN,
};
use common::utils::{constant_time_eq, generate_id};

use crate::actors::peer_actor::PeerCommand;

/// Process-wide cap on live sessions, overridable by configuration.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Handle to one attached WebSocket connection.
///
/// The `conn_id` is the identity used when releasing a slot, so a replaced
/// connection closing late cannot evict its replacement. The recipient is
/// the connection actor's mailbox; pushing through it keeps all writes to a
/// socket serialized.
#[derive(Clone)]
pub struct PeerConn {
    conn_id: u64,
    recipient: Recipient<PeerCommand>,
}

impl PeerConn {
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    /// Push a frame to this connection's mailbox.
    pub fn push(&self, frame: String) {
        if let Err(e) = self.recipient.try_send(PeerCommand::Frame(frame)) {
            tracing::warn!("Failed to deliver frame to connection {}: {}", self.conn_id, e);
        }
    }

    /// Ask this connection to close and stop.
    fn close(&self, code: CloseCode, reason: &'static str) {
        let _ = self.recipient.try_send(PeerCommand::Close { code, reason });
    }
}

/// What `register_connection` hands back to a successfully attached peer.
pub struct RegisterOutcome {
    /// Identity to present when unregistering.
    pub conn_id: u64,
    /// Snapshot of the record after the attachment.
    pub session: Session,
    /// The opposite-role connection as it stood when this peer attached.
    pub peer: Option<PeerConn>,
}

/// Counters for `/metrics` and `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_sessions: usize,
    pub pending_sessions: usize,
    pub connected_sessions: usize,
    pub max_sessions: usize,
    /// Seconds since the registry was constructed.
    pub uptime: u64,
}

/// A session record plus its live connection handles.
struct SessionEntry {
    session: Session,
    dapp: Option<PeerConn>,
    mobile: Option<PeerConn>,
}

impl SessionEntry {
    fn slot(&mut self, role: PeerRole) -> &mut Option<PeerConn> {
        match role {
            PeerRole::Dapp => &mut self.dapp,
            PeerRole::Mobile => &mut self.mobile,
        }
    }
}

/// In-memory session store.
///
/// All operations are atomic per session: mutating paths go through a single
/// `DashMap` entry guard, and connection handles are cloned out of the guard
/// before anything is pushed to a mailbox.
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
    max_sessions: usize,
    next_conn_id: AtomicU64,
    started_at: Instant,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            next_conn_id: AtomicU64::new(1),
            started_at: Instant::now(),
        }
    }

    /// Create a new pending session with a store-unique id.
    ///
    /// Id collisions are resolved by rejection sampling against the live
    /// map; the secret is not collision-checked.
    pub fn create(&self, metadata: Option<SessionMetadata>) -> Session {
        let secret = generate_id(SESSION_SECRET_LEN);
        loop {
            let id = generate_id(SESSION_ID_LEN);
            match self.sessions.entry(id.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(vacant) => {
                    let session = Session::new(id.clone(), secret, metadata);
                    vacant.insert(SessionEntry {
                        session: session.clone(),
                        dapp: None,
                        mobile: None,
                    });
                    tracing::info!("Created session {}", id);
                    return session;
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.session.clone())
    }

    /// Remove a record without touching its connections.
    pub fn delete(&self, id: &str) {
        self.sessions.remove(id);
    }

    /// Constant-time secret check. Unknown ids verify false.
    pub fn verify_secret(&self, id: &str, secret: &str) -> bool {
        self.sessions
            .get(id)
            .map(|entry| constant_time_eq(&entry.session.secret, secret))
            .unwrap_or(false)
    }

    pub fn is_mobile_locked(&self, id: &str) -> bool {
        self.sessions
            .get(id)
            .map(|entry| entry.session.mobile_locked)
            .unwrap_or(false)
    }

    /// Attach a connection to a session slot.
    ///
    /// Returns `None` when the session is unknown, terminated, or a Mobile
    /// is already attached. A DApp may replace its own slot (reconnect); the
    /// previous handle is simply dropped from routing, its socket is left to
    /// its owner.
    pub fn register_connection(
        &self,
        id: &str,
        role: PeerRole,
        recipient: Recipient<PeerCommand>,
    ) -> Option<RegisterOutcome> {
        let mut entry = self.sessions.get_mut(id)?;

        if entry.session.terminated {
            return None;
        }
        if role == PeerRole::Mobile && entry.session.mobile_locked && entry.mobile.is_some() {
            return None;
        }

        // Opposite-role attachment as of this moment, for routing the
        // dapp_reconnected notification.
        let peer = match role {
            PeerRole::Dapp => entry.mobile.clone(),
            PeerRole::Mobile => entry.dapp.clone(),
        };

        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let conn = PeerConn { conn_id, recipient };
        *entry.slot(role) = Some(conn);

        if role == PeerRole::Mobile {
            entry.session.mobile_locked = true;
        }
        if entry.dapp.is_some() && entry.mobile.is_some() {
            entry.session.status = SessionStatus::Connected;
            entry.session.expires_at = Utc::now().timestamp_millis() + CONNECTED_TTL_MS;
        }

        tracing::info!("{} attached to session {} (conn {})", role, id, conn_id);

        Some(RegisterOutcome {
            conn_id,
            session: entry.session.clone(),
            peer,
        })
    }

    /// Release a slot if `conn_id` still owns it.
    ///
    /// Returns true when the slot was actually cleared; a stale handle (a
    /// replaced DApp, or a register race loser) is a no-op, as is an unknown
    /// session.
    pub fn unregister_connection(&self, id: &str, role: PeerRole, conn_id: u64) -> bool {
        let Some(mut entry) = self.sessions.get_mut(id) else {
            return false;
        };

        let held = entry
            .slot(role)
            .as_ref()
            .map(|conn| conn.conn_id == conn_id)
            .unwrap_or(false);
        if !held {
            return false;
        }

        *entry.slot(role) = None;
        if role == PeerRole::Mobile {
            entry.session.mobile_locked = false;
        }
        entry.session.status = SessionStatus::Disconnected;
        tracing::info!("{} detached from session {} (conn {})", role, id, conn_id);
        true
    }

    /// Mark a session dead and close both attachments.
    pub fn terminate_session(&self, id: &str) {
        let connections = {
            let Some(mut entry) = self.sessions.get_mut(id) else {
                return;
            };
            entry.session.terminated = true;
            entry.session.status = SessionStatus::Disconnected;
            entry.session.mobile_locked = false;
            [entry.dapp.take(), entry.mobile.take()]
        };

        tracing::info!("Terminated session {}", id);
        for conn in connections.into_iter().flatten() {
            conn.close(CloseCode::Normal, "Session terminated");
        }
    }

    /// Opposite-role attachment, if any.
    pub fn get_peer(&self, id: &str, my_role: PeerRole) -> Option<PeerConn> {
        self.sessions.get(id).and_then(|entry| match my_role {
            PeerRole::Dapp => entry.mobile.clone(),
            PeerRole::Mobile => entry.dapp.clone(),
        })
    }

    /// Remove every expired record, closing still-attached connections with
    /// a normal closure. Returns the number of sessions removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now().timestamp_millis();

        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.session.is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in expired {
            // Re-check under the removal lock: the session may have been
            // refreshed by a connection since the scan.
            if let Some((_, entry)) = self
                .sessions
                .remove_if(&id, |_, entry| entry.session.is_expired(now))
            {
                removed += 1;
                tracing::info!("Removed expired session {}", id);
                for conn in [entry.dapp, entry.mobile].into_iter().flatten() {
                    conn.close(CloseCode::Normal, "Session expired");
                }
            }
        }
        removed
    }

    /// Close every attached connection; used on shutdown.
    pub fn close_all(&self) {
        let connections: Vec<PeerConn> = self
            .sessions
            .iter()
            .flat_map(|entry| [entry.dapp.clone(), entry.mobile.clone()])
            .flatten()
            .collect();

        if !connections.is_empty() {
            tracing::info!("Closing {} live connections", connections.len());
        }
        for conn in connections {
            conn.close(CloseCode::Away, "Server shutting down");
        }
    }

    pub fn is_at_capacity(&self) -> bool {
        self.sessions.len() >= self.max_sessions
    }

    pub fn stats(&self) -> RegistryStats {
        let mut pending = 0;
        let mut connected = 0;
        for entry in self.sessions.iter() {
            match entry.session.status {
                SessionStatus::Pending => pending += 1,
                SessionStatus::Connected => connected += 1,
                SessionStatus::Disconnected => {}
            }
        }
        RegistryStats {
            total_sessions: self.sessions.len(),
            pending_sessions: pending,
            connected_sessions: connected,
            max_sessions: self.max_sessions,
            uptime: self.started_at.elapsed().as_secs(),
        }
    }

    /// Backdate a session so the next sweep removes it.
    #[cfg(test)]
    fn force_expire(&self, id: &str) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.session.expires_at = Utc::now().timestamp_millis() - 1;
        }
    }
}
