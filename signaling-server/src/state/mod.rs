pub mod registry;
pub mod snapshot;
pub mod voice;

pub use registry::{ConnId, Session, SessionRegistry, WebSocketSender};
pub use snapshot::SnapshotState;
pub use voice::{StateStore, VoiceState};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use hyper_tungstenite::tungstenite::Message;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::JoinError;
use crate::protocol::{
    GameSnapshot, Gamertag, PttState, ServerMessage, StateEntry, VoiceDetectionState,
};
use crate::verify::GamertagLookup;
use registry::send_direct;

/// Sessions plus the two state side tables. Always locked as one unit so a
/// join racing a leave cannot break gamertag uniqueness or leave orphaned
/// state behind.
#[derive(Debug, Default)]
pub struct Hub {
    /// Every open socket, joined or not
    connections: HashMap<ConnId, WebSocketSender>,
    registry: SessionRegistry,
    voice: VoiceState,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn voice(&self) -> &VoiceState {
        &self.voice
    }

    pub fn voice_mut(&mut self) -> &mut VoiceState {
        &mut self.voice
    }

    /// Track an open socket so shutdown can reach it before it joins.
    pub fn connect(&mut self, conn_id: ConnId, sender: WebSocketSender) {
        self.connections.insert(conn_id, sender);
    }

    /// Forget a closed socket. Its session, if any, must already be gone.
    pub fn release(&mut self, conn_id: &str) {
        self.connections.remove(conn_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Register a session and seed its default PTT and voice state.
    pub fn join(
        &mut self,
        conn_id: &ConnId,
        gamertag: &str,
        sender: WebSocketSender,
    ) -> Result<(), JoinError> {
        self.registry
            .join(conn_id.clone(), gamertag.to_string(), sender)?;
        self.voice.seed(gamertag);
        Ok(())
    }

    /// Drop the session for `conn_id` together with its state entries.
    pub fn leave(&mut self, conn_id: &str) -> Option<Gamertag> {
        let gamertag = self.registry.leave(conn_id)?;
        self.voice.remove(&gamertag);
        Some(gamertag)
    }

    /// Announce shutdown and close every socket, joined or not, then clear
    /// all state. Returns the number of sockets closed.
    pub fn shutdown(&mut self, message: &str) -> usize {
        let notice = ServerMessage::ServerShutdown {
            message: message.to_string(),
        };

        let mut closed = 0;
        for (conn_id, sender) in self.connections.drain() {
            if self.registry.identity_of(&conn_id).is_some() {
                continue;
            }
            send_direct(&sender, &notice);
            let _ = sender.send(Message::Close(None));
            closed += 1;
        }

        self.registry.broadcast(&notice);
        closed += self.registry.close_all().len();
        self.voice.clear();
        closed
    }
}

pub type SharedHub = Arc<Mutex<Hub>>;

/// What the snapshot endpoint hands back to its HTTP caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub ptt_states: Vec<StateEntry<PttState>>,
    pub voice_states: Vec<StateEntry<VoiceDetectionState>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    /// Joined sessions
    pub connections: usize,
    /// Open sockets, including ones that have not joined yet
    pub sockets: usize,
    pub has_game_state: bool,
    pub game_state_updated_at: Option<DateTime<Utc>>,
    pub ptt_states: usize,
    pub voice_states: usize,
    pub uptime_secs: u64,
    pub started_at: DateTime<Utc>,
}

/// Everything a connection or request handler needs.
#[derive(Clone)]
pub struct AppState {
    pub hub: SharedHub,
    pub snapshot: Arc<Mutex<SnapshotState>>,
    pub lookup: Arc<GamertagLookup>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl AppState {
    pub fn new(lookup: GamertagLookup) -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub::new())),
            snapshot: Arc::new(Mutex::new(SnapshotState::new())),
            lookup: Arc::new(lookup),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Store a new snapshot and push it, merged with current PTT and voice
    /// state, to every session.
    ///
    /// The hub lock is held across the store and the broadcast, so the last
    /// `game-state` every client sees is the snapshot left in the cell.
    /// Lock order is hub, then snapshot.
    pub async fn ingest_snapshot(&self, snapshot: GameSnapshot) -> IngestOutcome {
        let mute_states = snapshot::mute_states(&snapshot);

        let hub = self.hub.lock().await;
        self.snapshot.lock().await.replace(snapshot.clone());

        let outcome = IngestOutcome {
            ptt_states: hub.voice().ptt.get_all(),
            voice_states: hub.voice().voice.get_all(),
        };
        hub.registry().broadcast(&ServerMessage::GameState {
            data: snapshot,
            mute_states,
            ptt_states: outcome.ptt_states.clone(),
            voice_states: outcome.voice_states.clone(),
        });
        outcome
    }

    /// Latest stored snapshot, if the game server has pushed one.
    pub async fn current_snapshot(&self) -> Option<GameSnapshot> {
        self.snapshot.lock().await.current().cloned()
    }

    pub async fn health(&self) -> HealthReport {
        let (connections, sockets, ptt_states, voice_states) = {
            let hub = self.hub.lock().await;
            (
                hub.registry().len(),
                hub.connection_count(),
                hub.voice().ptt.len(),
                hub.voice().voice.len(),
            )
        };
        let (has_game_state, game_state_updated_at) = {
            let snapshot = self.snapshot.lock().await;
            (snapshot.is_present(), snapshot.updated_at())
        };

        HealthReport {
            status: "ok",
            connections,
            sockets,
            has_game_state,
            game_state_updated_at,
            ptt_states,
            voice_states,
            uptime_secs: self.started.elapsed().as_secs(),
            started_at: self.started_at,
        }
    }

    pub async fn ptt_states(&self) -> Vec<StateEntry<PttState>> {
        self.hub.lock().await.voice().ptt.get_all()
    }

    pub async fn voice_states(&self) -> Vec<StateEntry<VoiceDetectionState>> {
        self.hub.lock().await.voice().voice.get_all()
    }

    pub async fn shutdown(&self, message: &str) -> usize {
        self.hub.lock().await.shutdown(message)
    }
}
