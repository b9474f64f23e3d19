use chrono::{DateTime, Utc};

use crate::protocol::{GameSnapshot, MuteState};

/// Most recent game server snapshot. No history is kept.
#[derive(Debug, Default)]
pub struct SnapshotState {
    current: Option<GameSnapshot>,
    updated_at: Option<DateTime<Utc>>,
}

impl SnapshotState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, snapshot: GameSnapshot) {
        self.current = Some(snapshot);
        self.updated_at = Some(Utc::now());
    }

    pub fn current(&self) -> Option<&GameSnapshot> {
        self.current.as_ref()
    }

    pub fn is_present(&self) -> bool {
        self.current.is_some()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Per-player mute view of a snapshot, in snapshot order.
pub fn mute_states(snapshot: &GameSnapshot) -> Vec<MuteState> {
    snapshot.players.iter().map(MuteState::from).collect()
}
