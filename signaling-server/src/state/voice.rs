use std::collections::HashMap;

use crate::protocol::{Gamertag, PttState, StateEntry, VoiceDetectionState};

/// Latest reported state per gamertag. Writes overwrite wholesale.
#[derive(Debug)]
pub struct StateStore<S> {
    entries: HashMap<Gamertag, S>,
}

impl<S> Default for StateStore<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S: Clone> StateStore<S> {
    pub fn set(&mut self, gamertag: Gamertag, state: S) {
        self.entries.insert(gamertag, state);
    }

    #[cfg(test)]
    pub fn get(&self, gamertag: &str) -> Option<&S> {
        self.entries.get(gamertag)
    }

    /// Dump of every entry, sorted by gamertag.
    pub fn get_all(&self) -> Vec<StateEntry<S>> {
        let mut out: Vec<StateEntry<S>> = self
            .entries
            .iter()
            .map(|(gamertag, state)| StateEntry {
                gamertag: gamertag.clone(),
                state: state.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.gamertag.cmp(&b.gamertag));
        out
    }

    pub fn delete(&mut self, gamertag: &str) {
        self.entries.remove(gamertag);
    }

    #[cfg(test)]
    pub fn contains(&self, gamertag: &str) -> bool {
        self.entries.contains_key(gamertag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Push-to-talk and voice-activity side tables.
///
/// Keyed by gamertag, not by connection: updates are accepted for any
/// gamertag, joined or not. Entries for joined players are seeded on join
/// and dropped on leave.
#[derive(Debug, Default)]
pub struct VoiceState {
    pub ptt: StateStore<PttState>,
    pub voice: StateStore<VoiceDetectionState>,
}

impl VoiceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, gamertag: &str) {
        self.ptt.set(gamertag.to_string(), PttState::default());
        self.voice
            .set(gamertag.to_string(), VoiceDetectionState::default());
    }

    pub fn remove(&mut self, gamertag: &str) {
        self.ptt.delete(gamertag);
        self.voice.delete(gamertag);
    }

    pub fn clear(&mut self) {
        self.ptt.clear();
        self.voice.clear();
    }
}
