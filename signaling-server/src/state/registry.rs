use std::collections::HashMap;

use hyper_tungstenite::tungstenite::Message;
use log::warn;
use tokio::sync::mpsc;

use crate::error::JoinError;
use crate::protocol::{Gamertag, ServerMessage};

pub type ConnId = String;
pub type WebSocketSender = mpsc::UnboundedSender<Message>;

/// One joined connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub conn_id: ConnId,
    pub gamertag: Gamertag,
    sender: WebSocketSender,
}

impl Session {
    /// Best-effort delivery; a closed connection is skipped.
    pub fn deliver(&self, msg: Message) {
        if self.sender.is_closed() {
            return;
        }
        let _ = self.sender.send(msg);
    }

    pub fn deliver_text(&self, text: String) {
        self.deliver(Message::Text(text));
    }
}

/// Serialize an outbound message, logging instead of failing.
pub fn encode(msg: &ServerMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("Failed to serialize outbound message: {}", e);
            None
        }
    }
}

/// Send one message straight to a connection that may not have joined yet.
pub fn send_direct(sender: &WebSocketSender, msg: &ServerMessage) {
    if let Some(json) = encode(msg) {
        let _ = sender.send(Message::Text(json));
    }
}

/// Live sessions keyed by connection. At most one session per gamertag.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn join(
        &mut self,
        conn_id: ConnId,
        gamertag: Gamertag,
        sender: WebSocketSender,
    ) -> Result<(), JoinError> {
        if let Some(existing) = self.sessions.get(&conn_id) {
            return Err(JoinError::AlreadyJoined(existing.gamertag.clone()));
        }
        if self.lookup_by_identity(&gamertag).is_some() {
            return Err(JoinError::IdentityTaken(gamertag));
        }

        self.sessions.insert(
            conn_id.clone(),
            Session {
                conn_id,
                gamertag,
                sender,
            },
        );
        Ok(())
    }

    /// Remove the session for `conn_id`, returning the freed gamertag.
    pub fn leave(&mut self, conn_id: &str) -> Option<Gamertag> {
        self.sessions.remove(conn_id).map(|s| s.gamertag)
    }

    // Linear scan; participant counts are in the tens.
    pub fn lookup_by_identity(&self, gamertag: &str) -> Option<&Session> {
        self.sessions.values().find(|s| s.gamertag == gamertag)
    }

    pub fn identity_of(&self, conn_id: &str) -> Option<&str> {
        self.sessions.get(conn_id).map(|s| s.gamertag.as_str())
    }

    /// Current membership, sorted.
    pub fn list_identities(&self) -> Vec<Gamertag> {
        let mut out: Vec<Gamertag> = self.sessions.values().map(|s| s.gamertag.clone()).collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn send_to(&self, conn_id: &str, msg: &ServerMessage) {
        let Some(session) = self.sessions.get(conn_id) else {
            return;
        };
        if let Some(json) = encode(msg) {
            session.deliver_text(json);
        }
    }

    pub fn broadcast(&self, msg: &ServerMessage) {
        let Some(json) = encode(msg) else {
            return;
        };
        for session in self.sessions.values() {
            session.deliver_text(json.clone());
        }
    }

    pub fn broadcast_except(&self, except: &str, msg: &ServerMessage) {
        let Some(json) = encode(msg) else {
            return;
        };
        for session in self.sessions.values().filter(|s| s.conn_id != except) {
            session.deliver_text(json.clone());
        }
    }

    /// Send a close frame to every session and forget all of them.
    pub fn close_all(&mut self) -> Vec<Gamertag> {
        self.sessions
            .drain()
            .map(|(_, session)| {
                session.deliver(Message::Close(None));
                session.gamertag
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn channel() -> (WebSocketSender, UnboundedReceiver<Message>) {
        mpsc::unbounded_channel()
    }

    fn texts(rx: &mut UnboundedReceiver<Message>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let Message::Text(text) = msg {
                out.push(text);
            }
        }
        out
    }

    #[test]
    fn second_claim_of_a_gamertag_is_rejected() {
        let mut registry = SessionRegistry::new();
        let (a, _rx_a) = channel();
        let (c, _rx_c) = channel();

        registry.join("a".into(), "Alice".into(), a).unwrap();
        let err = registry.join("c".into(), "Alice".into(), c).unwrap_err();

        assert_eq!(err, JoinError::IdentityTaken("Alice".into()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup_by_identity("Alice").unwrap().conn_id, "a");
    }

    #[test]
    fn connection_cannot_join_twice() {
        let mut registry = SessionRegistry::new();
        let (a, _rx) = channel();
        registry.join("a".into(), "Alice".into(), a.clone()).unwrap();
        let err = registry.join("a".into(), "Alicia".into(), a).unwrap_err();
        assert_eq!(err, JoinError::AlreadyJoined("Alice".into()));
        assert_eq!(registry.list_identities(), vec!["Alice".to_string()]);
    }

    #[test]
    fn leave_frees_the_gamertag_and_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let (a, _rx) = channel();
        registry.join("a".into(), "Alice".into(), a).unwrap();

        assert_eq!(registry.leave("a"), Some("Alice".to_string()));
        assert_eq!(registry.leave("a"), None);
        assert!(registry.is_empty());

        let (b, _rx_b) = channel();
        registry.join("b".into(), "Alice".into(), b).unwrap();
        assert_eq!(registry.identity_of("b"), Some("Alice"));
    }

    #[test]
    fn list_identities_is_sorted() {
        let mut registry = SessionRegistry::new();
        for (conn, tag) in [("1", "Zed"), ("2", "Alice"), ("3", "Mo")] {
            let (tx, _rx) = channel();
            registry.join(conn.into(), tag.into(), tx).unwrap();
        }
        assert_eq!(registry.list_identities(), vec!["Alice", "Mo", "Zed"]);
    }

    #[test]
    fn broadcast_except_skips_sender_and_dead_receivers() {
        let mut registry = SessionRegistry::new();
        let (a, mut rx_a) = channel();
        let (b, mut rx_b) = channel();
        let (c, rx_c) = channel();
        registry.join("a".into(), "Alice".into(), a).unwrap();
        registry.join("b".into(), "Bob".into(), b).unwrap();
        registry.join("c".into(), "Cleo".into(), c).unwrap();
        drop(rx_c);

        registry.broadcast_except(
            "a",
            &ServerMessage::UserJoined {
                gamertag: "Alice".into(),
            },
        );

        assert!(texts(&mut rx_a).is_empty());
        assert_eq!(texts(&mut rx_b), vec![r#"{"type":"user-joined","gamertag":"Alice"}"#]);
    }

    #[test]
    fn close_all_sends_close_frames_and_empties_registry() {
        let mut registry = SessionRegistry::new();
        let (a, mut rx_a) = channel();
        registry.join("a".into(), "Alice".into(), a).unwrap();

        assert_eq!(registry.close_all(), vec!["Alice".to_string()]);
        assert!(registry.is_empty());
        assert!(matches!(rx_a.try_recv(), Ok(Message::Close(None))));
    }
}
