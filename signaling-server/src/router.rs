use log::{debug, info, warn};

use crate::error::JoinError;
use crate::protocol::{ClientMessage, ServerMessage, SignalEnvelope};
use crate::state::registry::send_direct;
use crate::state::{ConnId, Hub, WebSocketSender};

/// What the connection loop should do after a message has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    /// Flush pending frames, then close the socket.
    Close,
}

/// Decode one text frame and apply it to the hub.
///
/// Never fails: malformed frames, missing addresses and unknown targets are
/// logged and dropped. The only frame that ends the connection is a join
/// with a gamertag someone else already holds.
pub fn handle_message(
    hub: &mut Hub,
    conn_id: &ConnId,
    sender: &WebSocketSender,
    raw: &str,
) -> Disposition {
    let msg = match serde_json::from_str::<ClientMessage>(raw) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to parse message from {}: {}", conn_id, e);
            return Disposition::Continue;
        }
    };

    let kind = msg.kind();
    match msg {
        ClientMessage::Join { data } => return handle_join(hub, conn_id, sender, &data.gamertag),
        ClientMessage::Leave => {
            handle_leave(hub, conn_id);
        }
        ClientMessage::VoiceDetection { data } => {
            hub.voice_mut().voice.set(data.gamertag.clone(), data.state());
        }
        ClientMessage::PttStatus { data } => {
            let state = data.state();
            hub.voice_mut().ptt.set(data.gamertag.clone(), state);
            hub.registry().broadcast(&ServerMessage::PttUpdate {
                gamertag: data.gamertag,
                is_talking: state.is_talking,
                is_muted: state.is_muted,
            });
        }
        ClientMessage::Offer(envelope)
        | ClientMessage::Answer(envelope)
        | ClientMessage::IceCandidate(envelope) => relay_signal(hub, kind, envelope, raw),
        ClientMessage::Heartbeat => {
            debug!("Heartbeat from {}", conn_id);
        }
        ClientMessage::RequestParticipants => {
            let participants = ServerMessage::Participants {
                participants: hub.registry().list_identities(),
            };
            send_direct(sender, &participants);
            hub.registry().broadcast(&participants);
        }
        ClientMessage::Unknown => {
            warn!("Unknown message type from {}: {}", conn_id, raw);
        }
    }

    Disposition::Continue
}

fn handle_join(
    hub: &mut Hub,
    conn_id: &ConnId,
    sender: &WebSocketSender,
    gamertag: &str,
) -> Disposition {
    if gamertag.trim().is_empty() {
        warn!("Ignoring join with empty gamertag from {}", conn_id);
        return Disposition::Continue;
    }

    match hub.join(conn_id, gamertag, sender.clone()) {
        Ok(()) => {}
        Err(JoinError::AlreadyJoined(current)) => {
            warn!(
                "Connection {} already joined as {}; ignoring join as {}",
                conn_id, current, gamertag
            );
            return Disposition::Continue;
        }
        Err(e @ JoinError::IdentityTaken(_)) => {
            warn!("Rejecting join from {}: {}", conn_id, e);
            send_direct(
                sender,
                &ServerMessage::Error {
                    message: e.to_string(),
                },
            );
            return Disposition::Close;
        }
    }

    info!("{} joined on connection {}", gamertag, conn_id);

    let registry = hub.registry();
    registry.broadcast_except(
        conn_id,
        &ServerMessage::UserJoined {
            gamertag: gamertag.to_string(),
        },
    );
    let participants = ServerMessage::Participants {
        participants: registry.list_identities(),
    };
    registry.send_to(conn_id, &participants);
    registry.broadcast(&participants);

    Disposition::Continue
}

/// Explicit leave: drop the session and tell the others. No list refresh.
pub fn handle_leave(hub: &mut Hub, conn_id: &str) -> Option<String> {
    let gamertag = hub.leave(conn_id)?;
    info!("{} left (connection {})", gamertag, conn_id);
    hub.registry().broadcast_except(
        conn_id,
        &ServerMessage::UserLeft {
            gamertag: gamertag.clone(),
        },
    );
    Some(gamertag)
}

/// Socket closed or errored: same as leave, then push the fresh list.
pub fn handle_disconnect(hub: &mut Hub, conn_id: &str) {
    if handle_leave(hub, conn_id).is_none() {
        return;
    }
    hub.registry().broadcast(&ServerMessage::Participants {
        participants: hub.registry().list_identities(),
    });
}

fn relay_signal(hub: &Hub, kind: &str, envelope: SignalEnvelope, raw: &str) {
    let (Some(to), Some(from)) = (envelope.to, envelope.from) else {
        warn!("Dropping {} without to/from", kind);
        return;
    };
    if to == from {
        warn!("Dropping {} addressed by {} to itself", kind, from);
        return;
    }

    match hub.registry().lookup_by_identity(&to) {
        Some(target) => {
            info!("Forwarding {} from {} to {}", kind, from, to);
            target.deliver_text(raw.to_string());
        }
        None => warn!("Target {} not found for {} from {}", to, kind, from),
    }
}
