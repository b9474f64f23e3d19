use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Display name a participant claims for the lifetime of one session.
pub type Gamertag = String;

// ============================================
// Inbound WebSocket Messages
// ============================================

/// Every frame a client may send. Decoded once at the socket boundary;
/// anything with an unrecognised `type` lands in `Unknown`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Claim a gamertag for this connection
    Join { data: JoinRequest },
    /// Release the gamertag held by this connection
    Leave,
    /// Voice activity level reported by the client's VAD
    VoiceDetection { data: VoiceDetectionUpdate },
    /// Push-to-talk key state
    PttStatus { data: PttStatusUpdate },
    /// SDP offer addressed to another gamertag
    Offer(SignalEnvelope),
    /// SDP answer addressed to another gamertag
    Answer(SignalEnvelope),
    /// ICE candidate addressed to another gamertag
    IceCandidate(SignalEnvelope),
    Heartbeat,
    RequestParticipants,
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Wire name of the message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Leave => "leave",
            ClientMessage::VoiceDetection { .. } => "voice-detection",
            ClientMessage::PttStatus { .. } => "ptt-status",
            ClientMessage::Offer(_) => "offer",
            ClientMessage::Answer(_) => "answer",
            ClientMessage::IceCandidate(_) => "ice-candidate",
            ClientMessage::Heartbeat => "heartbeat",
            ClientMessage::RequestParticipants => "request-participants",
            ClientMessage::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRequest {
    pub gamertag: Gamertag,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PttStatusUpdate {
    pub gamertag: Gamertag,
    pub is_talking: bool,
    pub is_muted: bool,
}

impl PttStatusUpdate {
    pub fn state(&self) -> PttState {
        PttState {
            is_talking: self.is_talking,
            is_muted: self.is_muted,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDetectionUpdate {
    pub gamertag: Gamertag,
    pub is_talking: bool,
    pub volume: f64,
}

impl VoiceDetectionUpdate {
    pub fn state(&self) -> VoiceDetectionState {
        VoiceDetectionState {
            is_talking: self.is_talking,
            volume: self.volume,
        }
    }
}

/// Addressing header of a signaling message. The payload (sdp, candidate, ...)
/// is never decoded; the relay forwards the original frame text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalEnvelope {
    #[serde(default)]
    pub to: Option<Gamertag>,
    #[serde(default)]
    pub from: Option<Gamertag>,
}

// ============================================
// Outbound WebSocket Messages
// ============================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    UserJoined {
        gamertag: Gamertag,
    },
    UserLeft {
        gamertag: Gamertag,
    },
    Participants {
        participants: Vec<Gamertag>,
    },
    #[serde(rename_all = "camelCase")]
    PttUpdate {
        gamertag: Gamertag,
        is_talking: bool,
        is_muted: bool,
    },
    /// Snapshot from the game server merged with the current ephemeral state
    #[serde(rename_all = "camelCase")]
    GameState {
        data: GameSnapshot,
        mute_states: Vec<MuteState>,
        ptt_states: Vec<StateEntry<PttState>>,
        voice_states: Vec<StateEntry<VoiceDetectionState>>,
    },
    Error {
        message: String,
    },
    ServerShutdown {
        message: String,
    },
}

// ============================================
// Ephemeral per-player state
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PttState {
    pub is_talking: bool,
    pub is_muted: bool,
}

impl Default for PttState {
    fn default() -> Self {
        Self {
            is_talking: true,
            is_muted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDetectionState {
    pub is_talking: bool,
    pub volume: f64,
}

/// One row of a state-store dump: the gamertag plus the state's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry<S> {
    pub gamertag: Gamertag,
    #[serde(flatten)]
    pub state: S,
}

// ============================================
// Game server snapshot
// ============================================

/// Full state push from the game server. Only `players` is interpreted;
/// every other field is carried through to clients untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(default)]
    pub players: Vec<PlayerRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub name: String,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_deafened: bool,
    #[serde(default)]
    pub mic_volume: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteState {
    pub gamertag: Gamertag,
    pub is_muted: bool,
    pub is_deafened: bool,
    pub mic_volume: f64,
}

impl From<&PlayerRecord> for MuteState {
    fn from(player: &PlayerRecord) -> Self {
        Self {
            gamertag: player.name.clone(),
            is_muted: player.is_muted,
            is_deafened: player.is_deafened,
            mic_volume: player.mic_volume,
        }
    }
}
