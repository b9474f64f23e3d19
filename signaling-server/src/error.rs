use thiserror::Error;

use crate::protocol::Gamertag;

/// Rejection of a join attempt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Gamertag \"{0}\" is already in use")]
    IdentityTaken(Gamertag),
    #[error("This connection has already joined as \"{0}\"")]
    AlreadyJoined(Gamertag),
}

/// Failure of the outbound gamertag existence check.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("gamertag lookup request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gamertag lookup returned unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http server error: {0}")]
    Hyper(#[from] hyper::Error),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}
