//! Advisory gamertag existence check against a public profile site.
//!
//! Has no effect on sessions; the overlay uses it to warn about typos before
//! joining.

use std::time::Duration;

use log::info;
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::LookupError;

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub gamertag: String,
    pub exists: bool,
}

pub struct GamertagLookup {
    client: reqwest::Client,
    base_url: String,
}

impl GamertagLookup {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("voice-overlay-signaling/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn profile_url(&self, gamertag: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(gamertag))
    }

    /// 2xx means the profile exists, 404 means it does not; anything else
    /// is reported as a lookup failure.
    pub async fn verify(&self, gamertag: &str) -> Result<VerifyResult, LookupError> {
        let url = self.profile_url(gamertag);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        info!("Gamertag lookup for {} returned {}", gamertag, status);

        let exists = match status {
            s if s.is_success() => true,
            StatusCode::NOT_FOUND => false,
            s => return Err(LookupError::UnexpectedStatus(s.as_u16())),
        };
        Ok(VerifyResult {
            gamertag: gamertag.to_string(),
            exists,
        })
    }
}
