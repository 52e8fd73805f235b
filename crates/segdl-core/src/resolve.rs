//! Stream-URL resolution: map an external media id to a direct URL.
//!
//! Uses the curl crate (libcurl) to call the public player endpoint and pick
//! a direct streaming URL out of the JSON response. Runs in the current
//! thread; workers call it from the blocking pool.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Resolves an external media id to a direct streaming URL, or fails. The
/// failure aborts the requesting job only, never the run.
pub trait StreamResolver: Send + Sync {
    fn resolve(&self, external_id: &str) -> Result<String>;
}

const PLAYER_ENDPOINT: &str = "https://www.youtube.com/youtubei/v1/player";

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(rename = "streamingData")]
    streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
struct StreamingData {
    #[serde(default)]
    formats: Vec<StreamFormat>,
}

#[derive(Debug, Deserialize)]
struct StreamFormat {
    url: Option<String>,
}

/// Production resolver backed by the player endpoint.
pub struct PlayerApiResolver {
    endpoint: String,
}

impl PlayerApiResolver {
    pub fn new() -> Self {
        Self {
            endpoint: PLAYER_ENDPOINT.to_string(),
        }
    }

    /// Point the resolver at a different endpoint (tests).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for PlayerApiResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamResolver for PlayerApiResolver {
    fn resolve(&self, external_id: &str) -> Result<String> {
        let body = serde_json::json!({
            "videoId": external_id,
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "19.09.37",
                    "androidSdkVersion": 30,
                }
            }
        })
        .to_string();

        let mut response = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(&self.endpoint).context("invalid player endpoint URL")?;
        easy.post(true)?;
        easy.post_fields_copy(body.as_bytes())?;
        easy.follow_location(true)?;
        easy.connect_timeout(Duration::from_secs(15))?;
        easy.timeout(Duration::from_secs(30))?;

        let mut list = curl::easy::List::new();
        list.append("Content-Type: application/json")?;
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform().context("player request failed")?;
        }

        let code = easy.response_code().context("no response code")?;
        if !(200..300).contains(&code) {
            anyhow::bail!("player endpoint returned HTTP {} for {}", code, external_id);
        }

        extract_stream_url(&response, external_id)
    }
}

/// Pick the last listed progressive format with a direct URL, the highest
/// quality muxed stream the endpoint offers.
fn extract_stream_url(body: &[u8], external_id: &str) -> Result<String> {
    let parsed: PlayerResponse =
        serde_json::from_slice(body).context("player response was not valid JSON")?;
    let formats = parsed
        .streaming_data
        .map(|data| data.formats)
        .unwrap_or_default();
    formats
        .into_iter()
        .rev()
        .find_map(|format| format.url)
        .ok_or_else(|| {
            anyhow::anyhow!("no playable format with a direct URL for {}", external_id)
        })
}
