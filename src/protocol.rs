#![forbid(unsafe_code)]

// Wire protocol - frames pushed by the test runner and the start-test payload

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Response prefix marking a session that failed. Checked first.
pub const ERROR_SENTINEL: &str = "ERROR:";
/// Response prefix marking a session that finished successfully.
pub const SUCCESS_SENTINEL: &str = "\u{2705}";
/// Response prefix marking a session that is still streaming.
pub const PROGRESS_SENTINEL: &str = "\u{1F504}";

/// Life-cycle status of one test session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Loading,
    Success,
    Error,
}

impl Status {
    /// Derive the status encoded in a progress response.
    ///
    /// The backend owns this contract: `ERROR:` wins over everything, then the
    /// check mark, then the refresh glyph. Text without a known prefix is
    /// still in progress.
    pub fn classify(response: &str) -> Self {
        if response.starts_with(ERROR_SENTINEL) {
            Status::Error
        } else if response.starts_with(SUCCESS_SENTINEL) {
            Status::Success
        } else {
            // PROGRESS_SENTINEL and unmarked text both mean "still running"
            Status::Loading
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Error)
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Loading => "loading",
            Status::Success => "success",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque identifier the backend assigns to a channel.
///
/// Older backends send an integer, newer ones a string. The value is echoed
/// back in the start-test payload with its original JSON type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelIdentity {
    Number(u64),
    Text(String),
}

impl fmt::Display for ChannelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelIdentity::Number(n) => write!(f, "{n}"),
            ChannelIdentity::Text(s) => f.write_str(s),
        }
    }
}

/// Server-to-client frames, recognized by which fields are present.
///
/// Variant order matters for untagged decoding: a frame carrying both an
/// identity and a progress payload is treated as an identity frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    /// Sent once when the channel is established
    Identity {
        #[serde(rename = "channelId", alias = "ws_id")]
        channel_id: ChannelIdentity,
    },
    /// Latest snapshot of one session's response
    Progress { session: u32, response: String },
}

/// Request body forwarded to the target endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    /// Body text that parsed as JSON
    Json(serde_json::Value),
    /// Empty body, forwarded verbatim
    Raw(String),
}

/// Payload for `POST /api/start-test`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTestRequest {
    pub concurrency: u32,
    pub endpoint: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: RequestBody,
    pub channel_id: ChannelIdentity,
    /// Same identity under the key older runners read
    #[serde(rename = "ws_id")]
    pub ws_id: ChannelIdentity,
    /// Completion markers the runner looks for in the target's stream
    #[serde(rename = "end_flags", skip_serializing_if = "Vec::is_empty")]
    pub end_flags: Vec<String>,
}
