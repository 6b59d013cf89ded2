use chrono::{ DateTime, Local, NaiveDateTime, TimeZone, Utc };
use log::warn;
use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;

use super::chat::{ Message, Role };

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatContext {
    pub page: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub context: ChatContext,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeReviewRequest {
    pub code: String,
    pub language: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub project_info: JsonValue,
}

/// Body shared by the chat, code-review and suggestion endpoints.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TextReply {
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryTimestamp {
    /// Milliseconds since the Unix epoch.
    Millis(f64),
    Text(String),
    Other(JsonValue),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<HistoryTimestamp>,
}

/// Offset-less ISO form the backend emits (`datetime.isoformat()`).
const NAIVE_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl HistoryTimestamp {
    /// Numbers are epoch milliseconds. Strings are RFC 3339, or an ISO
    /// date-time without offset read as local time.
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            HistoryTimestamp::Millis(ms) if ms.is_finite() =>
                Utc.timestamp_millis_opt(ms.trunc() as i64).single(),
            HistoryTimestamp::Millis(_) => None,
            HistoryTimestamp::Text(raw) => parse_text_timestamp(raw.trim()),
            HistoryTimestamp::Other(_) => None,
        }
    }
}

fn parse_text_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, NAIVE_ISO_FORMAT).ok()?;
    Local.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

impl HistoryEntry {
    pub fn into_message(self) -> Message {
        let role = if self.role == "user" { Role::User } else { Role::Assistant };
        let timestamp = match self.timestamp.as_ref().and_then(HistoryTimestamp::parse) {
            Some(ts) => ts,
            None => {
                warn!("History entry has no usable timestamp ({:?}), using now", self.timestamp);
                Utc::now()
            }
        };
        Message {
            role,
            content: self.content,
            timestamp,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub chat: bool,
    #[serde(default)]
    pub code_review: bool,
    #[serde(default)]
    pub suggestions: bool,
    #[serde(default)]
    pub real_time: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(default)]
    pub sister_name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub features: FeatureFlags,
}
