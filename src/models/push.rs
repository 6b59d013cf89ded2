use serde::{ Serialize, Deserialize };

/// Payload of the `sister_response` push event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SisterResponsePayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    Disconnected,
    SisterResponse {
        message: String,
    },
}
