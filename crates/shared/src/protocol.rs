use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::notification::NotificationPayload;

/// Version stamped on every message posted to the worker.
pub const PROTOCOL_VERSION: u16 = 1;
pub const SHOW_NOTIFICATION: &str = "SHOW_NOTIFICATION";

/// `GET /pokemon?limit=N` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse {
    pub results: Vec<ListingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    pub url: String,
}

/// Envelope carried by the page → worker channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedMessage {
    pub version: u16,
    pub data: Value,
}

impl PostedMessage {
    pub fn new(message: &WorkerMessage) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            data: message.to_value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    ShowNotification(NotificationPayload),
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message has no string 'type' field")]
    MissingType,
    #[error("unknown message type '{0}'")]
    UnknownType(String),
    #[error("invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: &'static str,
        source: serde_json::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

impl WorkerMessage {
    pub fn to_value(&self) -> Value {
        let raw = match self {
            WorkerMessage::ShowNotification(payload) => RawMessage {
                kind: SHOW_NOTIFICATION.to_string(),
                payload: serde_json::to_value(payload).ok(),
            },
        };
        serde_json::to_value(raw).unwrap_or(Value::Null)
    }

    /// A missing or `null` payload decodes as an empty one.
    pub fn decode(data: &Value) -> Result<Self, MessageError> {
        let raw: RawMessage =
            serde_json::from_value(data.clone()).map_err(|_| MessageError::MissingType)?;
        match raw.kind.as_str() {
            SHOW_NOTIFICATION => {
                let payload = match raw.payload {
                    None | Some(Value::Null) => NotificationPayload::default(),
                    Some(value) => serde_json::from_value(value).map_err(|source| {
                        MessageError::InvalidPayload {
                            kind: SHOW_NOTIFICATION,
                            source,
                        }
                    })?,
                };
                Ok(WorkerMessage::ShowNotification(payload))
            }
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }
}
