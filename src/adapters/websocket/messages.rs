//! Gateway wire protocol.
//!
//! - Gateway → Kiosk: `{"type": "<kind>", "message": <payload>}`
//! - Kiosk → Gateway: `{"type": "register_kiosk", "kiosk_id": "<id>"}`

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Type string of a pushed login (card scan at the reader).
pub const USER_LOGIN: &str = "user.login";

// ============================================
// Gateway → Kiosk
// ============================================

/// One decoded inbound frame. Dispatched, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque payload; `null` when the frame carries none.
    #[serde(rename = "message", default)]
    pub payload: JsonValue,
}

/// Why a frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(String),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no string `type` field")]
    MissingType,
}

impl InboundMessage {
    pub fn new(kind: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Parses one text frame.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let value: JsonValue =
            serde_json::from_str(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let mut object = match value {
            JsonValue::Object(map) => map,
            _ => return Err(DecodeError::NotAnObject),
        };
        let kind = match object.remove("type") {
            Some(JsonValue::String(kind)) if !kind.is_empty() => kind,
            _ => return Err(DecodeError::MissingType),
        };
        let payload = object.remove("message").unwrap_or(JsonValue::Null);
        Ok(Self { kind, payload })
    }

    /// The frame as the gateway would send it.
    pub fn to_frame(&self) -> String {
        serde_json::json!({ "type": self.kind, "message": self.payload }).to_string()
    }
}

// ============================================
// Kiosk → Gateway
// ============================================

/// Frames the kiosk sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Announces which kiosk this socket belongs to. Sent on every open.
    RegisterKiosk { kiosk_id: String },
}

impl OutboundMessage {
    pub fn register(kiosk_id: impl Into<String>) -> Self {
        OutboundMessage::RegisterKiosk {
            kiosk_id: kiosk_id.into(),
        }
    }
}
