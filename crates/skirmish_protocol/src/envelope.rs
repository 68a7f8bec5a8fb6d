//! The action envelope: `{ action, data, senderId }`.
//!
//! Decoding happens in two steps so that a tag from a newer peer surfaces as
//! [`ProtocolError::UnknownAction`] rather than a generic parse failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::Action;
use crate::error::ProtocolError;
use crate::room::PlayerId;

/// Envelope fields before the payload is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RawEnvelope {
    action: String,
    #[serde(default)]
    data: Value,
    #[serde(rename = "senderId", default, skip_serializing_if = "Option::is_none")]
    sender_id: Option<String>,
}

/// An action plus the identity of the peer that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEnvelope {
    /// The action.
    pub action: Action,
    /// Sender identity, stamped by the relay.
    pub sender_id: Option<String>,
}

impl ActionEnvelope {
    /// Wrap an outgoing action. The relay fills in the sender.
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            action,
            sender_id: None,
        }
    }

    /// Copy with the sender identity set.
    #[must_use]
    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    /// Encode as a JSON value.
    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        let tagged = serde_json::to_value(&self.action)?;
        let data = tagged.get("data").cloned().unwrap_or(Value::Null);
        Ok(serde_json::to_value(RawEnvelope {
            action: self.action.tag().to_string(),
            data,
            sender_id: self.sender_id.clone(),
        })?)
    }

    /// Encode as JSON text.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }

    /// Decode from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope = serde_json::from_value(value)?;
        if !Action::TAGS.contains(&raw.action.as_str()) {
            return Err(ProtocolError::UnknownAction(raw.action));
        }
        let tagged = serde_json::json!({ "action": raw.action, "data": raw.data });
        let action = serde_json::from_value(tagged).map_err(|e| ProtocolError::Malformed {
            action: raw.action.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            action,
            sender_id: raw.sender_id,
        })
    }

    /// Decode from JSON text.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Self::from_value(serde_json::from_str(text)?)
    }
}

/// Add the relay's `senderId` to an encoded envelope. Values that are not
/// JSON objects pass through untouched.
#[must_use]
pub fn stamp_sender(mut value: Value, sender: PlayerId) -> Value {
    if let Value::Object(fields) = &mut value {
        fields.insert("senderId".to_string(), Value::String(sender.to_string()));
    }
    value
}
