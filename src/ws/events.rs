//! Domain event names and the JSON frame sent to clients.
//!
//! The event set is fixed: expense and category create/update/delete.
//! Payloads mirror the persisted record (`{ "id": ... }` for deletes);
//! the push layer never interprets their contents.

use axum::extract::ws::Message;
use serde::Serialize;
use serde_json::Value;

/// Server-to-client event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventName {
    #[serde(rename = "expense:created")]
    ExpenseCreated,
    #[serde(rename = "expense:updated")]
    ExpenseUpdated,
    #[serde(rename = "expense:deleted")]
    ExpenseDeleted,
    #[serde(rename = "category:created")]
    CategoryCreated,
    #[serde(rename = "category:updated")]
    CategoryUpdated,
    #[serde(rename = "category:deleted")]
    CategoryDeleted,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpenseCreated => "expense:created",
            Self::ExpenseUpdated => "expense:updated",
            Self::ExpenseDeleted => "expense:deleted",
            Self::CategoryCreated => "category:created",
            Self::CategoryUpdated => "category:updated",
            Self::CategoryDeleted => "category:deleted",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One domain event as delivered over the wire:
/// `{"event": "expense:created", "data": { ... }}`.
#[derive(Debug, Serialize)]
pub struct ServerEvent {
    pub event: EventName,
    pub data: Value,
}

impl ServerEvent {
    /// Serialize into a single text frame. Returns None if serialization
    /// fails, in which case the event is dropped.
    pub fn to_frame(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(e) => {
                tracing::warn!(event = %self.event, error = %e, "Failed to serialize event");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_names_match_the_wire_protocol() {
        assert_eq!(EventName::ExpenseCreated.as_str(), "expense:created");
        assert_eq!(EventName::ExpenseUpdated.as_str(), "expense:updated");
        assert_eq!(EventName::ExpenseDeleted.as_str(), "expense:deleted");
        assert_eq!(EventName::CategoryCreated.as_str(), "category:created");
        assert_eq!(EventName::CategoryUpdated.as_str(), "category:updated");
        assert_eq!(EventName::CategoryDeleted.as_str(), "category:deleted");
    }

    #[test]
    fn frame_carries_event_and_data() {
        let event = ServerEvent {
            event: EventName::CategoryDeleted,
            data: json!({ "id": "c1" }),
        };
        let frame = event.to_frame().expect("serializable");
        let Message::Text(text) = frame else {
            panic!("expected text frame");
        };
        let parsed: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(parsed["event"], "category:deleted");
        assert_eq!(parsed["data"]["id"], "c1");
    }
}
