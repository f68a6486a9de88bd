//! Client-to-server messages on the push channel.
//!
//! The protocol is deliberately small: after connecting, a client announces
//! its identity with a single `authenticate` message. There is no
//! acknowledgment; malformed or empty messages are logged and ignored, and
//! the connection stays open unauthenticated.

use serde::Deserialize;

use super::registry::ConnectionRegistry;
use super::{ConnectionId, ConnectionSender};

/// Messages a client may send over the WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// `{"type": "authenticate", "user_id": "..."}`
    Authenticate {
        #[serde(default)]
        user_id: String,
    },
}

/// Handle one incoming text frame. Returns the user id the connection was
/// registered under, when the frame was a valid authenticate message.
pub fn handle_text_message(
    text: &str,
    registry: &ConnectionRegistry,
    connection_id: ConnectionId,
    tx: &ConnectionSender,
) -> Option<String> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                error = %e,
                "Ignoring malformed client message"
            );
            return None;
        }
    };

    match message {
        ClientMessage::Authenticate { user_id } => {
            if user_id.is_empty() {
                tracing::debug!(
                    connection_id = %connection_id,
                    "Ignoring authenticate with empty user id"
                );
                return None;
            }

            registry.register(&user_id, connection_id, tx.clone());
            tracing::info!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Connection authenticated"
            );
            Some(user_id)
        }
    }
}
