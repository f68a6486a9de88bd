pub mod actor;
pub mod dispatcher;
pub mod events;
pub mod handler;
pub mod protocol;
pub mod registry;

use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Opaque identifier assigned by the transport to one live socket.
pub type ConnectionId = uuid::Uuid;
