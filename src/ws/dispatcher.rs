//! Event dispatcher: delivers one domain event to every live connection
//! of a single user.
//!
//! Delivery is best-effort and at-most-once per connected target: no ack,
//! no retry, no queueing for offline users. A client that misses an event
//! reconciles on its next fetch or reconnect.

use std::sync::Arc;

use axum::extract::ws::Message;
use serde_json::Value;

use super::events::{EventName, ServerEvent};
use super::registry::ConnectionRegistry;

/// Group-addressable delivery: send one frame to every connection currently
/// subscribed to a user's channel.
///
/// The in-process `ConnectionRegistry` implements this directly; a
/// multi-process deployment would substitute an external pub/sub backplane
/// without touching dispatch call sites.
pub trait GroupTransport: Send + Sync {
    /// Deliver the frame to each member of the user's group.
    /// Returns the number of successful sends.
    fn deliver(&self, user_id: &str, message: Message) -> usize;
}

impl GroupTransport for ConnectionRegistry {
    fn deliver(&self, user_id: &str, message: Message) -> usize {
        // Snapshot first: no registry guard is held while sending.
        let senders = self.senders_for(user_id);
        let mut delivered = 0;
        for sender in &senders {
            // A failed send means the connection's writer task is gone and
            // its disconnect cleanup is in flight. Isolated from the rest.
            if sender.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::warn!(user_id = %user_id, "Dropped event for closed connection");
            }
        }
        delivered
    }
}

/// Fans domain events out to a user's connections via a `GroupTransport`.
/// Cheap to clone; handlers call `dispatch` after the DB write commits.
#[derive(Clone)]
pub struct EventDispatcher {
    transport: Arc<dyn GroupTransport>,
}

impl EventDispatcher {
    pub fn new(transport: Arc<dyn GroupTransport>) -> Self {
        Self { transport }
    }

    /// Deliver `event` with `data` to every connection registered for
    /// `user_id`. Dispatch to an offline user is a no-op, not an error.
    /// Returns the number of connections the event reached.
    pub fn dispatch(&self, user_id: &str, event: EventName, data: Value) -> usize {
        let frame = match (ServerEvent { event, data }).to_frame() {
            Some(frame) => frame,
            None => return 0,
        };

        let delivered = self.transport.deliver(user_id, frame);
        tracing::debug!(
            user_id = %user_id,
            event = %event,
            delivered = delivered,
            "Event dispatched"
        );
        delivered
    }
}
