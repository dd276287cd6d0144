use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::ws::{FanOut, ServerFrame};

/// One frame in flight through the relay, tagged with enough routing
/// information for each socket task to enforce the fan-out mode itself.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Connection the frame originated from.
    pub origin: Uuid,
    /// Delivery scope requested by the event kind.
    pub scope: FanOut,
    /// Notification to deliver.
    pub frame: ServerFrame,
}

impl Envelope {
    /// Whether the subscriber identified by `connection_id` should receive
    /// this frame.
    pub fn is_for(&self, connection_id: Uuid) -> bool {
        match self.scope {
            FanOut::All => true,
            FanOut::Others => self.origin != connection_id,
        }
    }
}

/// Broadcast hub fanning relayed frames out to every connected socket task.
pub struct RelayHub {
    sender: broadcast::Sender<Envelope>,
}

impl RelayHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent envelopes.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Send an envelope to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, envelope: Envelope) {
        let _ = self.sender.send(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ws::QuestionKey;

    #[test]
    fn others_scope_excludes_only_the_origin() {
        let origin = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let envelope = Envelope {
            origin,
            scope: FanOut::Others,
            frame: ServerFrame::BuzzerCleared,
        };
        assert!(!envelope.is_for(origin));
        assert!(envelope.is_for(peer));
    }

    #[test]
    fn all_scope_reaches_the_origin_too() {
        let origin = Uuid::new_v4();
        let envelope = Envelope {
            origin,
            scope: FanOut::All,
            frame: ServerFrame::QuestionCompleted(QuestionKey {
                category_id: "c1".into(),
                question_id: "q1".into(),
            }),
        };
        assert!(envelope.is_for(origin));
    }
}
