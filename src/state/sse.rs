use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Fan-out of roster feed events to every connected SSE client.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Hub whose slow subscribers lag after `capacity` unread events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Connected feed clients.
    pub fn subscribers(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Send an event to the current subscribers and return how many were reached. An
    /// event published while nobody listens is dropped.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}
