use uuid::Uuid;

/// Published after every successful write so live availability views
/// re-tally from store state instead of serving anything cached.
#[derive(Debug, Clone)]
pub enum EventUpdate {
    VoteSubmitted { event_id: Uuid },
    VoteRevised { event_id: Uuid },
    EventClosed { event_id: Uuid },
    EventReopened { event_id: Uuid },
}

impl EventUpdate {
    pub fn event_id(&self) -> Uuid {
        match self {
            EventUpdate::VoteSubmitted { event_id }
            | EventUpdate::VoteRevised { event_id }
            | EventUpdate::EventClosed { event_id }
            | EventUpdate::EventReopened { event_id } => *event_id,
        }
    }
}

pub type UpdateSender = tokio::sync::broadcast::Sender<EventUpdate>;

pub fn create_update_broadcaster() -> UpdateSender {
    tokio::sync::broadcast::channel(100).0
}
