use crate::*;

/// Emitted exactly once per successful state transition, in order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Event {
    ElectionCreated {
        election_id: ElectionId,
        title: String,
        creator: Identity,
        opens_at: Timestamp,
        closes_at: Timestamp,
    },
    VoteCast {
        election_id: ElectionId,
        voter: Identity,
        option_index: usize,
        timestamp: Timestamp,
    },
    ElectionClosed {
        election_id: ElectionId,
        total_votes: u64,
        timestamp: Timestamp,
    },
    IdentityRegistered {
        identity: Identity,
        handle: String,
        timestamp: Timestamp,
    },
}

/// Ordered event buffer, drained by external observers.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
