use crate::*;
use indexmap::IndexMap;
use std::collections::HashSet;
use uuid::Uuid;

/// Parameters for `create_election`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewElection {
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub duration_hours: u64,
    /// Route tallying through the encrypt/aggregate/decrypt pipeline in
    /// addition to the plaintext counters.
    pub privacy_enabled: bool,
}

/// Proof of a recorded vote. `ballot_key` is the delivery-idempotency key
/// the aggregator uses to de-duplicate redelivered ballots.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VoteReceipt {
    pub election_id: ElectionId,
    pub voter: Identity,
    pub option_index: usize,
    pub cast_at: Timestamp,
    pub ballot_key: Uuid,
}

/// The system of record for elections and their counts.
///
/// Every transition goes through `&mut self`, so wrapping the ledger in a
/// `Mutex` (or backing it with a transactional store) serializes concurrent
/// votes: for one (election, identity) pair, exactly one call succeeds and
/// the rest observe `AlreadyVoted`.
pub struct ElectionLedger<S: ElectionStore, C: Clock> {
    store: S,
    clock: C,
    admin: Identity,
    events: EventLog,
}

impl<S: ElectionStore, C: Clock> ElectionLedger<S, C> {
    pub fn new(store: S, clock: C, admin: Identity) -> Self {
        ElectionLedger {
            store,
            clock,
            admin,
            events: EventLog::default(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Create a new election, returning its id directly (no event-log
    /// scanning on the caller's side).
    pub fn create_election(
        &mut self,
        creator: &Identity,
        new: NewElection,
    ) -> Result<ElectionId, Error> {
        if new.title.is_empty() {
            return Err(ValidationError::InvalidTitle.into());
        }
        if new.options.len() < 2 {
            return Err(ValidationError::InsufficientOptions(new.options.len()).into());
        }
        let mut seen = HashSet::new();
        for option in &new.options {
            if !seen.insert(option.as_str()) {
                return Err(ValidationError::DuplicateOption(option.clone()).into());
            }
        }
        if new.duration_hours == 0 {
            return Err(ValidationError::InvalidDuration.into());
        }

        let now = self.clock.now();
        let closes_at = now.saturating_add(new.duration_hours.saturating_mul(3600));
        let id = self.store.allocate_id();
        let option_count = new.options.len();

        let election = Election {
            id,
            title: new.title.clone(),
            description: new.description,
            options: new.options,
            creator: creator.clone(),
            created_at: now,
            closes_at,
            status: ElectionStatus::Active,
            privacy_enabled: new.privacy_enabled,
            tally: Tally::new(option_count),
            votes: IndexMap::new(),
        };
        self.store.insert(election);

        self.events.emit(Event::ElectionCreated {
            election_id: id,
            title: new.title.clone(),
            creator: creator.clone(),
            opens_at: now,
            closes_at,
        });
        log::info!("created election {} ({:?})", id, new.title);

        Ok(id)
    }

    /// Record one vote. Check order: unknown election, eligibility, voting
    /// window, option range, then the one-vote-per-identity rule.
    pub fn vote(
        &mut self,
        registry: &IdentityRegistry,
        election_id: ElectionId,
        identity: &Identity,
        option_index: usize,
    ) -> Result<VoteReceipt, Error> {
        let now = self.clock.now();
        let election = self
            .store
            .get_mut(election_id)
            .ok_or(StateError::NoSuchElection(election_id))?;

        if !registry.is_registered(identity) {
            return Err(StateError::NotEligible.into());
        }
        if !election.voting_open(now) {
            return Err(StateError::ElectionClosed(election_id).into());
        }
        if option_index >= election.options.len() {
            return Err(ValidationError::InvalidOption {
                index: option_index,
                count: election.options.len(),
            }
            .into());
        }
        if election.votes.contains_key(identity) {
            return Err(StateError::AlreadyVoted(election_id).into());
        }

        election.votes.insert(
            identity.clone(),
            VoteRecord {
                option_index,
                cast_at: now,
            },
        );
        election.tally.record(option_index);

        self.events.emit(Event::VoteCast {
            election_id,
            voter: identity.clone(),
            option_index,
            timestamp: now,
        });
        log::debug!(
            "vote recorded in election {} for option {}",
            election_id,
            option_index
        );

        Ok(VoteReceipt {
            election_id,
            voter: identity.clone(),
            option_index,
            cast_at: now,
            ballot_key: Uuid::new_v4(),
        })
    }

    /// Transition to `Closed`. Exactly one caller observes the transition;
    /// any retry after a confirmed close surfaces `AlreadyClosed`.
    pub fn close_election(
        &mut self,
        election_id: ElectionId,
        requester: &Identity,
    ) -> Result<u64, Error> {
        let now = self.clock.now();
        let admin = &self.admin;
        let election = self
            .store
            .get_mut(election_id)
            .ok_or(StateError::NoSuchElection(election_id))?;

        if *requester != election.creator && requester != admin {
            return Err(StateError::NotAuthorized(election_id).into());
        }
        if election.status == ElectionStatus::Closed {
            return Err(StateError::AlreadyClosed(election_id).into());
        }

        election.status = ElectionStatus::Closed;
        let total_votes = election.total_votes();
        self.store.retire(election_id);

        self.events.emit(Event::ElectionClosed {
            election_id,
            total_votes,
            timestamp: now,
        });
        log::info!("closed election {} with {} votes", election_id, total_votes);

        Ok(total_votes)
    }

    pub fn election_info(&self, election_id: ElectionId) -> Result<ElectionInfo, Error> {
        self.store
            .get(election_id)
            .map(|e| e.info())
            .ok_or_else(|| StateError::NoSuchElection(election_id).into())
    }

    pub fn results(&self, election_id: ElectionId) -> Result<ElectionResults, Error> {
        self.store
            .get(election_id)
            .map(|e| e.results())
            .ok_or_else(|| StateError::NoSuchElection(election_id).into())
    }

    pub fn has_voted(&self, election_id: ElectionId, identity: &Identity) -> Result<bool, Error> {
        self.store
            .get(election_id)
            .map(|e| e.votes.contains_key(identity))
            .ok_or_else(|| StateError::NoSuchElection(election_id).into())
    }

    /// The explicit active index. An expired-but-unclosed election stays
    /// listed (voting into it is still rejected by the time check) until an
    /// explicit `close_election` retires it.
    pub fn active_elections(&self) -> Vec<ElectionId> {
        self.store.active_ids()
    }

    pub fn total_elections(&self) -> u64 {
        self.store.total()
    }

    pub fn get(&self, election_id: ElectionId) -> Option<&Election> {
        self.store.get(election_id)
    }

    pub fn events(&self) -> &[Event] {
        self.events.as_slice()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }
}
