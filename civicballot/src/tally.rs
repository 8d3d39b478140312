use crate::*;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Per-option vote counts, ordered by option index and zero-filled.
/// `sum(counts)` always equals the number of recorded votes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Tally {
    counts: Vec<u64>,
}

impl Tally {
    pub fn new(option_count: usize) -> Self {
        Tally {
            counts: vec![0; option_count],
        }
    }

    /// Caller has validated the index against the election's options.
    pub fn record(&mut self, option_index: usize) {
        self.counts[option_index] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Opaque summary of every ballot recorded for one election. Nothing needed
/// for decryption is dropped, so it is recomputable from the full ballot
/// collection at any time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TallyAggregate {
    pub election_id: ElectionId,
    pub ballots: Vec<OpaqueBallot>,
}

impl TallyAggregate {
    pub fn ballot_count(&self) -> usize {
        self.ballots.len()
    }

    /// Pack into bytes
    pub fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("civicballot: Unexpected error packing aggregate")
    }

    /// Unpack from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // If it starts with `{` then it's JSON
        if bytes.first() == Some(&b'{') {
            Ok(serde_json::from_slice(bytes).map_err(PipelineError::JSONDeserialization)?)
        } else {
            Ok(serde_cbor::from_slice(bytes).map_err(PipelineError::CBORDeserialization)?)
        }
    }
}

/// Collects opaque ballots while an election is being counted.
///
/// `record` keys each ballot by the vote's delivery-idempotency key, so a
/// redelivered ballot (a retried call) never double counts while ballots
/// from distinct votes always do. Interior locking makes the aggregator
/// shareable by reference across in-flight votes.
#[derive(Default)]
pub struct TallyAggregator {
    ballots: Mutex<BTreeMap<ElectionId, IndexMap<Uuid, OpaqueBallot>>>,
}

impl TallyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a ballot. Returns false when the key was already recorded.
    pub fn record(&self, election_id: ElectionId, ballot_key: Uuid, ballot: OpaqueBallot) -> bool {
        let mut all = self
            .ballots
            .lock()
            .expect("civicballot: aggregator lock poisoned");
        let election = all.entry(election_id).or_insert_with(IndexMap::new);
        if election.contains_key(&ballot_key) {
            return false;
        }
        election.insert(ballot_key, ballot);
        true
    }

    /// Every ballot recorded so far, never a torn one.
    pub fn snapshot(&self, election_id: ElectionId) -> TallyAggregate {
        let all = self
            .ballots
            .lock()
            .expect("civicballot: aggregator lock poisoned");
        let ballots = all
            .get(&election_id)
            .map(|b| b.values().cloned().collect())
            .unwrap_or_default();
        TallyAggregate {
            election_id,
            ballots,
        }
    }

    pub fn ballot_count(&self, election_id: ElectionId) -> usize {
        let all = self
            .ballots
            .lock()
            .expect("civicballot: aggregator lock poisoned");
        all.get(&election_id).map(|b| b.len()).unwrap_or(0)
    }

    /// Drop an election's ballots once plaintext disclosure has happened.
    pub fn discard(&self, election_id: ElectionId) {
        let mut all = self
            .ballots
            .lock()
            .expect("civicballot: aggregator lock poisoned");
        all.remove(&election_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ballot(election_id: ElectionId) -> OpaqueBallot {
        OpaqueBallot {
            election_id,
            payload: vec![1, 2, 3],
            created_at: 0,
        }
    }

    #[test]
    fn tally_starts_zero_filled() {
        let mut tally = Tally::new(3);
        assert_eq!(tally.counts(), &[0, 0, 0]);
        assert_eq!(tally.total(), 0);

        tally.record(1);
        tally.record(1);
        tally.record(2);
        assert_eq!(tally.counts(), &[0, 2, 1]);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn redelivery_counts_once() {
        let aggregator = TallyAggregator::new();
        let key = Uuid::new_v4();

        assert!(aggregator.record(1, key, ballot(1)));
        assert!(!aggregator.record(1, key, ballot(1)));
        assert_eq!(aggregator.ballot_count(1), 1);

        // A distinct vote's ballot still counts.
        assert!(aggregator.record(1, Uuid::new_v4(), ballot(1)));
        assert_eq!(aggregator.ballot_count(1), 2);
    }

    #[test]
    fn snapshot_and_discard() {
        let aggregator = TallyAggregator::new();
        aggregator.record(1, Uuid::new_v4(), ballot(1));
        aggregator.record(1, Uuid::new_v4(), ballot(1));
        aggregator.record(2, Uuid::new_v4(), ballot(2));

        let snapshot = aggregator.snapshot(1);
        assert_eq!(snapshot.election_id, 1);
        assert_eq!(snapshot.ballot_count(), 2);

        aggregator.discard(1);
        assert_eq!(aggregator.ballot_count(1), 0);
        assert_eq!(aggregator.snapshot(1).ballot_count(), 0);
        // Other elections are untouched.
        assert_eq!(aggregator.ballot_count(2), 1);
    }

    #[test]
    fn unknown_election_snapshot_is_empty() {
        let aggregator = TallyAggregator::new();
        assert_eq!(aggregator.snapshot(99).ballot_count(), 0);
    }

    #[test]
    fn concurrent_records_all_land() {
        let aggregator = Arc::new(TallyAggregator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let aggregator = Arc::clone(&aggregator);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    aggregator.record(1, Uuid::new_v4(), ballot(1));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(aggregator.ballot_count(1), 400);
    }

    #[test]
    fn aggregate_wire_roundtrip() {
        let aggregate = TallyAggregate {
            election_id: 3,
            ballots: vec![ballot(3)],
        };
        let cbor = aggregate.as_bytes();
        assert_eq!(TallyAggregate::from_bytes(&cbor).unwrap(), aggregate);

        let json = serde_json::to_vec(&aggregate).unwrap();
        assert_eq!(TallyAggregate::from_bytes(&json).unwrap(), aggregate);

        assert!(TallyAggregate::from_bytes(b"not an aggregate").is_err());
    }
}
