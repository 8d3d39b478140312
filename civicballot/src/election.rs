use crate::*;
use indexmap::IndexMap;
use num_enum::TryFromPrimitive;

pub type ElectionId = u64;

/// Election lifecycle state. `Closed` is terminal. The `u8` values are the
/// status codes exposed to external consumers (0 = Active, 1 = Closed).
#[derive(Serialize, Deserialize, TryFromPrimitive, Copy, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ElectionStatus {
    Active = 0,
    Closed = 1,
}

impl std::fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ElectionStatus::Active => "Active",
            ElectionStatus::Closed => "Closed",
        };
        write!(f, "{}", name)
    }
}

/// The (election, identity) relation. Recorded at most once, immutable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VoteRecord {
    pub option_index: usize,
    pub cast_at: Timestamp,
}

/// A time-bounded choice among two or more named options.
///
/// Owned by the ledger for its whole lifetime: created by `create_election`,
/// mutated only by `vote` and `close_election`, never deleted.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Election {
    pub id: ElectionId,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub creator: Identity,
    pub created_at: Timestamp,
    pub closes_at: Timestamp,
    pub status: ElectionStatus,
    pub privacy_enabled: bool,
    pub tally: Tally,
    pub votes: IndexMap<Identity, VoteRecord>,
}

impl Election {
    /// Whether a vote may be recorded right now. An election past `closes_at`
    /// is closed for voting even before an explicit `close_election`.
    pub fn voting_open(&self, now: Timestamp) -> bool {
        self.status == ElectionStatus::Active && now < self.closes_at
    }

    pub fn total_votes(&self) -> u64 {
        self.votes.len() as u64
    }

    pub fn info(&self) -> ElectionInfo {
        ElectionInfo {
            title: self.title.clone(),
            description: self.description.clone(),
            creator: self.creator.clone(),
            start_time: self.created_at,
            end_time: self.closes_at,
            status: self.status as u8,
            total_votes: self.total_votes(),
            option_count: self.options.len(),
        }
    }

    pub fn results(&self) -> ElectionResults {
        ElectionResults {
            title: self.title.clone(),
            description: self.description.clone(),
            option_names: self.options.clone(),
            vote_counts: self.tally.counts().to_vec(),
            total_votes: self.total_votes(),
            status: self.status as u8,
            privacy_enabled: self.privacy_enabled,
        }
    }
}

/// `getElectionInfo` view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElectionInfo {
    pub title: String,
    pub description: String,
    pub creator: Identity,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub status: u8,
    pub total_votes: u64,
    pub option_count: usize,
}

/// `getResults` view. `vote_counts` is ordered by option index, zero-filled.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElectionResults {
    pub title: String,
    pub description: String,
    pub option_names: Vec<String>,
    pub vote_counts: Vec<u64>,
    pub total_votes: u64,
    pub status: u8,
    pub privacy_enabled: bool,
}
