use crate::*;

/// Everything disclosed for one election after `publish_results`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PublishedResults {
    pub election_id: ElectionId,

    /// The ledger's own view; its `vote_counts` are authoritative.
    pub results: ElectionResults,

    /// Counts recovered through the decryption pipeline. `None` when privacy
    /// was disabled or the pipeline did not complete.
    pub decrypted_counts: Option<Vec<u64>>,
}

/// Request-level workflow glue: the only component that talks to more than
/// one of registry, ledger, gateway, aggregator, and decryptor.
///
/// Owns no state of its own — every fact is re-derived from the owning
/// component per call, so it can be rebuilt or restarted freely.
pub struct Orchestrator<S, C, P>
where
    S: ElectionStore,
    C: Clock,
    P: BallotCipher + TallyDecryptor,
{
    registry: IdentityRegistry,
    ledger: ElectionLedger<S, C>,
    aggregator: TallyAggregator,
    scheme: P,
}

impl<S, C, P> Orchestrator<S, C, P>
where
    S: ElectionStore,
    C: Clock,
    P: BallotCipher + TallyDecryptor,
{
    pub fn new(ledger: ElectionLedger<S, C>, scheme: P) -> Self {
        Orchestrator {
            registry: IdentityRegistry::new(),
            ledger,
            aggregator: TallyAggregator::new(),
            scheme,
        }
    }

    pub fn register_voter(&mut self, identity: Identity, handle: &str) -> Result<VoterHandle, Error> {
        let now = self.ledger.now();
        self.registry.register(identity, handle, now).map(Clone::clone)
    }

    pub fn create_election(
        &mut self,
        creator: &Identity,
        new: NewElection,
    ) -> Result<ElectionId, Error> {
        self.ledger.create_election(creator, new)
    }

    /// Cast-vote workflow: registry lookup, gateway encrypt, ledger vote,
    /// aggregator record. The ballot is sealed before the ledger commits and
    /// dropped if the vote fails; the aggregator is only written afterwards,
    /// keyed by the receipt's delivery-idempotency key.
    pub fn cast_vote(
        &mut self,
        identity: &Identity,
        election_id: ElectionId,
        option_index: usize,
    ) -> Result<VoteReceipt, Error> {
        if self.registry.lookup(identity).is_none() {
            return Err(StateError::NotEligible.into());
        }

        let (privacy_enabled, option_count) = {
            let election = self
                .ledger
                .get(election_id)
                .ok_or(StateError::NoSuchElection(election_id))?;
            (election.privacy_enabled, election.options.len())
        };

        let ballot = if privacy_enabled {
            Some(
                self.scheme
                    .encrypt(election_id, option_index, option_count, self.ledger.now())?,
            )
        } else {
            None
        };

        let receipt = self
            .ledger
            .vote(&self.registry, election_id, identity, option_index)?;

        if let Some(ballot) = ballot {
            self.aggregator.record(election_id, receipt.ballot_key, ballot);
        }

        Ok(receipt)
    }

    /// Publish-results workflow: close, snapshot, decrypt, cross-check,
    /// merge. For a privacy-enabled election the decrypted counts must match
    /// the ledger's plaintext tally; a mismatch aborts disclosure and keeps
    /// the ballots for audit. A decryption failure falls back to the
    /// plaintext tally, which stays authoritative.
    pub fn publish_results(
        &mut self,
        election_id: ElectionId,
        requester: &Identity,
    ) -> Result<PublishedResults, Error> {
        self.ledger.close_election(election_id, requester)?;
        let results = self.ledger.results(election_id)?;

        let decrypted_counts = if results.privacy_enabled {
            let aggregate = self.aggregator.snapshot(election_id);
            match self.scheme.decrypt(&aggregate, results.option_names.len()) {
                Ok(counts) => {
                    if counts != results.vote_counts {
                        return Err(PipelineError::TallyMismatch(election_id).into());
                    }
                    Some(counts)
                }
                Err(err) => {
                    log::warn!(
                        "decryption pipeline failed for election {}: {}; disclosing ledger tally only",
                        election_id,
                        err
                    );
                    None
                }
            }
        } else {
            None
        };

        self.aggregator.discard(election_id);

        Ok(PublishedResults {
            election_id,
            results,
            decrypted_counts,
        })
    }

    pub fn election_info(&self, election_id: ElectionId) -> Result<ElectionInfo, Error> {
        self.ledger.election_info(election_id)
    }

    pub fn results(&self, election_id: ElectionId) -> Result<ElectionResults, Error> {
        self.ledger.results(election_id)
    }

    pub fn has_voted(&self, election_id: ElectionId, identity: &Identity) -> Result<bool, Error> {
        self.ledger.has_voted(election_id, identity)
    }

    pub fn active_elections(&self) -> Vec<ElectionId> {
        self.ledger.active_elections()
    }

    pub fn total_elections(&self) -> u64 {
        self.ledger.total_elections()
    }

    pub fn voter_handle(&self, identity: &Identity) -> Option<&VoterHandle> {
        self.registry.lookup(identity)
    }

    /// Registry events first, then ledger events, each in emission order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = self.registry.take_events();
        events.extend(self.ledger.take_events());
        events
    }

    pub fn ledger(&self) -> &ElectionLedger<S, C> {
        &self.ledger
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &TallyAggregator {
        &self.aggregator
    }
}
