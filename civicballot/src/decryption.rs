use crate::*;

/// Turns an opaque aggregate back into plaintext per-option counts for
/// disclosure. Stateless; safe under unbounded concurrency.
pub trait TallyDecryptor {
    /// `DecryptionFailed` if any ballot is malformed, sealed under an
    /// incompatible configuration, or inconsistent with the aggregate.
    fn decrypt(&self, aggregate: &TallyAggregate, option_count: usize) -> Result<Vec<u64>, Error>;
}

impl TallyDecryptor for SealedBallotScheme {
    fn decrypt(&self, aggregate: &TallyAggregate, option_count: usize) -> Result<Vec<u64>, Error> {
        let mut counts = vec![0u64; option_count];
        for ballot in &aggregate.ballots {
            if ballot.election_id != aggregate.election_id {
                return Err(PipelineError::DecryptionFailed.into());
            }
            let inner = self.open(ballot)?;
            let index = inner.option_index as usize;
            if index >= option_count {
                return Err(PipelineError::DecryptionFailed.into());
            }
            counts[index] += 1;
        }
        Ok(counts)
    }
}
