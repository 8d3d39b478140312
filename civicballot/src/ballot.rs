use crate::*;
use aes_gcm::aead::{Aead, NewAead};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::Rng;
use sha2::{Digest, Sha256};

/// An encrypted representation of one vote's option choice. The payload says
/// nothing about the choice without the sealing key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OpaqueBallot {
    pub election_id: ElectionId,

    #[serde(with = "hex_serde")]
    pub payload: Vec<u8>,

    pub created_at: Timestamp,
}

impl OpaqueBallot {
    /// Pack into bytes
    pub fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("civicballot: Unexpected error packing ballot")
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

/// What a sealed payload actually carries. Structured and tagged, not a
/// delimiter-parsed string, so the scheme can be swapped without touching
/// the ledger or orchestrator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct BallotPlaintext {
    pub election_id: ElectionId,
    pub option_index: u32,
}

/// Symmetric sealing key shared by the gateway and the decryptor.
#[derive(Clone)]
pub struct BallotKey([u8; 32]);

impl BallotKey {
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        BallotKey(csprng.gen())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        BallotKey(bytes)
    }

    /// Short fingerprint for logs; never the key itself.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0);
        hex::encode(&digest[..4])
    }
}

/// The ballot encryption gateway: a pure transform from a selection to an
/// opaque ballot. Stateless, safe to call concurrently and repeatedly.
pub trait BallotCipher {
    /// `InvalidOption` on an out-of-range index; the ledger validates this
    /// too, the gateway just refuses to seal garbage.
    fn encrypt(
        &self,
        election_id: ElectionId,
        option_index: usize,
        option_count: usize,
        now: Timestamp,
    ) -> Result<OpaqueBallot, Error>;
}

/// AES-256-GCM stand-in for a homomorphic scheme. Same seams: a real scheme
/// replaces this struct behind `BallotCipher` + `TallyDecryptor` and nothing
/// else changes.
pub struct SealedBallotScheme {
    key: BallotKey,
}

impl SealedBallotScheme {
    pub fn new(key: BallotKey) -> Self {
        SealedBallotScheme { key }
    }

    pub fn key_fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    pub(crate) fn open(&self, ballot: &OpaqueBallot) -> Result<BallotPlaintext, PipelineError> {
        if ballot.payload.len() < 12 {
            return Err(PipelineError::DecryptionFailed);
        }
        let (nonce, sealed) = ballot.payload.split_at(12);
        let cipher = Aes256Gcm::new(Key::from_slice(&self.key.0));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| PipelineError::DecryptionFailed)?;
        let inner: BallotPlaintext =
            serde_cbor::from_slice(&plaintext).map_err(|_| PipelineError::DecryptionFailed)?;
        if inner.election_id != ballot.election_id {
            return Err(PipelineError::DecryptionFailed);
        }
        Ok(inner)
    }
}

impl BallotCipher for SealedBallotScheme {
    fn encrypt(
        &self,
        election_id: ElectionId,
        option_index: usize,
        option_count: usize,
        now: Timestamp,
    ) -> Result<OpaqueBallot, Error> {
        if option_index >= option_count {
            return Err(ValidationError::InvalidOption {
                index: option_index,
                count: option_count,
            }
            .into());
        }

        let plaintext = serde_cbor::to_vec(&BallotPlaintext {
            election_id,
            option_index: option_index as u32,
        })
        .map_err(PipelineError::CBORDeserialization)?;

        // Random nonce per ballot so two identical selections never collide.
        let mut csprng = rand::rngs::OsRng {};
        let nonce_bytes: [u8; 12] = csprng.gen();

        let cipher = Aes256Gcm::new(Key::from_slice(&self.key.0));
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
            .map_err(|_| PipelineError::EncryptionFailed)?;

        let mut payload = Vec::with_capacity(12 + sealed.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&sealed);

        Ok(OpaqueBallot {
            election_id,
            payload,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_and_open_roundtrip() {
        let scheme = SealedBallotScheme::new(BallotKey::generate());
        let ballot = scheme.encrypt(7, 1, 3, 500).unwrap();

        assert_eq!(ballot.election_id, 7);
        assert_eq!(ballot.created_at, 500);

        let inner = scheme.open(&ballot).unwrap();
        assert_eq!(inner.election_id, 7);
        assert_eq!(inner.option_index, 1);
    }

    #[test]
    fn identical_selections_produce_distinct_payloads() {
        let scheme = SealedBallotScheme::new(BallotKey::generate());
        let first = scheme.encrypt(1, 0, 2, 0).unwrap();
        let second = scheme.encrypt(1, 0, 2, 0).unwrap();
        assert_ne!(first.payload, second.payload);
    }

    #[test]
    fn out_of_range_option_rejected() {
        let scheme = SealedBallotScheme::new(BallotKey::generate());
        let err = scheme.encrypt(1, 3, 3, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidOption { index: 3, count: 3 })
        ));
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let scheme = SealedBallotScheme::new(BallotKey::generate());
        let other = SealedBallotScheme::new(BallotKey::generate());
        let ballot = scheme.encrypt(1, 0, 2, 0).unwrap();
        assert!(matches!(
            other.open(&ballot),
            Err(PipelineError::DecryptionFailed)
        ));
    }

    #[test]
    fn tampered_payload_fails_to_open() {
        let scheme = SealedBallotScheme::new(BallotKey::generate());
        let mut ballot = scheme.encrypt(1, 0, 2, 0).unwrap();
        let last = ballot.payload.len() - 1;
        ballot.payload[last] ^= 0xff;
        assert!(matches!(
            scheme.open(&ballot),
            Err(PipelineError::DecryptionFailed)
        ));

        // Truncated payloads are malformed, not a panic.
        ballot.payload.truncate(4);
        assert!(matches!(
            scheme.open(&ballot),
            Err(PipelineError::DecryptionFailed)
        ));
    }

    #[test]
    fn relabeled_election_id_fails_to_open() {
        let scheme = SealedBallotScheme::new(BallotKey::generate());
        let mut ballot = scheme.encrypt(1, 0, 2, 0).unwrap();
        ballot.election_id = 2;
        assert!(matches!(
            scheme.open(&ballot),
            Err(PipelineError::DecryptionFailed)
        ));
    }

    #[test]
    fn ballot_wire_roundtrip() {
        let scheme = SealedBallotScheme::new(BallotKey::generate());
        let ballot = scheme.encrypt(9, 1, 2, 42).unwrap();

        let cbor = ballot.as_bytes();
        assert_eq!(OpaqueBallot::from_bytes(&cbor).unwrap(), ballot);

        let json = serde_json::to_vec(&ballot).unwrap();
        assert_eq!(OpaqueBallot::from_bytes(&json).unwrap(), ballot);
    }

    #[test]
    fn key_fingerprint_is_stable_and_short() {
        let key = BallotKey::from_bytes([7; 32]);
        let fp = key.fingerprint();
        assert_eq!(fp.len(), 8);
        assert_eq!(fp, BallotKey::from_bytes([7; 32]).fingerprint());
    }
}
