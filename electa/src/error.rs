use crate::*;

use thiserror::Error;
use uuid::Uuid;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("electa: invalid group parameters: {0}")]
    InvalidParameters(String),

    #[error("electa: invalid proof: {0}")]
    InvalidProof(String),

    #[error("electa: malformed ballot: {0}")]
    MalformedBallot(String),

    #[error("electa: election is not ready to freeze: {}", join_issues(.0))]
    NotReadyToFreeze(Vec<FreezeIssue>),

    #[error("electa: trustee {0} already has a key")]
    DuplicateKeyGeneration(Uuid),

    #[error("electa: decryption incomplete, still waiting on trustees [{}]", join_uuids(.missing))]
    IncompleteDecryption { missing: Vec<Uuid> },

    #[error("electa: result already released")]
    AlreadyReleased,

    #[error(
        "electa: decryption of question {question} answer {answer} is not in [0, {max}]"
    )]
    DecryptionMismatch {
        question: usize,
        answer: usize,
        max: u64,
    },

    #[error("electa: cannot {operation} an election in state {state}")]
    InvalidTransition {
        operation: &'static str,
        state: ElectionState,
    },

    #[error("electa: ballot structure is frozen and can no longer be edited")]
    ElectionFrozen,

    #[error("electa: election is not accepting ballots in state {0}")]
    NotAcceptingBallots(ElectionState),

    #[error("electa: voter {0} is not eligible to vote in this election")]
    VoterNotEligible(String),

    #[error("electa: trustee {0} does not exist in election")]
    TrusteeDoesNotExist(Uuid),

    #[error("electa: trustee {0} has not generated a key")]
    MissingTrusteeKey(Uuid),

    #[error("electa: trustee {0} already submitted a partial decryption")]
    DecryptionAlreadySubmitted(Uuid),

    #[error("electa: result has not been released")]
    ResultNotReleased,

    #[error("electa: {0}")]
    RecordNotFound(#[from] RecordNotFound),

    #[error("electa: record identifier has bad hex")]
    IdentifierBadHex,

    #[error("electa: record identifier has bad length")]
    IdentifierBadLen,

    #[error("electa: record identifier has unknown kind {0}")]
    IdentifierBadKind(u8),

    #[error("electa: CBOR error: {0}")]
    CBOR(#[from] serde_cbor::Error),

    #[error("electa: JSON error: {0}")]
    JSON(#[from] serde_json::Error),

    #[error("electa: unknown datatype {0}")]
    UnknownDatatype(String),

    #[error("electa: error deserializing: unknown format")]
    DeserializationUnknownFormat,

    #[error("electa: background job was dropped before completing")]
    JobCancelled,

    #[error("electa: configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Cryptographic or format failures detected at the point of entry.
    ///
    /// Nothing is persisted for these; the caller should report them back to whoever
    /// submitted the payload.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidProof(_)
                | Error::MalformedBallot(_)
                | Error::UnknownDatatype(_)
                | Error::DeserializationUnknownFormat
                | Error::JSON(_)
                | Error::CBOR(_)
        )
    }

    /// Failures that retrying cannot fix: a missing trustee share or a broken protocol
    /// invariant needs an administrator.
    pub fn requires_intervention(&self) -> bool {
        matches!(
            self,
            Error::IncompleteDecryption { .. } | Error::DecryptionMismatch { .. }
        )
    }
}

fn join_issues(issues: &[FreezeIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_uuids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
