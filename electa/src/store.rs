use crate::*;
use digest::Digest;
use num_enum::TryFromPrimitive;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::convert::TryInto;
use std::str::FromStr;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("record {0} not found")]
pub struct RecordNotFound(pub RecordId);

/// Kind of stored record
#[derive(Serialize, Deserialize, TryFromPrimitive, Copy, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RecordKind {
    Election = 1,

    /// Every ballot ever cast, keyed by voter and ballot hash
    CastVote = 2,

    /// The ballot that currently counts for a voter, keyed by voter
    VoterVote = 3,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            RecordKind::Election => "election",
            RecordKind::CastVote => "cast_vote",
            RecordKind::VoterVote => "voter_vote",
        };
        write!(f, "{}", name)
    }
}

/// Record identifier
///
/// Defines the election, the record kind, and a unique identifier within that kind.
/// Identifiers sort by election, then kind, so all records of one kind for an election are
/// contiguous.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub election_id: Uuid,
    pub kind: RecordKind,
    pub unique_id: Option<[u8; 16]>,
}

impl RecordId {
    pub fn new(election_id: Uuid, kind: RecordKind, unique_info: &[u8]) -> Self {
        let digest = sha2::Sha512::digest(unique_info);
        let mut unique_id = [0u8; 16];
        unique_id.copy_from_slice(&digest[0..16]);
        RecordId {
            election_id,
            kind,
            unique_id: Some(unique_id),
        }
    }

    pub fn election(election_id: Uuid) -> Self {
        RecordId {
            election_id,
            kind: RecordKind::Election,
            unique_id: None,
        }
    }

    /// A ballot in the audit history. Identical ballots cast by different voters are kept apart.
    pub fn cast_vote(election_id: Uuid, voter_uuid: Uuid, vote_hash: &str) -> Self {
        let mut unique_info = voter_uuid.as_bytes().to_vec();
        unique_info.extend_from_slice(vote_hash.as_bytes());
        RecordId::new(election_id, RecordKind::CastVote, &unique_info)
    }

    /// The voter's current ballot
    pub fn voter_vote(election_id: Uuid, voter_uuid: Uuid) -> Self {
        RecordId::new(election_id, RecordKind::VoterVote, voter_uuid.as_bytes())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(33);
        bytes.extend_from_slice(self.election_id.as_bytes());
        bytes.push(self.kind as u8);
        if let Some(unique_id) = self.unique_id {
            bytes.extend_from_slice(&unique_id);
        }
        bytes
    }

    /// The key prefix shared by every record of `kind` in an election
    fn prefix(election_id: Uuid, kind: u8) -> String {
        let mut bytes = election_id.as_bytes().to_vec();
        bytes.push(kind);
        hex::encode(bytes)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::IdentifierBadHex)?;

        if bytes.len() != 33 && bytes.len() != 17 {
            return Err(Error::IdentifierBadLen);
        }

        let election_id =
            Uuid::from_slice(&bytes[0..16]).map_err(|_| Error::IdentifierBadLen)?;
        let kind =
            RecordKind::try_from_primitive(bytes[16]).map_err(|_| Error::IdentifierBadKind(bytes[16]))?;

        let unique_id = if bytes.len() == 33 {
            let unique_id: [u8; 16] = bytes[17..]
                .try_into()
                .map_err(|_| Error::IdentifierBadLen)?;
            Some(unique_id)
        } else {
            None
        };

        Ok(RecordId {
            election_id,
            kind,
            unique_id,
        })
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Persistence adapter. Implementations own the storage engine; the core only loads and saves
/// tagged records by identifier.
pub trait Store: Send + Sync {
    /// Get a record of an unknown type
    fn get(&self, id: RecordId) -> Option<Datatype>;

    /// Insert or replace a record
    fn set(&self, id: RecordId, record: Datatype) -> Result<(), Error>;

    /// Every record of one kind for an election, in identifier order
    fn get_multiple(&self, election_id: Uuid, kind: RecordKind) -> Vec<Datatype>;

    /// Get an election
    fn get_election(&self, election_id: Uuid) -> Result<Election, RecordNotFound> {
        let id = RecordId::election(election_id);
        match self.get(id) {
            Some(Datatype::Election(e)) => Ok(e),
            _ => Err(RecordNotFound(id)),
        }
    }

    /// Get a voter's cast vote from the audit history
    fn get_cast_vote(
        &self,
        election_id: Uuid,
        voter_uuid: Uuid,
        vote_hash: &str,
    ) -> Result<CastVote, RecordNotFound> {
        let id = RecordId::cast_vote(election_id, voter_uuid, vote_hash);
        match self.get(id) {
            Some(Datatype::CastVote(v)) => Ok(v),
            _ => Err(RecordNotFound(id)),
        }
    }

    /// The ballot that currently counts for each voter
    fn current_votes(&self, election_id: Uuid) -> Vec<CastVote> {
        cast_votes(self.get_multiple(election_id, RecordKind::VoterVote))
    }

    /// Every ballot ever cast, including ones since replaced
    fn vote_history(&self, election_id: Uuid) -> Vec<CastVote> {
        cast_votes(self.get_multiple(election_id, RecordKind::CastVote))
    }
}

fn cast_votes(records: Vec<Datatype>) -> Vec<CastVote> {
    records
        .into_iter()
        .filter_map(|r| match r {
            Datatype::CastVote(v) => Some(v),
            _ => None,
        })
        .collect()
}

/// A simple store that uses an in-memory BTreeMap
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<BTreeMap<String, Datatype>>,
}

impl Store for MemStore {
    fn get(&self, id: RecordId) -> Option<Datatype> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.get(&id.to_string()).cloned()
    }

    fn set(&self, id: RecordId, record: Datatype) -> Result<(), Error> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.insert(id.to_string(), record);
        Ok(())
    }

    fn get_multiple(&self, election_id: Uuid, kind: RecordKind) -> Vec<Datatype> {
        let start = RecordId::prefix(election_id, kind as u8);
        let end = RecordId::prefix(election_id, kind as u8 + 1);

        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.range(start..end).map(|(_, v)| v.clone()).collect()
    }
}

impl From<Vec<(RecordId, Datatype)>> for MemStore {
    fn from(items: Vec<(RecordId, Datatype)>) -> Self {
        let mut inner = BTreeMap::new();
        for (id, record) in items {
            inner.insert(id.to_string(), record);
        }
        MemStore {
            inner: RwLock::new(inner),
        }
    }
}
