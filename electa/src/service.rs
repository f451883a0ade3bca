use crate::*;
use rand::thread_rng;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Acknowledgement returned to a voter for an accepted ballot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CastReceipt {
    pub accepted: bool,

    /// Content address of the ballot, used to find it in the public history
    pub ballot_hash: String,

    pub voter_uuid: Uuid,

    /// Hash of the ballot this one replaced, if the voter had already cast
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
}

type LockPool<K, L> = Mutex<HashMap<K, Arc<L>>>;

/// A lock checked out of a pool. The pool entry is removed when the last handle is dropped.
struct PooledLock<'a, K: Eq + Hash, L> {
    pool: &'a LockPool<K, L>,
    key: K,
    inner: Arc<L>,
}

impl<'a, K: Eq + Hash, L: Default> PooledLock<'a, K, L> {
    fn checkout(pool: &'a LockPool<K, L>, key: K) -> Self
    where
        K: Clone,
    {
        let mut locks = pool.lock().unwrap_or_else(|e| e.into_inner());
        let inner = locks.entry(key.clone()).or_default().clone();
        PooledLock { pool, key, inner }
    }
}

impl<K: Eq + Hash, L> Deref for PooledLock<'_, K, L> {
    type Target = L;

    fn deref(&self) -> &L {
        &self.inner
    }
}

impl<K: Eq + Hash, L> Drop for PooledLock<'_, K, L> {
    fn drop(&mut self) {
        let mut locks = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        // Handles are only cloned under the pool mutex, so two references means pool and self
        if Arc::strong_count(&self.inner) == 2 {
            locks.remove(&self.key);
        }
    }
}

/// Runs elections on top of a `Store`.
///
/// Casting takes a shared per-election lock; lifecycle transitions take it exclusively, so no
/// ballot can land in an election after it starts tallying. Re-casting by the same voter is
/// serialized by a per-voter lock and the last ballot wins.
pub struct ElectionService<S: Store> {
    store: S,
    config: Config,
    election_locks: LockPool<Uuid, RwLock<()>>,
    voter_locks: LockPool<(Uuid, String), Mutex<()>>,
}

impl<S: Store> ElectionService<S> {
    /// Create a service. Bad group parameters are fatal.
    pub fn new(store: S, config: Config) -> Result<Self, Error> {
        config.params.validate()?;
        Ok(ElectionService {
            store,
            config,
            election_locks: Mutex::new(HashMap::new()),
            voter_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn election_lock(&self, election_id: Uuid) -> PooledLock<'_, Uuid, RwLock<()>> {
        PooledLock::checkout(&self.election_locks, election_id)
    }

    fn voter_lock(&self, election_id: Uuid, voter_id: &str) -> PooledLock<'_, (Uuid, String), Mutex<()>> {
        PooledLock::checkout(&self.voter_locks, (election_id, voter_id.to_string()))
    }

    fn load(&self, election_id: Uuid) -> Result<Election, Error> {
        Ok(self.store.get_election(election_id)?)
    }

    fn save(&self, election: &Election) -> Result<(), Error> {
        self.store.set(
            RecordId::election(election.uuid),
            Datatype::Election(election.clone()),
        )
    }

    /// Run `f` against the stored election while holding its exclusive lock, saving the
    /// result only if `f` succeeds
    fn with_election<T, F>(&self, election_id: Uuid, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Election) -> Result<T, Error>,
    {
        let lock = self.election_lock(election_id);
        let _guard = lock.write().unwrap_or_else(|e| e.into_inner());

        let mut election = self.load(election_id)?;
        let out = f(&mut election)?;
        self.save(&election)?;
        Ok(out)
    }

    /// Create a draft election using the configured group
    pub fn create_election(&self, short_name: &str, name: &str) -> Result<Election, Error> {
        let mut election = Election::new(self.config.params.clone(), short_name, name);
        election.set_use_voter_aliases(self.config.use_voter_aliases)?;
        if self.config.default_trustee {
            election.generate_default_trustee(&mut thread_rng())?;
        }
        self.save(&election)?;

        info!("created election {} ({})", election.uuid, election.short_name);
        Ok(election.without_secrets())
    }

    /// The public view of an election
    pub fn get_election(&self, election_id: Uuid) -> Result<Election, Error> {
        Ok(self.load(election_id)?.without_secrets())
    }

    /// Apply an administrative edit. Structural edits are only accepted in Draft.
    pub fn update_election<T, F>(&self, election_id: Uuid, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Election) -> Result<T, Error>,
    {
        self.with_election(election_id, f)
    }

    /// Accept a ballot from a voter.
    ///
    /// `payload` is a tagged `EncryptedVote` in JSON or CBOR; legacy encodings are upgraded.
    /// Every proof is checked before any lock is taken, and a rejected ballot leaves no trace.
    pub fn cast_ballot(
        &self,
        election_id: Uuid,
        voter_id: &str,
        payload: &[u8],
    ) -> Result<CastReceipt, Error> {
        let vote = match Datatype::from_bytes(payload)?.upgrade() {
            Datatype::EncryptedVote(vote) => vote,
            other => {
                return Err(Error::MalformedBallot(format!(
                    "expected an encrypted vote, found {}",
                    other.tag()
                )))
            }
        };
        self.cast_vote(election_id, voter_id, vote)
    }

    /// Accept an already decoded ballot
    pub fn cast_vote(
        &self,
        election_id: Uuid,
        voter_id: &str,
        vote: EncryptedVote,
    ) -> Result<CastReceipt, Error> {
        let snapshot = self.load(election_id)?;
        snapshot.ensure_accepting_ballots()?;
        if let Err(e) = vote.verify(&snapshot) {
            warn!("election {}: rejected ballot from {}: {}", election_id, voter_id, e);
            return Err(e);
        }

        // Registering a new voter edits the roster, which needs the exclusive lock
        if snapshot.voter_by_id(voter_id).is_none() {
            if !snapshot.openreg {
                return Err(Error::VoterNotEligible(voter_id.to_string()));
            }
            self.with_election(election_id, |election| {
                election.ensure_accepting_ballots()?;
                election.eligible_voter(voter_id).map(|_| ())
            })?;
        }

        let election_lock = self.election_lock(election_id);
        let _election_guard = election_lock.read().unwrap_or_else(|e| e.into_inner());
        let voter_lock = self.voter_lock(election_id, voter_id);
        let _voter_guard = voter_lock.lock().unwrap_or_else(|e| e.into_inner());

        // The state may have moved on while we were verifying
        let election = self.load(election_id)?;
        election.ensure_accepting_ballots()?;
        let voter = election
            .voter_by_id(voter_id)
            .cloned()
            .ok_or_else(|| Error::VoterNotEligible(voter_id.to_string()))?;

        let cast = CastVote::new(&voter, vote);
        let replaced = match self.store.get(RecordId::voter_vote(election_id, voter.uuid)) {
            Some(Datatype::CastVote(previous)) => Some(previous.vote_hash),
            _ => None,
        };

        self.store.set(
            RecordId::cast_vote(election_id, voter.uuid, &cast.vote_hash),
            Datatype::CastVote(cast.clone()),
        )?;
        self.store.set(
            RecordId::voter_vote(election_id, voter.uuid),
            Datatype::CastVote(cast.clone()),
        )?;

        match &replaced {
            Some(previous) => info!(
                "election {}: voter {} re-cast, {} replaces {}",
                election_id, voter.uuid, cast.vote_hash, previous
            ),
            None => info!(
                "election {}: voter {} cast {}",
                election_id, voter.uuid, cast.vote_hash
            ),
        }

        Ok(CastReceipt {
            accepted: true,
            ballot_hash: cast.vote_hash,
            voter_uuid: voter.uuid,
            replaced,
        })
    }

    /// Draft -> Frozen
    pub fn freeze(&self, election_id: Uuid) -> Result<ElectionState, Error> {
        self.with_election(election_id, |election| {
            election.freeze()?;
            Ok(election.state)
        })
    }

    /// Frozen -> TallyComputed, and on to Decrypted if only platform trustees are involved.
    ///
    /// Every counted ballot is verified again first; a ballot that no longer verifies aborts
    /// the tally and leaves the stored election frozen. The intermediate TallyComputing state
    /// is never stored.
    pub fn compute_tally(&self, election_id: Uuid) -> Result<ElectionState, Error> {
        let lock = self.election_lock(election_id);
        let _guard = lock.write().unwrap_or_else(|e| e.into_inner());

        let mut election = self.load(election_id)?;
        election.begin_tally()?;

        let tally = self.tally_votes(&election).map_err(|e| {
            error!("election {}: tally aborted: {}", election_id, e);
            e
        })?;
        election.complete_tally(tally)?;

        let submitted = election.decrypt_with_default_trustees(&mut thread_rng())?;
        if !submitted.is_empty() {
            debug!(
                "election {}: {} platform trustee(s) submitted decryptions",
                election_id,
                submitted.len()
            );
        }
        self.save(&election)?;

        self.combine_if_complete(&mut election)
    }

    fn tally_votes(&self, election: &Election) -> Result<Tally, Error> {
        let votes: Vec<EncryptedVote> = self
            .store
            .current_votes(election.uuid)
            .into_iter()
            .map(|cast| cast.vote)
            .collect();

        for vote in &votes {
            vote.verify(election).map_err(|e| {
                Error::InvalidProof(format!("stored ballot {} failed verification: {}", vote.hash(), e))
            })?;
        }

        Tally::compute(&election.params, &election.questions, &votes)
    }

    fn combine_if_complete(&self, election: &mut Election) -> Result<ElectionState, Error> {
        if election.missing_decryptions().is_empty() {
            election.combine_decryptions()?;
            self.save(election)?;
        }
        Ok(election.state)
    }

    /// Record a trustee's partial decryption. The submission that completes the set triggers
    /// combination.
    pub fn submit_decryption_factor(
        &self,
        election_id: Uuid,
        trustee_id: Uuid,
        partial: PartialDecryption,
    ) -> Result<ElectionState, Error> {
        let lock = self.election_lock(election_id);
        let _guard = lock.write().unwrap_or_else(|e| e.into_inner());

        let mut election = self.load(election_id)?;
        election.submit_decryption(trustee_id, partial)?;
        self.save(&election)?;

        self.combine_if_complete(&mut election)
    }

    /// TallyComputed -> Decrypted
    pub fn combine_decryptions(&self, election_id: Uuid) -> Result<ElectionState, Error> {
        self.with_election(election_id, |election| {
            election.combine_decryptions()?;
            Ok(election.state)
        })
    }

    /// Decrypted -> ResultReleased
    pub fn release_result(&self, election_id: Uuid) -> Result<ElectionState, Error> {
        self.with_election(election_id, |election| {
            election.release_result()?;
            Ok(election.state)
        })
    }

    /// Released per-question, per-answer counts
    pub fn get_result(&self, election_id: Uuid) -> Result<Vec<Vec<u64>>, Error> {
        let election = self.load(election_id)?;
        election.result().cloned()
    }
}

impl<S: Store + 'static> ElectionService<S> {
    /// `compute_tally` on a background executor
    pub fn spawn_compute_tally(
        self: &Arc<Self>,
        executor: &dyn JobExecutor,
        election_id: Uuid,
    ) -> Job<ElectionState> {
        let service = self.clone();
        submit(executor, move || service.compute_tally(election_id))
    }

    /// `combine_decryptions` on a background executor
    pub fn spawn_combine_decryptions(
        self: &Arc<Self>,
        executor: &dyn JobExecutor,
        election_id: Uuid,
    ) -> Job<ElectionState> {
        let service = self.clone();
        submit(executor, move || service.combine_decryptions(election_id))
    }
}
