use crate::*;
use rand::{CryptoRng, RngCore};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Lifecycle of an election. States only ever move forward.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ElectionState {
    Draft,
    Frozen,
    TallyComputing,
    TallyComputed,
    Decrypted,
    ResultReleased,
}

impl ElectionState {
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for ElectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ElectionState::Draft => "draft",
            ElectionState::Frozen => "frozen",
            ElectionState::TallyComputing => "tally_computing",
            ElectionState::TallyComputed => "tally_computed",
            ElectionState::Decrypted => "decrypted",
            ElectionState::ResultReleased => "result_released",
        };
        write!(f, "{}", name)
    }
}

/// An unmet precondition for freezing an election
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FreezeIssue {
    NoQuestions,
    NoTrustees,
    NoVoters,
    InvalidQuestion(usize, String),
    TrusteeWithoutKey(Uuid),
}

impl std::fmt::Display for FreezeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FreezeIssue::NoQuestions => write!(f, "no questions have been added"),
            FreezeIssue::NoTrustees => write!(f, "no trustees have been added"),
            FreezeIssue::NoVoters => {
                write!(f, "no voters have been added and registration is closed")
            }
            FreezeIssue::InvalidQuestion(i, reason) => write!(f, "question {}: {}", i, reason),
            FreezeIssue::TrusteeWithoutKey(id) => {
                write!(f, "trustee {} has not generated a key", id)
            }
        }
    }
}

/// An eligible voter
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Voter {
    pub uuid: Uuid,

    /// Identifier from the external roster / auth system
    pub voter_id: String,
    pub name: String,

    /// Public pseudonym, when the election hides voter identities
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Audit log entry
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Seconds since the unix epoch
    pub at: u64,
    pub message: String,
}

/// An election and everything needed to run it: ballot structure, trustees, voters,
/// lifecycle state and, eventually, the encrypted tally and result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Election {
    pub uuid: Uuid,
    pub short_name: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub params: GroupParameters,
    pub questions: Vec<Question>,
    pub trustees: Vec<Trustee>,
    pub voters: Vec<Voter>,

    /// Open registration: anyone who casts a ballot becomes a voter
    #[serde(default)]
    pub openreg: bool,

    #[serde(default)]
    pub use_voter_aliases: bool,

    /// Product of every trustee's key share, set at freeze
    #[serde(default)]
    pub public_key: Option<PublicKey>,

    /// Fingerprint of the ballot structure, set at freeze
    #[serde(default)]
    pub election_hash: Option<String>,

    pub state: ElectionState,

    #[serde(default)]
    pub encrypted_tally: Option<Tally>,

    #[serde(default)]
    pub result: Option<Vec<Vec<u64>>>,

    #[serde(default)]
    pub log: Vec<LogEntry>,
}

/// The frozen parts of an election that its hash commits to
#[derive(Serialize)]
struct Fingerprint<'a> {
    uuid: Uuid,
    short_name: &'a str,
    params: &'a GroupParameters,
    questions: &'a [Question],
    trustee_keys: Vec<(Uuid, &'a PublicKey)>,
    public_key: &'a PublicKey,
    openreg: bool,
    use_voter_aliases: bool,
}

impl Election {
    /// Create a new, empty draft election
    pub fn new(params: GroupParameters, short_name: &str, name: &str) -> Self {
        let mut election = Election {
            uuid: Uuid::new_v4(),
            short_name: short_name.to_string(),
            name: name.to_string(),
            description: String::new(),
            params,
            questions: vec![],
            trustees: vec![],
            voters: vec![],
            openreg: false,
            use_voter_aliases: false,
            public_key: None,
            election_hash: None,
            state: ElectionState::Draft,
            encrypted_tally: None,
            result: None,
            log: vec![],
        };
        election.append_log("election created");
        election
    }

    pub fn append_log(&mut self, message: &str) {
        let at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.log.push(LogEntry {
            at,
            message: message.to_string(),
        });
    }

    /// Context for creating and verifying proofs. Only available once frozen.
    pub fn proof_context(&self) -> Option<ProofContext> {
        self.public_key
            .as_ref()
            .map(|pk| ProofContext::new(&self.params, pk, self.uuid))
    }

    /// Copy of the election with every trustee private key removed
    pub fn without_secrets(&self) -> Election {
        Election {
            trustees: self.trustees.iter().map(|t| t.without_secret()).collect(),
            ..self.clone()
        }
    }

    fn ensure_draft(&self) -> Result<(), Error> {
        if self.state != ElectionState::Draft {
            return Err(Error::ElectionFrozen);
        }
        Ok(())
    }

    fn transition(&self, operation: &'static str, from: ElectionState) -> Result<(), Error> {
        if self.state != from {
            return Err(Error::InvalidTransition {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn set_state(&mut self, state: ElectionState) {
        info!("election {}: {} -> {}", self.uuid, self.state, state);
        self.append_log(&format!("state changed from {} to {}", self.state, state));
        self.state = state;
    }

    // Structural edits, Draft only
    // ----------------------------

    pub fn add_question(&mut self, question: Question) -> Result<(), Error> {
        self.ensure_draft()?;
        self.questions.push(question);
        Ok(())
    }

    pub fn set_questions(&mut self, questions: Vec<Question>) -> Result<(), Error> {
        self.ensure_draft()?;
        self.questions = questions;
        Ok(())
    }

    pub fn add_trustee(&mut self, trustee: Trustee) -> Result<Uuid, Error> {
        self.ensure_draft()?;
        let id = trustee.uuid;
        self.append_log(&format!("trustee {} added", id));
        self.trustees.push(trustee);
        Ok(id)
    }

    /// Add the platform-operated trustee. Only one is allowed per election.
    pub fn generate_default_trustee<R: CryptoRng + RngCore>(
        &mut self,
        rng: &mut R,
    ) -> Result<Uuid, Error> {
        self.ensure_draft()?;
        if let Some(existing) = self.trustees.iter().find(|t| t.is_default()) {
            return Err(Error::DuplicateKeyGeneration(existing.uuid));
        }
        let trustee = Trustee::new_default(&self.params, rng);
        self.add_trustee(trustee)
    }

    /// Add a voter to the roster. The roster is not part of the ballot structure, so voters
    /// may still be added while the election is frozen and open for casting.
    pub fn add_voter(&mut self, voter_id: &str, name: &str) -> Result<Uuid, Error> {
        if self.state > ElectionState::Frozen {
            return Err(Error::ElectionFrozen);
        }
        if let Some(existing) = self.voter_by_id(voter_id) {
            return Ok(existing.uuid);
        }
        Ok(self.push_voter(voter_id, name).uuid)
    }

    fn push_voter(&mut self, voter_id: &str, name: &str) -> Voter {
        // Aliases are handed out at freeze; later registrations get the next one
        let alias = if self.use_voter_aliases && self.state != ElectionState::Draft {
            Some(format!("V{}", self.voters.len() + 1))
        } else {
            None
        };
        let voter = Voter {
            uuid: Uuid::new_v4(),
            voter_id: voter_id.to_string(),
            name: name.to_string(),
            alias,
        };
        self.voters.push(voter.clone());
        voter
    }

    pub fn set_openreg(&mut self, openreg: bool) -> Result<(), Error> {
        self.ensure_draft()?;
        self.openreg = openreg;
        Ok(())
    }

    pub fn set_use_voter_aliases(&mut self, use_voter_aliases: bool) -> Result<(), Error> {
        self.ensure_draft()?;
        self.use_voter_aliases = use_voter_aliases;
        Ok(())
    }

    // Administrative metadata, editable in any state
    // ----------------------------------------------

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    // Lookups
    // -------

    pub fn trustee(&self, trustee_id: Uuid) -> Option<&Trustee> {
        self.trustees.iter().find(|t| t.uuid == trustee_id)
    }

    fn trustee_mut(&mut self, trustee_id: Uuid) -> Result<&mut Trustee, Error> {
        self.trustees
            .iter_mut()
            .find(|t| t.uuid == trustee_id)
            .ok_or(Error::TrusteeDoesNotExist(trustee_id))
    }

    pub fn voter_by_id(&self, voter_id: &str) -> Option<&Voter> {
        self.voters.iter().find(|v| v.voter_id == voter_id)
    }

    pub fn voter(&self, voter_uuid: Uuid) -> Option<&Voter> {
        self.voters.iter().find(|v| v.uuid == voter_uuid)
    }

    /// Look up a voter for casting, registering them first if registration is open
    pub fn eligible_voter(&mut self, voter_id: &str) -> Result<Voter, Error> {
        if let Some(voter) = self.voter_by_id(voter_id) {
            return Ok(voter.clone());
        }
        if !self.openreg {
            return Err(Error::VoterNotEligible(voter_id.to_string()));
        }

        let voter = self.push_voter(voter_id, voter_id);
        debug!("election {}: registered voter {}", self.uuid, voter_id);
        Ok(voter)
    }

    // Trustee keys
    // ------------

    /// Generate a key for a trustee, returning the private key to hand over to them
    pub fn generate_trustee_key<R: CryptoRng + RngCore>(
        &mut self,
        trustee_id: Uuid,
        rng: &mut R,
    ) -> Result<PrivateKey, Error> {
        self.ensure_draft()?;
        let params = self.params.clone();
        let secret = self.trustee_mut(trustee_id)?.generate_key(&params, rng)?;
        self.append_log(&format!("trustee {} generated a key", trustee_id));
        Ok(secret)
    }

    /// Register a key share a trustee generated themselves
    pub fn register_trustee_key(
        &mut self,
        trustee_id: Uuid,
        public_key: PublicKey,
        pok: SchnorrProof,
    ) -> Result<(), Error> {
        self.ensure_draft()?;
        let params = self.params.clone();
        self.trustee_mut(trustee_id)?
            .register_public_key(&params, public_key, pok)?;
        self.append_log(&format!("trustee {} uploaded a key", trustee_id));
        Ok(())
    }

    // Lifecycle
    // ---------

    /// Every unmet precondition for freezing
    pub fn issues_before_freeze(&self) -> Vec<FreezeIssue> {
        let mut issues = Vec::new();

        if self.questions.is_empty() {
            issues.push(FreezeIssue::NoQuestions);
        }
        for (i, question) in self.questions.iter().enumerate() {
            if let Err(reason) = question.validate() {
                issues.push(FreezeIssue::InvalidQuestion(i, reason));
            }
        }

        if self.trustees.is_empty() {
            issues.push(FreezeIssue::NoTrustees);
        }
        for trustee in &self.trustees {
            if trustee.public_key.is_none() {
                issues.push(FreezeIssue::TrusteeWithoutKey(trustee.uuid));
            }
        }

        if self.voters.is_empty() && !self.openreg {
            issues.push(FreezeIssue::NoVoters);
        }

        issues
    }

    /// Draft -> Frozen. Fixes the ballot structure, computes the election key and fingerprint.
    pub fn freeze(&mut self) -> Result<(), Error> {
        self.transition("freeze", ElectionState::Draft)?;

        let issues = self.issues_before_freeze();
        if !issues.is_empty() {
            return Err(Error::NotReadyToFreeze(issues));
        }

        let public_key = PublicKey::combine(
            &self.params,
            self.trustees.iter().filter_map(|t| t.public_key.as_ref()),
        );

        if self.use_voter_aliases {
            for (i, voter) in self.voters.iter_mut().enumerate() {
                voter.alias = Some(format!("V{}", i + 1));
            }
        }

        let fingerprint = Fingerprint {
            uuid: self.uuid,
            short_name: &self.short_name,
            params: &self.params,
            questions: &self.questions,
            trustee_keys: self
                .trustees
                .iter()
                .filter_map(|t| t.public_key.as_ref().map(|pk| (t.uuid, pk)))
                .collect(),
            public_key: &public_key,
            openreg: self.openreg,
            use_voter_aliases: self.use_voter_aliases,
        };
        let fingerprint = serde_json::to_vec(&fingerprint)
            .expect("electa: Unexpected error serializing election");

        self.election_hash = Some(hash_b64(&fingerprint));
        self.public_key = Some(public_key);
        self.set_state(ElectionState::Frozen);
        Ok(())
    }

    /// Ballots are accepted only while frozen
    pub fn ensure_accepting_ballots(&self) -> Result<(), Error> {
        if self.state != ElectionState::Frozen {
            return Err(Error::NotAcceptingBallots(self.state));
        }
        Ok(())
    }

    /// Frozen -> TallyComputing
    pub fn begin_tally(&mut self) -> Result<(), Error> {
        self.transition("compute the tally of", ElectionState::Frozen)?;
        self.set_state(ElectionState::TallyComputing);
        Ok(())
    }

    /// TallyComputing -> TallyComputed
    pub fn complete_tally(&mut self, tally: Tally) -> Result<(), Error> {
        self.transition("store the tally of", ElectionState::TallyComputing)?;
        if tally.tally.len() != self.questions.len() {
            return Err(Error::MalformedBallot(
                "tally does not match the election questions".to_string(),
            ));
        }
        self.append_log(&format!("tally computed over {} ballots", tally.num_tallied));
        self.encrypted_tally = Some(tally);
        self.set_state(ElectionState::TallyComputed);
        Ok(())
    }

    /// Verify and record a trustee's partial decryption
    pub fn submit_decryption(
        &mut self,
        trustee_id: Uuid,
        partial: PartialDecryption,
    ) -> Result<(), Error> {
        self.transition("submit a decryption to", ElectionState::TallyComputed)?;

        let params = self.params.clone();
        let public_key = self.public_key.clone().ok_or(Error::InvalidTransition {
            operation: "submit a decryption to",
            state: self.state,
        })?;
        let tally = self.encrypted_tally.clone().ok_or(Error::InvalidTransition {
            operation: "submit a decryption to",
            state: self.state,
        })?;
        let ctx = ProofContext::new(&params, &public_key, self.uuid);

        self.trustee_mut(trustee_id)?
            .accept_partial_decryption(&ctx, &tally, partial)?;
        self.append_log(&format!("trustee {} submitted a decryption", trustee_id));
        Ok(())
    }

    /// Produce and submit decryptions for every platform-held trustee that hasn't yet.
    /// Returns the trustees that submitted.
    pub fn decrypt_with_default_trustees<R: CryptoRng + RngCore>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<Uuid>, Error> {
        let pending: Vec<Trustee> = self
            .trustees
            .iter()
            .filter(|t| t.is_default() && t.decryption.is_none())
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(vec![]);
        }

        let partials = {
            let ctx = self.proof_context().ok_or(Error::InvalidTransition {
                operation: "decrypt",
                state: self.state,
            })?;
            let tally = self.encrypted_tally.as_ref().ok_or(Error::InvalidTransition {
                operation: "decrypt",
                state: self.state,
            })?;

            let mut partials = Vec::with_capacity(pending.len());
            for trustee in &pending {
                if let Some(secret) = &trustee.secret_key {
                    partials.push((trustee.uuid, trustee.partial_decrypt(&ctx, tally, secret, rng)?));
                }
            }
            partials
        };

        let mut submitted = Vec::with_capacity(partials.len());
        for (trustee_id, partial) in partials {
            self.submit_decryption(trustee_id, partial)?;
            submitted.push(trustee_id);
        }
        Ok(submitted)
    }

    /// Trustees that have not yet submitted a verified partial decryption
    pub fn missing_decryptions(&self) -> Vec<Uuid> {
        self.trustees
            .iter()
            .filter(|t| t.decryption.is_none())
            .map(|t| t.uuid)
            .collect()
    }

    /// TallyComputed -> Decrypted, once every trustee has submitted
    pub fn combine_decryptions(&mut self) -> Result<(), Error> {
        self.transition("combine decryptions for", ElectionState::TallyComputed)?;

        let missing = self.missing_decryptions();
        if !missing.is_empty() {
            warn!(
                "election {}: waiting on {} trustee decryption(s)",
                self.uuid,
                missing.len()
            );
            return Err(Error::IncompleteDecryption { missing });
        }

        let result = {
            let ctx = self.proof_context().ok_or(Error::InvalidTransition {
                operation: "combine decryptions for",
                state: self.state,
            })?;
            let tally = self.encrypted_tally.as_ref().ok_or(Error::InvalidTransition {
                operation: "combine decryptions for",
                state: self.state,
            })?;

            let mut partials = Vec::with_capacity(self.trustees.len());
            for trustee in &self.trustees {
                if let Some(partial) = &trustee.decryption {
                    trustee.verify_partial_decryption(&ctx, tally, partial)?;
                    partials.push(partial);
                }
            }

            tally.decrypt_from_factors(&self.params, &partials).map_err(|e| {
                error!("election {}: tally decryption failed: {}", self.uuid, e);
                e
            })?
        };

        self.result = Some(result);
        self.set_state(ElectionState::Decrypted);
        Ok(())
    }

    /// Decrypted -> ResultReleased
    pub fn release_result(&mut self) -> Result<(), Error> {
        if self.state == ElectionState::ResultReleased {
            return Err(Error::AlreadyReleased);
        }
        self.transition("release the result of", ElectionState::Decrypted)?;
        self.set_state(ElectionState::ResultReleased);
        Ok(())
    }

    /// Per-question, per-answer counts. Only available once released.
    pub fn result(&self) -> Result<&Vec<Vec<u64>>, Error> {
        match (&self.state, &self.result) {
            (ElectionState::ResultReleased, Some(result)) => Ok(result),
            _ => Err(Error::ResultNotReleased),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_freeze_issues() {
        let mut rng = ChaCha20Rng::seed_from_u64(70);
        let mut election = Election::new(GroupParameters::testing(), "e", "Election");

        // Nothing set up: every issue is reported at once
        let issues = election.issues_before_freeze();
        assert_eq!(issues.len(), 3);
        match election.freeze() {
            Err(Error::NotReadyToFreeze(reported)) => assert_eq!(reported, issues),
            other => panic!("expected NotReadyToFreeze, got {:?}", other),
        }
        assert_eq!(election.state, ElectionState::Draft);

        election
            .add_question(Question::new("q", "Pick", &["a", "b"]).with_bounds(0, Some(1)))
            .unwrap();
        assert_eq!(election.issues_before_freeze().len(), 2);

        election.generate_default_trustee(&mut rng).unwrap();
        assert_eq!(
            election.issues_before_freeze(),
            vec![FreezeIssue::NoVoters]
        );

        election.add_voter("alice@example.com", "Alice").unwrap();
        assert!(election.issues_before_freeze().is_empty());

        election.freeze().unwrap();
        assert_eq!(election.state, ElectionState::Frozen);
        assert!(election.election_hash.is_some());

        let res = election.freeze();
        assert!(matches!(
            res,
            Err(Error::InvalidTransition {
                state: ElectionState::Frozen,
                ..
            })
        ));
    }

    #[test]
    fn test_openreg_satisfies_voters() {
        let mut election = Election::new(GroupParameters::testing(), "e", "Election");
        election.set_openreg(true).unwrap();
        let issues = election.issues_before_freeze();
        assert_eq!(issues.len(), 2);
        assert!(!issues.contains(&FreezeIssue::NoVoters));
    }

    #[test]
    fn test_invalid_question_and_keyless_trustee() {
        let mut election = Election::new(GroupParameters::testing(), "e", "Election");
        election
            .add_question(Question::new("q", "Pick", &["a"]).with_bounds(2, None))
            .unwrap();
        let trustee = Trustee::new("Alice", "alice@example.com");
        let trustee_id = election.add_trustee(trustee).unwrap();
        election.set_openreg(true).unwrap();

        let issues = election.issues_before_freeze();
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], FreezeIssue::InvalidQuestion(0, _)));
        assert_eq!(issues[1], FreezeIssue::TrusteeWithoutKey(trustee_id));
    }

    #[test]
    fn test_frozen_structure() {
        let mut rng = ChaCha20Rng::seed_from_u64(71);
        let mut election = Election::new(GroupParameters::testing(), "e", "Election");
        election
            .add_question(Question::new("q", "Pick", &["a", "b"]))
            .unwrap();
        election.generate_default_trustee(&mut rng).unwrap();
        election.set_use_voter_aliases(true).unwrap();
        election.add_voter("alice", "Alice").unwrap();
        election.add_voter("bob", "Bob").unwrap();
        election.freeze().unwrap();

        assert_eq!(election.voters[1].alias.as_deref(), Some("V2"));

        assert!(matches!(
            election.add_question(Question::new("q2", "More", &["c"])),
            Err(Error::ElectionFrozen)
        ));
        assert!(matches!(
            election.add_trustee(Trustee::new("Eve", "eve@example.com")),
            Err(Error::ElectionFrozen)
        ));
        assert!(matches!(election.set_openreg(true), Err(Error::ElectionFrozen)));

        // metadata stays editable
        let hash = election.election_hash.clone();
        election.set_name("Renamed");
        election.set_description("Now with a description");
        assert_eq!(election.name, "Renamed");
        assert_eq!(election.election_hash, hash);

        // roster is closed
        assert!(matches!(
            election.eligible_voter("mallory"),
            Err(Error::VoterNotEligible(_))
        ));
        assert_eq!(election.eligible_voter("bob").unwrap().name, "Bob");
    }

    #[test]
    fn test_public_key_is_product_of_shares() {
        let mut rng = ChaCha20Rng::seed_from_u64(72);
        let params = GroupParameters::testing();
        let mut election = Election::new(params.clone(), "e", "Election");
        election
            .add_question(Question::new("q", "Pick", &["a", "b"]))
            .unwrap();
        election.set_openreg(true).unwrap();

        let a = election.add_trustee(Trustee::new("A", "a@example.com")).unwrap();
        let b = election.add_trustee(Trustee::new("B", "b@example.com")).unwrap();
        let sk_a = election.generate_trustee_key(a, &mut rng).unwrap();

        let kp = KeyPair::generate(&params, &mut rng);
        let pok = kp.secret.prove_possession(&params, &mut rng);
        election.register_trustee_key(b, kp.public.clone(), pok).unwrap();

        assert!(matches!(
            election.generate_trustee_key(b, &mut rng),
            Err(Error::DuplicateKeyGeneration(id)) if id == b
        ));

        election.freeze().unwrap();
        let expected = PublicKey::combine(&params, vec![&sk_a.public_key(&params), &kp.public]);
        assert_eq!(election.public_key, Some(expected));
    }

    #[test]
    fn test_out_of_order_transitions() {
        let mut rng = ChaCha20Rng::seed_from_u64(73);
        let mut election = Election::new(GroupParameters::testing(), "e", "Election");

        assert!(matches!(
            election.begin_tally(),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(matches!(
            election.combine_decryptions(),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(matches!(
            election.release_result(),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(matches!(election.result(), Err(Error::ResultNotReleased)));

        election
            .add_question(Question::new("q", "Pick", &["a", "b"]))
            .unwrap();
        election.generate_default_trustee(&mut rng).unwrap();
        assert!(matches!(
            election.generate_default_trustee(&mut rng),
            Err(Error::DuplicateKeyGeneration(_))
        ));
        election.set_openreg(true).unwrap();
        election.freeze().unwrap();
        election.ensure_accepting_ballots().unwrap();

        election.begin_tally().unwrap();
        assert!(matches!(
            election.ensure_accepting_ballots(),
            Err(Error::NotAcceptingBallots(ElectionState::TallyComputing))
        ));
        assert!(ElectionState::TallyComputing.rank() > ElectionState::Frozen.rank());
    }

    #[test]
    fn test_without_secrets() {
        let mut rng = ChaCha20Rng::seed_from_u64(74);
        let mut election = Election::new(GroupParameters::testing(), "e", "Election");
        election.generate_default_trustee(&mut rng).unwrap();

        let public = election.without_secrets();
        assert!(public.trustees[0].secret_key.is_none());
        assert!(election.trustees[0].secret_key.is_some());
        assert!(!serde_json::to_string(&public).unwrap().contains("secret_key"));
    }
}
