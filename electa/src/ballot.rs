use crate::*;
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use uuid::Uuid;

/// One question's worth of encrypted selections.
///
/// `choices[i]` encrypts 1 if answer `i` was selected and 0 otherwise. Each choice carries a
/// {0,1} proof, and `overall_proof` shows that the homomorphic sum of the choices lies within
/// the question's selection bounds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EncryptedAnswer {
    pub choices: Vec<Ciphertext>,
    pub individual_proofs: Vec<DisjunctiveProof>,
    pub overall_proof: DisjunctiveProof,
}

/// A voter's encrypted ballot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EncryptedVote {
    pub election_uuid: Uuid,
    pub election_hash: String,
    pub answers: Vec<EncryptedAnswer>,
}

/// Everything needed to open an encrypted vote: the selections and the encryption randomness.
///
/// Revealing these spoils the ballot; they are used to audit the encryption, not to cast.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteSecrets {
    pub selections: Vec<Vec<usize>>,

    #[serde(with = "crate::serde_biguint::vec_vec")]
    pub randomness: Vec<Vec<BigUint>>,
}

/// A ballot accepted into an election
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CastVote {
    pub voter_uuid: Uuid,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_alias: Option<String>,

    pub vote_hash: String,
    pub vote: EncryptedVote,
}

impl CastVote {
    pub fn new(voter: &Voter, vote: EncryptedVote) -> Self {
        CastVote {
            voter_uuid: voter.uuid,
            voter_alias: voter.alias.clone(),
            vote_hash: vote.hash(),
            vote,
        }
    }
}

/// Check a single question's selections against its bounds
fn check_selections(index: usize, question: &Question, selected: &[usize]) -> Result<(), Error> {
    let malformed = |msg: String| Err(Error::MalformedBallot(format!("question {}: {}", index, msg)));

    let mut seen = vec![false; question.num_answers()];
    for &answer in selected {
        if answer >= question.num_answers() {
            return malformed(format!("answer {} does not exist", answer));
        }
        if seen[answer] {
            return malformed(format!("answer {} selected twice", answer));
        }
        seen[answer] = true;
    }
    if selected.len() < question.min || selected.len() > question.max_selections() {
        return malformed(format!(
            "{} selections, expected between {} and {}",
            selected.len(),
            question.min,
            question.max_selections()
        ));
    }
    Ok(())
}

impl EncryptedAnswer {
    fn encrypt<R: CryptoRng + RngCore>(
        ctx: &ProofContext,
        question: &Question,
        selected: &[usize],
        rng: &mut R,
    ) -> Result<(Self, Vec<BigUint>), Error> {
        let params = ctx.params;

        let mut choices = Vec::with_capacity(question.num_answers());
        let mut individual_proofs = Vec::with_capacity(question.num_answers());
        let mut randomness = Vec::with_capacity(question.num_answers());

        let mut sum = Ciphertext::identity();
        let mut sum_r = BigUint::from(0u32);

        for i in 0..question.num_answers() {
            let m = if selected.contains(&i) { 1 } else { 0 };
            let (ct, r) = Ciphertext::encrypt_random(params, ctx.public_key, m, rng);
            individual_proofs.push(DisjunctiveProof::prove(ctx, &ct, &r, m, 0, 1, rng)?);

            sum = combine(params, &sum, &ct);
            sum_r = (sum_r + &r) % &params.q;
            choices.push(ct);
            randomness.push(r);
        }

        let overall_proof = DisjunctiveProof::prove(
            ctx,
            &sum,
            &sum_r,
            selected.len() as u64,
            question.min as u64,
            question.max_selections() as u64,
            rng,
        )?;

        let answer = EncryptedAnswer {
            choices,
            individual_proofs,
            overall_proof,
        };
        Ok((answer, randomness))
    }

    /// Homomorphic sum of all choices
    pub fn sum(&self, params: &GroupParameters) -> Ciphertext {
        self.choices
            .iter()
            .fold(Ciphertext::identity(), |acc, c| combine(params, &acc, c))
    }

    fn verify(&self, ctx: &ProofContext, index: usize, question: &Question) -> Result<(), Error> {
        if self.choices.len() != question.num_answers()
            || self.individual_proofs.len() != question.num_answers()
        {
            return Err(Error::MalformedBallot(format!(
                "question {}: expected {} choices and proofs, found {} and {}",
                index,
                question.num_answers(),
                self.choices.len(),
                self.individual_proofs.len()
            )));
        }

        for (choice, proof) in self.choices.iter().zip(self.individual_proofs.iter()) {
            if !choice.is_valid(ctx.params) {
                return Err(Error::InvalidProof(format!(
                    "question {}: ciphertext is not in the group",
                    index
                )));
            }
            proof.verify(ctx, choice, 0, 1)?;
        }

        self.overall_proof.verify(
            ctx,
            &self.sum(ctx.params),
            question.min as u64,
            question.max_selections() as u64,
        )
    }
}

impl EncryptedVote {
    /// Encrypt a vote for a frozen election.
    ///
    /// `selections[i]` holds the selected answer indexes for question `i`.
    pub fn encrypt<R: CryptoRng + RngCore>(
        election: &Election,
        selections: &[Vec<usize>],
        rng: &mut R,
    ) -> Result<(Self, VoteSecrets), Error> {
        let (ctx, election_hash) = match (election.proof_context(), &election.election_hash) {
            (Some(ctx), Some(hash)) => (ctx, hash.clone()),
            _ => return Err(Error::NotAcceptingBallots(election.state)),
        };

        if selections.len() != election.questions.len() {
            return Err(Error::MalformedBallot(format!(
                "expected selections for {} questions, found {}",
                election.questions.len(),
                selections.len()
            )));
        }

        let mut answers = Vec::with_capacity(selections.len());
        let mut randomness = Vec::with_capacity(selections.len());
        for (i, (question, selected)) in election.questions.iter().zip(selections).enumerate() {
            check_selections(i, question, selected)?;
            let (answer, r) = EncryptedAnswer::encrypt(&ctx, question, selected, rng)?;
            answers.push(answer);
            randomness.push(r);
        }

        let vote = EncryptedVote {
            election_uuid: election.uuid,
            election_hash,
            answers,
        };
        let secrets = VoteSecrets {
            selections: selections.to_vec(),
            randomness,
        };
        Ok((vote, secrets))
    }

    /// Verify the vote against the election: structure first, then every proof.
    ///
    /// Needs no secrets and has no side effects.
    pub fn verify(&self, election: &Election) -> Result<(), Error> {
        if self.election_uuid != election.uuid {
            return Err(Error::MalformedBallot(format!(
                "vote is for election {}, not {}",
                self.election_uuid, election.uuid
            )));
        }
        if election.election_hash.as_ref() != Some(&self.election_hash) {
            return Err(Error::MalformedBallot(
                "vote does not match the election fingerprint".to_string(),
            ));
        }
        if self.answers.len() != election.questions.len() {
            return Err(Error::MalformedBallot(format!(
                "expected {} answers, found {}",
                election.questions.len(),
                self.answers.len()
            )));
        }

        let ctx = election
            .proof_context()
            .ok_or(Error::NotAcceptingBallots(election.state))?;

        for (i, (answer, question)) in self.answers.iter().zip(&election.questions).enumerate() {
            answer.verify(&ctx, i, question)?;
        }

        Ok(())
    }

    /// Content address of the vote
    pub fn hash(&self) -> String {
        let json =
            serde_json::to_vec(self).expect("electa: Unexpected error serializing vote");
        hash_b64(&json)
    }

    /// Audit a spoiled ballot: re-encrypt from the revealed secrets and compare
    pub fn verify_opening(
        &self,
        params: &GroupParameters,
        public_key: &PublicKey,
        secrets: &VoteSecrets,
    ) -> Result<(), Error> {
        let mismatch = || Err(Error::InvalidProof("vote does not match its opening".to_string()));

        if secrets.selections.len() != self.answers.len()
            || secrets.randomness.len() != self.answers.len()
        {
            return mismatch();
        }

        for (answer, (selected, randomness)) in self
            .answers
            .iter()
            .zip(secrets.selections.iter().zip(&secrets.randomness))
        {
            if randomness.len() != answer.choices.len() {
                return mismatch();
            }
            for (i, (choice, r)) in answer.choices.iter().zip(randomness).enumerate() {
                let m = if selected.contains(&i) { 1 } else { 0 };
                if &encrypt(params, public_key, m, r) != choice {
                    return mismatch();
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn frozen_election(rng: &mut ChaCha20Rng) -> Election {
        let mut election = Election::new(GroupParameters::testing(), "test", "Test Election");
        election
            .add_question(Question::new("q1", "Pick one", &["a", "b", "c"]).with_bounds(0, Some(1)))
            .unwrap();
        election
            .add_question(Question::new("q2", "Pick two", &["x", "y", "z"]).with_bounds(2, Some(2)))
            .unwrap();
        election.generate_default_trustee(rng).unwrap();
        election.set_openreg(true).unwrap();
        election.freeze().unwrap();
        election
    }

    #[test]
    fn test_encrypt_verify() {
        let mut rng = ChaCha20Rng::seed_from_u64(40);
        let election = frozen_election(&mut rng);

        let (vote, secrets) =
            EncryptedVote::encrypt(&election, &[vec![0], vec![1, 2]], &mut rng).unwrap();
        vote.verify(&election).unwrap();

        let pk = election.public_key.clone().unwrap();
        vote.verify_opening(&election.params, &pk, &secrets).unwrap();

        let mut lying = secrets.clone();
        lying.selections[0] = vec![1];
        assert!(vote.verify_opening(&election.params, &pk, &lying).is_err());

        // Abstaining is allowed when min is 0
        let (empty, _) = EncryptedVote::encrypt(&election, &[vec![], vec![0, 1]], &mut rng).unwrap();
        empty.verify(&election).unwrap();
        assert_ne!(empty.hash(), vote.hash());
    }

    #[test]
    fn test_invalid_selections() {
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        let election = frozen_election(&mut rng);

        for selections in [
            vec![vec![0, 1], vec![0, 1]], // too many
            vec![vec![0], vec![0]],       // too few
            vec![vec![3], vec![0, 1]],    // no such answer
            vec![vec![0], vec![1, 1]],    // duplicate
            vec![vec![0]],                // missing question
        ]
        .iter()
        {
            let res = EncryptedVote::encrypt(&election, selections, &mut rng);
            assert!(matches!(res, Err(Error::MalformedBallot(_))));
        }
    }

    #[test]
    fn test_tampered_votes_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let election = frozen_election(&mut rng);
        let (vote, _) = EncryptedVote::encrypt(&election, &[vec![0], vec![0, 1]], &mut rng).unwrap();

        // Swap two choices: proofs no longer match their ciphertexts
        let mut swapped = vote.clone();
        swapped.answers[0].choices.swap(0, 1);
        assert!(matches!(swapped.verify(&election), Err(Error::InvalidProof(_))));

        // Drop a choice
        let mut short = vote.clone();
        short.answers[1].choices.pop();
        assert!(matches!(short.verify(&election), Err(Error::MalformedBallot(_))));

        // Wrong election fingerprint
        let mut wrong_hash = vote.clone();
        wrong_hash.election_hash = "nope".to_string();
        assert!(matches!(wrong_hash.verify(&election), Err(Error::MalformedBallot(_))));

        // Different election
        let other = frozen_election(&mut rng);
        assert!(vote.verify(&other).is_err());
    }

    #[test]
    fn test_overvote_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(43);
        let election = frozen_election(&mut rng);
        let ctx = election.proof_context().unwrap();
        let params = &election.params;
        let question = &election.questions[0];

        // Honest {0,1} proofs on every choice, but two selections on a max-1 question.
        // No valid overall proof exists, so borrow one from an honest single selection.
        let (honest, _) = EncryptedAnswer::encrypt(&ctx, question, &[0], &mut rng).unwrap();
        let mut choices = Vec::new();
        let mut proofs = Vec::new();
        for m in [1u64, 1, 0].iter() {
            let (ct, r) = Ciphertext::encrypt_random(params, ctx.public_key, *m, &mut rng);
            proofs.push(DisjunctiveProof::prove(&ctx, &ct, &r, *m, 0, 1, &mut rng).unwrap());
            choices.push(ct);
        }
        let overvote = EncryptedAnswer {
            choices,
            individual_proofs: proofs,
            overall_proof: honest.overall_proof,
        };
        assert!(matches!(
            overvote.verify(&ctx, 0, question),
            Err(Error::InvalidProof(_))
        ));
    }
}
