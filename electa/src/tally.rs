use crate::*;
use rayon::prelude::*;

/// Encrypted per-question, per-answer totals
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub num_tallied: u64,
    pub tally: Vec<Vec<Ciphertext>>,
}

/// Fold `combine` over one answer's ciphertext in every vote
pub fn accumulate(
    params: &GroupParameters,
    votes: &[EncryptedVote],
    question: usize,
    answer: usize,
) -> Ciphertext {
    votes
        .iter()
        .filter_map(|v| v.answers.get(question)?.choices.get(answer))
        .fold(Ciphertext::identity(), |acc, c| combine(params, &acc, c))
}

impl Tally {
    pub fn empty(questions: &[Question]) -> Self {
        Tally {
            num_tallied: 0,
            tally: questions
                .iter()
                .map(|q| vec![Ciphertext::identity(); q.num_answers()])
                .collect(),
        }
    }

    fn same_shape(&self, other: &[Vec<Ciphertext>]) -> bool {
        self.tally.len() == other.len()
            && self.tally.iter().zip(other).all(|(a, b)| a.len() == b.len())
    }

    /// Add one vote's ciphertexts into the running totals
    pub fn add_vote(&mut self, params: &GroupParameters, vote: &EncryptedVote) -> Result<(), Error> {
        let choices: Vec<Vec<Ciphertext>> =
            vote.answers.iter().map(|a| a.choices.clone()).collect();
        if !self.same_shape(&choices) {
            return Err(Error::MalformedBallot(
                "vote does not match the shape of the tally".to_string(),
            ));
        }

        for (totals, answer) in self.tally.iter_mut().zip(&vote.answers) {
            for (total, choice) in totals.iter_mut().zip(&answer.choices) {
                *total = combine(params, total, choice);
            }
        }
        self.num_tallied += 1;
        Ok(())
    }

    /// Combine two partial tallies
    pub fn merge(mut self, params: &GroupParameters, other: Tally) -> Result<Tally, Error> {
        if !self.same_shape(&other.tally) {
            return Err(Error::MalformedBallot(
                "cannot merge tallies of different shapes".to_string(),
            ));
        }
        for (totals, others) in self.tally.iter_mut().zip(&other.tally) {
            for (total, c) in totals.iter_mut().zip(others) {
                *total = combine(params, total, c);
            }
        }
        self.num_tallied += other.num_tallied;
        Ok(self)
    }

    /// Tally a set of votes in parallel. The result does not depend on the order of `votes`.
    pub fn compute(
        params: &GroupParameters,
        questions: &[Question],
        votes: &[EncryptedVote],
    ) -> Result<Tally, Error> {
        votes
            .par_iter()
            .try_fold(
                || Tally::empty(questions),
                |mut tally, vote| {
                    tally.add_vote(params, vote)?;
                    Ok::<_, Error>(tally)
                },
            )
            .try_reduce(|| Tally::empty(questions), |a, b| a.merge(params, b))
    }

    /// Recover the plaintext counts from one partial decryption per trustee
    pub fn decrypt_from_factors(
        &self,
        params: &GroupParameters,
        partials: &[&PartialDecryption],
    ) -> Result<Vec<Vec<u64>>, Error> {
        for partial in partials {
            if !self.same_shape_factors(partial) {
                return Err(Error::InvalidProof(
                    "partial decryption does not match the shape of the tally".to_string(),
                ));
            }
        }

        let table = DLogTable::new(params, self.num_tallied);

        let mut results = Vec::with_capacity(self.tally.len());
        for (q, question) in self.tally.iter().enumerate() {
            let mut counts = Vec::with_capacity(question.len());
            for (a, ciphertext) in question.iter().enumerate() {
                let factor = combine_factors(
                    params,
                    partials.iter().map(|p| &p.decryption_factors[q][a]),
                );
                let count = ciphertext
                    .decrypt_with_factor(params, &factor, &table)
                    .map_err(|e| match e {
                        Error::DecryptionMismatch { max, .. } => Error::DecryptionMismatch {
                            question: q,
                            answer: a,
                            max,
                        },
                        e => e,
                    })?;
                counts.push(count);
            }
            results.push(counts);
        }
        Ok(results)
    }

    fn same_shape_factors(&self, partial: &PartialDecryption) -> bool {
        partial.decryption_factors.len() == self.tally.len()
            && self
                .tally
                .iter()
                .zip(&partial.decryption_factors)
                .all(|(c, f)| c.len() == f.len())
    }
}
