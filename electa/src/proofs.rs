//! Non-interactive zero-knowledge proofs (Fiat-Shamir over SHA-256).
//!
//! - `ChaumPedersenProof`: two pairs share the same discrete log,
//!   `log_{g1}(h1) = log_{g2}(h2)`.
//! - `DisjunctiveProof`: a ciphertext encrypts some value in `[min, max]`, one
//!   Chaum-Pedersen transcript per candidate value, all but one simulated.
//! - `SchnorrProof`: knowledge of the discrete log of a public key.

use crate::*;
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

const DISJUNCTIVE_DOMAIN: &str = "electa/disjunctive-cp";
const DECRYPTION_DOMAIN: &str = "electa/decryption-cp";
const SCHNORR_DOMAIN: &str = "electa/schnorr";

/// Prover's first message
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    #[serde(rename = "A", with = "crate::serde_biguint")]
    pub a: BigUint,

    #[serde(rename = "B", with = "crate::serde_biguint")]
    pub b: BigUint,
}

/// Proof of equality of discrete logs
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChaumPedersenProof {
    pub commitment: Commitment,

    #[serde(with = "crate::serde_biguint")]
    pub challenge: BigUint,

    #[serde(with = "crate::serde_biguint")]
    pub response: BigUint,
}

/// Proof that a ciphertext encrypts a value in [min, max]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct DisjunctiveProof(pub Vec<ChaumPedersenProof>);

/// Proof of knowledge of a discrete log
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SchnorrProof {
    #[serde(with = "crate::serde_biguint")]
    pub commitment: BigUint,

    #[serde(with = "crate::serde_biguint")]
    pub challenge: BigUint,

    #[serde(with = "crate::serde_biguint")]
    pub response: BigUint,
}

fn add_mod(a: &BigUint, b: &BigUint, q: &BigUint) -> BigUint {
    (a + b) % q
}

fn sub_mod(a: &BigUint, b: &BigUint, q: &BigUint) -> BigUint {
    ((a % q) + q - (b % q)) % q
}

/// w + c * x mod q
fn response(w: &BigUint, c: &BigUint, x: &BigUint, q: &BigUint) -> BigUint {
    (w + c * x) % q
}

impl ChaumPedersenProof {
    /// Check `g1^s = A * h1^c` and `g2^s = B * h2^c`. The challenge itself is checked by the caller.
    fn check_relation(
        &self,
        params: &GroupParameters,
        g1: &BigUint,
        h1: &BigUint,
        g2: &BigUint,
        h2: &BigUint,
    ) -> bool {
        let Commitment { a, b } = &self.commitment;
        let c = &self.challenge;
        let s = &self.response;

        params.is_element(a)
            && params.is_element(b)
            && params.is_exponent(c)
            && params.is_exponent(s)
            && params.pow(g1, s) == params.mul(a, &params.pow(h1, c))
            && params.pow(g2, s) == params.mul(b, &params.pow(h2, c))
    }

    /// Simulated transcript for a fixed challenge
    fn simulate<R: CryptoRng + RngCore>(
        params: &GroupParameters,
        g1: &BigUint,
        h1: &BigUint,
        g2: &BigUint,
        h2: &BigUint,
        challenge: BigUint,
        rng: &mut R,
    ) -> Self {
        let s = params.random_exponent(rng);
        let a = params.div(&params.pow(g1, &s), &params.pow(h1, &challenge));
        let b = params.div(&params.pow(g2, &s), &params.pow(h2, &challenge));
        ChaumPedersenProof {
            commitment: Commitment { a, b },
            challenge,
            response: s,
        }
    }

    /// Prove that `factor = alpha^x` where `share = g^x` is the trustee's public key share
    pub fn prove_decryption<R: CryptoRng + RngCore>(
        ctx: &ProofContext,
        share: &PublicKey,
        ciphertext: &Ciphertext,
        factor: &BigUint,
        secret: &PrivateKey,
        rng: &mut R,
    ) -> Self {
        let params = ctx.params;
        let w = params.random_exponent(rng);
        let commitment = Commitment {
            a: params.g_pow_secret(&w),
            b: params.pow_secret(&ciphertext.alpha, &w),
        };
        let challenge = decryption_challenge(ctx, share, ciphertext, factor, &commitment);
        let response = response(&w, &challenge, &secret.x, &params.q);

        ChaumPedersenProof {
            commitment,
            challenge,
            response,
        }
    }

    /// Verify a partial decryption factor against the trustee's public key share
    pub fn verify_decryption(
        &self,
        ctx: &ProofContext,
        share: &PublicKey,
        ciphertext: &Ciphertext,
        factor: &BigUint,
    ) -> Result<(), Error> {
        let params = ctx.params;
        if !params.is_element(factor) {
            return Err(Error::InvalidProof(
                "decryption factor is not a group element".to_string(),
            ));
        }

        let expected = decryption_challenge(ctx, share, ciphertext, factor, &self.commitment);
        if self.challenge != expected {
            return Err(Error::InvalidProof(
                "decryption proof challenge mismatch".to_string(),
            ));
        }
        if !self.check_relation(params, &params.g, &share.y, &ciphertext.alpha, factor) {
            return Err(Error::InvalidProof(
                "decryption proof does not verify".to_string(),
            ));
        }

        Ok(())
    }
}

fn decryption_challenge(
    ctx: &ProofContext,
    share: &PublicKey,
    ciphertext: &Ciphertext,
    factor: &BigUint,
    commitment: &Commitment,
) -> BigUint {
    let mut transcript = ctx.transcript(DECRYPTION_DOMAIN);
    transcript.append_uint(b"share", &share.y);
    transcript.append_ciphertext(b"ciphertext", ciphertext);
    transcript.append_uint(b"factor", factor);
    transcript.append_uint(b"A", &commitment.a);
    transcript.append_uint(b"B", &commitment.b);
    transcript.challenge(&ctx.params.q)
}

/// beta / g^j, which equals y^r exactly when the ciphertext encrypts j
fn strip_plaintext(params: &GroupParameters, ciphertext: &Ciphertext, j: u64) -> BigUint {
    // g has order q, so g^-j = g^(q - j mod q)
    let neg_j = sub_mod(&BigUint::from(0u32), &BigUint::from(j), &params.q);
    params.mul(&ciphertext.beta, &params.pow(&params.g, &neg_j))
}

fn disjunctive_challenge(
    ctx: &ProofContext,
    ciphertext: &Ciphertext,
    min: u64,
    max: u64,
    branches: &[ChaumPedersenProof],
) -> BigUint {
    let mut transcript = ctx.transcript(DISJUNCTIVE_DOMAIN);
    transcript.append_ciphertext(b"ciphertext", ciphertext);
    transcript.append_u64(b"min", min);
    transcript.append_u64(b"max", max);
    for branch in branches {
        transcript.append_uint(b"A", &branch.commitment.a);
        transcript.append_uint(b"B", &branch.commitment.b);
    }
    transcript.challenge(&ctx.params.q)
}

impl DisjunctiveProof {
    /// Prove that `ciphertext`, encrypted with randomness `r`, holds `plaintext` in [min, max]
    pub fn prove<R: CryptoRng + RngCore>(
        ctx: &ProofContext,
        ciphertext: &Ciphertext,
        r: &BigUint,
        plaintext: u64,
        min: u64,
        max: u64,
        rng: &mut R,
    ) -> Result<Self, Error> {
        if min > max || plaintext < min || plaintext > max {
            return Err(Error::MalformedBallot(format!(
                "value {} is outside of [{}, {}]",
                plaintext, min, max
            )));
        }

        let params = ctx.params;
        let y = &ctx.public_key.y;
        let q = &params.q;

        let mut branches = Vec::with_capacity((max - min + 1) as usize);
        let mut nonce = None;
        for j in min..=max {
            if j == plaintext {
                let w = params.random_exponent(rng);
                branches.push(ChaumPedersenProof {
                    commitment: Commitment {
                        a: params.g_pow_secret(&w),
                        b: params.pow_secret(y, &w),
                    },
                    challenge: BigUint::from(0u32),
                    response: BigUint::from(0u32),
                });
                nonce = Some(w);
            } else {
                let h2 = strip_plaintext(params, ciphertext, j);
                let challenge = params.random_exponent(rng);
                branches.push(ChaumPedersenProof::simulate(
                    params,
                    &params.g,
                    &ciphertext.alpha,
                    y,
                    &h2,
                    challenge,
                    rng,
                ));
            }
        }

        let total = disjunctive_challenge(ctx, ciphertext, min, max, &branches);
        let simulated = branches
            .iter()
            .enumerate()
            .filter(|(i, _)| *i as u64 + min != plaintext)
            .fold(BigUint::from(0u32), |acc, (_, b)| add_mod(&acc, &b.challenge, q));

        let real = &mut branches[(plaintext - min) as usize];
        real.challenge = sub_mod(&total, &simulated, q);
        if let Some(w) = nonce {
            real.response = response(&w, &real.challenge, r, q);
        }

        Ok(DisjunctiveProof(branches))
    }

    /// Verify against a ciphertext and range. Every branch must hold and the branch
    /// challenges must sum to the transcript challenge.
    pub fn verify(
        &self,
        ctx: &ProofContext,
        ciphertext: &Ciphertext,
        min: u64,
        max: u64,
    ) -> Result<(), Error> {
        let params = ctx.params;
        let q = &params.q;
        let y = &ctx.public_key.y;

        if min > max || self.0.len() as u64 != max - min + 1 {
            return Err(Error::InvalidProof(format!(
                "expected {} branches, found {}",
                max.saturating_sub(min) + 1,
                self.0.len()
            )));
        }

        let mut sum = BigUint::from(0u32);
        for (branch, j) in self.0.iter().zip(min..=max) {
            let h2 = strip_plaintext(params, ciphertext, j);
            if !branch.check_relation(params, &params.g, &ciphertext.alpha, y, &h2) {
                return Err(Error::InvalidProof(format!(
                    "disjunctive proof branch for value {} does not verify",
                    j
                )));
            }
            sum = add_mod(&sum, &branch.challenge, q);
        }

        let expected = disjunctive_challenge(ctx, ciphertext, min, max, &self.0);
        if sum != expected {
            return Err(Error::InvalidProof(
                "disjunctive proof challenges do not sum to the transcript challenge".to_string(),
            ));
        }

        Ok(())
    }
}

impl SchnorrProof {
    /// Prove knowledge of x such that y = g^x
    pub fn prove<R: CryptoRng + RngCore>(
        params: &GroupParameters,
        x: &BigUint,
        y: &BigUint,
        rng: &mut R,
    ) -> Self {
        let w = params.random_exponent(rng);
        let commitment = params.g_pow_secret(&w);
        let challenge = schnorr_challenge(params, y, &commitment);
        let response = response(&w, &challenge, x, &params.q);
        SchnorrProof {
            commitment,
            challenge,
            response,
        }
    }

    pub fn verify(&self, params: &GroupParameters, y: &BigUint) -> Result<(), Error> {
        if !params.is_element(&self.commitment) || !params.is_exponent(&self.response) {
            return Err(Error::InvalidProof(
                "malformed proof of knowledge".to_string(),
            ));
        }
        if self.challenge != schnorr_challenge(params, y, &self.commitment) {
            return Err(Error::InvalidProof(
                "proof of knowledge challenge mismatch".to_string(),
            ));
        }
        let lhs = params.pow(&params.g, &self.response);
        let rhs = params.mul(&self.commitment, &params.pow(y, &self.challenge));
        if lhs != rhs {
            return Err(Error::InvalidProof(
                "proof of knowledge does not verify".to_string(),
            ));
        }
        Ok(())
    }
}

fn schnorr_challenge(params: &GroupParameters, y: &BigUint, commitment: &BigUint) -> BigUint {
    let mut transcript = Transcript::new(SCHNORR_DOMAIN);
    transcript.append_uint(b"p", &params.p);
    transcript.append_uint(b"q", &params.q);
    transcript.append_uint(b"g", &params.g);
    transcript.append_uint(b"y", y);
    transcript.append_uint(b"commitment", commitment);
    transcript.challenge(&params.q)
}
