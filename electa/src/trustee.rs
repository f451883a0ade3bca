use crate::*;
use num_bigint::BigUint;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use uuid::Uuid;

/// A trustee holds one share of the election decryption key.
///
/// The election key is the product of every trustee's public key share, so decrypting the tally
/// needs a partial decryption from every single trustee. There is no quorum smaller than all.
///
/// The platform may run a "default" trustee of its own, in which case that trustee's private key
/// is kept alongside it and its partial decryption is produced automatically.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Trustee {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,

    #[serde(default)]
    pub public_key: Option<PublicKey>,

    /// Fingerprint of `public_key`
    #[serde(default)]
    pub public_key_hash: Option<String>,

    /// Proof of knowledge of the private key behind `public_key`
    #[serde(default)]
    pub pok: Option<SchnorrProof>,

    #[serde(default)]
    pub decryption: Option<PartialDecryption>,

    /// Only ever set for the platform-operated trustee
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<PrivateKey>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrusteeState {
    Registered,
    KeyGenerated,
    DecryptionSubmitted,
}

/// A trustee's decryption factors (alpha^x) for every tally ciphertext, with proofs
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PartialDecryption {
    #[serde(with = "crate::serde_biguint::vec_vec")]
    pub decryption_factors: Vec<Vec<BigUint>>,
    pub decryption_proofs: Vec<Vec<ChaumPedersenProof>>,
}

/// Product of the trustees' decryption factors for one ciphertext
pub fn combine_factors<'a, I>(params: &GroupParameters, factors: I) -> BigUint
where
    I: IntoIterator<Item = &'a BigUint>,
{
    factors
        .into_iter()
        .fold(BigUint::one(), |acc, d| params.mul(&acc, d))
}

impl Trustee {
    /// Create a new trustee. It has no key until `generate_key` or `register_public_key`.
    pub fn new(name: &str, email: &str) -> Self {
        Trustee {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            public_key: None,
            public_key_hash: None,
            pok: None,
            decryption: None,
            secret_key: None,
        }
    }

    /// Create the platform-operated trustee, which keeps its own private key
    pub fn new_default<R: CryptoRng + RngCore>(params: &GroupParameters, rng: &mut R) -> Self {
        let mut trustee = Trustee::new("Platform Trustee", "trustee@electa.invalid");
        let secret = trustee
            .install_key(params, rng)
            .expect("electa: Unexpected key on freshly created trustee");
        trustee.secret_key = Some(secret);
        trustee
    }

    pub fn state(&self) -> TrusteeState {
        if self.decryption.is_some() {
            TrusteeState::DecryptionSubmitted
        } else if self.public_key.is_some() {
            TrusteeState::KeyGenerated
        } else {
            TrusteeState::Registered
        }
    }

    pub fn is_default(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Copy of the trustee with the private key removed
    pub fn without_secret(&self) -> Self {
        Trustee {
            secret_key: None,
            ..self.clone()
        }
    }

    /// Generate this trustee's key share.
    ///
    /// The private key is returned to the caller and is not kept.
    pub fn generate_key<R: CryptoRng + RngCore>(
        &mut self,
        params: &GroupParameters,
        rng: &mut R,
    ) -> Result<PrivateKey, Error> {
        self.install_key(params, rng)
    }

    fn install_key<R: CryptoRng + RngCore>(
        &mut self,
        params: &GroupParameters,
        rng: &mut R,
    ) -> Result<PrivateKey, Error> {
        if self.public_key.is_some() {
            return Err(Error::DuplicateKeyGeneration(self.uuid));
        }
        let (public, secret) = generate_keypair(params, rng);
        let pok = secret.prove_possession(params, rng);
        self.register_public_key(params, public, pok)?;
        Ok(secret)
    }

    /// Register a key share generated elsewhere, along with its proof of possession
    pub fn register_public_key(
        &mut self,
        params: &GroupParameters,
        public_key: PublicKey,
        pok: SchnorrProof,
    ) -> Result<(), Error> {
        if self.public_key.is_some() {
            return Err(Error::DuplicateKeyGeneration(self.uuid));
        }
        public_key.verify_possession(params, &pok)?;

        self.public_key_hash = Some(public_key.fingerprint());
        self.public_key = Some(public_key);
        self.pok = Some(pok);
        Ok(())
    }

    fn share(&self) -> Result<&PublicKey, Error> {
        self.public_key
            .as_ref()
            .ok_or(Error::MissingTrusteeKey(self.uuid))
    }

    /// Compute decryption factors and proofs for every ciphertext in the tally
    pub fn partial_decrypt<R: CryptoRng + RngCore>(
        &self,
        ctx: &ProofContext,
        tally: &Tally,
        secret: &PrivateKey,
        rng: &mut R,
    ) -> Result<PartialDecryption, Error> {
        let share = self.share()?;
        if &secret.public_key(ctx.params) != share {
            return Err(Error::InvalidProof(format!(
                "private key does not belong to trustee {}",
                self.uuid
            )));
        }

        let mut decryption_factors = Vec::with_capacity(tally.tally.len());
        let mut decryption_proofs = Vec::with_capacity(tally.tally.len());
        for question in &tally.tally {
            let mut factors = Vec::with_capacity(question.len());
            let mut proofs = Vec::with_capacity(question.len());
            for ciphertext in question {
                let factor = ctx.params.pow_secret(&ciphertext.alpha, &secret.x);
                proofs.push(ChaumPedersenProof::prove_decryption(
                    ctx, share, ciphertext, &factor, secret, rng,
                ));
                factors.push(factor);
            }
            decryption_factors.push(factors);
            decryption_proofs.push(proofs);
        }

        Ok(PartialDecryption {
            decryption_factors,
            decryption_proofs,
        })
    }

    /// Check a partial decryption against this trustee's key share and the tally
    pub fn verify_partial_decryption(
        &self,
        ctx: &ProofContext,
        tally: &Tally,
        partial: &PartialDecryption,
    ) -> Result<(), Error> {
        let share = self.share()?;

        let shape_ok = partial.decryption_factors.len() == tally.tally.len()
            && partial.decryption_proofs.len() == tally.tally.len()
            && tally.tally.iter().enumerate().all(|(i, q)| {
                partial.decryption_factors[i].len() == q.len()
                    && partial.decryption_proofs[i].len() == q.len()
            });
        if !shape_ok {
            return Err(Error::InvalidProof(format!(
                "partial decryption from trustee {} does not match the tally",
                self.uuid
            )));
        }

        for (q, question) in tally.tally.iter().enumerate() {
            for (a, ciphertext) in question.iter().enumerate() {
                partial.decryption_proofs[q][a].verify_decryption(
                    ctx,
                    share,
                    ciphertext,
                    &partial.decryption_factors[q][a],
                )?;
            }
        }
        Ok(())
    }

    /// Verify and store a partial decryption. Each trustee submits exactly once.
    pub fn accept_partial_decryption(
        &mut self,
        ctx: &ProofContext,
        tally: &Tally,
        partial: PartialDecryption,
    ) -> Result<(), Error> {
        if self.decryption.is_some() {
            return Err(Error::DecryptionAlreadySubmitted(self.uuid));
        }
        self.verify_partial_decryption(ctx, tally, &partial)?;
        self.decryption = Some(partial);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_trustee_lifecycle() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(50);

        let mut trustee = Trustee::new("Alice", "alice@example.com");
        assert_eq!(trustee.state(), TrusteeState::Registered);

        let secret = trustee.generate_key(&params, &mut rng).unwrap();
        assert_eq!(trustee.state(), TrusteeState::KeyGenerated);
        assert_eq!(trustee.public_key, Some(secret.public_key(&params)));
        assert!(!trustee.is_default());

        // Keys are write-once
        let res = trustee.generate_key(&params, &mut rng);
        assert!(matches!(res, Err(Error::DuplicateKeyGeneration(id)) if id == trustee.uuid));

        let other = KeyPair::generate(&params, &mut rng);
        let pok = other.secret.prove_possession(&params, &mut rng);
        let res = trustee.register_public_key(&params, other.public, pok);
        assert!(matches!(res, Err(Error::DuplicateKeyGeneration(_))));
    }

    #[test]
    fn test_register_requires_possession() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(51);

        let a = KeyPair::generate(&params, &mut rng);
        let b = KeyPair::generate(&params, &mut rng);

        let mut trustee = Trustee::new("Bob", "bob@example.com");
        let wrong_pok = b.secret.prove_possession(&params, &mut rng);
        let res = trustee.register_public_key(&params, a.public.clone(), wrong_pok);
        assert!(matches!(res, Err(Error::InvalidProof(_))));
        assert_eq!(trustee.state(), TrusteeState::Registered);

        let pok = a.secret.prove_possession(&params, &mut rng);
        trustee.register_public_key(&params, a.public.clone(), pok).unwrap();
        assert_eq!(trustee.public_key_hash, Some(a.public.fingerprint()));
    }

    #[test]
    fn test_default_trustee() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(52);

        let trustee = Trustee::new_default(&params, &mut rng);
        assert!(trustee.is_default());
        assert_eq!(trustee.state(), TrusteeState::KeyGenerated);

        let json = serde_json::to_string(&trustee.without_secret()).unwrap();
        assert!(!json.contains("secret_key"));
    }

    #[test]
    fn test_partial_decryption() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(53);

        let mut alice = Trustee::new("Alice", "alice@example.com");
        let alice_secret = alice.generate_key(&params, &mut rng).unwrap();
        let mut bob = Trustee::new("Bob", "bob@example.com");
        let bob_secret = bob.generate_key(&params, &mut rng).unwrap();

        let election_key = PublicKey::combine(
            &params,
            vec![alice.public_key.as_ref().unwrap(), bob.public_key.as_ref().unwrap()],
        );
        let ctx = ProofContext::new(&params, &election_key, Uuid::new_v4());

        let (c0, _) = Ciphertext::encrypt_random(&params, &election_key, 2, &mut rng);
        let (c1, _) = Ciphertext::encrypt_random(&params, &election_key, 1, &mut rng);
        let tally = Tally {
            num_tallied: 2,
            tally: vec![vec![c0.clone(), c1]],
        };

        let alice_pd = alice
            .partial_decrypt(&ctx, &tally, &alice_secret, &mut rng)
            .unwrap();
        let bob_pd = bob.partial_decrypt(&ctx, &tally, &bob_secret, &mut rng).unwrap();

        // A trustee can't use someone else's key
        assert!(alice.partial_decrypt(&ctx, &tally, &bob_secret, &mut rng).is_err());

        // Bob's decryption is not valid for Alice
        assert!(alice.verify_partial_decryption(&ctx, &tally, &bob_pd).is_err());

        alice
            .accept_partial_decryption(&ctx, &tally, alice_pd.clone())
            .unwrap();
        assert_eq!(alice.state(), TrusteeState::DecryptionSubmitted);
        let res = alice.accept_partial_decryption(&ctx, &tally, alice_pd.clone());
        assert!(matches!(res, Err(Error::DecryptionAlreadySubmitted(_))));

        bob.accept_partial_decryption(&ctx, &tally, bob_pd.clone()).unwrap();

        let factor = combine_factors(
            &params,
            vec![
                &alice_pd.decryption_factors[0][0],
                &bob_pd.decryption_factors[0][0],
            ],
        );
        let table = DLogTable::new(&params, 2);
        assert_eq!(c0.decrypt_with_factor(&params, &factor, &table).unwrap(), 2);
    }
}
