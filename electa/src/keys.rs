use crate::*;
use num_bigint::BigUint;
use num_traits::One;
use rand::{CryptoRng, RngCore};

/// ElGamal public key (or key share), y = g^x mod p
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey {
    #[serde(with = "crate::serde_biguint")]
    pub y: BigUint,
}

/// ElGamal private key, x in [1, q-1]
///
/// Only the trustee that generated it should ever hold it.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    #[serde(with = "crate::serde_biguint")]
    pub x: BigUint,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PrivateKey(..)")
    }
}

#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub secret: PrivateKey,
}

impl KeyPair {
    pub fn generate<R: CryptoRng + RngCore>(params: &GroupParameters, rng: &mut R) -> Self {
        let (public, secret) = generate_keypair(params, rng);
        KeyPair { public, secret }
    }
}

/// Generate an ElGamal keypair over the given group
pub fn generate_keypair<R: CryptoRng + RngCore>(
    params: &GroupParameters,
    rng: &mut R,
) -> (PublicKey, PrivateKey) {
    let x = params.random_exponent(rng);
    let y = params.g_pow_secret(&x);
    (PublicKey { y }, PrivateKey { x })
}

impl PublicKey {
    /// Aggregate key: the product of all key shares
    pub fn combine<'a, I>(params: &GroupParameters, keys: I) -> PublicKey
    where
        I: IntoIterator<Item = &'a PublicKey>,
    {
        let y = keys
            .into_iter()
            .fold(BigUint::one(), |acc, key| params.mul(&acc, &key.y));
        PublicKey { y }
    }

    /// Short, stable identifier for the key
    pub fn fingerprint(&self) -> String {
        hash_b64(self.y.to_str_radix(10).as_bytes())
    }

    pub fn is_valid(&self, params: &GroupParameters) -> bool {
        params.is_element(&self.y)
    }

    /// Check a proof that the holder of this key knows its private key
    pub fn verify_possession(
        &self,
        params: &GroupParameters,
        proof: &SchnorrProof,
    ) -> Result<(), Error> {
        if !self.is_valid(params) {
            return Err(Error::InvalidProof(
                "public key is not a group element".to_string(),
            ));
        }
        proof.verify(params, &self.y)
    }
}

impl PrivateKey {
    pub fn public_key(&self, params: &GroupParameters) -> PublicKey {
        PublicKey {
            y: params.g_pow_secret(&self.x),
        }
    }

    /// Prove knowledge of this private key
    pub fn prove_possession<R: CryptoRng + RngCore>(
        &self,
        params: &GroupParameters,
        rng: &mut R,
    ) -> SchnorrProof {
        let public = self.public_key(params);
        SchnorrProof::prove(params, &self.x, &public.y, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_keypair() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(10);

        let (public, secret) = generate_keypair(&params, &mut rng);
        assert!(public.is_valid(&params));
        assert_eq!(secret.public_key(&params), public);
        assert!(secret.x >= BigUint::one() && secret.x < params.q);
        assert_eq!(format!("{:?}", secret), "PrivateKey(..)");

        let other = KeyPair::generate(&params, &mut rng);
        assert_ne!(other.public, public);
        assert_ne!(other.public.fingerprint(), public.fingerprint());
    }

    #[test]
    fn test_combine() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(11);

        let a = KeyPair::generate(&params, &mut rng);
        let b = KeyPair::generate(&params, &mut rng);
        let combined = PublicKey::combine(&params, vec![&a.public, &b.public]);

        let x = (&a.secret.x + &b.secret.x) % &params.q;
        assert_eq!(combined, PrivateKey { x }.public_key(&params));
    }

    #[test]
    fn test_proof_of_possession() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(12);

        let a = KeyPair::generate(&params, &mut rng);
        let b = KeyPair::generate(&params, &mut rng);

        let pok = a.secret.prove_possession(&params, &mut rng);
        a.public.verify_possession(&params, &pok).unwrap();

        let res = b.public.verify_possession(&params, &pok);
        assert!(matches!(res, Err(Error::InvalidProof(_))));
    }
}
