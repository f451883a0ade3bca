use crate::*;
use num_bigint::BigUint;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use std::collections::HashMap;

/// Exponential ElGamal ciphertext: alpha = g^r, beta = g^m * y^r
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ciphertext {
    #[serde(with = "crate::serde_biguint")]
    pub alpha: BigUint,

    #[serde(with = "crate::serde_biguint")]
    pub beta: BigUint,
}

/// Encrypt plaintext `m` under `pk` with explicit randomness `r`
pub fn encrypt(params: &GroupParameters, pk: &PublicKey, m: u64, r: &BigUint) -> Ciphertext {
    let alpha = params.g_pow_secret(r);
    let beta = params.mul(&params.g_pow(m), &params.pow_secret(&pk.y, r));
    Ciphertext { alpha, beta }
}

/// Homomorphic addition: the result decrypts to the sum of the plaintexts
pub fn combine(params: &GroupParameters, c1: &Ciphertext, c2: &Ciphertext) -> Ciphertext {
    Ciphertext {
        alpha: params.mul(&c1.alpha, &c2.alpha),
        beta: params.mul(&c1.beta, &c2.beta),
    }
}

impl Ciphertext {
    /// Encryption of zero with no randomness, the identity for `combine`
    pub fn identity() -> Self {
        Ciphertext {
            alpha: BigUint::one(),
            beta: BigUint::one(),
        }
    }

    /// Encrypt with fresh randomness, returning the randomness alongside
    pub fn encrypt_random<R: CryptoRng + RngCore>(
        params: &GroupParameters,
        pk: &PublicKey,
        m: u64,
        rng: &mut R,
    ) -> (Ciphertext, BigUint) {
        let r = params.random_exponent(rng);
        (encrypt(params, pk, m, &r), r)
    }

    /// Both components lie in the order-q subgroup
    pub fn is_valid(&self, params: &GroupParameters) -> bool {
        params.is_element(&self.alpha) && params.is_element(&self.beta)
    }

    /// Recover the plaintext given the combined decryption factor alpha^x
    pub fn decrypt_with_factor(
        &self,
        params: &GroupParameters,
        factor: &BigUint,
        table: &DLogTable,
    ) -> Result<u64, Error> {
        let g_m = params.div(&self.beta, factor);
        table.lookup(&g_m).ok_or(Error::DecryptionMismatch {
            question: 0,
            answer: 0,
            max: table.max(),
        })
    }

    /// Decrypt with a single private key
    pub fn decrypt(
        &self,
        params: &GroupParameters,
        sk: &PrivateKey,
        table: &DLogTable,
    ) -> Result<u64, Error> {
        let factor = params.pow_secret(&self.alpha, &sk.x);
        self.decrypt_with_factor(params, &factor, table)
    }
}

/// Precomputed g^0 ..= g^max for bounded discrete-log recovery
pub struct DLogTable {
    table: HashMap<BigUint, u64>,
    max: u64,
}

impl DLogTable {
    pub fn new(params: &GroupParameters, max: u64) -> Self {
        let mut table = HashMap::with_capacity(max as usize + 1);
        let mut current = BigUint::one();
        for m in 0..=max {
            table.insert(current.clone(), m);
            current = params.mul(&current, &params.g);
        }
        DLogTable { table, max }
    }

    pub fn lookup(&self, element: &BigUint) -> Option<u64> {
        self.table.get(element).copied()
    }

    pub fn max(&self) -> u64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_encrypt_decrypt() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(20);
        let keys = KeyPair::generate(&params, &mut rng);
        let table = DLogTable::new(&params, 10);

        for m in 0..=10 {
            let (ct, _) = Ciphertext::encrypt_random(&params, &keys.public, m, &mut rng);
            assert!(ct.is_valid(&params));
            assert_eq!(ct.decrypt(&params, &keys.secret, &table).unwrap(), m);
        }
    }

    #[test]
    fn test_homomorphism() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let keys = KeyPair::generate(&params, &mut rng);
        let table = DLogTable::new(&params, 20);

        for (a, b) in [(0, 0), (0, 1), (3, 4), (10, 10)].iter() {
            let (ca, _) = Ciphertext::encrypt_random(&params, &keys.public, *a, &mut rng);
            let (cb, _) = Ciphertext::encrypt_random(&params, &keys.public, *b, &mut rng);
            let sum = combine(&params, &ca, &cb);
            assert_eq!(sum.decrypt(&params, &keys.secret, &table).unwrap(), a + b);

            // order independence and identity
            assert_eq!(sum, combine(&params, &cb, &ca));
            assert_eq!(combine(&params, &sum, &Ciphertext::identity()), sum);
        }
    }

    #[test]
    fn test_out_of_range() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(22);
        let keys = KeyPair::generate(&params, &mut rng);
        let table = DLogTable::new(&params, 2);

        let (ct, _) = Ciphertext::encrypt_random(&params, &keys.public, 3, &mut rng);
        let res = ct.decrypt(&params, &keys.secret, &table);
        assert!(matches!(res, Err(Error::DecryptionMismatch { max: 2, .. })));
    }

    #[test]
    fn test_explicit_randomness() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(23);
        let keys = KeyPair::generate(&params, &mut rng);

        let (ct, r) = Ciphertext::encrypt_random(&params, &keys.public, 1, &mut rng);
        assert_eq!(encrypt(&params, &keys.public, 1, &r), ct);
        assert_ne!(encrypt(&params, &keys.public, 0, &r), ct);
    }
}
