use crate::*;
use crypto_bigint::modular::runtime_mod::{DynResidue, DynResidueParams};
use crypto_bigint::{Uint, U1024, U2048, U4096};
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};

/// Miller-Rabin rounds used when validating parameters
const PRIMALITY_ROUNDS: usize = 40;

const SMALL_PRIMES: [u32; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

const HELIOS_P: &str = "16328632084933010002384055033805457329601614771185955389739167309086214800406465799038583634953752941675645562182498120750264980492381375579367675648771293800310370964745767014243638518442553823973482995267304044326777047662957480269391322789378384619428596446446984694306187644767462460965622580087564339212631775817895958409016676398975671266179637898557687317076177218843233150695157881061257053019133078545928983562221396313169622475509818442661047018436264806901023966236718367204710755935899013750306107738002364137917426595737403871114187750804346564731250609196846638183903982387884578266136503697493474682071";
const HELIOS_Q: &str =
    "61329566248342901292543872769978950870633559608669337131139375508370458778917";
const HELIOS_G: &str = "14887492224963187634282421537186040801304008017743492304481737382571933937568724473847106029915040150784031882206090286938661464458896494215273989547889201144857352611058572236578734319505128042602372864570426550855201448111746579871811249114781674309062693442442368697449970648232621880001709535143047913661432883287150003429802392229361583608686643243349727791976247247948618930423866180410558458272606627111270040091203073580238905303994472202930783207472394578498507764703191288249547659899997131166130259700604433891232298182348403175947450284433411265966789131024573629546048637848902243503970966798589660808533";

const RFC3526_2048_P: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7EDEE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3BE39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF6955817183995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// Discrete-log group description: `p` prime, `q | p - 1` prime, `g` generating the
/// order-`q` subgroup of `Z_p^*`.
///
/// Parameters are validated once (at startup or when a service is constructed) and treated as
/// read-only afterwards. Deserializing does not re-validate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GroupParameters {
    #[serde(with = "crate::serde_biguint")]
    pub p: BigUint,

    #[serde(with = "crate::serde_biguint")]
    pub q: BigUint,

    #[serde(with = "crate::serde_biguint")]
    pub g: BigUint,
}

impl GroupParameters {
    /// Create and validate a new group
    pub fn new(p: BigUint, q: BigUint, g: BigUint) -> Result<Self, Error> {
        let params = GroupParameters { p, q, g };
        params.validate()?;
        Ok(params)
    }

    /// 2048-bit RFC 3526 MODP group (group 14). Safe prime, so `q = (p - 1) / 2`.
    pub fn rfc3526_2048() -> Self {
        let p = BigUint::parse_bytes(RFC3526_2048_P.as_bytes(), 16)
            .expect("electa: Unexpected error parsing built-in group");
        let q = (&p - 1u32) >> 1;
        GroupParameters {
            p,
            q,
            g: BigUint::from(2u32),
        }
    }

    /// Tiny 65-bit safe-prime group. Only suitable for tests and demos.
    pub fn testing() -> Self {
        GroupParameters {
            p: BigUint::from(18446744073709579247u128),
            q: BigUint::from(9223372036854789623u64),
            g: BigUint::from(4u32),
        }
    }

    /// Check that the parameters describe a usable prime-order subgroup
    pub fn validate(&self) -> Result<(), Error> {
        let bad = |reason: &str| Err(Error::InvalidParameters(reason.to_string()));

        if self.p.bits() > 4096 {
            return bad("p is larger than 4096 bits");
        }
        if !is_probable_prime(&self.p, PRIMALITY_ROUNDS) {
            return bad("p is not prime");
        }
        if !is_probable_prime(&self.q, PRIMALITY_ROUNDS) {
            return bad("q is not prime");
        }
        if !(&self.p - 1u32).is_multiple_of(&self.q) {
            return bad("q does not divide p - 1");
        }
        if self.g <= BigUint::one() || self.g >= self.p {
            return bad("g is not in the range (1, p)");
        }
        // q is prime and g != 1, so g^q = 1 means g has order exactly q
        if !self.g.modpow(&self.q, &self.p).is_one() {
            return bad("g does not generate the order-q subgroup");
        }

        Ok(())
    }

    /// Is `x` a member of the order-q subgroup?
    pub fn is_element(&self, x: &BigUint) -> bool {
        !x.is_zero() && x < &self.p && x.modpow(&self.q, &self.p).is_one()
    }

    /// Is `x` a reduced exponent?
    pub fn is_exponent(&self, x: &BigUint) -> bool {
        x < &self.q
    }

    /// Uniform exponent in [1, q-1]
    pub fn random_exponent<R: CryptoRng + RngCore>(&self, rng: &mut R) -> BigUint {
        rng.gen_biguint_range(&BigUint::one(), &self.q)
    }

    /// Variable-time exponentiation. Only use with public exponents.
    pub fn pow(&self, base: &BigUint, exp: &BigUint) -> BigUint {
        base.modpow(exp, &self.p)
    }

    /// Constant-time exponentiation for secret exponents (keys, nonces, randomness).
    ///
    /// `base` must be a subgroup element; the exponent is reduced mod q.
    pub fn pow_secret(&self, base: &BigUint, exp: &BigUint) -> BigUint {
        let base = base % &self.p;
        let exp = exp % &self.q;
        let exp_bits = self.q.bits() as usize;

        match self.p.bits() {
            0..=1024 => ct_pow::<{ U1024::LIMBS }>(&base, &exp, &self.p, exp_bits),
            1025..=2048 => ct_pow::<{ U2048::LIMBS }>(&base, &exp, &self.p, exp_bits),
            _ => ct_pow::<{ U4096::LIMBS }>(&base, &exp, &self.p, exp_bits),
        }
    }

    /// g^m for a public (small) plaintext
    pub fn g_pow(&self, m: u64) -> BigUint {
        self.g.modpow(&BigUint::from(m), &self.p)
    }

    /// g^x for a secret exponent
    pub fn g_pow_secret(&self, x: &BigUint) -> BigUint {
        self.pow_secret(&self.g, x)
    }

    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.p
    }

    /// Multiplicative inverse mod p (p prime)
    pub fn inverse(&self, x: &BigUint) -> BigUint {
        x.modpow(&(&self.p - 2u32), &self.p)
    }

    /// a / b mod p
    pub fn div(&self, a: &BigUint, b: &BigUint) -> BigUint {
        self.mul(a, &self.inverse(b))
    }
}

impl Default for GroupParameters {
    /// The 2048-bit p / 256-bit q group the platform has always shipped with
    fn default() -> Self {
        let parse = |s: &str| {
            BigUint::parse_bytes(s.as_bytes(), 10)
                .expect("electa: Unexpected error parsing built-in group")
        };
        GroupParameters {
            p: parse(HELIOS_P),
            q: parse(HELIOS_Q),
            g: parse(HELIOS_G),
        }
    }
}

/// Miller-Rabin probabilistic primality test
pub(crate) fn is_probable_prime(n: &BigUint, rounds: usize) -> bool {
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }
    for &sp in SMALL_PRIMES.iter() {
        let sp = BigUint::from(sp);
        if n == &sp {
            return true;
        }
        if (n % &sp).is_zero() {
            return false;
        }
    }

    let mut rng = rand::thread_rng();
    let n_minus_1 = n - 1u32;
    let (s, d) = factor_powers_of_two(&n_minus_1);

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_1);
        let mut x = a.modpow(&d, n);

        if x.is_one() || x == n_minus_1 {
            continue;
        }

        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// n = 2^s * d with d odd
fn factor_powers_of_two(n: &BigUint) -> (u64, BigUint) {
    let s = n.trailing_zeros().unwrap_or(0);
    (s, n >> s)
}

fn to_uint<const LIMBS: usize>(n: &BigUint) -> Uint<LIMBS> {
    let bytes = n.to_bytes_be();
    let mut buf = vec![0u8; Uint::<LIMBS>::BYTES];
    let offset = buf.len() - bytes.len();
    buf[offset..].copy_from_slice(&bytes);
    Uint::<LIMBS>::from_be_slice(&buf)
}

fn from_uint<const LIMBS: usize>(n: &Uint<LIMBS>) -> BigUint {
    // words are little-endian
    let mut bytes = Vec::with_capacity(Uint::<LIMBS>::BYTES);
    for word in n.as_words().iter().rev() {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    BigUint::from_bytes_be(&bytes)
}

fn ct_pow<const LIMBS: usize>(
    base: &BigUint,
    exp: &BigUint,
    modulus: &BigUint,
    exp_bits: usize,
) -> BigUint {
    let params = DynResidueParams::new(&to_uint::<LIMBS>(modulus));
    let base = DynResidue::new(&to_uint::<LIMBS>(base), params);
    let result = base.pow_bounded_exp(&to_uint::<LIMBS>(exp), exp_bits);
    from_uint(&result.retrieve())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_builtin_groups_validate() {
        GroupParameters::testing().validate().unwrap();
        GroupParameters::rfc3526_2048().validate().unwrap();
        GroupParameters::default().validate().unwrap();
        assert_eq!(GroupParameters::default().q.bits(), 256);
    }

    #[test]
    fn test_invalid_groups() {
        let t = GroupParameters::testing();

        // composite p
        let res = GroupParameters::new(&t.p + 2u32, t.q.clone(), t.g.clone());
        assert!(matches!(res, Err(Error::InvalidParameters(_))));

        // q does not divide p - 1
        let res = GroupParameters::new(t.p.clone(), BigUint::from(101u32), t.g.clone());
        assert!(matches!(res, Err(Error::InvalidParameters(_))));

        // g = p - 1 has order 2, not q
        let res = GroupParameters::new(t.p.clone(), t.q.clone(), &t.p - 1u32);
        assert!(matches!(res, Err(Error::InvalidParameters(_))));

        let res = GroupParameters::new(t.p.clone(), t.q.clone(), BigUint::one());
        assert!(matches!(res, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn test_constant_time_pow_matches_modpow() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for params in [GroupParameters::testing(), GroupParameters::default()].iter() {
            for _ in 0..4 {
                let x = params.random_exponent(&mut rng);
                assert_eq!(params.g_pow_secret(&x), params.g.modpow(&x, &params.p));
            }
            assert!(params.g_pow_secret(&BigUint::zero()).is_one());
        }
    }

    #[test]
    fn test_elements() {
        let params = GroupParameters::testing();
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let x = params.random_exponent(&mut rng);
        let y = params.g_pow_secret(&x);

        assert!(params.is_element(&y));
        assert!(!params.is_element(&BigUint::zero()));
        assert!(!params.is_element(&params.p));
        assert!(!params.is_element(&(&params.p - 1u32)));

        assert!(params.mul(&y, &params.inverse(&y)).is_one());
        assert_eq!(params.g_pow(3), params.pow(&params.g, &BigUint::from(3u32)));
    }

    #[test]
    fn test_primality() {
        assert!(is_probable_prime(&BigUint::from(2u32), 10));
        assert!(is_probable_prime(&BigUint::from(7919u32), 10));
        assert!(!is_probable_prime(&BigUint::from(7917u32), 10));
        assert!(!is_probable_prime(&BigUint::from(561u32), 10));
        assert!(!is_probable_prime(&BigUint::one(), 10));
    }
}
