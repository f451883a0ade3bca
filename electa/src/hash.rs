use crate::*;
use digest::Digest;
use num_bigint::BigUint;
use sha2::Sha256;
use uuid::Uuid;

/// Base64 (unpadded) SHA-256, used for ballot hashes, election fingerprints and key fingerprints
pub fn hash_b64(bytes: &[u8]) -> String {
    base64::encode_config(Sha256::digest(bytes), base64::STANDARD_NO_PAD)
}

/// Fiat-Shamir transcript.
///
/// Every item is length-prefixed together with its label, so distinct sequences of
/// appends can never produce the same hash input.
#[derive(Clone)]
pub struct Transcript {
    hasher: Sha256,
}

impl Transcript {
    pub fn new(domain: &str) -> Self {
        let mut transcript = Transcript {
            hasher: Sha256::new(),
        };
        transcript.append_bytes(b"domain", domain.as_bytes());
        transcript
    }

    pub fn append_bytes(&mut self, label: &[u8], bytes: &[u8]) {
        self.hasher.update(&(label.len() as u64).to_be_bytes());
        self.hasher.update(label);
        self.hasher.update(&(bytes.len() as u64).to_be_bytes());
        self.hasher.update(bytes);
    }

    pub fn append_uint(&mut self, label: &[u8], n: &BigUint) {
        self.append_bytes(label, &n.to_bytes_be());
    }

    pub fn append_u64(&mut self, label: &[u8], n: u64) {
        self.append_bytes(label, &n.to_be_bytes());
    }

    pub fn append_ciphertext(&mut self, label: &[u8], ciphertext: &Ciphertext) {
        self.append_bytes(label, b"ciphertext");
        self.append_uint(b"alpha", &ciphertext.alpha);
        self.append_uint(b"beta", &ciphertext.beta);
    }

    /// Finish the transcript, producing a challenge in [0, q)
    pub fn challenge(self, q: &BigUint) -> BigUint {
        BigUint::from_bytes_be(&self.hasher.finalize()) % q
    }
}

/// Public data every proof challenge is bound to
#[derive(Clone, Copy, Debug)]
pub struct ProofContext<'a> {
    pub params: &'a GroupParameters,
    pub public_key: &'a PublicKey,
    pub election_uuid: Uuid,
}

impl<'a> ProofContext<'a> {
    pub fn new(params: &'a GroupParameters, public_key: &'a PublicKey, election_uuid: Uuid) -> Self {
        ProofContext {
            params,
            public_key,
            election_uuid,
        }
    }

    /// Start a transcript that already commits to the group, the key and the election
    pub fn transcript(&self, domain: &str) -> Transcript {
        let mut transcript = Transcript::new(domain);
        transcript.append_uint(b"p", &self.params.p);
        transcript.append_uint(b"q", &self.params.q);
        transcript.append_uint(b"g", &self.params.g);
        transcript.append_uint(b"y", &self.public_key.y);
        transcript.append_bytes(b"election", self.election_uuid.as_bytes());
        transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_b64() {
        // SHA-256("abc")
        assert_eq!(
            hash_b64(b"abc"),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0"
        );
    }

    #[test]
    fn test_transcript_framing() {
        let q = GroupParameters::testing().q;

        let mut a = Transcript::new("test");
        a.append_bytes(b"x", b"ab");
        a.append_bytes(b"x", b"c");

        let mut b = Transcript::new("test");
        b.append_bytes(b"x", b"a");
        b.append_bytes(b"x", b"bc");

        assert_ne!(a.clone().challenge(&q), b.challenge(&q));

        let mut c = Transcript::new("test");
        c.append_bytes(b"x", b"ab");
        c.append_bytes(b"x", b"c");
        assert_eq!(a.challenge(&q), c.challenge(&q));
    }

    #[test]
    fn test_context_binds_election() {
        let params = GroupParameters::testing();
        let pk = PublicKey {
            y: params.g_pow(5),
        };
        let c1 = ProofContext::new(&params, &pk, Uuid::from_u128(1)).transcript("d");
        let c2 = ProofContext::new(&params, &pk, Uuid::from_u128(2)).transcript("d");
        assert_ne!(c1.challenge(&params.q), c2.challenge(&params.q));
    }
}
