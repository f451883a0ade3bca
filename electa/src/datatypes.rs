use crate::*;
use num_bigint::BigUint;
use uuid::Uuid;

/// Every serializable value, tagged with the schema it was written in.
///
/// The wire shape is `{"datatype": "<tag>", "value": {...}}`. Tags are never retired: values
/// written under an old tag must always decode. `upgrade` turns legacy values into their current
/// form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "datatype", content = "value")]
pub enum Datatype {
    #[serde(rename = "2011/01/Election")]
    Election(Election),

    #[serde(rename = "2011/01/EncryptedVote")]
    EncryptedVote(EncryptedVote),

    #[serde(rename = "legacy/EncryptedVote")]
    LegacyEncryptedVote(LegacyEncryptedVote),

    #[serde(rename = "2011/01/CastVote")]
    CastVote(CastVote),

    #[serde(rename = "2011/01/Trustee")]
    Trustee(Trustee),

    #[serde(rename = "legacy/Trustee")]
    LegacyTrustee(LegacyTrustee),

    #[serde(rename = "pkc/elgamal/PublicKey")]
    PublicKey(ElGamalPublicKey),

    #[serde(rename = "pkc/elgamal/Ciphertext")]
    Ciphertext(Ciphertext),

    #[serde(rename = "pkc/elgamal/DLogProof")]
    DLogProof(SchnorrProof),

    #[serde(rename = "legacy/EGZKProof")]
    EGZKProof(ChaumPedersenProof),

    #[serde(rename = "legacy/EGZKDisjunctiveProof")]
    EGZKDisjunctiveProof(DisjunctiveProof),

    #[serde(rename = "legacy/EGZKProofCommitment")]
    EGZKProofCommitment(Commitment),

    #[serde(rename = "2011/01/Tally")]
    Tally(Tally),
}

const KNOWN_TAGS: [&str; 13] = [
    "2011/01/Election",
    "2011/01/EncryptedVote",
    "legacy/EncryptedVote",
    "2011/01/CastVote",
    "2011/01/Trustee",
    "legacy/Trustee",
    "pkc/elgamal/PublicKey",
    "pkc/elgamal/Ciphertext",
    "pkc/elgamal/DLogProof",
    "legacy/EGZKProof",
    "legacy/EGZKDisjunctiveProof",
    "legacy/EGZKProofCommitment",
    "2011/01/Tally",
];

/// A public key that carries its own group, as older payloads stored it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ElGamalPublicKey {
    #[serde(with = "crate::serde_biguint")]
    pub g: BigUint,

    #[serde(with = "crate::serde_biguint")]
    pub p: BigUint,

    #[serde(with = "crate::serde_biguint")]
    pub q: BigUint,

    #[serde(with = "crate::serde_biguint")]
    pub y: BigUint,
}

impl ElGamalPublicKey {
    pub fn new(params: &GroupParameters, public_key: &PublicKey) -> Self {
        ElGamalPublicKey {
            g: params.g.clone(),
            p: params.p.clone(),
            q: params.q.clone(),
            y: public_key.y.clone(),
        }
    }

    pub fn params(&self) -> GroupParameters {
        GroupParameters {
            p: self.p.clone(),
            q: self.q.clone(),
            g: self.g.clone(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey { y: self.y.clone() }
    }
}

/// Encrypted vote as written before votes carried a format version.
///
/// Audited (spoiled) ballots also carried their plaintext and randomness inline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyEncryptedVote {
    pub election_uuid: Uuid,
    pub election_hash: String,
    pub answers: Vec<LegacyEncryptedAnswer>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyEncryptedAnswer {
    pub choices: Vec<Ciphertext>,
    pub individual_proofs: Vec<DisjunctiveProof>,
    pub overall_proof: DisjunctiveProof,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Vec<usize>>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(with = "legacy_randomness")]
    pub randomness: Option<Vec<BigUint>>,
}

/// Trustee as written before the group moved out of the key
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyTrustee {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub public_key: ElGamalPublicKey,
    pub public_key_hash: String,
    pub pok: SchnorrProof,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(with = "legacy_factors")]
    pub decryption_factors: Option<Vec<Vec<BigUint>>>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decryption_proofs: Option<Vec<Vec<ChaumPedersenProof>>>,
}

mod legacy_randomness {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    struct Wrapped(#[serde(with = "crate::serde_biguint::vec")] Vec<BigUint>);

    pub fn serialize<S: Serializer>(value: &Option<Vec<BigUint>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => crate::serde_biguint::vec::serialize(v, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<BigUint>>, D::Error> {
        Ok(Option::<Wrapped>::deserialize(d)?.map(|w| w.0))
    }
}

mod legacy_factors {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    struct Wrapped(#[serde(with = "crate::serde_biguint::vec_vec")] Vec<Vec<BigUint>>);

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<Vec<BigUint>>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => crate::serde_biguint::vec_vec::serialize(v, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Vec<Vec<BigUint>>>, D::Error> {
        Ok(Option::<Wrapped>::deserialize(d)?.map(|w| w.0))
    }
}

impl From<LegacyEncryptedVote> for EncryptedVote {
    fn from(legacy: LegacyEncryptedVote) -> Self {
        EncryptedVote {
            election_uuid: legacy.election_uuid,
            election_hash: legacy.election_hash,
            answers: legacy
                .answers
                .into_iter()
                .map(|a| EncryptedAnswer {
                    choices: a.choices,
                    individual_proofs: a.individual_proofs,
                    overall_proof: a.overall_proof,
                })
                .collect(),
        }
    }
}

impl From<LegacyTrustee> for Trustee {
    fn from(legacy: LegacyTrustee) -> Self {
        let decryption = match (legacy.decryption_factors, legacy.decryption_proofs) {
            (Some(decryption_factors), Some(decryption_proofs)) => Some(PartialDecryption {
                decryption_factors,
                decryption_proofs,
            }),
            _ => None,
        };
        Trustee {
            uuid: legacy.uuid,
            name: legacy.name,
            email: legacy.email,
            public_key: Some(legacy.public_key.public_key()),
            public_key_hash: Some(legacy.public_key_hash),
            pok: Some(legacy.pok),
            decryption,
            secret_key: None,
        }
    }
}

impl Datatype {
    /// The tag this value is written under
    pub fn tag(&self) -> &'static str {
        match self {
            Datatype::Election(_) => "2011/01/Election",
            Datatype::EncryptedVote(_) => "2011/01/EncryptedVote",
            Datatype::LegacyEncryptedVote(_) => "legacy/EncryptedVote",
            Datatype::CastVote(_) => "2011/01/CastVote",
            Datatype::Trustee(_) => "2011/01/Trustee",
            Datatype::LegacyTrustee(_) => "legacy/Trustee",
            Datatype::PublicKey(_) => "pkc/elgamal/PublicKey",
            Datatype::Ciphertext(_) => "pkc/elgamal/Ciphertext",
            Datatype::DLogProof(_) => "pkc/elgamal/DLogProof",
            Datatype::EGZKProof(_) => "legacy/EGZKProof",
            Datatype::EGZKDisjunctiveProof(_) => "legacy/EGZKDisjunctiveProof",
            Datatype::EGZKProofCommitment(_) => "legacy/EGZKProofCommitment",
            Datatype::Tally(_) => "2011/01/Tally",
        }
    }

    /// Every tag that can be decoded
    pub fn known_tags() -> &'static [&'static str] {
        &KNOWN_TAGS
    }

    pub fn is_legacy(&self) -> bool {
        self.tag().starts_with("legacy/")
    }

    /// Decode an untagged value whose type is known from context
    pub fn from_dict(value: serde_json::Value, type_hint: &str) -> Result<Self, Error> {
        if !KNOWN_TAGS.contains(&type_hint) {
            return Err(Error::UnknownDatatype(type_hint.to_string()));
        }
        let tagged = serde_json::json!({
            "datatype": type_hint,
            "value": value,
        });
        Ok(serde_json::from_value(tagged)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("electa: Unexpected error serializing datatype")
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, Error> {
        if let Some(tag) = value.get("datatype").and_then(|t| t.as_str()) {
            if !KNOWN_TAGS.contains(&tag) {
                return Err(Error::UnknownDatatype(tag.to_string()));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Pack into bytes (CBOR)
    pub fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("electa: Unexpected error packing datatype")
    }

    /// Unpack from bytes, accepting either CBOR or JSON
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        match bytes.first() {
            None => Err(Error::DeserializationUnknownFormat),
            // If it starts with `{` then it's JSON
            Some(b'{') => {
                let json = std::str::from_utf8(bytes)
                    .map_err(|_| Error::DeserializationUnknownFormat)?;
                Self::from_json(json)
            }
            Some(_) => Ok(serde_cbor::from_slice(bytes)?),
        }
    }

    /// Convert legacy values to their current form. Current values are returned unchanged.
    pub fn upgrade(self) -> Self {
        match self {
            Datatype::LegacyEncryptedVote(vote) => Datatype::EncryptedVote(vote.into()),
            Datatype::LegacyTrustee(trustee) => Datatype::Trustee(trustee.into()),
            other => other,
        }
    }
}

macro_rules! impl_from_datatype {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Datatype {
                fn from(item: $ty) -> Self {
                    Datatype::$variant(item)
                }
            }
        )*
    };
}

impl_from_datatype! {
    Election => Election,
    EncryptedVote => EncryptedVote,
    LegacyEncryptedVote => LegacyEncryptedVote,
    CastVote => CastVote,
    Trustee => Trustee,
    LegacyTrustee => LegacyTrustee,
    PublicKey => ElGamalPublicKey,
    Ciphertext => Ciphertext,
    DLogProof => SchnorrProof,
    EGZKProof => ChaumPedersenProof,
    EGZKDisjunctiveProof => DisjunctiveProof,
    EGZKProofCommitment => Commitment,
    Tally => Tally,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn roundtrip(item: Datatype) {
        let json = item.to_json();
        assert_eq!(Datatype::from_json(&json).unwrap(), item);
        assert_eq!(Datatype::from_bytes(json.as_bytes()).unwrap(), item);
        assert_eq!(Datatype::from_bytes(&item.as_bytes()).unwrap(), item);
        assert!(json.contains(item.tag()));
    }

    #[test]
    fn test_roundtrip_every_tag() {
        let mut rng = ChaCha20Rng::seed_from_u64(80);
        let mut election = Election::new(GroupParameters::testing(), "e", "Election");
        election
            .add_question(Question::new("q", "Pick", &["a", "b"]).with_bounds(0, Some(1)))
            .unwrap();
        election.generate_default_trustee(&mut rng).unwrap();
        election.add_voter("alice", "Alice").unwrap();
        election.freeze().unwrap();

        let params = election.params.clone();
        let pk = election.public_key.clone().unwrap();
        let (vote, _) = EncryptedVote::encrypt(&election, &[vec![1]], &mut rng).unwrap();
        let voter = election.voters[0].clone();
        let cast = CastVote::new(&voter, vote.clone());
        let tally = Tally::compute(&params, &election.questions, &[vote.clone()]).unwrap();
        let trustee = election.trustees[0].clone();
        let answer = vote.answers[0].clone();
        let proof = answer.individual_proofs[0].clone();

        let legacy_vote = LegacyEncryptedVote {
            election_uuid: vote.election_uuid,
            election_hash: vote.election_hash.clone(),
            answers: vec![LegacyEncryptedAnswer {
                choices: answer.choices.clone(),
                individual_proofs: answer.individual_proofs.clone(),
                overall_proof: answer.overall_proof.clone(),
                answer: Some(vec![1]),
                randomness: Some(vec![BigUint::from(5u32), BigUint::from(6u32)]),
            }],
        };
        let legacy_trustee = LegacyTrustee {
            uuid: trustee.uuid,
            name: trustee.name.clone(),
            email: trustee.email.clone(),
            public_key: ElGamalPublicKey::new(&params, trustee.public_key.as_ref().unwrap()),
            public_key_hash: trustee.public_key_hash.clone().unwrap(),
            pok: trustee.pok.clone().unwrap(),
            decryption_factors: None,
            decryption_proofs: None,
        };

        let items: Vec<Datatype> = vec![
            election.clone().into(),
            vote.clone().into(),
            legacy_vote.into(),
            cast.into(),
            trustee.without_secret().into(),
            legacy_trustee.into(),
            ElGamalPublicKey::new(&params, &pk).into(),
            answer.choices[0].clone().into(),
            trustee.pok.clone().unwrap().into(),
            proof.0[0].clone().into(),
            proof.clone().into(),
            proof.0[0].commitment.clone().into(),
            tally.into(),
        ];

        let mut tags: Vec<&str> = items.iter().map(|i| i.tag()).collect();
        tags.sort();
        let mut known = Datatype::known_tags().to_vec();
        known.sort();
        assert_eq!(tags, known);

        for item in items {
            roundtrip(item);
        }
    }

    #[test]
    fn test_legacy_upgrade() {
        let mut rng = ChaCha20Rng::seed_from_u64(81);
        let params = GroupParameters::testing();
        let mut trustee = Trustee::new("Alice", "alice@example.com");
        trustee.generate_key(&params, &mut rng).unwrap();
        let public_key = trustee.public_key.clone().unwrap();
        let pok = trustee.pok.clone().unwrap();

        // Old payloads used bare integers for small values
        let json = serde_json::json!({
            "datatype": "legacy/Trustee",
            "value": {
                "uuid": trustee.uuid.to_string(),
                "name": "Alice",
                "email": "alice@example.com",
                "public_key": {
                    "g": 4,
                    "p": params.p.to_string(),
                    "q": params.q.to_string(),
                    "y": public_key.y.to_string(),
                },
                "public_key_hash": public_key.fingerprint(),
                "pok": serde_json::to_value(&pok).unwrap(),
            }
        });

        let decoded = Datatype::from_json(&json.to_string()).unwrap();
        assert!(decoded.is_legacy());
        match decoded.upgrade() {
            Datatype::Trustee(upgraded) => {
                assert_eq!(upgraded.public_key, Some(public_key.clone()));
                assert_eq!(upgraded.pok, Some(pok));
                assert!(upgraded.decryption.is_none());
                upgraded
                    .public_key
                    .unwrap()
                    .verify_possession(&params, upgraded.pok.as_ref().unwrap())
                    .unwrap();
            }
            other => panic!("unexpected upgrade result {}", other.tag()),
        }

        // Current values are untouched
        let ct = Datatype::Ciphertext(Ciphertext::identity());
        assert_eq!(ct.clone().upgrade(), ct);
    }

    #[test]
    fn test_from_dict() {
        let commitment = serde_json::json!({"A": "3", "B": 5});
        match Datatype::from_dict(commitment, "legacy/EGZKProofCommitment").unwrap() {
            Datatype::EGZKProofCommitment(c) => {
                assert_eq!(c.a, BigUint::from(3u32));
                assert_eq!(c.b, BigUint::from(5u32));
            }
            other => panic!("unexpected {}", other.tag()),
        }

        let res = Datatype::from_dict(serde_json::json!({}), "2099/01/Nope");
        assert!(matches!(res, Err(Error::UnknownDatatype(_))));
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(
            Datatype::from_bytes(&[]),
            Err(Error::DeserializationUnknownFormat)
        ));
        assert!(matches!(
            Datatype::from_json(r#"{"datatype": "2099/01/Nope", "value": {}}"#),
            Err(Error::UnknownDatatype(_))
        ));
        assert!(Datatype::from_json(r#"{"datatype": "pkc/elgamal/Ciphertext", "value": {}}"#).is_err());
        assert!(Datatype::from_bytes(&[0xff, 0x00, 0x13]).is_err());
    }
}
