//! Serde helpers for `BigUint` as base-10 strings.
//!
//! Use with `#[serde(with = "crate::serde_biguint")]`. Deserialization also accepts bare
//! integers, which older payloads used for small values.

use num_bigint::BigUint;
use num_traits::Num;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StringOrUint {
    String(String),
    Uint(u64),
}

impl StringOrUint {
    fn into_biguint<E: de::Error>(self) -> Result<BigUint, E> {
        match self {
            StringOrUint::String(s) => BigUint::from_str_radix(s.trim(), 10).map_err(E::custom),
            StringOrUint::Uint(u) => Ok(BigUint::from(u)),
        }
    }
}

pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    value.to_str_radix(10).serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    let su: StringOrUint = Deserialize::deserialize(deserializer)?;
    su.into_biguint()
}

/// `Vec<BigUint>`
pub mod vec {
    use super::*;

    pub fn serialize<S>(values: &[BigUint], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let strings: Vec<String> = values.iter().map(|v| v.to_str_radix(10)).collect();
        strings.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<BigUint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items: Vec<StringOrUint> = Deserialize::deserialize(deserializer)?;
        items.into_iter().map(StringOrUint::into_biguint).collect()
    }
}

/// `Vec<Vec<BigUint>>`, one row per question
pub mod vec_vec {
    use super::*;

    pub fn serialize<S>(values: &[Vec<BigUint>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let strings: Vec<Vec<String>> = values
            .iter()
            .map(|row| row.iter().map(|v| v.to_str_radix(10)).collect())
            .collect();
        strings.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<BigUint>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rows: Vec<Vec<StringOrUint>> = Deserialize::deserialize(deserializer)?;
        rows.into_iter()
            .map(|row| row.into_iter().map(StringOrUint::into_biguint).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wrapper {
        #[serde(with = "crate::serde_biguint")]
        n: BigUint,
        #[serde(with = "crate::serde_biguint::vec")]
        ns: Vec<BigUint>,
    }

    #[test]
    fn test_decimal_strings() {
        let w = Wrapper {
            n: BigUint::from(12345678901234567890u64) * BigUint::from(1000u32),
            ns: vec![BigUint::from(1u32), BigUint::from(2u32)],
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"n":"12345678901234567890000","ns":["1","2"]}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn test_accepts_bare_integers() {
        let w: Wrapper = serde_json::from_str(r#"{"n": 7, "ns": ["3", 4]}"#).unwrap();
        assert_eq!(w.n, BigUint::from(7u32));
        assert_eq!(w.ns, vec![BigUint::from(3u32), BigUint::from(4u32)]);

        assert!(serde_json::from_str::<Wrapper>(r#"{"n": "12a", "ns": []}"#).is_err());
    }
}
