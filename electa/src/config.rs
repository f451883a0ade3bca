use crate::*;
use num_traits::Num;
use std::env::var;

/// Deployment configuration for an `ElectionService`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Group used by every election the service creates
    pub params: GroupParameters,

    /// Generate a platform-held trustee for new elections
    pub default_trustee: bool,

    /// Publish voter aliases instead of voter identifiers
    pub use_voter_aliases: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            params: GroupParameters::default(),
            default_trustee: true,
            use_voter_aliases: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let params = match var("ELECTA_GROUP") {
            Ok(val) => match val.as_str() {
                "default" | "helios" => GroupParameters::default(),
                "rfc3526" => GroupParameters::rfc3526_2048(),
                "testing" => GroupParameters::testing(),
                "custom" => GroupParameters::new(
                    env_uint("ELECTA_GROUP_P")?,
                    env_uint("ELECTA_GROUP_Q")?,
                    env_uint("ELECTA_GROUP_G")?,
                )
                .map_err(|e| Error::Config(e.to_string()))?,
                other => {
                    return Err(Error::Config(format!(
                        "ELECTA_GROUP must be one of default, rfc3526, testing or custom, got {}",
                        other
                    )))
                }
            },
            Err(_e) => GroupParameters::default(),
        };

        let default_trustee = match var("ELECTA_DEFAULT_TRUSTEE") {
            Ok(val) => parse_bool("ELECTA_DEFAULT_TRUSTEE", &val)?,
            Err(_e) => true,
        };

        let use_voter_aliases = match var("ELECTA_VOTER_ALIASES") {
            Ok(val) => parse_bool("ELECTA_VOTER_ALIASES", &val)?,
            Err(_e) => false,
        };

        Ok(Config {
            params,
            default_trustee,
            use_voter_aliases,
        })
    }
}

fn env_uint(name: &str) -> Result<BigUint, Error> {
    let val = var(name)
        .map_err(|_| Error::Config(format!("{} environment variable must be set", name)))?;
    parse_uint(name, &val)
}

fn parse_uint(name: &str, val: &str) -> Result<BigUint, Error> {
    let val = val.trim();
    let parsed = match val.strip_prefix("0x") {
        Some(hex) => BigUint::from_str_radix(hex, 16),
        None => BigUint::from_str_radix(val, 10),
    };
    parsed.map_err(|_| Error::Config(format!("{} is not an integer: {}", name, val)))
}

fn parse_bool(name: &str, val: &str) -> Result<bool, Error> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{} must be a boolean, got {}", name, other))),
    }
}
