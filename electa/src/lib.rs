#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

mod ballot;
mod config;
mod datatypes;
mod election;
mod elgamal;
mod error;
mod group;
mod hash;
mod jobs;
mod keys;
mod proofs;
mod question;
pub mod serde_biguint;
mod service;
mod store;
mod tally;
mod trustee;

pub use ballot::*;
pub use config::*;
pub use datatypes::*;
pub use election::*;
pub use elgamal::*;
pub use error::*;
pub use group::*;
pub use hash::*;
pub use jobs::*;
pub use keys::*;
pub use proofs::*;
pub use question::*;
pub use service::*;
pub use store::*;
pub use tally::*;
pub use trustee::*;

/// Re-exported so callers can build group elements without a direct dependency.
pub use num_bigint::BigUint;
