#![cfg_attr(docsrs, feature(doc_cfg))]
//! # SecAgg+ client engine
//!
//! ###### tags: Federated Learning, Secure Aggregation, Privacy, edge AI, mobile AI
//!
//! Many devices each hold a private update of a machine learning model. The coordinating server
//! should only ever learn the *sum* of those updates, never the update of a single device, and
//! it should still be able to compute that sum when some devices drop out in the middle of a
//! round. This crate is the client side of such a secure aggregation round.
//!
//! The engine is made of a handful of exact mathematical building blocks which must agree
//! byte-for-byte with every other device and with the server:
//!
//! - **Secret sharing** ([`sharing`]): Shamir's scheme over the Mersenne prime field
//!   `2^127 - 1`. A client shares the seed of its private mask so that the server can
//!   reconstruct it from any `threshold` surviving peers.
//! - **Masking** ([`mask`]): a counter-mode `SHA256` PRG for the private self mask, pairwise masks
//!   derived from `X25519` shared secrets which cancel out in the sum, and the stochastic
//!   quantization of float updates into the masking group.
//! - **Crypto** ([`crypto`]): thin wrappers around the [sodiumoxide] primitives.
//! - **Client** ([`client`]): the state machine which drives one client through the four
//!   protocol stages of one round.
//!
//! The engine never performs any IO. Public keys, encrypted shares and masked vectors are plain
//! byte payloads that a transport layer delivers to and from the coordinator.
//!
//! ```
//! # use secagg_client::{client::SecAggClient, common::SessionConfig};
//! let config = SessionConfig::new("session", 1, 2, 3, 1);
//! let client = SecAggClient::new(config).unwrap();
//! let public_key = client.public_key();
//! ```
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/

pub mod client;
pub mod common;
pub mod crypto;
pub mod mask;
pub mod settings;
pub mod sharing;

use std::collections::HashMap;

use thiserror::Error;

use self::{
    crypto::{ExchangeKeyPair, PublicExchangeKey},
    sharing::EncryptedShare,
};

#[derive(Error, Debug)]
#[error("initialization failed: insufficient system entropy to generate secrets")]
/// An error related to insufficient system entropy for secrets at program startup.
pub struct InitError;

/// Initializes the crypto layer.
///
/// This is called when a client is created, but it is safe to call it more than once.
///
/// # Errors
/// Fails if [sodiumoxide] could not be initialized.
///
/// [sodiumoxide]: https://docs.rs/sodiumoxide/
pub fn init() -> Result<(), InitError> {
    sodiumoxide::init().map_err(|_| InitError)
}

/// The 1-based index of a participant within a round. It doubles as the x-coordinate of the
/// shares that the participant holds.
pub type ParticipantIndex = u32;

/// The ephemeral key pair of a participant for one round.
pub type KeyPair = ExchangeKeyPair;

/// The public key a participant distributes to its peers.
pub type ParticipantPublicKey = PublicExchangeKey;

/// The public keys of the peers of a round, received through the coordinator.
pub type PeerPublicKeys = HashMap<ParticipantIndex, ParticipantPublicKey>;

/// Encrypted share bundles, keyed by the index of the peer they are exchanged with.
///
/// Outgoing dictionaries are keyed by recipient, incoming ones by sender.
pub type EncryptedShares = HashMap<ParticipantIndex, EncryptedShare>;

/// Serialized share bundles revealed to the server, keyed by the index of the participant whose
/// seed they belong to.
pub type RevealedShares = HashMap<ParticipantIndex, Vec<u8>>;
