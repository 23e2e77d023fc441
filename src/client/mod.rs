//! The client state machine of a secure aggregation round.
//!
//! A [`SecAggClient`] drives one client through the four stages of one round:
//!
//! ```text
//! SETUP --receive_peer_public_keys--> SHARE_KEYS
//! SHARE_KEYS --generate_encrypted_shares, receive_encrypted_shares--> COLLECT_MASKED_VECTORS
//! COLLECT_MASKED_VECTORS --mask_model_update--> UNMASK
//! UNMASK --reveal_shares_for_dropped | complete--> COMPLETED
//! ```
//!
//! The client performs no IO. All payloads are handed to and returned from its methods, and a
//! coordination layer is responsible for exchanging them with the server.

#[allow(clippy::module_inception)]
mod client;
mod error;
mod stage;
mod state;
#[cfg(test)]
mod tests;

pub use self::{client::SecAggClient, error::ClientError, stage::Stage};
