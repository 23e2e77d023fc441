use std::collections::HashMap;

use crate::{
    crypto::SharedSecret,
    mask::SelfSeed,
    sharing::ShareBundle,
    KeyPair,
    ParticipantIndex,
    PeerPublicKeys,
};

/// The session material of a client, which lives until the round is completed.
///
/// Dropping the state zeroes the secret key, the seed and the shared secrets. The share bundles
/// hold `BigUint` values, which are not zeroed.
#[derive(Debug)]
pub(crate) struct SessionState {
    /// The ephemeral key pair of the client.
    pub keys: KeyPair,
    /// The seed of the self mask.
    pub seed: SelfSeed,
    /// The material derived per peer.
    pub peers: PeerState,
    /// The share bundle of the seed that the client keeps for itself.
    pub own_bundle: Option<ShareBundle>,
}

impl SessionState {
    pub fn new(keys: KeyPair, seed: SelfSeed) -> Self {
        Self {
            keys,
            seed,
            peers: PeerState::default(),
            own_bundle: None,
        }
    }

    /// Checks whether the seed has been shared already.
    pub fn shares_generated(&self) -> bool {
        self.own_bundle.is_some()
    }
}

/// The material of a client per peer.
///
/// A shared secret exists for a peer if and only if its public key was received.
#[derive(Debug, Default)]
pub(crate) struct PeerState {
    pub public_keys: PeerPublicKeys,
    pub shared_secrets: HashMap<ParticipantIndex, SharedSecret>,
    /// The bundles of the own seed, keyed by recipient.
    pub outgoing: HashMap<ParticipantIndex, ShareBundle>,
    /// The decrypted bundles of the seeds of the peers, keyed by sender.
    pub incoming: HashMap<ParticipantIndex, ShareBundle>,
}
