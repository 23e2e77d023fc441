use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The stages of a client within one round.
///
/// The stages only ever advance, in the order of declaration.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// The client has generated its key pair and seed and waits for the public keys of its
    /// peers.
    #[display(fmt = "SETUP")]
    Setup,
    /// The client exchanges encrypted shares of its seed with its peers.
    #[display(fmt = "SHARE_KEYS")]
    ShareKeys,
    /// The client masks its model update.
    #[display(fmt = "COLLECT_MASKED_VECTORS")]
    CollectMaskedVectors,
    /// The client reveals the shares of the seeds of dropped peers.
    #[display(fmt = "UNMASK")]
    Unmask,
    /// The round is over and the session material is gone.
    #[display(fmt = "COMPLETED")]
    Completed,
}
