use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ParticipantIndex;

/// The default absolute bound on the values of a float update.
pub const DEFAULT_CLIPPING_RANGE: f64 = 3.0;

/// The default upper end of the quantization range.
pub const DEFAULT_TARGET_RANGE: u32 = 1 << 16;

/// The default order of the group in which updates are masked.
pub const DEFAULT_MOD_RANGE: u64 = 1 << 32;

/// The largest supported order of the masking group. Masked elements are 32 bit integers.
pub const MAX_MOD_RANGE: u64 = 1 << 32;

#[derive(Debug, Error, PartialEq, Eq)]
/// Errors related to invalid session parameters.
pub enum InvalidConfigError {
    #[error("a session needs at least one client")]
    NoClients,

    #[error("threshold {threshold} is not within [1, {total_clients}]")]
    Threshold {
        threshold: u32,
        total_clients: u32,
    },

    #[error("client index {index} is not within [1, {total_clients}]")]
    ClientIndex { index: u32, total_clients: u32 },

    #[error("the clipping range must be finite and non-negative")]
    ClippingRange,

    #[error("the mask range must be within [1, 2^32]")]
    ModRange,
}

/// The parameters of one round of one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// The identifier of the session.
    pub session_id: String,
    /// The identifier of the round within the session.
    pub round_id: u64,
    /// The minimal number of shares required to reconstruct a seed.
    pub threshold: u32,
    /// The number of clients taking part in the round.
    pub total_clients: u32,
    /// The 1-based index of this client.
    pub client_index: ParticipantIndex,
    /// Float updates are clipped to `[-clipping_range, clipping_range]`.
    pub clipping_range: f64,
    /// Float updates are quantized to integers in `[0, target_range]`.
    pub target_range: u32,
    /// The order of the group in which updates are masked.
    pub mod_range: u64,
}

impl SessionConfig {
    /// Creates the parameters of a round with the default clipping, quantization and mask
    /// ranges.
    pub fn new(
        session_id: impl Into<String>,
        round_id: u64,
        threshold: u32,
        total_clients: u32,
        client_index: ParticipantIndex,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            round_id,
            threshold,
            total_clients,
            client_index,
            clipping_range: DEFAULT_CLIPPING_RANGE,
            target_range: DEFAULT_TARGET_RANGE,
            mod_range: DEFAULT_MOD_RANGE,
        }
    }

    /// Checks the invariants of the parameters.
    ///
    /// # Errors
    /// Fails if the threshold or the client index are not within `[1, total_clients]`, if the
    /// clipping range is negative or if the mask range is not within `[1, 2^32]`.
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if self.total_clients == 0 {
            return Err(InvalidConfigError::NoClients);
        }
        if !self.contains(self.threshold) {
            return Err(InvalidConfigError::Threshold {
                threshold: self.threshold,
                total_clients: self.total_clients,
            });
        }
        if !self.contains(self.client_index) {
            return Err(InvalidConfigError::ClientIndex {
                index: self.client_index,
                total_clients: self.total_clients,
            });
        }
        if !self.clipping_range.is_finite() || self.clipping_range < 0.0 {
            return Err(InvalidConfigError::ClippingRange);
        }
        if self.mod_range == 0 || self.mod_range > MAX_MOD_RANGE {
            return Err(InvalidConfigError::ModRange);
        }
        Ok(())
    }

    /// Checks whether `index` is a valid participant index for this round.
    pub fn contains(&self, index: ParticipantIndex) -> bool {
        1 <= index && index <= self.total_clients
    }

    /// Gets the bytes which bind the pairwise masks to this round: the UTF-8 session id followed
    /// by the big endian round id.
    pub fn context(&self) -> Vec<u8> {
        let mut context = Vec::with_capacity(self.session_id.len() + 8);
        context.extend_from_slice(self.session_id.as_bytes());
        context.extend_from_slice(&self.round_id.to_be_bytes());
        context
    }
}
