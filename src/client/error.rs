use thiserror::Error;

use crate::{client::Stage, common::InvalidConfigError, sharing::SharingError, InitError};

#[derive(Debug, Error)]
/// Errors of the client state machine.
pub enum ClientError {
    #[error("the operation is only valid in stage {expected}, but the client is in stage {actual}")]
    ProtocolState { expected: Stage, actual: Stage },

    #[error("invalid session parameters: {0}")]
    InvalidConfig(#[from] InvalidConfigError),

    #[error(transparent)]
    Init(#[from] InitError),

    #[error("failed to share the self seed: {0}")]
    Sharing(#[from] SharingError),

    #[error("the shares of the self seed have not been generated yet")]
    SharesNotGenerated,
}
