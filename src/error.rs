//! Error kinds returned by the public acquisition API.
//!
//! Internal helpers that never cross a public boundary continue to use
//! [`anyhow::Result`]; this enum exists so that callers of [`crate::device`]
//! can match on kind instead of parsing strings.

use thiserror::Error;

use crate::device::state::DeviceState;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),

    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: DeviceState, to: DeviceState },

    #[error("device rejected command {command:?}: {response}")]
    Configuration { command: String, response: String },

    #[error("decode failure: {reason}")]
    Decode { reason: String },

    #[error("sink write failed: {reason}")]
    SinkWrite { reason: String },

    #[error("acquisition loop cancelled")]
    Cancelled,

    #[error("already connected")]
    AlreadyConnected,
}
