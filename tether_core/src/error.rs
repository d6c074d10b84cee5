// tether_core/src/error.rs

use thiserror::Error;

/// Every failure the bridge can surface to a caller.
///
/// `Decode` is produced by the codec but is swallowed (logged and counted) by
/// `EntityBridge::on_inbound_message`; it never reaches the simulation side.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("invalid {field} '{value}': {reason}")]
    InvalidIdentifier {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid bridge configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to decode command payload: {0}")]
    Decode(String),

    #[error("bridge is closed")]
    BridgeClosed,

    #[error("state for '{got}' pushed to the bridge of '{expected}'")]
    IdentityMismatch { expected: String, got: String },

    #[error("orientation must be a finite, non-zero quaternion")]
    InvalidOrientation,

    #[error("invalid physical state: {0}")]
    InvalidState(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
