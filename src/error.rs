//! Error types for the intrigue session protocol

use thiserror::Error;

use crate::backend::BackendError;
use crate::game::session::SessionPhase;

/// Main error type for the intrigue protocol
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Commitment error: {0}")]
    Commitment(#[from] CommitmentError),

    /// The execution backend is unreachable or misconfigured. Surfaced
    /// once per session; the session runs in local mode afterwards.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Caller attempted an operation the current phase does not allow.
    /// Always a controller bug, never retried.
    #[error("Invalid phase transition: {operation} requires {expected}, session is in {actual}")]
    InvalidPhaseTransition {
        operation: &'static str,
        expected: &'static str,
        actual: SessionPhase,
    },

    #[error("Session {0} has already ended")]
    SessionOver(u32),

    #[error("Session not found: {0}")]
    SessionNotFound(u32),

    #[error("A session requires two distinct players")]
    SamePlayer,

    #[error("Plot already committed for this round: {player}")]
    AlreadyCommitted { player: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String, field: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Hex decoding error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

/// Errors local to commitment generation and verification.
///
/// These are always fatal to the specific commit attempt. Verification
/// mismatches are NOT errors: `verify` returns `false` instead, so a bad
/// reveal can never crash the session.
#[derive(Debug, Clone, Error)]
pub enum CommitmentError {
    #[error("No cryptographically secure entropy source available: {0}")]
    EntropyUnavailable(String),

    #[error("Stored digest does not match the committed material")]
    BadDigest,

    #[error("Nonce was already used by an earlier commitment in this session")]
    NonceReuse,
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Type alias for the main result type used throughout the library
pub type ProtocolResult<T> = Result<T, ProtocolError>;
