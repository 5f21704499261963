//! Execution backend abstraction
//!
//! A single typed contract over whatever chain or service records session
//! state. Backend-specific response quirks stay inside the adapter that
//! implements [`ExecutionBackend`]; the state machine and controller only
//! ever see these types.

pub mod orchestrator;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::game::action::PlotAction;
use crate::game::commitment::COMMITMENT_LEN;
use crate::game::session::PlayerId;

pub use orchestrator::{OperationOutcome, TxOrchestrator};

/// Backend adapter errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// No connection or missing configuration. The session falls back to
    /// local mode when it sees this.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The backend refused the submission outright.
    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),
}

/// Identifier of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One logical session operation, addressed by session, round, and player
/// so the backend can deduplicate redundant re-issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionOperation {
    StartSession {
        session_id: u32,
        player1: PlayerId,
        player2: PlayerId,
    },
    CommitPlot {
        session_id: u32,
        round: u32,
        player: PlayerId,
        digest: [u8; COMMITMENT_LEN],
    },
    VerifyPlot {
        session_id: u32,
        round: u32,
        player: PlayerId,
        action: PlotAction,
        nonce: [u8; COMMITMENT_LEN],
        target_tag: [u8; COMMITMENT_LEN],
        digest: [u8; COMMITMENT_LEN],
    },
    ResolveRound {
        session_id: u32,
        round: u32,
    },
}

impl SessionOperation {
    pub fn name(&self) -> &'static str {
        match self {
            SessionOperation::StartSession { .. } => "start_session",
            SessionOperation::CommitPlot { .. } => "commit_plot",
            SessionOperation::VerifyPlot { .. } => "verify_plot",
            SessionOperation::ResolveRound { .. } => "resolve_round",
        }
    }

    pub fn session_id(&self) -> u32 {
        match self {
            SessionOperation::StartSession { session_id, .. }
            | SessionOperation::CommitPlot { session_id, .. }
            | SessionOperation::VerifyPlot { session_id, .. }
            | SessionOperation::ResolveRound { session_id, .. } => *session_id,
        }
    }

    /// Deduplication key: `(session, round, player)` where applicable.
    pub fn dedup_key(&self) -> String {
        match self {
            SessionOperation::StartSession { session_id, .. } => {
                format!("start:{}", session_id)
            }
            SessionOperation::CommitPlot {
                session_id,
                round,
                player,
                ..
            } => format!("commit:{}:{}:{}", session_id, round, player),
            SessionOperation::VerifyPlot {
                session_id,
                round,
                player,
                ..
            } => format!("verify:{}:{}:{}", session_id, round, player),
            SessionOperation::ResolveRound { session_id, round } => {
                format!("resolve:{}:{}", session_id, round)
            }
        }
    }
}

/// A request ready for simulation and signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub operation: SessionOperation,
    pub sender: PlayerId,
    /// Account sequence number at build time.
    pub sequence: u64,
    /// Correlation id threading the request through logs.
    pub correlation_id: String,
}

/// A signed request, ready for submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRequest {
    pub request: SessionRequest,
    pub signature: Vec<u8>,
}

/// Result of a dry-run against the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationResult {
    Ok,
    Rejected { reason: String },
}

/// Acknowledgement returned by `submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub hash: TxHash,
    pub status: TxStatus,
}

/// Terminal-or-pending status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Success {
        return_value: Option<serde_json::Value>,
    },
    Failed {
        reason: String,
    },
}

/// Sequence/nonce metadata needed to build a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMeta {
    pub identity: PlayerId,
    pub sequence: u64,
}

/// Backend-confirmed view of a session, used to reconcile the local
/// mirror after indeterminate outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: u32,
    pub round_number: u32,
    pub player1_prestige: i64,
    pub player2_prestige: i64,
    pub player1_committed: bool,
    pub player2_committed: bool,
    pub player1_verified: bool,
    pub player2_verified: bool,
    pub ended: bool,
}

/// The execution backend: submit/query primitives and nothing else.
///
/// Layered the way a blockchain transport is usually abstracted: this is
/// pure infrastructure with no game knowledge beyond the request shapes.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Dry-run a request without submitting it.
    async fn simulate(&self, request: &SessionRequest) -> Result<SimulationResult, BackendError>;

    /// Submit a signed request. A returned ack means the backend accepted
    /// the request for processing, not that it succeeded.
    async fn submit(&self, signed: SignedRequest) -> Result<SubmitAck, BackendError>;

    /// Query the status of a submitted transaction.
    async fn poll_status(&self, hash: &TxHash) -> Result<TxStatus, BackendError>;

    /// Fetch sequence metadata for an account.
    async fn get_account(&self, identity: &PlayerId) -> Result<AccountMeta, BackendError>;

    /// Fetch the backend-confirmed session state, or `None` if the
    /// backend has never seen the session.
    async fn fetch_session_state(
        &self,
        session_id: u32,
    ) -> Result<Option<SessionSnapshot>, BackendError>;
}

/// Signs session requests on behalf of one identity.
pub trait RequestSigner: Send + Sync {
    fn identity(&self) -> &PlayerId;

    fn sign(&self, request: &SessionRequest) -> Result<SignedRequest, BackendError>;
}

/// Keyed signer over the canonical JSON encoding of a request.
///
/// Stands in for a real wallet signature; the orchestrator only needs the
/// `RequestSigner` shape.
pub struct LocalKeySigner {
    identity: PlayerId,
    key: [u8; 32],
}

impl LocalKeySigner {
    pub fn new(identity: PlayerId, key: [u8; 32]) -> Self {
        Self { identity, key }
    }
}

impl RequestSigner for LocalKeySigner {
    fn identity(&self) -> &PlayerId {
        &self.identity
    }

    fn sign(&self, request: &SessionRequest) -> Result<SignedRequest, BackendError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| BackendError::Signing(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(&payload);
        let signature = hasher.finalize().to_vec();
        Ok(SignedRequest {
            request: request.clone(),
            signature,
        })
    }
}
