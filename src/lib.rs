//! Intrigue - a commit-reveal session protocol for two-party adversarial
//! games
//!
//! Each round both players seal a secret plot behind a hash commitment
//! before either choice is revealed, then the round resolves
//! deterministically from the committed data. The crate provides:
//! - Hash commitment generation and constant-time verification
//! - A pure, reproducible round-resolution engine
//! - The session/round state machine with enforced phase transitions
//! - Transaction orchestration (build, simulate, sign, submit, poll)
//!   against an abstract execution backend, with bounded retry and a
//!   local-mode fallback so gameplay never stalls on backend trouble

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod game;
pub mod observability;

// Re-export commonly used types for convenience
pub use error::{CommitmentError, ProtocolError, ProtocolResult};

// Re-export the core game types
pub use game::{
    PlayerId, PlayerSlot, PlayerState, PlotAction, PlotCommitment, ResolutionConfig, Resolver,
    RevealPacket, RoundOutcome, RoundResolution, RoundWinner, Session, SessionEngine, SessionMode,
    SessionPhase,
};

// Re-export backend integration types
pub use backend::{
    AccountMeta, BackendError, ExecutionBackend, LocalKeySigner, OperationOutcome, RequestSigner,
    SessionOperation, SessionRequest, SessionSnapshot, SignedRequest, SimulationResult, SubmitAck,
    TxHash, TxOrchestrator, TxStatus,
};

// Re-export client interfaces
pub use client::{
    ActionPolicy, RoundRecord, SessionController, SessionEvent, SessionIdAllocator, SessionLedger,
    UniformPolicy,
};

// Re-export configuration interfaces
pub use config::{BackendConfig, GameConfig, IntrigueConfig, ObservabilityConfig, TieBreak};
