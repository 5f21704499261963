//! Core game protocol: actions, commitments, resolution, and the session
//! state machine.

pub mod action;
pub mod commitment;
pub mod resolution;
pub mod session;

pub use action::PlotAction;
pub use commitment::{PlotCommitment, COMMITMENT_LEN};
pub use resolution::{ResolutionConfig, Resolver, RoundOutcome, RoundWinner};
pub use session::{
    PlayerId, PlayerSlot, PlayerState, RevealPacket, RoundResolution, Session, SessionEngine,
    SessionMode, SessionPhase,
};
