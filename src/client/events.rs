//! State-change events exposed to presentation layers
//!
//! The core never depends on rendering; consumers subscribe to a
//! broadcast channel and receive immutable snapshots of what changed.

use serde::Serialize;

use crate::game::session::{PlayerSlot, PlayerState, RoundResolution, SessionPhase};

/// Events emitted by the session controller.
#[derive(Debug, Clone, Serialize)]
pub enum SessionEvent {
    PhaseChanged {
        session_id: u32,
        phase: SessionPhase,
        round_number: u32,
    },
    CommitmentGenerated {
        session_id: u32,
        round_number: u32,
        player: PlayerSlot,
        digest_hex: String,
    },
    RoundResolved {
        session_id: u32,
        resolution: RoundResolution,
        player1: PlayerState,
        player2: PlayerState,
        /// Whether the round's backend audit trail is complete.
        audited: bool,
    },
    GameOver {
        session_id: u32,
        winner: PlayerSlot,
        player1: PlayerState,
        player2: PlayerState,
    },
    /// The session fell back to local mode; emitted at most once.
    ModeDegraded {
        session_id: u32,
        round_number: u32,
        reason: String,
    },
}
