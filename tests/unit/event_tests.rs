//! Tests for the presentation-facing event surface
//!
//! Consumers receive events as immutable data; everything must serialize
//! cleanly so a renderer in another process can subscribe over a pipe.

use intrigue::{
    PlayerId, PlayerState, PlotAction, RoundOutcome, RoundResolution, RoundWinner, SessionEvent,
    SessionPhase,
};

fn player(name: &str) -> PlayerState {
    PlayerState {
        identity: PlayerId::new(name),
        hit_points: 100,
        mana: 50,
        prestige: 50,
        pending_action: None,
    }
}

fn resolution() -> RoundResolution {
    RoundResolution {
        round_number: 1,
        p1_action: PlotAction::Assassination,
        p2_action: PlotAction::Bribery,
        outcome: RoundOutcome {
            winner: RoundWinner::Player1,
            prestige_delta: (30, -10),
            hp_damage: (0, 7),
        },
        terminal: false,
        winner: None,
    }
}

#[test]
fn test_phase_changed_serializes() {
    let event = SessionEvent::PhaseChanged {
        session_id: 1,
        phase: SessionPhase::Plotting,
        round_number: 2,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("PhaseChanged"));
    assert!(json.contains("Plotting"));
}

#[test]
fn test_commitment_generated_exposes_only_the_digest() {
    let event = SessionEvent::CommitmentGenerated {
        session_id: 1,
        round_number: 1,
        player: intrigue::PlayerSlot::Player1,
        digest_hex: "ab".repeat(32),
    };
    let json = serde_json::to_string(&event).unwrap();
    // The event carries the public digest and nothing else; no nonce or
    // action field can leak through the presentation surface.
    assert!(json.contains("digest_hex"));
    assert!(!json.contains("nonce"));
    assert!(!json.contains("action"));
}

#[test]
fn test_round_resolved_carries_snapshots() {
    let event = SessionEvent::RoundResolved {
        session_id: 1,
        resolution: resolution(),
        player1: player("duke"),
        player2: player("baron"),
        audited: true,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("RoundResolved"));
    assert!(json.contains("duke"));
    assert!(json.contains("baron"));
    assert!(json.contains("audited"));
}

#[test]
fn test_game_over_serializes() {
    let event = SessionEvent::GameOver {
        session_id: 1,
        winner: intrigue::PlayerSlot::Player2,
        player1: player("duke"),
        player2: player("baron"),
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("GameOver"));
    assert!(json.contains("Player2"));
}
