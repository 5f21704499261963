//! Session state machine
//!
//! Owns all per-session mutable state and enforces legal phase
//! transitions. The engine is synchronous and never touches the network;
//! backend durability is layered on top by the session controller, which
//! calls back into the engine only after an orchestrator outcome is
//! definitive.
//!
//! Phase diagram:
//!
//! ```text
//! Lobby -> Plotting -> Committing -> Revealing -> Resolving -> Plotting
//!                       (backed only)                        \-> GameOver
//! ```
//!
//! In local mode the `Committing` phase is skipped entirely.

use std::collections::{HashMap, HashSet};
use std::fmt;

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::{GameConfig, TieBreak};
use crate::error::{CommitmentError, ProtocolError, ProtocolResult};
use crate::game::action::PlotAction;
use crate::game::commitment::{PlotCommitment, COMMITMENT_LEN};
use crate::game::resolution::{ResolutionConfig, Resolver, RoundOutcome};

/// Opaque player identity (a signing address, public key, or test name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Positional player reference within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerSlot {
    Player1,
    Player2,
}

impl PlayerSlot {
    pub const BOTH: [PlayerSlot; 2] = [PlayerSlot::Player1, PlayerSlot::Player2];

    pub fn opponent(self) -> PlayerSlot {
        match self {
            PlayerSlot::Player1 => PlayerSlot::Player2,
            PlayerSlot::Player2 => PlayerSlot::Player1,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerSlot::Player1 => write!(f, "player1"),
            PlayerSlot::Player2 => write!(f, "player2"),
        }
    }
}

/// Session phases. See the module docs for the transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Lobby,
    Plotting,
    Committing,
    Revealing,
    Resolving,
    GameOver,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Lobby => "Lobby",
            SessionPhase::Plotting => "Plotting",
            SessionPhase::Committing => "Committing",
            SessionPhase::Revealing => "Revealing",
            SessionPhase::Resolving => "Resolving",
            SessionPhase::GameOver => "GameOver",
        };
        write!(f, "{}", name)
    }
}

/// Whether session operations are durably recorded on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    Local,
    Backed,
}

/// Mutable per-player state. Owned exclusively by the session; mutated
/// only when the state machine applies a resolution outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub identity: PlayerId,
    pub hit_points: u32,
    pub mana: u32,
    pub prestige: i64,
    pub pending_action: Option<PlotAction>,
}

impl PlayerState {
    fn initial(identity: PlayerId, config: &GameConfig) -> Self {
        Self {
            identity,
            hit_points: config.starting_hit_points,
            mana: config.starting_mana,
            prestige: config.starting_prestige,
            pending_action: None,
        }
    }
}

/// Full session state mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: u32,
    pub phase: SessionPhase,
    pub round_number: u32,
    pub player1: PlayerState,
    pub player2: PlayerState,
    /// Current-round commitments, cleared when the round resolves.
    pub commitments: HashMap<PlayerSlot, PlotCommitment>,
    pub mode: SessionMode,
    /// Set once the session reaches `GameOver`.
    pub winner: Option<PlayerSlot>,
}

impl Session {
    pub fn player(&self, slot: PlayerSlot) -> &PlayerState {
        match slot {
            PlayerSlot::Player1 => &self.player1,
            PlayerSlot::Player2 => &self.player2,
        }
    }

    fn player_mut(&mut self, slot: PlayerSlot) -> &mut PlayerState {
        match slot {
            PlayerSlot::Player1 => &mut self.player1,
            PlayerSlot::Player2 => &mut self.player2,
        }
    }
}

/// Secret material disclosed during the reveal step, in the shape the
/// backend's verify operation expects.
#[derive(Debug, Clone)]
pub struct RevealPacket {
    pub player: PlayerSlot,
    pub action: PlotAction,
    pub nonce: [u8; COMMITMENT_LEN],
    pub target_tag: [u8; COMMITMENT_LEN],
    pub digest: [u8; COMMITMENT_LEN],
}

/// Outcome of a completed round, as reported by the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResolution {
    pub round_number: u32,
    pub p1_action: PlotAction,
    pub p2_action: PlotAction,
    pub outcome: RoundOutcome,
    /// Whether this round ended the game.
    pub terminal: bool,
    pub winner: Option<PlayerSlot>,
}

/// The session state machine.
///
/// Not re-entrant: callers must not start a new transition while a prior
/// one is in flight. The session controller enforces this by holding the
/// engine behind `&mut self`.
pub struct SessionEngine {
    session: Session,
    game_config: GameConfig,
    resolver: Resolver,
    rng: StdRng,
    /// Nonces seen in this session; reuse across commitments is rejected.
    used_nonces: HashSet<[u8; COMMITMENT_LEN]>,
}

impl SessionEngine {
    /// Create an engine for a fresh session in the `Lobby` phase.
    pub fn new(
        session_id: u32,
        player1: PlayerId,
        player2: PlayerId,
        game_config: GameConfig,
        resolution_config: ResolutionConfig,
        mode: SessionMode,
    ) -> ProtocolResult<Self> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| CommitmentError::EntropyUnavailable(e.to_string()))?;
        Self::with_rng(
            session_id,
            player1,
            player2,
            game_config,
            resolution_config,
            mode,
            StdRng::from_seed(seed),
        )
    }

    /// Create an engine with an explicit damage-roll RNG. Seeded RNGs make
    /// round outcomes fully reproducible.
    pub fn with_rng(
        session_id: u32,
        player1: PlayerId,
        player2: PlayerId,
        game_config: GameConfig,
        resolution_config: ResolutionConfig,
        mode: SessionMode,
        rng: StdRng,
    ) -> ProtocolResult<Self> {
        if player1 == player2 {
            return Err(ProtocolError::SamePlayer);
        }

        let session = Session {
            session_id,
            phase: SessionPhase::Lobby,
            round_number: 1,
            player1: PlayerState::initial(player1, &game_config),
            player2: PlayerState::initial(player2, &game_config),
            commitments: HashMap::new(),
            mode,
            winner: None,
        };

        Ok(Self {
            session,
            game_config,
            resolver: Resolver::new(resolution_config),
            rng,
            used_nonces: HashSet::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    pub fn mode(&self) -> SessionMode {
        self.session.mode
    }

    /// Start (or restart) the match: reset both players to initial stats,
    /// set `round_number` to 1, and enter `Plotting`.
    ///
    /// Legal only from `Lobby` or `GameOver`.
    pub fn start(&mut self) -> ProtocolResult<()> {
        match self.session.phase {
            SessionPhase::Lobby | SessionPhase::GameOver => {}
            actual => {
                return Err(ProtocolError::InvalidPhaseTransition {
                    operation: "start",
                    expected: "Lobby or GameOver",
                    actual,
                })
            }
        }

        let p1 = self.session.player1.identity.clone();
        let p2 = self.session.player2.identity.clone();
        self.session.player1 = PlayerState::initial(p1, &self.game_config);
        self.session.player2 = PlayerState::initial(p2, &self.game_config);
        self.session.round_number = 1;
        self.session.commitments.clear();
        self.session.winner = None;
        self.session.phase = SessionPhase::Plotting;
        self.used_nonces.clear();

        info!(session_id = self.session.session_id, "session started");
        Ok(())
    }

    /// Record a player's secret choice for the current round.
    ///
    /// The action source is opaque to the state machine: a human, a
    /// policy, anything producing a [`PlotAction`].
    pub fn select_action(&mut self, slot: PlayerSlot, action: PlotAction) -> ProtocolResult<()> {
        self.expect_phase(SessionPhase::Plotting, "select_action")?;
        self.session.player_mut(slot).pending_action = Some(action);
        debug!(
            session_id = self.session.session_id,
            round = self.session.round_number,
            player = %slot,
            "action selected"
        );
        Ok(())
    }

    /// Whether both players have selected an action this round.
    pub fn plots_ready(&self) -> bool {
        self.session.player1.pending_action.is_some()
            && self.session.player2.pending_action.is_some()
    }

    /// Seal one player's pending action into a commitment.
    ///
    /// Legal only during `Plotting`; a second seal for the same player in
    /// the same round is rejected with `AlreadyCommitted`. A freshly
    /// drawn nonce that collides with one used earlier in the session is
    /// rejected rather than silently reused.
    pub fn seal_plot(&mut self, slot: PlayerSlot) -> ProtocolResult<PlotCommitment> {
        self.expect_phase(SessionPhase::Plotting, "seal_plot")?;
        if self.session.commitments.contains_key(&slot) {
            return Err(ProtocolError::AlreadyCommitted {
                player: self.session.player(slot).identity.to_string(),
            });
        }

        let action = self.session.player(slot).pending_action.ok_or(
            ProtocolError::InvalidPhaseTransition {
                operation: "seal_plot",
                expected: "a pending action",
                actual: self.session.phase,
            },
        )?;
        let target = self.target_tag(slot.opponent());
        let commitment = PlotCommitment::commit(target, action)?;

        if !self.used_nonces.insert(commitment.nonce) {
            return Err(CommitmentError::NonceReuse.into());
        }

        debug!(
            session_id = self.session.session_id,
            round = self.session.round_number,
            player = %slot,
            digest = %commitment.digest_hex(),
            "plot sealed"
        );
        self.session.commitments.insert(slot, commitment.clone());
        Ok(commitment)
    }

    /// Seal any still-unsealed pending actions and leave `Plotting`.
    ///
    /// Transitions to `Committing` in backed mode, straight to `Revealing`
    /// in local mode. Requires both actions to be present; returns both
    /// commitments, including any sealed earlier via [`Self::seal_plot`].
    pub fn seal_plots(&mut self) -> ProtocolResult<Vec<(PlayerSlot, PlotCommitment)>> {
        self.expect_phase(SessionPhase::Plotting, "seal_plots")?;
        if !self.plots_ready() {
            return Err(ProtocolError::InvalidPhaseTransition {
                operation: "seal_plots",
                expected: "both pending actions",
                actual: self.session.phase,
            });
        }

        for slot in PlayerSlot::BOTH {
            if !self.session.commitments.contains_key(&slot) {
                self.seal_plot(slot)?;
            }
        }

        let sealed = PlayerSlot::BOTH
            .iter()
            .map(|slot| (*slot, self.session.commitments[slot].clone()))
            .collect();

        self.session.phase = match self.session.mode {
            SessionMode::Backed => SessionPhase::Committing,
            SessionMode::Local => SessionPhase::Revealing,
        };
        Ok(sealed)
    }

    /// Acknowledge that both commitments are durably recorded.
    /// `Committing -> Revealing`, backed mode only.
    pub fn confirm_committed(&mut self) -> ProtocolResult<()> {
        self.expect_phase(SessionPhase::Committing, "confirm_committed")?;
        self.session.phase = SessionPhase::Revealing;
        Ok(())
    }

    /// Drop to local mode for the rest of the game.
    ///
    /// Once gameplay has started, availability wins over strict backend
    /// auditability: the match always proceeds to `GameOver`. If the
    /// session is mid-`Committing`, it moves on to `Revealing`.
    pub fn degrade_to_local(&mut self) {
        if self.session.mode == SessionMode::Local {
            return;
        }
        self.session.mode = SessionMode::Local;
        if self.session.phase == SessionPhase::Committing {
            self.session.phase = SessionPhase::Revealing;
        }
        info!(
            session_id = self.session.session_id,
            round = self.session.round_number,
            "session degraded to local mode"
        );
    }

    /// Secret material for a player's reveal, to be submitted for backend
    /// verification. Legal only during `Revealing`.
    pub fn reveal_packet(&self, slot: PlayerSlot) -> ProtocolResult<RevealPacket> {
        self.expect_phase(SessionPhase::Revealing, "reveal_packet")?;
        let commitment = self
            .session
            .commitments
            .get(&slot)
            .ok_or(ProtocolError::InvalidPhaseTransition {
                operation: "reveal_packet",
                expected: "a sealed commitment",
                actual: self.session.phase,
            })?;
        Ok(RevealPacket {
            player: slot,
            action: commitment.action,
            nonce: commitment.nonce,
            target_tag: commitment.target_tag,
            digest: commitment.digest,
        })
    }

    /// Locally verify both commitments against their own disclosed
    /// material and advance `Revealing -> Resolving`.
    ///
    /// A mismatch here means the commitment was corrupted after sealing,
    /// which is a [`CommitmentError::BadDigest`] bug, not a gameplay
    /// condition. Backend-side verification failures are handled by the
    /// controller and only cost the round its audit trail.
    pub fn complete_reveals(&mut self) -> ProtocolResult<()> {
        self.expect_phase(SessionPhase::Revealing, "complete_reveals")?;
        for slot in PlayerSlot::BOTH {
            let commitment =
                self.session
                    .commitments
                    .get(&slot)
                    .ok_or(ProtocolError::InvalidPhaseTransition {
                        operation: "complete_reveals",
                        expected: "both sealed commitments",
                        actual: self.session.phase,
                    })?;
            let nonce = commitment.nonce;
            let target = commitment.target_tag;
            if !commitment.verify(commitment.action, &nonce, &target) {
                return Err(CommitmentError::BadDigest.into());
            }
        }
        self.session.phase = SessionPhase::Resolving;
        Ok(())
    }

    /// Resolve the current round: compute the outcome, apply clamped
    /// deltas, discard commitments, and either advance to the next round
    /// or terminate the game.
    pub fn resolve_round(&mut self) -> ProtocolResult<RoundResolution> {
        self.expect_phase(SessionPhase::Resolving, "resolve_round")?;

        let p1_action = self
            .session
            .player1
            .pending_action
            .expect("reveals completed");
        let p2_action = self
            .session
            .player2
            .pending_action
            .expect("reveals completed");

        let outcome = self.resolver.resolve(p1_action, p2_action, &mut self.rng);
        self.apply_outcome(&outcome);

        // Round bookkeeping: secrets are spent, pending actions consumed.
        self.session.commitments.clear();
        self.session.player1.pending_action = None;
        self.session.player2.pending_action = None;

        let round_number = self.session.round_number;
        let terminal = self.is_terminal();
        let winner = if terminal {
            let winner = self.determine_winner();
            self.session.winner = Some(winner);
            self.session.phase = SessionPhase::GameOver;
            Some(winner)
        } else {
            self.session.round_number += 1;
            self.session.phase = SessionPhase::Plotting;
            None
        };

        info!(
            session_id = self.session.session_id,
            round = round_number,
            p1_action = %p1_action,
            p2_action = %p2_action,
            winner = ?outcome.winner,
            terminal,
            "round resolved"
        );

        Ok(RoundResolution {
            round_number,
            p1_action,
            p2_action,
            outcome,
            terminal,
            winner,
        })
    }

    /// Public tag a plot against `slot` is sealed under: the hash of the
    /// target player's identity.
    pub fn target_tag(&self, slot: PlayerSlot) -> [u8; COMMITMENT_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(self.session.player(slot).identity.as_str().as_bytes());
        hasher.finalize().into()
    }

    fn apply_outcome(&mut self, outcome: &RoundOutcome) {
        let config = &self.game_config;
        for (slot, delta, damage) in [
            (
                PlayerSlot::Player1,
                outcome.prestige_delta.0,
                outcome.hp_damage.0,
            ),
            (
                PlayerSlot::Player2,
                outcome.prestige_delta.1,
                outcome.hp_damage.1,
            ),
        ] {
            let max_prestige = config.max_prestige;
            let max_hit_points = config.max_hit_points;
            let max_mana = config.max_mana;
            let player = self.session.player_mut(slot);
            player.prestige = (player.prestige + delta).clamp(0, max_prestige);
            player.hit_points = player.hit_points.saturating_sub(damage).min(max_hit_points);
            player.mana = player.mana.min(max_mana);
        }
    }

    fn is_terminal(&self) -> bool {
        let s = &self.session;
        s.round_number >= self.game_config.max_rounds
            || s.player1.hit_points == 0
            || s.player2.hit_points == 0
            || s.player1.prestige == 0
            || s.player2.prestige == 0
    }

    /// Winner is the player with strictly higher prestige; ties fall to
    /// the configured tie-break (player 1 by default, kept explicit so the
    /// policy choice is visible in configuration).
    fn determine_winner(&self) -> PlayerSlot {
        let p1 = self.session.player1.prestige;
        let p2 = self.session.player2.prestige;
        if p1 > p2 {
            PlayerSlot::Player1
        } else if p2 > p1 {
            PlayerSlot::Player2
        } else {
            match self.game_config.tie_break {
                TieBreak::Player1 => PlayerSlot::Player1,
                TieBreak::Player2 => PlayerSlot::Player2,
            }
        }
    }

    fn expect_phase(&self, expected: SessionPhase, operation: &'static str) -> ProtocolResult<()> {
        if self.session.phase == SessionPhase::GameOver && expected != SessionPhase::GameOver {
            return Err(ProtocolError::SessionOver(self.session.session_id));
        }
        if self.session.phase != expected {
            return Err(ProtocolError::InvalidPhaseTransition {
                operation,
                expected: match expected {
                    SessionPhase::Lobby => "Lobby",
                    SessionPhase::Plotting => "Plotting",
                    SessionPhase::Committing => "Committing",
                    SessionPhase::Revealing => "Revealing",
                    SessionPhase::Resolving => "Resolving",
                    SessionPhase::GameOver => "GameOver",
                },
                actual: self.session.phase,
            });
        }
        Ok(())
    }
}
