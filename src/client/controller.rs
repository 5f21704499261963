//! Session controller
//!
//! Top-level coordinator: drives the state machine, routes durable
//! transitions through the transaction orchestrator, and reconciles the
//! local mirror with backend-confirmed state. Only one phase transition
//! is ever in flight per session; within a phase the two players'
//! backend operations run concurrently and the transition waits for both
//! to settle.
//!
//! The fallback discipline is availability-first: once gameplay has
//! started, no backend trouble may stall the match. Definitive commit
//! failures degrade the whole session to local mode; indeterminate
//! commit outcomes are reconciled against backend state before the
//! session abandons backed mode; reveal/resolve failures only cost the
//! affected round its audit trail.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::backend::{
    ExecutionBackend, OperationOutcome, RequestSigner, SessionOperation, SessionSnapshot,
    TxOrchestrator,
};
use crate::client::events::SessionEvent;
use crate::client::ledger::{RoundRecord, SessionLedger};
use crate::client::policy::ActionPolicy;
use crate::config::IntrigueConfig;
use crate::error::{ProtocolError, ProtocolResult};
use crate::game::action::PlotAction;
use crate::game::session::{
    PlayerId, PlayerSlot, RevealPacket, RoundResolution, Session, SessionEngine, SessionMode,
    SessionPhase,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Hands out session ids from an explicit monotonic counter. One
/// allocator per process component that creates sessions; no ambient
/// global state.
#[derive(Debug)]
pub struct SessionIdAllocator {
    next: AtomicU32,
}

impl SessionIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    pub fn next_id(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SessionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinates one session end to end.
pub struct SessionController {
    engine: SessionEngine,
    orchestrator: Option<TxOrchestrator>,
    backend: Option<Arc<dyn ExecutionBackend>>,
    ledger: SessionLedger,
    events: broadcast::Sender<SessionEvent>,
    /// Backend trouble is surfaced once, not per call.
    backend_fault_reported: bool,
}

impl SessionController {
    /// A session with no backend: gameplay only, nothing durably
    /// recorded.
    pub fn local(
        session_id: u32,
        player1: PlayerId,
        player2: PlayerId,
        config: &IntrigueConfig,
    ) -> ProtocolResult<Self> {
        config.validate()?;
        let engine = SessionEngine::new(
            session_id,
            player1,
            player2,
            config.game.clone(),
            config.resolution.clone(),
            SessionMode::Local,
        )?;
        Ok(Self::from_engine(engine, None, None))
    }

    /// A backend-backed session. The backend handle and signer are passed
    /// in explicitly; "not yet ready" is represented by constructing a
    /// local session instead, never by an ambient half-initialized
    /// connection.
    pub fn backed(
        session_id: u32,
        player1: PlayerId,
        player2: PlayerId,
        config: &IntrigueConfig,
        backend: Arc<dyn ExecutionBackend>,
        signer: Arc<dyn RequestSigner>,
    ) -> ProtocolResult<Self> {
        config.validate()?;
        let engine = SessionEngine::new(
            session_id,
            player1,
            player2,
            config.game.clone(),
            config.resolution.clone(),
            SessionMode::Backed,
        )?;
        let orchestrator =
            TxOrchestrator::new(backend.clone(), signer, config.backend.clone());
        Ok(Self::from_engine(engine, Some(orchestrator), Some(backend)))
    }

    /// Backed controller with an explicit damage-roll RNG, for
    /// reproducible sessions.
    pub fn backed_with_rng(
        session_id: u32,
        player1: PlayerId,
        player2: PlayerId,
        config: &IntrigueConfig,
        backend: Arc<dyn ExecutionBackend>,
        signer: Arc<dyn RequestSigner>,
        rng: StdRng,
    ) -> ProtocolResult<Self> {
        config.validate()?;
        let engine = SessionEngine::with_rng(
            session_id,
            player1,
            player2,
            config.game.clone(),
            config.resolution.clone(),
            SessionMode::Backed,
            rng,
        )?;
        let orchestrator =
            TxOrchestrator::new(backend.clone(), signer, config.backend.clone());
        Ok(Self::from_engine(engine, Some(orchestrator), Some(backend)))
    }

    fn from_engine(
        engine: SessionEngine,
        orchestrator: Option<TxOrchestrator>,
        backend: Option<Arc<dyn ExecutionBackend>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine,
            orchestrator,
            backend,
            ledger: SessionLedger::new(),
            events,
            backend_fault_reported: false,
        }
    }

    pub fn session(&self) -> &Session {
        self.engine.session()
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn mode(&self) -> SessionMode {
        self.engine.mode()
    }

    /// Subscribe to state-change events. Lagging receivers drop the
    /// oldest events rather than blocking the session.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Start (or restart) the match. In backed mode the start is recorded
    /// on the backend; if that fails, the whole session runs locally.
    pub async fn start(&mut self) -> ProtocolResult<()> {
        self.engine.start()?;
        self.emit_phase();

        if self.engine.mode() == SessionMode::Backed {
            let session = self.engine.session();
            let op = SessionOperation::StartSession {
                session_id: session.session_id,
                player1: session.player1.identity.clone(),
                player2: session.player2.identity.clone(),
            };
            match self.execute_backed(op).await {
                Some(outcome) if outcome.is_success() => {
                    debug!("session start recorded on backend");
                }
                Some(outcome) => {
                    self.degrade(format!("session start not confirmed: {:?}", outcome));
                }
                None => {} // already degraded
            }
        }
        Ok(())
    }

    /// Play one full round with both actions supplied by the caller.
    pub async fn play_round(
        &mut self,
        p1_action: PlotAction,
        p2_action: PlotAction,
    ) -> ProtocolResult<RoundResolution> {
        // Plotting: record both choices and seal them.
        self.engine.select_action(PlayerSlot::Player1, p1_action)?;
        self.engine.select_action(PlayerSlot::Player2, p2_action)?;

        let session_id = self.engine.session().session_id;
        let round = self.engine.session().round_number;
        let sealed = self.engine.seal_plots()?;
        for (slot, commitment) in &sealed {
            self.emit(SessionEvent::CommitmentGenerated {
                session_id,
                round_number: round,
                player: *slot,
                digest_hex: commitment.digest_hex(),
            });
        }
        self.emit_phase();

        let digests: Vec<String> = sealed
            .iter()
            .map(|(_, c)| c.digest_hex())
            .collect();
        let mut tx_hashes: Vec<String> = Vec::new();
        let mut audited = self.engine.mode() == SessionMode::Backed;

        // Committing: both commitments must confirm, or the session drops
        // to local mode for the rest of the game. Indeterminate outcomes
        // are reconciled against the backend first; only a confirmed
        // absence of the commits counts as failure.
        if self.engine.phase() == SessionPhase::Committing {
            let ops = sealed.iter().map(|(slot, commitment)| {
                SessionOperation::CommitPlot {
                    session_id,
                    round,
                    player: self.engine.session().player(*slot).identity.clone(),
                    digest: commitment.digest,
                }
            });
            let mut ops = ops.collect::<Vec<_>>();
            let op2 = ops.pop().expect("two sealed plots");
            let op1 = ops.pop().expect("two sealed plots");

            match self.execute_backed_pair(op1, op2).await {
                Some((a, b)) => {
                    collect_hashes(&mut tx_hashes, [&a, &b]);
                    if a.is_success() && b.is_success() {
                        self.engine.confirm_committed()?;
                        self.emit_phase();
                    } else if is_rejected(&a) || is_rejected(&b) {
                        audited = false;
                        self.degrade(format!("commit not durable: {:?} / {:?}", a, b));
                    } else if self.commits_confirmed_on_backend().await {
                        // Timed out or unconfirmed, but the backend shows
                        // both commits applied.
                        self.engine.confirm_committed()?;
                        self.emit_phase();
                    } else {
                        audited = false;
                        self.degrade(format!(
                            "commit indeterminate and not found on backend: {:?} / {:?}",
                            a, b
                        ));
                    }
                }
                None => {
                    audited = false;
                }
            }
        }

        // Revealing: disclose secret material. Backend verification is an
        // audit trail, not a gameplay gate; failures cost this round its
        // audited flag and nothing else.
        let packets = [
            self.engine.reveal_packet(PlayerSlot::Player1)?,
            self.engine.reveal_packet(PlayerSlot::Player2)?,
        ];
        if self.engine.mode() == SessionMode::Backed {
            let [p1, p2] = packets;
            let op1 = self.verify_op(session_id, round, &p1);
            let op2 = self.verify_op(session_id, round, &p2);
            match self.execute_backed_pair(op1, op2).await {
                Some((a, b)) if a.is_success() && b.is_success() => {
                    collect_hashes(&mut tx_hashes, [&a, &b]);
                }
                Some((a, b)) => {
                    collect_hashes(&mut tx_hashes, [&a, &b]);
                    warn!(round, "reveal verification incomplete, round unaudited");
                    audited = false;
                }
                None => {
                    audited = false;
                }
            }
        }
        self.engine.complete_reveals()?;
        self.emit_phase();

        // Resolving: the backend resolution is submitted first so the
        // audit trail lines up, but the locally-known actions remain
        // authoritative for gameplay.
        if self.engine.mode() == SessionMode::Backed {
            let op = SessionOperation::ResolveRound { session_id, round };
            match self.execute_backed(op).await {
                Some(outcome) if outcome.is_success() => {
                    collect_hashes(&mut tx_hashes, [&outcome]);
                }
                Some(outcome) => {
                    collect_hashes(&mut tx_hashes, [&outcome]);
                    warn!(round, "backend resolution incomplete, round unaudited");
                    audited = false;
                }
                None => {
                    audited = false;
                }
            }
        }

        let resolution = self.engine.resolve_round()?;

        self.ledger.record(RoundRecord {
            session_id,
            round_number: resolution.round_number,
            p1_digest: digests[0].clone(),
            p2_digest: digests[1].clone(),
            p1_action: resolution.p1_action,
            p2_action: resolution.p2_action,
            outcome: resolution.outcome,
            tx_hashes,
            audited,
            recorded_at: chrono::Utc::now(),
        });

        let session = self.engine.session();
        self.emit(SessionEvent::RoundResolved {
            session_id,
            resolution: resolution.clone(),
            player1: session.player1.clone(),
            player2: session.player2.clone(),
            audited,
        });
        self.emit_phase();

        if resolution.terminal {
            let session = self.engine.session();
            self.emit(SessionEvent::GameOver {
                session_id,
                winner: session.winner.expect("terminal round sets winner"),
                player1: session.player1.clone(),
                player2: session.player2.clone(),
            });
        }

        Ok(resolution)
    }

    /// Play one round with player 2's action drawn from a policy.
    pub async fn play_round_against(
        &mut self,
        p1_action: PlotAction,
        policy: &mut dyn ActionPolicy,
    ) -> ProtocolResult<RoundResolution> {
        let p2_action = policy.choose(self.engine.session(), PlayerSlot::Player2);
        self.play_round(p1_action, p2_action).await
    }

    /// Re-query backend-confirmed session state.
    ///
    /// Required after an indeterminate outcome (`TimedOutPending`,
    /// cancellation) before the local mirror is trusted again. Returns
    /// `None` for local sessions.
    pub async fn reconcile(&self) -> ProtocolResult<Option<SessionSnapshot>> {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return Ok(None),
        };
        let session_id = self.engine.session().session_id;
        let snapshot = backend
            .fetch_session_state(session_id)
            .await
            .map_err(|e| match e {
                crate::backend::BackendError::Unavailable(msg) => {
                    ProtocolError::BackendUnavailable(msg)
                }
                other => ProtocolError::Backend(other),
            })?
            .ok_or(ProtocolError::SessionNotFound(session_id))?;

        let local_round = self.engine.session().round_number;
        if snapshot.round_number != local_round {
            warn!(
                local_round,
                backend_round = snapshot.round_number,
                "local mirror diverges from backend state"
            );
        }
        Ok(Some(snapshot))
    }

    /// Whether the backend-confirmed snapshot shows both players'
    /// commitments applied for the current round. Used to settle
    /// indeterminate commit outcomes before giving up on backed mode.
    async fn commits_confirmed_on_backend(&self) -> bool {
        matches!(
            self.reconcile().await,
            Ok(Some(snapshot)) if snapshot.player1_committed && snapshot.player2_committed
        )
    }

    fn verify_op(&self, session_id: u32, round: u32, packet: &RevealPacket) -> SessionOperation {
        SessionOperation::VerifyPlot {
            session_id,
            round,
            player: self.engine.session().player(packet.player).identity.clone(),
            action: packet.action,
            nonce: packet.nonce,
            target_tag: packet.target_tag,
            digest: packet.digest,
        }
    }

    /// Execute one backed operation. Returns `None` (after degrading the
    /// session) when the backend is unavailable.
    async fn execute_backed(&mut self, op: SessionOperation) -> Option<OperationOutcome> {
        let orchestrator = self.orchestrator.as_ref()?;
        match orchestrator.execute(op).await {
            Ok(outcome) => Some(outcome),
            Err(ProtocolError::BackendUnavailable(msg)) => {
                self.degrade(msg);
                None
            }
            Err(e) => {
                self.degrade(e.to_string());
                None
            }
        }
    }

    /// Execute two independent operations concurrently and wait for both
    /// to settle. Neither player's failure blocks the other's request.
    async fn execute_backed_pair(
        &mut self,
        op1: SessionOperation,
        op2: SessionOperation,
    ) -> Option<(OperationOutcome, OperationOutcome)> {
        let (r1, r2) = {
            let orchestrator = self.orchestrator.as_ref()?;
            tokio::join!(orchestrator.execute(op1), orchestrator.execute(op2))
        };
        match (r1, r2) {
            (Ok(a), Ok(b)) => Some((a, b)),
            (Err(e), _) | (_, Err(e)) => {
                self.degrade(e.to_string());
                None
            }
        }
    }

    fn degrade(&mut self, reason: String) {
        if self.engine.mode() == SessionMode::Local {
            return;
        }
        if !self.backend_fault_reported {
            warn!(%reason, "backend trouble, session continues in local mode");
            self.backend_fault_reported = true;
        }
        let round_number = self.engine.session().round_number;
        let session_id = self.engine.session().session_id;
        self.engine.degrade_to_local();
        self.emit(SessionEvent::ModeDegraded {
            session_id,
            round_number,
            reason,
        });
    }

    fn emit_phase(&self) {
        let session = self.engine.session();
        self.emit(SessionEvent::PhaseChanged {
            session_id: session.session_id,
            phase: session.phase,
            round_number: session.round_number,
        });
    }

    fn emit(&self, event: SessionEvent) {
        // A send error just means nobody is listening.
        let _ = self.events.send(event);
    }
}

/// Definitively rejected, as opposed to indeterminate or successful.
fn is_rejected(outcome: &OperationOutcome) -> bool {
    outcome.is_definitive() && !outcome.is_success()
}

fn collect_hashes<'a>(
    tx_hashes: &mut Vec<String>,
    outcomes: impl IntoIterator<Item = &'a OperationOutcome>,
) {
    for outcome in outcomes {
        if let Some(hash) = outcome.tx_hash() {
            tx_hashes.push(hash.0.clone());
        }
    }
}
