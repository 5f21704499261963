//! Scriptable mock execution backend
//!
//! Emulates a backend that deduplicates session state transitions, with
//! failure scripts for rejection, pending, and outage scenarios.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use intrigue::{
    AccountMeta, BackendError, ExecutionBackend, PlayerId, SessionOperation, SessionRequest,
    SessionSnapshot, SignedRequest, SimulationResult, SubmitAck, TxHash, TxStatus,
};

#[derive(Debug, Default, Clone)]
struct MockSession {
    round_number: u32,
    player1_prestige: i64,
    player2_prestige: i64,
    player1_committed: bool,
    player2_committed: bool,
    player1_verified: bool,
    player2_verified: bool,
    ended: bool,
    player1: String,
}

#[derive(Debug)]
struct PendingTx {
    polls_before_terminal: u32,
    terminal: TxStatus,
}

#[derive(Debug, Default)]
struct Inner {
    // Failure scripts
    unavailable: bool,
    simulate_rejections: u32,
    submit_rejections: u32,
    reject_op_names: HashSet<String>,
    drop_submissions: bool,
    polls_per_tx: u32,
    poll_errors: bool,

    // Observable state
    sequences: HashMap<String, u64>,
    transactions: HashMap<String, PendingTx>,
    applied: HashSet<String>,
    duplicate_submissions: u32,
    submissions: Vec<SessionOperation>,
    sessions: HashMap<u32, MockSession>,
}

/// In-memory [`ExecutionBackend`] with scriptable failures.
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every call with `BackendError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unwrap().unavailable = unavailable;
    }

    /// Reject the next `n` simulations.
    pub fn reject_simulations(&self, n: u32) {
        self.inner.lock().unwrap().simulate_rejections = n;
    }

    /// Reject the next `n` submissions.
    pub fn reject_submissions(&self, n: u32) {
        self.inner.lock().unwrap().submit_rejections = n;
    }

    /// Reject every submission of the named operation (`commit_plot`,
    /// `verify_plot`, ...), leaving the others untouched.
    pub fn reject_operations(&self, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .reject_op_names
            .insert(name.to_string());
    }

    /// Accept submissions but never apply or confirm them, as if every
    /// transaction vanished before reaching the backend's state machine.
    pub fn drop_submissions(&self, drop: bool) {
        self.inner.lock().unwrap().drop_submissions = drop;
    }

    /// Report `Pending` this many times per transaction before the
    /// terminal status.
    pub fn set_polls_per_tx(&self, n: u32) {
        self.inner.lock().unwrap().polls_per_tx = n;
    }

    /// Make every status poll fail with a network error.
    pub fn fail_polls(&self, fail: bool) {
        self.inner.lock().unwrap().poll_errors = fail;
    }

    pub fn submission_count(&self) -> usize {
        self.inner.lock().unwrap().submissions.len()
    }

    pub fn submissions(&self) -> Vec<SessionOperation> {
        self.inner.lock().unwrap().submissions.clone()
    }

    /// How many submissions were deduplicated as redundant re-issues.
    pub fn duplicate_submissions(&self) -> u32 {
        self.inner.lock().unwrap().duplicate_submissions
    }

    /// Whether a state transition with this dedup key was applied.
    pub fn applied(&self, key: &str) -> bool {
        self.inner.lock().unwrap().applied.contains(key)
    }

    fn apply(inner: &mut Inner, op: &SessionOperation) {
        match op {
            SessionOperation::StartSession {
                session_id,
                player1,
                ..
            } => {
                inner.sessions.insert(
                    *session_id,
                    MockSession {
                        round_number: 1,
                        player1_prestige: 50,
                        player2_prestige: 50,
                        player1: player1.to_string(),
                        ..Default::default()
                    },
                );
            }
            SessionOperation::CommitPlot {
                session_id, player, ..
            } => {
                if let Some(session) = inner.sessions.get_mut(session_id) {
                    if player.to_string() == session.player1 {
                        session.player1_committed = true;
                    } else {
                        session.player2_committed = true;
                    }
                }
            }
            SessionOperation::VerifyPlot {
                session_id, player, ..
            } => {
                if let Some(session) = inner.sessions.get_mut(session_id) {
                    if player.to_string() == session.player1 {
                        session.player1_verified = true;
                    } else {
                        session.player2_verified = true;
                    }
                }
            }
            SessionOperation::ResolveRound { session_id, .. } => {
                if let Some(session) = inner.sessions.get_mut(session_id) {
                    session.round_number += 1;
                    session.player1_committed = false;
                    session.player2_committed = false;
                    session.player1_verified = false;
                    session.player2_verified = false;
                }
            }
        }
    }
}

#[async_trait]
impl ExecutionBackend for MockBackend {
    async fn simulate(&self, _request: &SessionRequest) -> Result<SimulationResult, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.unavailable {
            return Err(BackendError::Unavailable("mock offline".to_string()));
        }
        if inner.simulate_rejections > 0 {
            inner.simulate_rejections -= 1;
            return Ok(SimulationResult::Rejected {
                reason: "scripted simulation rejection".to_string(),
            });
        }
        Ok(SimulationResult::Ok)
    }

    async fn submit(&self, signed: SignedRequest) -> Result<SubmitAck, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.unavailable {
            return Err(BackendError::Unavailable("mock offline".to_string()));
        }
        if inner.submit_rejections > 0 {
            inner.submit_rejections -= 1;
            return Err(BackendError::Rejected(
                "scripted submission rejection".to_string(),
            ));
        }
        if inner
            .reject_op_names
            .contains(signed.request.operation.name())
        {
            return Err(BackendError::Rejected(format!(
                "scripted rejection of {}",
                signed.request.operation.name()
            )));
        }

        let hash = TxHash(Uuid::new_v4().to_string());
        if inner.drop_submissions {
            inner.transactions.insert(
                hash.0.clone(),
                PendingTx {
                    polls_before_terminal: u32::MAX,
                    terminal: TxStatus::Success { return_value: None },
                },
            );
            return Ok(SubmitAck {
                hash,
                status: TxStatus::Pending,
            });
        }

        let op = signed.request.operation;
        inner.submissions.push(op.clone());

        // The backend deduplicates redundant state transitions: a re-issued
        // operation confirms without applying anything a second time.
        let key = op.dedup_key();
        if inner.applied.contains(&key) {
            inner.duplicate_submissions += 1;
        } else {
            inner.applied.insert(key);
            Self::apply(&mut inner, &op);
        }

        let polls_before_terminal = inner.polls_per_tx;
        inner.transactions.insert(
            hash.0.clone(),
            PendingTx {
                polls_before_terminal,
                terminal: TxStatus::Success { return_value: None },
            },
        );
        Ok(SubmitAck {
            hash,
            status: TxStatus::Pending,
        })
    }

    async fn poll_status(&self, hash: &TxHash) -> Result<TxStatus, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.unavailable {
            return Err(BackendError::Unavailable("mock offline".to_string()));
        }
        if inner.poll_errors {
            return Err(BackendError::Network("scripted poll failure".to_string()));
        }
        let tx = inner
            .transactions
            .get_mut(&hash.0)
            .ok_or_else(|| BackendError::MalformedResponse(format!("unknown tx {}", hash)))?;
        if tx.polls_before_terminal > 0 {
            tx.polls_before_terminal -= 1;
            return Ok(TxStatus::Pending);
        }
        Ok(tx.terminal.clone())
    }

    async fn get_account(&self, identity: &PlayerId) -> Result<AccountMeta, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.unavailable {
            return Err(BackendError::Unavailable("mock offline".to_string()));
        }
        let sequence = inner
            .sequences
            .entry(identity.to_string())
            .and_modify(|s| *s += 1)
            .or_insert(0);
        Ok(AccountMeta {
            identity: identity.clone(),
            sequence: *sequence,
        })
    }

    async fn fetch_session_state(
        &self,
        session_id: u32,
    ) -> Result<Option<SessionSnapshot>, BackendError> {
        let inner = self.inner.lock().unwrap();
        if inner.unavailable {
            return Err(BackendError::Unavailable("mock offline".to_string()));
        }
        Ok(inner.sessions.get(&session_id).map(|s| SessionSnapshot {
            session_id,
            round_number: s.round_number,
            player1_prestige: s.player1_prestige,
            player2_prestige: s.player2_prestige,
            player1_committed: s.player1_committed,
            player2_committed: s.player2_committed,
            player1_verified: s.player1_verified,
            player2_verified: s.player2_verified,
            ended: s.ended,
        }))
    }
}
