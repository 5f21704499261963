//! Transaction orchestration
//!
//! Carries one logical session operation across the backend with the
//! sequence build -> simulate -> sign -> submit -> poll, and classifies
//! what happened. Rejections are retried a bounded number of times with
//! linear backoff; polling is bounded by a fixed interval and attempt
//! count. An exhausted poll budget is NOT a failure: the operation may
//! still complete later, and the caller must reconcile before trusting
//! its local mirror again.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::{
    BackendError, ExecutionBackend, RequestSigner, SessionOperation, SessionRequest,
    SimulationResult, TxHash, TxStatus,
};
use crate::config::BackendConfig;
use crate::error::{ProtocolError, ProtocolResult};

/// Classification of one orchestrated operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// Confirmed on the backend.
    Success {
        tx_hash: TxHash,
        return_value: Option<serde_json::Value>,
    },
    /// The dry run refused the request; nothing was submitted.
    SimulationRejected { reason: String },
    /// The backend refused or failed the submitted request.
    SubmissionRejected { reason: String },
    /// Poll budget exhausted while still pending. Indeterminate: neither
    /// success nor failure.
    TimedOutPending { tx_hash: TxHash },
    /// Submitted, but status queries failed before a terminal answer.
    /// Indeterminate, like `TimedOutPending`.
    SignedUnconfirmed { tx_hash: TxHash },
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Success { .. })
    }

    /// Definitive outcomes may be trusted to mutate local state;
    /// indeterminate ones require reconciliation first.
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            OperationOutcome::Success { .. }
                | OperationOutcome::SimulationRejected { .. }
                | OperationOutcome::SubmissionRejected { .. }
        )
    }

    /// Transaction hash, if the operation got far enough to have one.
    pub fn tx_hash(&self) -> Option<&TxHash> {
        match self {
            OperationOutcome::Success { tx_hash, .. }
            | OperationOutcome::TimedOutPending { tx_hash }
            | OperationOutcome::SignedUnconfirmed { tx_hash } => Some(tx_hash),
            _ => None,
        }
    }
}

/// Executes session operations against an [`ExecutionBackend`].
///
/// The backend handle is passed in explicitly at construction; there is
/// no ambient global connection. Both players' orchestrator calls are
/// independent and may run concurrently.
pub struct TxOrchestrator {
    backend: Arc<dyn ExecutionBackend>,
    signer: Arc<dyn RequestSigner>,
    config: BackendConfig,
}

impl TxOrchestrator {
    pub fn new(
        backend: Arc<dyn ExecutionBackend>,
        signer: Arc<dyn RequestSigner>,
        config: BackendConfig,
    ) -> Self {
        Self {
            backend,
            signer,
            config,
        }
    }

    /// Execute one operation, retrying rejections up to the configured
    /// bound with linear backoff.
    ///
    /// Re-issuing the same operation is safe at session/round/player
    /// granularity: the backend deduplicates redundant state transitions,
    /// so retries after an indeterminate outcome cannot double-apply.
    pub async fn execute(&self, operation: SessionOperation) -> ProtocolResult<OperationOutcome> {
        let correlation_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "orchestrate",
            op = operation.name(),
            session_id = operation.session_id(),
            %correlation_id,
        );

        async {
            let mut attempt = 0u32;
            loop {
                let outcome = self.execute_once(&operation, &correlation_id).await?;
                match &outcome {
                    OperationOutcome::SimulationRejected { reason }
                    | OperationOutcome::SubmissionRejected { reason }
                        if attempt < self.config.retry_attempts =>
                    {
                        attempt += 1;
                        warn!(attempt, %reason, "operation rejected, retrying");
                        let backoff = self.config.retry_backoff_ms * u64::from(attempt);
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                    _ => {
                        debug!(?outcome, "operation settled");
                        return Ok(outcome);
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute_once(
        &self,
        operation: &SessionOperation,
        correlation_id: &str,
    ) -> ProtocolResult<OperationOutcome> {
        // Build: fetch the sender's sequence number.
        let account = self
            .backend
            .get_account(self.signer.identity())
            .await
            .map_err(classify_backend_error)?;

        let request = SessionRequest {
            operation: operation.clone(),
            sender: self.signer.identity().clone(),
            sequence: account.sequence + 1,
            correlation_id: correlation_id.to_string(),
        };

        // Simulate before spending a signature.
        match self
            .backend
            .simulate(&request)
            .await
            .map_err(classify_backend_error)?
        {
            SimulationResult::Ok => debug!("simulation ok"),
            SimulationResult::Rejected { reason } => {
                return Ok(OperationOutcome::SimulationRejected { reason });
            }
        }

        // Assemble the final payload and sign.
        let signed = self
            .signer
            .sign(&request)
            .map_err(classify_backend_error)?;

        // Submit.
        let ack = match self.backend.submit(signed).await {
            Ok(ack) => ack,
            Err(BackendError::Rejected(reason)) => {
                return Ok(OperationOutcome::SubmissionRejected { reason });
            }
            Err(other) => return Err(classify_backend_error(other)),
        };
        debug!(tx_hash = %ack.hash, "submitted");

        // Fast path: some backends confirm synchronously.
        match ack.status {
            TxStatus::Success { return_value } => {
                return Ok(OperationOutcome::Success {
                    tx_hash: ack.hash,
                    return_value,
                });
            }
            TxStatus::Failed { reason } => {
                return Ok(OperationOutcome::SubmissionRejected { reason });
            }
            TxStatus::Pending => {}
        }

        self.poll_until_terminal(ack.hash).await
    }

    /// Bounded poll loop: fixed interval, fixed attempt count.
    ///
    /// Cancellation-safe: dropping the future mid-poll leaves the
    /// operation in a `TimedOutPending`-equivalent state that must be
    /// reconciled, never interpreted as failure.
    async fn poll_until_terminal(&self, tx_hash: TxHash) -> ProtocolResult<OperationOutcome> {
        for attempt in 0..self.config.max_poll_attempts {
            match self.backend.poll_status(&tx_hash).await {
                Ok(TxStatus::Success { return_value }) => {
                    return Ok(OperationOutcome::Success {
                        tx_hash,
                        return_value,
                    });
                }
                Ok(TxStatus::Failed { reason }) => {
                    return Ok(OperationOutcome::SubmissionRejected { reason });
                }
                Ok(TxStatus::Pending) => {
                    debug!(attempt, tx_hash = %tx_hash, "still pending");
                }
                Err(e) => {
                    // The transaction is signed and submitted; losing the
                    // status query does not make it a failure.
                    warn!(attempt, error = %e, "status poll failed");
                    return Ok(OperationOutcome::SignedUnconfirmed { tx_hash });
                }
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }

        Ok(OperationOutcome::TimedOutPending { tx_hash })
    }
}

/// Infrastructure failures become `BackendUnavailable` (fatal to backed
/// mode, surfaced once); everything else is passed through.
fn classify_backend_error(err: BackendError) -> ProtocolError {
    match err {
        BackendError::Unavailable(msg) => ProtocolError::BackendUnavailable(msg),
        other => ProtocolError::Backend(other),
    }
}
