//! Per-round audit ledger
//!
//! One entry per resolved round: enough committed data to re-derive the
//! outcome, plus the backend transaction hashes that durably recorded it.
//! Rounds whose backend trail is incomplete are marked unaudited rather
//! than dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::action::PlotAction;
use crate::game::resolution::RoundOutcome;

/// Exported audit record for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub session_id: u32,
    pub round_number: u32,
    pub p1_digest: String,
    pub p2_digest: String,
    pub p1_action: PlotAction,
    pub p2_action: PlotAction,
    pub outcome: RoundOutcome,
    /// Hashes of every backend transaction that carried this round.
    pub tx_hashes: Vec<String>,
    /// False when any backend commit/verify/resolve for the round did not
    /// confirm.
    pub audited: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only collection of round records for one session.
#[derive(Debug, Default)]
pub struct SessionLedger {
    records: Vec<RoundRecord>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: RoundRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Round numbers whose backend audit trail is incomplete.
    pub fn unaudited_rounds(&self) -> Vec<u32> {
        self.records
            .iter()
            .filter(|r| !r.audited)
            .map(|r| r.round_number)
            .collect()
    }

    /// Serialize the full ledger for export.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }
}
