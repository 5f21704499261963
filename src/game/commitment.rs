//! Hash commitment construction and verification
//!
//! A commitment seals a player's secret plot before the opponent's choice
//! is known. The digest is `SHA256(target_tag || nonce || action_byte)`;
//! the nonce and action are the committer's private material until the
//! reveal step of the same round.
//!
//! The scheme is deliberately pluggable: a zero-knowledge proof of
//! preimage knowledge can replace the hash check without changing the
//! `commit`/`verify` contract shape.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CommitmentError;
use crate::game::action::PlotAction;

/// Length in bytes of nonces, target tags, and digests.
pub const COMMITMENT_LEN: usize = 32;

/// A sealed plot: the public digest plus the private material that
/// opens it.
///
/// `nonce` and `action` must never be disclosed before the reveal phase
/// of the round the commitment was created for. The commitment is
/// discarded once the round resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotCommitment {
    /// The committed action (private until reveal).
    pub action: PlotAction,
    /// Fresh random blinding value (private until reveal).
    pub nonce: [u8; COMMITMENT_LEN],
    /// Public tag identifying the plot target.
    pub target_tag: [u8; COMMITMENT_LEN],
    /// `SHA256(target_tag || nonce || action_byte)`.
    pub digest: [u8; COMMITMENT_LEN],
}

impl PlotCommitment {
    /// Seal `action` against `target_tag` with a fresh random nonce.
    ///
    /// The nonce comes from the operating system CSPRNG; if no secure
    /// entropy source exists this fails with
    /// [`CommitmentError::EntropyUnavailable`].
    pub fn commit(
        target_tag: [u8; COMMITMENT_LEN],
        action: PlotAction,
    ) -> Result<Self, CommitmentError> {
        let mut nonce = [0u8; COMMITMENT_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| CommitmentError::EntropyUnavailable(e.to_string()))?;

        let digest = Self::compute_digest(&target_tag, &nonce, action);

        Ok(Self {
            action,
            nonce,
            target_tag,
            digest,
        })
    }

    /// Recompute the digest from revealed material and compare against
    /// the stored digest in constant time.
    ///
    /// Returns `false` on any mismatch, never an error. This check is the
    /// sole gate preventing a player from changing their action after
    /// seeing the opponent's.
    pub fn verify(
        &self,
        revealed_action: PlotAction,
        revealed_nonce: &[u8; COMMITMENT_LEN],
        revealed_target: &[u8; COMMITMENT_LEN],
    ) -> bool {
        let recomputed = Self::compute_digest(revealed_target, revealed_nonce, revealed_action);
        constant_time_eq(&self.digest, &recomputed)
    }

    /// Digest construction shared by `commit` and `verify`.
    pub fn compute_digest(
        target_tag: &[u8; COMMITMENT_LEN],
        nonce: &[u8; COMMITMENT_LEN],
        action: PlotAction,
    ) -> [u8; COMMITMENT_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(target_tag);
        hasher.update(nonce);
        hasher.update([action.as_byte()]);
        hasher.finalize().into()
    }

    /// Digest as lowercase hex, for ledger entries and logging.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Constant-time byte equality. Accumulates the XOR of every byte pair so
/// the comparison cost does not depend on where the first difference is.
fn constant_time_eq(a: &[u8; COMMITMENT_LEN], b: &[u8; COMMITMENT_LEN]) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
