//! Property-based tests for commitment security
//!
//! The digest is the sole gate against after-the-fact action changes, so
//! any single-byte perturbation of the revealed material must break
//! verification.

use proptest::prelude::*;

use intrigue::{PlotAction, PlotCommitment};

fn arb_action() -> impl Strategy<Value = PlotAction> {
    prop::sample::select(PlotAction::ALL.to_vec())
}

fn arb_tag() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

proptest! {
    #[test]
    fn prop_commit_verify_round_trip(tag in arb_tag(), action in arb_action()) {
        let commitment = PlotCommitment::commit(tag, action).unwrap();
        prop_assert!(commitment.verify(action, &commitment.nonce, &tag));
    }

    #[test]
    fn prop_flipped_nonce_bit_breaks_verification(
        tag in arb_tag(),
        action in arb_action(),
        index in 0usize..32,
        bit in 0u8..8,
    ) {
        let commitment = PlotCommitment::commit(tag, action).unwrap();
        let mut nonce = commitment.nonce;
        nonce[index] ^= 1 << bit;
        prop_assert!(!commitment.verify(action, &nonce, &tag));
    }

    #[test]
    fn prop_flipped_target_bit_breaks_verification(
        tag in arb_tag(),
        action in arb_action(),
        index in 0usize..32,
        bit in 0u8..8,
    ) {
        let commitment = PlotCommitment::commit(tag, action).unwrap();
        let mut revealed_tag = tag;
        revealed_tag[index] ^= 1 << bit;
        prop_assert!(!commitment.verify(action, &commitment.nonce, &revealed_tag));
    }

    #[test]
    fn prop_swapped_action_breaks_verification(
        tag in arb_tag(),
        action in arb_action(),
        other in arb_action(),
    ) {
        prop_assume!(action != other);
        let commitment = PlotCommitment::commit(tag, action).unwrap();
        prop_assert!(!commitment.verify(other, &commitment.nonce, &tag));
    }

    #[test]
    fn prop_tampered_digest_breaks_verification(
        tag in arb_tag(),
        action in arb_action(),
        index in 0usize..32,
        bit in 0u8..8,
    ) {
        let mut commitment = PlotCommitment::commit(tag, action).unwrap();
        let nonce = commitment.nonce;
        commitment.digest[index] ^= 1 << bit;
        prop_assert!(!commitment.verify(action, &nonce, &tag));
    }

    #[test]
    fn prop_fresh_commitments_never_collide(tag in arb_tag(), action in arb_action()) {
        // Same inputs, fresh nonces: the digests must still differ, or the
        // commitment would leak whether two players chose the same plot.
        let a = PlotCommitment::commit(tag, action).unwrap();
        let b = PlotCommitment::commit(tag, action).unwrap();
        prop_assert_ne!(a.nonce, b.nonce);
        prop_assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn prop_digest_is_deterministic_in_its_inputs(
        tag in arb_tag(),
        nonce in arb_tag(),
        action in arb_action(),
    ) {
        let a = PlotCommitment::compute_digest(&tag, &nonce, action);
        let b = PlotCommitment::compute_digest(&tag, &nonce, action);
        prop_assert_eq!(a, b);
    }
}
