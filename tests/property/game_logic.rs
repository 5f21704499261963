//! Property-based tests for resolution and session invariants

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use intrigue::{
    GameConfig, PlayerId, PlayerSlot, PlotAction, ResolutionConfig, Resolver, RoundWinner,
    SessionEngine, SessionMode, SessionPhase,
};

fn arb_action() -> impl Strategy<Value = PlotAction> {
    prop::sample::select(PlotAction::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_resolution_is_consistent_with_dominance(
        a in arb_action(),
        b in arb_action(),
        seed in any::<u64>(),
    ) {
        let config = ResolutionConfig::default();
        let resolver = Resolver::new(config.clone());
        let outcome = resolver.resolve(a, b, &mut StdRng::seed_from_u64(seed));

        if a == b {
            prop_assert_eq!(outcome.winner, RoundWinner::Draw);
            prop_assert_eq!(outcome.prestige_delta.0, outcome.prestige_delta.1);
            prop_assert!(outcome.prestige_delta.0 >= 0);
            prop_assert_eq!(outcome.hp_damage, (0, 0));
        } else if a.beats(b) {
            prop_assert_eq!(outcome.winner, RoundWinner::Player1);
            prop_assert_eq!(outcome.prestige_delta.0, config.prestige_for(a));
            prop_assert_eq!(outcome.prestige_delta.1, -config.failed_plot_penalty);
            prop_assert_eq!(outcome.hp_damage.0, 0);
            prop_assert!(
                (config.damage_min..=config.damage_max).contains(&outcome.hp_damage.1)
            );
        } else {
            prop_assert_eq!(outcome.winner, RoundWinner::Player2);
            prop_assert_eq!(outcome.prestige_delta.1, config.prestige_for(b));
            prop_assert_eq!(outcome.prestige_delta.0, -config.failed_plot_penalty);
            prop_assert_eq!(outcome.hp_damage.1, 0);
        }
    }

    #[test]
    fn prop_mirrored_matchups_flip_the_winner(
        a in arb_action(),
        b in arb_action(),
        seed in any::<u64>(),
    ) {
        let resolver = Resolver::new(ResolutionConfig::default());
        let forward = resolver.resolve(a, b, &mut StdRng::seed_from_u64(seed));
        let backward = resolver.resolve(b, a, &mut StdRng::seed_from_u64(seed));

        match forward.winner {
            RoundWinner::Draw => {
                prop_assert_eq!(backward.winner, RoundWinner::Draw);
            }
            RoundWinner::Player1 => {
                prop_assert_eq!(backward.winner, RoundWinner::Player2);
                prop_assert_eq!(forward.prestige_delta.0, backward.prestige_delta.1);
                prop_assert_eq!(forward.prestige_delta.1, backward.prestige_delta.0);
            }
            RoundWinner::Player2 => {
                prop_assert_eq!(backward.winner, RoundWinner::Player1);
                prop_assert_eq!(forward.prestige_delta.0, backward.prestige_delta.1);
                prop_assert_eq!(forward.prestige_delta.1, backward.prestige_delta.0);
            }
        }
    }

    #[test]
    fn prop_session_invariants_hold_over_any_match(
        actions in prop::collection::vec((arb_action(), arb_action()), 1..20),
        seed in any::<u64>(),
    ) {
        let game_config = GameConfig {
            max_rounds: 25,
            ..Default::default()
        };
        let max_prestige = game_config.max_prestige;
        let max_hit_points = game_config.max_hit_points;

        let mut engine = SessionEngine::with_rng(
            1,
            PlayerId::new("duke"),
            PlayerId::new("baron"),
            game_config,
            ResolutionConfig::default(),
            SessionMode::Local,
            StdRng::seed_from_u64(seed),
        )
        .unwrap();
        engine.start().unwrap();

        let mut expected_round = 1u32;
        for (a1, a2) in actions {
            if engine.phase() == SessionPhase::GameOver {
                break;
            }

            engine.select_action(PlayerSlot::Player1, a1).unwrap();
            engine.select_action(PlayerSlot::Player2, a2).unwrap();
            engine.seal_plots().unwrap();
            engine.complete_reveals().unwrap();
            let resolution = engine.resolve_round().unwrap();

            prop_assert_eq!(resolution.round_number, expected_round);

            let session = engine.session();
            for slot in PlayerSlot::BOTH {
                let player = session.player(slot);
                prop_assert!(player.prestige >= 0 && player.prestige <= max_prestige);
                prop_assert!(player.hit_points <= max_hit_points);
            }
            prop_assert!(session.commitments.is_empty());

            if resolution.terminal {
                prop_assert_eq!(engine.phase(), SessionPhase::GameOver);
                prop_assert!(session.winner.is_some());
                // Round numbers stop advancing at termination.
                prop_assert_eq!(session.round_number, expected_round);
            } else {
                expected_round += 1;
                prop_assert_eq!(session.round_number, expected_round);
            }
        }
    }
}
