//! Round resolution engine
//!
//! Pure matchup logic: two revealed actions in, one [`RoundOutcome`] out.
//! The outcome is a function of the action pair alone, never of player
//! identity or history, so any observer can reproduce it from committed
//! data. Loser damage is the single point of randomness and the RNG is
//! injected by the caller; the engine never draws from ambient state.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::action::PlotAction;

/// Which player won the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundWinner {
    Draw,
    Player1,
    Player2,
}

/// Immutable result of one resolved round.
///
/// Deltas are reported pairwise as `(player1, player2)`. The resolution
/// engine never touches [`PlayerState`](crate::game::session::PlayerState)
/// directly; the state machine applies and clamps these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub winner: RoundWinner,
    pub prestige_delta: (i64, i64),
    pub hp_damage: (u32, u32),
}

/// Policy constants for round resolution.
///
/// The magnitudes follow the "riskier plot, bigger reward" design:
/// assassination pays the most, bribery the least. They are configuration,
/// not invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Prestige both players gain on a draw.
    pub draw_bonus: i64,
    /// Winner prestige when the winning action was assassination.
    pub assassination_prestige: i64,
    /// Winner prestige when the winning action was rebellion.
    pub rebellion_prestige: i64,
    /// Winner prestige when the winning action was bribery.
    pub bribery_prestige: i64,
    /// Prestige the loser forfeits (stored positive, applied negative).
    pub failed_plot_penalty: i64,
    /// Inclusive bounds for the loser's randomized damage roll.
    pub damage_min: u32,
    pub damage_max: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            draw_bonus: 5,
            assassination_prestige: 30,
            rebellion_prestige: 20,
            bribery_prestige: 15,
            failed_plot_penalty: 10,
            damage_min: 5,
            damage_max: 15,
        }
    }
}

impl ResolutionConfig {
    /// Prestige magnitude awarded for winning with `action`.
    pub fn prestige_for(&self, action: PlotAction) -> i64 {
        match action {
            PlotAction::Assassination => self.assassination_prestige,
            PlotAction::Rebellion => self.rebellion_prestige,
            PlotAction::Bribery => self.bribery_prestige,
        }
    }
}

/// Round resolver parameterized by [`ResolutionConfig`].
#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolutionConfig,
}

impl Resolver {
    pub fn new(config: ResolutionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Resolve one round from two revealed actions.
    ///
    /// Total and deterministic apart from the loser's damage roll, which
    /// is drawn from `rng` within the configured bounds.
    pub fn resolve<R: Rng>(
        &self,
        p1_action: PlotAction,
        p2_action: PlotAction,
        rng: &mut R,
    ) -> RoundOutcome {
        if p1_action == p2_action {
            return RoundOutcome {
                winner: RoundWinner::Draw,
                prestige_delta: (self.config.draw_bonus, self.config.draw_bonus),
                hp_damage: (0, 0),
            };
        }

        let damage = rng.gen_range(self.config.damage_min..=self.config.damage_max);

        if p1_action.beats(p2_action) {
            RoundOutcome {
                winner: RoundWinner::Player1,
                prestige_delta: (
                    self.config.prestige_for(p1_action),
                    -self.config.failed_plot_penalty,
                ),
                hp_damage: (0, damage),
            }
        } else {
            RoundOutcome {
                winner: RoundWinner::Player2,
                prestige_delta: (
                    -self.config.failed_plot_penalty,
                    self.config.prestige_for(p2_action),
                ),
                hp_damage: (damage, 0),
            }
        }
    }
}
