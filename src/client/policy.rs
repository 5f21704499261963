//! Opponent action policies
//!
//! The state machine treats every action source as opaque; a policy is
//! just anything that produces a [`PlotAction`] for a slot. Useful for
//! driving the non-human side of a session.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::action::PlotAction;
use crate::game::session::{PlayerSlot, Session};

/// A source of actions for one side of a session.
pub trait ActionPolicy: Send {
    fn choose(&mut self, session: &Session, slot: PlayerSlot) -> PlotAction;
}

/// Picks uniformly at random among the three plots.
pub struct UniformPolicy {
    rng: StdRng,
}

impl UniformPolicy {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionPolicy for UniformPolicy {
    fn choose(&mut self, _session: &Session, _slot: PlayerSlot) -> PlotAction {
        PlotAction::ALL[self.rng.gen_range(0..PlotAction::ALL.len())]
    }
}

/// Always counters the opponent's previous pending action if visible,
/// otherwise falls back to a fixed plot. Mostly a test opponent.
pub struct CounterPolicy {
    pub fallback: PlotAction,
}

impl ActionPolicy for CounterPolicy {
    fn choose(&mut self, session: &Session, slot: PlayerSlot) -> PlotAction {
        match session.player(slot.opponent()).pending_action {
            Some(action) => action.beaten_by(),
            None => self.fallback,
        }
    }
}
