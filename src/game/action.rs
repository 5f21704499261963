//! Plot actions and their dominance cycle

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three secret plots a player can commit to in a round.
///
/// Dominance is cyclic and non-transitive:
/// Assassination beats Bribery, Bribery beats Rebellion, and Rebellion
/// beats Assassination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlotAction {
    Assassination,
    Bribery,
    Rebellion,
}

impl PlotAction {
    /// All actions, in wire-encoding order.
    pub const ALL: [PlotAction; 3] = [
        PlotAction::Assassination,
        PlotAction::Bribery,
        PlotAction::Rebellion,
    ];

    /// Whether this action dominates `other` in the cycle.
    pub fn beats(self, other: PlotAction) -> bool {
        matches!(
            (self, other),
            (PlotAction::Assassination, PlotAction::Bribery)
                | (PlotAction::Bribery, PlotAction::Rebellion)
                | (PlotAction::Rebellion, PlotAction::Assassination)
        )
    }

    /// The action this one loses to.
    pub fn beaten_by(self) -> PlotAction {
        match self {
            PlotAction::Assassination => PlotAction::Rebellion,
            PlotAction::Bribery => PlotAction::Assassination,
            PlotAction::Rebellion => PlotAction::Bribery,
        }
    }

    /// Single-byte wire encoding used inside commitment digests and
    /// backend requests.
    pub fn as_byte(self) -> u8 {
        match self {
            PlotAction::Assassination => 0,
            PlotAction::Bribery => 1,
            PlotAction::Rebellion => 2,
        }
    }

    /// Decode the wire byte. Returns `None` for unknown values.
    pub fn from_byte(byte: u8) -> Option<PlotAction> {
        match byte {
            0 => Some(PlotAction::Assassination),
            1 => Some(PlotAction::Bribery),
            2 => Some(PlotAction::Rebellion),
            _ => None,
        }
    }
}

impl fmt::Display for PlotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlotAction::Assassination => "assassination",
            PlotAction::Bribery => "bribery",
            PlotAction::Rebellion => "rebellion",
        };
        write!(f, "{}", name)
    }
}
