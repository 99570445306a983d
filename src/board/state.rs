//! Per-turn context handed to the adjudicator.
//!
//! The economic subsystem owns rebellions and assassinations; the engine only
//! reads the facts it is given for the turn being adjudicated.

use serde::{Deserialize, Serialize};

use super::area::AreaId;
use super::unit::PlayerId;

/// Optional rule sets that change adjudication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOptions {
    /// Enables the finance rules, which grant the uncontested-rebellion bonus.
    pub finances: bool,
}

/// An area in revolt against a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rebellion {
    pub area: AreaId,
    pub against: PlayerId,
    /// The rebels hold the city's fortress.
    #[serde(default)]
    pub garrisoned: bool,
}

/// Read-only facts for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnContext {
    pub rules: RuleOptions,
    pub rebellions: Vec<Rebellion>,
    /// Players whose leader was assassinated this turn.
    pub assassinated: Vec<PlayerId>,
}

impl TurnContext {
    /// Returns the rebellion in `area`, if any.
    pub fn rebellion_in(&self, area: AreaId) -> Option<&Rebellion> {
        self.rebellions.iter().find(|r| r.area == area)
    }

    /// Returns the rebellion in `area` if it is directed against someone
    /// other than `player`.
    pub fn rebellion_against_other(&self, area: AreaId, player: PlayerId) -> Option<&Rebellion> {
        self.rebellion_in(area).filter(|r| r.against != player)
    }

    /// Returns true if `player` was assassinated this turn.
    pub fn is_assassinated(&self, player: PlayerId) -> bool {
        self.assassinated.contains(&player)
    }
}
