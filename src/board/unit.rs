//! Unit types and ownership.
//!
//! Represents armies, fleets and garrisons, their owning player, their
//! position on the board and the per-unit turn state (siege progress and the
//! pending retreat flag).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::area::{AreaId, Coast};

/// Stable identifier of a unit, assigned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

/// Identifier of a player, assigned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u16);

/// The type of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Army,
    Fleet,
    Garrison,
}

impl UnitType {
    /// Returns the uppercase abbreviation used in order notation.
    pub const fn letter(self) -> char {
        match self {
            UnitType::Army => 'A',
            UnitType::Fleet => 'F',
            UnitType::Garrison => 'G',
        }
    }

    /// Parses a unit type from its uppercase abbreviation.
    pub fn from_letter(c: char) -> Option<UnitType> {
        match c {
            'A' => Some(UnitType::Army),
            'F' => Some(UnitType::Fleet),
            'G' => Some(UnitType::Garrison),
            _ => None,
        }
    }

    /// Returns true for the two unit types that can move.
    pub const fn is_mobile(self) -> bool {
        matches!(self, UnitType::Army | UnitType::Fleet)
    }
}

/// Siege progress of a besieging unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiegeStage {
    #[default]
    None,
    First,
    Second,
}

impl SiegeStage {
    /// Returns the numeric siege counter (0, 1 or 2).
    pub const fn counter(self) -> u8 {
        match self {
            SiegeStage::None => 0,
            SiegeStage::First => 1,
            SiegeStage::Second => 2,
        }
    }
}

/// A unit on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub player: PlayerId,
    pub unit_type: UnitType,
    pub area: AreaId,
    /// Only set for a fleet standing on one coast of a split-coast area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coast: Option<Coast>,
    #[serde(default)]
    pub siege: SiegeStage,
    /// Origin area of the attacker that dislodged this unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_retreat: Option<AreaId>,
    #[serde(default = "default_power")]
    pub power: u8,
}

fn default_power() -> u8 {
    1
}

impl Unit {
    /// Creates a unit with base power 1 and no turn state.
    pub fn new(id: UnitId, player: PlayerId, unit_type: UnitType, area: AreaId) -> Self {
        Self {
            id,
            player,
            unit_type,
            area,
            coast: None,
            siege: SiegeStage::None,
            must_retreat: None,
            power: 1,
        }
    }

    /// Creates an army.
    pub fn army(id: u32, player: u16, area: AreaId) -> Self {
        Self::new(UnitId(id), PlayerId(player), UnitType::Army, area)
    }

    /// Creates a fleet.
    pub fn fleet(id: u32, player: u16, area: AreaId) -> Self {
        Self::new(UnitId(id), PlayerId(player), UnitType::Fleet, area)
    }

    /// Creates a garrison.
    pub fn garrison(id: u32, player: u16, area: AreaId) -> Self {
        Self::new(UnitId(id), PlayerId(player), UnitType::Garrison, area)
    }

    /// Places the unit on a named coast.
    pub fn on_coast(mut self, coast: Coast) -> Self {
        self.coast = Some(coast);
        self
    }

    /// Sets the siege stage.
    pub fn with_siege(mut self, siege: SiegeStage) -> Self {
        self.siege = siege;
        self
    }

    /// Returns true if the unit is an army or a fleet.
    pub fn is_mobile(&self) -> bool {
        self.unit_type.is_mobile()
    }

    /// Returns true if the unit was dislodged and awaits its retreat.
    pub fn is_dislodged(&self) -> bool {
        self.must_retreat.is_some()
    }

    /// Returns true if this unit moves with fleet adjacency.
    pub fn is_fleet(&self) -> bool {
        self.unit_type == UnitType::Fleet
    }
}

/// Read access to a set of units, by id and by position.
pub trait UnitLookup {
    fn unit(&self, id: UnitId) -> Option<&Unit>;

    /// Returns the unit of `unit_type` in `area`, preferring one that is not
    /// awaiting a retreat.
    fn unit_at(&self, unit_type: UnitType, area: AreaId) -> Option<&Unit>;
}

fn unit_at_in<'a>(
    units: impl Iterator<Item = &'a Unit>,
    unit_type: UnitType,
    area: AreaId,
) -> Option<&'a Unit> {
    units
        .filter(|u| u.unit_type == unit_type && u.area == area)
        .min_by_key(|u| u.is_dislodged())
}

impl UnitLookup for [Unit] {
    fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.iter().find(|u| u.id == id)
    }

    fn unit_at(&self, unit_type: UnitType, area: AreaId) -> Option<&Unit> {
        unit_at_in(self.iter(), unit_type, area)
    }
}

impl UnitLookup for Vec<Unit> {
    fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.as_slice().unit(id)
    }

    fn unit_at(&self, unit_type: UnitType, area: AreaId) -> Option<&Unit> {
        self.as_slice().unit_at(unit_type, area)
    }
}

impl UnitLookup for BTreeMap<UnitId, Unit> {
    fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.get(&id)
    }

    fn unit_at(&self, unit_type: UnitType, area: AreaId) -> Option<&Unit> {
        unit_at_in(self.values(), unit_type, area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_roundtrip() {
        for t in [UnitType::Army, UnitType::Fleet, UnitType::Garrison] {
            assert_eq!(UnitType::from_letter(t.letter()), Some(t));
        }
        assert_eq!(UnitType::from_letter('X'), None);
    }

    #[test]
    fn garrison_is_not_mobile() {
        assert!(UnitType::Army.is_mobile());
        assert!(UnitType::Fleet.is_mobile());
        assert!(!UnitType::Garrison.is_mobile());
    }

    #[test]
    fn unit_json_defaults() {
        let u: Unit =
            serde_json::from_str(r#"{"id":3,"player":1,"unit_type":"garrison","area":7}"#).unwrap();
        assert_eq!(u, Unit::garrison(3, 1, AreaId(7)));
        assert_eq!(u.power, 1);
        assert_eq!(u.siege.counter(), 0);
    }

    #[test]
    fn lookup_prefers_units_in_place() {
        let mut dislodged = Unit::army(1, 1, AreaId(5));
        dislodged.must_retreat = Some(AreaId(6));
        let units = vec![dislodged, Unit::army(2, 2, AreaId(5)), Unit::garrison(3, 1, AreaId(5))];
        assert_eq!(units.unit_at(UnitType::Army, AreaId(5)).map(|u| u.id), Some(UnitId(2)));
        assert_eq!(units.unit_at(UnitType::Garrison, AreaId(5)).map(|u| u.id), Some(UnitId(3)));
        assert!(units.unit_at(UnitType::Fleet, AreaId(5)).is_none());
        assert_eq!(units.unit(UnitId(1)).map(|u| u.area), Some(AreaId(5)));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_string(&Unit::army(1, 2, AreaId(3))).unwrap();
        assert!(!json.contains("coast"));
        assert!(!json.contains("must_retreat"));
    }
}
