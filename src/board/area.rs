//! Area definitions and metadata.
//!
//! Areas are the nodes of the board graph. Unlike a fixed map compiled into
//! the binary, the board is loaded from data, so areas are addressed by a
//! dense `AreaId` index assigned at load time. Area metadata (code, name,
//! terrain flags, named coasts) never changes during a game.

use serde::{Deserialize, Serialize};

/// Index of an area within its `Board`.
///
/// Ids are assigned in the order areas appear in the map data and are only
/// meaningful together with the board that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(pub u16);

impl AreaId {
    /// Returns the id as a vector index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Coast specifier for areas with more than one coastline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Coast {
    #[serde(rename = "nc")]
    North,
    #[serde(rename = "sc")]
    South,
    #[serde(rename = "ec")]
    East,
    #[serde(rename = "wc")]
    West,
}

impl Coast {
    /// Returns the 2-letter abbreviation.
    pub const fn abbr(self) -> &'static str {
        match self {
            Coast::North => "nc",
            Coast::South => "sc",
            Coast::East => "ec",
            Coast::West => "wc",
        }
    }

    /// Parses a coast from its 2-letter abbreviation.
    pub fn from_abbr(s: &str) -> Option<Coast> {
        match s {
            "nc" => Some(Coast::North),
            "sc" => Some(Coast::South),
            "ec" => Some(Coast::East),
            "wc" => Some(Coast::West),
            _ => None,
        }
    }
}

/// Terrain and feature flags of an area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaFlags {
    pub is_sea: bool,
    pub is_coast: bool,
    pub has_city: bool,
    /// Fortified cities and standalone fortresses. Garrisons live here.
    pub is_fortified: bool,
    pub has_port: bool,
    /// The landlocked capital lagoon: fleets only, armies may never enter.
    pub is_lagoon: bool,
}

/// An immutable board node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub code: String,
    pub name: String,
    pub flags: AreaFlags,
    /// Named coasts. Empty unless the area has more than one coastline.
    pub coasts: Vec<Coast>,
}

impl Area {
    /// Returns true if this area has split coasts.
    pub fn has_coasts(&self) -> bool {
        !self.coasts.is_empty()
    }

    /// Returns true if the area exposes the given coast.
    pub fn has_coast(&self, coast: Coast) -> bool {
        self.coasts.contains(&coast)
    }

    /// Returns true if a fleet may stand in this area.
    pub fn accepts_fleet(&self) -> bool {
        self.flags.is_sea || self.flags.is_coast
    }

    /// Returns true if an army may stand in this area.
    pub fn accepts_army(&self) -> bool {
        !self.flags.is_sea && !self.flags.is_lagoon
    }

    /// Returns true if a garrison may stand in this area.
    pub fn accepts_garrison(&self) -> bool {
        self.flags.is_fortified
    }
}
