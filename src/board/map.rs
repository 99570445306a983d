//! Board construction from map data.
//!
//! A map is described in JSON (`BoardSpec`) by area codes and validated into
//! an immutable `Board` that addresses areas by `AreaId`. The irregular rule
//! data of the printed map (per-coast fleet neighbours, fleet barriers between
//! bordering areas, straits) is kept as explicit lookup tables rather than
//! derived from the border graph.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::area::{Area, AreaFlags, AreaId, Coast};

/// The bundled sample map.
const TUSCANY_JSON: &str = include_str!("../../maps/tuscany.json");

/// Errors raised while validating map data.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("invalid map JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate area code '{0}'")]
    DuplicateArea(String),

    #[error("unknown area code '{0}'")]
    UnknownArea(String),

    #[error("area '{0}' borders itself")]
    SelfBorder(String),

    #[error("area '{0}' declares a single named coast; split coasts need at least two")]
    SingleCoast(String),

    #[error("coast rule {area}/{coast} names '{neighbour}', which does not border {area}")]
    CoastNotBordering {
        area: String,
        coast: String,
        neighbour: String,
    },

    #[error("too many areas: {0}")]
    TooManyAreas(usize),
}

/// JSON description of one area.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AreaSpec {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sea: bool,
    #[serde(default)]
    pub coast: bool,
    #[serde(default)]
    pub city: bool,
    #[serde(default)]
    pub fortified: bool,
    #[serde(default)]
    pub port: bool,
    #[serde(default)]
    pub lagoon: bool,
    /// Coast id -> codes reachable by fleet from that coast.
    #[serde(default)]
    pub coasts: BTreeMap<Coast, Vec<String>>,
}

/// JSON description of a strait crossing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StraitSpec {
    pub ends: [String; 2],
    pub controller: String,
}

/// JSON description of a full map.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BoardSpec {
    pub areas: Vec<AreaSpec>,
    #[serde(default)]
    pub borders: Vec<[String; 2]>,
    #[serde(default)]
    pub fleet_barriers: Vec<[String; 2]>,
    #[serde(default)]
    pub straits: Vec<StraitSpec>,
}

/// A crossing between two bordering areas that an enemy fleet standing in
/// `controller` closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strait {
    pub ends: (AreaId, AreaId),
    pub controller: AreaId,
}

/// The static board graph. Shared read-only by every game on the map.
#[derive(Debug, Clone)]
pub struct Board {
    pub(super) areas: Vec<Area>,
    pub(super) by_code: HashMap<String, AreaId>,
    /// Sorted neighbour lists, indexed by `AreaId`.
    pub(super) borders: Vec<Vec<AreaId>>,
    /// (area, coast) -> neighbours a fleet on that coast can reach.
    pub(super) coast_links: BTreeMap<(AreaId, Coast), Vec<AreaId>>,
    /// Bordering pairs fleets cannot cross, stored as (min, max).
    pub(super) fleet_barriers: BTreeSet<(AreaId, AreaId)>,
    pub(super) straits: Vec<Strait>,
}

impl Board {
    /// Parses and validates a map from JSON.
    pub fn from_json(json: &str) -> Result<Board, BoardError> {
        let spec: BoardSpec = serde_json::from_str(json)?;
        Board::from_spec(&spec)
    }

    /// Validates a map description into a board.
    pub fn from_spec(spec: &BoardSpec) -> Result<Board, BoardError> {
        if spec.areas.len() > u16::MAX as usize {
            return Err(BoardError::TooManyAreas(spec.areas.len()));
        }

        let mut areas = Vec::with_capacity(spec.areas.len());
        let mut by_code = HashMap::with_capacity(spec.areas.len());
        for (i, a) in spec.areas.iter().enumerate() {
            let id = AreaId(i as u16);
            if by_code.insert(a.code.clone(), id).is_some() {
                return Err(BoardError::DuplicateArea(a.code.clone()));
            }
            if a.coasts.len() == 1 {
                return Err(BoardError::SingleCoast(a.code.clone()));
            }
            areas.push(Area {
                id,
                code: a.code.clone(),
                name: if a.name.is_empty() { a.code.clone() } else { a.name.clone() },
                flags: AreaFlags {
                    is_sea: a.sea,
                    is_coast: a.coast,
                    has_city: a.city,
                    is_fortified: a.fortified,
                    has_port: a.port,
                    is_lagoon: a.lagoon,
                },
                coasts: a.coasts.keys().copied().collect(),
            });
        }

        let lookup = |code: &str| -> Result<AreaId, BoardError> {
            by_code
                .get(code)
                .copied()
                .ok_or_else(|| BoardError::UnknownArea(code.to_string()))
        };

        let mut borders: Vec<BTreeSet<AreaId>> = vec![BTreeSet::new(); areas.len()];
        for [a, b] in &spec.borders {
            let (ia, ib) = (lookup(a)?, lookup(b)?);
            if ia == ib {
                return Err(BoardError::SelfBorder(a.clone()));
            }
            borders[ia.index()].insert(ib);
            borders[ib.index()].insert(ia);
        }

        let mut coast_links = BTreeMap::new();
        for a in &spec.areas {
            let id = lookup(&a.code)?;
            for (coast, neighbours) in &a.coasts {
                let mut ids = Vec::with_capacity(neighbours.len());
                for n in neighbours {
                    let nid = lookup(n)?;
                    if !borders[id.index()].contains(&nid) {
                        return Err(BoardError::CoastNotBordering {
                            area: a.code.clone(),
                            coast: coast.abbr().to_string(),
                            neighbour: n.clone(),
                        });
                    }
                    ids.push(nid);
                }
                ids.sort();
                ids.dedup();
                coast_links.insert((id, *coast), ids);
            }
        }

        let mut fleet_barriers = BTreeSet::new();
        for [a, b] in &spec.fleet_barriers {
            let (ia, ib) = (lookup(a)?, lookup(b)?);
            fleet_barriers.insert((ia.min(ib), ia.max(ib)));
        }

        let mut straits = Vec::with_capacity(spec.straits.len());
        for s in &spec.straits {
            straits.push(Strait {
                ends: (lookup(&s.ends[0])?, lookup(&s.ends[1])?),
                controller: lookup(&s.controller)?,
            });
        }

        Ok(Board {
            areas,
            by_code,
            borders: borders.into_iter().map(|s| s.into_iter().collect()).collect(),
            coast_links,
            fleet_barriers,
            straits,
        })
    }

    /// Number of areas on the board.
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Returns true if the board has no areas.
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Returns true if `id` names an area of this board.
    pub fn contains(&self, id: AreaId) -> bool {
        id.index() < self.areas.len()
    }

    /// Returns the area for `id`, or None if out of range.
    pub fn get(&self, id: AreaId) -> Option<&Area> {
        self.areas.get(id.index())
    }

    /// Returns the area for `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this board. Callers validate ids
    /// before adjudication starts.
    pub fn area(&self, id: AreaId) -> &Area {
        &self.areas[id.index()]
    }

    /// Returns the code of an area, or `"???"` for an unknown id.
    pub fn code(&self, id: AreaId) -> &str {
        self.get(id).map(|a| a.code.as_str()).unwrap_or("???")
    }

    /// Looks up an area by its code.
    pub fn find(&self, code: &str) -> Option<AreaId> {
        self.by_code.get(code).copied()
    }

    /// Iterates over all areas in id order.
    pub fn areas(&self) -> impl Iterator<Item = &Area> {
        self.areas.iter()
    }

    /// Returns the sorted list of areas bordering `id`.
    pub fn borders(&self, id: AreaId) -> &[AreaId] {
        self.borders.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the strait rules of the map.
    pub fn straits(&self) -> &[Strait] {
        &self.straits
    }
}

pub mod maps {
    //! Bundled maps.

    use super::{Board, BoardError, TUSCANY_JSON};

    /// A compact central-Italian map exercising every rule feature: split
    /// coasts (Croatia), the Venetian lagoon, a fleet barrier (Rome/Capua)
    /// and a strait (Piombino/Elba, controlled from the Tyrrhenian Sea).
    pub fn tuscany() -> Result<Board, BoardError> {
        Board::from_json(TUSCANY_JSON)
    }
}
