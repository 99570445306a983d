//! Per-run lookup tables.
//!
//! A `Snapshot` is the state one pipeline stage hands to the next: the units
//! as they stand and the orders still in play. A `View` borrows a snapshot and
//! adds an area index built once, so stages never rescan the unit set to find
//! who stands where.

use std::collections::BTreeMap;

use crate::board::{
    AreaId, Board, Coast, Order, PlayerId, SupportedAction, TurnContext, Unit, UnitId, UnitType,
};

/// Units and remaining orders between two pipeline stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub units: BTreeMap<UnitId, Unit>,
    pub orders: BTreeMap<UnitId, Order>,
}

/// Who stands in an area. Units awaiting a retreat are not listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Occupants {
    pub field: Option<UnitId>,
    pub garrison: Option<UnitId>,
}

/// Area -> occupants, indexed by `AreaId`.
#[derive(Debug, Clone)]
pub struct TurnIndex {
    areas: Vec<Occupants>,
}

impl TurnIndex {
    /// Indexes every unit that is not awaiting a retreat. Units in unknown
    /// areas are skipped; validation rejects them before this runs.
    pub fn build<'a>(area_count: usize, units: impl IntoIterator<Item = &'a Unit>) -> Self {
        let mut areas = vec![Occupants::default(); area_count];
        for u in units {
            if u.is_dislodged() {
                continue;
            }
            let Some(slot) = areas.get_mut(u.area.index()) else {
                continue;
            };
            match u.unit_type {
                UnitType::Garrison => slot.garrison = Some(u.id),
                UnitType::Army | UnitType::Fleet => slot.field = Some(u.id),
            }
        }
        Self { areas }
    }

    pub fn occupants(&self, area: AreaId) -> Occupants {
        self.areas.get(area.index()).copied().unwrap_or_default()
    }

    pub fn field(&self, area: AreaId) -> Option<UnitId> {
        self.occupants(area).field
    }

    pub fn garrison(&self, area: AreaId) -> Option<UnitId> {
        self.occupants(area).garrison
    }
}

/// Read-only view of one pipeline stage's input.
pub struct View<'a> {
    pub board: &'a Board,
    pub ctx: &'a TurnContext,
    pub units: &'a BTreeMap<UnitId, Unit>,
    pub orders: &'a BTreeMap<UnitId, Order>,
    pub index: TurnIndex,
}

impl<'a> View<'a> {
    pub fn new(board: &'a Board, ctx: &'a TurnContext, snap: &'a Snapshot) -> Self {
        Self {
            board,
            ctx,
            units: &snap.units,
            orders: &snap.orders,
            index: TurnIndex::build(board.len(), snap.units.values()),
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&'a Unit> {
        self.units.get(&id)
    }

    /// The order in play for a unit. Units without one hold.
    pub fn order(&self, id: UnitId) -> Order {
        self.orders.get(&id).copied().unwrap_or(Order::Hold)
    }

    pub fn field_at(&self, area: AreaId) -> Option<&'a Unit> {
        self.index.field(area).and_then(|id| self.unit(id))
    }

    pub fn garrison_at(&self, area: AreaId) -> Option<&'a Unit> {
        self.index.garrison(area).and_then(|id| self.unit(id))
    }

    /// The area an attack order is aimed at, if the order is an attack.
    pub fn attack_target(&self, unit: &Unit, order: &Order) -> Option<AreaId> {
        match order {
            Order::Advance { dest, .. } => Some(*dest),
            Order::Convert { .. } if order.is_attack() => Some(unit.area),
            _ => None,
        }
    }

    /// Units other than `except` whose order attacks `area`, in id order.
    pub fn attackers_of(&self, area: AreaId, except: UnitId) -> Vec<&'a Unit> {
        self.orders
            .iter()
            .filter(|(&id, _)| id != except)
            .filter_map(|(id, order)| {
                let unit = self.unit(*id)?;
                (self.attack_target(unit, order) == Some(area)).then_some(unit)
            })
            .collect()
    }

    /// Units whose order supports `target`, with the supported action.
    pub fn supporters_of(
        &self,
        target: UnitId,
    ) -> impl Iterator<Item = (&'a Unit, SupportedAction)> + '_ {
        self.orders.iter().filter_map(move |(id, order)| match order {
            Order::Support { unit, action } if *unit == target => {
                self.unit(*id).map(|u| (u, *action))
            }
            _ => None,
        })
    }

    /// Returns true if the strait between `a` and `b` is closed to `player`
    /// by another player's fleet in the controlling area.
    pub fn strait_blocked(&self, a: AreaId, b: AreaId, player: PlayerId) -> bool {
        self.board
            .strait_controller(a, b)
            .and_then(|c| self.field_at(c))
            .is_some_and(|f| f.is_fleet() && f.player != player)
    }

    /// Returns true if `unit` can move to `dest` without a convoy.
    pub fn reaches_directly(&self, unit: &Unit, dest: AreaId, coast: Option<Coast>) -> bool {
        self.board.is_adjacent(unit.area, dest, unit.is_fleet(), unit.coast, coast)
            && !self.strait_blocked(unit.area, dest, unit.player)
    }
}
