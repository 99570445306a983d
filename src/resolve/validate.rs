//! Structural checks on the caller's input.
//!
//! Everything here is a precondition of adjudication. A failure is reported
//! as an `AdjudicationError` before any state is computed; rule-level
//! mistakes in orders are left to the legality pass.

use std::collections::{BTreeMap, BTreeSet};

use crate::board::{
    AreaId, Board, Order, OrderEntry, OrderStatus, SupportedAction, TurnContext, Unit, UnitId,
    UnitType,
};

use super::error::AdjudicationError;

fn known_area(board: &Board, area: AreaId) -> Result<(), AdjudicationError> {
    if board.contains(area) {
        Ok(())
    } else {
        Err(AdjudicationError::UnknownArea(area))
    }
}

/// Checks ids, locations, coasts and crowding of a unit set.
pub fn validate_units(board: &Board, units: &[Unit]) -> Result<(), AdjudicationError> {
    let mut seen = BTreeSet::new();
    let mut field: BTreeMap<AreaId, usize> = BTreeMap::new();
    let mut garrisons: BTreeMap<AreaId, usize> = BTreeMap::new();

    for u in units {
        if !seen.insert(u.id) {
            return Err(AdjudicationError::DuplicateUnit(u.id));
        }
        known_area(board, u.area)?;
        if let Some(origin) = u.must_retreat {
            known_area(board, origin)?;
        }
        let area = board.area(u.area);
        let fits = match u.unit_type {
            UnitType::Army => area.accepts_army(),
            UnitType::Fleet => area.accepts_fleet(),
            UnitType::Garrison => area.accepts_garrison(),
        };
        if !fits {
            return Err(AdjudicationError::MisplacedUnit(u.id));
        }
        let coast_ok = match (u.unit_type, u.coast) {
            (UnitType::Fleet, Some(c)) => area.has_coast(c),
            (UnitType::Fleet, None) => !area.has_coasts(),
            (_, coast) => coast.is_none(),
        };
        if !coast_ok {
            return Err(AdjudicationError::InvalidUnitCoast(u.id));
        }
        if u.is_dislodged() {
            continue;
        }
        let counts = match u.unit_type {
            UnitType::Garrison => &mut garrisons,
            UnitType::Army | UnitType::Fleet => &mut field,
        };
        *counts.entry(u.area).or_default() += 1;
    }

    let crowded = field.iter().chain(garrisons.iter()).find(|(_, n)| **n > 1);
    match crowded {
        Some((&area, &count)) => Err(AdjudicationError::Overcrowded { area, count }),
        None => Ok(()),
    }
}

/// Rejects units still waiting on a retreat from an earlier phase.
pub fn reject_pending_retreats(units: &[Unit]) -> Result<(), AdjudicationError> {
    match units.iter().find(|u| u.is_dislodged()) {
        Some(u) => Err(AdjudicationError::PendingRetreat(u.id)),
        None => Ok(()),
    }
}

fn order_references(order: &Order) -> (Vec<UnitId>, Vec<AreaId>) {
    match *order {
        Order::Advance { dest, .. } => (vec![], vec![dest]),
        Order::Convoy { army, dest, .. } => (vec![army], vec![dest]),
        Order::Support { unit, action: SupportedAction::Advance { dest, .. } } => {
            (vec![unit], vec![dest])
        }
        Order::Support { unit, .. } => (vec![unit], vec![]),
        Order::Hold
        | Order::Besiege
        | Order::LiftSiege
        | Order::Disband
        | Order::Convert { .. } => (vec![], vec![]),
    }
}

/// Checks that every order names known units and areas, and that no unit has
/// two confirmed orders.
pub fn validate_orders(
    board: &Board,
    units: &BTreeMap<UnitId, Unit>,
    orders: &[OrderEntry],
) -> Result<(), AdjudicationError> {
    let mut confirmed = BTreeSet::new();
    for entry in orders {
        if !units.contains_key(&entry.unit) {
            return Err(AdjudicationError::UnknownUnit(entry.unit));
        }
        if entry.status == OrderStatus::Confirmed && !confirmed.insert(entry.unit) {
            return Err(AdjudicationError::DuplicateOrder(entry.unit));
        }
        let (unit_refs, area_refs) = order_references(&entry.order);
        if let Some(id) = unit_refs.into_iter().find(|id| !units.contains_key(id)) {
            return Err(AdjudicationError::UnknownUnit(id));
        }
        for area in area_refs {
            known_area(board, area)?;
        }
    }
    Ok(())
}

/// Checks that the economic facts name known areas.
pub fn validate_context(board: &Board, ctx: &TurnContext) -> Result<(), AdjudicationError> {
    ctx.rebellions.iter().try_for_each(|r| known_area(board, r.area))
}
