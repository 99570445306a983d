//! The order-execution pipeline.
//!
//! `adjudicate_orders` runs the fixed stage sequence over one turn's
//! confirmed orders:
//!
//! 1. preprocess: structural checks, pending orders dropped, illegal
//!    orders held, coasts normalized
//! 2. unopposed conversions into garrisons
//! 3. support cutting
//! 4. convoy disruption
//! 5. unreachable advances
//! 6. conflicts
//! 7. disbands and lifted sieges
//! 8. sieges
//! 9. retreat announcement
//!
//! Each stage takes a `Snapshot` and returns the next one.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::board::{
    AreaId, Board, Order, OrderEntry, OrderStatus, SupportedAction, TurnContext, Unit, UnitId,
    UnitType,
};
use crate::protocol::notation::{format_order, format_unit};

use super::conflict::resolve_conflicts;
use super::error::AdjudicationError;
use super::filters::{
    apply_static_orders, filter_convoys, filter_supports, filter_unreachable_attacks,
    resolve_conversions,
};
use super::index::{Snapshot, View};
use super::legality::is_possible;
use super::log::{AdjudicationLog, Stage};
use super::siege::{resolve_sieges, SiegeEvent};
use super::validate::{reject_pending_retreats, validate_context, validate_orders, validate_units};

/// A unit that must retreat before the next order phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatRequirement {
    pub unit: UnitId,
    pub area: AreaId,
    /// Origin of the attack that dislodged it.
    pub forbidden: AreaId,
}

/// Everything one order phase produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjudicationResult {
    pub units_after: Vec<Unit>,
    pub retreat_requirements: Vec<RetreatRequirement>,
    pub siege_events: Vec<SiegeEvent>,
    pub standoff_areas: Vec<AreaId>,
    pub rebellions_put_down: Vec<AreaId>,
    pub log: AdjudicationLog,
}

impl AdjudicationResult {
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units_after.iter().find(|u| u.id == id)
    }
}

/// One game's turn, for batch adjudication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameTurn {
    pub units: Vec<Unit>,
    pub orders: Vec<OrderEntry>,
    #[serde(default)]
    pub context: TurnContext,
}

/// Fixes up coasts the players may leave implicit or get wrong.
fn normalize(board: &Board, units: &BTreeMap<UnitId, Unit>, unit: &Unit, order: Order) -> Order {
    match order {
        Order::Advance { dest, coast } => {
            let coast = match unit.unit_type {
                UnitType::Fleet if coast.is_none() && board.get(dest).is_some_and(|a| a.has_coasts()) => {
                    match board.fleet_coasts_to(unit.area, unit.coast, dest).as_slice() {
                        [only] => Some(*only),
                        _ => None,
                    }
                }
                UnitType::Fleet => coast,
                UnitType::Army | UnitType::Garrison => None,
            };
            Order::Advance { dest, coast }
        }
        Order::Convoy { army, dest, .. } => Order::Convoy { army, dest, coast: None },
        Order::Support { unit: target, action: SupportedAction::Advance { dest, coast } } => {
            // Fills the coast the way the supported fleet's own advance is filled.
            let coast = match units.get(&target) {
                Some(t) if t.unit_type == UnitType::Army => None,
                Some(t)
                    if t.unit_type == UnitType::Fleet
                        && coast.is_none()
                        && board.get(dest).is_some_and(|a| a.has_coasts()) =>
                {
                    match board.fleet_coasts_to(t.area, t.coast, dest).as_slice() {
                        [only] => Some(*only),
                        _ => None,
                    }
                }
                _ => coast,
            };
            Order::Support { unit: target, action: SupportedAction::Advance { dest, coast } }
        }
        other => other,
    }
}

fn preprocess(
    board: &Board,
    ctx: &TurnContext,
    units: &[Unit],
    orders: &[OrderEntry],
    log: &mut AdjudicationLog,
) -> Result<Snapshot, AdjudicationError> {
    validate_units(board, units)?;
    reject_pending_retreats(units)?;
    validate_context(board, ctx)?;
    let mut snap = Snapshot {
        units: units.iter().map(|u| (u.id, u.clone())).collect(),
        orders: BTreeMap::new(),
    };
    validate_orders(board, &snap.units, orders)?;

    let mut checked = BTreeMap::new();
    {
        let view = View::new(board, ctx, &snap);
        let mut entries: Vec<&OrderEntry> = orders.iter().collect();
        entries.sort_by_key(|e| (e.unit, e.status == OrderStatus::Confirmed));
        for entry in entries {
            let Some(unit) = view.unit(entry.unit) else {
                continue;
            };
            let text = format_order(board, view.units, unit, &entry.order);
            if entry.status == OrderStatus::Pending {
                log.info(Stage::Preprocess, format!("{} is not confirmed and is ignored", text));
                continue;
            }
            let order = normalize(board, view.units, unit, entry.order);
            match is_possible(&view, unit, &order) {
                Ok(()) => {
                    checked.insert(entry.unit, order);
                }
                Err(why) => {
                    let message = format!("{} is illegal: {}; holds instead", text, why);
                    if why.is_data_error() {
                        log.error(Stage::Preprocess, message);
                    } else {
                        log.warn(Stage::Preprocess, message);
                    }
                    checked.insert(entry.unit, Order::Hold);
                }
            }
        }
    }
    snap.orders = checked;
    Ok(snap)
}

/// Runs one order phase. Either the whole turn is adjudicated or an error is
/// returned and nothing is changed.
pub fn adjudicate_orders(
    board: &Board,
    units: &[Unit],
    orders: &[OrderEntry],
    ctx: &TurnContext,
) -> Result<AdjudicationResult, AdjudicationError> {
    let mut log = AdjudicationLog::new();
    let snap = preprocess(board, ctx, units, orders, &mut log)?;
    log::debug!("preprocess: {} orders in play", snap.orders.len());

    let snap = resolve_conversions(board, snap, &mut log);
    log::debug!("conversions: {} orders left", snap.orders.len());
    let snap = filter_supports(board, ctx, snap, &mut log);
    log::debug!("supports: {} orders left", snap.orders.len());
    let snap = filter_convoys(board, ctx, snap, &mut log);
    log::debug!("convoys: {} orders left", snap.orders.len());
    let snap = filter_unreachable_attacks(board, ctx, snap, &mut log);
    log::debug!("reachability: {} orders left", snap.orders.len());
    let (snap, report) = resolve_conflicts(board, ctx, snap, &mut log);
    log::debug!("conflicts: {} standoffs", report.standoffs.len());
    let (snap, lifted) = apply_static_orders(board, snap, &mut log);
    let (snap, siege_events) = resolve_sieges(board, ctx, snap, &mut log, &lifted);
    log::debug!("sieges: {} events", siege_events.len());

    let mut retreat_requirements = Vec::new();
    for u in snap.units.values() {
        if let Some(forbidden) = u.must_retreat {
            log.info(
                Stage::Announce,
                format!("{} must retreat, not to {}", format_unit(board, u), board.code(forbidden)),
            );
            retreat_requirements.push(RetreatRequirement { unit: u.id, area: u.area, forbidden });
        }
    }

    let result = AdjudicationResult {
        units_after: snap.units.into_values().collect(),
        retreat_requirements,
        siege_events,
        standoff_areas: report.standoffs.into_iter().collect(),
        rebellions_put_down: report.rebellions_put_down.into_iter().collect(),
        log,
    };
    log::info!(
        "adjudicated {} orders: {} units, {} retreats",
        orders.len(),
        result.units_after.len(),
        result.retreat_requirements.len()
    );
    Ok(result)
}

/// Adjudicates independent games in parallel. Results keep the input order.
pub fn adjudicate_batch(
    board: &Board,
    turns: &[GameTurn],
) -> Vec<Result<AdjudicationResult, AdjudicationError>> {
    turns
        .par_iter()
        .map(|t| adjudicate_orders(board, &t.units, &t.orders, &t.context))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::maps::tuscany;
    use crate::board::Coast;

    fn at(b: &Board, code: &str) -> AreaId {
        b.find(code).unwrap()
    }

    #[test]
    fn illegal_orders_hold() {
        let b = tuscany().unwrap();
        let units = [Unit::army(1, 1, at(&b, "FLO"))];
        let orders = [OrderEntry::confirmed(UnitId(1), Order::Advance { dest: at(&b, "NAP"), coast: None })];
        let r = adjudicate_orders(&b, &units, &orders, &TurnContext::default()).unwrap();
        assert_eq!(r.unit(UnitId(1)).unwrap().area, at(&b, "FLO"));
        assert_eq!(
            r.log.to_string(),
            "[preprocess] A FLO - NAP is illegal: destination is not adjacent; holds instead\n"
        );
    }

    #[test]
    fn pending_orders_are_ignored() {
        let b = tuscany().unwrap();
        let units = [Unit::army(1, 1, at(&b, "FLO"))];
        let orders = [OrderEntry::pending(UnitId(1), Order::Advance { dest: at(&b, "SIE"), coast: None })];
        let r = adjudicate_orders(&b, &units, &orders, &TurnContext::default()).unwrap();
        assert_eq!(r.unit(UnitId(1)).unwrap().area, at(&b, "FLO"));
        assert!(r.log.mentions("not confirmed"));
    }

    #[test]
    fn single_reachable_coast_is_filled_in() {
        let b = tuscany().unwrap();
        let units = [Unit::fleet(1, 1, at(&b, "LA"))];
        let orders = [OrderEntry::confirmed(UnitId(1), Order::Advance { dest: at(&b, "CRO"), coast: None })];
        let r = adjudicate_orders(&b, &units, &orders, &TurnContext::default()).unwrap();
        let fleet = r.unit(UnitId(1)).unwrap();
        assert_eq!(fleet.area, at(&b, "CRO"));
        assert_eq!(fleet.coast, Some(Coast::South));
    }

    #[test]
    fn support_for_fleet_gets_the_same_coast() {
        let b = tuscany().unwrap();
        let (la, dal, cro) = (at(&b, "LA"), at(&b, "DAL"), at(&b, "CRO"));
        let fleet = Unit::fleet(1, 1, la);
        let units: BTreeMap<UnitId, Unit> = [(UnitId(1), fleet.clone())].into_iter().collect();
        let support = Order::Support { unit: UnitId(1), action: SupportedAction::Advance { dest: cro, coast: None } };
        assert_eq!(
            normalize(&b, &units, &Unit::army(2, 1, dal), support),
            Order::Support {
                unit: UnitId(1),
                action: SupportedAction::Advance { dest: cro, coast: Some(Coast::South) }
            }
        );
    }

    #[test]
    fn retreats_are_announced() {
        let b = tuscany().unwrap();
        let (flo, sie, are) = (at(&b, "FLO"), at(&b, "SIE"), at(&b, "ARE"));
        let units = [Unit::army(1, 1, flo), Unit::army(2, 1, are), Unit::army(3, 2, sie)];
        let orders = [
            OrderEntry::confirmed(UnitId(1), Order::Advance { dest: sie, coast: None }),
            OrderEntry::confirmed(
                UnitId(2),
                Order::Support { unit: UnitId(1), action: SupportedAction::Advance { dest: sie, coast: None } },
            ),
        ];
        let r = adjudicate_orders(&b, &units, &orders, &TurnContext::default()).unwrap();
        assert_eq!(
            r.retreat_requirements,
            vec![RetreatRequirement { unit: UnitId(3), area: sie, forbidden: flo }]
        );
        assert!(r.log.mentions("A SIE must retreat, not to FLO"));
    }

    #[test]
    fn structural_errors_abort() {
        let b = tuscany().unwrap();
        let units = [Unit::army(1, 1, at(&b, "FLO"))];
        let orders = [OrderEntry::confirmed(UnitId(2), Order::Hold)];
        assert_eq!(
            adjudicate_orders(&b, &units, &orders, &TurnContext::default()),
            Err(AdjudicationError::UnknownUnit(UnitId(2)))
        );
    }

    #[test]
    fn batch_keeps_input_order() {
        let b = tuscany().unwrap();
        let turns: Vec<GameTurn> = (0..8u32)
            .map(|i| GameTurn {
                units: vec![Unit::army(i + 1, 1, at(&b, "FLO"))],
                orders: vec![OrderEntry::confirmed(UnitId(i + 1), Order::Advance { dest: at(&b, "SIE"), coast: None })],
                context: TurnContext::default(),
            })
            .collect();
        let results = adjudicate_batch(&b, &turns);
        for (i, r) in results.iter().enumerate() {
            let r = r.as_ref().unwrap();
            assert_eq!(r.units_after[0].id, UnitId(i as u32 + 1));
            assert_eq!(r.units_after[0].area, at(&b, "SIE"));
        }
    }
}
