//! The filtering stages that run before conflict resolution.
//!
//! Each stage reads one snapshot and returns the next. Decisions are taken
//! against the stage's input only and applied afterwards, so the order in
//! which units are visited never changes the outcome.

use std::collections::{BTreeMap, BTreeSet};

use crate::board::{AreaId, Board, Order, SupportedAction, TurnContext, UnitId, UnitType};
use crate::protocol::notation::{format_order, format_unit};

use super::convoy::find_convoy_path;
use super::index::{Snapshot, TurnIndex, View};
use super::log::{AdjudicationLog, Stage};
use super::strength::{hold_strength, strength, support_matches};

fn describe(board: &Board, snap: &Snapshot, id: UnitId, order: &Order) -> String {
    match snap.units.get(&id) {
        Some(u) => format_order(board, &snap.units, u, order),
        None => format!("? #{}", id.0),
    }
}

/// Settles conversions into garrisons. A conversion succeeds when the area
/// has no garrison and no other unit converts there; competing conversions
/// all fail. Either way the order is consumed.
pub fn resolve_conversions(board: &Board, mut snap: Snapshot, log: &mut AdjudicationLog) -> Snapshot {
    let mut by_area: BTreeMap<AreaId, Vec<UnitId>> = BTreeMap::new();
    for (id, order) in &snap.orders {
        if let Order::Convert { to: UnitType::Garrison } = order {
            if let Some(u) = snap.units.get(id) {
                by_area.entry(u.area).or_default().push(*id);
            }
        }
    }

    let index = TurnIndex::build(board.len(), snap.units.values());
    for (area, ids) in by_area {
        let contested = ids.len() > 1;
        let occupied = index.garrison(area).is_some();
        for id in ids {
            let text = describe(board, &snap, id, &Order::Convert { to: UnitType::Garrison });
            snap.orders.remove(&id);
            if contested {
                log.info(Stage::Conversions, format!("{} fails; conversion contested", text));
            } else if occupied {
                log.info(Stage::Conversions, format!("{} fails; garrison present", text));
            } else if let Some(u) = snap.units.get_mut(&id) {
                u.unit_type = UnitType::Garrison;
                u.coast = None;
                u.siege = Default::default();
                log.info(Stage::Conversions, format!("{} succeeds", text));
            }
        }
    }
    snap
}

/// Deletes supports that do not match the supported unit's order, and
/// supports whose giver is attacked by another player from anywhere but the
/// area the support is directed into.
pub fn filter_supports(
    board: &Board,
    ctx: &TurnContext,
    mut snap: Snapshot,
    log: &mut AdjudicationLog,
) -> Snapshot {
    let mut unmatched = Vec::new();
    let mut cut = Vec::new();
    {
        let view = View::new(board, ctx, &snap);
        for (&id, order) in view.orders {
            let Order::Support { unit: target, action } = order else {
                continue;
            };
            let (Some(supporter), Some(supported)) = (view.unit(id), view.unit(*target)) else {
                continue;
            };
            let backed = view.order(*target);
            if !support_matches(&view, action, &backed) {
                unmatched.push((id, *order, *target, backed));
                continue;
            }
            let into = match action {
                SupportedAction::Advance { dest, .. } => *dest,
                SupportedAction::Hold | SupportedAction::Convert { .. } => supported.area,
            };
            let cutter = view
                .attackers_of(supporter.area, id)
                .into_iter()
                .find(|a| a.player != supporter.player && a.area != into);
            if let Some(a) = cutter {
                cut.push((id, *order, a.id, view.order(a.id)));
            }
        }
    }

    for (id, order, target, backed) in unmatched {
        log.info(
            Stage::Supports,
            format!(
                "{} does not match {}",
                describe(board, &snap, id, &order),
                describe(board, &snap, target, &backed)
            ),
        );
        snap.orders.remove(&id);
    }
    for (id, order, attacker, attack) in cut {
        log.info(
            Stage::Supports,
            format!(
                "{} is cut by {}",
                describe(board, &snap, id, &order),
                describe(board, &snap, attacker, &attack)
            ),
        );
        snap.orders.remove(&id);
    }
    snap
}

/// Deletes convoys whose fleet faces an attacker stronger than its defence,
/// together with the advance of the army it was carrying.
pub fn filter_convoys(
    board: &Board,
    ctx: &TurnContext,
    mut snap: Snapshot,
    log: &mut AdjudicationLog,
) -> Snapshot {
    let mut broken = Vec::new();
    {
        let view = View::new(board, ctx, &snap);
        for (&id, order) in view.orders {
            let Order::Convoy { army, dest, .. } = order else {
                continue;
            };
            let Some(fleet) = view.unit(id) else {
                continue;
            };
            let defence = hold_strength(&view, fleet);
            let beaten_by = view
                .attackers_of(fleet.area, id)
                .into_iter()
                .map(|a| (a, strength(&view, a)))
                .find(|(_, s)| *s > defence);
            if let Some((attacker, s)) = beaten_by {
                let carried = match view.order(*army) {
                    Order::Advance { dest: d, .. } if d == *dest => Some(*army),
                    _ => None,
                };
                broken.push((id, *order, attacker.id, s, defence, carried));
            }
        }
    }

    let mut dropped = BTreeSet::new();
    for (id, order, attacker, s, defence, carried) in broken {
        let attack = snap.orders.get(&attacker).copied().unwrap_or(Order::Hold);
        log.info(
            Stage::Convoys,
            format!(
                "{} is disrupted by {} ({} against {})",
                describe(board, &snap, id, &order),
                describe(board, &snap, attacker, &attack),
                s,
                defence
            ),
        );
        snap.orders.remove(&id);
        if let Some(army) = carried {
            dropped.insert(army);
        }
    }
    for army in dropped {
        if let Some(order) = snap.orders.remove(&army) {
            log.info(
                Stage::Convoys,
                format!("{} fails for lack of transport", describe(board, &snap, army, &order)),
            );
        }
    }
    snap
}

/// Deletes advances that neither reach their destination directly nor have
/// an unbroken convoy chain.
pub fn filter_unreachable_attacks(
    board: &Board,
    ctx: &TurnContext,
    mut snap: Snapshot,
    log: &mut AdjudicationLog,
) -> Snapshot {
    let mut unreachable = Vec::new();
    {
        let view = View::new(board, ctx, &snap);
        for (&id, order) in view.orders {
            let Order::Advance { dest, coast } = *order else {
                continue;
            };
            let Some(unit) = view.unit(id) else {
                continue;
            };
            if view.reaches_directly(unit, dest, coast) {
                continue;
            }
            let convoyed =
                unit.unit_type == UnitType::Army && find_convoy_path(&view, unit, dest, coast);
            if !convoyed {
                unreachable.push((id, *order));
            }
        }
    }

    for (id, order) in unreachable {
        let text = describe(board, &snap, id, &order);
        let dest = match order {
            Order::Advance { dest, .. } => board.code(dest).to_string(),
            _ => String::new(),
        };
        log.info(Stage::Reachability, format!("{} cannot reach {}", text, dest));
        snap.orders.remove(&id);
    }
    snap
}

/// Applies orders that take effect in place: disbands and lifted sieges.
pub fn apply_static_orders(
    board: &Board,
    mut snap: Snapshot,
    log: &mut AdjudicationLog,
) -> (Snapshot, Vec<UnitId>) {
    let mut lifted = Vec::new();
    let disbanding: Vec<UnitId> = snap
        .orders
        .iter()
        .filter(|(_, o)| matches!(o, Order::Disband))
        .map(|(id, _)| *id)
        .collect();
    for id in disbanding {
        snap.orders.remove(&id);
        if let Some(u) = snap.units.remove(&id) {
            log.info(Stage::Orders, format!("{} disbands", format_unit(board, &u)));
        }
    }

    let lifting: Vec<UnitId> = snap
        .orders
        .iter()
        .filter(|(_, o)| matches!(o, Order::LiftSiege))
        .map(|(id, _)| *id)
        .collect();
    for id in lifting {
        snap.orders.remove(&id);
        if let Some(u) = snap.units.get_mut(&id) {
            u.siege = Default::default();
            log.info(Stage::Orders, format!("{} lifts its siege", format_unit(board, u)));
            lifted.push(id);
        }
    }
    (snap, lifted)
}
