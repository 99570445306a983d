//! Combat strength.
//!
//! Strength is the unit's own power plus the power of every support still in
//! play whose action matches the unit's order. Both functions are pure over a
//! `View`, so every unit's strength can be computed before any decision is
//! taken.

use crate::board::{Order, SupportedAction, Unit};

use super::index::View;

/// Returns true if a support for `action` backs a unit giving `order`.
pub fn support_matches(view: &View<'_>, action: &SupportedAction, order: &Order) -> bool {
    match (action, order) {
        (SupportedAction::Hold, o) => o.is_stationary(),
        (
            SupportedAction::Advance { dest, coast },
            Order::Advance { dest: order_dest, coast: order_coast },
        ) => {
            if dest != order_dest {
                return false;
            }
            let needs_coast = view.board.get(*dest).is_some_and(|a| a.has_coasts());
            !needs_coast || coast == order_coast
        }
        (SupportedAction::Convert { to }, Order::Convert { to: order_to }) => to == order_to,
        _ => false,
    }
}

/// Strength of `unit` carrying out its current order.
pub fn strength(view: &View<'_>, unit: &Unit) -> u32 {
    let order = view.order(unit.id);
    let supports: u32 = view
        .supporters_of(unit.id)
        .filter(|(_, action)| support_matches(view, action, &order))
        .map(|(s, _)| u32::from(s.power))
        .sum();
    u32::from(unit.power) + supports + rebellion_bonus(view, unit, &order)
}

/// Strength of `unit` defending its area: power plus Hold supports, which
/// only count while the unit is not trying to leave.
pub fn hold_strength(view: &View<'_>, unit: &Unit) -> u32 {
    let order = view.order(unit.id);
    if !order.is_stationary() {
        return u32::from(unit.power);
    }
    let supports: u32 = view
        .supporters_of(unit.id)
        .filter(|(_, action)| matches!(action, SupportedAction::Hold))
        .map(|(s, _)| u32::from(s.power))
        .sum();
    u32::from(unit.power) + supports
}

/// +1 for an advance into an area in revolt against another player, when no
/// one else attacks that area this turn. Finance rules only.
fn rebellion_bonus(view: &View<'_>, unit: &Unit, order: &Order) -> u32 {
    if !view.ctx.rules.finances {
        return 0;
    }
    let Order::Advance { dest, .. } = order else {
        return 0;
    };
    if view.ctx.rebellion_against_other(*dest, unit.player).is_none() {
        return 0;
    }
    if view.attackers_of(*dest, unit.id).is_empty() {
        1
    } else {
        0
    }
}
