//! Convoy path search.
//!
//! Breadth-first search over areas holding a fleet whose convoy order names
//! exactly this army and destination. Edges use fleet adjacency and are closed
//! by straits under enemy control. Each area is visited at most once.

use std::collections::{BTreeSet, VecDeque};

use crate::board::{AreaId, Coast, Order, Unit};

use super::index::View;

/// Areas whose fleet carries `army` to `dest` this turn.
fn convoy_areas(view: &View<'_>, army: &Unit, dest: AreaId, coast: Option<Coast>) -> BTreeSet<AreaId> {
    view.orders
        .iter()
        .filter_map(|(id, order)| match order {
            Order::Convoy { army: carried, dest: d, coast: c }
                if *carried == army.id && *d == dest && *c == coast =>
            {
                view.unit(*id)
            }
            _ => None,
        })
        .filter(|fleet| fleet.is_fleet() && !fleet.is_dislodged())
        .filter(|fleet| {
            view.board
                .get(fleet.area)
                .is_some_and(|a| a.flags.is_sea || a.flags.is_lagoon)
        })
        .map(|fleet| fleet.area)
        .collect()
}

/// Returns true if an unbroken chain of convoying fleets links `army` to
/// `dest`. Never mutates state.
pub fn find_convoy_path(view: &View<'_>, army: &Unit, dest: AreaId, coast: Option<Coast>) -> bool {
    let chain = convoy_areas(view, army, dest, coast);
    if chain.is_empty() {
        return false;
    }
    let step = |from: AreaId, to: AreaId| {
        view.board.is_adjacent(from, to, true, None, None)
            && !view.strait_blocked(from, to, army.player)
    };

    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();
    for &area in &chain {
        if step(army.area, area) {
            visited.insert(area);
            queue.push_back(area);
        }
    }

    while let Some(area) = queue.pop_front() {
        if step(area, dest) {
            return true;
        }
        for &next in view.board.borders(area) {
            if chain.contains(&next) && !visited.contains(&next) && step(area, next) {
                visited.insert(next);
                queue.push_back(next);
            }
        }
    }
    false
}
