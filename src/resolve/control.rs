//! End-of-year area control.
//!
//! A land area held by units of a single player passes to that player. An
//! area held by units of several players loses its controller. Empty areas
//! keep theirs. Units awaiting a retreat hold nothing.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::board::{AreaId, Board, PlayerId, Unit};

/// A change of controller for one area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlChange {
    pub area: AreaId,
    pub from: Option<PlayerId>,
    pub to: Option<PlayerId>,
}

/// Computes the control changes implied by the unit positions, in area order.
pub fn update_controls(
    board: &Board,
    units: &[Unit],
    controls: &BTreeMap<AreaId, PlayerId>,
) -> Vec<ControlChange> {
    let mut present: BTreeMap<AreaId, BTreeSet<PlayerId>> = BTreeMap::new();
    for u in units.iter().filter(|u| !u.is_dislodged()) {
        let land = board.get(u.area).is_some_and(|a| !a.flags.is_sea);
        if land {
            present.entry(u.area).or_default().insert(u.player);
        }
    }

    present
        .into_iter()
        .filter_map(|(area, players)| {
            let from = controls.get(&area).copied();
            let to = match players.len() {
                1 => players.first().copied(),
                _ => None,
            };
            (from != to).then_some(ControlChange { area, from, to })
        })
        .collect()
}
