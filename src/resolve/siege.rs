//! Siege state machine.
//!
//! A besieger's counter climbs 0 -> 1 -> 2 on consecutive Besiege orders;
//! the third consecutive order takes the target and resets it. A turn without
//! a renewing order, or a dislodgement, resets the counter.

use serde::{Deserialize, Serialize};

use crate::board::{AreaId, Board, Order, SiegeStage, TurnContext, UnitId, UnitType};
use crate::protocol::notation::{format_location, format_unit};

use super::index::{Snapshot, TurnIndex};
use super::log::{AdjudicationLog, Stage};

/// What a siege is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiegeTarget {
    Garrison { unit: UnitId },
    Rebellion { area: AreaId },
}

/// One change to a siege this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiegeEvent {
    Started { unit: UnitId },
    Continued { unit: UnitId },
    /// The target fell; a rebellion target is removed by the caller.
    Succeeded { unit: UnitId, target: SiegeTarget },
    Broken { unit: UnitId },
    /// The besieger's player is assassinated; the counter is kept.
    Stalled { unit: UnitId },
    Surrendered { unit: UnitId, garrison: UnitId },
    Invalid { unit: UnitId },
    Lifted { unit: UnitId },
}

impl SiegeEvent {
    pub fn unit(&self) -> UnitId {
        match *self {
            SiegeEvent::Started { unit }
            | SiegeEvent::Continued { unit }
            | SiegeEvent::Succeeded { unit, .. }
            | SiegeEvent::Broken { unit }
            | SiegeEvent::Stalled { unit }
            | SiegeEvent::Surrendered { unit, .. }
            | SiegeEvent::Invalid { unit }
            | SiegeEvent::Lifted { unit } => unit,
        }
    }
}

fn find_target(
    ctx: &TurnContext,
    index: &TurnIndex,
    snap: &Snapshot,
    besieger: UnitId,
) -> Option<SiegeTarget> {
    let unit = snap.units.get(&besieger)?;
    let garrison = index
        .garrison(unit.area)
        .and_then(|id| snap.units.get(&id))
        .filter(|g| g.player != unit.player);
    if let Some(g) = garrison {
        return Some(SiegeTarget::Garrison { unit: g.id });
    }
    ctx.rebellion_against_other(unit.area, unit.player)
        .filter(|r| r.garrisoned)
        .map(|r| SiegeTarget::Rebellion { area: r.area })
}

/// Advances, resolves and breaks sieges. `lifted` lists units whose
/// LiftSiege order was applied this turn.
pub fn resolve_sieges(
    board: &Board,
    ctx: &TurnContext,
    mut snap: Snapshot,
    log: &mut AdjudicationLog,
    lifted: &[UnitId],
) -> (Snapshot, Vec<SiegeEvent>) {
    let mut events = Vec::new();
    let index = TurnIndex::build(board.len(), snap.units.values());
    let ids: Vec<UnitId> = snap.units.keys().copied().collect();
    let mut fallen = Vec::new();

    for id in ids {
        if lifted.contains(&id) {
            events.push(SiegeEvent::Lifted { unit: id });
            continue;
        }
        let besieging = matches!(snap.orders.get(&id), Some(Order::Besiege));
        let Some(unit) = snap.units.get(&id).cloned() else {
            continue;
        };
        let name = format_unit(board, &unit);
        let counter = unit.siege.counter();

        if unit.is_dislodged() || !besieging {
            if counter > 0 {
                log.info(Stage::Sieges, format!("{} breaks off its siege", name));
                events.push(SiegeEvent::Broken { unit: id });
                set_stage(&mut snap, id, SiegeStage::None);
            }
            continue;
        }
        snap.orders.remove(&id);

        let Some(target) = find_target(ctx, &index, &snap, id) else {
            log.info(Stage::Sieges, format!("{} has nothing to besiege", name));
            events.push(SiegeEvent::Invalid { unit: id });
            set_stage(&mut snap, id, SiegeStage::None);
            continue;
        };
        if ctx.is_assassinated(unit.player) {
            log.info(Stage::Sieges, format!("{} cannot press its siege", name));
            events.push(SiegeEvent::Stalled { unit: id });
            continue;
        }
        let target_name = match target {
            SiegeTarget::Garrison { unit: g } => snap
                .units
                .get(&g)
                .map(|g| format_unit(board, g))
                .unwrap_or_else(|| format!("? #{}", g.0)),
            SiegeTarget::Rebellion { area } => {
                format!("the rebellion in {}", format_location(board, area, None))
            }
        };

        if unit.siege == SiegeStage::Second {
            log.info(Stage::Sieges, format!("{} takes {}", name, target_name));
            events.push(SiegeEvent::Succeeded { unit: id, target });
            if let SiegeTarget::Garrison { unit: g } = target {
                fallen.push(g);
            }
            set_stage(&mut snap, id, SiegeStage::None);
            continue;
        }

        let surrendering = match target {
            SiegeTarget::Garrison { unit: g } => snap
                .units
                .get(&g)
                .is_some_and(|g| ctx.is_assassinated(g.player)),
            SiegeTarget::Rebellion { .. } => false,
        };
        if let (true, SiegeTarget::Garrison { unit: g }) = (surrendering, target) {
            log.info(Stage::Sieges, format!("{} surrenders to {}", target_name, name));
            events.push(SiegeEvent::Surrendered { unit: id, garrison: g });
            fallen.push(g);
            set_stage(&mut snap, id, SiegeStage::None);
            continue;
        }

        if unit.siege == SiegeStage::None {
            log.info(Stage::Sieges, format!("{} begins the siege of {}", name, target_name));
            events.push(SiegeEvent::Started { unit: id });
            set_stage(&mut snap, id, SiegeStage::First);
        } else {
            log.info(Stage::Sieges, format!("{} continues the siege of {}", name, target_name));
            events.push(SiegeEvent::Continued { unit: id });
            set_stage(&mut snap, id, SiegeStage::Second);
        }
    }

    for g in fallen {
        if snap.units.get(&g).is_some_and(|u| u.unit_type == UnitType::Garrison) {
            snap.units.remove(&g);
            snap.orders.remove(&g);
        }
    }
    (snap, events)
}

fn set_stage(snap: &mut Snapshot, id: UnitId, stage: SiegeStage) {
    if let Some(u) = snap.units.get_mut(&id) {
        u.siege = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::maps::tuscany;
    use crate::board::{PlayerId, Rebellion, Unit};

    fn besiege(b: &Board, ctx: &TurnContext, units: Vec<Unit>, besiegers: &[u32]) -> (Snapshot, Vec<SiegeEvent>) {
        let mut s = Snapshot::default();
        for u in units {
            s.units.insert(u.id, u);
        }
        for &id in besiegers {
            s.orders.insert(UnitId(id), Order::Besiege);
        }
        let mut log = AdjudicationLog::new();
        resolve_sieges(b, ctx, s, &mut log, &[])
    }

    #[test]
    fn siege_runs_its_course() {
        let b = tuscany().unwrap();
        let ctx = TurnContext::default();
        let flo = b.find("FLO").unwrap();
        let mut units = vec![Unit::army(1, 1, flo), Unit::garrison(2, 2, flo)];
        let mut seen = Vec::new();
        for _ in 0..3 {
            let (s, events) = besiege(&b, &ctx, units.clone(), &[1]);
            seen.extend(events);
            units = s.units.into_values().collect();
        }
        assert_eq!(
            seen,
            vec![
                SiegeEvent::Started { unit: UnitId(1) },
                SiegeEvent::Continued { unit: UnitId(1) },
                SiegeEvent::Succeeded { unit: UnitId(1), target: SiegeTarget::Garrison { unit: UnitId(2) } },
            ]
        );
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].siege, SiegeStage::None);
    }

    #[test]
    fn no_renewal_breaks_the_siege() {
        let b = tuscany().unwrap();
        let ctx = TurnContext::default();
        let flo = b.find("FLO").unwrap();
        let (s, events) = besiege(
            &b,
            &ctx,
            vec![Unit::army(1, 1, flo).with_siege(SiegeStage::Second), Unit::garrison(2, 2, flo)],
            &[],
        );
        assert_eq!(events, vec![SiegeEvent::Broken { unit: UnitId(1) }]);
        assert_eq!(s.units[&UnitId(1)].siege, SiegeStage::None);
        assert!(s.units.contains_key(&UnitId(2)));
    }

    #[test]
    fn dislodged_besieger_loses_its_siege() {
        let b = tuscany().unwrap();
        let ctx = TurnContext::default();
        let flo = b.find("FLO").unwrap();
        let mut army = Unit::army(1, 1, flo).with_siege(SiegeStage::First);
        army.must_retreat = Some(b.find("SIE").unwrap());
        let (s, events) = besiege(&b, &ctx, vec![army, Unit::garrison(2, 2, flo)], &[1]);
        assert_eq!(events, vec![SiegeEvent::Broken { unit: UnitId(1) }]);
        assert_eq!(s.units[&UnitId(1)].siege, SiegeStage::None);
    }

    #[test]
    fn assassinations() {
        let b = tuscany().unwrap();
        let flo = b.find("FLO").unwrap();
        let units = vec![Unit::army(1, 1, flo).with_siege(SiegeStage::First), Unit::garrison(2, 2, flo)];

        let ctx = TurnContext { assassinated: vec![PlayerId(1)], ..Default::default() };
        let (s, events) = besiege(&b, &ctx, units.clone(), &[1]);
        assert_eq!(events, vec![SiegeEvent::Stalled { unit: UnitId(1) }]);
        assert_eq!(s.units[&UnitId(1)].siege, SiegeStage::First);

        let ctx = TurnContext { assassinated: vec![PlayerId(2)], ..Default::default() };
        let (s, events) = besiege(&b, &ctx, units, &[1]);
        assert_eq!(events, vec![SiegeEvent::Surrendered { unit: UnitId(1), garrison: UnitId(2) }]);
        assert!(!s.units.contains_key(&UnitId(2)));
        assert_eq!(s.units[&UnitId(1)].siege, SiegeStage::None);
    }

    #[test]
    fn rebellion_target() {
        let b = tuscany().unwrap();
        let sie = b.find("SIE").unwrap();
        let mut ctx = TurnContext::default();
        ctx.rebellions.push(Rebellion { area: sie, against: PlayerId(1), garrisoned: true });
        let (_, events) =
            besiege(&b, &ctx, vec![Unit::army(1, 1, sie).with_siege(SiegeStage::Second)], &[1]);
        // Against its own player the rebellion is not a target.
        assert_eq!(events, vec![SiegeEvent::Invalid { unit: UnitId(1) }]);

        let (_, events) =
            besiege(&b, &ctx, vec![Unit::army(1, 2, sie).with_siege(SiegeStage::Second)], &[1]);
        assert_eq!(
            events,
            vec![SiegeEvent::Succeeded { unit: UnitId(1), target: SiegeTarget::Rebellion { area: sie } }]
        );
    }

    #[test]
    fn events_serialize_snake_case() {
        let json = serde_json::to_string(&SiegeEvent::Started { unit: UnitId(4) }).unwrap();
        assert_eq!(json, r#"{"started":{"unit":4}}"#);
    }
}
