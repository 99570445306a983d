//! Conflict resolution.
//!
//! Attacks (advances and garrisons taking the field) are grouped by target
//! area. Strengths are computed once, up front. Each target is then decided
//! by a fixpoint over the targets: a decision only depends on decisions that
//! are already final, so the visiting order never matters.
//!
//! Per target, several attacks sharing the top strength stand each other off.
//! A unique strongest attack faces the area's defender: its army or fleet if
//! it has one, otherwise an enemy garrison. A defender whose own attack
//! succeeds has left and is not fought. Two units advancing into each other's
//! area without a convoy fight head to head. Closed rings of moves all
//! succeed.

use std::collections::{BTreeMap, BTreeSet};

use crate::board::{AreaId, Board, Order, SiegeStage, TurnContext, UnitId};
use crate::protocol::notation::{format_location, format_order, format_unit};

use super::index::{Snapshot, View};
use super::log::{AdjudicationLog, Stage};
use super::strength::{hold_strength, strength};

/// What conflict resolution reports besides the new snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    pub standoffs: BTreeSet<AreaId>,
    pub rebellions_put_down: BTreeSet<AreaId>,
}

#[derive(Debug, Clone, Copy)]
struct Attack {
    unit: UnitId,
    order: Order,
    origin: AreaId,
    target: AreaId,
    strength: u32,
    convoyed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Undecided,
    /// Two or more attacks tied for the top strength.
    Standoff,
    Enters { dislodged: Option<UnitId> },
    Bounced { standoff: bool },
}

struct Resolver<'v, 'a> {
    view: &'v View<'a>,
    attacks: Vec<Attack>,
    /// Attack index by attacking unit.
    by_unit: BTreeMap<UnitId, usize>,
    /// Unique strongest attack per target, if any.
    winner: BTreeMap<AreaId, Option<usize>>,
    decisions: BTreeMap<AreaId, Decision>,
}

impl<'v, 'a> Resolver<'v, 'a> {
    fn new(view: &'v View<'a>) -> Self {
        let mut attacks = Vec::new();
        for (&id, order) in view.orders {
            let Some(unit) = view.unit(id) else {
                continue;
            };
            let Some(target) = view.attack_target(unit, order) else {
                continue;
            };
            let convoyed = match *order {
                Order::Advance { dest, coast } => !view.reaches_directly(unit, dest, coast),
                _ => false,
            };
            attacks.push(Attack {
                unit: id,
                order: *order,
                origin: unit.area,
                target,
                strength: strength(view, unit),
                convoyed,
            });
        }

        let by_unit = attacks.iter().enumerate().map(|(i, a)| (a.unit, i)).collect();
        let mut grouped: BTreeMap<AreaId, Vec<usize>> = BTreeMap::new();
        for (i, a) in attacks.iter().enumerate() {
            grouped.entry(a.target).or_default().push(i);
        }

        let mut winner = BTreeMap::new();
        let mut decisions = BTreeMap::new();
        for (target, group) in grouped {
            let top = group.iter().map(|&i| attacks[i].strength).max().unwrap_or(0);
            let leaders: Vec<usize> =
                group.iter().copied().filter(|&i| attacks[i].strength == top).collect();
            if leaders.len() == 1 {
                winner.insert(target, Some(leaders[0]));
                decisions.insert(target, Decision::Undecided);
            } else {
                winner.insert(target, None);
                decisions.insert(target, Decision::Standoff);
            }
        }

        Self { view, attacks, by_unit, winner, decisions }
    }

    /// The unit that holds `target` against attack `w`.
    fn defender(&self, w: &Attack) -> Option<UnitId> {
        let occupants = self.view.index.occupants(w.target);
        let converting = matches!(w.order, Order::Convert { .. });
        match occupants.field {
            Some(f) => Some(f),
            None if converting => None,
            // A garrison never bars its own player's units.
            None => occupants.garrison.filter(|g| {
                let owner = self.view.unit(*g).map(|u| u.player);
                owner.is_some() && owner != self.view.unit(w.unit).map(|u| u.player)
            }),
        }
    }

    fn duel(&self, attack: u32, defender: UnitId) -> Decision {
        let defence = self
            .view
            .unit(defender)
            .map(|d| hold_strength(self.view, d))
            .unwrap_or(0);
        if attack > defence {
            Decision::Enters { dislodged: Some(defender) }
        } else {
            Decision::Bounced { standoff: attack == defence }
        }
    }

    /// Decides `target`, or returns None while it depends on an open target.
    fn judge(&self, target: AreaId) -> Option<Decision> {
        let w = &self.attacks[self.winner.get(&target).copied().flatten()?];
        let Some(d) = self.defender(w) else {
            return Some(Decision::Enters { dislodged: None });
        };
        let Some(&di) = self.by_unit.get(&d) else {
            // The defender stays put.
            return Some(self.duel(w.strength, d));
        };
        let da = &self.attacks[di];

        let head_to_head = matches!(w.order, Order::Advance { .. })
            && matches!(da.order, Order::Advance { .. })
            && da.target == w.origin
            && !w.convoyed
            && !da.convoyed;
        if head_to_head {
            return Some(if w.strength > da.strength {
                Decision::Enters { dislodged: Some(d) }
            } else {
                Decision::Bounced { standoff: w.strength == da.strength }
            });
        }

        if da.target == target || self.winner.get(&da.target).copied().flatten() != Some(di) {
            // The defender's own attack has already failed.
            return Some(self.duel(w.strength, d));
        }
        match self.decisions.get(&da.target) {
            Some(Decision::Enters { .. }) => Some(Decision::Enters { dislodged: None }),
            Some(Decision::Bounced { .. }) | Some(Decision::Standoff) => {
                Some(self.duel(w.strength, d))
            }
            Some(Decision::Undecided) | None => None,
        }
    }

    fn run(&mut self) {
        loop {
            let open: Vec<AreaId> = self
                .decisions
                .iter()
                .filter(|(_, d)| **d == Decision::Undecided)
                .map(|(a, _)| *a)
                .collect();
            if open.is_empty() {
                return;
            }
            let mut progress = false;
            for target in open {
                if let Some(decision) = self.judge(target) {
                    self.decisions.insert(target, decision);
                    progress = true;
                }
            }
            if !progress {
                // Only rings of moves are left open; every unit in a ring
                // leaves the area the next one enters.
                for d in self.decisions.values_mut() {
                    if *d == Decision::Undecided {
                        *d = Decision::Enters { dislodged: None };
                    }
                }
                return;
            }
        }
    }
}

/// Resolves every attack still in play and applies the outcome.
pub fn resolve_conflicts(
    board: &Board,
    ctx: &TurnContext,
    mut snap: Snapshot,
    log: &mut AdjudicationLog,
) -> (Snapshot, ConflictReport) {
    let mut report = ConflictReport::default();
    let (attacks, decisions, winner) = {
        let view = View::new(board, ctx, &snap);
        let mut resolver = Resolver::new(&view);
        resolver.run();
        (resolver.attacks, resolver.decisions, resolver.winner)
    };

    let text = |snap: &Snapshot, a: &Attack| match snap.units.get(&a.unit) {
        Some(u) => format!("{} ({})", format_order(board, &snap.units, u, &a.order), a.strength),
        None => format!("? #{}", a.unit.0),
    };

    let mut moves = Vec::new();
    let mut dislodgements = Vec::new();
    for (&target, decision) in &decisions {
        let win = winner.get(&target).copied().flatten();
        for a in attacks.iter().filter(|a| a.target == target) {
            let line = text(&snap, a);
            match decision {
                Decision::Standoff => {
                    log.info(Stage::Conflicts, format!("{} bounces", line));
                }
                Decision::Enters { .. } if Some(a.unit) == win.map(|i| attacks[i].unit) => {
                    log.info(Stage::Conflicts, format!("{} succeeds", line));
                }
                Decision::Bounced { .. } if Some(a.unit) == win.map(|i| attacks[i].unit) => {
                    log.info(Stage::Conflicts, format!("{} fails", line));
                }
                _ => log.info(Stage::Conflicts, format!("{} is outmatched", line)),
            }
        }
        match decision {
            Decision::Standoff | Decision::Bounced { standoff: true } => {
                report.standoffs.insert(target);
                log.info(Stage::Conflicts, format!("standoff in {}", board.code(target)));
            }
            Decision::Enters { dislodged } => {
                if let Some(i) = win {
                    moves.push(attacks[i]);
                    if let Some(d) = dislodged {
                        dislodgements.push((*d, attacks[i].origin));
                    }
                }
            }
            Decision::Bounced { standoff: false } | Decision::Undecided => {}
        }
    }

    for &(id, origin) in &dislodgements {
        snap.orders.remove(&id);
        if let Some(u) = snap.units.get_mut(&id) {
            u.must_retreat = Some(origin);
            log.info(
                Stage::Conflicts,
                format!("{} is dislodged from {}", format_unit(board, u), board.code(origin)),
            );
        }
    }

    for a in &moves {
        let Some(u) = snap.units.get_mut(&a.unit) else {
            continue;
        };
        match a.order {
            Order::Advance { dest, coast } => {
                u.area = dest;
                u.coast = coast;
                if ctx.rebellion_against_other(dest, u.player).is_some() {
                    report.rebellions_put_down.insert(dest);
                    log.info(
                        Stage::Conflicts,
                        format!("rebellion in {} is put down", format_location(board, dest, None)),
                    );
                }
            }
            Order::Convert { to } => {
                u.unit_type = to;
                u.coast = None;
            }
            _ => {}
        }
        u.siege = SiegeStage::None;
    }

    for a in &attacks {
        snap.orders.remove(&a.unit);
    }
    (snap, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::maps::tuscany;
    use crate::board::{PlayerId, SupportedAction, Unit};

    fn at(b: &Board, code: &str) -> AreaId {
        b.find(code).unwrap()
    }

    fn run(b: &Board, units: Vec<Unit>, orders: Vec<(u32, Order)>) -> (Snapshot, ConflictReport, AdjudicationLog) {
        let mut s = Snapshot::default();
        for u in units {
            s.units.insert(u.id, u);
        }
        for (id, o) in orders {
            s.orders.insert(UnitId(id), o);
        }
        let mut log = AdjudicationLog::new();
        let (s, r) = resolve_conflicts(b, &TurnContext::default(), s, &mut log);
        (s, r, log)
    }

    fn adv(dest: AreaId) -> Order {
        Order::Advance { dest, coast: None }
    }

    #[test]
    fn equal_attacks_stand_off() {
        let b = tuscany().unwrap();
        let sie = at(&b, "SIE");
        let (s, r, log) = run(
            &b,
            vec![Unit::army(1, 1, at(&b, "FLO")), Unit::army(2, 2, at(&b, "PER"))],
            vec![(1, adv(sie)), (2, adv(sie))],
        );
        assert_eq!(s.units[&UnitId(1)].area, at(&b, "FLO"));
        assert_eq!(s.units[&UnitId(2)].area, at(&b, "PER"));
        assert!(r.standoffs.contains(&sie));
        assert_eq!(
            log.to_string(),
            "[conflicts] A FLO - SIE (1) bounces\n\
             [conflicts] A PER - SIE (1) bounces\n\
             [conflicts] standoff in SIE\n"
        );
    }

    #[test]
    fn moving_out_vacates_the_area() {
        let b = tuscany().unwrap();
        let (flo, sie, per) = (at(&b, "FLO"), at(&b, "SIE"), at(&b, "PER"));
        let (s, r, _) = run(
            &b,
            vec![Unit::army(1, 1, flo), Unit::army(2, 2, sie)],
            vec![(1, adv(sie)), (2, adv(per))],
        );
        assert_eq!(s.units[&UnitId(1)].area, sie);
        assert_eq!(s.units[&UnitId(2)].area, per);
        assert!(s.units.values().all(|u| u.must_retreat.is_none()));
        assert!(r.standoffs.is_empty());
    }

    #[test]
    fn failed_move_out_defends_with_base_strength() {
        let b = tuscany().unwrap();
        let (flo, sie, per, are) = (at(&b, "FLO"), at(&b, "SIE"), at(&b, "PER"), at(&b, "ARE"));
        // Unit 2 leaves SIE for PER but bounces off a holding army there.
        let (s, r, _) = run(
            &b,
            vec![
                Unit::army(1, 1, flo),
                Unit::army(2, 2, sie),
                Unit::army(3, 3, per),
                Unit::army(4, 1, are),
            ],
            vec![
                (1, adv(sie)),
                (2, adv(per)),
                (4, Order::Support { unit: UnitId(1), action: SupportedAction::Advance { dest: sie, coast: None } }),
            ],
        );
        assert_eq!(s.units[&UnitId(1)].area, sie);
        assert_eq!(s.units[&UnitId(2)].must_retreat, Some(flo));
        assert_eq!(s.units[&UnitId(2)].area, sie);
        assert!(r.standoffs.contains(&per));
    }

    #[test]
    fn head_to_head_stronger_wins() {
        let b = tuscany().unwrap();
        let (flo, sie, are) = (at(&b, "FLO"), at(&b, "SIE"), at(&b, "ARE"));
        let (s, _, _) = run(
            &b,
            vec![Unit::army(1, 1, flo), Unit::army(2, 2, sie), Unit::army(3, 1, are)],
            vec![
                (1, adv(sie)),
                (2, adv(flo)),
                (3, Order::Support { unit: UnitId(1), action: SupportedAction::Advance { dest: sie, coast: None } }),
            ],
        );
        assert_eq!(s.units[&UnitId(1)].area, sie);
        assert_eq!(s.units[&UnitId(2)].must_retreat, Some(flo));
    }

    #[test]
    fn head_to_head_equal_bounces_both() {
        let b = tuscany().unwrap();
        let (flo, sie) = (at(&b, "FLO"), at(&b, "SIE"));
        let (s, r, _) = run(
            &b,
            vec![Unit::army(1, 1, flo), Unit::army(2, 2, sie)],
            vec![(1, adv(sie)), (2, adv(flo))],
        );
        assert_eq!(s.units[&UnitId(1)].area, flo);
        assert_eq!(s.units[&UnitId(2)].area, sie);
        assert!(r.standoffs.contains(&flo) && r.standoffs.contains(&sie));
    }

    #[test]
    fn ring_of_moves_succeeds() {
        let b = tuscany().unwrap();
        let (flo, sie, are) = (at(&b, "FLO"), at(&b, "SIE"), at(&b, "ARE"));
        let (s, _, _) = run(
            &b,
            vec![Unit::army(1, 1, flo), Unit::army(2, 2, sie), Unit::army(3, 3, are)],
            vec![(1, adv(sie)), (2, adv(are)), (3, adv(flo))],
        );
        assert_eq!(s.units[&UnitId(1)].area, sie);
        assert_eq!(s.units[&UnitId(2)].area, are);
        assert_eq!(s.units[&UnitId(3)].area, flo);
    }

    #[test]
    fn lone_garrison_defends() {
        let b = tuscany().unwrap();
        let flo = at(&b, "FLO");
        let (s, r, _) = run(
            &b,
            vec![Unit::army(1, 1, at(&b, "SIE")), Unit::garrison(2, 2, flo)],
            vec![(1, adv(flo))],
        );
        assert_eq!(s.units[&UnitId(1)].area, at(&b, "SIE"));
        assert!(r.standoffs.contains(&flo));
        assert!(s.units[&UnitId(2)].must_retreat.is_none());
    }

    #[test]
    fn own_garrison_lets_its_army_in() {
        let b = tuscany().unwrap();
        let flo = at(&b, "FLO");
        let (s, r, _) = run(
            &b,
            vec![Unit::army(1, 1, at(&b, "SIE")), Unit::garrison(2, 1, flo)],
            vec![(1, adv(flo))],
        );
        assert_eq!(s.units[&UnitId(1)].area, flo);
        assert!(r.standoffs.is_empty());
        assert!(s.units[&UnitId(2)].must_retreat.is_none());
    }

    #[test]
    fn field_unit_shields_its_garrison() {
        let b = tuscany().unwrap();
        let (flo, sie, are) = (at(&b, "FLO"), at(&b, "SIE"), at(&b, "ARE"));
        let (s, _, _) = run(
            &b,
            vec![
                Unit::army(1, 1, sie),
                Unit::army(2, 1, are),
                Unit::army(3, 2, flo),
                Unit::garrison(4, 2, flo),
            ],
            vec![
                (1, adv(flo)),
                (2, Order::Support { unit: UnitId(1), action: SupportedAction::Advance { dest: flo, coast: None } }),
            ],
        );
        assert_eq!(s.units[&UnitId(1)].area, flo);
        assert_eq!(s.units[&UnitId(3)].must_retreat, Some(sie));
        assert!(s.units[&UnitId(4)].must_retreat.is_none());
    }

    #[test]
    fn garrison_takes_the_field() {
        let b = tuscany().unwrap();
        let pis = at(&b, "PIS");
        let (s, _, _) = run(
            &b,
            vec![Unit::garrison(1, 1, pis)],
            vec![(1, Order::Convert { to: crate::board::UnitType::Fleet })],
        );
        assert_eq!(s.units[&UnitId(1)].unit_type, crate::board::UnitType::Fleet);
        assert!(s.orders.is_empty());
    }

    #[test]
    fn advance_into_rebel_area_puts_it_down() {
        let b = tuscany().unwrap();
        let sie = at(&b, "SIE");
        let mut ctx = TurnContext::default();
        ctx.rebellions.push(crate::board::Rebellion { area: sie, against: PlayerId(2), garrisoned: false });
        let mut s = Snapshot::default();
        s.units.insert(UnitId(1), Unit::army(1, 1, at(&b, "FLO")));
        s.orders.insert(UnitId(1), adv(sie));
        let mut log = AdjudicationLog::new();
        let (_, r) = resolve_conflicts(&b, &ctx, s, &mut log);
        assert!(r.rebellions_put_down.contains(&sie));
    }
}
