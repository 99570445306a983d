//! Retreat-phase resolution.
//!
//! Every unit dislodged in the order phase either retreats to one of its
//! `possible_retreats`, becomes a garrison in its own area, or is disbanded.
//! Two or more units retreating into the same area are all disbanded. A unit
//! with no choice, or whose choice is no longer open, is disbanded too.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::board::{
    AreaId, Board, Coast, PlayerId, SiegeStage, TurnContext, Unit, UnitId, UnitType,
};
use crate::protocol::notation::{format_location, format_unit};

use super::error::AdjudicationError;
use super::index::{Snapshot, View};
use super::log::{AdjudicationLog, Stage};
use super::validate::validate_units;

/// A destination open to a dislodged unit. An option naming the unit's own
/// area means converting into a garrison there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RetreatOption {
    pub area: AreaId,
    #[serde(default)]
    pub coast: Option<Coast>,
}

/// A player's decision for one dislodged unit. No destination disbands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatChoice {
    pub unit: UnitId,
    #[serde(default)]
    pub destination: Option<AreaId>,
    #[serde(default)]
    pub coast: Option<Coast>,
}

/// Why a dislodged unit was disbanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisbandReason {
    /// No retreat was ordered.
    NoChoice,
    /// Another unit retreated into the same area.
    Conflict,
    /// The destination is not open to the unit.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetreatOutcome {
    Retreated { unit: UnitId, area: AreaId, coast: Option<Coast> },
    Converted { unit: UnitId },
    Disbanded { unit: UnitId, reason: DisbandReason },
}

impl RetreatOutcome {
    pub fn unit(&self) -> UnitId {
        match *self {
            RetreatOutcome::Retreated { unit, .. }
            | RetreatOutcome::Converted { unit }
            | RetreatOutcome::Disbanded { unit, .. } => unit,
        }
    }
}

/// Everything one retreat phase produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatResult {
    pub units_after: Vec<Unit>,
    pub outcomes: Vec<RetreatOutcome>,
    pub rebellions_put_down: Vec<AreaId>,
    pub log: AdjudicationLog,
}

fn snapshot(units: &[Unit]) -> Snapshot {
    Snapshot {
        units: units.iter().map(|u| (u.id, u.clone())).collect(),
        orders: BTreeMap::new(),
    }
}

fn options_for(view: &View<'_>, unit: &Unit, standoffs: &[AreaId]) -> Vec<RetreatOption> {
    let Some(origin) = unit.must_retreat else {
        return Vec::new();
    };
    if unit.unit_type == UnitType::Garrison {
        return Vec::new();
    }
    let board = view.board;
    let mut options = Vec::new();
    for &next in board.borders(unit.area) {
        if next == origin || standoffs.contains(&next) || view.field_at(next).is_some() {
            continue;
        }
        let split = unit.is_fleet() && board.get(next).is_some_and(|a| a.has_coasts());
        if split {
            for coast in board.fleet_coasts_to(unit.area, unit.coast, next) {
                if view.reaches_directly(unit, next, Some(coast)) {
                    options.push(RetreatOption { area: next, coast: Some(coast) });
                }
            }
        } else if view.reaches_directly(unit, next, None) {
            options.push(RetreatOption { area: next, coast: None });
        }
    }

    let here = board.area(unit.area);
    let can_garrison = here.accepts_garrison()
        && view.garrison_at(unit.area).is_none()
        && (!unit.is_fleet() || here.flags.has_port);
    if can_garrison {
        options.push(RetreatOption { area: unit.area, coast: None });
    }
    options.sort();
    options
}

/// Lists where a dislodged unit may retreat, sorted by area then coast.
/// Split-coast destinations appear once per reachable coast.
pub fn possible_retreats(
    board: &Board,
    units: &[Unit],
    unit: UnitId,
    standoffs: &[AreaId],
    ctx: &TurnContext,
) -> Result<Vec<RetreatOption>, AdjudicationError> {
    validate_units(board, units)?;
    let snap = snapshot(units);
    let view = View::new(board, ctx, &snap);
    let u = view.unit(unit).ok_or(AdjudicationError::UnknownUnit(unit))?;
    if !u.is_dislodged() {
        return Err(AdjudicationError::NotRetreating(unit));
    }
    Ok(options_for(&view, u, standoffs))
}

fn validate_choices(
    board: &Board,
    snap: &Snapshot,
    choices: &[RetreatChoice],
) -> Result<BTreeMap<UnitId, RetreatChoice>, AdjudicationError> {
    let mut by_unit = BTreeMap::new();
    for c in choices {
        let u = snap.units.get(&c.unit).ok_or(AdjudicationError::UnknownUnit(c.unit))?;
        if !u.is_dislodged() {
            return Err(AdjudicationError::NotRetreating(c.unit));
        }
        if let Some(dest) = c.destination {
            if !board.contains(dest) {
                return Err(AdjudicationError::UnknownArea(dest));
            }
        }
        if by_unit.insert(c.unit, *c).is_some() {
            return Err(AdjudicationError::DuplicateRetreatChoice(c.unit));
        }
    }
    Ok(by_unit)
}

/// Matches a choice against the open options. A missing coast is filled in
/// when only one coast of the destination is open.
fn pick(options: &[RetreatOption], dest: AreaId, coast: Option<Coast>) -> Option<RetreatOption> {
    let mut open = options.iter().filter(|o| o.area == dest);
    match coast {
        Some(_) => open.find(|o| o.coast == coast).copied(),
        None => match (open.next(), open.next()) {
            (Some(only), None) => Some(*only),
            _ => None,
        },
    }
}

fn rebel_area(ctx: &TurnContext, area: AreaId, player: PlayerId) -> bool {
    ctx.rebellion_against_other(area, player).is_some()
}

/// Resolves one retreat phase. Either every dislodged unit is settled or an
/// error is returned and nothing is changed.
pub fn adjudicate_retreats(
    board: &Board,
    units: &[Unit],
    choices: &[RetreatChoice],
    standoffs: &[AreaId],
    ctx: &TurnContext,
) -> Result<RetreatResult, AdjudicationError> {
    validate_units(board, units)?;
    let mut snap = snapshot(units);
    let by_unit = validate_choices(board, &snap, choices)?;
    let mut log = AdjudicationLog::new();

    let mut planned: BTreeMap<UnitId, RetreatOption> = BTreeMap::new();
    let mut disbanded: BTreeMap<UnitId, DisbandReason> = BTreeMap::new();
    {
        let view = View::new(board, ctx, &snap);
        for u in view.units.values().filter(|u| u.is_dislodged()) {
            let Some(dest) = by_unit.get(&u.id).and_then(|c| c.destination) else {
                disbanded.insert(u.id, DisbandReason::NoChoice);
                continue;
            };
            let coast = by_unit.get(&u.id).and_then(|c| c.coast);
            let options = options_for(&view, u, standoffs);
            match pick(&options, dest, coast) {
                Some(option) => {
                    planned.insert(u.id, option);
                }
                None => {
                    log.info(
                        Stage::Retreats,
                        format!(
                            "{} cannot retreat to {}",
                            format_unit(board, u),
                            format_location(board, dest, coast)
                        ),
                    );
                    disbanded.insert(u.id, DisbandReason::Invalid);
                }
            }
        }
    }

    let mut per_area: BTreeMap<AreaId, usize> = BTreeMap::new();
    for option in planned.values() {
        *per_area.entry(option.area).or_default() += 1;
    }
    let contested: BTreeSet<AreaId> =
        per_area.into_iter().filter(|(_, n)| *n > 1).map(|(a, _)| a).collect();

    let mut outcomes = Vec::new();
    let mut rebellions_put_down = BTreeSet::new();
    let settled: BTreeSet<UnitId> = planned.keys().chain(disbanded.keys()).copied().collect();
    for id in settled {
        let Some(u) = snap.units.get_mut(&id) else {
            continue;
        };
        let name = format_unit(board, u);
        let plan = planned.get(&id).copied();
        let reason = match plan {
            Some(o) if contested.contains(&o.area) => Some(DisbandReason::Conflict),
            Some(_) => None,
            None => disbanded.get(&id).copied(),
        };

        match (plan, reason) {
            (Some(o), None) if o.area == u.area => {
                u.unit_type = UnitType::Garrison;
                u.coast = None;
                u.must_retreat = None;
                u.siege = SiegeStage::None;
                log.info(Stage::Retreats, format!("{} becomes a garrison", name));
                outcomes.push(RetreatOutcome::Converted { unit: id });
            }
            (Some(o), None) => {
                u.area = o.area;
                u.coast = o.coast;
                u.must_retreat = None;
                u.siege = SiegeStage::None;
                log.info(
                    Stage::Retreats,
                    format!("{} retreats to {}", name, format_location(board, o.area, o.coast)),
                );
                if rebel_area(ctx, o.area, u.player) {
                    rebellions_put_down.insert(o.area);
                }
                outcomes.push(RetreatOutcome::Retreated { unit: id, area: o.area, coast: o.coast });
            }
            (_, reason) => {
                let reason = reason.unwrap_or(DisbandReason::NoChoice);
                let why = match reason {
                    DisbandReason::NoChoice => "no retreat ordered",
                    DisbandReason::Conflict => "retreat contested",
                    DisbandReason::Invalid => "retreat not open",
                };
                log.info(Stage::Retreats, format!("{} disbands: {}", name, why));
                snap.units.remove(&id);
                outcomes.push(RetreatOutcome::Disbanded { unit: id, reason });
            }
        }
    }

    log::info!("retreats: {} units settled", outcomes.len());
    Ok(RetreatResult {
        units_after: snap.units.into_values().collect(),
        outcomes,
        rebellions_put_down: rebellions_put_down.into_iter().collect(),
        log,
    })
}
