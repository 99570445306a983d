//! Static order legality.
//!
//! `is_possible` answers whether an order could be given at all in the
//! current position, independent of what other units do this turn. The
//! pipeline degrades illegal orders to Hold before adjudication.

use thiserror::Error;

use crate::board::{AreaId, Order, SupportedAction, Unit, UnitType};

use super::index::View;

/// Why an order cannot be given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Illegal {
    #[error("garrisons cannot do that")]
    NotMobile,

    #[error("destination cannot hold this unit type")]
    DestinationRejectsUnit,

    #[error("destination is not adjacent")]
    NotAdjacent,

    #[error("destination coast must be named")]
    CoastRequired,

    #[error("unknown coast")]
    UnknownCoast,

    #[error("area is not fortified")]
    NotFortified,

    #[error("area has no port")]
    NoPort,

    #[error("nothing to besiege")]
    NoSiegeTarget,

    #[error("unit is not besieging")]
    NotBesieging,

    #[error("invalid conversion")]
    InvalidConversion,

    #[error("a garrison is already present")]
    GarrisonPresent,

    #[error("fleets cannot be raised in an area with several coasts")]
    SplitCoast,

    #[error("garrison is under siege")]
    UnderSiege,

    #[error("only fleets at sea can convoy")]
    NotAtSea,

    #[error("only armies on the coast can be convoyed")]
    NotConvoyable,

    #[error("supported unit is out of reach")]
    SupportOutOfReach,

    #[error("support does not fit the supported unit")]
    SupportMismatch,

    #[error("unit cannot support itself")]
    SupportSelf,
}

impl Illegal {
    /// Map-data failures are errors; everything else is a player mistake.
    pub fn is_data_error(self) -> bool {
        matches!(self, Illegal::UnknownCoast)
    }
}

fn mobile(unit: &Unit) -> Result<(), Illegal> {
    if unit.is_mobile() {
        Ok(())
    } else {
        Err(Illegal::NotMobile)
    }
}

fn accepts(view: &View<'_>, area: AreaId, unit_type: UnitType) -> bool {
    view.board.get(area).is_some_and(|a| match unit_type {
        UnitType::Army => a.accepts_army(),
        UnitType::Fleet => a.accepts_fleet(),
        UnitType::Garrison => a.accepts_garrison(),
    })
}

/// Returns the enemy garrison or garrisoned rebellion `unit` could besiege.
pub fn has_siege_target(view: &View<'_>, unit: &Unit) -> bool {
    let enemy_garrison = view.garrison_at(unit.area).is_some_and(|g| g.player != unit.player);
    enemy_garrison
        || view
            .ctx
            .rebellion_against_other(unit.area, unit.player)
            .is_some_and(|r| r.garrisoned)
}

/// Checks whether `unit` may give `order`.
pub fn is_possible(view: &View<'_>, unit: &Unit, order: &Order) -> Result<(), Illegal> {
    let board = view.board;
    let here = board.area(unit.area);
    match *order {
        Order::Hold | Order::Disband => Ok(()),

        Order::Advance { dest, coast } => {
            mobile(unit)?;
            if dest == unit.area {
                return Err(Illegal::NotAdjacent);
            }
            if !accepts(view, dest, unit.unit_type) {
                return Err(Illegal::DestinationRejectsUnit);
            }
            let target = board.area(dest);
            if unit.is_fleet() {
                if let Some(c) = coast {
                    if !target.has_coast(c) {
                        return Err(Illegal::UnknownCoast);
                    }
                } else if target.has_coasts()
                    && board.fleet_coasts_to(unit.area, unit.coast, dest).len() > 1
                {
                    return Err(Illegal::CoastRequired);
                }
            }
            if board.is_adjacent(unit.area, dest, unit.is_fleet(), unit.coast, coast) {
                return Ok(());
            }
            let convoyable =
                unit.unit_type == UnitType::Army && here.flags.is_coast && target.flags.is_coast;
            if convoyable {
                Ok(())
            } else {
                Err(Illegal::NotAdjacent)
            }
        }

        Order::Besiege => {
            mobile(unit)?;
            if !here.flags.is_fortified {
                return Err(Illegal::NotFortified);
            }
            if unit.is_fleet() && !here.flags.has_port {
                return Err(Illegal::NoPort);
            }
            if has_siege_target(view, unit) {
                Ok(())
            } else {
                Err(Illegal::NoSiegeTarget)
            }
        }

        Order::LiftSiege => {
            mobile(unit)?;
            if unit.siege.counter() > 0 {
                Ok(())
            } else {
                Err(Illegal::NotBesieging)
            }
        }

        Order::Convert { to } => {
            if !here.flags.is_fortified {
                return Err(Illegal::NotFortified);
            }
            if to == unit.unit_type || (unit.is_mobile() && to.is_mobile()) {
                return Err(Illegal::InvalidConversion);
            }
            let needs_port = unit.is_fleet() || to == UnitType::Fleet;
            if needs_port && !here.flags.has_port {
                return Err(Illegal::NoPort);
            }
            if to == UnitType::Garrison {
                return match view.garrison_at(unit.area) {
                    Some(_) => Err(Illegal::GarrisonPresent),
                    None => Ok(()),
                };
            }
            // A garrison taking the field.
            if to == UnitType::Fleet && here.has_coasts() {
                return Err(Illegal::SplitCoast);
            }
            if !accepts(view, unit.area, to) {
                return Err(Illegal::DestinationRejectsUnit);
            }
            let besieged = view
                .field_at(unit.area)
                .is_some_and(|f| f.player != unit.player && f.siege.counter() > 0);
            if besieged {
                Err(Illegal::UnderSiege)
            } else {
                Ok(())
            }
        }

        Order::Convoy { army, dest, .. } => {
            if !unit.is_fleet() || !(here.flags.is_sea || here.flags.is_lagoon) {
                return Err(Illegal::NotAtSea);
            }
            let carried = view.unit(army).ok_or(Illegal::NotConvoyable)?;
            let coastal = |a: AreaId| board.get(a).is_some_and(|a| a.flags.is_coast);
            if carried.unit_type != UnitType::Army
                || !coastal(carried.area)
                || !coastal(dest)
                || !accepts(view, dest, UnitType::Army)
            {
                return Err(Illegal::NotConvoyable);
            }
            Ok(())
        }

        Order::Support { unit: target_id, action } => {
            if target_id == unit.id {
                return Err(Illegal::SupportSelf);
            }
            let target = view.unit(target_id).ok_or(Illegal::SupportMismatch)?;
            let area = match action {
                SupportedAction::Hold => target.area,
                SupportedAction::Advance { dest, .. } => {
                    if !target.is_mobile() {
                        return Err(Illegal::SupportMismatch);
                    }
                    dest
                }
                SupportedAction::Convert { to } => {
                    if target.unit_type != UnitType::Garrison || !to.is_mobile() {
                        return Err(Illegal::SupportMismatch);
                    }
                    target.area
                }
            };
            if area == unit.area {
                return Ok(());
            }
            if !unit.is_mobile() {
                return Err(Illegal::SupportOutOfReach);
            }
            if board.is_adjacent(unit.area, area, unit.is_fleet(), unit.coast, None)
                && accepts(view, area, unit.unit_type)
            {
                Ok(())
            } else {
                Err(Illegal::SupportOutOfReach)
            }
        }
    }
}
