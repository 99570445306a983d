//! Abbreviated order notation.
//!
//! Units are written as a type letter and an area code (`A PIS`, `F CRO/nc`).
//! Orders follow the unit:
//!
//! ```text
//! A PIS H             hold
//! A PIS B             besiege
//! A PIS L             lift siege
//! A PIS 0             disband
//! A PIS - FLO         advance (F UA - CRO/nc with a coast)
//! G PIS = A           convert
//! F TYS C A PIS - ROM convoy
//! A FLO S A PIS H     support hold
//! A FLO S A PIS - SIE support advance
//! A FLO S G PIS = A   support conversion
//! ```
//!
//! Units referenced in an order are resolved by type and area against the
//! current unit set.

use thiserror::Error;

use crate::board::{
    AreaId, Board, Coast, Order, OrderEntry, SupportedAction, Unit, UnitId, UnitLookup, UnitType,
};

/// Errors that can occur when parsing order notation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("empty input")]
    EmptyInput,

    #[error("unknown unit type '{0}'")]
    UnknownUnitType(String),

    #[error("unknown area '{0}'")]
    UnknownArea(String),

    #[error("unknown coast '{0}'")]
    UnknownCoast(String),

    #[error("no {0} on the board")]
    NoSuchUnit(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("unexpected end of input, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: &'static str, found: String },
}

/// Formats an area with an optional coast: `PIS`, `CRO/nc`.
pub fn format_location(board: &Board, area: AreaId, coast: Option<Coast>) -> String {
    match coast {
        Some(c) => format!("{}/{}", board.code(area), c.abbr()),
        None => board.code(area).to_string(),
    }
}

/// Formats a unit as `A PIS`.
pub fn format_unit(board: &Board, unit: &Unit) -> String {
    format!("{} {}", unit.unit_type.letter(), format_location(board, unit.area, unit.coast))
}

fn format_ref<L: UnitLookup + ?Sized>(board: &Board, units: &L, id: UnitId) -> String {
    match units.unit(id) {
        Some(u) => format_unit(board, u),
        None => format!("? #{}", id.0),
    }
}

/// Formats an order given by `unit`.
pub fn format_order<L: UnitLookup + ?Sized>(
    board: &Board,
    units: &L,
    unit: &Unit,
    order: &Order,
) -> String {
    let head = format_unit(board, unit);
    match order {
        Order::Hold => format!("{} H", head),
        Order::Besiege => format!("{} B", head),
        Order::LiftSiege => format!("{} L", head),
        Order::Disband => format!("{} 0", head),
        Order::Advance { dest, coast } => {
            format!("{} - {}", head, format_location(board, *dest, *coast))
        }
        Order::Convert { to } => format!("{} = {}", head, to.letter()),
        Order::Convoy { army, dest, coast } => format!(
            "{} C {} - {}",
            head,
            format_ref(board, units, *army),
            format_location(board, *dest, *coast)
        ),
        Order::Support { unit: target, action } => {
            let target = format_ref(board, units, *target);
            match action {
                SupportedAction::Hold => format!("{} S {} H", head, target),
                SupportedAction::Advance { dest, coast } => format!(
                    "{} S {} - {}",
                    head,
                    target,
                    format_location(board, *dest, *coast)
                ),
                SupportedAction::Convert { to } => {
                    format!("{} S {} = {}", head, target, to.letter())
                }
            }
        }
    }
}

struct Tokens<'s> {
    items: Vec<&'s str>,
    pos: usize,
}

impl<'s> Tokens<'s> {
    fn next(&mut self, expected: &'static str) -> Result<&'s str, NotationError> {
        let t = self
            .items
            .get(self.pos)
            .copied()
            .ok_or(NotationError::UnexpectedEnd(expected))?;
        self.pos += 1;
        Ok(t)
    }

    fn expect(&mut self, literal: &'static str) -> Result<(), NotationError> {
        let t = self.next(literal)?;
        if t == literal {
            Ok(())
        } else {
            Err(NotationError::UnexpectedToken { expected: literal, found: t.to_string() })
        }
    }

    fn finish(&self) -> Result<(), NotationError> {
        match self.items.get(self.pos) {
            None => Ok(()),
            Some(t) => Err(NotationError::UnexpectedToken {
                expected: "end of order",
                found: t.to_string(),
            }),
        }
    }
}

fn parse_type(token: &str) -> Result<UnitType, NotationError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            UnitType::from_letter(c).ok_or_else(|| NotationError::UnknownUnitType(token.to_string()))
        }
        _ => Err(NotationError::UnknownUnitType(token.to_string())),
    }
}

/// Parses `CODE` or `CODE/cc`.
fn parse_location(board: &Board, token: &str) -> Result<(AreaId, Option<Coast>), NotationError> {
    let (code, coast) = match token.split_once('/') {
        Some((code, c)) => {
            let coast =
                Coast::from_abbr(c).ok_or_else(|| NotationError::UnknownCoast(c.to_string()))?;
            (code, Some(coast))
        }
        None => (token, None),
    };
    let area = board
        .find(code)
        .ok_or_else(|| NotationError::UnknownArea(code.to_string()))?;
    Ok((area, coast))
}

fn parse_unit_ref<'u, L: UnitLookup + ?Sized>(
    board: &Board,
    units: &'u L,
    tokens: &mut Tokens<'_>,
) -> Result<&'u Unit, NotationError> {
    let type_token = tokens.next("unit type (A, F, G)")?;
    let unit_type = parse_type(type_token)?;
    let loc_token = tokens.next("area")?;
    let (area, _) = parse_location(board, loc_token)?;
    units
        .unit_at(unit_type, area)
        .ok_or_else(|| NotationError::NoSuchUnit(format!("{} {}", type_token, loc_token)))
}

/// Parses one order in notation into a confirmed order entry.
pub fn parse_order<L: UnitLookup + ?Sized>(
    board: &Board,
    units: &L,
    s: &str,
) -> Result<OrderEntry, NotationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(NotationError::EmptyInput);
    }
    let mut tokens = Tokens { items: s.split_whitespace().collect(), pos: 0 };

    let unit = parse_unit_ref(board, units, &mut tokens)?;
    let order = match tokens.next("action (H, B, L, 0, -, =, C, S)")? {
        "H" => Order::Hold,
        "B" => Order::Besiege,
        "L" => Order::LiftSiege,
        "0" => Order::Disband,
        "-" => {
            let (dest, coast) = parse_location(board, tokens.next("destination")?)?;
            Order::Advance { dest, coast }
        }
        "=" => Order::Convert { to: parse_type(tokens.next("unit type")?)? },
        "C" => {
            let army = parse_unit_ref(board, units, &mut tokens)?;
            tokens.expect("-")?;
            let (dest, coast) = parse_location(board, tokens.next("destination")?)?;
            Order::Convoy { army: army.id, dest, coast }
        }
        "S" => {
            let target = parse_unit_ref(board, units, &mut tokens)?;
            let action = match tokens.next("H, - or =")? {
                "H" => SupportedAction::Hold,
                "-" => {
                    let (dest, coast) = parse_location(board, tokens.next("destination")?)?;
                    SupportedAction::Advance { dest, coast }
                }
                "=" => SupportedAction::Convert { to: parse_type(tokens.next("unit type")?)? },
                other => {
                    return Err(NotationError::UnexpectedToken {
                        expected: "H, - or =",
                        found: other.to_string(),
                    })
                }
            };
            Order::Support { unit: target.id, action }
        }
        other => return Err(NotationError::UnknownAction(other.to_string())),
    };
    tokens.finish()?;
    Ok(OrderEntry::confirmed(unit.id, order))
}

/// Parses orders separated by `;` or newlines. Blank entries are skipped.
pub fn parse_orders<L: UnitLookup + ?Sized>(
    board: &Board,
    units: &L,
    s: &str,
) -> Result<Vec<OrderEntry>, NotationError> {
    s.split(|c| c == ';' || c == '\n')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_order(board, units, part))
        .collect()
}
