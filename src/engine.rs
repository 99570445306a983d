//! Engine state management.
//!
//! Holds the board, the current position and the standoffs of the last
//! order phase between requests, and dispatches each `Request` to the
//! adjudicator.

use std::collections::BTreeMap;

use crate::board::{AreaId, Board, PlayerId, TurnContext, Unit};
use crate::protocol::notation::{format_location, format_unit, parse_orders};
use crate::protocol::request::{parse_request, Request, Response};
use crate::resolve::validate::{validate_context, validate_units};
use crate::resolve::{
    adjudicate_orders, adjudicate_retreats, possible_retreats, update_controls,
};

/// The mutable state of one game session.
pub struct Engine {
    board: Board,
    pub units: Vec<Unit>,
    pub context: TurnContext,
    /// Standoff areas of the last order phase; closed to retreats.
    pub standoffs: Vec<AreaId>,
}

/// What the main loop should do after a line.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Send(Response),
    Quit,
}

impl Engine {
    /// Creates an engine with an empty position on `board`.
    pub fn new(board: Board) -> Self {
        Engine { board, units: Vec::new(), context: TurnContext::default(), standoffs: Vec::new() }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Handles one protocol line.
    pub fn handle_line(&mut self, line: &str) -> Reply {
        match parse_request(line) {
            Ok(Request::Quit) => Reply::Quit,
            Ok(request) => Reply::Send(self.handle(request)),
            Err(e) => {
                log::warn!("{}", e);
                Reply::Send(Response::error(e))
            }
        }
    }

    /// Dispatches a parsed request.
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Load { units, context } => {
                if let Err(e) =
                    validate_units(&self.board, &units).and_then(|_| validate_context(&self.board, &context))
                {
                    return Response::error(e);
                }
                self.units = units;
                self.context = context;
                self.standoffs.clear();
                Response::Loaded { units: self.units.len() }
            }
            Request::Adjudicate { mut orders, notation } => {
                if let Some(text) = notation {
                    match parse_orders(&self.board, self.units.as_slice(), &text) {
                        Ok(parsed) => orders.extend(parsed),
                        Err(e) => return Response::error(e),
                    }
                }
                match adjudicate_orders(&self.board, &self.units, &orders, &self.context) {
                    Ok(result) => {
                        self.units = result.units_after.clone();
                        self.standoffs = result.standoff_areas.clone();
                        Response::Adjudicated(result)
                    }
                    Err(e) => Response::error(e),
                }
            }
            Request::RetreatOptions { unit } => {
                match possible_retreats(&self.board, &self.units, unit, &self.standoffs, &self.context)
                {
                    Ok(options) => Response::RetreatOptions { options },
                    Err(e) => Response::error(e),
                }
            }
            Request::Retreat { choices } => {
                match adjudicate_retreats(
                    &self.board,
                    &self.units,
                    &choices,
                    &self.standoffs,
                    &self.context,
                ) {
                    Ok(result) => {
                        self.units = result.units_after.clone();
                        self.standoffs.clear();
                        Response::Retreated(result)
                    }
                    Err(e) => Response::error(e),
                }
            }
            Request::Controls { controls } => {
                let controls: BTreeMap<AreaId, PlayerId> = controls.into_iter().collect();
                Response::Controls { changes: update_controls(&self.board, &self.units, &controls) }
            }
            Request::Position => Response::Position { units: self.describe_units() },
            Request::Quit => Response::error("quit is handled by the main loop"),
        }
    }

    /// The current units in notation, with siege and retreat markers.
    fn describe_units(&self) -> Vec<String> {
        self.units
            .iter()
            .map(|u| {
                let mut text = format_unit(&self.board, u);
                if u.siege.counter() > 0 {
                    text.push_str(&format!(" (siege {})", u.siege.counter()));
                }
                if let Some(origin) = u.must_retreat {
                    text.push_str(&format!(" (dislodged from {})", format_location(&self.board, origin, None)));
                }
                text
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::maps::tuscany;
    use crate::board::UnitId;
    use crate::resolve::ControlChange;

    fn engine() -> Engine {
        Engine::new(tuscany().unwrap())
    }

    fn send(engine: &mut Engine, line: &str) -> Response {
        match engine.handle_line(line) {
            Reply::Send(r) => r,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    const LOAD: &str = r#"{"command":"load","units":[
        {"id":1,"player":1,"unit_type":"army","area":18},
        {"id":2,"player":1,"unit_type":"army","area":20},
        {"id":3,"player":2,"unit_type":"army","area":19}]}"#;

    #[test]
    fn load_then_adjudicate_with_notation() {
        let mut e = engine();
        assert_eq!(send(&mut e, &LOAD.replace('\n', "")), Response::Loaded { units: 3 });
        let r = send(
            &mut e,
            r#"{"command":"adjudicate","notation":"A FLO - SIE; A ARE S A FLO - SIE"}"#,
        );
        let Response::Adjudicated(result) = r else {
            panic!("expected an adjudication, got {:?}", r);
        };
        assert_eq!(result.retreat_requirements.len(), 1);
        assert_eq!(
            send(&mut e, r#"{"command":"position"}"#),
            Response::Position {
                units: vec!["A SIE".into(), "A ARE".into(), "A SIE (dislodged from FLO)".into()]
            }
        );
    }

    #[test]
    fn retreat_round_trip() {
        let mut e = engine();
        send(&mut e, &LOAD.replace('\n', ""));
        send(&mut e, r#"{"command":"adjudicate","notation":"A FLO - SIE; A ARE S A FLO - SIE"}"#);
        let Response::RetreatOptions { options } = send(&mut e, r#"{"command":"retreat_options","unit":3}"#) else {
            panic!("expected retreat options");
        };
        assert!(options.iter().any(|o| o.area == AreaId(21)));
        let Response::Retreated(result) =
            send(&mut e, r#"{"command":"retreat","choices":[{"unit":3,"destination":21}]}"#)
        else {
            panic!("expected a retreat result");
        };
        assert_eq!(result.units_after.iter().find(|u| u.id == UnitId(3)).unwrap().area, AreaId(21));
        assert!(e.units.iter().all(|u| u.must_retreat.is_none()));
    }

    #[test]
    fn controls_follow_the_position() {
        let mut e = engine();
        send(&mut e, &LOAD.replace('\n', ""));
        let r = send(&mut e, r#"{"command":"controls","controls":[[18,2],[19,2]]}"#);
        assert_eq!(
            r,
            Response::Controls {
                changes: vec![
                    ControlChange { area: AreaId(18), from: Some(PlayerId(2)), to: Some(PlayerId(1)) },
                    ControlChange { area: AreaId(20), from: None, to: Some(PlayerId(1)) },
                ]
            }
        );
    }

    #[test]
    fn load_rejects_units_off_the_board() {
        let mut e = engine();
        send(&mut e, &LOAD.replace('\n', ""));
        let r = send(&mut e, r#"{"command":"load","units":[{"id":1,"player":1,"unit_type":"army","area":999}]}"#);
        assert!(matches!(r, Response::Error { .. }));
        assert_eq!(e.units.len(), 3);
        let Response::Error { .. } = send(&mut e, r#"{"command":"retreat_options","unit":1}"#) else {
            panic!("expected an error for a unit that is not retreating");
        };
    }

    #[test]
    fn errors_become_responses() {
        let mut e = engine();
        assert!(matches!(send(&mut e, "{"), Response::Error { .. }));
        assert!(matches!(
            send(&mut e, r#"{"command":"adjudicate","notation":"A NAP H"}"#),
            Response::Error { .. }
        ));
        assert_eq!(e.handle_line(r#"{"command":"quit"}"#), Reply::Quit);
    }
}
