//! Line protocol messages.
//!
//! Each stdin line carries one JSON `Request`, tagged by its `command` field.
//! Each reply is one JSON `Response` line, tagged by `kind`.
//!
//! ```text
//! {"command":"load","units":[...],"context":{...}}
//! {"command":"adjudicate","notation":"A PIS - FLO; A SIE S A PIS - FLO"}
//! {"command":"retreat_options","unit":3}
//! {"command":"retreat","choices":[{"unit":3,"destination":20}]}
//! {"command":"controls","controls":[[7,1]]}
//! {"command":"position"}
//! {"command":"quit"}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{AreaId, OrderEntry, PlayerId, TurnContext, Unit, UnitId};
use crate::resolve::{
    AdjudicationResult, ControlChange, RetreatChoice, RetreatOption, RetreatResult,
};

/// A request from the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    /// Replaces the current position.
    Load {
        units: Vec<Unit>,
        #[serde(default)]
        context: TurnContext,
    },

    /// Adjudicates an order phase against the current position. Orders may
    /// be given as entries, as notation, or both.
    Adjudicate {
        #[serde(default)]
        orders: Vec<OrderEntry>,
        #[serde(default)]
        notation: Option<String>,
    },

    /// Lists the retreats open to a dislodged unit.
    RetreatOptions { unit: UnitId },

    /// Settles the pending retreats.
    Retreat {
        #[serde(default)]
        choices: Vec<RetreatChoice>,
    },

    /// Computes end-of-year control changes for the current position, given
    /// the current controller of each area as `[area, player]` pairs.
    Controls {
        #[serde(default)]
        controls: Vec<(AreaId, PlayerId)>,
    },

    /// Reports the current position in notation.
    Position,

    Quit,
}

/// A reply to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Loaded { units: usize },
    Adjudicated(AdjudicationResult),
    RetreatOptions { options: Vec<RetreatOption> },
    Retreated(RetreatResult),
    Controls { changes: Vec<ControlChange> },
    Position { units: Vec<String> },
    Error { message: String },
}

impl Response {
    pub fn error(e: impl std::fmt::Display) -> Self {
        Response::Error { message: e.to_string() }
    }
}

/// Errors that can occur when reading a request line.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("empty request")]
    Empty,

    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses one request line.
pub fn parse_request(line: &str) -> Result<Request, RequestError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(RequestError::Empty);
    }
    Ok(serde_json::from_str(trimmed)?)
}
