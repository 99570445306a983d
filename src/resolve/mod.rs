//! Turn adjudication.
//!
//! `adjudicate_orders` resolves one order phase through a fixed sequence of
//! stages, each a pure step from one `Snapshot` to the next. Dislodged units
//! are then settled by `adjudicate_retreats`.

pub mod conflict;
pub mod control;
pub mod convoy;
pub mod error;
pub mod filters;
pub mod index;
pub mod legality;
pub mod log;
pub mod pipeline;
pub mod retreat;
pub mod siege;
pub mod strength;
pub mod validate;

pub use control::{update_controls, ControlChange};
pub use convoy::find_convoy_path;
pub use error::AdjudicationError;
pub use index::{Snapshot, View};
pub use legality::{is_possible, Illegal};
pub use log::{AdjudicationLog, Level, LogLine, Stage};
pub use pipeline::{
    adjudicate_batch, adjudicate_orders, AdjudicationResult, GameTurn, RetreatRequirement,
};
pub use retreat::{
    adjudicate_retreats, possible_retreats, DisbandReason, RetreatChoice, RetreatOption,
    RetreatOutcome, RetreatResult,
};
pub use siege::{SiegeEvent, SiegeTarget};
pub use strength::{hold_strength, strength};
