//! Board representation and game-state types.
//!
//! Contains the static board graph loaded from map data, plus the units,
//! orders and per-turn facts the adjudicator consumes.

pub mod adjacency;
pub mod area;
pub mod map;
pub mod order;
pub mod state;
pub mod unit;

pub use area::{Area, AreaFlags, AreaId, Coast};
pub use map::{maps, AreaSpec, Board, BoardError, BoardSpec, Strait, StraitSpec};
pub use order::{Order, OrderEntry, OrderStatus, SupportedAction};
pub use state::{Rebellion, RuleOptions, TurnContext};
pub use unit::{PlayerId, SiegeStage, Unit, UnitId, UnitLookup, UnitType};
