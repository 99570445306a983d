//! Signoria adjudicator library.
//!
//! Exposes the board model, the turn adjudicator and the protocol modules
//! for use by integration tests and the binary entry point.

pub mod board;
pub mod engine;
pub mod protocol;
pub mod resolve;

pub use board::{Board, Order, OrderEntry, TurnContext, Unit};
pub use resolve::{adjudicate_orders, adjudicate_retreats, AdjudicationError, AdjudicationResult};
