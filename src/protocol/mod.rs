//! Protocol handling.
//!
//! The abbreviated order notation used in logs and by players, and the JSON
//! line protocol spoken by the binary.

pub mod notation;
pub mod request;

pub use notation::{
    format_location, format_order, format_unit, parse_order, parse_orders, NotationError,
};
pub use request::{parse_request, Request, RequestError, Response};
