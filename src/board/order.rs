//! Order types for the movement phase.
//!
//! One order per unit per turn. Orders name other units by `UnitId` and areas
//! by `AreaId`; the textual notation lives in `protocol::notation`.

use serde::{Deserialize, Serialize};

use super::area::{AreaId, Coast};
use super::unit::{UnitId, UnitType};

/// A movement-phase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// `A PIS H`
    Hold,

    /// `A PIS B`
    Besiege,

    /// `A PIS L`
    LiftSiege,

    /// `A PIS 0`
    Disband,

    /// `A PIS - FLO` or `F UA - CRO/nc`
    Advance {
        dest: AreaId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coast: Option<Coast>,
    },

    /// `G PIS = A`, `A PIS = G`
    Convert { to: UnitType },

    /// `F TYS C A PIS - ROM`
    Convoy {
        army: UnitId,
        dest: AreaId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coast: Option<Coast>,
    },

    /// `A FLO S A PIS H`, `A FLO S A PIS - SIE`, `A FLO S G PIS = A`
    Support {
        unit: UnitId,
        action: SupportedAction,
    },
}

impl Order {
    /// Returns true if the order tries to take an area by force: an advance,
    /// or a garrison converting into a field unit.
    pub fn is_attack(&self) -> bool {
        matches!(
            self,
            Order::Advance { .. } | Order::Convert { to: UnitType::Army | UnitType::Fleet }
        )
    }

    /// Returns true if the order leaves the unit in place for strength
    /// purposes (anything that is not an advance or a conversion).
    pub fn is_stationary(&self) -> bool {
        !matches!(self, Order::Advance { .. } | Order::Convert { .. })
    }
}

/// The action a support order backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportedAction {
    Hold,
    Advance {
        dest: AreaId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coast: Option<Coast>,
    },
    Convert {
        to: UnitType,
    },
}

/// Whether the player may still revise an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    #[default]
    Confirmed,
}

/// An order submitted for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderEntry {
    pub unit: UnitId,
    pub order: Order,
    #[serde(default)]
    pub status: OrderStatus,
}

impl OrderEntry {
    /// A confirmed order.
    pub fn confirmed(unit: UnitId, order: Order) -> Self {
        Self { unit, order, status: OrderStatus::Confirmed }
    }

    /// A pending order; ignored by the adjudicator.
    pub fn pending(unit: UnitId, order: Order) -> Self {
        Self { unit, order, status: OrderStatus::Pending }
    }
}
