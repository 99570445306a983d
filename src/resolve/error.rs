//! Structural-integrity errors.
//!
//! These abort a run before any state is computed. Rule-level problems never
//! surface here; they are resolved by the pipeline and recorded in the log.

use thiserror::Error;

use crate::board::{AreaId, UnitId};

/// A precondition of the adjudicator was violated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdjudicationError {
    #[error("unit {0:?} appears more than once")]
    DuplicateUnit(UnitId),

    #[error("unit {0:?} has more than one confirmed order")]
    DuplicateOrder(UnitId),

    #[error("unknown unit {0:?}")]
    UnknownUnit(UnitId),

    #[error("unknown area {0:?}")]
    UnknownArea(AreaId),

    #[error("area {area:?} holds {count} units of one kind")]
    Overcrowded { area: AreaId, count: usize },

    #[error("unit {0:?} cannot stand in its area")]
    MisplacedUnit(UnitId),

    #[error("unit {0:?} has an invalid coast")]
    InvalidUnitCoast(UnitId),

    #[error("unit {0:?} still has a pending retreat")]
    PendingRetreat(UnitId),

    #[error("unit {0:?} is not retreating")]
    NotRetreating(UnitId),

    #[error("unit {0:?} has more than one retreat choice")]
    DuplicateRetreatChoice(UnitId),
}
