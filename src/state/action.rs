//! Band mutations understood by the reducer

use super::filter::{FilterId, FilterType, Filters};

/// A single band mutation
///
/// Actions must be validated before dispatch; the reducer applies them
/// unconditionally.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterAction {
    /// Replace the whole collection (health check)
    Init(Filters),
    Frequency { id: FilterId, value: f64 },
    Gain { id: FilterId, value: f64 },
    Quality { id: FilterId, value: f64 },
    Type { id: FilterId, value: FilterType },
    /// Append a flat peaking band at `frequency`
    Add { id: FilterId, frequency: f64 },
    Remove { id: FilterId },
}

impl FilterAction {
    /// The band this action targets, if any
    pub fn target(&self) -> Option<FilterId> {
        match self {
            FilterAction::Init(_) => None,
            FilterAction::Frequency { id, .. }
            | FilterAction::Gain { id, .. }
            | FilterAction::Quality { id, .. }
            | FilterAction::Type { id, .. }
            | FilterAction::Add { id, .. }
            | FilterAction::Remove { id } => Some(*id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterAction::Init(_) => "init",
            FilterAction::Frequency { .. } => "frequency",
            FilterAction::Gain { .. } => "gain",
            FilterAction::Quality { .. } => "quality",
            FilterAction::Type { .. } => "type",
            FilterAction::Add { .. } => "add",
            FilterAction::Remove { .. } => "remove",
        }
    }
}
