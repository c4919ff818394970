//! Pure band reducer
//!
//! `reduce` never mutates its input. Every branch returns a new collection
//! that shares the untouched entries with the previous one.
//!
//! Edge cases:
//! - field updates and `Remove` on an absent id return an equal copy
//! - `Add` with an id that is already present returns an equal copy

use super::action::FilterAction;
use super::filter::{Filter, FilterId, Filters};

/// Apply one action to a band collection
pub fn reduce(filters: &Filters, action: &FilterAction) -> Filters {
    match action {
        FilterAction::Init(next) => next.clone(),
        FilterAction::Frequency { id, value } => {
            update(filters, *id, |f| f.frequency = *value)
        }
        FilterAction::Gain { id, value } => update(filters, *id, |f| f.gain = *value),
        FilterAction::Quality { id, value } => update(filters, *id, |f| f.quality = *value),
        FilterAction::Type { id, value } => update(filters, *id, |f| f.filter_type = *value),
        FilterAction::Add { id, frequency } => {
            if filters.contains(*id) {
                return filters.clone();
            }
            filters.with_pushed(Filter::with_frequency(*id, *frequency))
        }
        FilterAction::Remove { id } => match filters.index_of(*id) {
            Some(index) => filters.with_removed(index),
            None => filters.clone(),
        },
    }
}

fn update(filters: &Filters, id: FilterId, edit: impl FnOnce(&mut Filter)) -> Filters {
    let Some(index) = filters.index_of(id) else {
        return filters.clone();
    };

    let mut next = filters.entries()[index].as_ref().clone();
    edit(&mut next);
    filters.with_replaced(index, next)
}
