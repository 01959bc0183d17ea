use std::sync::Arc;

use shared::{
    domain::{PersonField, SortOrder},
    protocol::{FieldFilter, Sorter},
};
use tracing::debug;

use crate::{collaborators::EntityCollection, config::SessionSettings};

/// Three-state sort toggle and free-text search over the list.
pub struct SortFilterController {
    collection: Arc<dyn EntityCollection>,
    sort_field: PersonField,
    search_field: PersonField,
    order: SortOrder,
}

impl SortFilterController {
    pub fn new(collection: Arc<dyn EntityCollection>, settings: &SessionSettings) -> Self {
        Self {
            collection,
            sort_field: settings.sort_field,
            search_field: settings.search_field,
            order: SortOrder::None,
        }
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Advances `None -> Ascending -> Descending -> None` and applies it.
    pub fn toggle_sort(&mut self) -> SortOrder {
        self.order = self.order.next();
        let sorter = match self.order {
            SortOrder::None => None,
            order => Some(Sorter {
                field: self.sort_field,
                descending: order == SortOrder::Descending,
            }),
        };
        debug!(order = ?self.order, field = %self.sort_field, "applying sort");
        self.collection.sort(sorter);
        self.order
    }

    /// Filters on the search field; empty text clears the filter.
    pub fn search(&self, text: &str) {
        let filter = (!text.is_empty()).then(|| FieldFilter::contains(self.search_field, text));
        debug!(field = %self.search_field, text, "applying search filter");
        self.collection.filter(filter);
    }
}

#[cfg(test)]
#[path = "tests/sort_filter_tests.rs"]
mod tests;
