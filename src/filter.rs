// src/filter.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::dedup::EventCollection;
use crate::models::{Category, EventKind, NormalizedEvent};

/// Category and kind visibility. An event shows when any of its categories is
/// selected and its kind is selected; an empty selection shows nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    categories: BTreeSet<Category>,
    kinds: BTreeSet<EventKind>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl EventFilter {
    pub fn all() -> Self {
        Self {
            categories: Category::ALL.into_iter().collect(),
            kinds: [EventKind::Regular, EventKind::Death].into_iter().collect(),
        }
    }

    pub fn none() -> Self {
        Self {
            categories: BTreeSet::new(),
            kinds: BTreeSet::new(),
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.iter().copied()
    }

    pub fn is_category_selected(&self, c: Category) -> bool {
        self.categories.contains(&c)
    }

    pub fn is_kind_selected(&self, k: EventKind) -> bool {
        self.kinds.contains(&k)
    }

    /// Returns the new selection state of `c`.
    pub fn toggle_category(&mut self, c: Category) -> bool {
        if !self.categories.remove(&c) {
            self.categories.insert(c);
            return true;
        }
        false
    }

    pub fn toggle_kind(&mut self, k: EventKind) -> bool {
        if !self.kinds.remove(&k) {
            self.kinds.insert(k);
            return true;
        }
        false
    }

    pub fn select_all(&mut self) {
        *self = Self::all();
    }

    /// Deselect every category. Kind selection is untouched.
    pub fn clear_categories(&mut self) {
        self.categories.clear();
    }

    pub fn matches(&self, event: &NormalizedEvent) -> bool {
        self.kinds.contains(&event.kind)
            && event.categories().iter().any(|c| self.categories.contains(c))
    }

    /// Keep the indices whose events match, preserving order.
    pub fn apply(&self, events: &EventCollection, indices: &[usize]) -> Vec<usize> {
        indices
            .iter()
            .copied()
            .filter(|&idx| events.get(idx).is_some_and(|e| self.matches(e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::TaggedRecord;
    use crate::dedup::dedup_records;
    use serde_json::json;

    fn events() -> EventCollection {
        let rec = |v: serde_json::Value, category| TaggedRecord {
            record: serde_json::from_value(v).unwrap(),
            category,
        };
        let multi = json!({ "id": 1, "title": "Revolution", "date_gregorian": "1979-02-11" });
        dedup_records(&[
            rec(multi.clone(), Category::Politics),
            rec(multi, Category::Social),
            rec(json!({ "id": 2, "title": "Crash", "date_gregorian": "1929-10-24" }), Category::Economy),
            rec(json!({ "id": 3, "title": "Poet dies", "date_gregorian": "1990-01-01" }), Category::Death),
        ])
        .0
    }

    #[test]
    fn multi_category_event_shows_if_any_tag_selected() {
        let events = events();
        let mut filter = EventFilter::all();
        filter.toggle_category(Category::Politics);
        assert_eq!(filter.apply(&events, &[0, 1, 2]), vec![0, 1, 2]);
        filter.toggle_category(Category::Social);
        assert_eq!(filter.apply(&events, &[0, 1, 2]), vec![1, 2]);
    }

    #[test]
    fn empty_selection_shows_nothing() {
        let events = events();
        let mut filter = EventFilter::all();
        filter.clear_categories();
        assert!(filter.apply(&events, &[0, 1, 2]).is_empty());
        assert!(filter.is_kind_selected(EventKind::Regular));
        assert!(filter.is_kind_selected(EventKind::Death));
        assert!(EventFilter::none().apply(&events, &[0, 1, 2]).is_empty());
        filter.select_all();
        assert_eq!(filter.apply(&events, &[0, 1, 2]).len(), 3);
    }

    #[test]
    fn kind_toggle_hides_deaths() {
        let events = events();
        let mut filter = EventFilter::default();
        assert!(!filter.toggle_kind(EventKind::Death));
        assert_eq!(filter.apply(&events, &[0, 1, 2]), vec![0, 1]);
        assert!(filter.toggle_kind(EventKind::Death));
        assert!(filter.is_kind_selected(EventKind::Death));
    }
}
