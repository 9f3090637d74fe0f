use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::api_types::TaggedRecord;
use crate::models::{EventIdentity, NormalizedEvent};

/// The canonical event set: exactly one event per identity, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCollection {
    events: Vec<NormalizedEvent>,
    index: HashMap<EventIdentity, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted(usize),
    Merged { idx: usize, added_tags: usize },
}

impl EventCollection {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[NormalizedEvent] {
        &self.events
    }

    pub fn get(&self, idx: usize) -> Option<&NormalizedEvent> {
        self.events.get(idx)
    }

    pub fn position(&self, identity: &EventIdentity) -> Option<usize> {
        self.index.get(identity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &NormalizedEvent)> {
        self.events.iter().enumerate()
    }

    /// Register a new identity, or fold the event's tags into the existing one.
    /// Scalar fields of the first-seen event always win.
    pub fn insert_or_merge(&mut self, event: NormalizedEvent) -> MergeOutcome {
        if let Some(&idx) = self.index.get(&event.identity) {
            let existing = &mut self.events[idx];
            let added_tags = event
                .categories()
                .iter()
                .filter(|c| existing.absorb_category(**c))
                .count();
            return MergeOutcome::Merged { idx, added_tags };
        }
        let idx = self.events.len();
        self.index.insert(event.identity.clone(), idx);
        self.events.push(event);
        MergeOutcome::Inserted(idx)
    }

    pub fn into_events(self) -> Vec<NormalizedEvent> {
        self.events
    }
}

impl FromIterator<NormalizedEvent> for EventCollection {
    fn from_iter<I: IntoIterator<Item = NormalizedEvent>>(iter: I) -> Self {
        let mut collection = EventCollection::default();
        for event in iter {
            collection.insert_or_merge(event);
        }
        collection
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub input: usize,
    pub unique: usize,
    pub merged: usize,
    pub untitled: usize,
    pub undated: usize,
}

/// Normalize tagged records and merge duplicates across category files.
pub fn dedup_records(records: &[TaggedRecord]) -> (EventCollection, DedupReport) {
    let start = std::time::Instant::now();
    debug!("Deduplication started - records={}", records.len());

    // order-preserving parallel normalization; the fold below stays sequential
    let normalized: Vec<Option<NormalizedEvent>> =
        records.par_iter().map(NormalizedEvent::from_tagged).collect();

    let mut report = DedupReport {
        input: records.len(),
        ..DedupReport::default()
    };
    let mut collection = EventCollection::default();
    for (i, event) in normalized.into_iter().enumerate() {
        let Some(event) = event else {
            warn!("Record dropped - position={}, reason=no title", i);
            report.untitled += 1;
            continue;
        };
        if event.date.is_none() {
            warn!("Undated event kept - identity={}", event.identity);
        }
        if let MergeOutcome::Merged { .. } = collection.insert_or_merge(event) {
            report.merged += 1;
        }
    }
    report.unique = collection.len();
    report.undated = collection.events().iter().filter(|e| e.date.is_none()).count();

    info!(
        "Deduplication completed - duration={:.2}s, input={}, unique={}, merged={}, untitled={}, undated={}",
        start.elapsed().as_secs_f32(),
        report.input,
        report.unique,
        report.merged,
        report.untitled,
        report.undated
    );
    (collection, report)
}

/// Re-run the merge over already canonical events; a no-op on dedup output.
pub fn dedup_events<I: IntoIterator<Item = NormalizedEvent>>(events: I) -> EventCollection {
    events.into_iter().collect()
}
