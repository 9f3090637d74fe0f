use itertools::Itertools;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::dates::CanonicalDate;
use crate::dedup::EventCollection;
use crate::eras::{resolve_era, KnownEra, UNKNOWN_ERA};
use crate::error::TimelineError;

/// Events sharing one era. Holds indices into the [`EventCollection`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyBucket {
    pub key: String,
    pub era: Option<KnownEra>,
    /// First Persian spelling seen among member events.
    pub persian_name: Option<String>,
    /// Dated members, ascending by canonical date (stable on ties).
    pub members: Vec<usize>,
    /// Members without a parseable date: counted, never positioned.
    pub undated: Vec<usize>,
    pub min_date: Option<CanonicalDate>,
    pub max_date: Option<CanonicalDate>,
    pub count: usize,
}

/// Second level: events of one bucket falling on the same calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateGroup {
    pub date: CanonicalDate,
    pub members: Vec<usize>,
}

impl HierarchyBucket {
    fn new(key: String, era: Option<KnownEra>) -> Self {
        Self {
            key,
            era,
            persian_name: None,
            members: Vec::new(),
            undated: Vec::new(),
            min_date: None,
            max_date: None,
            count: 0,
        }
    }

    pub fn date_range(&self) -> Option<(CanonicalDate, CanonicalDate)> {
        self.min_date.zip(self.max_date)
    }

    pub fn date_groups(&self, events: &EventCollection) -> Vec<DateGroup> {
        self.members
            .iter()
            .filter_map(|&idx| events.get(idx).and_then(|e| e.date).map(|d| (d, idx)))
            .chunk_by(|(d, _)| *d)
            .into_iter()
            .map(|(date, group)| DateGroup {
                date,
                members: group.map(|(_, idx)| idx).collect(),
            })
            .collect()
    }
}

/// Era buckets in presentation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hierarchy {
    buckets: Vec<HierarchyBucket>,
    by_key: HashMap<String, usize>,
}

impl Hierarchy {
    pub fn build(events: &EventCollection) -> Self {
        let start = std::time::Instant::now();
        let mut buckets: Vec<HierarchyBucket> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();

        for (idx, event) in events.iter() {
            let resolved = resolve_era(&event.era);
            let slot = *by_key.entry(resolved.key.clone()).or_insert_with(|| {
                buckets.push(HierarchyBucket::new(resolved.key.clone(), resolved.era));
                buckets.len() - 1
            });
            let bucket = &mut buckets[slot];
            bucket.count += 1;
            if bucket.persian_name.is_none() {
                bucket.persian_name = event.era.persian.clone();
            }
            match event.date {
                Some(date) => {
                    bucket.members.push(idx);
                    bucket.min_date = Some(bucket.min_date.map_or(date, |d| d.min(date)));
                    bucket.max_date = Some(bucket.max_date.map_or(date, |d| d.max(date)));
                }
                None => bucket.undated.push(idx),
            }
        }

        for bucket in &mut buckets {
            // stable: same-date members keep first-seen order
            bucket.members.sort_by_key(|&idx| events.get(idx).and_then(|e| e.date));
        }

        buckets.sort_by(|a, b| match (a.min_date, b.min_date) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.key.cmp(&b.key)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.key.cmp(&b.key),
        });
        let by_key = buckets
            .iter()
            .enumerate()
            .map(|(i, b)| (b.key.clone(), i))
            .collect();

        debug!(
            "Hierarchy built - duration={:.3}s, buckets={}, events={}",
            start.elapsed().as_secs_f32(),
            buckets.len(),
            events.len()
        );
        Self { buckets, by_key }
    }

    pub fn buckets(&self) -> &[HierarchyBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Look up by bucket key, or by any known English/Persian era spelling.
    pub fn bucket(&self, key: &str) -> Option<&HierarchyBucket> {
        let slot = self.by_key.get(key.trim()).copied().or_else(|| {
            KnownEra::lookup(key).and_then(|era| self.by_key.get(era.english()).copied())
        });
        slot.map(|i| &self.buckets[i])
    }

    /// All dated member events of an era, sorted by date.
    pub fn events_sorted(&self, key: &str) -> Result<&[usize], TimelineError> {
        self.bucket(key)
            .map(|b| b.members.as_slice())
            .ok_or_else(|| TimelineError::UnknownEra(key.to_string()))
    }

    /// Every dated event across all eras, sorted by date.
    pub fn overview(&self, events: &EventCollection) -> Vec<usize> {
        self.buckets
            .iter()
            .flat_map(|b| b.members.iter().copied())
            .sorted_by_key(|&idx| (events.get(idx).and_then(|e| e.date), idx))
            .collect()
    }

    pub fn unknown_bucket(&self) -> Option<&HierarchyBucket> {
        self.bucket(UNKNOWN_ERA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::TaggedRecord;
    use crate::dedup::dedup_records;
    use crate::models::Category;
    use serde_json::{json, Value};

    fn collection(records: Vec<Value>) -> EventCollection {
        let tagged: Vec<_> = records
            .into_iter()
            .map(|v| TaggedRecord {
                record: serde_json::from_value(v).unwrap(),
                category: Category::Politics,
            })
            .collect();
        dedup_records(&tagged).0
    }

    #[test]
    fn english_and_persian_spellings_share_a_bucket() {
        let events = collection(vec![
            json!({ "title": "a", "date_gregorian": "1850-01-01", "era_english": "Qajar" }),
            json!({ "title": "b", "date_gregorian": "1800-06-01", "era_persian": "قاجار" }),
        ]);
        let h = Hierarchy::build(&events);
        assert_eq!(h.len(), 1);
        let b = h.bucket("Qajar").unwrap();
        assert_eq!(b.count, 2);
        assert_eq!(b.era, Some(KnownEra::Qajar));
        assert_eq!(b.persian_name.as_deref(), Some("قاجار"));
        assert_eq!(b.members, vec![1, 0]);
        assert_eq!(h.bucket("قاجار").map(|b| &b.key), Some(&"Qajar".to_string()));
    }

    #[test]
    fn undated_events_count_but_stay_out_of_range() {
        let events = collection(vec![
            json!({ "title": "a", "date_gregorian": "1930-01-01", "era_english": "Pahlavi" }),
            json!({ "title": "b", "era_english": "Pahlavi" }),
            json!({ "title": "c", "date_gregorian": "1970-05-01", "era_english": "Pahlavi" }),
        ]);
        let h = Hierarchy::build(&events);
        let b = h.bucket("Pahlavi").unwrap();
        assert_eq!(b.count, 3);
        assert_eq!(b.members, vec![0, 2]);
        assert_eq!(b.undated, vec![1]);
        assert_eq!(b.min_date.unwrap().iso(), "1930-01-01");
        assert_eq!(b.max_date.unwrap().iso(), "1970-05-01");
    }

    #[test]
    fn buckets_sort_by_earliest_date_then_key() {
        let events = collection(vec![
            json!({ "title": "a", "date_gregorian": "1980-01-01", "era_english": "Islamic Republic" }),
            json!({ "title": "b", "era_english": "Mystery" }),
            json!({ "title": "c", "date_gregorian": "-500-01-01", "era_english": "Achaemenid" }),
            json!({ "title": "d", "date_gregorian": "1980-01-01", "era_english": "Alpha" }),
            json!({ "title": "e", "date_gregorian": "1800-01-01" }),
        ]);
        let h = Hierarchy::build(&events);
        let keys: Vec<_> = h.buckets().iter().map(|b| b.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["Achaemenid", UNKNOWN_ERA, "Alpha", "Islamic Republic", "Mystery"]
        );
    }

    #[test]
    fn date_groups_and_overview() {
        let events = collection(vec![
            json!({ "title": "a", "date_gregorian": "1906-08-05", "era_english": "Qajar" }),
            json!({ "title": "b", "date_gregorian": "1941-09-16", "era_english": "Pahlavi" }),
            json!({ "title": "c", "date_gregorian": "1906-08-05", "era_english": "Qajar" }),
            json!({ "title": "d", "date_gregorian": "1848-09-05", "era_english": "Qajar" }),
        ]);
        let h = Hierarchy::build(&events);
        let groups = h.bucket("Qajar").unwrap().date_groups(&events);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].members, vec![0, 2]);

        assert_eq!(h.overview(&events), vec![3, 0, 2, 1]);
        assert!(matches!(h.events_sorted("Safavid"), Err(TimelineError::UnknownEra(_))));
    }

    #[test]
    fn empty_collection_builds_empty_hierarchy() {
        let h = Hierarchy::build(&EventCollection::default());
        assert!(h.is_empty());
        assert!(h.overview(&EventCollection::default()).is_empty());
    }
}
