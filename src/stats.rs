// src/stats.rs
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dates::CanonicalDate;
use crate::dedup::EventCollection;
use crate::hierarchy::Hierarchy;
use crate::models::{Category, EventKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EraStats {
    pub key: String,
    pub persian_name: Option<String>,
    pub count: usize,
    pub undated: usize,
    pub min_date: Option<CanonicalDate>,
    pub max_date: Option<CanonicalDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: Category,
    pub label: &'static str,
    pub color: &'static str,
    pub count: usize,
}

/// Dashboard numbers. Chart drawing is left to whoever reads this.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineStats {
    pub total_events: usize,
    pub era_count: usize,
    pub death_count: usize,
    pub undated_count: usize,
    /// Signed years of the earliest and latest dated event.
    pub year_span: Option<(i32, i32)>,
    pub eras: Vec<EraStats>,
    pub categories: Vec<CategoryStats>,
    /// Dated events per calendar month (1-12), across all years.
    pub months: BTreeMap<u32, usize>,
}

pub fn compute_stats(events: &EventCollection, hierarchy: &Hierarchy) -> TimelineStats {
    let mut category_counts: BTreeMap<Category, usize> = BTreeMap::new();
    let mut months: BTreeMap<u32, usize> = (1..=12).map(|m| (m, 0)).collect();
    let mut death_count = 0;
    let mut undated_count = 0;
    let mut span: Option<(CanonicalDate, CanonicalDate)> = None;

    for (_, event) in events.iter() {
        // multi-tag events count once per tag
        for c in event.categories() {
            *category_counts.entry(*c).or_default() += 1;
        }
        if event.kind == EventKind::Death {
            death_count += 1;
        }
        match event.date {
            Some(d) => {
                *months.entry(d.month()).or_default() += 1;
                span = Some(span.map_or((d, d), |(lo, hi)| (lo.min(d), hi.max(d))));
            }
            None => undated_count += 1,
        }
    }

    let eras = hierarchy
        .buckets()
        .iter()
        .map(|b| EraStats {
            key: b.key.clone(),
            persian_name: b.persian_name.clone(),
            count: b.count,
            undated: b.undated.len(),
            min_date: b.min_date,
            max_date: b.max_date,
        })
        .collect();

    let categories = Category::ALL
        .into_iter()
        .map(|c| CategoryStats {
            category: c,
            label: c.label(),
            color: c.color(),
            count: category_counts.get(&c).copied().unwrap_or(0),
        })
        .collect();

    TimelineStats {
        total_events: events.len(),
        era_count: hierarchy.len(),
        death_count,
        undated_count,
        year_span: span.map(|(lo, hi)| (lo.year(), hi.year())),
        eras,
        categories,
        months,
    }
}
