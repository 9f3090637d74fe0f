// src/viz_export.rs
use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::{collections::HashSet, fs, path::Path};
use tracing::debug;

use crate::dates::CanonicalDate;
use crate::hierarchy::HierarchyBucket;
use crate::layout::{Band, Layout, LayoutMode, LayoutPoint, ScaleRange, Tick};
use crate::loader::ChunkedLoader;
use crate::models::{Category, EventKind, ImageRef, Links, NormalizedEvent};
use crate::orchestrator::{Scope, Timeline};

/* -------------------------------------------------------------------------- */
/* Entry point                                                                */
/* -------------------------------------------------------------------------- */

/// Write the renderer bundle into `out_dir`: events, eras, stats, one layout
/// per era, the overview layout and an index tying them together.
pub fn write_all_viz(out_dir: &Path, timeline: &Timeline) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {:?}", out_dir))?;
    let mut files: Vec<String> = Vec::new();

    // 1) Events
    let events: Vec<VEvent> = timeline
        .events()
        .iter()
        .map(|(idx, e)| VEvent::from_event(idx, e))
        .collect();
    write_json(out_dir.join("timeline.events.json"), &events)?;
    files.push("timeline.events.json".into());

    // 2) Eras, in presentation order
    let mut slugs = SlugSet::default();
    let eras: Vec<VEra> = timeline
        .hierarchy()
        .buckets()
        .iter()
        .map(|b| VEra::from_bucket(b, slugs.claim(&b.key), timeline))
        .collect();
    write_json(out_dir.join("timeline.eras.json"), &eras)?;
    files.push("timeline.eras.json".into());

    // 3) Stats
    write_json(out_dir.join("timeline.stats.json"), &timeline.stats())?;
    files.push("timeline.stats.json".into());

    // 4) Per-era layouts
    for era in &eras {
        let layout = timeline.layout_for(&Scope::Era(era.key.clone()))?;
        let file = format!("layout.{}.json", era.slug);
        write_json(out_dir.join(&file), &VLayout::new(Some(&era.key), &layout, timeline))?;
        files.push(file);
    }

    // 5) Overview
    let overview = timeline.layout_for(&Scope::Overview)?;
    write_json(
        out_dir.join("layout.overview.json"),
        &VLayout::new(None, &overview, timeline),
    )?;
    files.push("layout.overview.json".into());

    // 6) Index
    let scope = match timeline.scope() {
        Scope::Overview => json!({ "level": "overview" }),
        Scope::Era(key) => json!({ "level": "era", "era": key }),
    };
    let report = timeline.report();
    let idx = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "scope": scope,
        "counts": {
            "events": timeline.events().len(),
            "eras": timeline.hierarchy().len(),
            "records": report.input,
            "merged": report.merged,
            "untitled": report.untitled,
            "undated": report.undated,
        },
        "zoom": timeline.zoom().factor(),
        "viewport_width": timeline.viewport_width(),
        "failed_sources": timeline.failed_sources(),
        "files": &files,
    });
    write_json(out_dir.join("timeline.index.json"), &idx)?;
    debug!("Wrote viz bundle - files={}", files.len() + 1);

    Ok(())
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    let p = path.as_ref();
    let bytes = serde_json::to_vec_pretty(value).with_context(|| format!("serialize {:?}", p))?;
    fs::write(p, bytes).with_context(|| format!("write {:?}", p))?;
    Ok(())
}

/* -------------------------------------------------------------------------- */
/* File names                                                                 */
/* -------------------------------------------------------------------------- */

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid slug pattern"));

pub fn era_slug(key: &str) -> String {
    NON_WORD
        .replace_all(&key.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Hands out unique slugs; collisions get a numeric suffix.
#[derive(Default)]
struct SlugSet(HashSet<String>);

impl SlugSet {
    fn claim(&mut self, key: &str) -> String {
        let base = match era_slug(key) {
            s if s.is_empty() => "era".to_string(),
            s => s,
        };
        let mut slug = base.clone();
        let mut n = 2;
        while !self.0.insert(slug.clone()) {
            slug = format!("{base}-{n}");
            n += 1;
        }
        slug
    }
}

/* -------------------------------------------------------------------------- */
/* Shapes                                                                     */
/* -------------------------------------------------------------------------- */

#[derive(Serialize)]
struct VEvent {
    idx: usize,
    identity: String,
    title: String,
    title_english: Option<String>,
    date: Option<String>,
    display_year: Option<String>,
    fractional_year: Option<f64>,
    date_jalali: Option<String>,
    era: Option<String>,
    era_persian: Option<String>,
    categories: Vec<Category>,
    flags: Vec<Category>,
    kind: EventKind,
    color: &'static str,
    details: Option<String>,
    links: Links,
    image: Option<ImageRef>,
}

impl VEvent {
    fn from_event(idx: usize, e: &NormalizedEvent) -> Self {
        Self {
            idx,
            identity: e.identity.to_string(),
            title: e.titles.primary.clone(),
            title_english: e.titles.english.clone(),
            date: e.date.map(|d| d.iso()),
            display_year: e.date.map(|d| d.display_year()),
            fractional_year: e.date.map(|d| d.fractional_year()),
            date_jalali: e.date_jalali.clone(),
            era: e.era.english.clone(),
            era_persian: e.era.persian.clone(),
            categories: e.categories().to_vec(),
            flags: e.flags.clone(),
            kind: e.kind,
            color: e.primary_category().color(),
            details: e.details.clone(),
            links: e.links.clone(),
            image: e.image.clone(),
        }
    }
}

#[derive(Serialize)]
struct VEra {
    key: String,
    slug: String,
    persian_name: Option<String>,
    css_class: Option<&'static str>,
    color: Option<&'static str>,
    dense: bool,
    count: usize,
    undated: usize,
    min_date: Option<String>,
    max_date: Option<String>,
    min_display: Option<String>,
    max_display: Option<String>,
    date_groups: usize,
}

impl VEra {
    fn from_bucket(b: &HierarchyBucket, slug: String, timeline: &Timeline) -> Self {
        let iso = |d: Option<CanonicalDate>| d.map(|d| d.iso());
        let shown = |d: Option<CanonicalDate>| d.map(|d| d.display_year());
        Self {
            key: b.key.clone(),
            slug,
            persian_name: b.persian_name.clone(),
            css_class: b.era.map(|e| e.css_class()),
            color: b.era.map(|e| e.color()),
            dense: b.era.is_some_and(|e| e.is_dense()),
            count: b.count,
            undated: b.undated.len(),
            min_date: iso(b.min_date),
            max_date: iso(b.max_date),
            min_display: shown(b.min_date),
            max_display: shown(b.max_date),
            date_groups: b.date_groups(timeline.events()).len(),
        }
    }
}

/// A layout with its points pre-split the way the loader would release them.
#[derive(Serialize)]
struct VLayout<'a> {
    era: Option<&'a str>,
    mode: LayoutMode,
    width: f64,
    scale: Option<ScaleRange>,
    ticks: &'a [Tick],
    bands: &'a [Band],
    skipped: usize,
    chunk_size: usize,
    chunks: Vec<Vec<LayoutPoint>>,
}

impl<'a> VLayout<'a> {
    fn new(era: Option<&'a str>, layout: &'a Layout, timeline: &Timeline) -> Self {
        let chunk_size = timeline.config().chunk_size_for(layout.points.len());
        let loader = ChunkedLoader::new(layout.points.clone(), chunk_size);
        let mut chunks = Vec::new();
        while let Some(chunk) = loader.load_next() {
            chunks.push(chunk);
        }
        Self {
            era,
            mode: layout.mode,
            width: layout.width,
            scale: layout.scale,
            ticks: &layout.ticks,
            bands: &layout.bands,
            skipped: layout.skipped,
            chunk_size: loader.chunk_size(),
            chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::TaggedRecord;
    use crate::config::TimelineConfig;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[case::plain("Qajar", "qajar")]
    #[case::spaced("Islamic Republic", "islamic-republic")]
    #[case::unknown("Unknown Era", "unknown-era")]
    #[case::punctuated(" Zand / Afshar ", "zand-afshar")]
    #[case::persian("قاجار", "قاجار")]
    fn slugs(#[case] key: &str, #[case] slug: &str) {
        assert_eq!(era_slug(key), slug);
    }

    #[test]
    fn colliding_slugs_get_suffixes() {
        let mut set = SlugSet::default();
        assert_eq!(set.claim("Qajar"), "qajar");
        assert_eq!(set.claim("qajar!"), "qajar-2");
        assert_eq!(set.claim("???"), "era");
    }

    fn read(dir: &Path, name: &str) -> Value {
        serde_json::from_slice(&fs::read(dir.join(name)).unwrap()).unwrap()
    }

    #[test]
    fn bundle_lists_every_file_it_writes() {
        let records: Vec<_> = [
            (json!({ "id": 1, "title": "Constitution", "date_gregorian": "1906-08-05", "era_english": "Qajar" }), Category::Politics),
            (json!({ "id": 2, "title": "Coup", "date_gregorian": "1953-08-19", "era_english": "Pahlavi" }), Category::Politics),
            (json!({ "id": 3, "title": "Founding", "date_gregorian": "-550-01-01" }), Category::Social),
            (json!({ "id": 4, "title": "Lost" }), Category::Social),
        ]
        .into_iter()
        .map(|(v, category)| TaggedRecord {
            record: serde_json::from_value(v).unwrap(),
            category,
        })
        .collect();
        let timeline = Timeline::from_records(&records, TimelineConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_all_viz(dir.path(), &timeline).unwrap();

        let index = read(dir.path(), "timeline.index.json");
        let files: Vec<&str> = index["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f.as_str().unwrap())
            .collect();
        for f in &files {
            assert!(dir.path().join(f).exists(), "missing {f}");
        }
        assert!(files.contains(&"layout.unknown-era.json"));
        assert_eq!(index["counts"]["events"], 4);
        assert_eq!(index["scope"]["level"], "overview");

        let eras = read(dir.path(), "timeline.eras.json");
        assert_eq!(eras[0]["key"], "Unknown Era");
        assert_eq!(eras[0]["min_display"], "550 BCE");
        assert_eq!(eras[0]["undated"], 1);
        assert_eq!(eras[2]["dense"], true);

        let overview = read(dir.path(), "layout.overview.json");
        let placed: usize = overview["chunks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c.as_array().unwrap().len())
            .sum();
        assert_eq!(placed, 3);
    }
}
