// src/orchestrator.rs
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::api_types::TaggedRecord;
use crate::config::{DataOrigin, TimelineConfig};
use crate::dedup::{dedup_records, DedupReport, EventCollection};
use crate::error::TimelineError;
use crate::fetch::{ingest_sources, DatasetFetcher, FsFetcher, HttpFetcher};
use crate::filter::EventFilter;
use crate::hierarchy::Hierarchy;
use crate::layout::{Layout, LayoutEngine, LayoutMode, LayoutParams, ZoomLevel};
use crate::loader::ChunkedLoader;
use crate::stats::{compute_stats, TimelineStats};
use crate::viz_export::write_all_viz;

/// Which level of the timeline is being looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Overview,
    /// A bucket key as stored in the hierarchy.
    Era(String),
}

/// Everything one loaded timeline owns: the canonical events, the era
/// hierarchy and the view state (filter, zoom, navigation).
#[derive(Debug)]
pub struct Timeline {
    config: TimelineConfig,
    events: EventCollection,
    hierarchy: Hierarchy,
    report: DedupReport,
    failed_sources: Vec<String>,
    filter: EventFilter,
    zoom: ZoomLevel,
    viewport_width: f64,
    scope: Scope,
    history: Vec<Scope>,
}

impl Timeline {
    /// Ingest every configured source, merge duplicates and bucket by era.
    /// Fails only when not a single event survives.
    pub async fn load<F>(fetcher: &F, config: TimelineConfig) -> Result<Self, TimelineError>
    where
        F: DatasetFetcher + Sync,
    {
        let ingestion = ingest_sources(fetcher, &config.sources).await;
        let failed_sources = ingestion
            .failures
            .iter()
            .map(|f| f.source_id().to_string())
            .collect();
        let mut timeline = Self::from_records(&ingestion.records, config)?;
        timeline.failed_sources = failed_sources;
        Ok(timeline)
    }

    pub fn from_records(records: &[TaggedRecord], config: TimelineConfig) -> Result<Self, TimelineError> {
        let (events, report) = dedup_records(records);
        if events.is_empty() {
            return Err(TimelineError::NoEventsLoaded);
        }
        let hierarchy = Hierarchy::build(&events);
        info!(
            "Timeline ready - events={}, eras={}, merged={}",
            events.len(),
            hierarchy.len(),
            report.merged
        );
        Ok(Self {
            viewport_width: config.viewport_width,
            config,
            events,
            hierarchy,
            report,
            failed_sources: Vec::new(),
            filter: EventFilter::all(),
            zoom: ZoomLevel::default(),
            scope: Scope::Overview,
            history: Vec::new(),
        })
    }

    pub fn events(&self) -> &EventCollection {
        &self.events
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn report(&self) -> &DedupReport {
        &self.report
    }

    pub fn failed_sources(&self) -> &[String] {
        &self.failed_sources
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Layouts and loaders read the filter on every call, so changes apply
    /// to the next one.
    pub fn filter_mut(&mut self) -> &mut EventFilter {
        &mut self.filter
    }

    pub fn zoom(&self) -> ZoomLevel {
        self.zoom
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom.zoom_out()
    }

    pub fn set_zoom(&mut self, zoom: ZoomLevel) {
        self.zoom = zoom;
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport_width = width;
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Switch to one era, remembering where we came from.
    pub fn drill_into(&mut self, era: &str) -> Result<&Scope, TimelineError> {
        let key = self
            .hierarchy
            .bucket(era)
            .map(|b| b.key.clone())
            .ok_or_else(|| TimelineError::UnknownEra(era.to_string()))?;
        let next = Scope::Era(key);
        if next != self.scope {
            let prev = std::mem::replace(&mut self.scope, next);
            self.history.push(prev);
        }
        debug!("Scope changed - scope={:?}, depth={}", self.scope, self.history.len());
        Ok(&self.scope)
    }

    /// Returns false when already at the root.
    pub fn navigate_back(&mut self) -> bool {
        match self.history.pop() {
            Some(prev) => {
                self.scope = prev;
                true
            }
            None => false,
        }
    }

    pub fn working_set(&self) -> Result<Vec<usize>, TimelineError> {
        self.working_set_for(&self.scope)
    }

    /// Date-sorted, filtered member indices of a scope.
    pub fn working_set_for(&self, scope: &Scope) -> Result<Vec<usize>, TimelineError> {
        let members = match scope {
            Scope::Overview => self.hierarchy.overview(&self.events),
            Scope::Era(key) => self.hierarchy.events_sorted(key)?.to_vec(),
        };
        Ok(self.filter.apply(&self.events, &members))
    }

    pub fn layout_params_for(&self, scope: &Scope) -> Result<LayoutParams, TimelineError> {
        let mode = match scope {
            Scope::Overview => LayoutMode::Overview,
            Scope::Era(key) => {
                let bucket = self
                    .hierarchy
                    .bucket(key)
                    .ok_or_else(|| TimelineError::UnknownEra(key.clone()))?;
                LayoutMode::Era {
                    dense: bucket.era.is_some_and(|e| e.is_dense()),
                }
            }
        };
        Ok(LayoutParams {
            mode,
            zoom: self.zoom,
            viewport_width: self.viewport_width,
        })
    }

    pub fn layout(&self) -> Result<Layout, TimelineError> {
        self.layout_for(&self.scope)
    }

    /// Recomputed from scratch on every call.
    pub fn layout_for(&self, scope: &Scope) -> Result<Layout, TimelineError> {
        let working_set = self.working_set_for(scope)?;
        let engine = LayoutEngine::new(self.layout_params_for(scope)?);
        let range = match scope {
            Scope::Overview => None,
            Scope::Era(key) => self.hierarchy.bucket(key).and_then(|b| b.date_range()),
        };
        Ok(engine.layout_within(&self.events, &working_set, range))
    }

    /// A fresh loader over the current working set of `scope`.
    pub fn loader_for(&self, scope: &Scope) -> Result<ChunkedLoader<usize>, TimelineError> {
        let working_set = self.working_set_for(scope)?;
        let chunk_size = self.config.chunk_size_for(working_set.len());
        Ok(ChunkedLoader::new(working_set, chunk_size))
    }

    pub fn stats(&self) -> TimelineStats {
        compute_stats(&self.events, &self.hierarchy)
    }
}

async fn load_from(origin: &DataOrigin, config: TimelineConfig) -> Result<Timeline, TimelineError> {
    match origin {
        DataOrigin::Dir(dir) => Timeline::load(&FsFetcher::new(dir), config).await,
        DataOrigin::Http(base) => {
            let fetcher = HttpFetcher::new(base.clone())
                .map_err(|e| TimelineError::Config(format!("HTTP client: {e}")))?;
            Timeline::load(&fetcher, config).await
        }
    }
}

/// Load, optionally focus one era, and write the export bundle to `output_dir`.
pub async fn run_export(
    config: TimelineConfig,
    origin: &DataOrigin,
    output_dir: &Path,
    era: Option<&str>,
) -> Result<Timeline> {
    let pipeline_start = std::time::Instant::now();
    info!(
        "Pipeline started - origin={:?}, sources={}, output_dir={}",
        origin,
        config.sources.len(),
        output_dir.display()
    );

    let mut timeline = match load_from(origin, config).await {
        Ok(t) => t,
        Err(TimelineError::NoEventsLoaded) => {
            error!("No events could be loaded - origin={:?}", origin);
            return Err(TimelineError::NoEventsLoaded.into());
        }
        Err(e) => return Err(e.into()),
    };
    if !timeline.failed_sources().is_empty() {
        warn!(
            "Partial load - failed_sources={}",
            timeline.failed_sources().join(", ")
        );
    }

    if let Some(era) = era {
        timeline.drill_into(era)?;
    }

    let persist_start = std::time::Instant::now();
    write_all_viz(output_dir, &timeline)
        .with_context(|| format!("Writing export bundle to {}", output_dir.display()))?;
    info!(
        "Output persisted - duration={:.2}s, directory={}",
        persist_start.elapsed().as_secs_f32(),
        output_dir.display()
    );

    info!(
        "Pipeline completed successfully - total_duration={:.2}s, events={}, eras={}",
        pipeline_start.elapsed().as_secs_f32(),
        timeline.events().len(),
        timeline.hierarchy().len()
    );
    Ok(timeline)
}
