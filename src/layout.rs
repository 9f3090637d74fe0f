// src/layout.rs
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::dates::{format_year, CanonicalDate};
use crate::dedup::EventCollection;
use crate::error::TimelineError;
use crate::hierarchy::HierarchyBucket;
use crate::models::EventKind;

/// Points closer than this (px) along the axis share a stack.
const POSITION_QUANTUM: f64 = 5.0;
const STACK_STEP: f64 = 8.0;
/// Distance between the axis line and the first stacked point.
const AXIS_GAP: f64 = 15.0;
const SCATTER_SPREAD: f64 = 300.0;
const OVERVIEW_STACK_STEP: f64 = 4.0;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// One era's events; `dense` eras get a wider canvas and finer ticks.
    Era { dense: bool },
    /// All eras together, scattered and clustered by category.
    Overview,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct ZoomLevel(f64);

impl ZoomLevel {
    pub const MIN: f64 = 0.5;
    pub const MAX: f64 = 2.0;
    pub const STEP: f64 = 0.1;

    pub fn new(factor: f64) -> Self {
        let factor = if factor.is_finite() { factor } else { 1.0 };
        // one decimal place, so repeated steps don't drift
        Self(((factor.clamp(Self::MIN, Self::MAX)) * 10.0).round() / 10.0)
    }

    pub fn factor(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }

    /// Returns whether the level changed.
    pub fn zoom_in(&mut self) -> bool {
        let next = Self::new(self.0 + Self::STEP);
        let changed = next != *self;
        *self = next;
        changed
    }

    pub fn zoom_out(&mut self) -> bool {
        let next = Self::new(self.0 - Self::STEP);
        let changed = next != *self;
        *self = next;
        changed
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub mode: LayoutMode,
    pub zoom: ZoomLevel,
    pub viewport_width: f64,
}

impl LayoutParams {
    pub fn new(mode: LayoutMode, viewport_width: f64) -> Self {
        Self {
            mode,
            zoom: ZoomLevel::default(),
            viewport_width,
        }
    }
}

/// Padded year range of a layout, in fractional years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleRange {
    pub min_year: f64,
    pub max_year: f64,
}

impl ScaleRange {
    /// Pad `[lo, hi]` and snap to whole years. A zero-width range still pads
    /// to a positive span.
    pub fn padded(lo: f64, hi: f64) -> Self {
        let pad = padding_for(hi - lo);
        Self {
            min_year: (lo - pad).floor(),
            max_year: (hi + pad).ceil(),
        }
    }

    pub fn total(&self) -> f64 {
        self.max_year - self.min_year
    }

    pub fn fraction(&self, fractional_year: f64) -> f64 {
        (fractional_year - self.min_year) / self.total()
    }
}

pub fn padding_for(base_range: f64) -> f64 {
    if base_range <= 10.0 {
        1.0
    } else if base_range <= 100.0 {
        5.0
    } else {
        (base_range * 0.05).max(10.0)
    }
}

/// `(minimum width, pixels per year)` for a padded range.
pub fn width_rule(mode: LayoutMode, total: f64) -> (f64, f64) {
    match mode {
        LayoutMode::Overview => (1200.0, 10.0),
        LayoutMode::Era { dense: true } => {
            let rate = if total <= 30.0 {
                80.0
            } else if total <= 50.0 {
                60.0
            } else if total <= 80.0 {
                40.0
            } else {
                30.0
            };
            (4000.0, rate)
        }
        LayoutMode::Era { dense: false } => {
            let rate = if total <= 50.0 {
                40.0
            } else if total <= 100.0 {
                20.0
            } else {
                10.0
            };
            (800.0, rate)
        }
    }
}

/// Major tick spacing in years.
pub fn year_step(mode: LayoutMode, total: f64) -> i64 {
    match mode {
        LayoutMode::Era { dense: true } => {
            if total <= 30.0 {
                1
            } else if total <= 60.0 {
                2
            } else {
                10
            }
        }
        LayoutMode::Era { dense: false } => {
            if total <= 12.0 {
                1
            } else if total <= 25.0 {
                2
            } else if total <= 50.0 {
                5
            } else if total <= 100.0 {
                10
            } else {
                coarse_step(total)
            }
        }
        LayoutMode::Overview => {
            if total <= 50.0 {
                10
            } else {
                coarse_step(total)
            }
        }
    }
}

fn coarse_step(total: f64) -> i64 {
    if total <= 200.0 {
        25
    } else if total <= 500.0 {
        50
    } else if total <= 1000.0 {
        100
    } else {
        200
    }
}

/// `(months per band, label with month names)` for a year span.
pub fn month_step(span_years: f64) -> (u32, bool) {
    if span_years > 100.0 {
        (60, false)
    } else if span_years > 50.0 {
        (24, false)
    } else if span_years > 20.0 {
        (12, false)
    } else if span_years > 10.0 {
        (6, false)
    } else if span_years > 5.0 {
        (3, true)
    } else {
        (1, true)
    }
}

/// Deterministic value in `[0, 1)` from a stable event seed.
pub fn pseudo_random(seed: u64) -> f64 {
    let hashed = ((seed % 233_280) * 9_301 + 49_297) % 233_280;
    hashed as f64 / 233_280.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// Regular events, stacked upward from the axis.
    Above,
    /// Death events, stacked downward.
    Below,
}

/// `x` runs along the time axis, `y` across it (0 is the axis line).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutPoint {
    pub event_idx: usize,
    pub x: f64,
    pub y: f64,
    pub stack_index: u32,
    pub lane: Lane,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub year: i64,
    pub x: f64,
    pub label: String,
    pub major: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    pub start_x: f64,
    pub end_x: f64,
    pub label: String,
    pub shaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub mode: LayoutMode,
    pub scale: Option<ScaleRange>,
    pub width: f64,
    pub points: Vec<LayoutPoint>,
    pub ticks: Vec<Tick>,
    pub bands: Vec<Band>,
    /// Working-set members left out for lack of a date.
    pub skipped: usize,
}

impl Layout {
    fn empty(mode: LayoutMode, skipped: usize) -> Self {
        Self {
            mode,
            scale: None,
            width: 0.0,
            points: Vec::new(),
            ticks: Vec::new(),
            bands: Vec::new(),
            skipped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Default)]
struct StackCounter {
    regular: u32,
    death: u32,
}

impl StackCounter {
    fn next(&mut self, kind: EventKind) -> u32 {
        let slot = match kind {
            EventKind::Regular => &mut self.regular,
            EventKind::Death => &mut self.death,
        };
        let index = *slot;
        *slot += 1;
        index
    }
}

/// Maps a working set onto canvas coordinates. Stateless apart from its
/// parameters; every call recomputes the layout wholesale.
#[derive(Debug, Clone, Copy)]
pub struct LayoutEngine {
    params: LayoutParams,
}

impl LayoutEngine {
    pub fn new(params: LayoutParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Lay out `working_set` (indices into `events`, expected date-sorted).
    /// An empty or entirely undated set yields an empty layout.
    pub fn layout(&self, events: &EventCollection, working_set: &[usize]) -> Layout {
        self.layout_within(events, working_set, None)
    }

    /// Same as [`layout`](Self::layout) but seeds the range from the bucket's
    /// precomputed date bounds.
    pub fn layout_bucket(&self, events: &EventCollection, bucket: &HierarchyBucket) -> Layout {
        self.layout_within(events, &bucket.members, bucket.date_range())
    }

    /// Lay out `working_set` over a range at least as wide as `range`. Keeps
    /// the axis of a filtered era stable.
    pub fn layout_within(
        &self,
        events: &EventCollection,
        working_set: &[usize],
        range: Option<(CanonicalDate, CanonicalDate)>,
    ) -> Layout {
        match self.try_layout(events, working_set, range) {
            Ok(layout) => layout,
            Err(e) => {
                debug!("Layout skipped - reason={}, members={}", e, working_set.len());
                Layout::empty(self.params.mode, working_set.len())
            }
        }
    }

    pub fn try_layout(
        &self,
        events: &EventCollection,
        working_set: &[usize],
        range: Option<(CanonicalDate, CanonicalDate)>,
    ) -> Result<Layout, TimelineError> {
        let dated: Vec<_> = working_set
            .iter()
            .filter_map(|&idx| {
                let event = events.get(idx)?;
                let date = event.date?;
                Some((idx, event, date.fractional_year()))
            })
            .collect();
        if dated.is_empty() {
            return Err(TimelineError::EmptyWorkingSet);
        }
        let skipped = working_set.len() - dated.len();

        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for (_, _, fy) in &dated {
            lo = lo.min(*fy);
            hi = hi.max(*fy);
        }
        if let Some((min, max)) = range {
            lo = lo.min(min.fractional_year());
            hi = hi.max(max.fractional_year());
        }

        let scale = ScaleRange::padded(lo, hi);
        let width = self.canvas_width(scale.total());
        let mode = self.params.mode;

        let mut stacks: HashMap<i64, StackCounter> = HashMap::new();
        let mut points = Vec::with_capacity(dated.len());
        for (idx, event, fy) in dated {
            let base_x = scale.fraction(fy) * width;
            let stack_index = stacks
                .entry((base_x / POSITION_QUANTUM).round() as i64)
                .or_default()
                .next(event.kind);
            let lane = match event.kind {
                EventKind::Regular => Lane::Above,
                EventKind::Death => Lane::Below,
            };

            let (x, y) = match mode {
                LayoutMode::Era { .. } => {
                    let offset = AXIS_GAP + f64::from(stack_index) * STACK_STEP;
                    let y = match lane {
                        Lane::Above => -offset,
                        Lane::Below => offset,
                    };
                    (base_x, y)
                }
                LayoutMode::Overview => {
                    let r = pseudo_random(event.identity.seed());
                    let cross = (r - 0.5) * SCATTER_SPREAD + event.primary_category().cluster_offset();
                    let jitter = f64::from(stack_index) * OVERVIEW_STACK_STEP + (r * 2.0 - 1.0);
                    ((base_x + jitter).clamp(0.0, width), cross)
                }
            };

            points.push(LayoutPoint {
                event_idx: idx,
                x,
                y,
                stack_index,
                lane,
            });
        }

        debug!(
            "Layout computed - mode={:?}, range={}..{}, width={:.0}px, points={}, skipped={}",
            mode,
            scale.min_year,
            scale.max_year,
            width,
            points.len(),
            skipped
        );

        Ok(Layout {
            mode,
            ticks: self.ticks(&scale, width),
            bands: bands(&scale, width),
            scale: Some(scale),
            width,
            points,
            skipped,
        })
    }

    fn canvas_width(&self, total: f64) -> f64 {
        let (floor, rate) = width_rule(self.params.mode, total);
        let base = (total * rate).max(floor);
        let viewport = if self.params.viewport_width.is_finite() {
            self.params.viewport_width
        } else {
            0.0
        };
        base.max(viewport) * self.params.zoom.factor()
    }

    fn ticks(&self, scale: &ScaleRange, width: f64) -> Vec<Tick> {
        let total = scale.total();
        let step = year_step(self.params.mode, total);
        let min = scale.min_year as i64;
        let max = scale.max_year as i64;
        let x_of = |year: i64| (year as f64 - scale.min_year) / total * width;

        let mut ticks: Vec<Tick> = aligned_years(min, max, step)
            .map(|year| Tick {
                year,
                x: x_of(year),
                label: format_year(year),
                major: true,
            })
            .collect();

        if total > 12.0 && step > 10 {
            let minor = (step / 5).max(1);
            ticks.extend(
                aligned_years(min, max, minor)
                    .filter(|y| y.rem_euclid(step) != 0)
                    .map(|year| Tick {
                        year,
                        x: x_of(year),
                        label: String::new(),
                        major: false,
                    }),
            );
            ticks.sort_by_key(|t| t.year);
        }
        ticks
    }
}

/// Multiples of `step` within `[min, max]`.
fn aligned_years(min: i64, max: i64, step: i64) -> impl Iterator<Item = i64> {
    let first = min + (step - min.rem_euclid(step)) % step;
    (first..=max).step_by(step as usize)
}

fn bands(scale: &ScaleRange, width: f64) -> Vec<Band> {
    let total = scale.total();
    let (step, show_months) = month_step(total);
    let first_year = scale.min_year as i64;
    let mut out = Vec::new();
    let mut month: u32 = 0;
    loop {
        let start = scale.min_year + f64::from(month) / 12.0;
        if start >= scale.max_year {
            break;
        }
        let end = (scale.min_year + f64::from(month + step) / 12.0).min(scale.max_year);
        let year = first_year + i64::from(month / 12);
        let label = if show_months {
            format!("{} {}", MONTH_NAMES[(month % 12) as usize], format_year(year))
        } else {
            format_year(year)
        };
        out.push(Band {
            start_x: scale.fraction(start) * width,
            end_x: scale.fraction(end) * width,
            label,
            shaded: out.len() % 2 == 1,
        });
        month += step;
    }
    out
}
