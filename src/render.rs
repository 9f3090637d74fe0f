// src/render.rs
use crate::dates::format_year;
use crate::hierarchy::HierarchyBucket;
use crate::orchestrator::{Scope, Timeline};

fn date_span(b: &HierarchyBucket) -> String {
    match b.date_range() {
        Some((min, max)) if min == max => min.display_year(),
        Some((min, max)) => format!("{} – {}", min.display_year(), max.display_year()),
        None => "undated".to_string(),
    }
}

pub fn render_era_summary(t: &Timeline) -> String {
    let mut md = String::new();
    md.push_str("# Timeline\n\n");

    let stats = t.stats();
    md.push_str(&format!(
        "{} events across {} eras ({} deaths, {} undated)\n",
        stats.total_events, stats.era_count, stats.death_count, stats.undated_count
    ));
    if let Some((lo, hi)) = stats.year_span {
        md.push_str(&format!(
            "Spanning {} to {}\n",
            format_year(i64::from(lo)),
            format_year(i64::from(hi))
        ));
    }
    md.push('\n');

    md.push_str("## Eras\n");
    for b in t.hierarchy().buckets() {
        let marker = match t.scope() {
            Scope::Era(key) if *key == b.key => " (current)",
            _ => "",
        };
        let name = match &b.persian_name {
            Some(p) => format!("{} / {}", b.key, p),
            None => b.key.clone(),
        };
        md.push_str(&format!("- **{}**{}: {} events, {}", name, marker, b.count, date_span(b)));
        if !b.undated.is_empty() {
            md.push_str(&format!(" ({} undated)", b.undated.len()));
        }
        md.push('\n');
    }

    let present: Vec<_> = stats.categories.iter().filter(|c| c.count > 0).collect();
    if !present.is_empty() {
        md.push_str("\n## Categories\n");
        for c in present {
            md.push_str(&format!("- {}: {}\n", c.label, c.count));
        }
    }

    if !t.failed_sources().is_empty() {
        md.push_str("\n## Missing sources\n");
        for s in t.failed_sources() {
            md.push_str(&format!("- {}\n", s));
        }
    }

    md
}
