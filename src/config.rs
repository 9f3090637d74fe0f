use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::models::Category;

pub const DEFAULT_DATA_DIR: &str = "assets/data";
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1200.0;

/// One category dataset: where to fetch it and which tag its records get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: String,
    pub category: Category,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl SourceConfig {
    pub fn new(source: impl Into<String>, category: Category) -> Self {
        Self {
            source: source.into(),
            category,
            display_name: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.category.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub sources: Vec<SourceConfig>,
    pub viewport_width: f64,
    /// Working sets above this size are released in small chunks.
    pub large_set_threshold: usize,
    pub small_chunk_size: usize,
    pub chunk_size: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        let files = [
            ("Politics_data.json", Category::Politics),
            ("Economy_data.json", Category::Economy),
            ("Social_data.json", Category::Social),
            ("Technology_Science_data.json", Category::TechnologyScience),
            ("Health_data.json", Category::Health),
            ("Crime_Safety_data.json", Category::CrimeSafety),
            ("Sports_Entertainment_data.json", Category::SportsEntertainment),
            ("Death_data.json", Category::Death),
            ("Natural Disaster_data.json", Category::NaturalDisaster),
        ];
        Self {
            sources: files
                .into_iter()
                .map(|(file, category)| SourceConfig::new(file, category))
                .collect(),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            large_set_threshold: 1000,
            small_chunk_size: 50,
            chunk_size: 200,
        }
    }
}

impl TimelineConfig {
    pub fn chunk_size_for(&self, working_set_len: usize) -> usize {
        let size = if working_set_len > self.large_set_threshold {
            self.small_chunk_size
        } else {
            self.chunk_size
        };
        size.max(1)
    }
}

pub fn load_config(path: &Path) -> Result<TimelineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Reading config {}", path.display()))?;
    let cfg: TimelineConfig = serde_json::from_str(&text)
        .with_context(|| format!("Decoding config {}", path.display()))?;
    if cfg.sources.is_empty() {
        anyhow::bail!("Config {} lists no sources", path.display());
    }
    Ok(cfg)
}

/// Where datasets are fetched from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataOrigin {
    Dir(PathBuf),
    Http(Url),
}

impl DataOrigin {
    /// CLI values first (`base_url`, then `data_dir`), then `TIMELINE_BASE_URL` /
    /// `TIMELINE_DATA_DIR`, then the default directory.
    pub fn resolve(base_url: Option<&str>, data_dir: Option<&str>) -> Result<Self> {
        if let Some(raw) = base_url {
            return Self::http(raw);
        }
        if let Some(dir) = data_dir {
            return Ok(DataOrigin::Dir(PathBuf::from(dir)));
        }
        if let Ok(raw) = std::env::var("TIMELINE_BASE_URL") {
            return Self::http(&raw);
        }
        let dir = std::env::var("TIMELINE_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        Ok(DataOrigin::Dir(PathBuf::from(dir)))
    }

    fn http(raw: &str) -> Result<Self> {
        // joining relative file names needs a trailing slash
        let raw = if raw.ends_with('/') { raw.to_string() } else { format!("{raw}/") };
        let url = Url::parse(&raw).with_context(|| format!("Invalid base URL {raw}"))?;
        Ok(DataOrigin::Http(url))
    }
}
