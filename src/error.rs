use thiserror::Error;

/// Failure of the fetch collaborator for one source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid dataset URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Non-success status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-source ingestion failure. Recovered locally: the source contributes no events.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to fetch source {source_id}: {source}")]
    SourceFetch {
        source_id: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to parse source {source_id}: {source}")]
    SourceParse {
        source_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl IngestError {
    pub fn source_id(&self) -> &str {
        match self {
            Self::SourceFetch { source_id, .. } | Self::SourceParse { source_id, .. } => source_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("No parseable year in date {raw:?}")]
    Malformed { raw: Option<String> },
}

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("No events could be loaded")]
    NoEventsLoaded,

    /// Engine-internal: a layout or hierarchy pass received zero events.
    #[error("Working set is empty")]
    EmptyWorkingSet,

    #[error("Unknown era: {0}")]
    UnknownEra(String),

    #[error("Config error: {0}")]
    Config(String),
}
