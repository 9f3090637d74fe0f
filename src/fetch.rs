use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::borrow::Cow;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

use crate::api_types::{parse_records, TaggedRecord};
use crate::config::SourceConfig;
use crate::error::{FetchError, IngestError};

/// The I/O collaborator: turns a source identifier into raw dataset text.
pub trait DatasetFetcher {
    fn fetch(&self, source: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetches datasets relative to a base URL.
pub struct HttpFetcher {
    client: Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(base: Url) -> Result<Self, FetchError> {
        Ok(Self {
            client: Client::builder().build()?,
            base,
        })
    }
}

impl DatasetFetcher for HttpFetcher {
    async fn fetch(&self, source: &str) -> Result<String, FetchError> {
        let url = self.base.join(source)?;
        debug!("Fetching dataset - url={}", url);

        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

/// Reads datasets from a local directory.
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DatasetFetcher for FsFetcher {
    async fn fetch(&self, source: &str) -> Result<String, FetchError> {
        let path = self.root.join(source);
        debug!("Reading dataset - path={}", path.display());
        Ok(tokio::fs::read_to_string(&path).await?)
    }
}

static NAN_AFTER_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\s*NaN\b").expect("valid NaN pattern"));

/// Upstream exports write bare `NaN` values; rewrite them to `null` before parsing.
pub fn clean_nan_tokens(text: &str) -> Cow<'_, str> {
    NAN_AFTER_COLON.replace_all(text, ": null")
}

/// Outcome of one ingestion run. `records` is in source-list order, then in-source order.
#[derive(Debug, Default)]
pub struct Ingestion {
    pub records: Vec<TaggedRecord>,
    pub loaded_sources: usize,
    pub failures: Vec<IngestError>,
}

/// Fetch every source concurrently and await them all. A failing source is
/// logged and skipped; it never aborts the others.
pub async fn ingest_sources<F>(fetcher: &F, sources: &[SourceConfig]) -> Ingestion
where
    F: DatasetFetcher + Sync,
{
    let start = std::time::Instant::now();
    debug!("Ingestion started - sources={}", sources.len());

    let tasks = sources.iter().map(|src| load_source(fetcher, src));
    let results = futures::future::join_all(tasks).await;

    let mut out = Ingestion::default();
    for (src, result) in sources.iter().zip(results) {
        match result {
            Ok(records) => {
                debug!(
                    "Source loaded - source={}, category={}, records={}",
                    src.source,
                    src.category,
                    records.len()
                );
                out.loaded_sources += 1;
                out.records.extend(records);
            }
            Err(e) => {
                warn!("Source skipped - {}", e);
                out.failures.push(e);
            }
        }
    }

    info!(
        "Ingestion completed - duration={:.2}s, loaded={}/{}, records={}",
        start.elapsed().as_secs_f32(),
        out.loaded_sources,
        sources.len(),
        out.records.len()
    );
    out
}

async fn load_source<F>(fetcher: &F, src: &SourceConfig) -> Result<Vec<TaggedRecord>, IngestError>
where
    F: DatasetFetcher + Sync,
{
    let text = fetcher
        .fetch(&src.source)
        .await
        .map_err(|source| IngestError::SourceFetch {
            source_id: src.source.clone(),
            source,
        })?;

    let cleaned = clean_nan_tokens(&text);
    let records = parse_records(&cleaned).map_err(|source| IngestError::SourceParse {
        source_id: src.source.clone(),
        source,
    })?;

    Ok(records
        .into_iter()
        .map(|record| TaggedRecord {
            record,
            category: src.category,
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api_types::Field;
    use crate::models::Category;
    use std::collections::HashMap;

    /// In-memory fetcher; sources missing from the map fail like a network error.
    pub(crate) struct MapFetcher(pub HashMap<String, String>);

    impl MapFetcher {
        pub(crate) fn new(entries: &[(&str, &str)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
        }
    }

    impl DatasetFetcher for MapFetcher {
        async fn fetch(&self, source: &str) -> Result<String, FetchError> {
            self.0.get(source).cloned().ok_or_else(|| {
                FetchError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    format!("unreachable: {source}"),
                ))
            })
        }
    }

    #[tokio::test]
    async fn unjoinable_source_is_a_url_error() {
        let fetcher = HttpFetcher::new(Url::parse("http://localhost/data/").unwrap()).unwrap();
        let err = fetcher.fetch("http://[bad").await.unwrap_err();
        assert!(matches!(err, FetchError::Url(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_url() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await.unwrap();
            sock.write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        let base = Url::parse(&format!("http://{addr}/data/")).unwrap();
        let err = HttpFetcher::new(base).unwrap().fetch("politics.json").await.unwrap_err();
        server.await.unwrap();
        match err {
            FetchError::Status { status, url } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/data/politics.json"), "got {url}");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn nan_cleaning_only_touches_values() {
        let cleaned = clean_nan_tokens(r#"{"a": NaN, "b":NaN, "title": "NaNa", "c": "x"}"#);
        assert_eq!(cleaned, r#"{"a": null, "b": null, "title": "NaNa", "c": "x"}"#);
        let v: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert!(v["a"].is_null());
    }

    #[tokio::test]
    async fn tags_records_and_keeps_source_order() {
        let fetcher = MapFetcher::new(&[
            ("p.json", r#"[{"title": "p1"}, {"title": "p2"}]"#),
            ("s.json", r#"[{"title": "s1", "era_english": NaN}]"#),
        ]);
        let sources = vec![
            SourceConfig::new("p.json", Category::Politics),
            SourceConfig::new("s.json", Category::Social),
        ];
        let out = ingest_sources(&fetcher, &sources).await;

        assert!(out.failures.is_empty());
        assert_eq!(out.loaded_sources, 2);
        let titles: Vec<_> = out
            .records
            .iter()
            .map(|r| (r.record.text(Field::Title).unwrap(), r.category))
            .collect();
        assert_eq!(
            titles,
            vec![
                ("p1".to_string(), Category::Politics),
                ("p2".to_string(), Category::Politics),
                ("s1".to_string(), Category::Social),
            ]
        );
        assert_eq!(out.records[2].record.text(Field::EraEnglish), None);
    }

    #[tokio::test]
    async fn failing_sources_are_isolated() {
        let fetcher = MapFetcher::new(&[
            ("p.json", r#"[{"title": "p1"}]"#),
            ("broken.json", r#"[{"title": "#),
            ("e.json", r#"[{"title": "e1"}]"#),
        ]);
        let sources = vec![
            SourceConfig::new("p.json", Category::Politics),
            SourceConfig::new("offline.json", Category::Health),
            SourceConfig::new("broken.json", Category::Social),
            SourceConfig::new("e.json", Category::Economy),
        ];
        let out = ingest_sources(&fetcher, &sources).await;

        assert_eq!(out.loaded_sources, 2);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.failures.len(), 2);
        assert!(matches!(out.failures[0], IngestError::SourceFetch { .. }));
        assert_eq!(out.failures[0].source_id(), "offline.json");
        assert!(matches!(out.failures[1], IngestError::SourceParse { .. }));
    }

    #[tokio::test]
    async fn fs_fetcher_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Death_data.json"), r#"[{"title": "d"}]"#).unwrap();
        let fetcher = FsFetcher::new(dir.path());

        let text = fetcher.fetch("Death_data.json").await.unwrap();
        assert!(text.contains("\"d\""));
        assert!(matches!(fetcher.fetch("missing.json").await, Err(FetchError::Io(_))));
    }
}
