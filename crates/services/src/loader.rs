use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;
use vote_core::dataset::Dataset;
use vote_core::model::Phrase;

use crate::error::{LoadError, TransportError};

/// Read side of the dataset transport: one GET per call.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetch the body at `url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` on network failure or a non-success status.
    async fn fetch(&self, url: &Url) -> Result<String, TransportError>;
}

#[derive(Clone, Default)]
pub struct HttpDatasetSource {
    client: Client,
}

impl HttpDatasetSource {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DatasetSource for HttpDatasetSource {
    async fn fetch(&self, url: &Url) -> Result<String, TransportError> {
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status()));
        }
        Ok(response.text().await?)
    }
}

/// Loads the phrase dataset from a prioritized list of endpoints.
#[derive(Clone)]
pub struct DatasetLoader {
    source: Arc<dyn DatasetSource>,
    endpoints: Vec<Url>,
}

impl DatasetLoader {
    #[must_use]
    pub fn new(source: Arc<dyn DatasetSource>, endpoints: Vec<Url>) -> Self {
        Self { source, endpoints }
    }

    /// Return the first non-blank body, trying endpoints in order.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::SourceUnavailable` once every endpoint failed or was empty.
    pub async fn fetch_body(&self) -> Result<String, LoadError> {
        for (attempt, url) in self.endpoints.iter().enumerate() {
            debug!(attempt = attempt + 1, %url, "fetching dataset");
            match self.source.fetch(url).await {
                Ok(body) if body.trim().is_empty() => {
                    warn!(attempt = attempt + 1, %url, "dataset endpoint returned an empty body");
                }
                Ok(body) => {
                    info!(%url, bytes = body.len(), "dataset received");
                    return Ok(body);
                }
                Err(err) => {
                    warn!(attempt = attempt + 1, %url, error = %err, "dataset endpoint failed");
                }
            }
        }

        Err(LoadError::SourceUnavailable {
            attempts: self.endpoints.len(),
        })
    }

    /// Fetch and parse the dataset into phrases.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::SourceUnavailable` when no endpoint yields data and
    /// `LoadError::EmptyDataset` when the data holds no phrases.
    pub async fn load(&self) -> Result<Vec<Phrase>, LoadError> {
        let body = self.fetch_body().await?;
        let dataset = Dataset::from_csv(&body).map_err(|err| {
            warn!(error = %err, "dataset parsed to nothing");
            LoadError::EmptyDataset
        })?;

        if dataset.degraded_fields() > 0 {
            warn!(
                fields = dataset.degraded_fields(),
                "non-numeric aggregate cells defaulted to zero"
            );
        }
        info!(phrases = dataset.phrases().len(), "dataset loaded");
        Ok(dataset.into_phrases())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned responses per URL and records the order of requests.
    struct ScriptedSource {
        responses: HashMap<String, Result<String, reqwest::StatusCode>>,
        requested: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<(&str, Result<&str, reqwest::StatusCode>)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(url, res)| (url.to_owned(), res.map(str::to_owned)))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DatasetSource for ScriptedSource {
        async fn fetch(&self, url: &Url) -> Result<String, TransportError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.responses.get(url.as_str()) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(TransportError::HttpStatus(*status)),
                None => Err(TransportError::Unreachable(url.to_string())),
            }
        }
    }

    fn urls() -> Vec<Url> {
        ["https://a.test/", "https://b.test/", "https://c.test/"]
            .iter()
            .map(|raw| Url::parse(raw).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn falls_through_failures_and_blank_bodies() {
        let source = Arc::new(ScriptedSource::new(vec![
            ("https://a.test/", Err(reqwest::StatusCode::NOT_FOUND)),
            ("https://b.test/", Ok("  \n")),
            ("https://c.test/", Ok("Phrases\nhello\n")),
        ]));
        let loader = DatasetLoader::new(source.clone(), urls());

        let phrases = loader.load().await.unwrap();
        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].text(), "hello");
        assert_eq!(source.requested().len(), 3);
    }

    #[tokio::test]
    async fn stops_at_first_usable_body() {
        let source = Arc::new(ScriptedSource::new(vec![
            ("https://a.test/", Ok("first\n")),
            ("https://b.test/", Ok("second\n")),
        ]));
        let loader = DatasetLoader::new(source.clone(), urls());

        let phrases = loader.load().await.unwrap();
        assert_eq!(phrases[0].text(), "first");
        assert_eq!(source.requested(), vec!["https://a.test/".to_owned()]);
    }

    #[tokio::test]
    async fn all_empty_is_source_unavailable() {
        let source = Arc::new(ScriptedSource::new(vec![
            ("https://a.test/", Ok("")),
            ("https://b.test/", Ok("")),
            ("https://c.test/", Ok("")),
        ]));
        let loader = DatasetLoader::new(source, urls());

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable { attempts: 3 }));
    }

    #[tokio::test]
    async fn header_only_is_empty_dataset() {
        let source = Arc::new(ScriptedSource::new(vec![(
            "https://a.test/",
            Ok("Phrases,Rating,Hide\n,,\n"),
        )]));
        let loader = DatasetLoader::new(source, urls());

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, LoadError::EmptyDataset));
    }
}
