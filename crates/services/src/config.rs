use std::time::Duration;

use url::Url;

use crate::error::{ConfigError, LoadError, VotingError};

/// Submission timeout after which a vote is assumed delivered.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_millis(3000);

const SHEETS_EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d";

/// User-facing texts shown for each degraded state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Messages {
    pub source_unavailable: String,
    pub empty_dataset: String,
    pub submission_warning: String,
    pub append_failed: String,
    pub clear_failed: String,
    pub completed: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            source_unavailable: "Could not reach the spreadsheet. Make sure it is published \
                                 so that anyone with the link can view it."
                .into(),
            empty_dataset: "The spreadsheet has no phrases.".into(),
            submission_warning: "Warning: your vote may not have been saved. \
                                 Check your connection."
                .into(),
            append_failed: "Could not add the phrase. Try again.".into(),
            clear_failed: "Could not clear your entry. Try again.".into(),
            completed: "You have rated every phrase. Thank you!".into(),
        }
    }
}

impl Messages {
    /// Configured text for a failure, if it has one.
    #[must_use]
    pub fn for_error(&self, err: &VotingError) -> Option<&str> {
        match err {
            VotingError::Load(LoadError::EmptyDataset) => Some(&self.empty_dataset),
            VotingError::Load(_) => Some(&self.source_unavailable),
            VotingError::Submit(_) => Some(&self.submission_warning),
            VotingError::Append(_) => Some(&self.append_failed),
            VotingError::Clear(_) => Some(&self.clear_failed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct VotingConfig {
    dataset_urls: Vec<Url>,
    collector_url: Option<Url>,
    submit_timeout: Duration,
    messages: Messages,
}

impl VotingConfig {
    /// Build a config reading from the given endpoints, tried in order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoDatasetSource` if `dataset_urls` is empty.
    pub fn new(dataset_urls: Vec<Url>) -> Result<Self, ConfigError> {
        if dataset_urls.is_empty() {
            return Err(ConfigError::NoDatasetSource);
        }
        Ok(Self {
            dataset_urls,
            collector_url: None,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            messages: Messages::default(),
        })
    }

    /// Endpoints for a published spreadsheet: one CSV export per sheet gid,
    /// then the gid-less export as a last resort.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the id produces an unparsable URL.
    pub fn for_spreadsheet(spreadsheet_id: &str, gids: &[String]) -> Result<Self, ConfigError> {
        let id = spreadsheet_id.trim();
        let base = format!("{SHEETS_EXPORT_BASE}/{id}/export?format=csv");

        let urls = gids
            .iter()
            .map(|gid| format!("{base}&gid={}", gid.trim()))
            .chain(std::iter::once(base.clone()))
            .map(|raw| parse_url(&raw))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(urls)
    }

    #[must_use]
    pub fn with_collector_url(mut self, url: Option<Url>) -> Self {
        self.collector_url = url;
        self
    }

    #[must_use]
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    #[must_use]
    pub fn dataset_urls(&self) -> &[Url] {
        &self.dataset_urls
    }

    #[must_use]
    pub fn collector_url(&self) -> Option<&Url> {
        self.collector_url.as_ref()
    }

    #[must_use]
    pub fn submit_timeout(&self) -> Duration {
        self.submit_timeout
    }

    #[must_use]
    pub fn messages(&self) -> &Messages {
        &self.messages
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|_| ConfigError::InvalidUrl {
        raw: raw.to_owned(),
    })
}
