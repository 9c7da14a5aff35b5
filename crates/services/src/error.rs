//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use vote_core::model::{PhraseIndex, VoteError};

/// Failures of a single HTTP exchange with a dataset endpoint or the collector.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
}

/// Errors emitted by `DatasetLoader`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("no dataset endpoint returned usable data ({attempts} tried)")]
    SourceUnavailable { attempts: usize },
    #[error("dataset contains no phrases")]
    EmptyDataset,
}

/// Errors emitted by `VoteSubmitter`. Never fatal; local state is already committed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error("collector URL is not configured")]
    Unconfigured,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("could not encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors emitted by `VotingService` and `VotingSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VotingError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("phrase {0} is not in the loaded dataset")]
    UnknownPhrase(PhraseIndex),
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error("phrase text cannot be blank")]
    BlankPhrase,
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error("could not submit phrase: {0}")]
    Append(#[source] SubmitError),
    #[error("could not clear collector entry: {0}")]
    Clear(#[source] SubmitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while building configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("at least one dataset URL is required")]
    NoDatasetSource,
    #[error("invalid URL: {raw}")]
    InvalidUrl { raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
