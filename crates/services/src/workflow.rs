use std::sync::Arc;

use rand::Rng;
use reqwest::Client;
use storage::repository::Storage;
use storage::session_store::SessionStore;
use tracing::{info, warn};
use vote_core::Clock;
use vote_core::model::{ClientId, Phrase, PhraseIndex, Progress, Rating};

use crate::config::VotingConfig;
use crate::error::{AppServicesError, SubmitError, VotingError};
use crate::loader::{DatasetLoader, HttpDatasetSource};
use crate::payload::CollectorPayload;
use crate::session::{SessionEvent, VotingSession};
use crate::submitter::{CollectorTransport, HttpCollector, SubmissionOutcome, VoteSubmitter};

/// What the caller needs after a vote: the already chosen next phrase, the
/// updated progress, and how the network write went.
#[derive(Debug)]
pub struct VoteReceipt {
    pub next: Option<Phrase>,
    pub progress: Progress,
    pub submission: Result<SubmissionOutcome, SubmitError>,
}

/// Orchestrates loading, local persistence and best-effort submission.
#[derive(Clone)]
pub struct VotingService {
    clock: Clock,
    loader: DatasetLoader,
    store: SessionStore,
    submitter: VoteSubmitter,
}

impl VotingService {
    #[must_use]
    pub fn new(
        clock: Clock,
        loader: DatasetLoader,
        store: SessionStore,
        submitter: VoteSubmitter,
    ) -> Self {
        Self {
            clock,
            loader,
            store,
            submitter,
        }
    }

    /// Wire HTTP transports and the given storage from a config.
    #[must_use]
    pub fn from_config(config: &VotingConfig, storage: &Storage, clock: Clock) -> Self {
        let client = Client::new();
        let loader = DatasetLoader::new(
            Arc::new(HttpDatasetSource::new(client.clone())),
            config.dataset_urls().to_vec(),
        );
        let transport = config.collector_url().map(|url| {
            let collector: Arc<dyn CollectorTransport> =
                Arc::new(HttpCollector::new(client.clone(), url.clone()));
            collector
        });
        let submitter = VoteSubmitter::new(transport, config.submit_timeout());
        let store = SessionStore::new(Arc::clone(&storage.kv));

        Self::new(clock, loader, store, submitter)
    }

    /// Wire HTTP transports over `SQLite`-backed local storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        config: &VotingConfig,
        db_url: &str,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_config(config, &storage, clock))
    }

    /// Restore the local session and merge it with a freshly loaded dataset.
    ///
    /// The client identifier is created and persisted on first use.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::Load` if the dataset cannot be loaded and
    /// `VotingError::Storage` if local state cannot be read or written.
    pub async fn start<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<VotingSession, VotingError> {
        let client_id = match self.store.load_client_id().await? {
            Some(id) => id,
            None => {
                let id = ClientId::generate(self.clock.now(), rng);
                self.store.save_client_id(&id).await?;
                info!(client_id = %id, "generated client id");
                id
            }
        };
        let votes = self.store.load_votes().await?;
        info!(client_id = %client_id, stored_votes = votes.len(), "session restored");

        let mut session = VotingSession::new(client_id, votes);
        self.reload(&mut session).await?;
        Ok(session)
    }

    /// Replace the session's phrases with a fresh load and persist the reconciled votes.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::Load` or `VotingError::Storage`; the session is
    /// untouched when loading fails.
    pub async fn reload(&self, session: &mut VotingSession) -> Result<(), VotingError> {
        let phrases = self.loader.load().await?;
        session.apply(SessionEvent::Loaded(phrases))?;
        self.store.save_votes(session.votes()).await?;
        Ok(())
    }

    /// Record a vote locally, then send the whole vote vector to the collector.
    ///
    /// The local write happens first and is never rolled back. The next phrase
    /// is chosen before the network write is awaited.
    ///
    /// # Errors
    ///
    /// Returns `VotingError` if the vote is rejected or cannot be persisted
    /// locally. Network problems are reported in `VoteReceipt::submission`.
    pub async fn cast_vote<R: Rng + ?Sized>(
        &self,
        session: &mut VotingSession,
        index: PhraseIndex,
        rating: Rating,
        rng: &mut R,
    ) -> Result<VoteReceipt, VotingError> {
        session.apply(SessionEvent::Voted { index, rating })?;
        self.store.save_votes(session.votes()).await?;

        let next = session.select_next(rng).cloned();
        let progress = session.progress();

        let submission = self
            .submitter
            .submit_vote(session.client_id(), index, rating, session.votes())
            .await;
        if let Err(err) = &submission {
            warn!(%index, error = %err, "vote kept locally but submission failed");
        }

        Ok(VoteReceipt {
            next,
            progress,
            submission,
        })
    }

    /// Ask the collector to append a new phrase to the dataset.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::BlankPhrase` for blank text and
    /// `VotingError::Append` if the request failed.
    pub async fn append_phrase(&self, text: &str) -> Result<SubmissionOutcome, VotingError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VotingError::BlankPhrase);
        }
        let outcome = self
            .submitter
            .submit(&CollectorPayload::append(text))
            .await
            .map_err(VotingError::Append)?;
        info!(?outcome, "phrase submitted");
        Ok(outcome)
    }

    /// The persisted client identifier, without touching the network.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::Storage` if local state cannot be read.
    pub async fn stored_client_id(&self) -> Result<Option<ClientId>, VotingError> {
        Ok(self.store.load_client_id().await?)
    }

    /// Ask the collector to drop this client's entry, then forget local state.
    ///
    /// Local state is only cleared once the request resolved successfully.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::Clear` if the request failed and
    /// `VotingError::Storage` if local state cannot be cleared.
    pub async fn clear_user(&self, client_id: &ClientId) -> Result<SubmissionOutcome, VotingError> {
        let outcome = self
            .submitter
            .submit(&CollectorPayload::clear_user(client_id))
            .await
            .map_err(VotingError::Clear)?;
        self.store.clear().await?;
        info!(client_id = %client_id, "local session cleared");
        Ok(outcome)
    }
}
