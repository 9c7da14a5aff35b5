use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;
use vote_core::model::{ClientId, PhraseIndex, Rating, VoteState};

use crate::error::{SubmitError, TransportError};
use crate::payload::{CollectorPayload, FORM_FIELD};

const BODY_PREVIEW_CHARS: usize = 200;

/// Whatever the collector answered. Logged only; never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorResponse {
    pub status: u16,
    pub body: String,
}

/// Write side of the collector transport: one form POST per call.
#[async_trait]
pub trait CollectorTransport: Send + Sync {
    /// Post `payload` as the single url-encoded form field `field`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` only when no response was received.
    async fn post_form(
        &self,
        field: &str,
        payload: String,
    ) -> Result<CollectorResponse, TransportError>;
}

#[derive(Clone)]
pub struct HttpCollector {
    client: Client,
    url: Url,
}

impl HttpCollector {
    #[must_use]
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl CollectorTransport for HttpCollector {
    async fn post_form(
        &self,
        field: &str,
        payload: String,
    ) -> Result<CollectorResponse, TransportError> {
        let response = self
            .client
            .post(self.url.clone())
            .form(&[(field, payload)])
            .send()
            .await?;
        let status = response.status().as_u16();
        // A body that fails to stream still counts as a response.
        let body = response.text().await.unwrap_or_default();
        Ok(CollectorResponse { status, body })
    }
}

/// How a submission resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The collector answered before the timeout, with any status.
    Delivered { status: u16 },
    /// The timeout fired first; success is assumed.
    AssumedDelivered,
}

/// Result of racing a task against a timer.
#[derive(Debug)]
pub(crate) enum Race<T> {
    Completed(T),
    TimedOut,
    /// The task ended without producing a value (it panicked).
    Abandoned,
}

/// Run `work` on a detached task and wait for it at most `limit`.
///
/// The oneshot channel is the resolution latch: only the first of the timer
/// and the task can resolve the race. A task finishing after the timer keeps
/// running to completion but its result is dropped.
pub(crate) async fn first_of<T, F>(limit: Duration, work: F) -> Race<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let (latch, resolved) = oneshot::channel();
    tokio::spawn(async move {
        let value = work.await;
        if latch.send(value).is_err() {
            debug!("late completion suppressed after timeout");
        }
    });

    match tokio::time::timeout(limit, resolved).await {
        Ok(Ok(value)) => Race::Completed(value),
        Ok(Err(_)) => Race::Abandoned,
        Err(_) => Race::TimedOut,
    }
}

/// Best-effort, one-shot delivery of payloads to the collector.
#[derive(Clone)]
pub struct VoteSubmitter {
    transport: Option<Arc<dyn CollectorTransport>>,
    timeout: Duration,
}

impl VoteSubmitter {
    #[must_use]
    pub fn new(transport: Option<Arc<dyn CollectorTransport>>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Submit a vote together with the full vote vector.
    ///
    /// # Errors
    ///
    /// See [`VoteSubmitter::submit`].
    pub async fn submit_vote(
        &self,
        client_id: &ClientId,
        index: PhraseIndex,
        rating: Rating,
        votes: &VoteState,
    ) -> Result<SubmissionOutcome, SubmitError> {
        self.submit(&CollectorPayload::vote(client_id, index, rating, votes))
            .await
    }

    /// Post a payload once, without retry, bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::Unconfigured` when no collector is set and
    /// `SubmitError::Transport` when the request failed before the timeout.
    pub async fn submit(
        &self,
        payload: &CollectorPayload,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let transport = self.transport.clone().ok_or(SubmitError::Unconfigured)?;
        let encoded = serde_json::to_string(payload)?;
        let action = payload.action();
        debug!(action, payload = %encoded, "submitting to collector");

        let attempt = async move { transport.post_form(FORM_FIELD, encoded).await };
        match first_of(self.timeout, attempt).await {
            Race::Completed(Ok(response)) => {
                let preview: String = response.body.chars().take(BODY_PREVIEW_CHARS).collect();
                info!(action, status = response.status, body = %preview, "collector responded");
                Ok(SubmissionOutcome::Delivered {
                    status: response.status,
                })
            }
            Race::Completed(Err(err)) => {
                warn!(action, error = %err, "collector request failed");
                Err(err.into())
            }
            Race::TimedOut => {
                info!(
                    action,
                    timeout_ms = self.timeout.as_millis(),
                    "collector timed out, assuming success"
                );
                Ok(SubmissionOutcome::AssumedDelivered)
            }
            Race::Abandoned => {
                warn!(action, "collector task ended without a result");
                Err(TransportError::Unreachable("collector task aborted".into()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    enum Behavior {
        Respond(u16),
        Fail,
        Hang,
        Slow(Duration),
    }

    struct FakeCollector {
        behavior: Behavior,
        posted: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeCollector {
        fn new(behavior: Behavior) -> (Arc<Self>, Arc<Mutex<Vec<(String, String)>>>) {
            let posted = Arc::new(Mutex::new(Vec::new()));
            (
                Arc::new(Self {
                    behavior,
                    posted: Arc::clone(&posted),
                }),
                posted,
            )
        }
    }

    #[async_trait]
    impl CollectorTransport for FakeCollector {
        async fn post_form(
            &self,
            field: &str,
            payload: String,
        ) -> Result<CollectorResponse, TransportError> {
            if let Behavior::Slow(delay) = self.behavior {
                tokio::time::sleep(delay).await;
            }
            self.posted
                .lock()
                .unwrap()
                .push((field.to_owned(), payload));
            match self.behavior {
                Behavior::Respond(status) => Ok(CollectorResponse {
                    status,
                    body: "ok".into(),
                }),
                Behavior::Fail => Err(TransportError::Unreachable("refused".into())),
                Behavior::Hang => std::future::pending().await,
                Behavior::Slow(_) => Ok(CollectorResponse {
                    status: 200,
                    body: String::new(),
                }),
            }
        }
    }

    fn submitter(transport: Arc<FakeCollector>) -> VoteSubmitter {
        let transport: Arc<dyn CollectorTransport> = transport;
        VoteSubmitter::new(Some(transport), Duration::from_millis(3000))
    }

    fn client() -> ClientId {
        "user_1_abcdefghi".parse().unwrap()
    }

    #[tokio::test]
    async fn posts_full_vector_in_form_field() {
        let (fake, posted) = FakeCollector::new(Behavior::Respond(200));
        let votes = VoteState::from_slots(vec![
            Some(Rating::new(3).unwrap()),
            Some(Rating::new(5).unwrap()),
        ]);

        let outcome = submitter(fake)
            .submit_vote(&client(), PhraseIndex::new(1), Rating::new(5).unwrap(), &votes)
            .await
            .unwrap();

        assert_eq!(outcome, SubmissionOutcome::Delivered { status: 200 });
        let posted = posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, "postData");
        let body: serde_json::Value = serde_json::from_str(&posted[0].1).unwrap();
        assert_eq!(body["votes"], "3,5");
        assert_eq!(body["phraseIndex"], 1);
    }

    #[tokio::test]
    async fn non_success_status_is_not_a_failure() {
        let (fake, _) = FakeCollector::new(Behavior::Respond(500));
        let outcome = submitter(fake)
            .submit(&CollectorPayload::append("x"))
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Delivered { status: 500 });
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_error() {
        let (fake, posted) = FakeCollector::new(Behavior::Fail);
        let err = submitter(fake)
            .submit(&CollectorPayload::clear_user(&client()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Transport(TransportError::Unreachable(_))
        ));
        assert_eq!(posted.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_request_resolves_as_success_after_timeout() {
        let (fake, _) = FakeCollector::new(Behavior::Hang);
        let started = tokio::time::Instant::now();

        let outcome = submitter(fake)
            .submit(&CollectorPayload::append("x"))
            .await
            .unwrap();

        assert_eq!(outcome, SubmissionOutcome::AssumedDelivered);
        assert!(started.elapsed() >= Duration::from_millis(3000));
        assert!(started.elapsed() < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_is_suppressed() {
        let (fake, posted) = FakeCollector::new(Behavior::Slow(Duration::from_secs(10)));

        let outcome = submitter(fake)
            .submit(&CollectorPayload::append("x"))
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::AssumedDelivered);
        assert!(posted.lock().unwrap().is_empty());

        // The detached request still runs to completion.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_collector_is_unconfigured() {
        let submitter = VoteSubmitter::new(None, Duration::from_millis(3000));
        assert!(!submitter.is_configured());
        let err = submitter
            .submit(&CollectorPayload::append("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Unconfigured));
    }

    #[tokio::test]
    async fn first_of_reports_abandoned_task() {
        let race: Race<()> = first_of(Duration::from_secs(1), async { panic!("boom") }).await;
        assert!(matches!(race, Race::Abandoned));
    }
}
