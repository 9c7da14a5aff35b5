use rand::Rng;
use vote_core::model::{ClientId, Phrase, PhraseIndex, Progress, Rating, VoteState};
use vote_core::{reconcile, select_next};

use crate::error::VotingError;

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Every mutation of a `VotingSession` goes through one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A fresh dataset replaced the previous phrases.
    Loaded(Vec<Phrase>),
    /// A phrase is now on screen.
    Presented(PhraseIndex),
    /// The user rated a phrase.
    Voted { index: PhraseIndex, rating: Rating },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory voting state for one client.
///
/// Created at startup, replaced wholesale on reload, and mutated only through
/// [`VotingSession::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingSession {
    client_id: ClientId,
    phrases: Vec<Phrase>,
    votes: VoteState,
    current: Option<PhraseIndex>,
}

impl VotingSession {
    /// Session with persisted votes and no dataset yet.
    #[must_use]
    pub fn new(client_id: ClientId, votes: VoteState) -> Self {
        Self {
            client_id,
            phrases: Vec::new(),
            votes,
            current: None,
        }
    }

    /// Apply a single event.
    ///
    /// # Errors
    ///
    /// Returns `VotingError::UnknownPhrase` for an index outside the loaded
    /// phrases and `VotingError::Vote` if the phrase was already voted.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), VotingError> {
        match event {
            SessionEvent::Loaded(phrases) => {
                let votes = std::mem::take(&mut self.votes);
                self.votes = reconcile(phrases.len(), votes);
                self.phrases = phrases;
                self.current = None;
            }
            SessionEvent::Presented(index) => {
                self.ensure_known(index)?;
                self.current = Some(index);
            }
            SessionEvent::Voted { index, rating } => {
                self.ensure_known(index)?;
                self.votes.record(index, rating)?;
                if self.current == Some(index) {
                    self.current = None;
                }
            }
        }
        Ok(())
    }

    /// Pick a phrase and mark it as presented.
    pub fn present_next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Phrase> {
        let next = self.select_next(rng).cloned()?;
        self.apply(SessionEvent::Presented(next.index())).ok()?;
        Some(next)
    }

    /// Pick the next phrase without changing the session.
    pub fn select_next<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Phrase> {
        select_next(&self.phrases, &self.votes, rng)
    }

    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    #[must_use]
    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    #[must_use]
    pub fn phrase(&self, index: PhraseIndex) -> Option<&Phrase> {
        self.phrases.get(index.value())
    }

    #[must_use]
    pub fn votes(&self) -> &VoteState {
        &self.votes
    }

    #[must_use]
    pub fn current(&self) -> Option<&Phrase> {
        self.current.and_then(|index| self.phrase(index))
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress::compute(&self.phrases, &self.votes)
    }

    fn ensure_known(&self, index: PhraseIndex) -> Result<(), VotingError> {
        if index.value() < self.phrases.len() {
            Ok(())
        } else {
            Err(VotingError::UnknownPhrase(index))
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
