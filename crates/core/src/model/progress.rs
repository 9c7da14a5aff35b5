use crate::model::{Phrase, VoteState};

/// Voting progress over visible phrases only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub voted: usize,
    pub total: usize,
}

impl Progress {
    #[must_use]
    pub fn compute(phrases: &[Phrase], votes: &VoteState) -> Self {
        let (voted, total) = phrases
            .iter()
            .filter(|phrase| phrase.is_visible())
            .fold((0, 0), |(voted, total), phrase| {
                let voted = if votes.is_set(phrase.index()) {
                    voted + 1
                } else {
                    voted
                };
                (voted, total + 1)
            });
        Self { voted, total }
    }

    /// Percentage in `[0, 100]`; zero when nothing is visible.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.voted as f64 / self.total as f64) * 100.0
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.voted >= self.total
    }
}
