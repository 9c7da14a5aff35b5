use serde::Serialize;
use vote_core::model::{ClientId, PhraseIndex, Rating, VoteState};

/// Form field carrying the JSON-encoded payload.
pub const FORM_FIELD: &str = "postData";

/// Payloads understood by the remote collector, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action")]
pub enum CollectorPayload {
    #[serde(rename = "vote", rename_all = "camelCase")]
    Vote {
        user_id: ClientId,
        phrase_index: PhraseIndex,
        rating: Rating,
        /// Whole vote vector, comma-joined, unset as `"0"`.
        votes: String,
    },
    #[serde(rename = "append")]
    Append { data: Vec<String> },
    #[serde(rename = "clearUser", rename_all = "camelCase")]
    ClearUser { user_id: ClientId },
}

impl CollectorPayload {
    /// Vote payload carrying the full current vector, not just the new vote.
    #[must_use]
    pub fn vote(
        user_id: &ClientId,
        phrase_index: PhraseIndex,
        rating: Rating,
        votes: &VoteState,
    ) -> Self {
        Self::Vote {
            user_id: user_id.clone(),
            phrase_index,
            rating,
            votes: votes.to_wire(),
        }
    }

    #[must_use]
    pub fn append(text: impl Into<String>) -> Self {
        Self::Append {
            data: vec![text.into()],
        }
    }

    #[must_use]
    pub fn clear_user(user_id: &ClientId) -> Self {
        Self::ClearUser {
            user_id: user_id.clone(),
        }
    }

    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Vote { .. } => "vote",
            Self::Append { .. } => "append",
            Self::ClearUser { .. } => "clearUser",
        }
    }
}
