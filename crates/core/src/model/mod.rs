mod ids;
mod phrase;
mod progress;
mod vote;

pub use ids::{ClientId, ParseIdError, PhraseIndex};
pub use phrase::{Phrase, PhraseError};
pub use progress::Progress;
pub use vote::{Rating, RatingError, VoteError, VoteState};
