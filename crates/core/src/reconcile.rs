use crate::model::VoteState;

/// Fit a previously persisted vote vector to a freshly loaded dataset.
///
/// Trailing votes are dropped when the dataset shrank; new phrases start
/// unset when it grew. The result always has exactly `phrase_count` slots.
/// Votes stay bound by position, so reordered rows inherit whatever vote
/// sat at their new position.
#[must_use]
pub fn reconcile(phrase_count: usize, prior: VoteState) -> VoteState {
    let mut slots = prior.into_slots();
    slots.resize(phrase_count, None);
    VoteState::from_slots(slots)
}
