use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::PhraseIndex;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RatingError {
    #[error("invalid rating value: {0}")]
    OutOfRange(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VoteError {
    #[error("phrase {index} already has a vote")]
    AlreadyVoted { index: PhraseIndex },

    #[error("phrase {index} is outside the vote vector (len {len})")]
    OutOfRange { index: PhraseIndex, len: usize },
}

//
// ─── RATING ───────────────────────────────────────────────────────────────────
//

/// Star rating from 0 to 5 inclusive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` if the value is above 5.
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if value > Self::MAX {
            return Err(RatingError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Debug for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rating({})", self.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── VOTE STATE ───────────────────────────────────────────────────────────────
//

/// Per-phrase votes, indexed positionally by `PhraseIndex`.
///
/// `None` is the unset slot. Persisted as a JSON array of `rating | null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteState(Vec<Option<Rating>>);

impl VoteState {
    /// A vector of `len` unset slots.
    #[must_use]
    pub fn unset(len: usize) -> Self {
        Self(vec![None; len])
    }

    #[must_use]
    pub fn from_slots(slots: Vec<Option<Rating>>) -> Self {
        Self(slots)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Vote for `index`, or `None` when unset or out of range.
    #[must_use]
    pub fn get(&self, index: PhraseIndex) -> Option<Rating> {
        self.0.get(index.value()).copied().flatten()
    }

    #[must_use]
    pub fn is_set(&self, index: PhraseIndex) -> bool {
        self.get(index).is_some()
    }

    /// Record a vote. A slot can only be written once.
    ///
    /// # Errors
    ///
    /// Returns `VoteError::OutOfRange` for an index past the end and
    /// `VoteError::AlreadyVoted` if the slot is already set.
    pub fn record(&mut self, index: PhraseIndex, rating: Rating) -> Result<(), VoteError> {
        let len = self.0.len();
        let slot = self
            .0
            .get_mut(index.value())
            .ok_or(VoteError::OutOfRange { index, len })?;
        if slot.is_some() {
            return Err(VoteError::AlreadyVoted { index });
        }
        *slot = Some(rating);
        Ok(())
    }

    /// Comma-joined wire form. Unset slots render as `"0"`, same as a zero-star vote.
    #[must_use]
    pub fn to_wire(&self) -> String {
        self.0
            .iter()
            .map(|slot| slot.map_or_else(|| "0".to_owned(), |r| r.to_string()))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub(crate) fn into_slots(self) -> Vec<Option<Rating>> {
        self.0
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn r(value: u8) -> Rating {
        Rating::new(value).unwrap()
    }

    #[test]
    fn rating_bounds() {
        assert_eq!(r(0).value(), 0);
        assert_eq!(r(5).value(), 5);
        assert_eq!(Rating::new(6).unwrap_err(), RatingError::OutOfRange(6));
    }

    #[test]
    fn record_sets_slot_once() {
        let mut votes = VoteState::unset(2);
        votes.record(PhraseIndex::new(1), r(4)).unwrap();
        assert_eq!(votes.get(PhraseIndex::new(1)), Some(r(4)));

        let err = votes.record(PhraseIndex::new(1), r(2)).unwrap_err();
        assert_eq!(
            err,
            VoteError::AlreadyVoted {
                index: PhraseIndex::new(1)
            }
        );
        assert_eq!(votes.get(PhraseIndex::new(1)), Some(r(4)));
    }

    #[test]
    fn record_out_of_range_is_rejected() {
        let mut votes = VoteState::unset(1);
        let err = votes.record(PhraseIndex::new(3), r(1)).unwrap_err();
        assert!(matches!(err, VoteError::OutOfRange { len: 1, .. }));
    }

    #[test]
    fn wire_form_after_second_vote() {
        let mut votes = VoteState::from_slots(vec![Some(r(3)), None]);
        votes.record(PhraseIndex::new(1), r(5)).unwrap();
        assert_eq!(votes.to_wire(), "3,5");
        assert_eq!(votes.get(PhraseIndex::new(0)), Some(r(3)));
    }

    #[test]
    fn wire_form_renders_unset_as_zero() {
        let votes = VoteState::from_slots(vec![None, Some(r(0)), Some(r(2))]);
        assert_eq!(votes.to_wire(), "0,0,2");
    }

    #[test]
    fn json_shape_is_array_of_rating_or_null() {
        let votes = VoteState::from_slots(vec![Some(r(3)), None]);
        assert_eq!(serde_json::to_string(&votes).unwrap(), "[3,null]");

        let parsed: VoteState = serde_json::from_str("[null,5]").unwrap();
        assert_eq!(parsed.get(PhraseIndex::new(1)), Some(r(5)));
        assert!(serde_json::from_str::<VoteState>("[9]").is_err());
    }
}
