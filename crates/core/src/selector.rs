use rand::Rng;
use rand::seq::IndexedRandom;

use crate::model::{Phrase, VoteState};

/// Phrases eligible for presentation: visible and not yet voted.
#[must_use]
pub fn candidates<'a>(phrases: &'a [Phrase], votes: &VoteState) -> Vec<&'a Phrase> {
    phrases
        .iter()
        .filter(|phrase| phrase.is_visible() && !votes.is_set(phrase.index()))
        .collect()
}

/// Pick the next phrase uniformly at random among the candidates.
///
/// Returns `None` once every visible phrase has a vote. Calls are
/// independent; the same state may yield a different phrase each time.
pub fn select_next<'a, R: Rng + ?Sized>(
    phrases: &'a [Phrase],
    votes: &VoteState,
    rng: &mut R,
) -> Option<&'a Phrase> {
    candidates(phrases, votes).choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhraseIndex, Rating};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn phrase(index: usize, visible: bool) -> Phrase {
        Phrase::new(PhraseIndex::new(index), format!("p{index}"), visible).unwrap()
    }

    #[test]
    fn never_selects_hidden_or_voted() {
        let phrases = vec![
            phrase(0, true),
            phrase(1, false),
            phrase(2, true),
            phrase(3, true),
        ];
        let votes = VoteState::from_slots(vec![Some(Rating::new(2).unwrap()), None, None, None]);
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let picked = select_next(&phrases, &votes, &mut rng).unwrap();
            assert!(picked.is_visible());
            assert!(!votes.is_set(picked.index()));
            seen.insert(picked.index().value());
        }
        assert_eq!(seen, HashSet::from([2, 3]));
    }

    #[test]
    fn exhausted_when_all_visible_voted() {
        let phrases = vec![phrase(0, true), phrase(1, false)];
        let votes = VoteState::from_slots(vec![Some(Rating::new(0).unwrap()), None]);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..10 {
            assert!(select_next(&phrases, &votes, &mut rng).is_none());
        }
    }

    #[test]
    fn default_visible_rows_form_the_pool() {
        let dataset = crate::dataset::Dataset::from_csv("x,0,n\ny,0,\n").unwrap();
        let votes = VoteState::unset(dataset.phrases().len());

        let pool: Vec<usize> = candidates(dataset.phrases(), &votes)
            .iter()
            .map(|p| p.index().value())
            .collect();
        assert_eq!(pool, vec![0, 1]);
    }
}
