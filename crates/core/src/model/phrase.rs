use thiserror::Error;

use crate::model::ids::PhraseIndex;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PhraseError {
    #[error("phrase text cannot be empty")]
    EmptyText,
}

/// A single phrase offered for rating.
///
/// Immutable once loaded; a fresh sequence replaces it on every dataset load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    index: PhraseIndex,
    text: String,
    visible: bool,
}

impl Phrase {
    /// Builds a phrase, trimming its text.
    ///
    /// # Errors
    ///
    /// Returns `PhraseError::EmptyText` if the text is blank after trimming.
    pub fn new(
        index: PhraseIndex,
        text: impl Into<String>,
        visible: bool,
    ) -> Result<Self, PhraseError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PhraseError::EmptyText);
        }

        Ok(Self {
            index,
            text: trimmed.to_owned(),
            visible,
        })
    }

    #[must_use]
    pub fn index(&self) -> PhraseIndex {
        self.index
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Hidden phrases keep their vote slot but are never selected or counted.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_trims_text() {
        let phrase = Phrase::new(PhraseIndex::new(0), "  hello  ", true).unwrap();
        assert_eq!(phrase.text(), "hello");
        assert!(phrase.is_visible());
    }

    #[test]
    fn phrase_rejects_blank_text() {
        let err = Phrase::new(PhraseIndex::new(0), " \t ", true).unwrap_err();
        assert_eq!(err, PhraseError::EmptyText);
    }
}
