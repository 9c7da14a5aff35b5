use thiserror::Error;

use crate::csv::parse_rows;
use crate::model::{Phrase, PhraseIndex};

/// First-cell labels that mark the first row as a header.
pub const HEADER_LABELS: &[&str] = &["phrases", "frases", "rating", "hide"];

/// Tokens accepted as `true` for the hide column.
const TRUTHY: &[&str] = &["true", "1", "y", "yes", "sim"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DatasetError {
    #[error("dataset contains no phrases")]
    Empty,
}

/// One data row as exported by the sheet: text, aggregate score, hide flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub text: String,
    /// Aggregate score kept by the sheet; not used for voting.
    pub aggregate: i64,
    pub hide: bool,
}

impl DatasetRow {
    /// Map raw cells to a row. Missing or malformed cells fall back to defaults.
    ///
    /// The second return value is true when a non-empty aggregate cell could
    /// not be read as a number.
    #[must_use]
    pub fn from_cells(cells: &[String]) -> (Self, bool) {
        let text = cells.first().map(|c| c.trim().to_owned()).unwrap_or_default();
        let raw_aggregate = cells.get(1).map(String::as_str).unwrap_or_default();
        let aggregate = parse_leading_int(raw_aggregate);
        let degraded = aggregate.is_none() && !raw_aggregate.trim().is_empty();
        let hide = cells.get(2).is_some_and(|c| parse_flag(c));

        (
            Self {
                text,
                aggregate: aggregate.unwrap_or(0),
                hide,
            },
            degraded,
        )
    }
}

/// Phrases extracted from one dataset body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    phrases: Vec<Phrase>,
    degraded_fields: usize,
}

impl Dataset {
    /// Parse a CSV export into phrases.
    ///
    /// Drops a recognised header row, skips rows with blank text, and assigns
    /// indices by position among the remaining rows.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::Empty` if no phrase survives filtering.
    pub fn from_csv(text: &str) -> Result<Self, DatasetError> {
        let rows = parse_rows(text);
        let skip = usize::from(rows.first().is_some_and(|row| is_header(row)));

        let mut phrases = Vec::new();
        let mut degraded_fields = 0;
        for cells in rows.iter().skip(skip) {
            let (row, degraded) = DatasetRow::from_cells(cells);
            if degraded {
                degraded_fields += 1;
            }
            // `Phrase::new` rejects blank text; that is how blank rows are dropped.
            if let Ok(phrase) = Phrase::new(PhraseIndex::new(phrases.len()), row.text, !row.hide)
            {
                phrases.push(phrase);
            }
        }

        if phrases.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            phrases,
            degraded_fields,
        })
    }

    #[must_use]
    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    #[must_use]
    pub fn into_phrases(self) -> Vec<Phrase> {
        self.phrases
    }

    /// Number of aggregate cells that had to fall back to zero.
    #[must_use]
    pub fn degraded_fields(&self) -> usize {
        self.degraded_fields
    }
}

/// Permissive boolean: `true`, `1`, `y`, `yes`, `sim` (any case) are true.
#[must_use]
pub fn parse_flag(raw: &str) -> bool {
    let value = raw.trim().to_lowercase();
    TRUTHY.contains(&value.as_str())
}

fn is_header(row: &[String]) -> bool {
    row.first().is_some_and(|cell| {
        let cell = cell.trim().to_lowercase();
        HEADER_LABELS.contains(&cell.as_str())
    })
}

/// Reads an optional sign and leading digits, ignoring anything after them.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let digits_start = usize::from(trimmed.starts_with(['-', '+']));
    let digits_len = trimmed[digits_start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    trimmed[..digits_start + digits_len].parse().ok()
}
