//! Minimal delimited-text reader for published spreadsheet exports.
//!
//! Rows are newline-separated and fields comma-separated. A double quote
//! toggles quoted mode and is dropped; commas inside quoted mode are literal.
//! Escaped quotes (`""`) and newlines inside quoted fields are not supported.

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Split `text` into rows of trimmed fields, skipping blank lines.
#[must_use]
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Vec<String> {
    let mut row = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => {
                row.push(current.trim().to_owned());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    row.push(current.trim().to_owned());
    row
}
