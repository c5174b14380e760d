//! Answer normalization.
//!
//! Maps raw submitted values and answer-key entries onto a canonical form so
//! grading can compare them with plain equality. Every function here is total:
//! missing values normalize to the empty string or an empty letter list.

use std::collections::BTreeSet;

use crate::model::{QuestionType, Response};

const QUOTES: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];
const TRAILING_PUNCTUATION: [char; 6] = ['.', ',', ';', ':', '!', '?'];

/// A normalized answer, ready for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Scalar(String),
    /// Sorted, deduplicated letters.
    Letters(Vec<String>),
}

/// Canonical form of a free-text answer.
///
/// Lowercases, collapses whitespace runs, strips surrounding quotes and
/// trailing sentence punctuation. `normalize_text(normalize_text(x)) ==
/// normalize_text(x)` for every input.
pub fn normalize_text(value: &str) -> String {
    let collapsed = value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    collapsed
        .trim_start_matches(|c: char| QUOTES.contains(&c) || c.is_whitespace())
        .trim_end_matches(|c: char| {
            QUOTES.contains(&c) || TRAILING_PUNCTUATION.contains(&c) || c.is_whitespace()
        })
        .to_string()
}

/// Canonical form of a letter answer (`b ` -> `B`, `not given` -> `NOT GIVEN`).
pub fn normalize_letter(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Normalized, deduplicated letters of every selection in `value`.
///
/// A plain string counts as one selection.
pub fn letter_set(value: Option<&Response>) -> BTreeSet<String> {
    value
        .map(|v| {
            v.values()
                .into_iter()
                .map(normalize_letter)
                .filter(|l| !l.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Letters of a multiple-choice value, which may be an array or a
/// comma-joined string. Both shapes yield the same sorted sequence.
pub fn choice_letters(value: Option<&Response>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    let letters: BTreeSet<String> = value
        .values()
        .into_iter()
        .flat_map(|v| v.split(','))
        .map(normalize_letter)
        .filter(|l| !l.is_empty())
        .collect();
    letters.into_iter().collect()
}

/// Normalize a multiple-choice value.
///
/// Single-answer questions normalize to a scalar letter so they compare
/// equal to a non-list accepted value; a multi-letter selection on a
/// single-answer question stays a list and can never match.
pub fn normalize_choice(value: Option<&Response>, single_answer: bool) -> Normalized {
    let mut letters = choice_letters(value);
    if single_answer && letters.len() <= 1 {
        return Normalized::Scalar(letters.pop().unwrap_or_default());
    }
    Normalized::Letters(letters)
}

/// Normalize a scalar value according to a question type.
pub fn normalize_scalar(value: &str, kind: &QuestionType) -> String {
    match kind {
        QuestionType::SingleLetter
        | QuestionType::TrueFalseNotGiven
        | QuestionType::YesNoNotGiven => normalize_letter(value),
        _ => normalize_text(value),
    }
}

/// Normalize a submitted value according to its question type.
///
/// Unknown types fall back to free-text normalization.
pub fn normalize_response(value: Option<&Response>, kind: &QuestionType) -> Normalized {
    match kind {
        QuestionType::MultiLetter => Normalized::Letters(letter_set(value).into_iter().collect()),
        QuestionType::MultipleChoice => normalize_choice(value, false),
        _ => {
            let scalar = value.map(|v| v.as_scalar()).unwrap_or_default();
            Normalized::Scalar(normalize_scalar(&scalar, kind))
        }
    }
}
