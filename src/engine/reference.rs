//! Scanner for `$$STEP_<N>_OUTPUT$$` placeholders.

use std::ops::Range;

const PREFIX: &str = "$$STEP_";
const SUFFIX: &str = "_OUTPUT$$";

/// A placeholder located in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub step: u32,
    pub span: Range<usize>,
}

/// Render the placeholder for `step`.
pub fn placeholder(step: u32) -> String {
    format!("{PREFIX}{step}{SUFFIX}")
}

/// Find every well-formed reference in `text`, left to right.
///
/// A digit run that does not fit a `u32` is not a reference.
pub fn scan(text: &str) -> Vec<Reference> {
    let mut refs = Vec::new();
    let bytes = text.as_bytes();
    let mut from = 0;

    while let Some(offset) = text[from..].find(PREFIX) {
        let start = from + offset;
        let digits_start = start + PREFIX.len();
        let digits_end = bytes[digits_start..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |n| digits_start + n);

        let parsed = (digits_end > digits_start && text[digits_end..].starts_with(SUFFIX))
            .then(|| text[digits_start..digits_end].parse::<u32>().ok())
            .flatten();

        match parsed {
            Some(step) => {
                let end = digits_end + SUFFIX.len();
                refs.push(Reference {
                    step,
                    span: start..end,
                });
                from = end;
            }
            // `$` is ASCII, so `start + 1` is a char boundary.
            None => from = start + 1,
        }
    }

    refs
}

/// The step number if the trimmed text is exactly one reference.
pub fn whole(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    match scan(trimmed).as_slice() {
        [only] if only.span == (0..trimmed.len()) => Some(only.step),
        _ => None,
    }
}
