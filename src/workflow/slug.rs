//! Task slugs: deterministic, filesystem-safe task identifiers.

use std::fmt;

use crate::error::{WorkflowError, WorkflowResult};

/// Longest slug derived from a description.
pub const MAX_SLUG_LEN: usize = 30;

const SEPARATOR: char = '_';

/// Identifier of one planning task and its artifact set.
///
/// Only contains lowercase ASCII letters, digits, `_` and `-`, never starts
/// or ends with a separator, and is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slug(String);

impl Slug {
    /// Derives a slug from a free-text task description.
    ///
    /// Lowercases, collapses every run of non-alphanumeric characters into a
    /// single `_`, caps the length at [`MAX_SLUG_LEN`] and strips separators
    /// from both ends.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidSlug`] if nothing usable remains.
    pub fn from_description(description: &str) -> WorkflowResult<Self> {
        let mut slug = collapse(description, |c| c.is_ascii_alphanumeric());
        if slug.len() > MAX_SLUG_LEN {
            slug.truncate(MAX_SLUG_LEN);
            slug.truncate(slug.trim_end_matches(is_separator).len());
        }
        Self::checked(slug, description)
    }

    /// Accepts an explicit slug, sanitizing characters that are unsafe in
    /// file names.
    ///
    /// Unlike [`Slug::from_description`], hyphens survive and the length is
    /// not capped.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidSlug`] if nothing usable remains.
    pub fn from_override(raw: &str) -> WorkflowResult<Self> {
        let slug = collapse(raw, |c| c.is_ascii_alphanumeric() || c == '-' || c == SEPARATOR);
        Self::checked(slug, raw)
    }

    /// Wraps a string already known to be a valid slug, such as one parsed
    /// back out of a canonical artifact file name.
    pub(crate) fn from_trusted(slug: &str) -> Option<Self> {
        let valid = !slug.is_empty()
            && !slug.starts_with(is_separator)
            && !slug.ends_with(is_separator)
            && slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || is_separator(c));
        valid.then(|| Self(slug.to_string()))
    }

    /// The slug text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn checked(slug: String, input: &str) -> WorkflowResult<Self> {
        if slug.is_empty() {
            return Err(WorkflowError::InvalidSlug {
                input: input.to_string(),
                reason: "no letters or digits remain after normalization".into(),
            });
        }
        Ok(Self(slug))
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_separator(c: char) -> bool {
    c == SEPARATOR || c == '-'
}

/// Lowercases `input`, keeps characters accepted by `keep` and replaces each
/// run of rejected characters with one separator. Leading and trailing
/// separators are dropped.
fn collapse(input: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        if keep(c) {
            let needs_separator =
                pending_separator && !out.is_empty() && !out.ends_with(is_separator);
            if needs_separator && !is_separator(c) {
                out.push(SEPARATOR);
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
    }

    out.trim_matches(is_separator).to_string()
}
