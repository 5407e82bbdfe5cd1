//! Read-only catalogs of backgrounds and fortune texts.

use std::path::PathBuf;

use super::error::DomainError;

/// Fortunes used when no catalog file is configured.
pub const DEFAULT_FORTUNES: &[&str] = &[
    "YESSSSSSSSSSSS",
    "100%",
    "literally yea",
    "no doubt",
    "oh for sure for sure",
    "you got this",
    "it's a slay",
    "the answer you seek is found within",
    "the answer is clear as mud",
    "hmmmm...maybe try a tarot reading instead?",
    "we've been over this",
    "...literally no",
    "lol no",
    "ngl not looking great...",
    "like keep asking but the answer is still no",
    "really? ask me later...",
    "you ate on that one...",
];

/// A fixed, non-empty, ordered collection of choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog<T> {
    name: &'static str,
    items: Vec<T>,
}

impl<T> Catalog<T> {
    pub fn new(name: &'static str, items: Vec<T>) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::validation(format!(
                "catalog `{name}` must contain at least one entry"
            )));
        }
        Ok(Self { name, items })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Process-wide catalogs, loaded once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub backgrounds: Catalog<PathBuf>,
    pub fortunes: Catalog<String>,
}

impl Catalogs {
    pub fn new(backgrounds: Vec<PathBuf>, fortunes: Vec<String>) -> Result<Self, DomainError> {
        Ok(Self {
            backgrounds: Catalog::new("backgrounds", backgrounds)?,
            fortunes: Catalog::new("fortunes", fortunes)?,
        })
    }
}

pub fn default_fortunes() -> Vec<String> {
    DEFAULT_FORTUNES.iter().map(|text| text.to_string()).collect()
}
