use std::path::PathBuf;

use thiserror::Error;

use crate::platform::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    #[error("invalid selector format '{0}': expected '{{group > key}}'")]
    InvalidSelectorFormat(String),
    #[error("selector '{key}' not found in group '{group}' (platform: {platform}, environment: {environment})")]
    SelectorNotFound {
        group: String,
        key: String,
        platform: Platform,
        environment: String,
    },
    #[error("unsupported locator format for '{group} > {key}': {reason}")]
    UnsupportedLocatorFormat {
        group: String,
        key: String,
        reason: String,
    },
    #[error("required selectors missing for '{group}': {}", .missing.join(", "))]
    MissingSelectors { group: String, missing: Vec<String> },
    #[error("element cannot be uniquely identified by {locator}: found {count} elements")]
    AmbiguousElement { locator: String, count: usize },
    #[error("no element matches {0}")]
    ElementNotFound(String),
    #[error("failed to load locator file {path}: {reason}")]
    FileLoad { path: PathBuf, reason: String },
    #[error("driver error: {0}")]
    Driver(String),
}

impl LocatorError {
    /// Errors raised while turning step text into a locator, before any driver is involved.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            LocatorError::InvalidSelectorFormat(_)
                | LocatorError::SelectorNotFound { .. }
                | LocatorError::UnsupportedLocatorFormat { .. }
                | LocatorError::MissingSelectors { .. }
        )
    }
}

pub type LocatorResult<T> = std::result::Result<T, LocatorError>;
