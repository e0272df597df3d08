use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::entry::{LocatorEntry, LocatorKind};
use super::error::{LocatorError, LocatorResult};
use super::selector::SymbolicSelector;
use super::store::LocatorStore;
use super::text::{text_xpath, TextMatcher, VisibilityOption};

/// A `(type, value)` pair ready for a driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedLocator {
    pub kind: LocatorKind,
    pub value: String,
}

impl ResolvedLocator {
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Css, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::XPath, value)
    }

    /// The pair in WebDriver `using`/`value` form.
    pub fn as_pair(&self) -> (&'static str, &str) {
        (self.kind.as_str(), self.value.as_str())
    }
}

impl fmt::Display for ResolvedLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.value)
    }
}

/// Translates symbolic selectors into driver locators using a loaded store.
#[derive(Debug, Clone, Copy)]
pub struct SelectorResolver<'a> {
    store: &'a LocatorStore,
}

impl<'a> SelectorResolver<'a> {
    pub fn new(store: &'a LocatorStore) -> Self {
        Self { store }
    }

    pub fn resolve(&self, selector: &str) -> LocatorResult<ResolvedLocator> {
        let parsed = SymbolicSelector::parse(selector)?;
        self.resolve_parsed(&parsed)
    }

    pub fn resolve_parsed(&self, selector: &SymbolicSelector) -> LocatorResult<ResolvedLocator> {
        let (group, key) = (selector.group(), selector.key());
        let entry = self
            .store
            .namespace()
            .entry(group, key)
            .ok_or_else(|| LocatorError::SelectorNotFound {
                group: group.to_string(),
                key: key.to_string(),
                platform: self.store.platform(),
                environment: self.store.environment().to_string(),
            })?;

        let resolved = match entry {
            LocatorEntry::Plain { value } => ResolvedLocator::css(value.clone()),
            LocatorEntry::Typed { kind, value } => match kind.text_option() {
                Some(option) => ResolvedLocator::xpath(text_xpath(option, value, "//*")),
                None => ResolvedLocator::new(*kind, value.clone()),
            },
            LocatorEntry::Unusable { reason } => {
                return Err(LocatorError::UnsupportedLocatorFormat {
                    group: group.to_string(),
                    key: key.to_string(),
                    reason: reason.clone(),
                })
            }
        };
        debug!(%selector, locator = %resolved, "resolved selector");
        Ok(resolved)
    }

    /// Builds a text matcher, optionally scoped under the element `target_path`
    /// refers to. `target_path` must itself be a `{group > key}` selector.
    pub fn build_text_matcher(
        &self,
        option: VisibilityOption,
        value: &str,
        target_path: Option<&str>,
    ) -> LocatorResult<TextMatcher> {
        match target_path {
            Some(target) => {
                let target = self.resolve(target)?;
                Ok(TextMatcher::within(option, value, target))
            }
            None => Ok(TextMatcher::new(option, value)),
        }
    }

    pub fn store(&self) -> &'a LocatorStore {
        self.store
    }
}
