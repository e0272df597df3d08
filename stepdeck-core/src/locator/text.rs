use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::ElementDriver;

use super::error::{LocatorError, LocatorResult};
use super::resolver::ResolvedLocator;
use super::entry::LocatorKind;

/// How rendered text is compared when locating an element by its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisibilityOption {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

impl VisibilityOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityOption::Equals => "EQUALS",
            VisibilityOption::Contains => "CONTAINS",
            VisibilityOption::StartsWith => "STARTS_WITH",
            VisibilityOption::EndsWith => "ENDS_WITH",
        }
    }

    /// XPath predicate (without brackets) over `normalize-space()`.
    fn predicate(&self, literal: &str) -> String {
        match self {
            VisibilityOption::Equals => format!("normalize-space()={literal}"),
            VisibilityOption::Contains => format!("contains(normalize-space(),{literal})"),
            VisibilityOption::StartsWith => format!("starts-with(normalize-space(),{literal})"),
            VisibilityOption::EndsWith => format!(
                "substring(normalize-space(), string-length(normalize-space()) - string-length({literal}) + 1)={literal}"
            ),
        }
    }
}

impl fmt::Display for VisibilityOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisibilityOption {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "EQUALS" => Ok(VisibilityOption::Equals),
            "CONTAINS" => Ok(VisibilityOption::Contains),
            "STARTS_WITH" => Ok(VisibilityOption::StartsWith),
            "ENDS_WITH" => Ok(VisibilityOption::EndsWith),
            _ => Err(format!(
                "unknown visibility option '{}' (expected EQUALS, CONTAINS, STARTS_WITH or ENDS_WITH)",
                value.trim()
            )),
        }
    }
}

/// Quotes `value` as an XPath 1.0 string literal.
///
/// XPath 1.0 has no escape sequences, so a value holding both quote kinds is
/// split into a `concat()` call.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect::<Vec<_>>()
        .join(", \"'\", ");
    format!("concat({parts})")
}

/// Builds the XPath for a text match below `base` (`//*` when unscoped).
///
/// Ancestors of the matching element share its text, so only the innermost
/// element whose descendants do not match on their own is selected.
pub(crate) fn text_xpath(option: VisibilityOption, value: &str, base: &str) -> String {
    let predicate = option.predicate(&xpath_literal(value));
    format!("{base}[{predicate}][not(.//*[{predicate}])]")
}

/// A text-matching locator, optionally scoped under a target element.
///
/// When the target is itself an XPath the two are fused into one expression,
/// with the target parenthesized so a union stays scoped as a whole, and
/// `scope` stays empty; any other target kind is kept as `scope` and the
/// matcher searches relative to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMatcher {
    pub option: VisibilityOption,
    pub text: String,
    pub scope: Option<ResolvedLocator>,
    pub locator: ResolvedLocator,
}

impl TextMatcher {
    pub fn new(option: VisibilityOption, text: impl Into<String>) -> Self {
        let text = text.into();
        let locator = ResolvedLocator::new(LocatorKind::XPath, text_xpath(option, &text, "//*"));
        Self {
            option,
            text,
            scope: None,
            locator,
        }
    }

    pub fn within(option: VisibilityOption, text: impl Into<String>, target: ResolvedLocator) -> Self {
        let text = text.into();
        if target.kind == LocatorKind::XPath {
            let base = format!("({})//*", target.value.trim_end_matches('/'));
            let locator = ResolvedLocator::new(LocatorKind::XPath, text_xpath(option, &text, &base));
            return Self {
                option,
                text,
                scope: None,
                locator,
            };
        }
        let locator = ResolvedLocator::new(LocatorKind::XPath, text_xpath(option, &text, ".//*"));
        Self {
            option,
            text,
            scope: Some(target),
            locator,
        }
    }

    /// Checks the live document and returns the locator only when it selects
    /// exactly one element.
    pub async fn require_unique<D>(&self, driver: &D) -> LocatorResult<ResolvedLocator>
    where
        D: ElementDriver + ?Sized,
    {
        let count = driver
            .count_matches(&self.locator, self.scope.as_ref())
            .await?;
        debug!(locator = %self.locator, count, "text matcher evaluated");
        match count {
            1 => Ok(self.locator.clone()),
            0 => Err(LocatorError::ElementNotFound(self.describe())),
            count => Err(LocatorError::AmbiguousElement {
                locator: self.describe(),
                count,
            }),
        }
    }

    fn describe(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{} within {}", self.locator, scope),
            None => self.locator.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_quoting() {
        assert_eq!(xpath_literal("Submit"), "'Submit'");
        assert_eq!(xpath_literal("Don't"), "\"Don't\"");
        assert_eq!(
            xpath_literal(r#"say "hi" it's"#),
            r#"concat('say "hi" it', "'", 's')"#
        );
    }

    #[test]
    fn expressions_per_option() {
        assert_eq!(
            TextMatcher::new(VisibilityOption::Equals, "Submit").locator.value,
            "//*[normalize-space()='Submit'][not(.//*[normalize-space()='Submit'])]"
        );
        assert_eq!(
            TextMatcher::new(VisibilityOption::Contains, "Sub").locator.value,
            "//*[contains(normalize-space(),'Sub')][not(.//*[contains(normalize-space(),'Sub')])]"
        );
        assert_eq!(
            TextMatcher::new(VisibilityOption::StartsWith, "Su").locator.value,
            "//*[starts-with(normalize-space(),'Su')][not(.//*[starts-with(normalize-space(),'Su')])]"
        );
        let ends_with = TextMatcher::new(VisibilityOption::EndsWith, "mit").locator.value;
        assert!(ends_with.starts_with(
            "//*[substring(normalize-space(), string-length(normalize-space()) - string-length('mit') + 1)='mit']"
        ));
    }

    #[test]
    fn xpath_target_is_fused() {
        let target = ResolvedLocator::new(LocatorKind::XPath, "//form[@id='login']");
        let matcher = TextMatcher::within(VisibilityOption::Equals, "Go", target);
        assert!(matcher.scope.is_none());
        assert!(matcher
            .locator
            .value
            .starts_with("(//form[@id='login'])//*[normalize-space()='Go']"));
    }

    #[test]
    fn union_target_scopes_every_branch() {
        let target = ResolvedLocator::new(LocatorKind::XPath, "//aside | //nav");
        let matcher = TextMatcher::within(VisibilityOption::Equals, "Go", target);
        assert_eq!(
            matcher.locator.value,
            "(//aside | //nav)//*[normalize-space()='Go'][not(.//*[normalize-space()='Go'])]"
        );
    }

    #[test]
    fn css_target_becomes_scope() {
        let target = ResolvedLocator::new(LocatorKind::Css, "#login");
        let matcher = TextMatcher::within(VisibilityOption::Contains, "Go", target.clone());
        assert_eq!(matcher.scope, Some(target));
        assert!(matcher
            .locator
            .value
            .starts_with(".//*[contains(normalize-space(),'Go')]"));
    }

    #[test]
    fn option_parsing() {
        assert_eq!("starts_with".parse::<VisibilityOption>(), Ok(VisibilityOption::StartsWith));
        assert_eq!("ENDS-WITH".parse::<VisibilityOption>(), Ok(VisibilityOption::EndsWith));
        assert!("LIKE".parse::<VisibilityOption>().is_err());
    }
}
