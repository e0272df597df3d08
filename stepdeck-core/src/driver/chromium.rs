use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::page::Page;
use serde_json::Value;
use tracing::debug;

use crate::locator::{
    text_xpath, xpath_literal, LocatorError, LocatorKind, LocatorResult, ResolvedLocator,
    VisibilityOption,
};

use super::ElementDriver;

/// [`ElementDriver`] backed by a Chromium page over CDP.
#[derive(Debug, Clone)]
pub struct ChromiumDriver {
    page: Page,
    timeout: Duration,
}

impl ChromiumDriver {
    pub fn new(page: Page, timeout: Duration) -> Self {
        Self { page, timeout }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }
}

#[async_trait]
impl ElementDriver for ChromiumDriver {
    async fn count_matches(
        &self,
        locator: &ResolvedLocator,
        scope: Option<&ResolvedLocator>,
    ) -> LocatorResult<usize> {
        let script = count_script(locator, scope)?;
        let evaluation = tokio::time::timeout(self.timeout, self.page.evaluate(script.as_str()))
            .await
            .map_err(|_| {
                LocatorError::Driver(format!(
                    "timed out after {}s counting {locator}",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| LocatorError::Driver(format!("failed to evaluate count script: {err}")))?;
        let count = evaluation
            .into_value::<usize>()
            .map_err(|err| LocatorError::Driver(format!("failed to decode element count: {err}")))?;
        debug!(%locator, count, "counted matching elements");
        Ok(count)
    }
}

/// DOM query a locator kind maps onto.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DomQuery {
    Css(String),
    XPath(String),
}

impl DomQuery {
    fn from_locator(locator: &ResolvedLocator) -> LocatorResult<Self> {
        let value = locator.value.as_str();
        let query = match locator.kind {
            LocatorKind::Css | LocatorKind::TagName => DomQuery::Css(value.to_string()),
            LocatorKind::XPath => DomQuery::XPath(value.to_string()),
            LocatorKind::Id => DomQuery::Css(format!("[id={}]", js_string(value))),
            LocatorKind::Name => DomQuery::Css(format!("[name={}]", js_string(value))),
            LocatorKind::ClassName => DomQuery::Css(format!("[class~={}]", js_string(value))),
            LocatorKind::LinkText => {
                DomQuery::XPath(format!(".//a[normalize-space()={}]", xpath_literal(value)))
            }
            LocatorKind::PartialLinkText => DomQuery::XPath(format!(
                ".//a[contains(normalize-space(),{})]",
                xpath_literal(value)
            )),
            LocatorKind::Text => text_query(VisibilityOption::Equals, value),
            LocatorKind::TextContains => text_query(VisibilityOption::Contains, value),
            LocatorKind::TextStartsWith => text_query(VisibilityOption::StartsWith, value),
            LocatorKind::TextEndsWith => text_query(VisibilityOption::EndsWith, value),
            LocatorKind::AccessibilityId
            | LocatorKind::AndroidUiAutomator
            | LocatorKind::IosPredicate
            | LocatorKind::IosClassChain => {
                return Err(LocatorError::Driver(format!(
                    "locator type '{}' is not available in a browser",
                    locator.kind
                )))
            }
        };
        Ok(query)
    }

    /// Expression yielding the first match below `root`, or `null`.
    fn first(&self, root: &str) -> String {
        match self {
            DomQuery::Css(selector) => format!("{root}.querySelector({})", js_string(selector)),
            DomQuery::XPath(xpath) => format!(
                "document.evaluate({}, {root}, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_string(xpath)
            ),
        }
    }

    /// Expression yielding the number of matches below `root`.
    fn count(&self, root: &str) -> String {
        match self {
            DomQuery::Css(selector) => {
                format!("{root}.querySelectorAll({}).length", js_string(selector))
            }
            DomQuery::XPath(xpath) => format!(
                "document.evaluate({}, {root}, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
                js_string(xpath)
            ),
        }
    }
}

/// Script evaluating to the number of elements `locator` selects.
pub fn count_script(
    locator: &ResolvedLocator,
    scope: Option<&ResolvedLocator>,
) -> LocatorResult<String> {
    let query = DomQuery::from_locator(locator)?;
    let script = match scope {
        None => format!("(() => {})()", query.count("document")),
        Some(scope) => {
            let scope = DomQuery::from_locator(scope)?;
            format!(
                "(() => {{ const root = {}; if (!root) {{ return 0; }} return {}; }})()",
                scope.first("document"),
                query.count("root")
            )
        }
    };
    Ok(script)
}

fn text_query(option: VisibilityOption, value: &str) -> DomQuery {
    DomQuery::XPath(text_xpath(option, value, ".//*"))
}

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}
