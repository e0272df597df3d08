//! Parsing of the step phrases that reference locators.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::locator::{SymbolicSelector, VisibilityOption};

const CONDITION: &str = r"(?: if '(?P<var>.*?)' is set to '(?P<expected>.*?)' value)?$";

fn selector_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("valid regex"))
}

fn visible_text_step() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"^I click on element with visible text '(?P<option>EQUALS|CONTAINS|STARTS_WITH|ENDS_WITH)' '(?P<value>.*?)'(?:\s+and\s+'(?P<target>.*?)' target element)?{CONDITION}"
        ))
        .expect("valid regex")
    })
}

fn click_step() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"^(?:I wait for maximum '(?P<wait>\d+)' seconds, and )?I click on '(?P<locator>.+?)'{CONDITION}"
        ))
        .expect("valid regex")
    })
}

/// Every well-formed `{group > key}` reference in `step`, in order.
pub fn selector_keys(step: &str) -> Vec<SymbolicSelector> {
    selector_token()
        .find_iter(step)
        .filter_map(|token| SymbolicSelector::parse(token.as_str()).ok())
        .collect()
}

/// Trailing `if '<VAR>' is set to '<VALUE>' value` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepCondition {
    pub var: String,
    pub expected: String,
}

impl StepCondition {
    fn from_captures(captures: &Captures<'_>) -> Option<Self> {
        let var = captures.name("var")?.as_str();
        let expected = captures.name("expected")?.as_str();
        if var.is_empty() || expected.is_empty() {
            return None;
        }
        Some(Self {
            var: var.to_string(),
            expected: expected.to_string(),
        })
    }

    /// True when the step must not run: the variable is unset or holds a
    /// different value.
    pub fn should_skip<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.var).as_deref() != Some(self.expected.as_str())
    }
}

/// `I click on element with visible text '<OPTION>' '<value>'` with an
/// optional `and '<target>' target element` scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleTextStep {
    pub option: VisibilityOption,
    pub value: String,
    pub target: Option<String>,
    pub condition: Option<StepCondition>,
}

impl VisibleTextStep {
    pub fn parse(step: &str) -> Option<Self> {
        let captures = visible_text_step().captures(step.trim())?;
        let option = captures.name("option")?.as_str().parse().ok()?;
        Some(Self {
            option,
            value: captures.name("value")?.as_str().to_string(),
            target: captures
                .name("target")
                .map(|target| target.as_str().to_string()),
            condition: StepCondition::from_captures(&captures),
        })
    }
}

/// `[I wait for maximum '<n>' seconds, and ]I click on '<locator>'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickStep {
    pub locator: String,
    pub wait_seconds: Option<u64>,
    pub condition: Option<StepCondition>,
}

impl ClickStep {
    pub fn parse(step: &str) -> Option<Self> {
        let captures = click_step().captures(step.trim())?;
        let wait_seconds = match captures.name("wait") {
            Some(wait) => Some(wait.as_str().parse().ok()?),
            None => None,
        };
        Some(Self {
            locator: captures.name("locator")?.as_str().to_string(),
            wait_seconds,
            condition: StepCondition::from_captures(&captures),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_selector_tokens() {
        let keys = selector_keys("I fill '{login > username_input}' with '{ users>admin }' and {bad}");
        assert_eq!(
            keys,
            vec![
                SymbolicSelector::new("login", "username_input"),
                SymbolicSelector::new("users", "admin"),
            ]
        );
    }

    #[test]
    fn visible_text_step_with_target_and_condition() {
        let step = VisibleTextStep::parse(
            "I click on element with visible text 'CONTAINS' 'Submit' and '{login > form}' target element if 'BROWSER' is set to 'chrome' value",
        )
        .unwrap();
        assert_eq!(step.option, VisibilityOption::Contains);
        assert_eq!(step.value, "Submit");
        assert_eq!(step.target.as_deref(), Some("{login > form}"));
        assert_eq!(
            step.condition,
            Some(StepCondition {
                var: "BROWSER".into(),
                expected: "chrome".into(),
            })
        );
    }

    #[test]
    fn visible_text_step_minimal() {
        let step =
            VisibleTextStep::parse("I click on element with visible text 'EQUALS' 'Log in'").unwrap();
        assert_eq!(step.option, VisibilityOption::Equals);
        assert_eq!(step.value, "Log in");
        assert!(step.target.is_none());
        assert!(step.condition.is_none());

        assert!(VisibleTextStep::parse("I click on element with visible text 'LIKE' 'x'").is_none());
    }

    #[test]
    fn click_step_with_wait() {
        let step = ClickStep::parse("I wait for maximum '5' seconds, and I click on '{home > menu}'")
            .unwrap();
        assert_eq!(step.locator, "{home > menu}");
        assert_eq!(step.wait_seconds, Some(5));
    }

    #[test]
    fn condition_skips_unless_value_matches() {
        let condition = StepCondition {
            var: "PLATFORM".into(),
            expected: "mobile".into(),
        };
        assert!(!condition.should_skip(|_| Some("mobile".into())));
        assert!(condition.should_skip(|_| Some("web".into())));
        assert!(condition.should_skip(|_| None));
    }
}
