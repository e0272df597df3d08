use std::fmt;
use std::str::FromStr;

use super::error::LocatorError;

/// Parsed `{group > key}` reference from step text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolicSelector {
    group: String,
    key: String,
}

impl SymbolicSelector {
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let invalid = || LocatorError::InvalidSelectorFormat(input.to_string());
        let inner = input
            .trim()
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(invalid)?;
        let (group, key) = inner.split_once('>').ok_or_else(invalid)?;
        let (group, key) = (group.trim(), key.trim());
        let valid_part =
            |part: &str| !part.is_empty() && !part.contains(['{', '}', '>']);
        if !valid_part(group) || !valid_part(key) {
            return Err(invalid());
        }
        Ok(Self::new(group, key))
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// True when `input` has the `{group > key}` shape.
    pub fn is_symbolic(input: &str) -> bool {
        Self::parse(input).is_ok()
    }
}

impl fmt::Display for SymbolicSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} > {}}}", self.group, self.key)
    }
}

impl FromStr for SymbolicSelector {
    type Err = LocatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_insignificant() {
        let compact = SymbolicSelector::parse("{login>username_input}").unwrap();
        let spaced = SymbolicSelector::parse("  {  login  >  username_input }").unwrap();
        assert_eq!(compact, spaced);
        assert_eq!(compact.group(), "login");
        assert_eq!(compact.key(), "username_input");
        assert_eq!(compact.to_string(), "{login > username_input}");
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        for input in [
            "",
            "login > username",
            "{login}",
            "{login > }",
            "{ > username}",
            "{a > b > c}",
            "{login > user}name}",
            "{{login > username}}",
            "#username",
            "login.username",
        ] {
            let err = SymbolicSelector::parse(input).unwrap_err();
            assert_eq!(err, LocatorError::InvalidSelectorFormat(input.to_string()));
        }
    }
}
