use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::text::VisibilityOption;

/// Lookup strategy understood by a driver.
///
/// The `as_str` names follow the WebDriver/Appium `using` vocabulary so a
/// resolved pair can be passed to a driver without translation. The text
/// strategies never reach a driver directly: the resolver expands them into
/// an XPath text matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorKind {
    Css,
    XPath,
    Id,
    Name,
    ClassName,
    TagName,
    LinkText,
    PartialLinkText,
    AccessibilityId,
    AndroidUiAutomator,
    IosPredicate,
    IosClassChain,
    Text,
    TextContains,
    TextStartsWith,
    TextEndsWith,
}

impl LocatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorKind::Css => "css selector",
            LocatorKind::XPath => "xpath",
            LocatorKind::Id => "id",
            LocatorKind::Name => "name",
            LocatorKind::ClassName => "class name",
            LocatorKind::TagName => "tag name",
            LocatorKind::LinkText => "link text",
            LocatorKind::PartialLinkText => "partial link text",
            LocatorKind::AccessibilityId => "accessibility id",
            LocatorKind::AndroidUiAutomator => "-android uiautomator",
            LocatorKind::IosPredicate => "-ios predicate string",
            LocatorKind::IosClassChain => "-ios class chain",
            LocatorKind::Text => "text",
            LocatorKind::TextContains => "text-contains",
            LocatorKind::TextStartsWith => "text-starts-with",
            LocatorKind::TextEndsWith => "text-ends-with",
        }
    }

    /// Matching mode for the text strategies, `None` for everything else.
    pub fn text_option(&self) -> Option<VisibilityOption> {
        match self {
            LocatorKind::Text => Some(VisibilityOption::Equals),
            LocatorKind::TextContains => Some(VisibilityOption::Contains),
            LocatorKind::TextStartsWith => Some(VisibilityOption::StartsWith),
            LocatorKind::TextEndsWith => Some(VisibilityOption::EndsWith),
            _ => None,
        }
    }
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LocatorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for LocatorKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value
            .trim()
            .trim_start_matches('-')
            .to_ascii_lowercase()
            .replace(['_', '-'], " ");
        let kind = match normalized.as_str() {
            "css" | "css selector" => LocatorKind::Css,
            "xpath" => LocatorKind::XPath,
            "id" => LocatorKind::Id,
            "name" => LocatorKind::Name,
            "class" | "class name" => LocatorKind::ClassName,
            "tag" | "tag name" => LocatorKind::TagName,
            "link text" | "link" => LocatorKind::LinkText,
            "partial link text" | "partial link" => LocatorKind::PartialLinkText,
            "accessibility id" | "accessibility" => LocatorKind::AccessibilityId,
            "android uiautomator" | "uiautomator" => LocatorKind::AndroidUiAutomator,
            "ios predicate string" | "ios predicate" | "predicate" => LocatorKind::IosPredicate,
            "ios class chain" | "class chain" => LocatorKind::IosClassChain,
            "text" | "text equals" => LocatorKind::Text,
            "text contains" => LocatorKind::TextContains,
            "text starts with" => LocatorKind::TextStartsWith,
            "text ends with" => LocatorKind::TextEndsWith,
            _ => return Err(format!("unknown locator type '{}'", value.trim())),
        };
        Ok(kind)
    }
}

/// One addressable element, decoded once when its file is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum LocatorEntry {
    /// Bare string; resolves as a CSS selector.
    Plain { value: String },
    /// Mapping with an explicit `type`.
    Typed { kind: LocatorKind, value: String },
    /// Present in the file but not resolvable.
    Unusable { reason: String },
}

impl LocatorEntry {
    pub fn plain(value: impl Into<String>) -> Self {
        LocatorEntry::Plain {
            value: value.into(),
        }
    }

    pub fn typed(kind: LocatorKind, value: impl Into<String>) -> Self {
        LocatorEntry::Typed {
            kind,
            value: value.into(),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) if text.trim().is_empty() => LocatorEntry::Unusable {
                reason: "empty locator value".to_string(),
            },
            Value::String(text) => LocatorEntry::plain(text.clone()),
            Value::Object(record) => {
                let kind = match record.get("type") {
                    None | Some(Value::Null) => LocatorKind::Css,
                    Some(Value::String(name)) => match name.parse::<LocatorKind>() {
                        Ok(kind) => kind,
                        Err(reason) => return LocatorEntry::Unusable { reason },
                    },
                    Some(other) => {
                        return LocatorEntry::Unusable {
                            reason: format!("'type' must be a string, found {}", describe(other)),
                        }
                    }
                };
                match record.get("value") {
                    Some(Value::String(text)) if !text.trim().is_empty() => {
                        LocatorEntry::typed(kind, text.clone())
                    }
                    Some(Value::String(_)) => LocatorEntry::Unusable {
                        reason: "record has an empty 'value'".to_string(),
                    },
                    Some(other) => LocatorEntry::Unusable {
                        reason: format!("'value' must be a string, found {}", describe(other)),
                    },
                    None => LocatorEntry::Unusable {
                        reason: "record lacks a 'value' field".to_string(),
                    },
                }
            }
            other => LocatorEntry::Unusable {
                reason: format!(
                    "expected a string or a {{type, value}} mapping, found {}",
                    describe(other)
                ),
            },
        }
    }

    pub fn is_usable(&self) -> bool {
        !matches!(self, LocatorEntry::Unusable { .. })
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Entries of one file-group, addressed by element key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocatorGroup {
    entries: BTreeMap<String, LocatorEntry>,
}

impl LocatorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a parsed locator document for `group`.
    ///
    /// A mapping whose only key is the group name and whose value is itself a
    /// mapping is unwrapped first, so both `{username: "#u"}` and
    /// `{login: {username: "#u"}}` load the same way. `{login: "#u"}` stays a
    /// one-entry group.
    pub fn from_document(group: &str, document: Value) -> Result<Self, String> {
        let document = match document {
            Value::Object(mut map)
                if map.len() == 1 && matches!(map.get(group), Some(Value::Object(_))) =>
            {
                map.remove(group).unwrap_or(Value::Null)
            }
            other => other,
        };
        match document {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self {
                entries: map
                    .iter()
                    .map(|(key, value)| (key.clone(), LocatorEntry::from_value(value)))
                    .collect(),
            }),
            other => Err(format!(
                "top level must be a mapping of element keys, found {}",
                describe(&other)
            )),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: LocatorEntry) -> Option<LocatorEntry> {
        self.entries.insert(key.into(), entry)
    }

    pub fn get(&self, key: &str) -> Option<&LocatorEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LocatorEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, LocatorEntry)> for LocatorGroup {
    fn from_iter<I: IntoIterator<Item = (K, LocatorEntry)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, entry)| (key.into(), entry))
                .collect(),
        }
    }
}

/// Two-level map: file-group, then element key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocatorNamespace {
    groups: BTreeMap<String, LocatorGroup>,
}

impl LocatorNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a whole namespace from one document (`selectors.yaml` layout).
    pub fn from_document(document: Value) -> Result<Self, String> {
        match document {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => {
                let mut namespace = Self::new();
                for (group, value) in map {
                    let decoded = LocatorGroup::from_document(&group, value)
                        .map_err(|reason| format!("group '{group}': {reason}"))?;
                    namespace.insert_group(group, decoded);
                }
                Ok(namespace)
            }
            other => Err(format!(
                "top level must be a mapping of groups, found {}",
                describe(&other)
            )),
        }
    }

    pub fn insert_group(
        &mut self,
        name: impl Into<String>,
        group: LocatorGroup,
    ) -> Option<LocatorGroup> {
        self.groups.insert(name.into(), group)
    }

    pub fn group(&self, name: &str) -> Option<&LocatorGroup> {
        self.groups.get(name)
    }

    pub fn entry(&self, group: &str, key: &str) -> Option<&LocatorEntry> {
        self.groups.get(group).and_then(|entries| entries.get(key))
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LocatorGroup)> {
        self.groups.iter().map(|(name, group)| (name.as_str(), group))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
