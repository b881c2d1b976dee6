//! Page model: a web page with named selectors.

use std::fmt;

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Locator strategy for a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    Xpath,
    Css,
    Id,
    Name,
    Text,
}

impl SelectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xpath => "xpath",
            Self::Css => "css",
            Self::Id => "id",
            Self::Name => "name",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named locator definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(rename = "type")]
    pub kind: SelectorKind,
    pub value: String,
}

impl Selector {
    pub fn new(kind: SelectorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Locator string understood by the runner's `page.locator()`.
    pub fn locator(&self) -> String {
        match self.kind {
            SelectorKind::Css => self.value.clone(),
            SelectorKind::Xpath => format!("xpath={}", self.value),
            SelectorKind::Id => format!("#{}", self.value),
            SelectorKind::Name => format!("[name=\"{}\"]", self.value),
            SelectorKind::Text => format!("text={}", self.value),
        }
    }
}

/// Selectors keyed by name, kept in declaration order.
///
/// Deserializes from a JSON object and rejects duplicate keys, so iteration
/// order always matches the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorMap {
    entries: Vec<(String, Selector)>,
}

impl SelectorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a selector. Fails if the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, selector: Selector) -> AppResult<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(AppError::InvalidInput(format!(
                "Duplicate selector name '{}'",
                name
            )));
        }
        self.entries.push((name, selector));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Selector> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, selector)| selector)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.entries.iter().map(|(key, sel)| (key.as_str(), sel))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SelectorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, selector) in &self.entries {
            map.serialize_entry(key, selector)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SelectorMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SelectorMapVisitor;

        impl<'de> Visitor<'de> for SelectorMapVisitor {
            type Value = SelectorMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of selector name to {type, value}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SelectorMap, A::Error> {
                let mut map = SelectorMap::new();
                while let Some((name, selector)) = access.next_entry::<String, Selector>()? {
                    map.insert(name, selector).map_err(serde::de::Error::custom)?;
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(SelectorMapVisitor)
    }
}

/// Element condition a page waits for before it counts as loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitCondition {
    pub selector: String,
    /// visible, clickable, present or hidden
    pub condition: String,
    /// Seconds
    #[serde(default = "default_wait_timeout")]
    pub timeout: u32,
}

fn default_wait_timeout() -> u32 {
    30
}

impl WaitCondition {
    /// Map the condition onto a Playwright `waitFor` state.
    pub fn state(&self) -> AppResult<&'static str> {
        match self.condition.as_str() {
            "visible" | "clickable" => Ok("visible"),
            "present" => Ok("attached"),
            "hidden" => Ok("hidden"),
            other => Err(AppError::InvalidInput(format!(
                "Unknown wait condition '{}' for selector '{}'",
                other, self.selector
            ))),
        }
    }
}

/// Page snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub name: String,
    pub url_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub selectors: SelectorMap,
    /// Checked in declaration order by the generated `waitUntilReady()`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wait_conditions: Vec<WaitCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_selector: Option<String>,
}

impl Page {
    /// Create a page with no selectors.
    pub fn new(name: impl Into<String>, url_pattern: impl Into<String>) -> Self {
        Page {
            id: Uuid::now_v7(),
            name: name.into(),
            url_pattern: url_pattern.into(),
            description: None,
            selectors: SelectorMap::new(),
            wait_conditions: Vec::new(),
            iframe_selector: None,
        }
    }

    /// Builder-style selector insertion.
    pub fn with_selector(
        mut self,
        name: impl Into<String>,
        selector: Selector,
    ) -> AppResult<Self> {
        self.selectors.insert(name, selector)?;
        Ok(self)
    }

    /// Check the invariants a page must satisfy before compilation.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Page name must not be empty".to_string()));
        }
        validate_url_pattern(&self.url_pattern)?;
        for (name, selector) in self.selectors.iter() {
            if name.is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "Page '{}' has a selector with an empty name",
                    self.name
                )));
            }
            if selector.value.is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "Selector '{}' on page '{}' has an empty value",
                    name, self.name
                )));
            }
        }
        for condition in &self.wait_conditions {
            condition.state()?;
        }
        Ok(())
    }
}

/// Accept `http://`, `https://` or `*` prefixed patterns that compile as a
/// regex once every `*` becomes `.*`.
pub fn validate_url_pattern(pattern: &str) -> AppResult<()> {
    if !(pattern.starts_with("http://")
        || pattern.starts_with("https://")
        || pattern.starts_with('*'))
    {
        return Err(AppError::InvalidInput(format!(
            "URL pattern '{}' must start with http://, https:// or *",
            pattern
        )));
    }

    Regex::new(&pattern.replace('*', ".*")).map_err(|e| {
        AppError::InvalidInput(format!("URL pattern '{}' is not a valid regex: {}", pattern, e))
    })?;

    Ok(())
}
