//! Runner project configuration and generation outputs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::error::{AppError, AppResult};

use super::execution::BrowserType;

/// Development default values for generated runner configuration.
pub mod defaults {
    pub const TIMEOUT_MS: u64 = 30_000;
    pub const RETRIES: u32 = 2;
    pub const HEADLESS: bool = true;
    pub const VIEWPORT_WIDTH: u32 = 1280;
    pub const VIEWPORT_HEIGHT: u32 = 720;
    pub const JSON_REPORT_FILE: &str = "test-results.json";
}

/// Browser viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// When the runner captures screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenshotMode {
    Off,
    On,
    OnlyOnFailure,
}

impl ScreenshotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
            Self::OnlyOnFailure => "only-on-failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(Self::Off),
            "on" => Some(Self::On),
            "only-on-failure" => Some(Self::OnlyOnFailure),
            _ => None,
        }
    }
}

/// Reporter entry, e.g. `['json', { outputFile: 'test-results.json' }]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reporter {
    pub name: String,
    #[serde(default)]
    pub options: Map<String, JsonValue>,
}

impl Reporter {
    pub fn new(name: impl Into<String>) -> Self {
        Reporter {
            name: name.into(),
            options: Map::new(),
        }
    }

    fn from_json(value: &JsonValue) -> AppResult<Self> {
        match value {
            JsonValue::String(name) => Ok(Reporter::new(name.clone())),
            JsonValue::Array(parts) => {
                let name = parts.first().and_then(JsonValue::as_str).ok_or_else(|| {
                    AppError::InvalidInput("reporter entry must start with a name".to_string())
                })?;
                let options = match parts.get(1) {
                    None => Map::new(),
                    Some(JsonValue::Object(map)) => map.clone(),
                    Some(_) => {
                        return Err(AppError::InvalidInput(format!(
                            "reporter '{}' options must be an object",
                            name
                        )));
                    }
                };
                Ok(Reporter {
                    name: name.to_string(),
                    options,
                })
            }
            other => Err(AppError::InvalidInput(format!(
                "reporter entry must be a string or [name, options], got {}",
                other
            ))),
        }
    }
}

/// Merged runner configuration for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Per-test timeout in milliseconds
    pub timeout: u64,
    pub retries: u32,
    pub headless: bool,
    pub viewport: Viewport,
    pub screenshot: ScreenshotMode,
    pub reporter: Vec<Reporter>,
    /// One runner project is emitted per browser.
    pub browsers: Vec<BrowserType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let mut json = Reporter::new("json");
        json.options.insert(
            "outputFile".to_string(),
            JsonValue::String(defaults::JSON_REPORT_FILE.to_string()),
        );

        GenerationConfig {
            timeout: defaults::TIMEOUT_MS,
            retries: defaults::RETRIES,
            headless: defaults::HEADLESS,
            viewport: Viewport {
                width: defaults::VIEWPORT_WIDTH,
                height: defaults::VIEWPORT_HEIGHT,
            },
            screenshot: ScreenshotMode::OnlyOnFailure,
            reporter: vec![Reporter::new("html"), json],
            browsers: vec![BrowserType::Chromium],
            workers: None,
        }
    }
}

impl GenerationConfig {
    /// Defaults overlaid by each bag in order; later bags win.
    pub fn merged<'a>(
        bags: impl IntoIterator<Item = &'a Map<String, JsonValue>>,
    ) -> AppResult<Self> {
        let mut config = GenerationConfig::default();
        for bag in bags {
            config.overlay(bag)?;
        }
        Ok(config)
    }

    /// Apply recognised keys from a key/value bag.
    pub fn overlay(&mut self, bag: &Map<String, JsonValue>) -> AppResult<()> {
        for (key, value) in bag {
            match key.as_str() {
                "timeout" => self.timeout = expect_u64(key, value)?,
                "retries" => self.retries = expect_u32(key, value)?,
                "headless" => {
                    self.headless = value.as_bool().ok_or_else(|| type_error(key, "a boolean"))?
                }
                "viewport" => {
                    self.viewport = serde_json::from_value(value.clone())
                        .map_err(|_| type_error(key, "{width, height}"))?
                }
                "screenshot" => {
                    self.screenshot = value
                        .as_str()
                        .and_then(ScreenshotMode::parse)
                        .ok_or_else(|| type_error(key, "off, on or only-on-failure"))?
                }
                "reporter" => {
                    let entries = value
                        .as_array()
                        .ok_or_else(|| type_error(key, "a list of reporters"))?;
                    self.reporter = entries
                        .iter()
                        .map(Reporter::from_json)
                        .collect::<AppResult<_>>()?;
                }
                "browsers" => {
                    let browsers: Vec<BrowserType> = serde_json::from_value(value.clone())
                        .map_err(|_| type_error(key, "a list of chromium, firefox or webkit"))?;
                    if browsers.is_empty() {
                        return Err(type_error(key, "a non-empty list"));
                    }
                    self.browsers = browsers;
                }
                "workers" => self.workers = Some(expect_u32(key, value)?),
                other => debug!("Ignoring unrecognised configuration key '{}'", other),
            }
        }
        Ok(())
    }
}

fn type_error(key: &str, expected: &str) -> AppError {
    AppError::InvalidInput(format!("configuration '{}' must be {}", key, expected))
}

fn expect_u64(key: &str, value: &JsonValue) -> AppResult<u64> {
    value.as_u64().ok_or_else(|| type_error(key, "a non-negative integer"))
}

fn expect_u32(key: &str, value: &JsonValue) -> AppResult<u32> {
    expect_u64(key, value).and_then(|v| u32::try_from(v).map_err(|_| type_error(key, "a 32-bit integer")))
}

/// Paths written by one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedProject {
    pub root: PathBuf,
    /// Page objects, specs and helpers
    pub files: Vec<PathBuf>,
    /// Runner configuration artifact set
    pub config_files: Vec<PathBuf>,
    /// Spec files only, in suite order
    #[serde(skip)]
    pub spec_files: Vec<PathBuf>,
}

impl GeneratedProject {
    /// Generated file paths followed by config file paths.
    pub fn all_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .chain(self.config_files.iter())
            .cloned()
            .collect()
    }
}
