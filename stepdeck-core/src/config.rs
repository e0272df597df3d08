use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, Result};
use crate::locator::LoadOptions;
use crate::platform::Platform;

pub const DEFAULT_ENVIRONMENT: &str = "dev";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub logging_level: LoggingLevel,
    pub locators: LocatorSection,
    pub web: WebSection,
    pub mobile: MobileSection,
    pub api: ApiSection,
}

impl FrameworkConfig {
    pub fn validate(&self) -> Result<()> {
        check_url("web.base_url", self.web.base_url.as_deref())?;
        check_url("api.base_url", self.api.base_url.as_deref())?;
        if self.web.default_timeout == 0 {
            return Err(ConfigError::Invalid {
                field: "web.default_timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

fn check_url(field: &str, value: Option<&str>) -> Result<()> {
    if let Some(value) = value {
        Url::parse(value).map_err(|err| ConfigError::Invalid {
            field: field.to_string(),
            reason: format!("'{value}' is not a valid URL: {err}"),
        })?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoggingLevel {
    #[serde(alias = "debug")]
    Debug,
    #[default]
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "WARN", alias = "warn", alias = "warning")]
    Warning,
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "critical")]
    Critical,
}

impl LoggingLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LoggingLevel::Debug => "debug",
            LoggingLevel::Info => "info",
            LoggingLevel::Warning => "warn",
            LoggingLevel::Error | LoggingLevel::Critical => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyName {
    #[default]
    Environment,
    Platform,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocatorSection {
    pub strategy: StrategyName,
    pub selectors_dir: PathBuf,
    pub locators_dir: PathBuf,
}

impl Default for LocatorSection {
    fn default() -> Self {
        Self {
            strategy: StrategyName::Environment,
            selectors_dir: PathBuf::from("selectors"),
            locators_dir: PathBuf::from("locators"),
        }
    }
}

impl LocatorSection {
    /// Load options for one platform/environment; relative directories are
    /// taken from `base_dir`.
    pub fn load_options(
        &self,
        platform: Platform,
        environment: &str,
        base_dir: &Path,
    ) -> LoadOptions {
        match self.strategy {
            StrategyName::Environment => LoadOptions::environment_suffixed(
                platform,
                environment,
                resolve_path(base_dir, &self.selectors_dir),
            ),
            StrategyName::Platform => LoadOptions::platform_directory(
                platform,
                environment,
                resolve_path(base_dir, &self.locators_dir),
            ),
        }
    }
}

pub fn resolve_path<P: AsRef<Path>>(base_dir: &Path, candidate: P) -> PathBuf {
    let path = candidate.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSection {
    pub base_url: Option<String>,
    /// Seconds.
    pub default_timeout: u64,
    pub browser: BrowserSection,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            base_url: None,
            default_timeout: 30,
            browser: BrowserSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserSection {
    pub default: String,
    pub headless: bool,
    pub executable_path: Option<PathBuf>,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            default: "chrome".into(),
            headless: true,
            executable_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MobileSection {
    pub platform_name: Option<String>,
    pub device_name: Option<String>,
    pub app: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub timeout: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: 30,
        }
    }
}

/// Environment and platform for a run, as chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub environment: String,
    pub platform: Platform,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            platform: Platform::Web,
        }
    }
}

impl RunSettings {
    /// Reads `ENV` and `PLATFORM` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENV")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        let platform = match lookup("PLATFORM") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => Platform::Web,
        };
        Ok(Self {
            environment,
            platform,
        })
    }
}

/// Layer files in merge order: `common_config.yaml`, then
/// `platforms/<platform>_config.yaml`, then `environments/<environment>.yaml`.
pub fn config_layers(config_dir: &Path, settings: &RunSettings) -> [PathBuf; 3] {
    [
        config_dir.join("common_config.yaml"),
        config_dir
            .join("platforms")
            .join(format!("{}_config.yaml", settings.platform)),
        config_dir
            .join("environments")
            .join(format!("{}.yaml", settings.environment)),
    ]
}

/// Merges the [`config_layers`] found in `config_dir`. Missing layers are
/// skipped. Later layers win; when both sides of a key are mappings they are
/// merged one level deep.
pub fn load_framework_config<P: AsRef<Path>>(
    config_dir: P,
    settings: &RunSettings,
) -> Result<FrameworkConfig> {
    let config_dir = config_dir.as_ref();
    let mut merged = Mapping::new();
    for path in &config_layers(config_dir, settings) {
        if !path.is_file() {
            debug!(path = %path.display(), "config layer not present");
            continue;
        }
        let layer: Value = load_yaml(path)?;
        match layer {
            Value::Null => {}
            Value::Mapping(layer) => merge_layer(&mut merged, layer),
            _ => return Err(ConfigError::NotAMapping { path: path.clone() }),
        }
    }

    let config: FrameworkConfig =
        serde_yaml::from_value(Value::Mapping(merged)).map_err(|source| ConfigError::Parse {
            source,
            path: config_dir.to_path_buf(),
        })?;
    config.validate()?;
    Ok(config)
}

fn merge_layer(base: &mut Mapping, layer: Mapping) {
    for (key, incoming) in layer {
        match (base.get_mut(&key), incoming) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                for (inner_key, inner_value) in incoming {
                    existing.insert(inner_key, inner_value);
                }
            }
            (_, incoming) => {
                base.insert(key, incoming);
            }
        }
    }
}

fn load_yaml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
