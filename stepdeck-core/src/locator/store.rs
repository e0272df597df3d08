use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::platform::Platform;

use super::entry::{LocatorGroup, LocatorNamespace};
use super::error::{LocatorError, LocatorResult};
use super::resolver::SelectorResolver;

const FALLBACK_FILES: [&str; 3] = ["selectors.json", "selectors.yaml", "selectors.yml"];

/// Where locator files are discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LoadStrategy {
    /// `<selectors_dir>/<group>_<env>.{json,yaml,yml}`, falling back to
    /// `<selectors_dir>/selectors.{json,yaml,yml}`.
    EnvironmentSuffixed { selectors_dir: PathBuf },
    /// Legacy layout: every `<locators_dir>/<platform>/<group>.yaml`.
    PlatformDirectory { locators_dir: PathBuf },
}

impl LoadStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            LoadStrategy::EnvironmentSuffixed { .. } => "environment",
            LoadStrategy::PlatformDirectory { .. } => "platform",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOptions {
    pub platform: Platform,
    pub environment: String,
    pub strategy: LoadStrategy,
}

impl LoadOptions {
    pub fn environment_suffixed(
        platform: Platform,
        environment: impl Into<String>,
        selectors_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform,
            environment: environment.into(),
            strategy: LoadStrategy::EnvironmentSuffixed {
                selectors_dir: selectors_dir.into(),
            },
        }
    }

    pub fn platform_directory(
        platform: Platform,
        environment: impl Into<String>,
        locators_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform,
            environment: environment.into(),
            strategy: LoadStrategy::PlatformDirectory {
                locators_dir: locators_dir.into(),
            },
        }
    }

    /// Directory the strategy scans.
    pub fn directory(&self) -> PathBuf {
        match &self.strategy {
            LoadStrategy::EnvironmentSuffixed { selectors_dir } => selectors_dir.clone(),
            LoadStrategy::PlatformDirectory { locators_dir } => {
                locators_dir.join(self.platform.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }

    fn parse(&self, content: &str) -> Result<Value, String> {
        match self {
            FileFormat::Json => serde_json::from_str(content).map_err(|err| err.to_string()),
            FileFormat::Yaml => serde_yaml::from_str(content).map_err(|err| err.to_string()),
        }
    }
}

/// A definition file that contributed to the namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedFile {
    pub group: Option<String>,
    pub path: PathBuf,
    pub format: FileFormat,
}

/// Debug view of what the store scanned and loaded.
#[derive(Debug, Clone, Serialize)]
pub struct FileSources {
    pub platform: Platform,
    pub environment: String,
    pub strategy: &'static str,
    pub directory: PathBuf,
    pub json_files: Vec<String>,
    pub yaml_files: Vec<String>,
    pub fallback_file: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

/// Locator definitions for one platform and environment.
///
/// Built once per test session (see [`super::LocatorSession`]) and read-only
/// afterwards; [`LocatorStore::reload`] is the only mutation.
#[derive(Debug, Clone)]
pub struct LocatorStore {
    options: LoadOptions,
    namespace: LocatorNamespace,
    files: Vec<LoadedFile>,
    issues: Vec<LocatorError>,
    loaded_at: DateTime<Utc>,
    empty: LocatorGroup,
}

impl LocatorStore {
    /// Scans and parses definition files. Unreadable or malformed files are
    /// logged, recorded in [`LocatorStore::issues`] and skipped.
    pub fn load(options: LoadOptions) -> Self {
        let scan = match &options.strategy {
            LoadStrategy::EnvironmentSuffixed { selectors_dir } => {
                scan_environment_suffixed(selectors_dir, &options.environment)
            }
            LoadStrategy::PlatformDirectory { .. } => scan_platform_directory(&options.directory()),
        };
        info!(
            platform = %options.platform,
            environment = %options.environment,
            strategy = options.strategy.name(),
            groups = scan.namespace.len(),
            skipped = scan.issues.len(),
            "locator namespace loaded"
        );
        Self {
            options,
            namespace: scan.namespace,
            files: scan.files,
            issues: scan.issues,
            loaded_at: Utc::now(),
            empty: LocatorGroup::new(),
        }
    }

    /// Wraps an already built namespace, e.g. for tests.
    pub fn from_namespace(
        platform: Platform,
        environment: impl Into<String>,
        namespace: LocatorNamespace,
    ) -> Self {
        Self {
            options: LoadOptions {
                platform,
                environment: environment.into(),
                strategy: LoadStrategy::EnvironmentSuffixed {
                    selectors_dir: PathBuf::new(),
                },
            },
            namespace,
            files: Vec::new(),
            issues: Vec::new(),
            loaded_at: Utc::now(),
            empty: LocatorGroup::new(),
        }
    }

    /// Re-scans the files with the same options. Meant for interactive use
    /// while editing locator files, not for test execution.
    pub fn reload(&mut self) -> &LocatorNamespace {
        *self = Self::load(self.options.clone());
        &self.namespace
    }

    pub fn resolver(&self) -> SelectorResolver<'_> {
        SelectorResolver::new(self)
    }

    /// Entries for `group`; empty when the group was never loaded.
    pub fn get(&self, group: &str) -> &LocatorGroup {
        self.namespace.group(group).unwrap_or(&self.empty)
    }

    pub fn validate_required<S: AsRef<str>>(&self, group: &str, required: &[S]) -> LocatorResult<()> {
        let entries = self.get(group);
        let missing = required
            .iter()
            .map(|key| key.as_ref())
            .filter(|key| !entries.contains_key(key))
            .map(str::to_string)
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LocatorError::MissingSelectors {
                group: group.to_string(),
                missing,
            })
        }
    }

    pub fn groups(&self) -> Vec<String> {
        self.namespace.group_names().map(str::to_string).collect()
    }

    pub fn selector_counts(&self) -> BTreeMap<String, usize> {
        self.namespace
            .iter()
            .map(|(name, group)| (name.to_string(), group.len()))
            .collect()
    }

    pub fn file_sources(&self) -> FileSources {
        let base_name = |file: &LoadedFile| {
            file.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let mut json_files = Vec::new();
        let mut yaml_files = Vec::new();
        let mut fallback_file = None;
        for file in &self.files {
            if file.group.is_none() {
                fallback_file = Some(base_name(file));
                continue;
            }
            match file.format {
                FileFormat::Json => json_files.push(base_name(file)),
                FileFormat::Yaml => yaml_files.push(base_name(file)),
            }
        }
        FileSources {
            platform: self.options.platform,
            environment: self.options.environment.clone(),
            strategy: self.options.strategy.name(),
            directory: self.options.directory(),
            json_files,
            yaml_files,
            fallback_file,
            loaded_at: self.loaded_at,
        }
    }

    pub fn namespace(&self) -> &LocatorNamespace {
        &self.namespace
    }

    pub fn files(&self) -> &[LoadedFile] {
        &self.files
    }

    /// Files skipped during the last load.
    pub fn issues(&self) -> &[LocatorError] {
        &self.issues
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn platform(&self) -> Platform {
        self.options.platform
    }

    pub fn environment(&self) -> &str {
        &self.options.environment
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

#[derive(Debug, Default)]
struct Scan {
    namespace: LocatorNamespace,
    files: Vec<LoadedFile>,
    issues: Vec<LocatorError>,
}

impl Scan {
    fn skip(&mut self, path: &Path, reason: String) {
        error!(path = %path.display(), %reason, "skipping locator file");
        self.issues.push(LocatorError::FileLoad {
            path: path.to_path_buf(),
            reason,
        });
    }

    fn load_group(&mut self, group: String, path: PathBuf, format: FileFormat) {
        info!(group = %group, path = %path.display(), "loading selectors");
        let decoded = read_document(&path, format)
            .and_then(|document| LocatorGroup::from_document(&group, document));
        match decoded {
            Ok(entries) => {
                if self.namespace.insert_group(group.clone(), entries).is_some() {
                    warn!(
                        group = %group,
                        path = %path.display(),
                        "group defined by more than one file, keeping the last"
                    );
                }
                self.files.push(LoadedFile {
                    group: Some(group),
                    path,
                    format,
                });
            }
            Err(reason) => self.skip(&path, reason),
        }
    }
}

fn read_document(path: &Path, format: FileFormat) -> Result<Value, String> {
    let content = fs::read_to_string(path).map_err(|err| err.to_string())?;
    format.parse(&content)
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "locator directory not found");
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

fn scan_environment_suffixed(dir: &Path, environment: &str) -> Scan {
    let mut scan = Scan::default();
    let files = list_files(dir);

    let mut matched = Vec::new();
    for extension in ["json", "yaml", "yml"] {
        let suffix = format!("_{environment}.{extension}");
        for path in &files {
            let Some(name) = file_name(path) else { continue };
            if let Some(group) = name.strip_suffix(suffix.as_str()) {
                if !group.is_empty() {
                    let format = if extension == "json" {
                        FileFormat::Json
                    } else {
                        FileFormat::Yaml
                    };
                    matched.push((group.to_string(), path.clone(), format));
                }
            }
        }
    }

    if matched.is_empty() {
        warn!(
            dir = %dir.display(),
            "no selector files matching *_{environment}.json or *_{environment}.yaml/yml"
        );
        load_fallback(&mut scan, dir);
        return scan;
    }

    for (group, path, format) in matched {
        scan.load_group(group, path, format);
    }
    scan
}

fn load_fallback(scan: &mut Scan, dir: &Path) {
    for name in FALLBACK_FILES {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        let Some(format) = FileFormat::from_path(&path) else { continue };
        info!(path = %path.display(), "using fallback selector file");
        match read_document(&path, format).and_then(LocatorNamespace::from_document) {
            Ok(namespace) => {
                scan.namespace = namespace;
                scan.files.push(LoadedFile {
                    group: None,
                    path,
                    format,
                });
                return;
            }
            Err(reason) => scan.skip(&path, reason),
        }
    }
}

fn scan_platform_directory(dir: &Path) -> Scan {
    let mut scan = Scan::default();
    for path in list_files(dir) {
        let Some(format @ FileFormat::Yaml) = FileFormat::from_path(&path) else {
            continue;
        };
        let Some(group) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        scan.load_group(group.to_string(), path.clone(), format);
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn environment_suffix_is_stripped_from_group_names() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "login_dev.yaml", "username_input: '#username'\n");
        write(dir.path(), "checkout_dev.json", r##"{"pay": "#pay"}"##);
        write(dir.path(), "login_qa.yaml", "username_input: '#qa-username'\n");

        let store = LocatorStore::load(LoadOptions::environment_suffixed(
            Platform::Web,
            "dev",
            dir.path(),
        ));
        assert_eq!(store.groups(), vec!["checkout", "login"]);
        let sources = store.file_sources();
        assert_eq!(sources.json_files, vec!["checkout_dev.json"]);
        assert_eq!(sources.yaml_files, vec!["login_dev.yaml"]);
        assert!(sources.fallback_file.is_none());
    }

    #[test]
    fn fallback_file_used_when_no_environment_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "selectors.yaml",
            "login:\n  username_input: '#username'\nhome:\n  banner: '.banner'\n",
        );
        let store = LocatorStore::load(LoadOptions::environment_suffixed(
            Platform::Web,
            "prod",
            dir.path(),
        ));
        assert_eq!(store.selector_counts().get("login"), Some(&1));
        assert_eq!(
            store.file_sources().fallback_file.as_deref(),
            Some("selectors.yaml")
        );
    }

    #[test]
    fn missing_directory_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocatorStore::load(LoadOptions::environment_suffixed(
            Platform::Web,
            "dev",
            dir.path().join("absent"),
        ));
        assert!(store.namespace().is_empty());
        assert!(store.issues().is_empty());
        assert!(store.get("login").is_empty());
    }

    #[test]
    fn platform_directory_loads_yaml_only() {
        let dir = tempfile::tempdir().unwrap();
        let mobile = dir.path().join("mobile");
        fs::create_dir_all(&mobile).unwrap();
        write(&mobile, "login.yaml", "username: {type: accessibility id, value: user}\n");
        write(&mobile, "notes.txt", "ignored");
        write(&mobile, "cart.json", r##"{"total": "#total"}"##);

        let store = LocatorStore::load(LoadOptions::platform_directory(
            Platform::Mobile,
            "dev",
            dir.path(),
        ));
        assert_eq!(store.groups(), vec!["login"]);
    }

    #[test]
    fn reload_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "login_dev.yaml", "a: '#a'\n");
        let mut store = LocatorStore::load(LoadOptions::environment_suffixed(
            Platform::Web,
            "dev",
            dir.path(),
        ));
        assert_eq!(store.groups().len(), 1);
        write(dir.path(), "home_dev.yml", "b: '#b'\n");
        assert_eq!(store.groups().len(), 1);
        assert_eq!(store.reload().len(), 2);
    }
}
