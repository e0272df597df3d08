pub mod logging;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use stepdeck_core::{
    config_layers, load_framework_config, FileSources, FrameworkConfig, LocatorEntry,
    LocatorError, LocatorSession, LocatorStore, Platform, ResolvedLocator, RunSettings,
    StrategyName, TextMatcher, VisibilityOption,
};
use thiserror::Error;
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] stepdeck_core::ConfigError),
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("logging setup failed: {0}")]
    Logging(String),
    #[error("{0} health check(s) failed")]
    HealthCheckFailed(usize),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and resolve BDD locator definitions", long_about = None)]
pub struct Cli {
    /// Directory holding common_config.yaml, platforms/ and environments/
    #[arg(long, default_value = "config")]
    pub config_dir: PathBuf,
    /// Environment name; defaults to $ENV, then "dev"
    #[arg(long)]
    pub env: Option<String>,
    /// Target platform; defaults to $PLATFORM, then "web"
    #[arg(long)]
    pub platform: Option<Platform>,
    /// Override locators.selectors_dir
    #[arg(long)]
    pub selectors_dir: Option<PathBuf>,
    /// Override locators.locators_dir
    #[arg(long)]
    pub locators_dir: Option<PathBuf>,
    /// Override locators.strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Log filter (e.g. "debug" or "stepdeck_core=trace"); overrides RUST_LOG
    #[arg(long)]
    pub log_level: Option<String>,
    /// Also write logs to a daily file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Environment,
    Platform,
}

impl From<StrategyArg> for StrategyName {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Environment => StrategyName::Environment,
            StrategyArg::Platform => StrategyName::Platform,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List loaded file-groups
    Groups,
    /// Number of entries per group
    Counts,
    /// Files scanned and loaded
    Sources,
    /// Resolve every entry of a group
    Show(ShowArgs),
    /// Fail unless every key exists in the group
    Validate(ValidateArgs),
    /// Resolve a `{group > key}` selector
    Resolve(ResolveArgs),
    /// Build a visible-text locator
    TextMatcher(TextMatcherArgs),
    /// Check configuration and locator files
    Health,
    /// Print shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub group: String,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    pub group: String,
    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Selector such as "{login > username_input}"
    pub selector: String,
}

#[derive(Args, Debug)]
pub struct TextMatcherArgs {
    /// EQUALS, CONTAINS, STARTS_WITH or ENDS_WITH
    pub option: VisibilityOption,
    pub value: String,
    /// Restrict the search to the element this selector resolves to
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(args.shell, &mut command, "stepdeckctl", &mut io::stdout());
        return Ok(());
    }

    let settings = run_settings(&cli)?;
    let config = load_framework_config(&cli.config_dir, &settings)?;
    let filter = logging::build_filter(cli.log_level.as_deref(), config.logging_level.as_filter())?;
    let _guard = logging::init(filter, cli.log_dir.as_deref())?;
    log_config_layers(&cli.config_dir, &settings);

    let context = AppContext::new(&cli, settings, config);
    execute(&context, &cli.command, cli.format)
}

fn execute(context: &AppContext, command: &Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Groups => render(&context.group_list(), format)?,
        Commands::Counts => render(&context.counts(), format)?,
        Commands::Sources => render(&context.store.file_sources(), format)?,
        Commands::Show(args) => render(&context.show(&args.group), format)?,
        Commands::Validate(args) => render(&context.validate(args)?, format)?,
        Commands::Resolve(args) => render(&context.resolve(&args.selector)?, format)?,
        Commands::TextMatcher(args) => render(&context.text_matcher(args)?, format)?,
        Commands::Health => {
            let report = context.health_check();
            render(&report, format)?;
            let failed = report
                .iter()
                .filter(|entry| matches!(entry.status, CheckStatus::Error))
                .count();
            if failed > 0 {
                return Err(AppError::HealthCheckFailed(failed));
            }
        }
        Commands::Completions(_) => {}
    }
    Ok(())
}

fn run_settings(cli: &Cli) -> Result<RunSettings> {
    let mut settings = RunSettings::from_env()?;
    if let Some(env) = &cli.env {
        settings.environment = env.clone();
    }
    if let Some(platform) = cli.platform {
        settings.platform = platform;
    }
    Ok(settings)
}

/// The config is read before the subscriber exists, so which layers were
/// merged is reported here instead.
fn log_config_layers(config_dir: &Path, settings: &RunSettings) {
    for path in config_layers(config_dir, settings) {
        if path.is_file() {
            debug!(path = %path.display(), "config layer merged");
        } else {
            debug!(path = %path.display(), "config layer not present");
        }
    }
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug)]
struct AppContext {
    config_dir: PathBuf,
    settings: RunSettings,
    config: FrameworkConfig,
    store: Arc<LocatorStore>,
}

impl AppContext {
    fn new(cli: &Cli, settings: RunSettings, mut config: FrameworkConfig) -> Self {
        if let Some(dir) = &cli.selectors_dir {
            config.locators.selectors_dir = dir.clone();
        }
        if let Some(dir) = &cli.locators_dir {
            config.locators.locators_dir = dir.clone();
        }
        if let Some(strategy) = cli.strategy {
            config.locators.strategy = strategy.into();
        }

        let mut session = LocatorSession::new(config.locators.clone(), PathBuf::from("."));
        let store = session.store(settings.platform, &settings.environment);
        debug!(
            platform = %settings.platform,
            environment = %settings.environment,
            groups = store.namespace().len(),
            "locator store ready"
        );

        Self {
            config_dir: cli.config_dir.clone(),
            settings,
            config,
            store,
        }
    }

    fn group_list(&self) -> GroupList {
        GroupList {
            platform: self.settings.platform,
            environment: self.settings.environment.clone(),
            groups: self.store.groups(),
        }
    }

    fn counts(&self) -> CountReport {
        let counts = self.store.selector_counts();
        CountReport {
            total: counts.values().sum(),
            counts,
        }
    }

    fn show(&self, group: &str) -> GroupView {
        let resolver = self.store.resolver();
        let entries = self
            .store
            .get(group)
            .keys()
            .map(|key| {
                let selector = format!("{{{group} > {key}}}");
                match resolver.resolve(&selector) {
                    Ok(locator) => EntryView {
                        key: key.to_string(),
                        locator: Some(locator),
                        error: None,
                    },
                    Err(err) => EntryView {
                        key: key.to_string(),
                        locator: None,
                        error: Some(err.to_string()),
                    },
                }
            })
            .collect();
        GroupView {
            group: group.to_string(),
            entries,
        }
    }

    fn validate(&self, args: &ValidateArgs) -> Result<ValidationReport> {
        self.store.validate_required(&args.group, args.keys.as_slice())?;
        info!(group = %args.group, keys = args.keys.len(), "required selectors present");
        Ok(ValidationReport {
            group: args.group.clone(),
            required: args.keys.clone(),
        })
    }

    fn resolve(&self, selector: &str) -> Result<Resolution> {
        let locator = self.store.resolver().resolve(selector)?;
        Ok(Resolution {
            selector: selector.to_string(),
            locator,
        })
    }

    fn text_matcher(&self, args: &TextMatcherArgs) -> Result<TextMatcher> {
        let matcher = self.store.resolver().build_text_matcher(
            args.option,
            &args.value,
            args.target.as_deref(),
        )?;
        Ok(matcher)
    }

    fn health_check(&self) -> Vec<HealthEntry> {
        let mut results = Vec::new();
        let platform = self.settings.platform;
        let environment = &self.settings.environment;

        results.push(self.check_directory("config dir", &self.config_dir));
        for layer in config_layers(&self.config_dir, &self.settings) {
            results.push(self.check_layer(&layer));
        }

        let directory = self.store.options().directory();
        match fs::metadata(&directory) {
            Ok(meta) if meta.is_dir() => {
                results.push(HealthEntry::ok("locator dir", directory.display().to_string()))
            }
            Ok(_) => results.push(HealthEntry::error(
                "locator dir",
                format!("{} is not a directory", directory.display()),
            )),
            Err(_) => results.push(HealthEntry::error(
                "locator dir",
                format!("{} not found", directory.display()),
            )),
        }

        let groups = self.store.namespace().len();
        if groups == 0 {
            results.push(HealthEntry::warn(
                "groups",
                format!("no groups loaded for {platform}/{environment}"),
            ));
        } else {
            results.push(HealthEntry::ok(
                "groups",
                format!("{groups} group(s) from {} file(s)", self.store.files().len()),
            ));
        }

        for issue in self.store.issues() {
            let name = match issue {
                LocatorError::FileLoad { path, .. } => path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                _ => "locator file".to_string(),
            };
            results.push(HealthEntry::error(name, issue.to_string()));
        }

        for (group, entries) in self.store.namespace().iter() {
            for (key, entry) in entries.iter() {
                if let LocatorEntry::Unusable { reason } = entry {
                    results.push(HealthEntry::warn(format!("{group} > {key}"), reason.clone()));
                }
            }
        }

        if platform == Platform::Web {
            match &self.config.web.base_url {
                Some(url) => results.push(HealthEntry::ok("web.base_url", url.clone())),
                None => results.push(HealthEntry::warn("web.base_url", "not configured")),
            }
        }

        results
    }

    fn check_layer(&self, path: &Path) -> HealthEntry {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if path.is_file() {
            HealthEntry::ok(name, path.display().to_string())
        } else {
            HealthEntry::warn(name, format!("{} absent, layer skipped", path.display()))
        }
    }

    fn check_directory(&self, name: &str, path: &Path) -> HealthEntry {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => HealthEntry::ok(name, path.display().to_string()),
            Ok(_) => HealthEntry::warn(name, format!("{} is not a directory", path.display())),
            Err(_) => HealthEntry::warn(
                name,
                format!("{} not found, using defaults", path.display()),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupList {
    pub platform: Platform,
    pub environment: String,
    pub groups: Vec<String>,
}

impl DisplayFallback for GroupList {
    fn display(&self) -> String {
        if self.groups.is_empty() {
            return format!(
                "No groups loaded ({}/{})",
                self.platform, self.environment
            );
        }
        self.groups.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct CountReport {
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
}

impl DisplayFallback for CountReport {
    fn display(&self) -> String {
        let mut lines = self
            .counts
            .iter()
            .map(|(group, count)| format!("{group}: {count}"))
            .collect::<Vec<_>>();
        lines.push(format!("total: {}", self.total));
        lines.join("\n")
    }
}

impl DisplayFallback for FileSources {
    fn display(&self) -> String {
        let mut lines = vec![
            format!(
                "{} / {} ({} strategy)",
                self.platform, self.environment, self.strategy
            ),
            format!("directory: {}", self.directory.display()),
        ];
        if !self.json_files.is_empty() {
            lines.push(format!("json: {}", self.json_files.join(", ")));
        }
        if !self.yaml_files.is_empty() {
            lines.push(format!("yaml: {}", self.yaml_files.join(", ")));
        }
        if let Some(fallback) = &self.fallback_file {
            lines.push(format!("fallback: {fallback}"));
        }
        lines.push(format!("loaded at: {}", self.loaded_at.to_rfc3339()));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct GroupView {
    pub group: String,
    pub entries: Vec<EntryView>,
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<ResolvedLocator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DisplayFallback for GroupView {
    fn display(&self) -> String {
        if self.entries.is_empty() {
            return format!("Group '{}' has no entries", self.group);
        }
        self.entries
            .iter()
            .map(|entry| match (&entry.locator, &entry.error) {
                (Some(locator), _) => format!("{} | {} | {}", entry.key, locator.kind, locator.value),
                (None, Some(error)) => format!("{} | unusable | {}", entry.key, error),
                (None, None) => entry.key.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub group: String,
    pub required: Vec<String>,
}

impl DisplayFallback for ValidationReport {
    fn display(&self) -> String {
        format!(
            "All {} required selector(s) present in '{}'",
            self.required.len(),
            self.group
        )
    }
}

#[derive(Debug, Serialize)]
pub struct Resolution {
    pub selector: String,
    pub locator: ResolvedLocator,
}

impl DisplayFallback for Resolution {
    fn display(&self) -> String {
        let (using, value) = self.locator.as_pair();
        format!("{using}\t{value}")
    }
}

impl DisplayFallback for TextMatcher {
    fn display(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}\nwithin {}", self.locator, scope),
            None => self.locator.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthEntry {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub enum CheckStatus {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckStatus::Ok => "OK",
            CheckStatus::Warn => "WARN",
            CheckStatus::Error => "ERROR",
        };
        write!(f, "{}", label)
    }
}

impl HealthEntry {
    fn ok(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Ok,
            detail: detail.into(),
        }
    }

    fn warn(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warn,
            detail: detail.into(),
        }
    }

    fn error(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Error,
            detail: detail.into(),
        }
    }
}

impl DisplayFallback for Vec<HealthEntry> {
    fn display(&self) -> String {
        self.iter()
            .map(|entry| format!("[{}] {}: {}", entry.status, entry.name, entry.detail))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn prepare_test_context(extra_args: &[&str]) -> (TempDir, AppContext) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let config_dir = root.join("config");
        fs::create_dir_all(config_dir.join("environments")).unwrap();
        fs::write(
            config_dir.join("common_config.yaml"),
            "logging_level: DEBUG\nweb:\n  default_timeout: 15\n",
        )
        .unwrap();
        fs::write(
            config_dir.join("environments/qa.yaml"),
            "web:\n  base_url: https://qa.example.com\n",
        )
        .unwrap();

        let selectors = root.join("selectors");
        fs::create_dir_all(&selectors).unwrap();
        fs::write(
            selectors.join("login_qa.yaml"),
            "login:\n  username_input: '#username'\n  password_input: {type: id, value: password}\n  legacy: {type: css}\n",
        )
        .unwrap();
        fs::write(selectors.join("home_qa.json"), "{ not json").unwrap();

        let mut args = vec![
            "stepdeckctl".to_string(),
            "--config-dir".to_string(),
            config_dir.display().to_string(),
            "--selectors-dir".to_string(),
            selectors.display().to_string(),
            "--env".to_string(),
            "qa".to_string(),
            "--platform".to_string(),
            "web".to_string(),
        ];
        args.extend(extra_args.iter().map(|arg| arg.to_string()));
        args.push("groups".to_string());
        let cli = Cli::try_parse_from(args).unwrap();

        let settings = run_settings(&cli).unwrap();
        let config = load_framework_config(&cli.config_dir, &settings).unwrap();
        let context = AppContext::new(&cli, settings, config);
        (temp, context)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn groups_and_counts_reflect_loaded_files() {
        let (_temp, context) = prepare_test_context(&[]);
        assert_eq!(context.group_list().groups, vec!["login"]);
        let counts = context.counts();
        assert_eq!(counts.total, 3);
        assert_eq!(context.config.web.default_timeout, 15);
    }

    #[test]
    fn show_reports_unusable_entries() {
        let (_temp, context) = prepare_test_context(&[]);
        let view = context.show("login");
        let legacy = view
            .entries
            .iter()
            .find(|entry| entry.key == "legacy")
            .unwrap();
        assert!(legacy.locator.is_none());
        let password = view
            .entries
            .iter()
            .find(|entry| entry.key == "password_input")
            .unwrap();
        assert_eq!(
            password.locator.as_ref().unwrap().as_pair(),
            ("id", "password")
        );
    }

    #[test]
    fn validate_fails_on_missing_keys() {
        let (_temp, context) = prepare_test_context(&[]);
        let args = ValidateArgs {
            group: "login".into(),
            keys: vec!["username_input".into(), "remember_me".into()],
        };
        let err = context.validate(&args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "required selectors missing for 'login': remember_me"
        );
    }

    #[test]
    fn text_matcher_scoped_to_target() {
        let (_temp, context) = prepare_test_context(&[]);
        let matcher = context
            .text_matcher(&TextMatcherArgs {
                option: VisibilityOption::StartsWith,
                value: "Sign".into(),
                target: Some("{login > username_input}".into()),
            })
            .unwrap();
        assert_eq!(matcher.scope, Some(ResolvedLocator::css("#username")));
    }

    #[test]
    fn health_flags_broken_files() {
        let (_temp, context) = prepare_test_context(&[]);
        let report = context.health_check();
        let broken = report
            .iter()
            .find(|entry| entry.name == "home_qa.json")
            .unwrap();
        assert!(matches!(broken.status, CheckStatus::Error));
        let base_url = report
            .iter()
            .find(|entry| entry.name == "web.base_url")
            .unwrap();
        assert!(matches!(base_url.status, CheckStatus::Ok));
        assert!(report
            .iter()
            .any(|entry| entry.name == "login > legacy" && matches!(entry.status, CheckStatus::Warn)));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn config_layers_are_logged_after_subscriber_setup() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("common_config.yaml"), "logging_level: DEBUG\n").unwrap();
        let settings = RunSettings {
            environment: "qa".into(),
            platform: Platform::Web,
        };

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            log_config_layers(temp.path(), &settings)
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let merged = output
            .lines()
            .find(|line| line.contains("config layer merged"))
            .unwrap();
        assert!(merged.contains("common_config.yaml"));
        let skipped: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("config layer not present"))
            .collect();
        assert_eq!(skipped.len(), 2);
        assert!(skipped.iter().any(|line| line.contains("web_config.yaml")));
        assert!(skipped.iter().any(|line| line.contains("qa.yaml")));
    }

    #[test]
    fn platform_strategy_override() {
        let (_temp, context) = prepare_test_context(&["--strategy", "platform"]);
        assert_eq!(context.store.options().strategy.name(), "platform");
        assert!(context.group_list().groups.is_empty());
    }
}
