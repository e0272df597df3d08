pub mod config;
pub mod driver;
pub mod error;
pub mod locator;
pub mod platform;
pub mod steps;

pub use config::{
    config_layers, load_framework_config, ApiSection, BrowserSection, FrameworkConfig,
    LocatorSection, LoggingLevel, MobileSection, RunSettings, StrategyName, WebSection,
};
pub use driver::{ChromiumDriver, ElementDriver};
pub use error::{ConfigError, Result};
pub use locator::{
    FileSources, LoadOptions, LoadStrategy, LocatorEntry, LocatorError, LocatorGroup, LocatorKind,
    LocatorNamespace, LocatorResult, LocatorSession, LocatorStore, ResolvedLocator,
    SelectorResolver, SymbolicSelector, TextMatcher, VisibilityOption,
};
pub use platform::{Platform, UnknownPlatform};
pub use steps::{selector_keys, ClickStep, StepCondition, VisibleTextStep};
