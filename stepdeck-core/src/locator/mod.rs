mod entry;
mod error;
mod resolver;
mod selector;
mod session;
mod store;
mod text;

pub use entry::{LocatorEntry, LocatorGroup, LocatorKind, LocatorNamespace};
pub use error::{LocatorError, LocatorResult};
pub use resolver::{ResolvedLocator, SelectorResolver};
pub use selector::SymbolicSelector;
pub use session::LocatorSession;
pub use store::{FileFormat, FileSources, LoadOptions, LoadStrategy, LoadedFile, LocatorStore};
pub(crate) use text::text_xpath;
pub use text::{xpath_literal, TextMatcher, VisibilityOption};
