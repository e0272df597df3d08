mod chromium;

use async_trait::async_trait;

use crate::locator::{LocatorResult, ResolvedLocator};

pub use chromium::{count_script, ChromiumDriver};

/// Live-document access needed to check a locator.
#[async_trait]
pub trait ElementDriver: Send + Sync {
    /// Number of elements `locator` selects, searched below the first element
    /// matching `scope` when one is given. A scope that matches nothing counts
    /// as zero.
    async fn count_matches(
        &self,
        locator: &ResolvedLocator,
        scope: Option<&ResolvedLocator>,
    ) -> LocatorResult<usize>;
}
