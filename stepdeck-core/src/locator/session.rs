use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::LocatorSection;
use crate::platform::Platform;

use super::store::LocatorStore;

/// Session-wide cache of loaded stores, one per platform and environment.
///
/// Files are read the first time a pair is requested; later calls share the
/// same [`LocatorStore`].
#[derive(Debug)]
pub struct LocatorSession {
    section: LocatorSection,
    base_dir: PathBuf,
    stores: HashMap<(Platform, String), Arc<LocatorStore>>,
}

impl LocatorSession {
    pub fn new(section: LocatorSection, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            section,
            base_dir: base_dir.into(),
            stores: HashMap::new(),
        }
    }

    pub fn store(&mut self, platform: Platform, environment: &str) -> Arc<LocatorStore> {
        let key = (platform, environment.to_string());
        if let Some(store) = self.stores.get(&key) {
            return Arc::clone(store);
        }
        debug!(%platform, environment, "loading locator store for session");
        let options = self
            .section
            .load_options(platform, environment, &self.base_dir);
        let store = Arc::new(LocatorStore::load(options));
        self.stores.insert(key, Arc::clone(&store));
        store
    }

    /// Replaces the cached store for the pair with a fresh load. Stores
    /// already handed out keep their old contents.
    pub fn reload(&mut self, platform: Platform, environment: &str) -> Arc<LocatorStore> {
        self.stores.remove(&(platform, environment.to_string()));
        self.store(platform, environment)
    }

    pub fn is_loaded(&self, platform: Platform, environment: &str) -> bool {
        self.stores
            .contains_key(&(platform, environment.to_string()))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn section(&self) -> &LocatorSection {
        &self.section
    }
}
