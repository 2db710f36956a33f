//! Ordered set of catalog backends.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogBackend, DescriptorReader, FeedReader, OpdsCatalog};

/// All known catalogs, enabled or not, sorted by title.
pub struct CatalogRegistry {
    backends: Vec<Arc<dyn CatalogBackend>>,
}

impl CatalogRegistry {
    /// Build a registry from already constructed backends.
    pub fn new(mut backends: Vec<Arc<dyn CatalogBackend>>) -> Self {
        backends.sort_by(|a, b| compare_titles(a.title(), b.title()));
        Self { backends }
    }

    /// Built-in backends plus one OPDS catalog per readable descriptor in
    /// `catalog_dir`. Unreadable descriptors are skipped.
    pub fn load(
        builtin: Vec<Arc<dyn CatalogBackend>>,
        catalog_dir: &Path,
        descriptors: &dyn DescriptorReader,
        feed_reader: Arc<dyn FeedReader>,
    ) -> Self {
        let mut backends = builtin;

        for path in descriptor_files(catalog_dir) {
            match descriptors.read_descriptor(&path) {
                Ok(descriptor) => {
                    debug!(
                        path = %path.display(),
                        title = %descriptor.title,
                        site = %descriptor.site_name,
                        "Loaded catalog descriptor"
                    );
                    backends.push(Arc::new(OpdsCatalog::from_descriptor(
                        descriptor,
                        Arc::clone(&feed_reader),
                    )));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping catalog descriptor");
                }
            }
        }

        let registry = Self::new(backends);
        info!(
            catalogs = registry.size(),
            enabled = registry.enabled_count(),
            "Catalog registry initialized"
        );
        registry
    }

    pub fn size(&self) -> usize {
        self.backends.len()
    }

    /// Backend at `index`; an out-of-range index is a caller bug.
    pub fn backend_at(&self, index: usize) -> Option<&Arc<dyn CatalogBackend>> {
        debug_assert!(
            index < self.backends.len(),
            "backend index {} out of range ({} backends)",
            index,
            self.backends.len()
        );
        self.backends.get(index)
    }

    pub fn backends(&self) -> &[Arc<dyn CatalogBackend>] {
        &self.backends
    }

    pub fn enabled_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_enabled()).count()
    }

    pub fn backend_for_site(&self, site_name: &str) -> Option<&Arc<dyn CatalogBackend>> {
        self.backends.iter().find(|b| b.site_name() == site_name)
    }

    /// Let the catalog owning `url` rewrite it. URLs of unknown hosts are
    /// returned unchanged.
    pub fn rewrite_url(&self, url: &str, external: bool) -> String {
        let Some(host) = host_of(url) else {
            return url.to_string();
        };
        match self
            .backends
            .iter()
            .find(|b| !b.site_name().is_empty() && host.contains(b.site_name()))
        {
            Some(backend) => backend.rewrite_url(url, external),
            None => url.to_string(),
        }
    }
}

/// Files of the descriptor directory in name order.
fn descriptor_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "No catalog descriptor directory");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

fn host_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

/// Title with leading characters that are not ASCII letters or digits removed.
/// A title made only of such characters is kept whole.
pub(crate) fn sort_key(title: &str) -> &str {
    let trimmed = title.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
    if trimmed.is_empty() {
        title
    } else {
        trimmed
    }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(sort_key(b))
}
