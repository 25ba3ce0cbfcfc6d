//! Settings document and selector cache.
//!
//! The settings/storage service is external: it hands out one [`Settings`]
//! document and takes it back whole. The selector cache lives inside that
//! document, keyed by domain then extractor kind, and every change is a
//! read-modify-write of the full document through a [`SettingsStore`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::selector::SelectorMap;
use crate::site::SiteIdentity;

/// A previously validated selector map with usage statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorCacheEntry {
    pub selectors: SelectorMap,
    pub last_used_at: DateTime<Utc>,
    /// Number of successful uses. Only ever increases.
    pub success_count: u64,
}

/// domain → extractor kind → entry
pub type SelectorCache = BTreeMap<String, BTreeMap<String, SelectorCacheEntry>>;

/// The persisted settings document.
///
/// Missing keys take their defaults. Keys owned by other parts of the
/// application are kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub selector_cache: SelectorCache,
    pub retry_budget: u32,
    pub dom_analysis_depth: usize,
    pub model_max_tokens: usize,
    pub prompt_reserve_fraction: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            selector_cache: SelectorCache::new(),
            retry_budget: 3,
            dom_analysis_depth: 12,
            model_max_tokens: 8000,
            prompt_reserve_fraction: 0.4,
            extra: serde_json::Map::new(),
        }
    }
}

impl Settings {
    /// Cached entry for `site`, if any.
    #[must_use]
    pub fn lookup(&self, site: &SiteIdentity) -> Option<&SelectorCacheEntry> {
        self.selector_cache
            .get(&site.domain)
            .and_then(|by_kind| by_kind.get(&site.extractor))
    }

    /// Store `selectors` for `site`.
    ///
    /// A new entry starts at `success_count == 1`. An existing entry keeps its
    /// count, bumps it, and takes the new selectors.
    pub fn upsert(&mut self, site: &SiteIdentity, selectors: SelectorMap, now: DateTime<Utc>) {
        let by_kind = self.selector_cache.entry(site.domain.clone()).or_default();
        match by_kind.get_mut(&site.extractor) {
            Some(entry) => {
                entry.selectors = selectors;
                entry.last_used_at = now;
                entry.success_count = entry.success_count.saturating_add(1);
            }
            None => {
                by_kind.insert(
                    site.extractor.clone(),
                    SelectorCacheEntry {
                        selectors,
                        last_used_at: now,
                        success_count: 1,
                    },
                );
            }
        }
    }

    /// Record a successful reuse of the entry for `site`.
    ///
    /// Returns `false` when there is no such entry.
    pub fn touch(&mut self, site: &SiteIdentity, now: DateTime<Utc>) -> bool {
        let Some(entry) = self
            .selector_cache
            .get_mut(&site.domain)
            .and_then(|by_kind| by_kind.get_mut(&site.extractor))
        else {
            return false;
        };
        entry.last_used_at = now;
        entry.success_count = entry.success_count.saturating_add(1);
        true
    }
}

/// Access to the external settings/storage service.
///
/// `load` always observes a complete prior `save`.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// # Errors
    ///
    /// Fails when the service is unreachable or the document is malformed.
    async fn load(&self) -> Result<Settings>;

    /// # Errors
    ///
    /// Fails when the service is unreachable or the document cannot be written.
    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// In-process settings store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Settings>,
    unreachable: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail as if the service were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Copy of the stored document, bypassing reachability.
    #[must_use]
    pub fn snapshot(&self) -> Settings {
        self.settings
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::SettingsUnavailable("memory store marked unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<Settings> {
        self.check_reachable()?;
        Ok(self.snapshot())
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        self.check_reachable()?;
        let mut guard = self
            .settings
            .lock()
            .map_err(|_| Error::SettingsUnavailable("memory store lock poisoned".into()))?;
        *guard = settings.clone();
        Ok(())
    }
}

/// Settings kept as one JSON document on disk.
///
/// Saves go to a sibling temp file that is then renamed over the target, so
/// readers see either the old or the new document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> Result<Settings> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "settings: no file yet, using defaults");
                Ok(Settings::default())
            }
            Err(e) => Err(Error::SettingsUnavailable(format!(
                "{}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        info!(path = %self.path.display(), "settings: saved");
        Ok(())
    }
}
