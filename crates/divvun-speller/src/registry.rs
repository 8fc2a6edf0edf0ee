// Spellers by language tag.
//
// A registry config maps BCP 47 tags to archive files:
//
//   {
//     "spellers": {
//       "se":    { "path": "se.zhfst" },
//       "sma-NO": { "path": "/usr/share/divvun/sma.bhfst", "format": "chunked",
//                   "config": { "n_best": 5 } }
//     }
//   }
//
// Relative paths are resolved against the directory of the config file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use divvun_abi::{ArchiveFormat, SpellerConfig};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::error::{Error, Result};
use crate::library::NativeLibrary;
use crate::speller::Speller;

/// Failure to read a registry config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read speller config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid speller config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One configured speller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellerEntry {
    pub path: PathBuf,
    /// Archive flavor; detected from the file extension when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ArchiveFormat>,
    /// Suggestion settings applied by callers that ask for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SpellerConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub spellers: HashMap<String, SpellerEntry>,
}

impl RegistryConfig {
    /// Parse a config. Relative paths are kept as written.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a config file, resolving relative archive paths against its
    /// directory.
    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        Ok(config)
    }

    fn resolve_relative(&mut self, base: &Path) {
        for entry in self.spellers.values_mut() {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
    }
}

/// Primary language subtag: `se` for `se-NO`, `sma` for `sma_SE`.
fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}

/// Lazily opened spellers keyed by language tag.
pub struct SpellerRegistry {
    library: Arc<NativeLibrary>,
    entries: HashMap<String, SpellerEntry>,
    open: Mutex<HashMap<String, Speller>>,
}

impl std::fmt::Debug for SpellerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpellerRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

impl SpellerRegistry {
    pub fn new(library: Arc<NativeLibrary>, config: RegistryConfig) -> Self {
        Self {
            library,
            entries: config.spellers,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Load the config at `path` and build a registry over `library`.
    pub fn from_file(library: Arc<NativeLibrary>, path: &Path) -> Result<Self> {
        let config = RegistryConfig::from_file(path)?;
        Ok(Self::new(library, config))
    }

    /// Configured language tags, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// The entry serving `tag`: the exact tag first, then its primary subtag.
    pub fn entry(&self, tag: &str) -> Option<(&str, &SpellerEntry)> {
        self.entries
            .get_key_value(tag)
            .or_else(|| self.entries.get_key_value(primary_subtag(tag)))
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// Suggestion settings configured for `tag`, if any.
    pub fn config_for(&self, tag: &str) -> Option<SpellerConfig> {
        self.entry(tag).and_then(|(_, entry)| entry.config)
    }

    /// The speller for `tag`, opening its archive on first use.
    pub fn speller(&self, tag: &str) -> Result<Speller> {
        let (key, entry) = self
            .entry(tag)
            .ok_or_else(|| Error::UnknownLanguage(tag.to_string()))?;

        if let Some(speller) = self.lock_open().get(key) {
            return Ok(speller.clone());
        }

        // The cache lock is never held across native calls. Concurrent first
        // lookups of one tag may both open; the first to finish is kept.
        let archive = match entry.format {
            Some(format) => Archive::open(&self.library, &entry.path, format)?,
            None => Archive::open_detected(&self.library, &entry.path)?,
        };
        let speller = archive.speller()?;
        tracing::debug!(tag, key, path = %entry.path.display(), "opened speller for language");
        Ok(self
            .lock_open()
            .entry(key.to_string())
            .or_insert(speller)
            .clone())
    }

    fn lock_open(&self) -> MutexGuard<'_, HashMap<String, Speller>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget the cached speller for `tag`. Returns whether one was open.
    ///
    /// Clones handed out earlier stay usable; the archive is released when
    /// the last of them drops.
    pub fn evict(&self, tag: &str) -> bool {
        let Some((key, _)) = self.entry(tag) else {
            return false;
        };
        self.lock_open().remove(key).is_some()
    }
}
