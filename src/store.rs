//! # Settings Store
//!
//! Durable key/value storage for the last chosen pin, protocol and direction.
//!
//! Values are [`toml::Value`]s: the pin is stored as an integer, protocol
//! and direction as their wire names.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{EscError, Result};

/// Persisted key names
pub mod keys {
    /// Output pin (integer)
    pub const PIN: &str = "pin";
    /// Protocol name (string)
    pub const PROTOCOL: &str = "protocol";
    /// Direction name (string)
    pub const DIRECTION: &str = "direction";
}

/// Trait for key/value settings persistence
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore: Send {
    /// Read a stored value
    fn load(&self, key: &str) -> Option<toml::Value>;

    /// Write a value
    ///
    /// # Errors
    ///
    /// Returns error if the value could not be made durable
    fn save(&mut self, key: &str, value: toml::Value) -> Result<()>;
}

/// Non-durable store, for tests and ephemeral runs
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: toml::Table,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, key: &str) -> Option<toml::Value> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: toml::Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single TOML file
///
/// The whole table is rewritten on every save.
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    values: toml::Table,
}

impl TomlFileStore {
    /// Open the store at `path`
    ///
    /// A missing file opens an empty store. A file that cannot be read or
    /// parsed also opens empty, with a warning, so startup falls back to
    /// defaults instead of failing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use esc_driver::store::{SettingsStore, TomlFileStore};
    ///
    /// let store = TomlFileStore::open("esc_settings.toml");
    /// let pin = store.load("pin");
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<toml::Table>(&contents) {
                Ok(table) => table,
                Err(e) => {
                    warn!("Ignoring unreadable settings in {}: {}", path.display(), e);
                    toml::Table::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, starting empty", path.display());
                toml::Table::new()
            }
            Err(e) => {
                warn!("Failed to read settings from {}: {}", path.display(), e);
                toml::Table::new()
            }
        };

        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlFileStore {
    fn load(&self, key: &str) -> Option<toml::Value> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: toml::Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        let contents = toml::to_string(&self.values)
            .map_err(|e| EscError::Store(format!("Failed to serialize settings: {}", e)))?;
        fs::write(&self.path, contents)?;
        debug!("Saved {} to {}", key, self.path.display());
        Ok(())
    }
}
