//! Configuration management for shelfstore
//!
//! Provides presets for durable and scratch usage and a validator for
//! hand-built configurations.

use std::path::{Path, PathBuf};

/// Default catalog file name
pub const DEFAULT_CATALOG_FILE: &str = "prodotti.csv";

/// Default movement audit file name
pub const DEFAULT_MOVEMENTS_FILE: &str = "movimenti.csv";

/// Shelfstore configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding both backing files
    pub data_dir: PathBuf,
    /// Catalog file name, relative to `data_dir`
    pub catalog_file: String,
    /// Movement audit file name, relative to `data_dir`
    pub movements_file: String,
    /// Prefix of allocated catalog keys
    pub key_prefix: String,
    /// Zero-padding width of the numeric key suffix
    pub key_width: usize,
    /// Allowed values for the `color` field
    pub colors: Vec<String>,
    /// How many products the recent listing shows
    pub recent_limit: usize,
    /// Sync every append and rewrite to persistent storage before returning
    pub durable_writes: bool,
}

impl Config {
    /// Durable preset: every write is synced before the call returns.
    pub fn durable<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            catalog_file: DEFAULT_CATALOG_FILE.to_string(),
            movements_file: DEFAULT_MOVEMENTS_FILE.to_string(),
            key_prefix: "OBEN".to_string(),
            key_width: 3,
            colors: vec!["Neutro".to_string(), "Bianco".to_string()],
            recent_limit: 5,
            durable_writes: true,
        }
    }

    /// Scratch preset: same layout, writes left in the OS page cache.
    /// Meant for tests and throwaway catalogs.
    pub fn scratch<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            durable_writes: false,
            ..Self::durable(data_dir)
        }
    }

    /// Full path of the catalog file
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    /// Full path of the movement audit file
    pub fn movements_path(&self) -> PathBuf {
        self.data_dir.join(&self.movements_file)
    }

    /// True if `color` is part of the configured palette
    pub fn allows_color(&self, color: &str) -> bool {
        self.colors.iter().any(|c| c == color)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.catalog_file.is_empty() {
            return Err("catalog_file must not be empty".into());
        }
        if self.movements_file.is_empty() {
            return Err("movements_file must not be empty".into());
        }
        if self.catalog_file == self.movements_file {
            return Err("catalog_file and movements_file must differ".into());
        }
        if self.key_prefix.is_empty() {
            return Err("key_prefix must not be empty".into());
        }
        if self.key_prefix.chars().any(|c| c.is_ascii_digit()) {
            return Err("key_prefix must not contain digits".into());
        }
        if self.key_width == 0 || self.key_width > 18 {
            return Err("key_width must be in [1, 18]".into());
        }
        if self.colors.is_empty() {
            return Err("colors must list at least one color".into());
        }
        if self.recent_limit == 0 {
            return Err("recent_limit must be > 0".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::durable(".")
    }
}
