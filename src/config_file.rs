//! Layered environment configuration
//!
//! A key resolves to the first non-empty value of:
//! 1. the process environment (snapshotted when the store is built),
//! 2. the `KEY=VALUE` configuration file, read at most once per store,
//! 3. the empty string.
//!
//! Only keys declared at setup may be looked up. Asking for any other key is a
//! programming error and panics, so the registry and the lookups cannot drift apart.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use log::{debug, warn};
use thiserror::Error;

/// Value of the override key that disables the configuration file
pub const DISABLED: &str = "off";

/// Errors that can occur while locating or updating the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0}=off")]
    Disabled(String),
    #[error("missing user-config dir")]
    NoConfigDir,
    #[error("unknown config key {0}")]
    UnknownKey(String),
    #[error("{0} can only be set using the OS environment")]
    ReadOnlyKey(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("unable to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A shared slot mirroring the resolved value of one configuration key.
///
/// It is written once, when the store is set up, and read anywhere after.
#[derive(Debug, Clone, Default)]
pub struct Binding(Arc<OnceLock<String>>);

impl Binding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolved value, or `""` before setup
    #[must_use]
    pub fn get(&self) -> &str {
        self.0.get().map_or("", String::as_str)
    }

    fn set(&self, value: String) -> bool {
        self.0.set(value).is_ok()
    }
}

/// A configuration key with its default (later: resolved) value
#[derive(Debug, Clone)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
    pub binding: Option<Binding>,
}

impl EnvVar {
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        EnvVar {
            name: name.to_string(),
            value: value.to_string(),
            binding: None,
        }
    }

    #[must_use]
    pub fn bound(name: &str, value: &str, binding: &Binding) -> Self {
        EnvVar {
            binding: Some(binding.clone()),
            ..EnvVar::new(name, value)
        }
    }
}

/// Parse `KEY=VALUE` lines. Lines without `=`, empty lines and lines whose
/// key does not start with an ASCII uppercase letter are skipped; a later
/// record for the same key wins.
#[must_use]
pub fn parse_env_file(data: &str) -> HashMap<String, String> {
    data.split('\n')
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            if !key.starts_with(|c: char| c.is_ascii_uppercase()) {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

pub struct ConfigStoreBuilder {
    env_name: String,
    config_dirname: String,
    environ: Option<HashMap<String, String>>,
    user_config_dir: Option<Option<PathBuf>>,
}

impl ConfigStoreBuilder {
    /// Replace the process environment snapshot
    #[must_use]
    pub fn environ<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environ = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Replace the platform's per-user configuration directory
    #[must_use]
    pub fn user_config_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.user_config_dir = Some(dir);
        self
    }

    /// Register `defaults` plus the override key, resolve each entry against
    /// the environment and the configuration file, and publish bound values.
    #[must_use]
    pub fn setup(self, defaults: Vec<EnvVar>) -> ConfigStore {
        let environ = self.environ.unwrap_or_else(|| {
            std::env::vars_os()
                .map(|(k, v)| {
                    (
                        k.to_string_lossy().into_owned(),
                        v.to_string_lossy().into_owned(),
                    )
                })
                .collect()
        });
        let mut known: HashSet<String> = defaults.iter().map(|e| e.name.clone()).collect();
        known.insert(self.env_name.clone());

        let mut store = ConfigStore {
            env_name: self.env_name,
            config_dirname: self.config_dirname,
            user_config_dir: self.user_config_dir.unwrap_or_else(dirs::config_dir),
            environ,
            known,
            entries: Vec::new(),
            cache: OnceLock::new(),
        };

        let env_file = store
            .env_file()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let mut entries = defaults;
        entries.push(EnvVar::new(&store.env_name, &env_file));
        for entry in &mut entries {
            let value = store.getenv(&entry.name);
            if !value.is_empty() {
                entry.value = value;
            }
            if let Some(binding) = &entry.binding
                && !binding.set(entry.value.clone())
            {
                warn!(
                    "{} is bound more than once; keeping the first value",
                    entry.name
                );
            }
        }
        store.entries = entries;
        store
    }
}

/// Resolved configuration for one process
#[derive(Debug)]
pub struct ConfigStore {
    env_name: String,
    config_dirname: String,
    user_config_dir: Option<PathBuf>,
    environ: HashMap<String, String>,
    known: HashSet<String>,
    entries: Vec<EnvVar>,
    cache: OnceLock<HashMap<String, String>>,
}

impl ConfigStore {
    /// Start building a store whose file location is overridden by `env_name`
    /// and otherwise lives at `<user config dir>/<config_dirname>/env`.
    #[must_use]
    pub fn builder(env_name: &str, config_dirname: &str) -> ConfigStoreBuilder {
        ConfigStoreBuilder {
            env_name: env_name.to_string(),
            config_dirname: config_dirname.to_string(),
            environ: None,
            user_config_dir: None,
        }
    }

    /// Every registered key with its resolved value, in registration order
    #[must_use]
    pub fn entries(&self) -> &[EnvVar] {
        &self.entries
    }

    #[must_use]
    pub fn can_getenv(&self, key: &str) -> bool {
        self.known.contains(key)
    }

    /// Resolve a registered key.
    ///
    /// # Panics
    ///
    /// Panics if `key` was not registered at setup.
    #[must_use]
    pub fn getenv(&self, key: &str) -> String {
        assert!(
            self.can_getenv(key),
            "internal error: invalid config lookup {key}"
        );
        if let Some(value) = self.os_value(key) {
            return value.to_string();
        }
        self.file_values().get(key).cloned().unwrap_or_default()
    }

    /// The value settled at setup: environment, then file, then the registered default.
    ///
    /// # Panics
    ///
    /// Panics if `key` was not registered at setup.
    #[must_use]
    pub fn resolved(&self, key: &str) -> &str {
        assert!(
            self.can_getenv(key),
            "internal error: invalid config lookup {key}"
        );
        self.entries
            .iter()
            .find(|e| e.name == key)
            .map_or("", |e| e.value.as_str())
    }

    /// `getenv(key)`, or `default` when that resolves to the empty string
    #[must_use]
    pub fn env_or(&self, key: &str, default: &str) -> String {
        let value = self.getenv(key);
        if value.is_empty() {
            default.to_string()
        } else {
            value
        }
    }

    /// The non-empty process environment value of `key`, if any
    #[must_use]
    pub fn os_value(&self, key: &str) -> Option<&str> {
        self.environ
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Disabled` when the override key is `off`, and
    /// `ConfigError::NoConfigDir` when the platform has no user config directory.
    pub fn env_file(&self) -> Result<PathBuf, ConfigError> {
        if let Some(file) = self.os_value(&self.env_name) {
            if file == DISABLED {
                return Err(ConfigError::Disabled(self.env_name.clone()));
            }
            return Ok(PathBuf::from(file));
        }
        let dir = self
            .user_config_dir
            .as_ref()
            .filter(|d| !d.as_os_str().is_empty())
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(&self.config_dirname).join("env"))
    }

    fn file_values(&self) -> &HashMap<String, String> {
        self.cache.get_or_init(|| self.load_env_file())
    }

    fn load_env_file(&self) -> HashMap<String, String> {
        let file = match self.env_file() {
            Ok(file) => file,
            Err(e) => {
                debug!("Config file not used: {e}");
                return HashMap::new();
            }
        };
        match std::fs::read(&file) {
            Ok(data) => {
                debug!("Reading config file {}", file.display());
                parse_env_file(&String::from_utf8_lossy(&data))
            }
            Err(e) => {
                debug!("Unable to read config file {}: {e}", file.display());
                HashMap::new()
            }
        }
    }

    /// Rewrite the configuration file: records for `set` keys are replaced in
    /// place or appended, records for `unset` keys are removed, every other line
    /// is kept as is. Returns the path written.
    ///
    /// The values already cached by this store are not refreshed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownKey` or `ConfigError::ReadOnlyKey` for keys
    /// that cannot live in the file, `ConfigError::InvalidValue` for values
    /// containing a newline, and `ConfigError::Disabled`/`ConfigError::Io` when
    /// the file cannot be located or written.
    pub fn write_env_file(
        &self,
        set: &[(String, String)],
        unset: &[String],
    ) -> Result<PathBuf, ConfigError> {
        let keys = set.iter().map(|(k, _)| k).chain(unset);
        for key in keys {
            if *key == self.env_name {
                return Err(ConfigError::ReadOnlyKey(key.clone()));
            }
            if !self.can_getenv(key) {
                return Err(ConfigError::UnknownKey(key.clone()));
            }
        }
        for (key, value) in set {
            if value.contains(['\n', '\r']) {
                return Err(ConfigError::InvalidValue {
                    key: key.clone(),
                    reason: "contains a newline".to_string(),
                });
            }
        }

        let file = self.env_file()?;
        let existing = match std::fs::read(&file) {
            Ok(data) => String::from_utf8_lossy(&data).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(ConfigError::Io { path: file, source }),
        };
        let contents = update_lines(&existing, set, unset);
        write_file(&file, &contents)?;
        debug!("Wrote config file {}", file.display());
        Ok(file)
    }
}

fn update_lines(existing: &str, set: &[(String, String)], unset: &[String]) -> String {
    let mut pending: Vec<&(String, String)> = set.iter().collect();
    let mut lines: Vec<String> = Vec::new();
    for line in existing.lines() {
        let key = line.split_once('=').map(|(k, _)| k);
        if let Some(key) = key {
            if unset.iter().any(|u| u == key) {
                continue;
            }
            if let Some(pos) = pending.iter().position(|(k, _)| k == key) {
                let (k, v) = pending.remove(pos);
                lines.push(format!("{k}={v}"));
                continue;
            }
            if set.iter().any(|(k, _)| k == key) {
                // duplicate record of a key that was just replaced
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines.extend(pending.into_iter().map(|(k, v)| format!("{k}={v}")));
    let mut contents = lines.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    contents
}

fn write_file(file: &Path, contents: &str) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: file.to_path_buf(),
        source,
    };
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(file, contents).map_err(io_err)
}
