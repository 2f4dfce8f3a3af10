//! Runtime configuration for the note core.
//!
//! # Responsibility
//! - Hold storage, import and logging settings with safe defaults.
//! - Apply `NOTECAP_*`-keyed overrides and validate the result.
//! - Build a ready `NoteService` for the configured backend.

use crate::logging::{default_log_level, normalize_level};
use crate::repo::note_repo::NoteRepository;
use crate::service::note_service::{NoteService, DEFAULT_IMPORT_LIMIT};
use crate::store::{JsonFileStore, NoteStore, SqliteStore, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable names.
pub mod env_vars {
    pub const DATA_DIR: &str = "NOTECAP_DATA_DIR";
    pub const BACKEND: &str = "NOTECAP_BACKEND";
    pub const IMPORT_LIMIT: &str = "NOTECAP_IMPORT_LIMIT";
    pub const LOG_LEVEL: &str = "NOTECAP_LOG_LEVEL";
    pub const LOG_DIR: &str = "NOTECAP_LOG_DIR";
}

pub const DEFAULT_DATA_DIR: &str = ".data";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Invalid {
                key: env_vars::BACKEND,
                message: format!("unknown backend `{other}`; expected json|sqlite"),
            }),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, message: String },
    Store(StoreError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { key, message } => write!(f, "invalid `{key}`: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<StoreError> for ConfigError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
    pub import_limit: usize,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            backend: StorageBackend::default(),
            import_limit: DEFAULT_IMPORT_LIMIT,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by `lookup`, which maps a variable name to a value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(env_vars::DATA_DIR) {
            config.data_dir = PathBuf::from(value.trim());
        }
        if let Some(value) = lookup(env_vars::BACKEND) {
            config.backend = value.parse()?;
        }
        if let Some(value) = lookup(env_vars::IMPORT_LIMIT) {
            config.import_limit = value.trim().parse().map_err(|err| ConfigError::Invalid {
                key: env_vars::IMPORT_LIMIT,
                message: format!("`{value}` is not a count: {err}"),
            })?;
        }
        if let Some(value) = lookup(env_vars::LOG_LEVEL) {
            config.log_level = value.trim().to_string();
        }
        if let Some(value) = lookup(env_vars::LOG_DIR).filter(|v| !v.trim().is_empty()) {
            config.log_dir = Some(PathBuf::from(value.trim()));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: env_vars::DATA_DIR,
                message: "data directory cannot be empty".to_string(),
            });
        }
        if self.import_limit == 0 {
            return Err(ConfigError::Invalid {
                key: env_vars::IMPORT_LIMIT,
                message: "import limit must be greater than zero".to_string(),
            });
        }
        normalize_level(&self.log_level).map_err(|err| ConfigError::Invalid {
            key: env_vars::LOG_LEVEL,
            message: err.to_string(),
        })?;
        Ok(())
    }

    /// Opens the configured backend under `data_dir`.
    pub fn open_store(&self) -> Result<Box<dyn NoteStore>, ConfigError> {
        let store: Box<dyn NoteStore> = match self.backend {
            StorageBackend::Json => Box::new(JsonFileStore::open(&self.data_dir)?),
            StorageBackend::Sqlite => Box::new(SqliteStore::open(&self.data_dir)?),
        };
        Ok(store)
    }

    pub fn open_service(&self) -> Result<NoteService<Box<dyn NoteStore>>, ConfigError> {
        self.validate()?;
        let repo = NoteRepository::new(self.open_store()?);
        Ok(NoteService::new(repo).with_import_limit(self.import_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::{env_vars, ConfigError, CoreConfig, StorageBackend};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = CoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.import_limit, 5000);
        assert_eq!(config.backend, StorageBackend::Json);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            (env_vars::DATA_DIR, "/tmp/notes"),
            (env_vars::BACKEND, "SQLite"),
            (env_vars::IMPORT_LIMIT, "10"),
            (env_vars::LOG_LEVEL, "warn"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/notes"));
        assert_eq!(config.backend, StorageBackend::Sqlite);
        assert_eq!(config.import_limit, 10);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero = CoreConfig::from_lookup(lookup_from(&[(env_vars::IMPORT_LIMIT, "0")]));
        assert!(matches!(zero, Err(ConfigError::Invalid { key, .. }) if key == env_vars::IMPORT_LIMIT));

        let backend = CoreConfig::from_lookup(lookup_from(&[(env_vars::BACKEND, "redis")]));
        assert!(backend.is_err());

        let level = CoreConfig::from_lookup(lookup_from(&[(env_vars::LOG_LEVEL, "loud")]));
        assert!(level.is_err());
    }
}
