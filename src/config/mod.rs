//! Configuration Management
//!
//! This module loads named connection profiles for the library database.
//!
//! # Configuration Locations
//! - Local: `.circulate/config.json` (per working directory, team-shareable)
//! - Global: `~/.config/circulate/connections.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Explicit connection flags (highest priority)
//! 2. Local config file (`.circulate/config.json`)
//! 3. Global config file (`~/.config/circulate/connections.json`)
//!
//! # Profile Format
//! ```json
//! {
//!   "connections": {
//!     "campus": {
//!       "engine": "postgres", "host": "db.example", "port": 5432,
//!       "database": "Library",
//!       "logins": { "member": "member_login", "employee": "employee_login", "curator": "curator_login" }
//!     }
//!   },
//!   "default": "campus"
//! }
//! ```
//!
//! Profiles never need to store the password: it is typed at the login
//! prompt, or read from the variable named by `password_env` when the prompt
//! is left empty.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{ConnectionConfig, DatabaseType};
use crate::error::{CirculateError, Result};
use crate::permission::Tier;

/// Connection registry (contents of one config file)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionRegistry {
    /// Named connection profiles
    #[serde(default)]
    pub connections: HashMap<String, StoredConnection>,

    /// Name of the default connection (must exist in connections map)
    pub default: Option<String>,
}

/// Database login names that select a permission tier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginNames {
    pub member: String,
    pub employee: String,
    pub curator: String,
}

impl Default for LoginNames {
    fn default() -> Self {
        Self {
            member: "member_login".to_string(),
            employee: "employee_login".to_string(),
            curator: "curator_login".to_string(),
        }
    }
}

impl LoginNames {
    /// Tier selected by a login name, `None` when the name is not one of the three
    #[must_use]
    pub fn classify(&self, login: &str) -> Option<Tier> {
        if login == self.member {
            Some(Tier::Member)
        } else if login == self.employee {
            Some(Tier::Employee)
        } else if login == self.curator {
            Some(Tier::Curator)
        } else {
            None
        }
    }
}

/// Stored connection profile
///
/// Similar to `ConnectionConfig` but carries the tier login names and an
/// environment variable reference for the password.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredConnection {
    /// Connection configuration
    #[serde(flatten)]
    pub config: ConnectionConfig,

    /// Login names for the member / employee / curator tiers
    #[serde(default)]
    pub logins: LoginNames,

    /// Environment variable name for password (used when the prompt is left empty)
    pub password_env: Option<String>,
}

impl StoredConnection {
    /// Profile with default login names
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config, logins: LoginNames::default(), password_env: None }
    }

    /// Connection config carrying the credentials typed at the login prompt
    pub fn with_login(&self, user: &str, password: &str) -> Result<ConnectionConfig> {
        let password = if password.is_empty() {
            match &self.password_env {
                Some(env_var) => std::env::var(env_var).map_err(|_| {
                    CirculateError::config_error(format!(
                        "Environment variable {env_var} not found for password"
                    ))
                })?,
                None => String::new(),
            }
        } else {
            password.to_string()
        };

        Ok(self.config.clone().with_credentials(user, password))
    }
}

/// Connection settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub engine: Option<DatabaseType>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub file: Option<PathBuf>,
}

impl ConnectionOverrides {
    fn apply(&self, config: &mut ConnectionConfig) {
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(host) = &self.host {
            config.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(database) = &self.database {
            config.database = Some(database.clone());
        }
        if let Some(file) = &self.file {
            config.file = Some(file.clone());
        }
    }

    /// Build a profile from flags alone
    fn to_profile(&self, engine: DatabaseType) -> StoredConnection {
        let mut config = match engine {
            DatabaseType::Postgres => ConnectionConfig::postgres(
                "localhost".to_string(),
                5432,
                "Library".to_string(),
            ),
            DatabaseType::MySQL => {
                ConnectionConfig::mysql("localhost".to_string(), 3306, "Library".to_string())
            }
            DatabaseType::SQLite => ConnectionConfig::sqlite(PathBuf::from("library.db")),
        };
        self.apply(&mut config);
        StoredConnection::new(config)
    }
}

/// Get path to local config file (`.circulate/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        CirculateError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".circulate").join("config.json"))
}

/// Get path to global config file (`~/.config/circulate/connections.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| CirculateError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("circulate").join("connections.json"))
}

/// Load connection registry from a config file
///
/// A missing file is an empty registry.
pub fn load_registry(path: &Path) -> Result<ConnectionRegistry> {
    if !path.exists() {
        return Ok(ConnectionRegistry::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CirculateError::config_error(format!("Could not read config file {}: {e}", path.display()))
    })?;

    serde_json::from_str::<ConnectionRegistry>(&contents).map_err(|e| {
        CirculateError::config_error(format!("Invalid config file {}: {e}", path.display()))
    })
}

/// Merge two registries, `local` winning for profiles with the same name
#[must_use]
pub fn merge(global: ConnectionRegistry, local: ConnectionRegistry) -> ConnectionRegistry {
    let mut merged = global;

    for (name, conn) in local.connections {
        merged.connections.insert(name, conn);
    }

    // Override default pointer if local has one
    if local.default.is_some() {
        merged.default = local.default;
    }

    merged
}

/// Load connection registry with precedence (local first, then global)
pub fn load_with_precedence() -> Result<ConnectionRegistry> {
    let global = load_registry(&global_config_path()?)?;
    let local = load_registry(&local_config_path()?)?;
    Ok(merge(global, local))
}

/// Pick a profile from a registry by name, or the registry's default
pub fn select_profile(registry: &ConnectionRegistry, name: Option<&str>) -> Result<StoredConnection> {
    let available = || {
        let mut names: Vec<_> = registry.connections.keys().cloned().collect();
        names.sort();
        names
    };

    let conn_name = match name {
        Some(n) => n.to_string(),
        None => registry.default.clone().ok_or_else(|| {
            CirculateError::config_error(format!(
                "No default connection configured. Available connections: {:?}. \
                 Specify one with --connection or pass --engine.",
                available()
            ))
        })?,
    };

    registry.connections.get(&conn_name).cloned().ok_or_else(|| {
        CirculateError::config_error(format!(
            "Connection '{conn_name}' not found. Available connections: {:?}",
            available()
        ))
    })
}

/// Resolve the profile to log in with
///
/// With `--engine` and no `--connection`, the profile is built from flags
/// alone. Otherwise the named (or default) profile is loaded and any given
/// flags override its fields.
pub fn resolve_connection(
    name: Option<&str>,
    overrides: &ConnectionOverrides,
) -> Result<StoredConnection> {
    if let (None, Some(engine)) = (name, overrides.engine) {
        return Ok(overrides.to_profile(engine));
    }

    let registry = load_with_precedence()?;
    let mut profile = select_profile(&registry, name)?;
    overrides.apply(&mut profile.config);
    log::debug!("using connection profile {} ({})", name.unwrap_or("default"), profile.config.engine);
    Ok(profile)
}
