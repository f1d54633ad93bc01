//! Configuration management for changectl
//!
//! Handles configuration loading from files and environment variables.
//! Configuration is stored in TOML format with support for multiple named profiles.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::credential::CredentialStore;
use super::error::{ConfigError, Result};

pub const ENV_URL: &str = "CHANGECTL_URL";
pub const ENV_USERNAME: &str = "CHANGECTL_USERNAME";
pub const ENV_PASSWORD: &str = "CHANGECTL_PASSWORD";
pub const ENV_INSECURE: &str = "CHANGECTL_INSECURE";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when `--profile` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Connection settings for one server account
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    pub url: String,
    pub username: String,
    /// Plaintext or `keyring:` reference; prompted for when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
    /// Organization used when `--org` is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_org: Option<String>,
}

/// A profile with keyring references and environment overrides applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    pub url: String,
    pub username: String,
    pub password: Option<String>,
    pub insecure: bool,
}

impl Profile {
    /// Resolve credentials through the keyring.
    ///
    /// With `use_env`, `CHANGECTL_*` variables take precedence over stored values.
    pub fn resolve(&self, use_env: bool) -> Result<ResolvedProfile> {
        let store = CredentialStore::new();
        let env = |name: &'static str| use_env.then_some(name);

        let url = store.get_credential(&self.url, env(ENV_URL)).map_err(|e| {
            ConfigError::CredentialError(format!("Failed to resolve URL: {}", e))
        })?;
        let username = store
            .get_credential(&self.username, env(ENV_USERNAME))
            .map_err(|e| {
                ConfigError::CredentialError(format!("Failed to resolve username: {}", e))
            })?;
        let password = match &self.password {
            Some(p) => Some(store.get_credential(p, env(ENV_PASSWORD)).map_err(|e| {
                ConfigError::CredentialError(format!("Failed to resolve password: {}", e))
            })?),
            None if use_env => std::env::var(ENV_PASSWORD).ok(),
            None => None,
        };
        let insecure = if use_env {
            env_flag(ENV_INSECURE).unwrap_or(self.insecure)
        } else {
            self.insecure
        };

        Ok(ResolvedProfile {
            url,
            username,
            password,
            insecure,
        })
    }
}

impl ResolvedProfile {
    /// Build connection settings from `CHANGECTL_*` variables alone.
    ///
    /// Returns `None` unless both URL and username are set.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(ENV_URL).ok()?;
        let username = std::env::var(ENV_USERNAME).ok()?;
        Some(Self {
            url,
            username,
            password: std::env::var(ENV_PASSWORD).ok(),
            insecure: env_flag(ENV_INSECURE).unwrap_or(false),
        })
    }
}

/// Parse a boolean environment variable (`1/0`, `true/false`, `yes/no`)
fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Resolve the profile name to use
    ///
    /// Order: explicit name, `default_profile`, then the only or first
    /// (alphabetically) configured profile.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(profile_name) = explicit_profile {
            if !self.profiles.contains_key(profile_name) {
                return Err(ConfigError::ProfileNotFound {
                    name: profile_name.to_string(),
                });
            }
            return Ok(profile_name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        self.list_profiles()
            .first()
            .map(|(name, _)| (*name).clone())
            .ok_or_else(|| ConfigError::NoProfiles {
                suggestion: "Use 'changectl profile set' to create a profile, \
                    or set CHANGECTL_URL and CHANGECTL_USERNAME."
                    .to_string(),
            })
    }

    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, ~/.config/changectl/config.toml is used when it (or its
    /// directory) exists, otherwise ~/Library/Application Support/com.changectl.changectl/config.toml.
    ///
    /// On Linux: ~/.config/changectl/config.toml
    /// On Windows: %APPDATA%\changectl\changectl\config\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("changectl")
                    .join("config.toml");

                if linux_style_path.exists()
                    || linux_style_path
                        .parent()
                        .map(|p| p.exists())
                        .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs = ProjectDirs::from("com", "changectl", "changectl")
            .ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand environment variables in configuration content
    ///
    /// Supports ${VAR} and ${VAR:-default}. Unset variables without a default
    /// are left as written.
    ///
    /// Example:
    /// ```toml
    /// url = "${SATELLITE_URL:-https://satellite.example.com}"
    /// password = "${SATELLITE_PASSWORD}"
    /// ```
    fn expand_env_vars(content: &str) -> String {
        shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok())
            .to_string()
    }
}
