//! Connection management: turns a profile into an authenticated server client

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use changectl_core::{Config, ResolvedProfile, ServerClient};
use tracing::{debug, info, trace};

use crate::error::{CliError, Result as CliResult};

/// User agent string for changectl HTTP requests
const CHANGECTL_USER_AGENT: &str = concat!("changectl/", env!("CARGO_PKG_VERSION"));

/// Connection manager for creating authenticated clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

fn pick_organization(explicit: Option<&str>, fallback: Option<&str>) -> CliResult<String> {
    explicit
        .or(fallback)
        .filter(|org| !org.trim().is_empty())
        .map(str::to_string)
        .ok_or(CliError::MissingOrganization)
}

impl ConnectionManager {
    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save an edited configuration to the file this manager was loaded from
    pub fn save_config(&self, config: &Config) -> CliResult<PathBuf> {
        let path = match self.config_path {
            Some(ref path) => path.clone(),
            None => Config::config_path()?,
        };
        config
            .save_to_path(&path)
            .context("Failed to save configuration")?;
        Ok(path)
    }

    /// Path of the configuration file in use
    pub fn config_file(&self) -> CliResult<PathBuf> {
        match self.config_path {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    /// Pick the organization for a command: `--org` first, then the profile's default.
    ///
    /// Only the loaded configuration is consulted, so a missing organization is
    /// reported before any credential lookup or password prompt.
    pub fn organization(
        &self,
        profile_name: Option<&str>,
        explicit: Option<&str>,
    ) -> CliResult<String> {
        if explicit.is_some() {
            return pick_organization(explicit, None);
        }
        pick_organization(None, self.default_org(profile_name).as_deref())
    }

    fn default_org(&self, profile_name: Option<&str>) -> Option<String> {
        // Environment-only connections carry no default organization
        if self.config_path.is_none()
            && profile_name.is_none()
            && ResolvedProfile::from_env().is_some()
        {
            return None;
        }
        let name = self.config.resolve_profile(profile_name).ok()?;
        self.config.profiles.get(&name)?.default_org.clone()
    }

    /// Build a client from profile credentials with environment variable override support
    ///
    /// When --config-file is explicitly specified, environment variables are ignored so the
    /// file alone decides which server is contacted.
    pub fn connect(&self, profile_name: Option<&str>) -> CliResult<ServerClient> {
        trace!("Profile name: {:?}", profile_name);

        let use_env_vars = self.config_path.is_none();
        if !use_env_vars {
            info!("--config-file specified explicitly, ignoring environment variables");
        }

        let env_profile = if use_env_vars && profile_name.is_none() {
            ResolvedProfile::from_env()
        } else {
            None
        };

        let resolved = match env_profile {
            Some(resolved) => {
                debug!("Using connection settings from CHANGECTL_* environment variables");
                resolved
            }
            None => {
                let name = self.config.resolve_profile(profile_name)?;
                debug!("Using profile '{}'", name);
                self.config.profile(&name)?.resolve(use_env_vars)?
            }
        };

        let password = match resolved.password {
            Some(password) => password,
            None => prompt_password(&resolved.username)?,
        };

        debug!(
            "Connecting to {} as {} (insecure: {})",
            resolved.url, resolved.username, resolved.insecure
        );
        let client = ServerClient::builder()
            .base_url(&resolved.url)
            .username(&resolved.username)
            .password(password)
            .insecure(resolved.insecure)
            .user_agent(CHANGECTL_USER_AGENT)
            .build()?;
        Ok(client)
    }
}

fn prompt_password(username: &str) -> CliResult<String> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::AuthenticationFailed {
            message: format!(
                "no password stored for '{}' and stdin is not a terminal",
                username
            ),
        });
    }
    let password = rpassword::prompt_password(format!("Password for {}: ", username))
        .context("Failed to read password")?;
    Ok(password)
}
