//! Profile management command implementations

use colored::Colorize;
use serde_json::json;
use tracing::{debug, info};

#[cfg(feature = "secure-storage")]
use anyhow::Context;
use changectl_core::{CredentialStore, Profile};

use crate::cli::{OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::{CliError, Result as CliResult};
use crate::output;

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format, query),
        Path => handle_path(conn_mgr, output_format, query),
        Show { name } => handle_show(conn_mgr, name, output_format, query),
        Set {
            name,
            url,
            username,
            password,
            insecure,
            default_org,
            #[cfg(feature = "secure-storage")]
            use_keyring,
        } => {
            let profile = Profile {
                url: url.clone(),
                username: username.clone(),
                password: password.clone(),
                insecure: *insecure,
                default_org: default_org.clone(),
            };
            #[cfg(feature = "secure-storage")]
            let profile = if *use_keyring {
                store_password_in_keyring(name, profile)?
            } else {
                profile
            };
            handle_set(conn_mgr, name, profile)
        }
        Remove { name } => handle_remove(conn_mgr, name),
        Default { name } => handle_default(conn_mgr, name),
    }
}

fn structured_format(output_format: OutputFormat) -> Option<output::OutputFormat> {
    output_format
        .is_structured()
        .then(|| output::OutputFormat::from(output_format))
}

/// Mask a password for display; keyring references are shown as-is
fn mask_password(password: Option<&str>) -> String {
    match password {
        None => "(prompt)".to_string(),
        Some(p) if CredentialStore::is_keyring_reference(p) => p.to_string(),
        Some(_) => "********".to_string(),
    }
}

fn profile_value(name: &str, profile: &Profile, is_default: bool) -> serde_json::Value {
    json!({
        "name": name,
        "url": profile.url,
        "username": profile.username,
        "password": mask_password(profile.password.as_deref()),
        "insecure": profile.insecure,
        "default_org": profile.default_org,
        "is_default": is_default,
    })
}

fn handle_list(
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let config = &conn_mgr.config;
    let profiles = config.list_profiles();

    if let Some(fmt) = structured_format(output_format) {
        let list: Vec<_> = profiles
            .iter()
            .map(|(name, profile)| {
                profile_value(
                    name,
                    profile,
                    config.default_profile.as_deref() == Some(name.as_str()),
                )
            })
            .collect();
        let data = json!({
            "config_path": conn_mgr.config_file().ok().map(|p| p.display().to_string()),
            "profiles": list,
            "count": profiles.len(),
        });
        output::print_output(&data, fmt, query)?;
        return Ok(());
    }

    if let Ok(path) = conn_mgr.config_file() {
        println!("Configuration file: {}", path.display());
        println!();
    }

    if profiles.is_empty() {
        info!("No profiles configured");
        println!("No profiles configured.");
        println!("Use 'changectl profile set' to create a profile.");
        return Ok(());
    }

    for (name, profile) in profiles {
        if config.default_profile.as_deref() == Some(name.as_str()) {
            println!("{} {}", name.bold().cyan(), "(default)".green());
        } else {
            println!("{}", name.bold().cyan());
        }
        println!("  {}  {}", "URL:".dimmed(), profile.url);
        println!(
            "  {} {}{}",
            "User:".dimmed(),
            profile.username,
            if profile.insecure { " (insecure)" } else { "" }
        );
        if let Some(org) = &profile.default_org {
            println!("  {}  {}", "Org:".dimmed(), org);
        }
    }
    Ok(())
}

fn handle_path(
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let config_path = conn_mgr.config_file()?;
    match structured_format(output_format) {
        Some(fmt) => output::print_output(
            json!({ "config_path": config_path.display().to_string() }),
            fmt,
            query,
        )?,
        None => println!("{}", config_path.display()),
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let profile = conn_mgr.config.profile(name)?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);

    if let Some(fmt) = structured_format(output_format) {
        output::print_output(profile_value(name, profile, is_default), fmt, query)?;
        return Ok(());
    }

    println!("Profile: {}", name);
    println!("URL: {}", profile.url);
    println!("Username: {}", profile.username);
    println!("Password: {}", mask_password(profile.password.as_deref()));
    println!("Insecure: {}", profile.insecure);
    if let Some(org) = &profile.default_org {
        println!("Default organization: {}", org);
    }
    if is_default {
        println!("{}", "This is the default profile".green());
    }
    Ok(())
}

#[cfg(feature = "secure-storage")]
fn store_password_in_keyring(name: &str, profile: Profile) -> CliResult<Profile> {
    let Some(password) = profile.password.as_deref() else {
        return Ok(profile);
    };
    let reference = CredentialStore::keyring()
        .store_credential(&format!("{}-password", name), password)
        .context("Failed to store password in keyring")?;
    println!("Password stored securely in OS keyring");
    Ok(Profile {
        password: Some(reference),
        ..profile
    })
}

/// Drop the keyring entry a removed profile referred to, if any
#[cfg(feature = "secure-storage")]
fn forget_keyring_password(profile: &Profile) {
    let Some(password) = profile.password.as_deref() else {
        return;
    };
    if !CredentialStore::is_keyring_reference(password) {
        return;
    }
    if let Err(e) = CredentialStore::keyring().delete_credential(password) {
        eprintln!(
            "{}: could not remove keyring entry: {}",
            "warning".yellow().bold(),
            e
        );
    }
}

fn handle_set(conn_mgr: &ConnectionManager, name: &str, profile: Profile) -> CliResult<()> {
    debug!("Setting profile: {}", name);

    if !profile.url.starts_with("http://") && !profile.url.starts_with("https://") {
        return Err(CliError::InvalidInput {
            message: format!("URL must start with http:// or https://, got '{}'", profile.url),
        });
    }

    let mut config = conn_mgr.config.clone();
    let first_profile = config.profiles.is_empty();
    config.set_profile(name.to_string(), profile);
    if first_profile {
        config.default_profile = Some(name.to_string());
    }

    let path = conn_mgr.save_config(&config)?;
    println!("Profile '{}' saved successfully to:", name);
    println!("  {}", path.display());
    if !first_profile && config.default_profile.as_deref() != Some(name) {
        println!();
        println!("Tip: Make it the default with:");
        println!("  changectl profile default {}", name);
    }
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Removing profile: {}", name);

    let mut config = conn_mgr.config.clone();
    let was_default = config.default_profile.as_deref() == Some(name);
    let Some(removed) = config.remove_profile(name) else {
        return Err(CliError::ProfileNotFound { name: name.into() });
    };

    debug!("Removed profile pointing at {}", removed.url);
    #[cfg(feature = "secure-storage")]
    forget_keyring_password(&removed);

    conn_mgr.save_config(&config)?;
    if was_default {
        println!("Default profile cleared.");
    }
    println!("Profile '{}' removed successfully.", name);
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Setting default profile: {}", name);
    conn_mgr.config.profile(name)?;

    let mut config = conn_mgr.config.clone();
    config.default_profile = Some(name.to_string());
    conn_mgr.save_config(&config)?;

    println!("Default profile set to '{}'.", name);
    Ok(())
}
