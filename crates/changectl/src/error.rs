//! Error types for changectl
//!
//! Defines structured error types using thiserror, each with an exit code and
//! suggestions shown to the user.

use changectl_core::{ConfigError, CoreError};
use colored::Colorize;
use thiserror::Error;

/// `EX_USAGE` from sysexits.h
pub const EXIT_USAGE: i32 = 64;
/// `EX_DATAERR` from sysexits.h
pub const EXIT_DATA_ERROR: i32 = 65;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Could not find environment [ Prod ] within organization [ ACME ]
///
///   tip: check the spelling, names are case-sensitive
/// ```
pub struct CliDiagnostic {
    message: String,
    details: Vec<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            details: Vec::new(),
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.details.push(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for detail in &self.details {
            eprintln!("  {}", detail);
        }

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the changectl application
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured. Use 'changectl profile set' to configure a profile.")]
    NoProfileConfigured,

    #[error("No organization given. Use --org or set default_org on the profile.")]
    MissingOrganization,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("This is a deletion changeset and does not support promotion")]
    WrongActionType,

    #[error("Could not create changeset [ {name} ] for environment [ {environment} ]")]
    CreateFailed { name: String, environment: String },

    #[error("Changeset [ {name} ] promotion failed")]
    TaskFailed { name: String, errors: Vec<String> },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for changectl operations
pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidInput { .. } | CliError::MissingOrganization => EXIT_USAGE,
            CliError::WrongActionType => EXIT_DATA_ERROR,
            _ => 1,
        }
    }

    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            CliError::ProfileNotFound { name } => vec![
                "List available profiles: changectl profile list".to_string(),
                format!(
                    "Create profile '{}': changectl profile set {} --url <url> --username <user>",
                    name, name
                ),
            ],
            CliError::NoProfileConfigured => vec![
                "Create a profile: changectl profile set <name> --url <url> --username <user>"
                    .to_string(),
                "Or set CHANGECTL_URL and CHANGECTL_USERNAME".to_string(),
            ],
            CliError::AuthenticationFailed { .. } => vec![
                "Check your credentials: changectl profile show <profile>".to_string(),
                "Verify the username and password are correct".to_string(),
            ],
            CliError::ConnectionError { message }
                if message.contains("certificate") || message.contains("SSL") =>
            {
                vec![
                    "For self-signed certificates: changectl profile set <name> ... --insecure"
                        .to_string(),
                    "Or set CHANGECTL_INSECURE=true".to_string(),
                ]
            }
            CliError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the server URL is correct: changectl profile show <profile>".to_string(),
            ],
            CliError::NotFound(_) => vec![
                "Names are case-sensitive; check the spelling".to_string(),
                "List changesets: changectl changeset list --org <org> --environment <env>"
                    .to_string(),
            ],
            CliError::WrongActionType => {
                vec!["Use 'changectl changeset apply' for deletion changesets".to_string()]
            }
            CliError::Timeout { .. } => vec![
                "The task may still be running on the server".to_string(),
                "Raise the limit with --wait-timeout <secs>".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&self.to_string());

        if let CliError::TaskFailed { errors, .. } = self {
            for error in errors {
                diag = diag.detail(error);
            }
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }

        diag.print();
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            _ if err.is_unauthorized() => CliError::AuthenticationFailed {
                message: err.to_string(),
            },
            _ if err.is_not_found() => CliError::NotFound(err.to_string()),
            CoreError::Validation(message) => CliError::InvalidInput { message },
            CoreError::TaskTimeout(duration) => CliError::Timeout {
                message: format!("Task did not finish within {} seconds", duration.as_secs()),
            },
            CoreError::TaskFailed(message) => CliError::ApiError { message },
            CoreError::Config(message) => CliError::Config(message),
            CoreError::Transport(e) if e.is_timeout() => CliError::Timeout {
                message: format!("Request timed out: {}", e),
            },
            CoreError::Transport(e) => CliError::ConnectionError {
                message: e.to_string(),
            },
            CoreError::NotFound { .. } | CoreError::Api { .. } | CoreError::Decode { .. } => {
                CliError::ApiError {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound { name },
            ConfigError::NoProfiles { .. } => CliError::NoProfileConfigured,
            other => CliError::Config(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Config(format!("{:#}", err))
    }
}
