//! CLI structure and command definitions
//!
//! Defines the command-line interface using clap. Changeset operations live in
//! [`changeset`]; profile management and housekeeping commands are here.

use clap::{Parser, Subcommand};

pub mod changeset;

pub use changeset::*;

/// Content changeset management CLI
#[derive(Parser, Debug)]
#[command(name = "changectl")]
#[command(
    version,
    about = "Manage content changesets across deployment environments"
)]
#[command(long_about = "
Manage content changesets across deployment environments

A changeset collects content views to promote into an environment, or to
delete from it, and is applied as one server task.

EXAMPLES:
    # Set up a profile
    changectl profile set prod --url https://satellite.example.com --username admin

    # List changesets in an environment
    changectl changeset list --org ACME --environment Dev

    # Build and apply a promotion changeset
    changectl changeset create --org ACME --environment Dev --name Q3
    changectl changeset update --org ACME --environment Dev --name Q3 --add_content_view Base
    changectl changeset apply --org ACME --environment Dev --name Q3

    # Filter JSON output with JMESPath
    changectl changeset list --org ACME --environment Dev -o json -q '[?state==`new`].name'

For more help on a specific command, run:
    changectl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "CHANGECTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "CHANGECTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// JMESPath query to filter output
    #[arg(long, short = 'q', global = true)]
    pub query: Option<String>,

    /// Enable verbose logging; also adds detail columns to listings
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Tables and messages for humans
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

impl OutputFormat {
    /// Whether results should be emitted as structured data
    pub fn is_structured(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Yaml)
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Changeset operations
    #[command(subcommand, visible_alias = "cs")]
    Changeset(ChangesetCommands),

    /// Profile management
    #[command(subcommand, visible_alias = "prof", visible_alias = "pr")]
    #[command(after_help = "EXAMPLES:
    # Create a profile (password will be prompted on use)
    changectl profile set prod --url https://satellite.example.com --username admin

    # Create a profile with a default organization, password in the OS keyring
    changectl profile set lab --url https://lab:8443 --username admin \\
        --password secret --default-org ACME --use-keyring --insecure

    # List all profiles
    changectl profile list

    # Make 'lab' the default
    changectl profile default lab
")]
    Profile(ProfileCommands),

    /// Version information
    #[command(visible_alias = "ver")]
    Version,

    /// Generate shell completions
    #[command(visible_alias = "comp")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion generation
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bourne Again Shell
    Bash,
    /// Z Shell
    Zsh,
    /// Friendly Interactive Shell
    Fish,
    /// PowerShell
    #[value(name = "powershell", alias = "power-shell")]
    PowerShell,
    /// Elvish
    Elvish,
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    #[command(visible_alias = "add")]
    Set {
        /// Profile name
        name: String,

        /// Server URL, e.g. https://satellite.example.com
        #[arg(long)]
        url: String,

        #[arg(long)]
        username: String,

        /// Password; prompted for on each command when omitted
        #[arg(long)]
        password: Option<String>,

        /// Skip TLS certificate verification
        #[arg(long)]
        insecure: bool,

        /// Organization used when --org is omitted
        #[arg(long)]
        default_org: Option<String>,

        /// Store the password in the OS keyring instead of the config file
        #[cfg(feature = "secure-storage")]
        #[arg(long, requires = "password")]
        use_keyring: bool,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name to remove
        name: String,
    },

    /// Set the default profile
    Default {
        /// Profile name to use by default
        name: String,
    },
}
