//! Changeset command definitions
//!
//! Content view flags keep their historical underscore spelling
//! (`--add_content_view`); the kebab-case form is accepted as an alias.

use clap::{ArgGroup, Args, Subcommand};

/// Organization and environment a command operates in
#[derive(Args, Debug, Clone)]
pub struct EnvironmentArgs {
    /// Organization name (defaults to the profile's default_org)
    #[arg(long)]
    pub org: Option<String>,

    /// Environment name
    #[arg(long, visible_alias = "env")]
    pub environment: String,
}

/// A single changeset within an environment
#[derive(Args, Debug, Clone)]
pub struct ChangesetTarget {
    #[command(flatten)]
    pub env: EnvironmentArgs,

    /// Changeset name
    #[arg(long)]
    pub name: String,
}

/// Polling limits for apply/promote
#[derive(Args, Debug, Clone, Copy)]
pub struct WaitArgs {
    /// Seconds to wait for the apply task before giving up
    #[arg(long = "wait-timeout", alias = "wait_timeout", default_value_t = 3600)]
    pub wait_timeout: u64,

    /// Seconds between task status checks
    #[arg(
        long = "wait-interval",
        alias = "wait_interval",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub wait_interval: u64,
}

#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("add_views")
        .args(["add_content_view", "add_content_view_label", "add_content_view_id"])
        .multiple(false)
))]
#[command(group(
    ArgGroup::new("remove_views")
        .args(["remove_content_view", "remove_content_view_label", "remove_content_view_id"])
        .multiple(false)
))]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: ChangesetTarget,

    /// New changeset name
    #[arg(long = "new_name", alias = "new-name")]
    pub new_name: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// Content view to add, by name (repeatable)
    #[arg(long = "add_content_view", alias = "add-content-view", value_name = "NAME")]
    pub add_content_view: Vec<String>,

    /// Content view to add, by label (repeatable)
    #[arg(
        long = "add_content_view_label",
        alias = "add-content-view-label",
        value_name = "LABEL"
    )]
    pub add_content_view_label: Vec<String>,

    /// Content view to add, by id (repeatable)
    #[arg(long = "add_content_view_id", alias = "add-content-view-id", value_name = "ID")]
    pub add_content_view_id: Vec<String>,

    /// Content view to remove, by name (repeatable)
    #[arg(
        long = "remove_content_view",
        alias = "remove-content-view",
        value_name = "NAME"
    )]
    pub remove_content_view: Vec<String>,

    /// Content view to remove, by label (repeatable)
    #[arg(
        long = "remove_content_view_label",
        alias = "remove-content-view-label",
        value_name = "LABEL"
    )]
    pub remove_content_view_label: Vec<String>,

    /// Content view to remove, by id (repeatable)
    #[arg(
        long = "remove_content_view_id",
        alias = "remove-content-view-id",
        value_name = "ID"
    )]
    pub remove_content_view_id: Vec<String>,
}

/// Changeset commands
#[derive(Subcommand, Debug)]
pub enum ChangesetCommands {
    /// List changesets in an environment
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        env: EnvironmentArgs,
    },

    /// Show one changeset
    #[command(visible_alias = "show")]
    Info {
        #[command(flatten)]
        target: ChangesetTarget,

        /// Also list the changeset's dependencies
        #[arg(long)]
        dependencies: bool,
    },

    /// Create a changeset
    #[command(after_help = "EXAMPLES:
    # Promotion changeset (the default)
    changectl changeset create --org ACME --environment Dev --name Q3

    # Deletion changeset with a description
    changectl changeset create --org ACME --environment Dev --name cleanup \\
        --deletion --description 'retire old views'
")]
    Create {
        #[command(flatten)]
        env: EnvironmentArgs,

        /// Changeset name
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Promote content from the prior environment (default)
        #[arg(long, conflicts_with = "deletion")]
        promotion: bool,

        /// Delete content from this environment
        #[arg(long)]
        deletion: bool,
    },

    /// Rename a changeset or change its content views
    #[command(after_help = "EXAMPLES:
    # Add two views by name and drop one by id
    changectl changeset update --org ACME --environment Dev --name Q3 \\
        --add_content_view Base --add_content_view Tools --remove_content_view_id 12

    # Rename
    changectl changeset update --org ACME --environment Dev --name Q3 --new_name Q3-final
")]
    Update(UpdateArgs),

    /// Delete a changeset
    #[command(visible_alias = "rm")]
    Delete {
        #[command(flatten)]
        target: ChangesetTarget,
    },

    /// Apply a changeset and wait for the server task
    Apply {
        #[command(flatten)]
        target: ChangesetTarget,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Promote a changeset (deprecated, use apply)
    Promote {
        #[command(flatten)]
        target: ChangesetTarget,

        #[command(flatten)]
        wait: WaitArgs,
    },
}

impl ChangesetCommands {
    /// Organization and environment the command targets
    pub fn environment(&self) -> &EnvironmentArgs {
        match self {
            ChangesetCommands::List { env } | ChangesetCommands::Create { env, .. } => env,
            ChangesetCommands::Update(args) => &args.target.env,
            ChangesetCommands::Info { target, .. }
            | ChangesetCommands::Delete { target }
            | ChangesetCommands::Apply { target, .. }
            | ChangesetCommands::Promote { target, .. } => &target.env,
        }
    }
}
