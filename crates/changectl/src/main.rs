use changectl_core::Config;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;
mod progress;

use cli::{ChangesetCommands, Cli, Commands};
use connection::ConnectionManager;
use error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        e.print_diagnostic();
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    check_query_format(cli)?;

    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    debug!(
        "Creating ConnectionManager with config_path: {:?}",
        config_path
    );
    let conn_mgr = ConnectionManager::with_config_path(config, config_path);

    execute_command(cli, &conn_mgr).await
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "changectl=warn,changectl_core=warn",
            1 => "changectl=info,changectl_core=info",
            2 => "changectl=debug,changectl_core=debug",
            _ => "changectl=trace,changectl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), CliError> {
    info!("Command: {}", format_command(&cli.command));

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Version => {
            debug!("Showing version information");
            if cli.output.is_structured() {
                let output_data = serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "name": env!("CARGO_PKG_NAME"),
                });
                output::print_output(&output_data, cli.output.into(), cli.query.as_deref())
                    .map_err(CliError::from)
            } else {
                println!("changectl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
        Commands::Completions { shell } => {
            debug!("Generating completions for {:?}", shell);
            generate_completions(*shell);
            Ok(())
        }
        Commands::Profile(profile_cmd) => {
            debug!("Executing profile command");
            commands::profile::handle_profile_command(
                profile_cmd,
                conn_mgr,
                cli.output,
                cli.query.as_deref(),
            )
            .await
        }
        Commands::Changeset(changeset_cmd) => {
            commands::changeset::handle_changeset_command(changeset_cmd, conn_mgr, cli).await
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// `--query` filters structured data only; tables and messages have nothing to filter
fn check_query_format(cli: &Cli) -> Result<(), CliError> {
    if cli.query.is_some() && !cli.output.is_structured() {
        return Err(CliError::InvalidInput {
            message: "--query requires -o json or -o yaml".to_string(),
        });
    }
    Ok(())
}

/// Generate shell completions
fn generate_completions(shell: cli::Shell) {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    match shell {
        cli::Shell::Bash => generate(shells::Bash, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Zsh => generate(shells::Zsh, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Fish => generate(shells::Fish, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, name, &mut std::io::stdout())
        }
        cli::Shell::Elvish => generate(shells::Elvish, &mut cmd, name, &mut std::io::stdout()),
    }
}

/// Format command for human-readable logging (without sensitive data)
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Version => "version".to_string(),
        Commands::Completions { shell } => format!("completions {:?}", shell),
        Commands::Profile(cmd) => {
            use cli::ProfileCommands::*;
            match cmd {
                List => "profile list".to_string(),
                Path => "profile path".to_string(),
                Show { name } => format!("profile show {}", name),
                Set { name, .. } => format!("profile set {} [credentials redacted]", name),
                Remove { name } => format!("profile remove {}", name),
                Default { name } => format!("profile default {}", name),
            }
        }
        Commands::Changeset(cmd) => match cmd {
            ChangesetCommands::List { env } => {
                format!("changeset list --environment {}", env.environment)
            }
            ChangesetCommands::Info { target, .. } => {
                format!("changeset info --name {}", target.name)
            }
            ChangesetCommands::Create { name, env, .. } => format!(
                "changeset create --environment {} --name {}",
                env.environment, name
            ),
            ChangesetCommands::Update(args) => {
                format!("changeset update --name {}", args.target.name)
            }
            ChangesetCommands::Delete { target } => {
                format!("changeset delete --name {}", target.name)
            }
            ChangesetCommands::Apply { target, .. } => {
                format!("changeset apply --name {}", target.name)
            }
            ChangesetCommands::Promote { target, .. } => {
                format!("changeset promote --name {}", target.name)
            }
        },
    }
}
