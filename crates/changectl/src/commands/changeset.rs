//! Changeset command implementations

use chrono::{DateTime, NaiveDateTime, Utc};
use colored::Colorize;
use serde_json::{Value, json};
use tabled::builder::Builder;
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};
use tracing::{debug, info};

use changectl_core::workflows::{self, ChangesetDetails};
use changectl_core::{
    Changeset, ContentDirectives, CreateRequest, PatchKind, ProgressCallback, ProgressEvent,
    TaskOutcome, UpdateRequest, WaitOptions,
};

use crate::cli::{ChangesetCommands, ChangesetTarget, Cli, UpdateArgs, WaitArgs};
use crate::connection::ConnectionManager;
use crate::error::{CliError, Result as CliResult};
use crate::output::{OutputFormat, print_output};
use crate::progress::Spinner;

const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
const APPLY_MESSAGE: &str = "Applying the changeset, please wait... ";

/// Row structure for vertical table display
#[derive(Tabled)]
pub struct DetailRow {
    #[tabled(rename = "FIELD")]
    pub field: String,
    #[tabled(rename = "VALUE")]
    pub value: String,
}

impl DetailRow {
    fn new(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

pub async fn handle_changeset_command(
    cmd: &ChangesetCommands,
    conn_mgr: &ConnectionManager,
    cli: &Cli,
) -> CliResult<()> {
    let org = conn_mgr.organization(cli.profile.as_deref(), cmd.environment().org.as_deref())?;
    let client = &conn_mgr.connect(cli.profile.as_deref())?;
    let structured = cli.output.is_structured();
    let format = OutputFormat::from(cli.output);
    let query = cli.query.as_deref();

    match cmd {
        ChangesetCommands::List { env } => {
            let listing = workflows::list_changesets(client, &org, &env.environment).await?;
            debug!(
                "Environment '{}' has {} changesets",
                listing.environment.name,
                listing.changesets.len()
            );
            if structured {
                print_output(&listing.changesets, format, query)?;
            } else {
                println!("{}", render_list(&listing.changesets, cli.verbose > 0));
            }
        }

        ChangesetCommands::Info {
            target,
            dependencies,
        } => {
            let details = workflows::changeset_info(
                client,
                &org,
                &target.env.environment,
                &target.name,
                *dependencies,
            )
            .await?;
            if structured {
                print_output(details_value(&details)?, format, query)?;
            } else {
                println!("{}", render_info(&details));
            }
        }

        ChangesetCommands::Create {
            env,
            name,
            description,
            promotion,
            deletion,
        } => {
            let request = CreateRequest {
                org,
                environment: env.environment.clone(),
                name: name.clone(),
                description: description.clone(),
                action_type: CreateRequest::action_type(*promotion, *deletion)?,
            };
            let outcome = workflows::create_changeset(client, &request).await?;
            let Some(changeset) = outcome.changeset else {
                return Err(CliError::CreateFailed {
                    name: name.clone(),
                    environment: env.environment.clone(),
                });
            };
            if structured {
                print_output(&changeset, format, query)?;
            } else {
                println!(
                    "Successfully created changeset [ {} ] for environment [ {} ]",
                    changeset.name, outcome.environment.name
                );
            }
        }

        ChangesetCommands::Update(args) => {
            let request = update_request(org, args)?;
            let summary = workflows::update_changeset(client, &request).await?;
            info!(
                "Updated changeset '{}': renamed={}, added={}, removed={}",
                request.name, summary.renamed, summary.added, summary.removed
            );
            if structured {
                let value = json!({
                    "name": request.new_name.as_deref().unwrap_or(&request.name),
                    "renamed": summary.renamed,
                    "added": summary.added,
                    "removed": summary.removed,
                });
                print_output(value, format, query)?;
            } else {
                println!("Successfully updated changeset [ {} ]", request.name);
            }
        }

        ChangesetCommands::Delete { target } => {
            let message = workflows::delete_changeset(
                client,
                &org,
                &target.env.environment,
                &target.name,
            )
            .await?;
            if structured {
                print_output(json!({ "message": message }), format, query)?;
            } else {
                println!("{}", message);
            }
        }

        ChangesetCommands::Apply { target, wait } => {
            let spinner = (!structured).then(|| Spinner::start(APPLY_MESSAGE));
            let result = workflows::apply_changeset(
                client,
                &org,
                &target.env.environment,
                &target.name,
                wait_options(wait),
                spinner.as_ref().map(spinner_callback),
            )
            .await;
            if let Some(spinner) = spinner {
                spinner.stop().await;
            }
            report_outcome(target, result?, structured, format, query)?;
        }

        ChangesetCommands::Promote { target, wait } => {
            eprintln!(
                "{}: 'changeset promote' is deprecated, use 'changeset apply'",
                "warning".yellow().bold()
            );
            let Some(changeset) = workflows::promotable_changeset(
                client,
                &org,
                &target.env.environment,
                &target.name,
            )
            .await?
            else {
                return Err(CliError::WrongActionType);
            };
            let spinner = (!structured).then(|| Spinner::start(APPLY_MESSAGE));
            let result = workflows::apply_resolved(
                client,
                &changeset,
                wait_options(wait),
                spinner.as_ref().map(spinner_callback),
            )
            .await;
            if let Some(spinner) = spinner {
                spinner.stop().await;
            }
            report_outcome(target, result?, structured, format, query)?;
        }
    }

    Ok(())
}

fn update_request(org: String, args: &UpdateArgs) -> CliResult<UpdateRequest> {
    let content = ContentDirectives {
        add: ContentDirectives::from_flags(
            PatchKind::Add,
            &args.add_content_view,
            &args.add_content_view_label,
            &args.add_content_view_id,
        )?,
        remove: ContentDirectives::from_flags(
            PatchKind::Remove,
            &args.remove_content_view,
            &args.remove_content_view_label,
            &args.remove_content_view_id,
        )?,
    };
    Ok(UpdateRequest {
        org,
        environment: args.target.env.environment.clone(),
        name: args.target.name.clone(),
        new_name: args.new_name.clone(),
        description: args.description.clone(),
        content,
    })
}

fn wait_options(wait: &WaitArgs) -> WaitOptions {
    WaitOptions {
        timeout: std::time::Duration::from_secs(wait.wait_timeout),
        interval: std::time::Duration::from_secs(wait.wait_interval),
    }
}

fn spinner_callback(spinner: &Spinner) -> ProgressCallback {
    let bar = spinner.bar();
    Box::new(move |event: ProgressEvent| match event {
        ProgressEvent::Started { task_id } => {
            debug!("Task {} started", task_id);
        }
        ProgressEvent::Polling { state, elapsed, .. } => {
            bar.set_message(format!(
                "{}{} ({:.0}s)",
                APPLY_MESSAGE,
                state,
                elapsed.as_secs_f64()
            ));
        }
        ProgressEvent::Completed { .. } => bar.set_message(APPLY_MESSAGE),
        ProgressEvent::Failed { error, .. } => {
            bar.set_message(format!("{}{}", APPLY_MESSAGE, error));
        }
    })
}

fn report_outcome(
    target: &ChangesetTarget,
    outcome: TaskOutcome,
    structured: bool,
    format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    if structured {
        print_output(outcome.task(), format, query)?;
    }
    match outcome {
        TaskOutcome::Succeeded(_) => {
            if !structured {
                println!("Changeset [ {} ] applied", target.name);
            }
            Ok(())
        }
        TaskOutcome::Canceled(_) => {
            if !structured {
                println!("Changeset [ {} ] apply was canceled", target.name);
            }
            Ok(())
        }
        TaskOutcome::Failed { errors, .. } => Err(CliError::TaskFailed {
            name: target.name.clone(),
            errors,
        }),
    }
}

fn details_value(details: &ChangesetDetails) -> CliResult<Value> {
    let mut value = serde_json::to_value(&details.changeset)?;
    if let (Some(deps), Value::Object(map)) = (&details.dependencies, &mut value) {
        map.insert("dependencies".to_string(), serde_json::to_value(deps)?);
    }
    Ok(value)
}

/// Render timestamps as `YYYY/MM/DD HH:MM:SS`; unparseable values pass through unchanged
pub fn format_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc).format(DATE_FORMAT).to_string();
    }
    let naive = raw.strip_suffix(" UTC").unwrap_or(raw);
    match NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S") {
        Ok(dt) => dt.format(DATE_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

fn render_list(changesets: &[Changeset], verbose: bool) -> String {
    let mut builder = Builder::default();
    let mut header = vec![
        "ID",
        "Name",
        "Action Type",
        "Last Updated",
        "State",
        "Environment ID",
        "Environment Name",
    ];
    if verbose {
        header.push("Description");
    }
    builder.push_record(header);

    for cs in changesets {
        let mut row = vec![
            cs.id.to_string(),
            cs.name.clone(),
            cs.action_type.to_string(),
            format_date(cs.updated_at.as_deref()),
            cs.state.clone(),
            cs.environment_id.to_string(),
            cs.environment_name.clone().unwrap_or_default(),
        ];
        if verbose {
            row.push(cs.description.clone().unwrap_or_default());
        }
        builder.push_record(row);
    }

    let mut table = builder.build();
    table
        .with(Style::modern())
        .with(Panel::header("Changeset List"));
    table.to_string()
}

fn render_info(details: &ChangesetDetails) -> String {
    let cs = &details.changeset;
    let mut rows = vec![
        DetailRow::new("ID", cs.id.to_string()),
        DetailRow::new("Name", cs.name.clone()),
        DetailRow::new("Action Type", cs.action_type.to_string()),
        DetailRow::new("Description", cs.description.clone().unwrap_or_default()),
        DetailRow::new("Last Updated", format_date(cs.updated_at.as_deref())),
        DetailRow::new("State", cs.state.clone()),
        DetailRow::new("Environment ID", cs.environment_id.to_string()),
        DetailRow::new(
            "Environment Name",
            cs.environment_name.clone().unwrap_or_default(),
        ),
        DetailRow::new(
            "Content Views",
            cs.content_views
                .iter()
                .map(|cv| cv.name.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    ];
    if let Some(deps) = &details.dependencies {
        rows.push(DetailRow::new(
            "Dependencies",
            deps.iter()
                .map(|d| d.display_name.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        ));
    }

    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .with(Panel::header("Changeset Info"));
    table.to_string()
}
