//! Changeset workflows
//!
//! Each workflow composes name resolution, patch building, API calls and task
//! polling into one user-level operation. Nothing here prints; callers decide
//! how to present the results.

use std::time::Duration;

use tracing::{debug, info};

use crate::api::{ChangesetApi, Resolver};
use crate::error::{CoreError, Result};
use crate::patch::{ContentDirectives, PatchItemBuilder, PatchKind, build_patch};
use crate::progress::{ProgressCallback, TaskOutcome, poll_task};
use crate::types::{ActionType, Changeset, Dependency, Environment};

/// Changesets of one environment, with the environment they were listed from
#[derive(Debug, Clone)]
pub struct ChangesetListing {
    pub environment: Environment,
    pub changesets: Vec<Changeset>,
}

/// List every changeset of an environment
pub async fn list_changesets<C>(api: &C, org: &str, env_name: &str) -> Result<ChangesetListing>
where
    C: Resolver + ChangesetApi + ?Sized,
{
    let environment = api.environment(org, env_name).await?;
    let changesets = api
        .changesets(org, environment.id)
        .await?
        .into_iter()
        .map(|mut cs| {
            if cs.environment_name.is_none() {
                cs.environment_name = Some(environment.name.clone());
            }
            cs
        })
        .collect();

    Ok(ChangesetListing {
        environment,
        changesets,
    })
}

#[derive(Debug, Clone)]
pub struct ChangesetDetails {
    pub changeset: Changeset,
    /// Present only when dependencies were requested
    pub dependencies: Option<Vec<Dependency>>,
}

/// Fetch one changeset, optionally with its dependency list
pub async fn changeset_info<C>(
    api: &C,
    org: &str,
    env_name: &str,
    name: &str,
    with_dependencies: bool,
) -> Result<ChangesetDetails>
where
    C: Resolver + ChangesetApi + ?Sized,
{
    let environment = api.environment(org, env_name).await?;
    let mut changeset = api.changeset(org, &environment, name).await?;
    changeset.environment_name = Some(env_name.to_string());

    let dependencies = if with_dependencies {
        Some(api.dependencies(changeset.id).await?)
    } else {
        None
    };

    Ok(ChangesetDetails {
        changeset,
        dependencies,
    })
}

/// Parameters for creating a changeset
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub org: String,
    pub environment: String,
    pub name: String,
    pub description: Option<String>,
    pub action_type: ActionType,
}

impl CreateRequest {
    /// Decide the action type from the two mutually exclusive flags.
    ///
    /// Neither flag means promotion.
    pub fn action_type(promotion: bool, deletion: bool) -> Result<ActionType> {
        match (promotion, deletion) {
            (true, true) => Err(CoreError::Validation(
                "specify either --promotion or --deletion, not both".to_string(),
            )),
            (_, true) => Ok(ActionType::Deletion),
            _ => Ok(ActionType::Promotion),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub environment: Environment,
    /// `None` when the server accepted the request but returned no record
    pub changeset: Option<Changeset>,
}

pub async fn create_changeset<C>(api: &C, request: &CreateRequest) -> Result<CreateOutcome>
where
    C: Resolver + ChangesetApi + ?Sized,
{
    let environment = api.environment(&request.org, &request.environment).await?;
    info!(
        "Creating {} changeset '{}' in environment '{}'",
        request.action_type, request.name, environment.name
    );
    let changeset = api
        .create(
            &request.org,
            environment.id,
            &request.name,
            request.action_type,
            request.description.as_deref(),
        )
        .await?;

    Ok(CreateOutcome {
        environment,
        changeset,
    })
}

/// Parameters for updating a changeset
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub org: String,
    pub environment: String,
    pub name: String,
    pub new_name: Option<String>,
    pub description: Option<String>,
    pub content: ContentDirectives,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub renamed: bool,
    pub added: usize,
    pub removed: usize,
}

/// Rename/describe a changeset and add/remove content views.
///
/// All content views are resolved before anything is changed, so a bad
/// reference leaves the changeset untouched. The calls that follow run in
/// order (update, adds, removes) without rollback: a failing remove leaves
/// earlier changes in place.
pub async fn update_changeset<C>(api: &C, request: &UpdateRequest) -> Result<UpdateSummary>
where
    C: Resolver + ChangesetApi + ?Sized,
{
    let environment = api.environment(&request.org, &request.environment).await?;
    let changeset = api
        .changeset(&request.org, &environment, &request.name)
        .await?;

    let (add_patch, remove_patch) = if request.content.is_empty() {
        Default::default()
    } else {
        let builder = PatchItemBuilder::new(
            api,
            &request.org,
            &request.environment,
            changeset.action_type,
        )
        .await?;
        (
            build_patch(PatchKind::Add, &builder, &request.content.add).await?,
            build_patch(PatchKind::Remove, &builder, &request.content.remove).await?,
        )
    };
    debug!(
        "Changeset {}: {} item(s) to add, {} to remove",
        changeset.id,
        add_patch.len(),
        remove_patch.len()
    );

    let mut summary = UpdateSummary::default();

    if request.new_name.is_some() || request.description.is_some() {
        api.update(
            changeset.id,
            request.new_name.as_deref(),
            request.description.as_deref(),
        )
        .await?;
        summary.renamed = request.new_name.is_some();
    }

    for (kind, item) in add_patch.entries() {
        api.add_content(changeset.id, kind, item).await?;
        summary.added += 1;
    }
    for (kind, item) in remove_patch.entries() {
        api.remove_content(changeset.id, kind, item).await?;
        summary.removed += 1;
    }

    Ok(summary)
}

/// Delete a changeset, returning the server's message
pub async fn delete_changeset<C>(api: &C, org: &str, env_name: &str, name: &str) -> Result<String>
where
    C: Resolver + ChangesetApi + ?Sized,
{
    let environment = api.environment(org, env_name).await?;
    let changeset = api.changeset(org, &environment, name).await?;
    info!("Deleting changeset {} ('{}')", changeset.id, changeset.name);
    api.delete(changeset.id).await
}

/// How long and how often to poll an applied changeset
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600),
            interval: Duration::from_secs(1),
        }
    }
}

/// Apply a changeset and wait for the server task to finish
pub async fn apply_changeset<C>(
    api: &C,
    org: &str,
    env_name: &str,
    name: &str,
    wait: WaitOptions,
    on_progress: Option<ProgressCallback>,
) -> Result<TaskOutcome>
where
    C: Resolver + ChangesetApi + ?Sized,
{
    let environment = api.environment(org, env_name).await?;
    let changeset = api.changeset(org, &environment, name).await?;
    apply_resolved(api, &changeset, wait, on_progress).await
}

/// Submit an already looked-up changeset and wait for its task
pub async fn apply_resolved<C>(
    api: &C,
    changeset: &Changeset,
    wait: WaitOptions,
    on_progress: Option<ProgressCallback>,
) -> Result<TaskOutcome>
where
    C: ChangesetApi + ?Sized,
{
    info!("Applying changeset {} ('{}')", changeset.id, changeset.name);
    let task = api.apply(changeset.id).await?;
    if task.uuid.is_empty() {
        return Err(CoreError::TaskFailed(
            "server returned no task handle".to_string(),
        ));
    }
    poll_task(api, task, wait.timeout, wait.interval, on_progress).await
}

/// Look up a changeset for the deprecated promote command.
///
/// Deletion changesets cannot be promoted and come back as `None`; the caller
/// decides how to report that before anything is submitted.
pub async fn promotable_changeset<C>(
    api: &C,
    org: &str,
    env_name: &str,
    name: &str,
) -> Result<Option<Changeset>>
where
    C: Resolver + ChangesetApi + ?Sized,
{
    let environment = api.environment(org, env_name).await?;
    let changeset = api.changeset(org, &environment, name).await?;
    if changeset.action_type == ActionType::Deletion {
        debug!("Refusing to promote deletion changeset {}", changeset.id);
        return Ok(None);
    }
    Ok(Some(changeset))
}
