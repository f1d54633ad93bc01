//! In-memory server double used by unit tests
//!
//! Serves a fixed organization `ACME` with a `Library -> Dev` promotion path
//! and records every mutating or status call in order.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ChangesetApi, Resolver};
use crate::error::{CoreError, Result};
use crate::patch::{ContentViewRef, PatchItem};
use crate::types::{ActionType, AsyncTask, Changeset, ContentView, Dependency, Environment};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Changesets(u64),
    Create {
        env_id: u64,
        name: String,
        action_type: ActionType,
        description: Option<String>,
    },
    Update {
        id: u64,
        new_name: Option<String>,
        description: Option<String>,
    },
    AddContent(u64, String, PatchItem),
    RemoveContent(u64, String, PatchItem),
    Delete(u64),
    Apply(u64),
    Dependencies(u64),
    Task(String),
}

pub struct FakeServer {
    pub environments: Vec<Environment>,
    /// (environment id, view)
    pub views: Vec<(u64, ContentView)>,
    pub changesets: Vec<Changeset>,
    pub calls: Mutex<Vec<Call>>,
    /// Handle returned by `apply`
    pub applied: Mutex<Option<AsyncTask>>,
    /// Successive answers to `task`; the last one repeats
    pub task_states: Mutex<VecDeque<AsyncTask>>,
    pub fail_remove: bool,
    pub create_returns_nothing: bool,
}

pub fn task(uuid: &str, state: &str) -> AsyncTask {
    AsyncTask {
        uuid: uuid.to_string(),
        state: state.to_string(),
        progress: None,
        result: None,
        start_time: None,
        finish_time: None,
    }
}

fn view(id: u64, name: &str, label: &str) -> ContentView {
    ContentView {
        id,
        name: name.to_string(),
        label: Some(label.to_string()),
        description: None,
    }
}

fn changeset(id: u64, name: &str, action_type: ActionType) -> Changeset {
    Changeset {
        id,
        name: name.to_string(),
        description: Some(format!("{} description", name)),
        action_type,
        state: "new".to_string(),
        environment_id: 7,
        environment_name: None,
        updated_at: Some("2024-03-01T10:15:30Z".to_string()),
        content_views: vec![view(101, "CV1", "cv1")],
    }
}

impl FakeServer {
    pub fn standard() -> Self {
        Self {
            environments: vec![
                Environment {
                    id: 1,
                    name: "Library".to_string(),
                    label: Some("Library".to_string()),
                    description: None,
                    prior: None,
                    prior_id: None,
                    library: true,
                },
                Environment {
                    id: 7,
                    name: "Dev".to_string(),
                    label: Some("dev".to_string()),
                    description: None,
                    prior: Some("Library".to_string()),
                    prior_id: Some(1),
                    library: false,
                },
            ],
            views: vec![
                (1, view(1, "CV1", "cv1")),
                (1, view(2, "CV2", "cv2")),
                (7, view(101, "CV1", "cv1")),
                (7, view(102, "CV2", "cv2")),
                (7, view(103, "CV3", "cv3")),
            ],
            changesets: vec![
                changeset(50, "CS1", ActionType::Promotion),
                changeset(51, "Cleanup", ActionType::Deletion),
            ],
            calls: Mutex::new(Vec::new()),
            applied: Mutex::new(Some(task("task-1", "waiting"))),
            task_states: Mutex::new(VecDeque::from(vec![task("task-1", "finished")])),
            fail_remove: false,
            create_returns_nothing: false,
        }
    }

    pub fn with_task_states(self, states: &[&str]) -> Self {
        *self.task_states.lock().unwrap() = states.iter().map(|s| task("task-1", s)).collect();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn not_found(kind: &'static str, name: &str) -> CoreError {
        CoreError::NotFound {
            kind,
            name: name.to_string(),
            organization: "ACME".to_string(),
        }
    }
}

#[async_trait]
impl Resolver for FakeServer {
    async fn environment(&self, _org: &str, name: &str) -> Result<Environment> {
        self.environments
            .iter()
            .find(|e| e.name == name)
            .cloned()
            .ok_or_else(|| Self::not_found("environment", name))
    }

    async fn changeset(&self, _org: &str, env: &Environment, name: &str) -> Result<Changeset> {
        self.changesets
            .iter()
            .find(|c| c.name == name && c.environment_id == env.id)
            .cloned()
            .ok_or_else(|| Self::not_found("changeset", name))
    }

    async fn content_view(
        &self,
        _org: &str,
        env: &Environment,
        reference: &ContentViewRef,
    ) -> Result<ContentView> {
        self.views
            .iter()
            .filter(|(env_id, _)| *env_id == env.id)
            .map(|(_, v)| v)
            .find(|v| reference.matches(v))
            .cloned()
            .ok_or_else(|| Self::not_found("content view", reference.value()))
    }
}

#[async_trait]
impl ChangesetApi for FakeServer {
    async fn changesets(&self, _org: &str, env_id: u64) -> Result<Vec<Changeset>> {
        self.record(Call::Changesets(env_id));
        Ok(self
            .changesets
            .iter()
            .filter(|c| c.environment_id == env_id)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        _org: &str,
        env_id: u64,
        name: &str,
        action_type: ActionType,
        description: Option<&str>,
    ) -> Result<Option<Changeset>> {
        self.record(Call::Create {
            env_id,
            name: name.to_string(),
            action_type,
            description: description.map(str::to_string),
        });
        if self.create_returns_nothing {
            return Ok(None);
        }
        let mut created = changeset(60, name, action_type);
        created.environment_id = env_id;
        created.content_views.clear();
        Ok(Some(created))
    }

    async fn update(
        &self,
        id: u64,
        new_name: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        self.record(Call::Update {
            id,
            new_name: new_name.map(str::to_string),
            description: description.map(str::to_string),
        });
        Ok(())
    }

    async fn add_content(&self, id: u64, kind: &str, item: &PatchItem) -> Result<()> {
        self.record(Call::AddContent(id, kind.to_string(), *item));
        Ok(())
    }

    async fn remove_content(&self, id: u64, kind: &str, item: &PatchItem) -> Result<()> {
        self.record(Call::RemoveContent(id, kind.to_string(), *item));
        if self.fail_remove {
            return Err(CoreError::Api {
                status: 500,
                message: "remove failed".to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<String> {
        self.record(Call::Delete(id));
        Ok(format!("Deleted changeset '{}'", id))
    }

    async fn apply(&self, id: u64) -> Result<AsyncTask> {
        self.record(Call::Apply(id));
        self.applied
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CoreError::Api {
                status: 422,
                message: "changeset cannot be applied".to_string(),
            })
    }

    async fn dependencies(&self, id: u64) -> Result<Vec<Dependency>> {
        self.record(Call::Dependencies(id));
        Ok(vec![Dependency {
            display_name: "glibc-2.17".to_string(),
            dependency_of: Some("CV1".to_string()),
        }])
    }

    async fn task(&self, uuid: &str) -> Result<AsyncTask> {
        self.record(Call::Task(uuid.to_string()));
        let mut states = self.task_states.lock().unwrap();
        if states.len() > 1 {
            Ok(states.pop_front().unwrap())
        } else {
            states
                .front()
                .cloned()
                .ok_or_else(|| CoreError::Api {
                    status: 404,
                    message: "no such task".to_string(),
                })
        }
    }
}
