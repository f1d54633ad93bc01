//! Server access layer
//!
//! Workflows talk to the server only through [`Resolver`] and [`ChangesetApi`].
//! [`ServerClient`] implements both over HTTP.

use async_trait::async_trait;

use crate::error::Result;
use crate::patch::{ContentViewRef, PatchItem};
use crate::types::{ActionType, AsyncTask, Changeset, ContentView, Dependency, Environment};

mod client;

pub use client::{ServerClient, ServerClientBuilder};

/// Turns human-readable names into server records
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn environment(&self, org: &str, name: &str) -> Result<Environment>;

    async fn changeset(&self, org: &str, env: &Environment, name: &str) -> Result<Changeset>;

    /// Look up a content view addressable from `env`
    async fn content_view(
        &self,
        org: &str,
        env: &Environment,
        reference: &ContentViewRef,
    ) -> Result<ContentView>;
}

/// Changeset operations and task status queries
#[async_trait]
pub trait ChangesetApi: Send + Sync {
    async fn changesets(&self, org: &str, env_id: u64) -> Result<Vec<Changeset>>;

    async fn create(
        &self,
        org: &str,
        env_id: u64,
        name: &str,
        action_type: ActionType,
        description: Option<&str>,
    ) -> Result<Option<Changeset>>;

    async fn update(
        &self,
        id: u64,
        new_name: Option<&str>,
        description: Option<&str>,
    ) -> Result<()>;

    async fn add_content(&self, id: u64, kind: &str, item: &PatchItem) -> Result<()>;

    async fn remove_content(&self, id: u64, kind: &str, item: &PatchItem) -> Result<()>;

    /// Returns the server's confirmation message
    async fn delete(&self, id: u64) -> Result<String>;

    async fn apply(&self, id: u64) -> Result<AsyncTask>;

    async fn dependencies(&self, id: u64) -> Result<Vec<Dependency>>;

    async fn task(&self, uuid: &str) -> Result<AsyncTask>;
}
