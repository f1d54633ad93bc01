//! # changectl-core
//!
//! Library behind the `changectl` CLI: a client for content changesets on a
//! lifecycle-management server.
//!
//! A changeset belongs to one environment of an organization's promotion path
//! and carries a set of content views. A *promotion* changeset pulls views in
//! from the environment before it; a *deletion* changeset removes views from
//! its own environment. Applying a changeset starts a server task which is
//! polled until it finishes.
//!
//! ## Layout
//!
//! - [`api`] - the [`Resolver`] and [`ChangesetApi`] seams and their HTTP
//!   implementation, [`ServerClient`]
//! - [`patch`] - turning content view names/labels/ids into add/remove patches
//! - [`progress`] - task polling with progress callbacks
//! - [`workflows`] - one function per user-level operation
//! - [`config`] - profiles, credentials and the config file
//!
//! ## Example
//!
//! ```rust,ignore
//! use changectl_core::{ServerClient, workflows};
//!
//! let client = ServerClient::builder()
//!     .base_url("https://satellite.example.com")
//!     .username("admin")
//!     .password("changeme")
//!     .build()?;
//!
//! let listing = workflows::list_changesets(&client, "ACME", "Dev").await?;
//! for cs in &listing.changesets {
//!     println!("{} {}", cs.id, cs.name);
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod patch;
pub mod progress;
pub mod types;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ChangesetApi, Resolver, ServerClient, ServerClientBuilder};
pub use config::{Config, ConfigError, CredentialStore, Profile, ResolvedProfile};
pub use error::{CoreError, Result};
pub use patch::{
    CONTENT_VIEWS, ContentDirectives, ContentViewRef, Patch, PatchItem, PatchItemBuilder,
    PatchKind, build_patch,
};
pub use progress::{ProgressCallback, ProgressEvent, TaskOutcome, TaskState, poll_task};
pub use types::{ActionType, AsyncTask, Changeset, ContentView, Dependency, Environment};
pub use workflows::{
    ChangesetDetails, ChangesetListing, CreateOutcome, CreateRequest, UpdateRequest,
    UpdateSummary, WaitOptions,
};
