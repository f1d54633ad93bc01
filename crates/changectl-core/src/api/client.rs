//! HTTP implementation of the server traits

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};
use url::Url;

use super::{ChangesetApi, Resolver};
use crate::error::{CoreError, Result};
use crate::patch::{ContentViewRef, PatchItem};
use crate::types::{ActionType, AsyncTask, Changeset, ContentView, Dependency, Environment};

const DEFAULT_USER_AGENT: &str = concat!("changectl/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest error body echoed back to the user
const MAX_ERROR_BODY: usize = 200;

/// Builder for [`ServerClient`]
#[derive(Debug, Clone)]
pub struct ServerClientBuilder {
    base_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    insecure: bool,
    timeout: Duration,
    user_agent: String,
}

impl Default for ServerClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ServerClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Accept self-signed or otherwise invalid server certificates
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<ServerClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| CoreError::Config("server URL is required".to_string()))?;
        Url::parse(&base_url)
            .map_err(|e| CoreError::Config(format!("invalid server URL '{}': {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .danger_accept_invalid_certs(self.insecure)
            .build()?;

        Ok(ServerClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: self.username,
            password: self.password,
        })
    }
}

/// Authenticated client for the content server REST API
#[derive(Clone)]
pub struct ServerClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl std::fmt::Debug for ServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl ServerClient {
    pub fn builder() -> ServerClientBuilder {
        ServerClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| CoreError::Config(format!("invalid request URL for {}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<String> {
        let url = self.url(path, query)?;
        debug!("{} {}", method, url);
        if let Some(body) = body {
            trace!("Request body: {}", body);
        }

        let mut builder = self.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        read_body(path, response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let text = self.send(Method::GET, path, query, None).await?;
        decode(path, &text)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let value: Value = self.get_json(path, query).await?;
        decode_list(path, value)
    }

    fn org_path(org: &str) -> String {
        format!("/api/organizations/{}", urlencoding::encode(org))
    }
}

async fn read_body(path: &str, response: Response) -> Result<String> {
    let status = response.status();
    let text = response.text().await?;
    trace!("Response {} for {}: {}", status, path, text);

    if !status.is_success() {
        return Err(CoreError::Api {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }
    Ok(text)
}

/// Pull the most useful message out of an error body
fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("displayMessage")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    message.chars().take(MAX_ERROR_BODY).collect()
}

fn decode<T: DeserializeOwned>(path: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| CoreError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Accept either a bare array or a `{"results": [...]}` envelope
fn decode_list<T: DeserializeOwned>(path: &str, value: Value) -> Result<Vec<T>> {
    let items = match value {
        Value::Object(mut obj) => obj.remove("results").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    serde_json::from_value(items).map_err(|e| CoreError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl Resolver for ServerClient {
    async fn environment(&self, org: &str, name: &str) -> Result<Environment> {
        debug!("Resolving environment '{}' in organization '{}'", name, org);
        let path = format!("{}/environments", Self::org_path(org));
        let envs: Vec<Environment> = self.get_list(&path, &[("name", name)]).await?;
        envs.into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| CoreError::NotFound {
                kind: "environment",
                name: name.to_string(),
                organization: org.to_string(),
            })
    }

    async fn changeset(&self, org: &str, env: &Environment, name: &str) -> Result<Changeset> {
        debug!("Resolving changeset '{}' in environment '{}'", name, env.name);
        let path = format!("{}/environments/{}/changesets", Self::org_path(org), env.id);
        let found: Vec<Changeset> = self.get_list(&path, &[("name", name)]).await?;
        let summary = found
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CoreError::NotFound {
                kind: "changeset",
                name: name.to_string(),
                organization: org.to_string(),
            })?;

        self.get_json(&format!("/api/changesets/{}", summary.id), &[])
            .await
    }

    async fn content_view(
        &self,
        org: &str,
        env: &Environment,
        reference: &ContentViewRef,
    ) -> Result<ContentView> {
        debug!(
            "Resolving content view {} against environment '{}'",
            reference, env.name
        );
        let path = format!("{}/content_views", Self::org_path(org));
        let env_id = env.id.to_string();
        let filter = reference.query_value();
        let views: Vec<ContentView> = self
            .get_list(
                &path,
                &[
                    ("environment_id", env_id.as_str()),
                    (reference.query_key(), filter.as_ref()),
                ],
            )
            .await?;

        views
            .into_iter()
            .find(|v| reference.matches(v))
            .ok_or_else(|| CoreError::NotFound {
                kind: "content view",
                name: reference.value().to_string(),
                organization: org.to_string(),
            })
    }
}

#[async_trait]
impl ChangesetApi for ServerClient {
    async fn changesets(&self, org: &str, env_id: u64) -> Result<Vec<Changeset>> {
        let path = format!("{}/environments/{}/changesets", Self::org_path(org), env_id);
        self.get_list(&path, &[]).await
    }

    async fn create(
        &self,
        org: &str,
        env_id: u64,
        name: &str,
        action_type: ActionType,
        description: Option<&str>,
    ) -> Result<Option<Changeset>> {
        let path = format!("{}/environments/{}/changesets", Self::org_path(org), env_id);
        let body = json!({
            "changeset": {
                "name": name,
                "description": description,
            },
            "type": action_type.as_str(),
        });
        let text = self.send(Method::POST, &path, &[], Some(&body)).await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        decode(&path, &text)
    }

    async fn update(
        &self,
        id: u64,
        new_name: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        let mut changes = serde_json::Map::new();
        if let Some(name) = new_name {
            changes.insert("name".to_string(), json!(name));
        }
        if let Some(description) = description {
            changes.insert("description".to_string(), json!(description));
        }
        let body = json!({ "changeset": changes });
        let path = format!("/api/changesets/{}", id);
        self.send(Method::PUT, &path, &[], Some(&body)).await?;
        Ok(())
    }

    async fn add_content(&self, id: u64, kind: &str, item: &PatchItem) -> Result<()> {
        let path = format!("/api/changesets/{}/{}", id, kind);
        let body = serde_json::to_value(item).map_err(|e| CoreError::Decode {
            path: path.clone(),
            message: e.to_string(),
        })?;
        self.send(Method::POST, &path, &[], Some(&body)).await?;
        Ok(())
    }

    async fn remove_content(&self, id: u64, kind: &str, item: &PatchItem) -> Result<()> {
        let path = format!("/api/changesets/{}/{}/{}", id, kind, item.id());
        self.send(Method::DELETE, &path, &[], None).await?;
        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<String> {
        let path = format!("/api/changesets/{}", id);
        let text = self.send(Method::DELETE, &path, &[], None).await?;
        // The server answers with either a JSON string or plain text
        Ok(match serde_json::from_str::<Value>(&text) {
            Ok(Value::String(message)) => message,
            _ => text.trim().to_string(),
        })
    }

    async fn apply(&self, id: u64) -> Result<AsyncTask> {
        let path = format!("/api/changesets/{}/apply", id);
        let text = self.send(Method::POST, &path, &[], None).await?;
        decode(&path, &text)
    }

    async fn dependencies(&self, id: u64) -> Result<Vec<Dependency>> {
        self.get_list(&format!("/api/changesets/{}/dependencies", id), &[])
            .await
    }

    async fn task(&self, uuid: &str) -> Result<AsyncTask> {
        self.get_json(&format!("/api/tasks/{}", urlencoding::encode(uuid)), &[])
            .await
    }
}
