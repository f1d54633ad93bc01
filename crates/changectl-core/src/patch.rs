//! Patch building for changeset content updates
//!
//! An update carries two directions of change, add and remove. Each direction
//! names content views in exactly one way (by name, label or id); the names are
//! resolved to ids against the environment the changeset can address and the
//! result is one [`Patch`] per direction.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::api::Resolver;
use crate::error::{CoreError, Result};
use crate::types::{ActionType, ContentView, Environment};

/// Content kind key used in patches and in content URLs
pub const CONTENT_VIEWS: &str = "content_views";

/// One way of naming a content view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentViewRef {
    ByName(String),
    ByLabel(String),
    ById(String),
}

impl ContentViewRef {
    /// Query parameter the server filters on for this kind of reference
    pub fn query_key(&self) -> &'static str {
        match self {
            ContentViewRef::ByName(_) => "name",
            ContentViewRef::ByLabel(_) => "label",
            ContentViewRef::ById(_) => "id",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ContentViewRef::ByName(v) | ContentViewRef::ByLabel(v) | ContentViewRef::ById(v) => v,
        }
    }

    /// Value sent as the lookup filter; numeric ids are normalised (`07` -> `7`)
    pub fn query_value(&self) -> Cow<'_, str> {
        match self {
            ContentViewRef::ById(id) => match parse_id(id) {
                Some(n) => Cow::Owned(n.to_string()),
                None => Cow::Borrowed(id.as_str()),
            },
            other => Cow::Borrowed(other.value()),
        }
    }

    pub fn matches(&self, view: &ContentView) -> bool {
        match self {
            ContentViewRef::ByName(name) => view.name == *name,
            ContentViewRef::ByLabel(label) => view.label.as_deref() == Some(label.as_str()),
            ContentViewRef::ById(id) => parse_id(id) == Some(view.id),
        }
    }
}

fn parse_id(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

impl fmt::Display for ContentViewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.query_key(), self.value())
    }
}

/// Validated add and remove selections for one update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDirectives {
    pub add: Vec<ContentViewRef>,
    pub remove: Vec<ContentViewRef>,
}

impl ContentDirectives {
    /// Collect one direction's flag values.
    ///
    /// At most one of the three lists may be non-empty. Order is name, label, id.
    pub fn from_flags(
        direction: PatchKind,
        names: &[String],
        labels: &[String],
        ids: &[String],
    ) -> Result<Vec<ContentViewRef>> {
        let kinds_used = [names, labels, ids].iter().filter(|l| !l.is_empty()).count();
        if kinds_used > 1 {
            return Err(CoreError::Validation(format!(
                "only one of --{0}_content_view, --{0}_content_view_label and --{0}_content_view_id may be used",
                direction.as_str()
            )));
        }

        Ok(names
            .iter()
            .cloned()
            .map(ContentViewRef::ByName)
            .chain(labels.iter().cloned().map(ContentViewRef::ByLabel))
            .chain(ids.iter().cloned().map(ContentViewRef::ById))
            .collect())
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    Add,
    Remove,
}

impl PatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchKind::Add => "add",
            PatchKind::Remove => "remove",
        }
    }
}

/// A resolved content reference as the server expects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchItem {
    /// `{"content_view_id": n}`, sent when adding
    ContentViewId(u64),
    /// `{"content_id": n}`, sent when removing
    ContentId(u64),
}

impl PatchItem {
    pub fn id(&self) -> u64 {
        match self {
            PatchItem::ContentViewId(id) | PatchItem::ContentId(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Patch {
    pub content_views: Vec<PatchItem>,
}

impl Patch {
    /// Content kind and items, in submission order
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &PatchItem)> {
        self.content_views.iter().map(|item| (CONTENT_VIEWS, item))
    }

    pub fn len(&self) -> usize {
        self.content_views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content_views.is_empty()
    }
}

/// Resolves content view references for one changeset
pub struct PatchItemBuilder<'a, R: Resolver + ?Sized> {
    resolver: &'a R,
    org: String,
    environment: Environment,
}

impl<'a, R: Resolver + ?Sized> PatchItemBuilder<'a, R> {
    /// Pick the environment whose content views the changeset can address.
    ///
    /// A deletion changeset removes what is already in its own environment; a
    /// promotion changeset pulls from the environment before it.
    pub async fn new(
        resolver: &'a R,
        org: &str,
        env_name: &str,
        action_type: ActionType,
    ) -> Result<Self> {
        let own = resolver.environment(org, env_name).await?;
        let environment = match action_type {
            ActionType::Deletion => own,
            ActionType::Promotion => {
                let prior = own.prior.as_deref().ok_or_else(|| {
                    CoreError::Validation(format!(
                        "environment [ {} ] has no prior environment to promote from",
                        own.name
                    ))
                })?;
                resolver.environment(org, prior).await?
            }
        };
        debug!(
            "Content for {} changeset resolves against environment '{}'",
            action_type, environment.name
        );

        Ok(Self {
            resolver,
            org: org.to_string(),
            environment,
        })
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub async fn content_view(
        &self,
        kind: PatchKind,
        reference: &ContentViewRef,
    ) -> Result<PatchItem> {
        let view = self
            .resolver
            .content_view(&self.org, &self.environment, reference)
            .await?;
        Ok(match kind {
            PatchKind::Add => PatchItem::ContentViewId(view.id),
            PatchKind::Remove => PatchItem::ContentId(view.id),
        })
    }
}

/// Resolve every reference of one direction; the first failure aborts the patch
pub async fn build_patch<R: Resolver + ?Sized>(
    kind: PatchKind,
    builder: &PatchItemBuilder<'_, R>,
    refs: &[ContentViewRef],
) -> Result<Patch> {
    let mut content_views = Vec::with_capacity(refs.len());
    for reference in refs {
        content_views.push(builder.content_view(kind, reference).await?);
    }
    Ok(Patch { content_views })
}
