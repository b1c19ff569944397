//! Webhook reconciliation for a single autoscaler
//!
//! Each pass reads the autoscaler fresh, follows its scale target to the
//! runner deployment, resolves the repository and makes sure a matching hook
//! exists there. Hooks are only ever added; a mismatched hook is left alone
//! and a new one is created next to it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use kube::api::DynamicObject;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::config::WebhookConfig;
use crate::crd::{HorizontalRunnerAutoscaler, RunnerDeployment};
use crate::decode::decode_object;
use crate::github::RepositoryHost;
use crate::repository::RepositoryRef;
use crate::store::{ClusterStore, ResourceKind};
use crate::webhook::{self, DesiredWebhook};
use crate::Error;

/// Namespaced identity of an autoscaler
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Namespace of the autoscaler
    pub namespace: String,
    /// Name of the autoscaler
    pub name: String,
}

impl ObjectKey {
    /// Build a key from namespace and name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a watched object; cluster-scoped objects get an empty namespace
    pub fn from_object(obj: &DynamicObject) -> Self {
        Self::new(obj.namespace().unwrap_or_default(), obj.name_any())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of a webhook sync against one repository
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A matching hook was already configured
    AlreadyPresent,
    /// A new hook was created
    Created {
        /// Host-assigned id of the new hook
        id: u64,
    },
}

/// Result of one successful reconcile pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The autoscaler no longer exists
    NotFound,
    /// The autoscaler has no scale-up triggers, so needs no webhook
    NoTriggers,
    /// The referenced runner deployment does not exist
    TargetNotFound,
    /// The repository webhook is in place
    Synced(SyncOutcome),
}

impl ReconcileOutcome {
    /// Scheduler action for this outcome
    ///
    /// Only a completed sync is revisited on a timer; every other outcome
    /// waits for the autoscaler to change.
    pub fn action(&self, sync_period: Duration) -> Action {
        match self {
            ReconcileOutcome::Synced(_) => Action::requeue(sync_period),
            ReconcileOutcome::NotFound
            | ReconcileOutcome::NoTriggers
            | ReconcileOutcome::TargetNotFound => Action::await_change(),
        }
    }
}

/// Make sure `repo` has a hook matching `desired`, creating one if none does
pub async fn sync_webhook(
    host: &dyn RepositoryHost,
    repo: &RepositoryRef,
    desired: &DesiredWebhook,
) -> Result<SyncOutcome, Error> {
    let existing = host.list_hooks(&repo.owner, &repo.name).await?;

    if webhook::matches(&existing, desired) {
        debug!(repository = %repo, hooks = existing.len(), "webhook already configured");
        return Ok(SyncOutcome::AlreadyPresent);
    }

    let created = host.create_hook(&repo.owner, &repo.name, desired).await?;
    info!(
        repository = %repo,
        hook_id = created.id,
        url = %desired.url,
        events = ?desired.events,
        "created repository webhook"
    );
    Ok(SyncOutcome::Created { id: created.id })
}

/// Reconciles autoscalers against their repository's webhooks
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ClusterStore>,
    host: Arc<dyn RepositoryHost>,
    webhook: Arc<WebhookConfig>,
}

impl Reconciler {
    /// Create a reconciler over the given collaborators
    pub fn new(
        store: Arc<dyn ClusterStore>,
        host: Arc<dyn RepositoryHost>,
        webhook: Arc<WebhookConfig>,
    ) -> Self {
        Self {
            store,
            host,
            webhook,
        }
    }

    /// Webhook settings this reconciler converges to
    pub fn webhook(&self) -> &WebhookConfig {
        &self.webhook
    }

    /// Run one reconcile pass for the autoscaler at `key`
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, Error> {
        if key.namespace.is_empty() {
            return Err(Error::validation_for(key.to_string(), "autoscaler has no namespace"));
        }

        let Some(obj) = self
            .store
            .get(ResourceKind::Autoscaler, &key.namespace, &key.name)
            .await?
        else {
            debug!(autoscaler = %key, "autoscaler not found, nothing to do");
            return Ok(ReconcileOutcome::NotFound);
        };
        let hra: HorizontalRunnerAutoscaler = decode_object(&obj)?;

        if !hra.has_triggers() {
            debug!(autoscaler = %key, "no scale-up triggers, skipping webhook");
            return Ok(ReconcileOutcome::NoTriggers);
        }

        let target = &hra.spec.scale_target_ref.name;
        if target.is_empty() {
            return Err(Error::validation_for(key.to_string(), "scaleTargetRef.name is empty"));
        }

        let Some(obj) = self
            .store
            .get(ResourceKind::RunnerDeployment, &key.namespace, target)
            .await?
        else {
            debug!(autoscaler = %key, target = %target, "scale target not found");
            return Ok(ReconcileOutcome::TargetNotFound);
        };
        let deployment: RunnerDeployment = decode_object(&obj)?;

        let repository = deployment.repository_spec();
        if repository.is_empty() {
            return Err(Error::validation_for(
                format!("{}/{target}", key.namespace),
                "runner deployment has no repository",
            ));
        }

        let repo = RepositoryRef::parse(repository);
        if repo.is_ownerless() {
            warn!(repository = %repo.name, "repository has no owner segment, syncing with an empty owner");
        }
        let desired = DesiredWebhook::from_config(&self.webhook);
        let outcome = sync_webhook(self.host.as_ref(), &repo, &desired).await?;
        Ok(ReconcileOutcome::Synced(outcome))
    }
}
