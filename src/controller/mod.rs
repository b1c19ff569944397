//! HorizontalRunnerAutoscaler controller
//!
//! Glue between `kube::runtime::Controller` and [`Reconciler`]: turns outcomes
//! into requeue actions, records events on the autoscaler and applies
//! per-object failure backoff. [`reconcile_triggers`] decides which watch
//! events reach the reconciler at all.

mod reconciler;
mod triggers;

use std::sync::Arc;
use std::time::Duration;

use kube::api::DynamicObject;
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource};
use tracing::{debug, instrument, warn};

use crate::backoff::FailureBackoff;
use crate::config::Config;
use crate::crd::{HasApiResource, HorizontalRunnerAutoscaler};
use crate::events::{actions, reasons, EventPublisher, KubeEventPublisher};
use crate::github::{GitHubClient, RepositoryHost};
use crate::store::{ClusterStore, KubeClusterStore};
use crate::Error;

pub use reconciler::{sync_webhook, ObjectKey, ReconcileOutcome, Reconciler, SyncOutcome};
pub use triggers::{reconcile_triggers, GenerationFilter};

/// Name reported as the source of events
pub const CONTROLLER_NAME: &str = "runner-webhook-controller";

/// Default interval between successful reconciles of the same autoscaler
pub const DEFAULT_SYNC_PERIOD: Duration = Duration::from_secs(4 * 60 * 60);

/// Shared state for every reconcile call
///
/// Built once at startup with [`Context::builder`]:
///
/// ```ignore
/// let ctx = Context::builder(client, &config).build()?;
/// ```
pub struct Context {
    /// Core reconciler
    pub reconciler: Reconciler,
    /// Event sink for the autoscaler
    pub events: Arc<dyn EventPublisher>,
    /// Requeue interval after a successful sync
    pub sync_period: Duration,
    /// Consecutive-failure backoff per autoscaler
    pub backoff: FailureBackoff<ObjectKey>,
}

impl Context {
    /// Create a builder for a production context
    pub fn builder(client: Client, config: &Config) -> ContextBuilder {
        ContextBuilder::new(client, config)
    }

    /// Context over mock collaborators with default timing
    #[cfg(test)]
    pub fn for_testing(
        store: Arc<dyn ClusterStore>,
        host: Arc<dyn RepositoryHost>,
        events: Arc<dyn EventPublisher>,
        webhook: crate::config::WebhookConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store, host, Arc::new(webhook)),
            events,
            sync_period: DEFAULT_SYNC_PERIOD,
            backoff: FailureBackoff::default(),
        }
    }
}

/// Builder for [`Context`]
///
/// Collaborators default to the Kubernetes API, the GitHub REST API and the
/// kube event recorder. Each can be overridden.
pub struct ContextBuilder {
    client: Client,
    config: Config,
    store: Option<Arc<dyn ClusterStore>>,
    host: Option<Arc<dyn RepositoryHost>>,
    events: Option<Arc<dyn EventPublisher>>,
}

impl ContextBuilder {
    fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            config: config.clone(),
            store: None,
            host: None,
            events: None,
        }
    }

    /// Override the cluster store
    pub fn cluster_store(mut self, store: Arc<dyn ClusterStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the repository host
    pub fn repository_host(mut self, host: Arc<dyn RepositoryHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Override the event publisher
    pub fn event_publisher(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the context, constructing the GitHub client unless overridden
    pub fn build(self) -> Result<Context, Error> {
        let webhook = self.config.webhook()?;

        let host: Arc<dyn RepositoryHost> = match self.host {
            Some(host) => host,
            None => {
                let token = self
                    .config
                    .github_token
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| Error::config("GITHUB_TOKEN envvar is not set"))?;
                Arc::new(GitHubClient::new(&self.config.github_api_url, token)?)
            }
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(KubeClusterStore::new(self.client.clone())));
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(KubeEventPublisher::new(self.client.clone(), CONTROLLER_NAME)));

        Ok(Context {
            reconciler: Reconciler::new(store, host, Arc::new(webhook)),
            events,
            sync_period: self.config.sync_period.into(),
            backoff: FailureBackoff::default(),
        })
    }
}

/// Reconcile a HorizontalRunnerAutoscaler
///
/// The watched object only supplies the key; the reconciler reads the
/// autoscaler again so every pass works from current state.
#[instrument(
    skip(obj, ctx),
    fields(autoscaler = %ObjectKey::from_object(&obj))
)]
pub async fn reconcile(obj: Arc<DynamicObject>, ctx: Arc<Context>) -> Result<Action, Error> {
    let key = ObjectKey::from_object(&obj);
    let object_ref = obj.object_ref(&HorizontalRunnerAutoscaler::api_resource());
    debug!("reconciling autoscaler");

    match ctx.reconciler.reconcile(&key).await {
        Ok(outcome) => {
            ctx.backoff.reset(&key);
            if let ReconcileOutcome::Synced(SyncOutcome::Created { id }) = &outcome {
                let note = format!(
                    "Created repository webhook {id} for {}",
                    ctx.reconciler.webhook().url
                );
                ctx.events
                    .publish(
                        &object_ref,
                        EventType::Normal,
                        reasons::WEBHOOK_CREATED,
                        actions::CREATE_WEBHOOK,
                        Some(note),
                    )
                    .await;
            }
            debug!(?outcome, "reconcile complete");
            Ok(outcome.action(ctx.sync_period))
        }
        Err(e) => {
            ctx.events
                .publish(
                    &object_ref,
                    EventType::Warning,
                    e.event_reason(),
                    actions::RECONCILE,
                    Some(e.to_string()),
                )
                .await;
            Err(e)
        }
    }
}

/// Decide when to retry a failed reconcile
///
/// Retryable errors back off exponentially per autoscaler; anything else
/// waits for the autoscaler to change.
pub fn error_policy(obj: Arc<DynamicObject>, error: &Error, ctx: Arc<Context>) -> Action {
    let key = ObjectKey::from_object(&obj);

    if !error.is_retryable() {
        warn!(autoscaler = %key, error = %error, "reconcile failed, waiting for a change");
        return Action::await_change();
    }

    let delay = ctx.backoff.next_delay(key.clone());
    warn!(
        autoscaler = %key,
        error = %error,
        retry_after_secs = delay.as_secs(),
        "reconcile failed, retrying"
    );
    Action::requeue(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::ObjectReference;
    use serde_json::json;

    use crate::config::WebhookConfig;
    use crate::crd::RunnerDeployment;
    use crate::github::MockRepositoryHost;
    use crate::store::{MockClusterStore, ResourceKind};
    use crate::webhook::ExistingWebhook;

    /// Records published events for later verification
    #[derive(Clone, Default)]
    struct EventCapture {
        events: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl EventCapture {
        fn reasons(&self) -> Vec<String> {
            self.events.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
        }

        fn types(&self) -> Vec<String> {
            self.events.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl EventPublisher for EventCapture {
        async fn publish(
            &self,
            _resource_ref: &ObjectReference,
            type_: EventType,
            reason: &str,
            _action: &str,
            _note: Option<String>,
        ) {
            self.events
                .lock()
                .unwrap()
                .push((reason.to_string(), format!("{type_:?}")));
        }
    }

    fn webhook_config() -> WebhookConfig {
        WebhookConfig {
            url: "https://hooks.example".to_string(),
            events: vec!["workflow_job".to_string()],
        }
    }

    fn autoscaler_object() -> DynamicObject {
        DynamicObject::new("runners", &HorizontalRunnerAutoscaler::api_resource())
            .within("ci")
            .data(json!({
                "spec": {
                    "scaleTargetRef": {"kind": "RunnerDeployment", "name": "runners"},
                    "scaleUpTriggers": [{"githubEvent": {"workflowJob": {}}, "duration": "5m"}]
                }
            }))
    }

    fn deployment_object() -> DynamicObject {
        DynamicObject::new("runners", &RunnerDeployment::api_resource())
            .within("ci")
            .data(json!({"spec": {"template": {"spec": {"repository": "acme/widgets"}}}}))
    }

    fn populated_store() -> MockClusterStore {
        let mut store = MockClusterStore::new();
        store.expect_get().returning(|kind, _, _| {
            Ok(Some(match kind {
                ResourceKind::Autoscaler => autoscaler_object(),
                ResourceKind::RunnerDeployment => deployment_object(),
            }))
        });
        store
    }

    fn context(store: MockClusterStore, host: MockRepositoryHost) -> (Arc<Context>, EventCapture) {
        let capture = EventCapture::default();
        let ctx = Context::for_testing(
            Arc::new(store),
            Arc::new(host),
            Arc::new(capture.clone()),
            webhook_config(),
        );
        (Arc::new(ctx), capture)
    }

    /// Story: creating a hook requeues after the sync period and leaves a Normal event
    #[tokio::test]
    async fn story_created_hook_emits_event_and_requeues() {
        let mut host = MockRepositoryHost::new();
        host.expect_list_hooks().returning(|_, _| Ok(vec![]));
        host.expect_create_hook().times(1).returning(|_, _, d| {
            Ok(ExistingWebhook {
                id: 5,
                active: true,
                url: Some(d.url.clone()),
                events: d.events.clone(),
            })
        });
        let (ctx, capture) = context(populated_store(), host);

        let action = reconcile(Arc::new(autoscaler_object()), ctx).await.unwrap();

        assert_eq!(action, Action::requeue(DEFAULT_SYNC_PERIOD));
        assert_eq!(capture.reasons(), vec![reasons::WEBHOOK_CREATED]);
        assert_eq!(capture.types(), vec!["Normal"]);
    }

    /// Story: an already-synced repository is quiet
    #[tokio::test]
    async fn story_present_hook_emits_no_event() {
        let mut host = MockRepositoryHost::new();
        host.expect_list_hooks().returning(|_, _| {
            Ok(vec![ExistingWebhook {
                id: 1,
                active: true,
                url: Some("https://hooks.example".to_string()),
                events: vec!["workflow_job".to_string()],
            }])
        });
        host.expect_create_hook().never();
        let (ctx, capture) = context(populated_store(), host);

        let action = reconcile(Arc::new(autoscaler_object()), ctx).await.unwrap();

        assert_eq!(action, Action::requeue(DEFAULT_SYNC_PERIOD));
        assert!(capture.reasons().is_empty());
    }

    /// Story: a failed cluster read is reported on the autoscaler as GetFailed
    #[tokio::test]
    async fn story_get_failure_emits_warning_event() {
        let mut store = MockClusterStore::new();
        store.expect_get().returning(|_, _, _| {
            Err(Error::Kube {
                source: kube::Error::Api(kube::error::ErrorResponse {
                    status: "Failure".to_string(),
                    message: "forbidden".to_string(),
                    reason: "Forbidden".to_string(),
                    code: 403,
                }),
            })
        });
        let (ctx, capture) = context(store, MockRepositoryHost::new());

        let err = reconcile(Arc::new(autoscaler_object()), ctx).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(capture.reasons(), vec![reasons::GET_FAILED]);
        assert_eq!(capture.types(), vec!["Warning"]);
    }

    mod error_policy_backoff {
        use super::*;

        #[test]
        fn retryable_errors_back_off_exponentially() {
            let (ctx, _) = context(MockClusterStore::new(), MockRepositoryHost::new());
            let obj = Arc::new(autoscaler_object());
            let err = Error::github("list_hooks", "timeout");

            let delays: Vec<_> = (0..3)
                .map(|_| error_policy(obj.clone(), &err, ctx.clone()))
                .collect();

            assert_eq!(
                delays,
                vec![
                    Action::requeue(Duration::from_secs(1)),
                    Action::requeue(Duration::from_secs(2)),
                    Action::requeue(Duration::from_secs(4)),
                ]
            );
        }

        #[test]
        fn non_retryable_errors_wait_for_change() {
            let (ctx, _) = context(MockClusterStore::new(), MockRepositoryHost::new());
            let err = Error::validation_for("ci/runners", "runner deployment has no repository");

            let action = error_policy(Arc::new(autoscaler_object()), &err, ctx.clone());

            assert_eq!(action, Action::await_change());
            assert_eq!(ctx.backoff.failures(&ObjectKey::new("ci", "runners")), 0);
        }

        #[tokio::test]
        async fn success_resets_backoff() {
            let mut host = MockRepositoryHost::new();
            host.expect_list_hooks().returning(|_, _| {
                Ok(vec![ExistingWebhook {
                    id: 1,
                    active: true,
                    url: Some("https://hooks.example".to_string()),
                    events: vec!["workflow_job".to_string()],
                }])
            });
            let (ctx, _) = context(populated_store(), host);
            let obj = Arc::new(autoscaler_object());
            let key = ObjectKey::new("ci", "runners");

            error_policy(obj.clone(), &Error::internal("boom"), ctx.clone());
            error_policy(obj.clone(), &Error::internal("boom"), ctx.clone());
            assert_eq!(ctx.backoff.failures(&key), 2);

            reconcile(obj.clone(), ctx.clone()).await.unwrap();
            assert_eq!(ctx.backoff.failures(&key), 0);
            assert_eq!(
                error_policy(obj, &Error::internal("boom"), ctx),
                Action::requeue(Duration::from_secs(1))
            );
        }
    }
}
