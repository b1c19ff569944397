//! Kubernetes Event recording
//!
//! Wraps `kube::runtime::events::Recorder` behind a trait so the controller
//! can emit events on autoscalers (visible via `kubectl describe hra`) and
//! tests can swap in a no-op.
//!
//! Publishing is fire-and-forget: failures are logged and never returned.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Publishes Kubernetes Events about an object
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event on `resource_ref`
    ///
    /// * `type_` - Normal or Warning
    /// * `reason` - machine-readable reason, see [`reasons`]
    /// * `action` - what was attempted, see [`actions`]
    /// * `note` - optional human-readable message
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// [`EventPublisher`] backed by the kube event recorder
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a publisher reporting as `controller_name`
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(reason, action, error = %e, "Failed to publish Kubernetes event");
        }
    }
}

/// Discards every event
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Event reasons (REASON column of `kubectl get events`)
pub mod reasons {
    /// Reading the autoscaler or its runner deployment failed
    pub const GET_FAILED: &str = "GetFailed";
    /// A runner resource did not have the expected shape
    pub const DECODE_FAILED: &str = "DecodeFailed";
    /// Listing or creating the repository webhook failed
    pub const WEBHOOK_SYNC_FAILED: &str = "WebhookSyncFailed";
    /// Resource content can never reconcile as written
    pub const VALIDATION_FAILED: &str = "ValidationFailed";
    /// Any other reconcile failure
    pub const RECONCILE_FAILED: &str = "ReconcileFailed";
    /// A webhook was created on the repository
    pub const WEBHOOK_CREATED: &str = "WebhookCreated";
}

/// Event actions (ACTION column of `kubectl get events`)
pub mod actions {
    /// Standard reconciliation loop
    pub const RECONCILE: &str = "Reconcile";
    /// Creating a repository webhook
    pub const CREATE_WEBHOOK: &str = "CreateWebhook";
}
