//! HorizontalRunnerAutoscaler resource

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::{null_as_default, HasApiResource, RUNNER_API_VERSION};

/// Autoscaler declaring scale-up triggers for a runner deployment
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct HorizontalRunnerAutoscaler {
    /// Standard object metadata
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ObjectMeta,
    /// Autoscaler spec
    #[serde(default, deserialize_with = "null_as_default")]
    pub spec: HorizontalRunnerAutoscalerSpec,
}

impl HasApiResource for HorizontalRunnerAutoscaler {
    const API_VERSION: &'static str = RUNNER_API_VERSION;
    const KIND: &'static str = "HorizontalRunnerAutoscaler";
    const PLURAL: &'static str = "horizontalrunnerautoscalers";
}

impl HorizontalRunnerAutoscaler {
    /// Returns true if the autoscaler has any scale-up triggers
    ///
    /// Only autoscalers with triggers need a repository webhook.
    pub fn has_triggers(&self) -> bool {
        self.spec.has_triggers()
    }
}

/// Spec for HorizontalRunnerAutoscaler
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HorizontalRunnerAutoscalerSpec {
    /// The runner deployment this autoscaler scales
    #[serde(default, deserialize_with = "null_as_default")]
    pub scale_target_ref: ScaleTargetRef,
    /// Webhook-driven scale-up triggers
    #[serde(default, deserialize_with = "null_as_default")]
    pub scale_up_triggers: Vec<Trigger>,
}

impl HorizontalRunnerAutoscalerSpec {
    /// Returns true iff the trigger list is non-empty
    pub fn has_triggers(&self) -> bool {
        !self.scale_up_triggers.is_empty()
    }
}

/// Reference to the scaled resource (same namespace as the autoscaler)
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ScaleTargetRef {
    /// Target kind, normally "RunnerDeployment"
    #[serde(default, deserialize_with = "null_as_default")]
    pub kind: String,
    /// Target name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// A scale-up trigger
///
/// Interpreted by the autoscaler itself; here it only matters that one exists.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    /// GitHub event selector (free-form, e.g. `{"workflowJob": {}}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_event: Option<serde_json::Value>,
    /// Number of replicas to add
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// How long the added capacity lives, as a duration string (e.g. "5m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}
