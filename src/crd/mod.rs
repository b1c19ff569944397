//! Typed views of the actions-runner-controller custom resources
//!
//! The operator does not own these CRDs. It reads them as `DynamicObject`s
//! and decodes them into the structs below, so only the fields the
//! reconciler needs are modelled.

mod autoscaler;
mod runner_deployment;

use kube::discovery::ApiResource;
use serde::{Deserialize, Deserializer};

pub use autoscaler::{
    HorizontalRunnerAutoscaler, HorizontalRunnerAutoscalerSpec, ScaleTargetRef, Trigger,
};
pub use runner_deployment::{RunnerDeployment, RunnerDeploymentSpec, RunnerSpec, RunnerTemplate};

/// API version shared by the actions-runner-controller resources
pub const RUNNER_API_VERSION: &str = "actions.summerwind.dev/v1alpha1";

/// Trait for types that have a known API group, version, and kind.
///
/// Implement this for foreign CRD types to derive their `ApiResource` from
/// constants, so the watcher, the cluster store and the decoder all agree on
/// the same group/version/kind.
pub trait HasApiResource {
    /// Full API version (e.g., "actions.summerwind.dev/v1alpha1")
    const API_VERSION: &'static str;
    /// Resource kind (e.g., "RunnerDeployment")
    const KIND: &'static str;
    /// Lowercase plural used in API paths
    const PLURAL: &'static str;

    /// Build an ApiResource from the type's constants.
    fn api_resource() -> ApiResource {
        build_api_resource(Self::API_VERSION, Self::KIND, Self::PLURAL)
    }
}

/// Build an ApiResource from an explicit apiVersion, kind and plural
pub fn build_api_resource(api_version: &str, kind: &str, plural: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: plural.to_string(),
    }
}

/// Deserialize an explicit `null` as the field's default
///
/// Pair with `#[serde(default)]` so absent and `null` fields decode the same.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Split an apiVersion into (group, version); core resources have an empty group
fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}
