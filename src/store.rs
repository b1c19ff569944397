//! Read access to runner resources in the cluster
//!
//! The runner CRDs are owned by actions-runner-controller, so they are read
//! as `DynamicObject`s and decoded by the caller. A missing object is
//! `Ok(None)`, never an error.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::trace;

#[cfg(test)]
use mockall::automock;

use crate::crd::{HasApiResource, HorizontalRunnerAutoscaler, RunnerDeployment};
use crate::Error;

/// Resource kinds the reconciler reads
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `HorizontalRunnerAutoscaler`
    Autoscaler,
    /// `RunnerDeployment`
    RunnerDeployment,
}

impl ResourceKind {
    /// API resource used to address this kind
    pub fn api_resource(self) -> ApiResource {
        match self {
            ResourceKind::Autoscaler => HorizontalRunnerAutoscaler::api_resource(),
            ResourceKind::RunnerDeployment => RunnerDeployment::api_resource(),
        }
    }

    /// Kind name as it appears on the object
    pub fn kind(self) -> &'static str {
        match self {
            ResourceKind::Autoscaler => HorizontalRunnerAutoscaler::KIND,
            ResourceKind::RunnerDeployment => RunnerDeployment::KIND,
        }
    }
}

/// Namespaced object lookups
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch `namespace/name` of the given kind, `None` if it does not exist
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, Error>;
}

/// [`ClusterStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl KubeClusterStore {
    /// Create a store reading through `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, Error> {
        let ar = kind.api_resource();
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        let obj = api.get_opt(name).await?;
        trace!(kind = kind.kind(), namespace, name, found = obj.is_some(), "cluster lookup");
        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_runner_resources() {
        let ar = ResourceKind::Autoscaler.api_resource();
        assert_eq!(ar.kind, "HorizontalRunnerAutoscaler");
        assert_eq!(ar.plural, "horizontalrunnerautoscalers");
        assert_eq!(ar.group, "actions.summerwind.dev");

        let ar = ResourceKind::RunnerDeployment.api_resource();
        assert_eq!(ar.kind, "RunnerDeployment");
        assert_eq!(ar.version, "v1alpha1");
        assert_eq!(ResourceKind::RunnerDeployment.kind(), "RunnerDeployment");
    }
}
