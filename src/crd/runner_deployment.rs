//! RunnerDeployment resource

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::{null_as_default, HasApiResource, RUNNER_API_VERSION};
use crate::repository;

/// Deployment of self-hosted runners registered against a repository
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RunnerDeployment {
    /// Standard object metadata
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ObjectMeta,
    /// Deployment spec
    #[serde(default, deserialize_with = "null_as_default")]
    pub spec: RunnerDeploymentSpec,
}

impl HasApiResource for RunnerDeployment {
    const API_VERSION: &'static str = RUNNER_API_VERSION;
    const KIND: &'static str = "RunnerDeployment";
    const PLURAL: &'static str = "runnerdeployments";
}

impl RunnerDeployment {
    /// The declared repository string, `owner/name` or bare `name`
    pub fn repository_spec(&self) -> &str {
        &self.spec.template.spec.repository
    }

    /// Repository owner; empty when the repository has no owner segment
    pub fn owner(&self) -> &str {
        repository::owner(self.repository_spec())
    }

    /// Repository name (last path segment)
    pub fn repository(&self) -> &str {
        repository::name(self.repository_spec())
    }
}

/// Spec for RunnerDeployment
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RunnerDeploymentSpec {
    /// Pod template for the runners
    #[serde(default, deserialize_with = "null_as_default")]
    pub template: RunnerTemplate,
}

/// Runner template
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RunnerTemplate {
    /// Runner spec
    #[serde(default, deserialize_with = "null_as_default")]
    pub spec: RunnerSpec,
}

/// Runner spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RunnerSpec {
    /// Repository in `owner/name` form
    #[serde(default, deserialize_with = "null_as_default")]
    pub repository: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment(repository: &str) -> RunnerDeployment {
        serde_json::from_value(json!({
            "metadata": {"name": "runners", "namespace": "ci"},
            "spec": {"template": {"spec": {"repository": repository}}}
        }))
        .expect("valid runner deployment")
    }

    #[test]
    fn owner_and_repository_from_full_name() {
        let rd = deployment("acme/widgets");
        assert_eq!(rd.owner(), "acme");
        assert_eq!(rd.repository(), "widgets");
    }

    #[test]
    fn bare_repository_has_no_owner() {
        let rd = deployment("widgets");
        assert_eq!(rd.owner(), "");
        assert_eq!(rd.repository(), "widgets");
    }

    #[test]
    fn missing_template_yields_empty_repository() {
        let rd: RunnerDeployment =
            serde_json::from_value(json!({"metadata": {"name": "x"}, "spec": {}})).expect("valid");
        assert_eq!(rd.repository_spec(), "");
    }

    #[test]
    fn null_fields_yield_empty_repository() {
        for spec in [
            json!(null),
            json!({"template": null}),
            json!({"template": {"spec": null}}),
            json!({"template": {"spec": {"repository": null}}}),
        ] {
            let rd: RunnerDeployment =
                serde_json::from_value(json!({"metadata": {"name": "x"}, "spec": spec}))
                    .expect("null is accepted");
            assert_eq!(rd.repository_spec(), "");
        }
    }
}
