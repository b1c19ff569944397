//! Desired and existing repository webhooks, and the comparison between them
//!
//! A hook matches when its URL is equal and its event list is equal as an
//! ordered sequence. `["push", "pull_request"]` does not match
//! `["pull_request", "push"]`: hooks created by earlier releases were compared
//! this way and changing it would alter which repositories get a new hook.

use serde::Serialize;

use crate::config::WebhookConfig;

/// Content type requested for webhook deliveries
pub const CONTENT_TYPE_JSON: &str = "json";

/// The webhook every reconciled repository should have
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredWebhook {
    /// Delivery URL
    pub url: String,
    /// Subscribed events, in configured order
    pub events: Vec<String>,
}

impl DesiredWebhook {
    /// Create a desired webhook for the given URL and events
    pub fn new(url: impl Into<String>, events: Vec<String>) -> Self {
        Self {
            url: url.into(),
            events,
        }
    }

    /// Build the desired webhook from process configuration
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self::new(config.url.clone(), config.events.clone())
    }

    /// Request body for creating this hook on the repository host
    pub fn create_payload(&self) -> CreateHookPayload<'_> {
        CreateHookPayload {
            active: true,
            events: &self.events,
            config: HookConfigPayload {
                url: &self.url,
                content_type: CONTENT_TYPE_JSON,
            },
        }
    }
}

/// JSON body of a create-hook request
#[derive(Debug, Serialize)]
pub struct CreateHookPayload<'a> {
    /// Always true: the operator only creates active hooks
    pub active: bool,
    /// Subscribed events
    pub events: &'a [String],
    /// Delivery configuration
    pub config: HookConfigPayload<'a>,
}

/// Delivery configuration of a create-hook request
#[derive(Debug, Serialize)]
pub struct HookConfigPayload<'a> {
    /// Delivery URL
    pub url: &'a str,
    /// Payload encoding
    pub content_type: &'a str,
}

/// A webhook that already exists on the repository
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExistingWebhook {
    /// Host-assigned hook id (not used for comparison)
    pub id: u64,
    /// Whether the hook is active
    pub active: bool,
    /// Configured delivery URL, if the hook has one
    pub url: Option<String>,
    /// Subscribed events, in host order
    pub events: Vec<String>,
}

impl ExistingWebhook {
    /// Returns true if this hook has the desired URL and event sequence
    pub fn satisfies(&self, desired: &DesiredWebhook) -> bool {
        self.url.as_deref() == Some(desired.url.as_str())
            && events_equal(&self.events, &desired.events)
    }
}

/// Returns true if any existing hook already satisfies the desired webhook
pub fn matches(existing: &[ExistingWebhook], desired: &DesiredWebhook) -> bool {
    existing.iter().any(|hook| hook.satisfies(desired))
}

/// Ordered, element-wise equality of two event lists
pub fn events_equal(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const URL: &str = "https://hooks.example";

    fn events(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn hook(url: &str, list: &[&str]) -> ExistingWebhook {
        ExistingWebhook {
            id: 1,
            active: true,
            url: Some(url.to_string()),
            events: events(list),
        }
    }

    #[test]
    fn no_existing_hooks_never_match() {
        let desired = DesiredWebhook::new(URL, events(&["workflow_job"]));
        assert!(!matches(&[], &desired));
    }

    #[test]
    fn identical_hook_matches() {
        let desired = DesiredWebhook::new(URL, events(&["workflow_job"]));
        assert!(matches(&[hook(URL, &["workflow_job"])], &desired));
    }

    #[rstest]
    #[case::different_events(URL, &["push"])]
    #[case::different_url("https://other.example", &["workflow_job"])]
    #[case::extra_event(URL, &["workflow_job", "push"])]
    #[case::no_events(URL, &[])]
    fn mismatched_hook_does_not_match(#[case] url: &str, #[case] list: &[&str]) {
        let desired = DesiredWebhook::new(URL, events(&["workflow_job"]));
        assert!(!matches(&[hook(url, list)], &desired));
    }

    /// Known sharp edge: event lists are compared in order, not as sets.
    /// A hook with the same events in a different order is not a match.
    #[test]
    fn permuted_events_do_not_match() {
        let desired = DesiredWebhook::new(URL, events(&["push", "pull_request"]));
        assert!(!matches(&[hook(URL, &["pull_request", "push"])], &desired));
        assert!(matches(&[hook(URL, &["push", "pull_request"])], &desired));
    }

    #[test]
    fn any_matching_hook_in_the_list_is_enough() {
        let desired = DesiredWebhook::new(URL, events(&["workflow_job"]));
        let existing = vec![
            hook("https://ci.example", &["push"]),
            hook(URL, &["push"]),
            hook(URL, &["workflow_job"]),
        ];
        assert!(matches(&existing, &desired));
    }

    #[test]
    fn hook_without_url_does_not_match() {
        let desired = DesiredWebhook::new(URL, events(&["workflow_job"]));
        let existing = ExistingWebhook {
            url: None,
            ..hook(URL, &["workflow_job"])
        };
        assert!(!matches(&[existing], &desired));
    }

    #[test]
    fn create_payload_shape() {
        let desired = DesiredWebhook::new(URL, events(&["workflow_job"]));
        let payload = serde_json::to_value(desired.create_payload()).expect("serializes");
        assert_eq!(
            payload,
            serde_json::json!({
                "active": true,
                "events": ["workflow_job"],
                "config": {"url": URL, "content_type": "json"}
            })
        );
    }

    #[test]
    fn desired_webhook_from_config_keeps_event_order() {
        let config = WebhookConfig {
            url: URL.to_string(),
            events: events(&["push", "workflow_job"]),
        };
        let desired = DesiredWebhook::from_config(&config);
        assert_eq!(desired.url, URL);
        assert_eq!(desired.events, events(&["push", "workflow_job"]));
    }
}
