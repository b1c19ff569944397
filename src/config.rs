//! Process configuration
//!
//! Parsed once from flags (with environment fallbacks) at startup and shared
//! read-only afterwards. Nothing in the reconciler reads the environment.

use std::net::SocketAddr;

use clap::Parser;

use crate::controller::DEFAULT_SYNC_PERIOD;
use crate::Error;

/// Default webhook delivery URL
pub const DEFAULT_WEBHOOK_URL: &str = "https://62bb3ef8c1446b.lhr.domains";

/// Default GitHub REST API base URL
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default lease name used for leader election
pub const DEFAULT_LEADER_ELECTION_ID: &str = "58a9eb7f.bosun.jspaas.uk";

/// Runner webhook operator configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "runner-webhook", version, about, long_about = None)]
pub struct Config {
    /// The webhook url to target for this environment
    #[arg(long, env = "WEBHOOK_URL", default_value = DEFAULT_WEBHOOK_URL)]
    pub webhook_url: String,

    /// The webhook events to enable (comma-separated, order matters)
    #[arg(long, env = "WEBHOOK_EVENTS", default_value = "workflow_job")]
    pub webhook_events: String,

    /// Maximum number of autoscalers reconciled at once
    #[arg(long, env = "MAX_CONCURRENT_RECONCILES", default_value_t = 1)]
    pub max_concurrent_reconciles: u16,

    /// Period after which a synced autoscaler is reconciled again
    #[arg(
        long,
        env = "SYNC_PERIOD",
        default_value_t = humantime::Duration::from(DEFAULT_SYNC_PERIOD)
    )]
    pub sync_period: humantime::Duration,

    /// The address the health probe endpoint binds to
    #[arg(long, env = "HEALTH_PROBE_BIND_ADDRESS", default_value = "0.0.0.0:8081")]
    pub health_probe_bind_address: SocketAddr,

    /// Enable leader election, ensuring only one active controller
    #[arg(long, env = "LEADER_ELECT")]
    pub leader_elect: bool,

    /// Namespace holding the leader election lease (defaults to the pod namespace)
    #[arg(long, env = "LEADER_ELECTION_NAMESPACE")]
    pub leader_election_namespace: Option<String>,

    /// Name of the leader election lease
    #[arg(long, env = "LEADER_ELECTION_ID", default_value = DEFAULT_LEADER_ELECTION_ID)]
    pub leader_election_id: String,

    /// GitHub REST API base URL (set for GitHub Enterprise Server)
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL)]
    pub github_api_url: String,

    /// GitHub token used to list and create repository hooks
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

impl Config {
    /// Check the configuration before anything is started
    pub fn validate(&self) -> Result<(), Error> {
        if self.github_token.as_deref().filter(|t| !t.is_empty()).is_none() {
            return Err(Error::config("GITHUB_TOKEN envvar is not set"));
        }
        if self.max_concurrent_reconciles == 0 {
            return Err(Error::config("max-concurrent-reconciles must be at least 1"));
        }
        if self.sync_period.is_zero() {
            return Err(Error::config("sync-period must be greater than zero"));
        }
        self.webhook()?;
        Ok(())
    }

    /// Desired webhook settings derived from the flags
    pub fn webhook(&self) -> Result<WebhookConfig, Error> {
        WebhookConfig::new(&self.webhook_url, &self.webhook_events)
    }
}

/// Immutable webhook settings every repository should converge to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Delivery URL
    pub url: String,
    /// Subscribed events, in the order given
    pub events: Vec<String>,
}

impl WebhookConfig {
    /// Build webhook settings from a URL and a comma-separated event list
    pub fn new(url: &str, events: &str) -> Result<Self, Error> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::config("webhook-url must not be empty"));
        }
        let events = parse_events(events);
        if events.is_empty() {
            return Err(Error::config("webhook-events must name at least one event"));
        }
        Ok(Self {
            url: url.to_string(),
            events,
        })
    }
}

/// Split a comma-separated event list, keeping order and dropping blanks
pub fn parse_events(events: &str) -> Vec<String> {
    events
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["runner-webhook"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn events_keep_order_and_drop_blanks() {
        assert_eq!(
            parse_events("push, pull_request,,workflow_job "),
            vec!["push", "pull_request", "workflow_job"]
        );
        assert!(parse_events(" , ").is_empty());
    }

    #[test]
    fn explicit_flags_are_parsed() {
        let config = parse(&[
            "--webhook-url",
            "https://hooks.example",
            "--webhook-events",
            "workflow_job,push",
            "--max-concurrent-reconciles",
            "4",
            "--sync-period",
            "30m",
            "--github-token",
            "ghp_test",
        ]);

        assert_eq!(config.max_concurrent_reconciles, 4);
        assert_eq!(*config.sync_period, Duration::from_secs(30 * 60));
        let webhook = config.webhook().expect("valid webhook config");
        assert_eq!(webhook.url, "https://hooks.example");
        assert_eq!(webhook.events, vec!["workflow_job", "push"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sync_period_defaults_to_controller_default() {
        let config = parse(&[]);
        assert_eq!(*config.sync_period, DEFAULT_SYNC_PERIOD);
        assert_eq!(config.sync_period.to_string(), "4h");
    }

    #[test]
    fn invalid_sync_period_is_rejected_by_parser() {
        let result = Config::try_parse_from([
            "runner-webhook",
            "--sync-period",
            "soon",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_token_fails_validation() {
        let config = parse(&["--github-token", ""]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn zero_concurrency_fails_validation() {
        let config = parse(&["--github-token", "t", "--max-concurrent-reconciles", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn webhook_config_requires_url_and_events() {
        assert!(WebhookConfig::new("", "workflow_job").is_err());
        assert!(WebhookConfig::new("https://hooks.example", ",").is_err());
        assert!(WebhookConfig::new("https://hooks.example", "workflow_job").is_ok());
    }
}
