//! runner-webhook - keeps GitHub repository webhooks in sync with runner autoscalers
//!
//! Watches `HorizontalRunnerAutoscaler` resources (actions.summerwind.dev) and,
//! for every autoscaler with scale-up triggers, makes sure the repository of
//! its target `RunnerDeployment` has a webhook delivering the configured
//! events to the configured URL. Hooks are created when missing and never
//! modified or deleted.
//!
//! # Modules
//!
//! - [`controller`] - reconcile entry points and the core [`controller::Reconciler`]
//! - [`crd`] - typed views of the runner CRDs
//! - [`decode`] - `DynamicObject` to typed resource decoding
//! - [`repository`] - owner/name resolution of repository strings
//! - [`webhook`] - desired/existing webhooks and the match rule
//! - [`github`] - GitHub REST adapter
//! - [`store`] - cluster reads
//! - [`config`] - command line and environment configuration
//! - [`backoff`] - per-object failure backoff
//! - [`events`] - Kubernetes Event recording
//! - [`leader_election`] - Lease-based leader election
//! - [`health`] - liveness and readiness probes
//! - [`telemetry`] - logging and trace export
//! - [`error`] - error types

#![deny(missing_docs)]

pub mod backoff;
pub mod config;
pub mod controller;
pub mod crd;
pub mod decode;
pub mod error;
pub mod events;
pub mod github;
pub mod health;
pub mod leader_election;
pub mod repository;
pub mod store;
pub mod telemetry;
pub mod webhook;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
