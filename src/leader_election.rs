//! Lease-based leader election
//!
//! With `--leader-elect`, replicas compete for a `coordination.k8s.io/v1`
//! Lease and only the holder runs the controller. Writes carry the lease's
//! resourceVersion, so two replicas racing on the same lease see a 409 and
//! one of them backs off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::Error;

const LEASE_DURATION: Duration = Duration::from_secs(30);
const RENEW_INTERVAL: Duration = Duration::from_secs(10);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);
const FIELD_MANAGER: &str = "runner-webhook";

/// What to do with the lease as currently observed
#[derive(Clone, Debug, PartialEq, Eq)]
enum LeaseDecision {
    /// No lease exists yet
    Create,
    /// We hold it; bump the renew time
    Renew,
    /// Held by someone whose lease has expired
    TakeOver { transitions: i32 },
    /// Held by someone else and still valid
    Wait,
}

fn decide(existing: Option<&Lease>, identity: &str, now: DateTime<Utc>) -> LeaseDecision {
    let Some(lease) = existing else {
        return LeaseDecision::Create;
    };
    let spec = lease.spec.as_ref();

    if spec.and_then(|s| s.holder_identity.as_deref()) == Some(identity) {
        return LeaseDecision::Renew;
    }

    let renew_time = spec.and_then(|s| s.renew_time.as_ref());
    let duration_secs = spec.and_then(|s| s.lease_duration_seconds);
    let expired = match (renew_time, duration_secs) {
        (Some(rt), Some(secs)) => now > rt.0 + chrono::Duration::seconds(i64::from(secs)),
        _ => true,
    };

    if expired {
        LeaseDecision::TakeOver {
            transitions: spec.and_then(|s| s.lease_transitions).unwrap_or(0),
        }
    } else {
        LeaseDecision::Wait
    }
}

fn missing_resource_version() -> Error {
    Error::internal_with_context("leader_election", "lease missing resourceVersion")
}

/// Competes for and holds a named Lease
pub struct LeaderElector {
    client: Client,
    lease_name: String,
    namespace: String,
    identity: String,
    is_leader: Arc<AtomicBool>,
}

impl LeaderElector {
    /// Create an elector for `namespace/lease_name` identifying as `identity`
    pub fn new(client: Client, lease_name: &str, namespace: &str, identity: &str) -> Self {
        Self {
            client,
            lease_name: lease_name.to_string(),
            namespace: namespace.to_string(),
            identity: identity.to_string(),
            is_leader: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true while this replica holds the lease
    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::SeqCst)
    }

    /// Block until leadership is acquired, then return a guard that keeps it
    pub async fn acquire(self: Arc<Self>) -> LeaderGuard {
        info!(
            identity = %self.identity,
            lease = %self.lease_name,
            namespace = %self.namespace,
            "Waiting for leadership..."
        );

        loop {
            match self.try_acquire_or_renew().await {
                Ok(true) => {
                    info!(identity = %self.identity, "Leadership acquired");
                    self.is_leader.store(true, Ordering::SeqCst);
                    return self.create_guard();
                }
                Ok(false) => {
                    debug!(identity = %self.identity, "Lease held by another, waiting...");
                }
                Err(e) => {
                    warn!(
                        identity = %self.identity,
                        error = %e,
                        retry_secs = RETRY_INTERVAL.as_secs(),
                        "Failed to acquire lease, retrying..."
                    );
                }
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    fn create_guard(self: &Arc<Self>) -> LeaderGuard {
        let (lost_tx, lost_rx) = oneshot::channel();
        let elector = Arc::clone(self);
        let renewal_task = tokio::spawn(async move {
            elector.renewal_loop(lost_tx).await;
        });

        LeaderGuard {
            elector: Arc::clone(self),
            renewal_task,
            lost_rx: Some(lost_rx),
        }
    }

    async fn try_acquire_or_renew(&self) -> Result<bool, Error> {
        let api: Api<Lease> = Api::namespaced(self.client.clone(), &self.namespace);
        let now = Utc::now();
        let existing = api.get_opt(&self.lease_name).await?;

        match decide(existing.as_ref(), &self.identity, now) {
            LeaseDecision::Create => self.create_lease(&api, now).await,
            LeaseDecision::Renew => match existing {
                Some(lease) => self.renew_lease(&api, lease, now).await,
                None => Ok(false),
            },
            LeaseDecision::TakeOver { transitions } => {
                let rv = existing.and_then(|l| l.metadata.resource_version);
                self.take_over_lease(&api, rv, now, transitions).await
            }
            LeaseDecision::Wait => Ok(false),
        }
    }

    fn lease_for(&self, resource_version: Option<String>, now: DateTime<Utc>, transitions: i32) -> Lease {
        Lease {
            metadata: ObjectMeta {
                name: Some(self.lease_name.clone()),
                namespace: Some(self.namespace.clone()),
                resource_version,
                ..Default::default()
            },
            spec: Some(LeaseSpec {
                holder_identity: Some(self.identity.clone()),
                lease_duration_seconds: Some(LEASE_DURATION.as_secs() as i32),
                acquire_time: Some(MicroTime(now)),
                renew_time: Some(MicroTime(now)),
                lease_transitions: Some(transitions),
                ..Default::default()
            }),
        }
    }

    async fn create_lease(&self, api: &Api<Lease>, now: DateTime<Utc>) -> Result<bool, Error> {
        let lease = self.lease_for(None, now, 0);
        match api.create(&PostParams::default(), &lease).await {
            Ok(_) => {
                info!(identity = %self.identity, "Created new lease");
                Ok(true)
            }
            Err(kube::Error::Api(e)) if e.code == 409 => {
                debug!(identity = %self.identity, "Lease creation conflict, will retry");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn renew_lease(
        &self,
        api: &Api<Lease>,
        mut lease: Lease,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        if lease.metadata.resource_version.is_none() {
            return Err(missing_resource_version());
        }
        if let Some(spec) = lease.spec.as_mut() {
            spec.renew_time = Some(MicroTime(now));
        }

        match api.replace(&self.lease_name, &PostParams::default(), &lease).await {
            Ok(_) => {
                debug!(identity = %self.identity, "Lease renewed");
                Ok(true)
            }
            Err(kube::Error::Api(e)) if e.code == 409 => {
                warn!(identity = %self.identity, "Lease renewal conflict - lost leadership");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn take_over_lease(
        &self,
        api: &Api<Lease>,
        resource_version: Option<String>,
        now: DateTime<Utc>,
        transitions: i32,
    ) -> Result<bool, Error> {
        let rv = resource_version.ok_or_else(missing_resource_version)?;
        let lease = self.lease_for(Some(rv), now, transitions + 1);

        match api.replace(&self.lease_name, &PostParams::default(), &lease).await {
            Ok(_) => {
                info!(
                    identity = %self.identity,
                    transitions = transitions + 1,
                    "Took over expired lease"
                );
                Ok(true)
            }
            Err(kube::Error::Api(e)) if e.code == 409 => {
                debug!(identity = %self.identity, "Lease takeover conflict, will retry");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn renewal_loop(&self, lost_tx: oneshot::Sender<()>) {
        loop {
            tokio::time::sleep(RENEW_INTERVAL).await;

            match self.try_acquire_or_renew().await {
                Ok(true) => {}
                Ok(false) | Err(_) => {
                    warn!(identity = %self.identity, "Leadership lost");
                    self.is_leader.store(false, Ordering::SeqCst);
                    let _ = lost_tx.send(());
                    return;
                }
            }
        }
    }

    /// Clear the holder so a standby can take over without waiting for expiry
    async fn release_lease(&self) -> Result<(), Error> {
        let api: Api<Lease> = Api::namespaced(self.client.clone(), &self.namespace);

        let Some(lease) = api.get_opt(&self.lease_name).await? else {
            debug!(identity = %self.identity, "Lease not found, nothing to release");
            return Ok(());
        };

        let holder = lease.spec.as_ref().and_then(|s| s.holder_identity.as_deref());
        if holder != Some(self.identity.as_str()) {
            debug!(identity = %self.identity, "Not the lease holder, nothing to release");
            return Ok(());
        }

        let past = Utc::now() - chrono::Duration::seconds(60);
        let patch = json!({
            "spec": {
                "holderIdentity": null,
                "renewTime": past.to_rfc3339()
            }
        });

        api.patch(
            &self.lease_name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Merge(&patch),
        )
        .await?;

        info!(identity = %self.identity, "Lease released for fast failover");
        Ok(())
    }
}

/// Holds leadership until dropped
///
/// A background task renews the lease; [`LeaderGuard::lost`] resolves when a
/// renewal fails.
pub struct LeaderGuard {
    elector: Arc<LeaderElector>,
    renewal_task: JoinHandle<()>,
    lost_rx: Option<oneshot::Receiver<()>>,
}

impl LeaderGuard {
    /// Wait until leadership is lost
    pub async fn lost(&mut self) {
        if let Some(rx) = self.lost_rx.take() {
            let _ = rx.await;
        }
    }

    /// Release leadership by clearing the lease holder (graceful shutdown)
    pub async fn release_leadership(&self) -> Result<(), Error> {
        self.elector.release_lease().await
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        self.elector.is_leader.store(false, Ordering::SeqCst);
        self.renewal_task.abort();
        info!(identity = %self.elector.identity, "Leadership released");
    }
}
