//! runner-webhook operator binary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use kube::api::{Api, DynamicObject};
use kube::runtime::controller::{self, Controller};
use kube::runtime::reflector::store::Writer;
use kube::runtime::watcher::{watcher, Config as WatcherConfig};
use kube::runtime::WatchStreamExt;
use kube::Client;

use runner_webhook::config::Config;
use runner_webhook::controller::{error_policy, reconcile, reconcile_triggers, Context};
use runner_webhook::crd::{HasApiResource, HorizontalRunnerAutoscaler};
use runner_webhook::health::{ready_while, start_health_server};
use runner_webhook::leader_election::{LeaderElector, LeaderGuard};
use runner_webhook::telemetry::{init_telemetry, TelemetryConfig};

/// Watcher timeout (seconds); must stay below the client read timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Namespace used for the lease when neither the flag nor the pod namespace is set
const FALLBACK_LEASE_NAMESPACE: &str = "default";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    init_telemetry(TelemetryConfig::default())?;
    config.validate()?;

    let client = Client::try_default().await?;
    let ready = Arc::new(AtomicBool::new(false));
    tokio::spawn(start_health_server(
        config.health_probe_bind_address,
        ready.clone(),
    ));

    // Standby replicas report ready while they wait for the lease
    let guard = ready_while(&ready, async {
        if config.leader_elect {
            Some(acquire_leadership(client.clone(), &config).await)
        } else {
            None
        }
    })
    .await;

    let ctx = Arc::new(Context::builder(client.clone(), &config).build()?);
    run_controller(client, &config, ctx, ready, guard).await;

    tracing::info!("runner-webhook shutting down");
    Ok(())
}

async fn acquire_leadership(client: Client, config: &Config) -> LeaderGuard {
    let namespace = config
        .leader_election_namespace
        .clone()
        .or_else(|| std::env::var("POD_NAMESPACE").ok())
        .unwrap_or_else(|| FALLBACK_LEASE_NAMESPACE.to_string());
    let identity = std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("runner-webhook-{}", std::process::id()));

    let elector = Arc::new(LeaderElector::new(
        client,
        &config.leader_election_id,
        &namespace,
        &identity,
    ));
    elector.acquire().await
}

async fn run_controller(
    client: Client,
    config: &Config,
    ctx: Arc<Context>,
    ready: Arc<AtomicBool>,
    guard: Option<LeaderGuard>,
) {
    let ar = HorizontalRunnerAutoscaler::api_resource();
    let autoscalers: Api<DynamicObject> = Api::all_with(client, &ar);

    tracing::info!(
        webhook_url = %config.webhook_url,
        events = %config.webhook_events,
        concurrency = config.max_concurrent_reconciles,
        sync_period = %config.sync_period,
        "Starting HorizontalRunnerAutoscaler controller"
    );

    let writer = Writer::new(ar.clone());
    let reader = writer.as_reader();
    let events = watcher(autoscalers, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .default_backoff()
        .reflect(writer);

    let triggers = reconcile_triggers(events, ctx.clone());
    let controller = Controller::for_stream_with(triggers, reader, ar)
        .with_config(controller::Config::default().concurrency(config.max_concurrent_reconciles))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    tracing::debug!(autoscaler = %obj, ?action, "Autoscaler reconciliation completed")
                }
                Err(e) => tracing::error!(error = ?e, "Autoscaler reconciliation error"),
            }
        });

    match guard {
        Some(mut guard) => {
            tokio::select! {
                _ = controller => tracing::info!("Controller completed"),
                _ = guard.lost() => tracing::warn!("Leadership lost, stopping controller"),
            }
            ready.store(false, Ordering::SeqCst);
            if let Err(e) = guard.release_leadership().await {
                tracing::warn!(error = %e, "Failed to release leadership");
            }
        }
        None => {
            controller.await;
            ready.store(false, Ordering::SeqCst);
        }
    }
}
