use crate::state::AppState;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

/// Periodic work that runs for the lifetime of the server. The caller aborts
/// the returned handles on shutdown.
pub fn spawn_background_tasks(state: &AppState) -> Vec<JoinHandle<()>> {
    let mut handles = vec![
        spawn_metrics_sweep(state),
        spawn_alert_evaluation(state),
        spawn_alert_cleanup(state),
        spawn_dashboard_purge(state),
    ];
    if state.config.collector.enabled {
        handles.push(spawn_resource_sampler(state));
    } else {
        tracing::info!("Resource sampler disabled");
    }
    handles
}

fn every(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

fn spawn_metrics_sweep(state: &AppState) -> JoinHandle<()> {
    let metrics = Arc::clone(&state.metrics);
    let period = every(metrics.config().sweep_interval_secs);
    tokio::spawn(async move {
        let mut tick = interval(period);
        loop {
            tick.tick().await;
            let removed = metrics.evict_expired();
            if removed > 0 {
                tracing::debug!(removed, "Evicted expired samples");
            }
        }
    })
}

fn spawn_alert_evaluation(state: &AppState) -> JoinHandle<()> {
    let alerts = Arc::clone(&state.alerts);
    let period = every(alerts.config().evaluation_interval_secs);
    tokio::spawn(async move {
        let mut tick = interval(period);
        loop {
            tick.tick().await;
            alerts.evaluate_rules().await;
        }
    })
}

fn spawn_alert_cleanup(state: &AppState) -> JoinHandle<()> {
    let alerts = Arc::clone(&state.alerts);
    let period = every(alerts.config().cleanup_interval_secs);
    tokio::spawn(async move {
        let mut tick = interval(period);
        loop {
            tick.tick().await;
            alerts.cleanup_history();
        }
    })
}

fn spawn_dashboard_purge(state: &AppState) -> JoinHandle<()> {
    let dashboard = Arc::clone(&state.dashboard);
    let period = every(dashboard.config().cache_sweep_interval_secs);
    tokio::spawn(async move {
        let mut tick = interval(period);
        loop {
            tick.tick().await;
            let purged = dashboard.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired dashboard views");
            }
        }
    })
}

fn spawn_resource_sampler(state: &AppState) -> JoinHandle<()> {
    let metrics = Arc::clone(&state.metrics);
    let period = every(state.config.collector.sample_interval_secs);
    tokio::spawn(async move {
        let mut collectors = telemon_collector::default_collectors();
        let mut tick = interval(period);
        loop {
            tick.tick().await;
            let recorded = telemon_collector::sample_into(&metrics, &mut collectors);
            tracing::trace!(recorded, "Sampled host resources");
        }
    })
}
