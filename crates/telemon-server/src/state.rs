use crate::config::ServerConfig;
use crate::database::{TcpDatabasePing, TimedPing};
use std::sync::Arc;
use std::time::Duration;
use telemon_alert::{AlertEngine, EvaluatorRegistry, LoggingActionHandler};
use telemon_collector::ResourceSource;
use telemon_dashboard::{DashboardAggregator, MetricsTrendSource};
use telemon_health::probes::EnvIntegrations;
use telemon_health::{DatabasePing, HealthEvaluator, IntegrationSource};
use telemon_metrics::MetricsStore;

/// Service objects built once at startup and shared by every handler and
/// background task.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub metrics: Arc<MetricsStore>,
    pub health: Arc<HealthEvaluator>,
    pub alerts: Arc<AlertEngine>,
    pub dashboard: Arc<DashboardAggregator>,
}

impl AppState {
    /// Wire the engine from config. The database ping defaults to a TCP
    /// connect to `[database].address` when one is configured. Either way
    /// it is bounded by `[database].connect_timeout_ms`.
    pub fn build(
        config: ServerConfig,
        resources: Arc<dyn ResourceSource>,
        database: Option<Arc<dyn DatabasePing>>,
    ) -> Self {
        let metrics = Arc::new(MetricsStore::new(config.metrics.clone()));

        let connect_timeout = Duration::from_millis(config.database.connect_timeout_ms);
        let database = database
            .or_else(|| {
                let addr = config.database.address.as_ref()?;
                Some(Arc::new(TcpDatabasePing::new(addr.clone())) as Arc<dyn DatabasePing>)
            })
            .map(|ping| Arc::new(TimedPing::new(ping, connect_timeout)) as Arc<dyn DatabasePing>);
        let integrations: Arc<dyn IntegrationSource> =
            Arc::new(EnvIntegrations::new(config.health.integrations.clone()));
        let health = Arc::new(HealthEvaluator::with_default_probes(
            config.health.clone(),
            Arc::clone(&metrics),
            resources,
            database,
            Some(integrations),
        ));

        let alerts = Arc::new(AlertEngine::new(
            config.alert.clone(),
            EvaluatorRegistry::with_defaults(Arc::clone(&metrics), Some(Arc::clone(&health))),
            Arc::new(LoggingActionHandler),
        ));

        let dashboard = Arc::new(DashboardAggregator::new(
            config.dashboard.clone(),
            Arc::clone(&metrics),
            Arc::clone(&health),
            Arc::clone(&alerts),
            Arc::new(MetricsTrendSource::new(Arc::clone(&metrics))),
        ));

        Self {
            config: Arc::new(config),
            metrics,
            health,
            alerts,
            dashboard,
        }
    }
}
