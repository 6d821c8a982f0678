use crate::cache::{CacheStats, ViewCache, ViewKind};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::trends::TrendSource;
use crate::views::{
    AlertOverview, ClientInfo, DashboardSettings, DashboardView, EndpointLatency,
    RealtimeMetrics, RegisteredClient,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use telemon_alert::AlertEngine;
use telemon_common::window::{self, clamp_window, SUPPORTED_WINDOWS};
use telemon_health::HealthEvaluator;
use telemon_metrics::{series, AggregateField, MetricsStore};

#[derive(Clone)]
enum CachedView {
    Dashboard(Arc<DashboardView>),
    Realtime(Arc<RealtimeMetrics>),
}

/// Window key for caching; unbounded windows share one key.
fn window_key(window: Duration) -> i64 {
    let window = clamp_window(window);
    if window == Duration::MAX {
        -1
    } else {
        window.num_seconds()
    }
}

pub struct DashboardAggregator {
    config: DashboardConfig,
    metrics: Arc<MetricsStore>,
    health: Arc<HealthEvaluator>,
    alerts: Arc<AlertEngine>,
    trends: Arc<dyn TrendSource>,
    cache: ViewCache<CachedView>,
    clients: DashMap<String, RegisteredClient>,
}

impl DashboardAggregator {
    pub fn new(
        config: DashboardConfig,
        metrics: Arc<MetricsStore>,
        health: Arc<HealthEvaluator>,
        alerts: Arc<AlertEngine>,
        trends: Arc<dyn TrendSource>,
    ) -> Self {
        let cache = ViewCache::new(window::secs(config.cache_ttl_secs));
        Self {
            config,
            metrics,
            health,
            alerts,
            trends,
            cache,
            clients: DashMap::new(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Full dashboard for `window`, served from cache while fresh.
    pub async fn dashboard(&self, window: Duration) -> Arc<DashboardView> {
        let key = (ViewKind::Dashboard, window_key(window));
        if let Some(CachedView::Dashboard(view)) = self.cache.get(&key) {
            return view;
        }
        let view = Arc::new(self.build_dashboard(window, Utc::now()).await);
        self.cache.insert(key, CachedView::Dashboard(Arc::clone(&view)));
        view
    }

    async fn build_dashboard(&self, window: Duration, now: DateTime<Utc>) -> DashboardView {
        let window = clamp_window(window);
        let top = self.config.top_endpoints;

        let slow_endpoints = self
            .metrics
            .top_k_at(series::API_PREFIX, window, AggregateField::P95, top, now)
            .into_iter()
            .map(|(name, agg)| EndpointLatency {
                endpoint: series::endpoint_of(&name).to_string(),
                requests: agg.count,
                mean_ms: agg.mean,
                p95_ms: agg.p95,
                max_ms: agg.max,
            })
            .collect();

        let mut error_endpoints: Vec<_> = self
            .metrics
            .api_stats_at(window, now)
            .endpoints
            .into_iter()
            .filter(|e| e.errors > 0)
            .collect();
        error_endpoints.sort_by(|a, b| {
            b.errors
                .cmp(&a.errors)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });
        error_endpoints.truncate(top);

        let health = match self.health.latest() {
            Some(snapshot) => snapshot,
            None => self.health.evaluate().await,
        };

        let trends = match self.trends.analyze_trends(window).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Trend analysis failed, dashboard served without trends"
                );
                None
            }
        };

        DashboardView {
            window_secs: (window != Duration::MAX).then(|| window.num_seconds()),
            generated_at: now,
            performance: self.metrics.performance_overview_at(window, now),
            health,
            alerts: self.alert_overview(window, now),
            slow_endpoints,
            error_endpoints,
            trends,
        }
    }

    fn alert_overview(&self, window: Duration, now: DateTime<Utc>) -> AlertOverview {
        let active = self.alerts.active_alerts(None);
        let mut active_by_severity = BTreeMap::new();
        for alert in &active {
            *active_by_severity
                .entry(alert.severity.to_string())
                .or_insert(0) += 1;
        }
        AlertOverview {
            active: active.len(),
            active_by_severity,
            statistics: self.alerts.alert_statistics_at(window, now),
        }
    }

    /// Last-minute view, cached like the dashboard.
    pub fn realtime_metrics(&self) -> Arc<RealtimeMetrics> {
        let window = Duration::minutes(1);
        let key = (ViewKind::Realtime, window_key(window));
        if let Some(CachedView::Realtime(view)) = self.cache.get(&key) {
            return view;
        }

        let now = Utc::now();
        let overview = self.metrics.performance_overview_at(window, now);
        let view = Arc::new(RealtimeMetrics {
            timestamp: now,
            requests_per_minute: overview.requests_per_minute,
            mean_response_ms: overview.mean_response_ms,
            p95_response_ms: overview.p95_response_ms,
            error_rate: overview.error_rate,
            memory_percent: overview.memory_percent.map(|r| r.value),
            cpu_percent: overview.cpu_percent.map(|r| r.value),
            active_alerts: self.alerts.active_alerts(None).len(),
            clients: self.clients.len(),
        });
        self.cache.insert(key, CachedView::Realtime(Arc::clone(&view)));
        view
    }

    pub fn dashboard_config(&self) -> DashboardSettings {
        DashboardSettings {
            refresh_interval_secs: self.config.refresh_interval_secs,
            cache_ttl_secs: self.config.cache_ttl_secs,
            default_window: self.config.default_window.clone(),
            supported_windows: SUPPORTED_WINDOWS.to_vec(),
            widgets: self.config.widgets.clone(),
        }
    }

    /// Record interest from a live-view consumer. Registering an existing
    /// id replaces its info.
    pub fn register_client(&self, id: &str, info: ClientInfo) -> Result<RegisteredClient> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DashboardError::InvalidClient("client id must not be empty".into()));
        }
        let client = RegisteredClient {
            id: id.to_string(),
            info,
            registered_at: Utc::now(),
        };
        self.clients.insert(client.id.clone(), client.clone());
        tracing::info!(
            client_id = %id,
            clients = self.clients.len(),
            "Dashboard client registered"
        );
        Ok(client)
    }

    pub fn unregister_client(&self, id: &str) -> Result<RegisteredClient> {
        let (_, client) = self
            .clients
            .remove(id)
            .ok_or_else(|| DashboardError::ClientNotFound(id.to_string()))?;
        tracing::info!(client_id = %id, "Dashboard client unregistered");
        Ok(client)
    }

    /// Registered clients ordered by id.
    pub fn clients(&self) -> Vec<RegisteredClient> {
        let mut clients: Vec<RegisteredClient> =
            self.clients.iter().map(|entry| entry.value().clone()).collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));
        clients
    }

    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.clear();
        tracing::info!(removed, "Dashboard cache cleared");
        removed
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired_at(Utc::now())
    }
}
