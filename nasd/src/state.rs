//! Application state: every leaf crate's shared handle, composed once at
//! boot and cloned (cheaply, via `Arc`) into every handler — the "compose
//! at boot, depend on the interface" rule from spec §9.

use std::sync::Arc;
use std::time::Duration;

use nasd_async::SharedOperationRegistry;
use nasd_auth::{Authenticator, PrincipalStore, TokenService};
use nasd_core::config::AppConfig;
use nasd_core::health::HealthAggregator;
use nasd_providers::{
    NotificationStore, SharedNotificationStore, SimContainerProvider, SimStorageProvider,
    SimSystemProvider, SimVirtualizationProvider,
};
use nasd_ratelimit::SharedRateLimiter;
use nasd_rpc::{Dispatcher, ToolRegistry};
use nasd_stream::StreamHub;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub authenticator: Arc<Authenticator>,
    pub rate_limiter: SharedRateLimiter,
    pub operations: SharedOperationRegistry,
    pub system: Arc<SimSystemProvider>,
    pub storage: Arc<SimStorageProvider>,
    pub containers: Arc<SimContainerProvider>,
    pub vms: Arc<SimVirtualizationProvider>,
    pub notifications: SharedNotificationStore,
    pub stream: StreamHub,
    pub rpc: Arc<Dispatcher>,
    pub health: Arc<HealthAggregator>,
}

impl AppState {
    pub fn bootstrap(config: AppConfig) -> Self {
        let (store, default_api_key) = PrincipalStore::with_default_administrator("root");
        tracing::info!(api_key = %default_api_key, "generated default administrator credential");
        let secret = config
            .auth
            .jwt_secret
            .clone()
            .map(|s| s.into_bytes())
            .unwrap_or_else(nasd_auth::token::generate_secret);
        let tokens = TokenService::new(&secret);
        let authenticator = Arc::new(Authenticator {
            store: Arc::new(store),
            tokens: Arc::new(tokens),
            legacy_key: config.auth.api_key.clone(),
        });

        let rate_limiter: SharedRateLimiter = Arc::new(nasd_ratelimit::RateLimiter::default());
        let operations: SharedOperationRegistry = Arc::new(nasd_async::OperationRegistry::default());
        let notifications: SharedNotificationStore = Arc::new(NotificationStore::new());

        let system = Arc::new(SimSystemProvider::default());
        let storage = Arc::new(SimStorageProvider::default());
        let containers = Arc::new(SimContainerProvider::default());
        let vms = Arc::new(SimVirtualizationProvider::default());

        let registry = crate::routes::ws::build_channel_registry(
            system.clone(),
            storage.clone(),
            containers.clone(),
        );
        let stream = StreamHub::new(registry)
            .with_version(config.version.clone())
            .with_idle_timeout(Duration::from_secs(90))
            .with_drop_callback(Arc::new(|channel: &str| {
                crate::metrics::global()
                    .stream_dropped_frames_total
                    .with_label_values(&[channel])
                    .inc();
            }));

        let rpc_registry = ToolRegistry::new();
        crate::routes::mcp::register_tools(
            &rpc_registry,
            system.clone(),
            storage.clone(),
            containers.clone(),
            vms.clone(),
        );
        let rpc = Arc::new(Dispatcher::new(rpc_registry, "nasd", env!("CARGO_PKG_VERSION")));

        let mut health = HealthAggregator::new(Duration::from_secs(5));
        health.register(crate::health::OperationBacklogProbe {
            operations: operations.clone(),
        });
        health.register(crate::health::RateLimiterProbe {
            limiter: rate_limiter.clone(),
        });

        Self {
            config: Arc::new(config),
            authenticator,
            rate_limiter,
            operations,
            system,
            storage,
            containers,
            vms,
            notifications,
            stream,
            rpc,
            health: Arc::new(health),
        }
    }
}
