//! `/ws` unified streaming endpoint and the `/ws/{concern}` aliases (§4.5,
//! §6). Channel catalogue wiring lives in [`build_channel_registry`]; the
//! hub itself (subscription control frames, cadence scheduling, dedup,
//! backpressure) is `nasd-stream`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use nasd_providers::{ContainerProvider, SimContainerProvider, SimStorageProvider, SimSystemProvider, StorageProvider, SystemProvider};
use nasd_stream::{ChannelPolicy, ChannelRegistry, SnapshotFn};

use crate::state::AppState;

pub fn build_channel_registry(
    system: Arc<SimSystemProvider>,
    storage: Arc<SimStorageProvider>,
    containers: Arc<SimContainerProvider>,
) -> ChannelRegistry {
    let registry = ChannelRegistry::new();

    registry.register(
        ChannelPolicy::polled("system.stats", Duration::from_secs(1)),
        system_snapshot_fn(system),
    );
    registry.register(
        ChannelPolicy::polled("storage.status", Duration::from_secs(2)),
        storage_snapshot_fn(storage),
    );
    registry.register(
        ChannelPolicy::push_only("docker.events"),
        docker_snapshot_fn(containers),
    );

    registry
}

fn system_snapshot_fn(system: Arc<SimSystemProvider>) -> SnapshotFn {
    Arc::new(move || {
        let system = system.clone();
        Box::pin(async move {
            let (cpu, memory, load_average, uptime, network, sensors) = tokio::try_join!(
                system.cpu(),
                system.memory(),
                system.load_average(),
                system.uptime(),
                system.network(),
                system.sensors(),
            )?;
            Ok(serde_json::json!({
                "cpu": cpu,
                "memory": memory,
                "load_average": load_average,
                "uptime": uptime,
                "network": network,
                "sensors": sensors,
            }))
        })
    })
}

fn storage_snapshot_fn(storage: Arc<SimStorageProvider>) -> SnapshotFn {
    Arc::new(move || {
        let storage = storage.clone();
        Box::pin(async move {
            let (array, smart, capacities, power) = tokio::try_join!(
                storage.array_status(),
                storage.smart_reports(),
                storage.capacities(),
                storage.power_states(),
            )?;
            Ok(serde_json::json!({
                "array": array,
                "smart": smart,
                "capacities": capacities,
                "power": power,
            }))
        })
    })
}

/// `docker.events` is push-only (fed by [`nasd_stream::StreamHub::publish`]
/// from a container-state poller); this producer only backs the channel's
/// type signature and is never invoked by the hub for a push-only policy.
fn docker_snapshot_fn(containers: Arc<SimContainerProvider>) -> SnapshotFn {
    Arc::new(move || {
        let containers = containers.clone();
        Box::pin(async move {
            let list = containers.list_containers().await?;
            Ok(serde_json::json!({ "containers": list }))
        })
    })
}

pub async fn ws_unified(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move { state.stream.serve(socket).await })
}

pub async fn ws_system(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move { state.stream.serve_fixed_channel(socket, "system.stats").await })
}

pub async fn ws_storage(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move { state.stream.serve_fixed_channel(socket, "storage.status").await })
}

pub async fn ws_docker(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move { state.stream.serve_fixed_channel(socket, "docker.events").await })
}
