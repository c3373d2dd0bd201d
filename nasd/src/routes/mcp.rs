//! `/mcp` JSON-RPC tool surface (§4.8, §6): one WebSocket connection, one
//! `nasd_rpc::Dispatcher` per text frame in, one response frame out (unless
//! the frame was a notification).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use nasd_core::AppError;
use nasd_providers::{
    ContainerProvider, SimContainerProvider, SimStorageProvider, SimSystemProvider,
    SimVirtualizationProvider, StorageProvider, SystemProvider, VirtualizationProvider,
};
use nasd_rpc::{ToolDefinition, ToolRegistry};

use crate::state::AppState;

pub fn register_tools(
    registry: &ToolRegistry,
    system: Arc<SimSystemProvider>,
    storage: Arc<SimStorageProvider>,
    containers: Arc<SimContainerProvider>,
    vms: Arc<SimVirtualizationProvider>,
) {
    registry.register(
        ToolDefinition {
            name: "system.cpu".to_string(),
            description: "Current CPU model, core/thread counts, and per-thread usage".to_string(),
            parameters_schema: serde_json::json!({"type": "object", "properties": {}}),
        },
        {
            let system = system.clone();
            Arc::new(move |_args| {
                let system = system.clone();
                Box::pin(async move { Ok(serde_json::to_value(system.cpu().await?).unwrap()) })
            })
        },
    );

    registry.register(
        ToolDefinition {
            name: "system.memory".to_string(),
            description: "Current memory usage and cache workload breakdown".to_string(),
            parameters_schema: serde_json::json!({"type": "object", "properties": {}}),
        },
        {
            let system = system.clone();
            Arc::new(move |_args| {
                let system = system.clone();
                Box::pin(async move { Ok(serde_json::to_value(system.memory().await?).unwrap()) })
            })
        },
    );

    registry.register(
        ToolDefinition {
            name: "storage.array_status".to_string(),
            description: "Array membership, per-disk state, and resync progress".to_string(),
            parameters_schema: serde_json::json!({"type": "object", "properties": {}}),
        },
        {
            let storage = storage.clone();
            Arc::new(move |_args| {
                let storage = storage.clone();
                Box::pin(async move { Ok(serde_json::to_value(storage.array_status().await?).unwrap()) })
            })
        },
    );

    registry.register(
        ToolDefinition {
            name: "docker.list_containers".to_string(),
            description: "List known containers and their current state".to_string(),
            parameters_schema: serde_json::json!({"type": "object", "properties": {}}),
        },
        {
            let containers = containers.clone();
            Arc::new(move |_args| {
                let containers = containers.clone();
                Box::pin(async move {
                    Ok(serde_json::to_value(containers.list_containers().await?).unwrap())
                })
            })
        },
    );

    registry.register(
        ToolDefinition {
            name: "docker.stop".to_string(),
            description: "Stop a container by id".to_string(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"],
            }),
        },
        {
            let containers = containers.clone();
            Arc::new(move |args| {
                let containers = containers.clone();
                Box::pin(async move {
                    let id = container_id(&args)?;
                    containers.stop(&id, std::time::Duration::from_secs(10)).await?;
                    Ok(serde_json::json!({"id": id, "state": "stopped"}))
                })
            })
        },
    );

    registry.register(
        ToolDefinition {
            name: "docker.start".to_string(),
            description: "Start a container by id".to_string(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"],
            }),
        },
        {
            let containers = containers.clone();
            Arc::new(move |args| {
                let containers = containers.clone();
                Box::pin(async move {
                    let id = container_id(&args)?;
                    containers.start(&id, std::time::Duration::from_secs(10)).await?;
                    Ok(serde_json::json!({"id": id, "state": "running"}))
                })
            })
        },
    );

    registry.register(
        ToolDefinition {
            name: "vms.list".to_string(),
            description: "List known virtual machines and their current state".to_string(),
            parameters_schema: serde_json::json!({"type": "object", "properties": {}}),
        },
        Arc::new(move |_args| {
            let vms = vms.clone();
            Box::pin(async move { Ok(serde_json::to_value(vms.list().await?).unwrap()) })
        }),
    );
}

fn container_id(args: &serde_json::Value) -> Result<String, AppError> {
    args.get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation {
            message: "missing required field `id`".to_string(),
            fields: vec![],
        })
}

pub async fn mcp_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let (mut sink, mut stream) = socket.split();
        while let Some(Ok(message)) = stream.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            if let Some(response) = state.rpc.handle(&text).await {
                if sink.send(Message::Text(response.into())).await.is_err() {
                    break;
                }
            }
        }
    })
}
