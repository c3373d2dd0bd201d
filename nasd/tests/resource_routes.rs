//! Integration coverage for the remaining resource routes not already
//! exercised by the named scenarios in `http_api.rs`: notifications, VM
//! actions, confirmed power actions, and user administration.

mod common;

use common::{bootstrap, request};

#[tokio::test]
async fn notification_lifecycle_create_list_read_clear() {
    let app = bootstrap();

    let (create_status, created) = request(
        &app.router,
        "POST",
        "/notifications",
        Some(&app.admin_key),
        Some(serde_json::json!({
            "level": "warning",
            "title": "disk nearing full",
            "message": "/mnt/user is at 92% capacity",
        })),
    )
    .await;
    assert_eq!(create_status, axum::http::StatusCode::OK);
    let id = created["data"]["id"].as_u64().unwrap();

    let (list_status, list_body) =
        request(&app.router, "GET", "/notifications", Some(&app.viewer_key), None).await;
    assert_eq!(list_status, axum::http::StatusCode::OK);
    assert!(list_body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["id"] == id));

    let (read_status, read_body) = request(
        &app.router,
        "POST",
        &format!("/notifications/{id}/read"),
        Some(&app.operator_key),
        None,
    )
    .await;
    assert_eq!(read_status, axum::http::StatusCode::OK);
    assert_eq!(read_body["data"]["read"], true);

    let (clear_status, clear_body) = request(
        &app.router,
        "POST",
        "/notifications/clear",
        Some(&app.operator_key),
        None,
    )
    .await;
    assert_eq!(clear_status, axum::http::StatusCode::OK);
    assert_eq!(clear_body["data"]["cleared"], true);

    let (_, after_clear) =
        request(&app.router, "GET", "/notifications", Some(&app.viewer_key), None).await;
    assert!(after_clear["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn marking_unknown_notification_read_is_not_found() {
    let app = bootstrap();
    let (status, _) = request(
        &app.router,
        "POST",
        "/notifications/999999/read",
        Some(&app.operator_key),
        None,
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn viewer_cannot_create_notifications() {
    let app = bootstrap();
    let (status, body) = request(
        &app.router,
        "POST",
        "/notifications",
        Some(&app.viewer_key),
        Some(serde_json::json!({
            "level": "info",
            "title": "t",
            "message": "m",
        })),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn vm_list_and_start_stop_roundtrip() {
    let app = bootstrap();
    let (list_status, list_body) =
        request(&app.router, "GET", "/vms", Some(&app.viewer_key), None).await;
    assert_eq!(list_status, axum::http::StatusCode::OK);
    let vms = list_body["data"].as_array().unwrap();
    assert!(!vms.is_empty());
    let name = vms[0]["name"].as_str().unwrap().to_string();

    let (stop_status, stop_body) = request(
        &app.router,
        "POST",
        &format!("/vms/{name}/stop"),
        Some(&app.operator_key),
        None,
    )
    .await;
    assert_eq!(stop_status, axum::http::StatusCode::OK);
    assert_eq!(stop_body["data"]["name"], name);

    let (start_status, start_body) = request(
        &app.router,
        "POST",
        &format!("/vms/{name}/start"),
        Some(&app.operator_key),
        None,
    )
    .await;
    assert_eq!(start_status, axum::http::StatusCode::OK);
    assert_eq!(start_body["data"]["name"], name);
}

#[tokio::test]
async fn vm_unknown_action_is_not_found() {
    let app = bootstrap();
    let (list_status, list_body) =
        request(&app.router, "GET", "/vms", Some(&app.viewer_key), None).await;
    assert_eq!(list_status, axum::http::StatusCode::OK);
    let name = list_body["data"][0]["name"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app.router,
        "POST",
        &format!("/vms/{name}/hibernate"),
        Some(&app.operator_key),
        None,
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn power_action_without_confirm_is_rejected() {
    let app = bootstrap();
    let (status, body) = request(
        &app.router,
        "POST",
        "/system/power/reboot",
        Some(&app.admin_key),
        None,
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn execute_with_a_destructive_command_is_refused() {
    let app = bootstrap();
    let (status, body) = request(
        &app.router,
        "POST",
        "/system/execute",
        Some(&app.admin_key),
        Some(serde_json::json!({ "command": "rm -rf /mnt/user/share" })),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn execute_with_a_benign_command_succeeds() {
    let app = bootstrap();
    let (status, body) = request(
        &app.router,
        "POST",
        "/system/execute",
        Some(&app.admin_key),
        Some(serde_json::json!({ "command": "df -h /mnt/user" })),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["data"]["exit_code"], 0);
}

#[tokio::test]
async fn viewer_cannot_execute_commands() {
    let app = bootstrap();
    let (status, body) = request(
        &app.router,
        "POST",
        "/system/execute",
        Some(&app.viewer_key),
        Some(serde_json::json!({ "command": "df -h" })),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn power_action_with_confirm_succeeds_and_creates_an_operation() {
    let app = bootstrap();
    let (status, body) = request(
        &app.router,
        "POST",
        "/system/power/reboot",
        Some(&app.admin_key),
        Some(serde_json::json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["data"]["action"], "reboot");
    let op_id = body["data"]["operation_id"].as_str().unwrap().to_string();

    let (op_status, op_body) = request(
        &app.router,
        "GET",
        &format!("/operations/{op_id}"),
        Some(&app.admin_key),
        None,
    )
    .await;
    assert_eq!(op_status, axum::http::StatusCode::OK);
    assert_eq!(op_body["data"]["state"], "succeeded");
}

#[tokio::test]
async fn viewer_cannot_issue_power_actions_but_operator_can() {
    let app = bootstrap();
    let (viewer_status, viewer_body) = request(
        &app.router,
        "POST",
        "/system/power/shutdown",
        Some(&app.viewer_key),
        Some(serde_json::json!({ "confirm": true })),
    )
    .await;
    assert_eq!(viewer_status, axum::http::StatusCode::FORBIDDEN);
    assert_eq!(viewer_body["error"], "forbidden");

    let (operator_status, _) = request(
        &app.router,
        "POST",
        "/system/power/shutdown",
        Some(&app.operator_key),
        Some(serde_json::json!({ "confirm": true })),
    )
    .await;
    assert_eq!(operator_status, axum::http::StatusCode::OK);
}

#[tokio::test]
async fn auth_users_listing_and_key_regeneration() {
    let app = bootstrap();
    let (list_status, list_body) =
        request(&app.router, "GET", "/auth/users", Some(&app.admin_key), None).await;
    assert_eq!(list_status, axum::http::StatusCode::OK);
    let users = list_body["data"].as_array().unwrap();
    assert!(users.iter().any(|u| u["id"] == "test-operator"));

    let (regen_status, regen_body) = request(
        &app.router,
        "POST",
        "/auth/users/test-operator/regenerate-key",
        Some(&app.admin_key),
        None,
    )
    .await;
    assert_eq!(regen_status, axum::http::StatusCode::OK);
    let new_key = regen_body["data"]["api_key"].as_str().unwrap();
    assert_ne!(new_key, app.operator_key);

    let (old_key_status, _) = request(
        &app.router,
        "GET",
        "/system/info",
        Some(&app.operator_key),
        None,
    )
    .await;
    assert_eq!(old_key_status, axum::http::StatusCode::UNAUTHORIZED);

    let (new_key_status, _) =
        request(&app.router, "GET", "/system/info", Some(new_key), None).await;
    assert_eq!(new_key_status, axum::http::StatusCode::OK);
}

#[tokio::test]
async fn viewer_and_operator_cannot_manage_users() {
    let app = bootstrap();
    for key in [&app.viewer_key, &app.operator_key] {
        let (status, body) =
            request(&app.router, "GET", "/auth/users", Some(key), None).await;
        assert_eq!(status, axum::http::StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }
}

#[tokio::test]
async fn docs_and_openapi_are_public() {
    let app = bootstrap();
    let (docs_status, _) = request(&app.router, "GET", "/docs", None, None).await;
    assert_eq!(docs_status, axum::http::StatusCode::OK);

    let (openapi_status, openapi_body) =
        request(&app.router, "GET", "/openapi.json", None, None).await;
    assert_eq!(openapi_status, axum::http::StatusCode::OK);
    assert!(openapi_body.get("openapi").is_some() || openapi_body.get("paths").is_some());
}

#[tokio::test]
async fn system_ups_and_gpu_are_readable_by_a_viewer() {
    let app = bootstrap();

    let (ups_status, ups_body) =
        request(&app.router, "GET", "/system/ups", Some(&app.viewer_key), None).await;
    assert_eq!(ups_status, axum::http::StatusCode::OK);
    assert_eq!(ups_body["data"]["status"], "online");

    let (gpu_status, gpu_body) =
        request(&app.router, "GET", "/system/gpu", Some(&app.viewer_key), None).await;
    assert_eq!(gpu_status, axum::http::StatusCode::OK);
    assert!(gpu_body["data"].as_array().unwrap().len() >= 1);
}
