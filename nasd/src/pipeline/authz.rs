//! Stage 9 — authorization (§4.6, §4.1): table-driven path→permission-tag
//! mapping, checked against the authenticated principal's role
//! (`nasd_core::permissions::Role::permits`). S4: a viewer is forbidden from
//! a bulk container mutation; an operator is not.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use nasd_auth::AuthenticatedPrincipal;
use nasd_core::AppError;

/// `None` means the route carries no permission requirement beyond having
/// passed authentication (or being public).
fn permission_tag(method: &str, path: &str) -> Option<&'static str> {
    let is_post = method.eq_ignore_ascii_case("POST");
    let is_delete = method.eq_ignore_ascii_case("DELETE");

    match path {
        "/health" | "/metrics" | "/docs" | "/openapi.json" | "/auth/login" => None,
        "/storage/array/start" | "/storage/array/stop" => Some("array.manage"),
        "/system/execute" => Some("system.execute"),
        p if p.starts_with("/system/power/") => Some("system.power"),
        p if p.starts_with("/system/") => Some("read.system"),
        p if p.starts_with("/storage/") => Some("read.storage"),
        "/docker/containers" if is_post => Some("docker.manage"),
        "/docker/containers" => Some("read.docker"),
        p if p.starts_with("/docker/containers/bulk/") => Some("docker.manage"),
        p if p.starts_with("/docker/containers/") && (is_post || is_delete) => Some("docker.manage"),
        p if p.starts_with("/docker/") => Some("read.docker"),
        "/vms" => Some("read.vms"),
        p if p.starts_with("/vms/") => Some("vms.manage"),
        "/operations" if is_post => Some("operations.manage"),
        "/operations" => Some("read.operations"),
        p if p.starts_with("/operations/") && is_delete => Some("operations.manage"),
        p if p.starts_with("/operations/") => Some("read.operations"),
        "/notifications" if is_post => Some("notifications.manage"),
        "/notifications" => Some("read.notifications"),
        p if p.starts_with("/notifications/") => Some("notifications.manage"),
        "/auth/users" => Some("user.manage"),
        p if p.starts_with("/auth/users/") => Some("user.manage"),
        _ => None,
    }
}

pub async fn authorize(req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    if let Some(tag) = permission_tag(&method, &path) {
        let principal = req.extensions().get::<AuthenticatedPrincipal>().cloned();
        let permitted = principal.as_ref().is_some_and(|p| p.role.permits(tag));
        if !permitted {
            return AppError::Forbidden(format!("role does not permit `{tag}`")).into_response();
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_container_stop_requires_docker_manage() {
        assert_eq!(
            permission_tag("POST", "/docker/containers/bulk/stop"),
            Some("docker.manage")
        );
    }

    #[test]
    fn health_has_no_tag() {
        assert_eq!(permission_tag("GET", "/health"), None);
    }
}
