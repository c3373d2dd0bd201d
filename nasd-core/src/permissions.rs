//! Permission tags and the role → permission evaluation rule (§4.6).
//!
//! A permission tag is a dotted identifier (`read.docker`, `array.manage`,
//! `user.manage`). Roles are evaluated against a required tag with a fixed
//! convention: administrator gets everything, operator gets everything
//! except `user.*`, viewer gets only `read.*`, any other role gets nothing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Operator,
    Viewer,
    /// Present so an unrecognized role value from a stored principal can
    /// still round-trip through serde instead of failing to deserialize;
    /// it is granted no permissions.
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn permits(&self, tag: &str) -> bool {
        match self {
            Role::Administrator => true,
            Role::Operator => !tag.starts_with("user."),
            Role::Viewer => tag.starts_with("read."),
            Role::Unknown => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Administrator => "administrator",
            Role::Operator => "operator",
            Role::Viewer => "viewer",
            Role::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrator_accepts_every_tag() {
        assert!(Role::Administrator.permits("user.manage"));
        assert!(Role::Administrator.permits("read.docker"));
        assert!(Role::Administrator.permits("array.manage"));
    }

    #[test]
    fn operator_refuses_user_tags_only() {
        assert!(!Role::Operator.permits("user.manage"));
        assert!(Role::Operator.permits("array.manage"));
        assert!(Role::Operator.permits("read.docker"));
    }

    #[test]
    fn viewer_accepts_only_read_tags() {
        assert!(Role::Viewer.permits("read.docker"));
        assert!(!Role::Viewer.permits("array.manage"));
        assert!(!Role::Viewer.permits("user.manage"));
    }

    #[test]
    fn unknown_role_accepts_nothing() {
        assert!(!Role::Unknown.permits("read.docker"));
    }
}
