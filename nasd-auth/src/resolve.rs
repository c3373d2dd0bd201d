//! Credential resolution (§4.6): bearer header (try token then API key) →
//! dedicated API-key header → legacy key → reject.

use std::sync::Arc;

use nasd_core::permissions::Role;

use crate::principal::Principal;
use crate::store::PrincipalStore;
use crate::token::TokenService;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const LEGACY_ADMIN_ID: &str = "legacy-administrator";

#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub id: String,
    pub display_name: String,
    pub role: Role,
}

impl From<&Principal> for AuthenticatedPrincipal {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id.clone(),
            display_name: p.display_name.clone(),
            role: p.role,
        }
    }
}

pub struct Authenticator {
    pub store: Arc<PrincipalStore>,
    pub tokens: Arc<TokenService>,
    /// Pre-shared shared secret checked with constant-time comparison;
    /// `None` disables the legacy path.
    pub legacy_key: Option<String>,
}

impl Authenticator {
    /// Resolve a request's credential. `bearer` is the raw value of an
    /// `Authorization: Bearer <...>` header if present; `api_key_header`
    /// is the dedicated API-key header's value if present.
    pub fn resolve(
        &self,
        bearer: Option<&str>,
        api_key_header: Option<&str>,
    ) -> Option<AuthenticatedPrincipal> {
        if let Some(bearer) = bearer {
            if let Ok(claims) = self.tokens.validate(bearer) {
                return Some(AuthenticatedPrincipal {
                    id: claims.sub,
                    display_name: claims.name,
                    role: claims.role,
                });
            }
            if let Some(principal) = self.store.authenticate_credential(bearer) {
                return Some(AuthenticatedPrincipal::from(principal.as_ref()));
            }
        }

        if let Some(key) = api_key_header {
            if let Some(legacy) = &self.legacy_key {
                if constant_time_eq(key.as_bytes(), legacy.as_bytes()) {
                    return Some(AuthenticatedPrincipal {
                        id: LEGACY_ADMIN_ID.to_string(),
                        display_name: "legacy administrator".to_string(),
                        role: Role::Administrator,
                    });
                }
            }
            if let Some(principal) = self.store.authenticate_credential(key) {
                return Some(AuthenticatedPrincipal::from(principal.as_ref()));
            }
        }

        None
    }
}

/// Constant-time comparison for the legacy shared secret.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenService;

    fn authenticator() -> (Authenticator, String) {
        let (store, api_key) = PrincipalStore::with_default_administrator("root");
        let tokens = TokenService::new(b"unit-test-secret-value");
        let auth = Authenticator {
            store: Arc::new(store),
            tokens: Arc::new(tokens),
            legacy_key: Some("shared-secret".to_string()),
        };
        (auth, api_key)
    }

    #[test]
    fn resolves_api_key_via_bearer() {
        let (auth, api_key) = authenticator();
        let p = auth.resolve(Some(&api_key), None).unwrap();
        assert_eq!(p.role, Role::Administrator);
    }

    #[test]
    fn resolves_api_key_via_dedicated_header() {
        let (auth, api_key) = authenticator();
        let p = auth.resolve(None, Some(&api_key)).unwrap();
        assert_eq!(p.role, Role::Administrator);
    }

    #[test]
    fn resolves_signed_token_via_bearer() {
        let (auth, api_key) = authenticator();
        let principal = auth.store.authenticate_credential(&api_key).unwrap();
        let (token, _) = auth.tokens.issue(&principal).unwrap();
        let resolved = auth.resolve(Some(&token), None).unwrap();
        assert_eq!(resolved.id, principal.id);
    }

    #[test]
    fn resolves_legacy_key_as_synthetic_administrator() {
        let (auth, _) = authenticator();
        let p = auth.resolve(None, Some("shared-secret")).unwrap();
        assert_eq!(p.id, LEGACY_ADMIN_ID);
        assert_eq!(p.role, Role::Administrator);
    }

    #[test]
    fn unknown_credential_is_rejected() {
        let (auth, _) = authenticator();
        assert!(auth.resolve(Some("bogus"), None).is_none());
        assert!(auth.resolve(None, Some("bogus")).is_none());
        assert!(auth.resolve(None, None).is_none());
    }
}
