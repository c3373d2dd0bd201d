use nasd_core::clock::unix_now_secs;
use nasd_core::permissions::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub display_name: String,
    pub role: Role,
    pub enabled: bool,
    pub created_at: u64,
    pub last_used_at: Option<u64>,
    /// Opaque credential string (an API key). Unique across all principals
    /// and indexed bidirectionally by the store.
    pub credential: String,
}

impl Principal {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
            enabled: true,
            created_at: unix_now_secs(),
            last_used_at: None,
            credential: credential.into(),
        }
    }
}

/// Generate an opaque API key with the product-specific prefix `uma_`
/// followed by 32 hex characters (matches S1's `uma_<hex>` literal shape).
pub fn generate_api_key() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut hex = String::with_capacity(32);
    for b in bytes {
        hex.push_str(&format!("{b:02x}"));
    }
    format!("uma_{hex}")
}
