use rand::RngCore;

/// Generate a fresh 128-bit correlation identifier, rendered as lowercase hex
/// (32 characters). Matches the shape the pipeline mints when no client
/// correlation header is present.
pub fn new_correlation_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

/// Validate a client-provided correlation header: printable, non-space,
/// 1-64 characters. Anything else is rejected and a fresh ID is minted
/// instead (see the pipeline's correlation stage).
pub fn is_valid_correlation_id(s: &str) -> bool {
    if s.is_empty() || s.len() > 64 {
        return false;
    }
    s.chars().all(|c| c.is_ascii_graphic())
}

/// Generate a new entity identifier (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_ids_are_32_hex_chars() {
        let id = new_correlation_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn validates_printable_non_space_within_length() {
        assert!(is_valid_correlation_id("abc-123_XYZ"));
        assert!(!is_valid_correlation_id(""));
        assert!(!is_valid_correlation_id(&"a".repeat(65)));
        assert!(!is_valid_correlation_id("has space"));
        assert!(!is_valid_correlation_id("tab\tchar"));
    }
}
