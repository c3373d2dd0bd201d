//! Configuration surface and loader.
//!
//! Resolution order (lowest to highest priority), following the teacher's
//! `R2eConfig` layering: a base YAML file, then environment variable
//! overrides using the dotted-key convention (`HTTP_SERVER_PORT` overrides
//! `http_server.port`). The recognized keys are the closed set from the
//! specification; anything else in the YAML file is ignored.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub http_server: HttpServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub mcp: Option<McpConfig>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            http_server: HttpServerConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            mcp: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    34600
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Pre-shared "legacy key" — a single shared secret that authenticates
    /// as a synthetic administrator. `None` disables the legacy path.
    pub api_key: Option<String>,
    /// HMAC signing secret for issued tokens. When absent a fresh 256-bit
    /// value is generated at boot and never persisted (§4.6 Issuance).
    pub jwt_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            jwt_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_max_size")]
    pub max_size: u64,
    #[serde(default = "default_log_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_log_max_age")]
    pub max_age: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_max_size() -> u64 {
    100
}
fn default_log_max_backups() -> u32 {
    5
}
fn default_log_max_age() -> u32 {
    28
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_size: default_log_max_size(),
            max_backups: default_log_max_backups(),
            max_age: default_log_max_age(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_mcp_port")]
    pub port: u16,
    #[serde(default = "default_mcp_max_connections")]
    pub max_connections: usize,
}

fn default_mcp_port() -> u16 {
    34800
}
fn default_mcp_max_connections() -> usize {
    64
}

#[derive(Debug)]
pub enum ConfigError {
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Load `path` (if present) as YAML, then overlay environment variables
    /// using the dotted-key convention. Missing file is not an error: a
    /// default configuration plus env overlay is returned.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut value: serde_yaml::Value = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Load(format!("reading {}: {e}", path.display())))?;
            serde_yaml::from_str(&text)
                .map_err(|e| ConfigError::Load(format!("parsing {}: {e}", path.display())))?
        } else {
            serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
        };

        apply_env_overlay(&mut value);

        serde_yaml::from_value(value).map_err(|e| ConfigError::Load(format!("schema: {e}")))
    }

    /// Build directly from a YAML string (used in tests).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut value: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Load(e.to_string()))?;
        apply_env_overlay(&mut value);
        serde_yaml::from_value(value).map_err(|e| ConfigError::Load(format!("schema: {e}")))
    }
}

/// Overlay env vars using the dotted-key convention: `HTTP_SERVER_PORT`
/// becomes `http_server.port`. Flattens the YAML mapping, applies
/// overrides, then rebuilds nested structure.
fn apply_env_overlay(value: &mut serde_yaml::Value) {
    let mut flat = HashMap::new();
    flatten_yaml("", value, &mut flat);

    for (env_key, env_val) in std::env::vars() {
        let config_key = env_key.to_lowercase().replace('_', ".");
        flat.insert(config_key, env_val);
    }

    for (key, val) in flat {
        set_dotted(value, &key, val);
    }
}

fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let Some(k) = k.as_str() else { continue };
                let key = if prefix.is_empty() {
                    k.to_string()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_yaml(&key, v, out);
            }
        }
        serde_yaml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        serde_yaml::Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        serde_yaml::Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        _ => {}
    }
}

fn set_dotted(root: &mut serde_yaml::Value, dotted_key: &str, val: String) {
    if !root.is_mapping() {
        *root = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
    }
    let parts: Vec<&str> = dotted_key.split('.').collect();
    let mut cursor = root;
    for (i, part) in parts.iter().enumerate() {
        let map = cursor.as_mapping_mut().expect("cursor is a mapping");
        let key = serde_yaml::Value::String(part.to_string());
        if i == parts.len() - 1 {
            map.insert(key, parse_scalar(&val));
        } else {
            cursor = map
                .entry(key)
                .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
            if !cursor.is_mapping() {
                *cursor = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
            }
        }
    }
}

fn parse_scalar(s: &str) -> serde_yaml::Value {
    if let Ok(b) = s.parse::<bool>() {
        return serde_yaml::Value::Bool(b);
    }
    if let Ok(i) = s.parse::<i64>() {
        return serde_yaml::Value::Number(i.into());
    }
    serde_yaml::Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_absent() {
        let cfg = AppConfig::from_yaml_str("").unwrap();
        assert_eq!(cfg.http_server.port, 34600);
        assert!(cfg.mcp.is_none());
    }

    #[test]
    fn parses_nested_yaml() {
        let cfg = AppConfig::from_yaml_str(
            "http_server:\n  port: 9000\nmcp:\n  enabled: true\n  port: 9100\n",
        )
        .unwrap();
        assert_eq!(cfg.http_server.port, 9000);
        assert_eq!(cfg.mcp.unwrap().port, 9100);
    }

    #[test]
    fn mcp_block_is_optional() {
        let cfg = AppConfig::from_yaml_str("version: \"2\"\n").unwrap();
        assert!(cfg.mcp.is_none());
        assert_eq!(cfg.version, "2");
    }
}
