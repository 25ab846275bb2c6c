use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Routes the host mounts itself; the docs page cannot take them over.
pub const RESERVED_PATHS: [&str; 2] = ["/health", "/openapi.json"];

/// Settings of the HTTP host, read from `modules.api_ingress`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ApiIngressConfig {
    /// Serve `/openapi.json` and the interactive docs page.
    pub enable_docs: bool,
    /// Route of the interactive docs page.
    pub docs_path: String,
    pub cors_enabled: bool,
    /// Per-request handler timeout.
    pub request_timeout_sec: u64,
    pub body_limit_bytes: usize,
    /// `info` block of the generated OpenAPI document.
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            enable_docs: true,
            docs_path: "/swagger".to_string(),
            cors_enabled: false,
            request_timeout_sec: 30,
            body_limit_bytes: 16 * 1024 * 1024,
            title: "Integrate Swagger".to_string(),
            version: "1.0".to_string(),
            description: "A Swagger documentation of a User Management API.".to_string(),
        }
    }
}

impl ApiIngressConfig {
    /// Reject settings the router would panic on at startup.
    pub fn validate(&self) -> Result<()> {
        let path = self.docs_path.as_str();
        if !path.starts_with('/') {
            bail!("docs_path '{path}' must start with '/'");
        }
        if path.contains(['{', '}', '*']) {
            bail!("docs_path '{path}' must be a static path");
        }
        if RESERVED_PATHS.contains(&path) {
            bail!("docs_path '{path}' collides with a built-in route");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_section_keeps_defaults() {
        let cfg: ApiIngressConfig =
            serde_json::from_value(serde_json::json!({ "cors_enabled": true })).unwrap();
        assert!(cfg.cors_enabled);
        assert!(cfg.enable_docs);
        assert_eq!(cfg.docs_path, "/swagger");
        assert_eq!(cfg.request_timeout_sec, 30);
        assert_eq!(cfg.body_limit_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: Result<ApiIngressConfig, _> =
            serde_json::from_value(serde_json::json!({ "bind_addr": "0.0.0.0:1" }));
        assert!(res.is_err());
    }

    #[test]
    fn default_and_custom_docs_paths_are_valid() {
        assert!(ApiIngressConfig::default().validate().is_ok());
        let cfg = ApiIngressConfig {
            docs_path: "/docs".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_docs_paths_are_rejected() {
        for bad in ["swagger", "", "/health", "/openapi.json", "/docs/{id}"] {
            let cfg = ApiIngressConfig {
                docs_path: bad.into(),
                ..Default::default()
            };
            let err = cfg.validate().unwrap_err().to_string();
            assert!(err.contains("docs_path"), "{bad}: {err}");
        }
    }
}
