//! Engine configuration loaded from YAML.
//!
//! Externalizes deployment-specific knobs (timeout, toolchain location,
//! import roots) so they live next to the installation instead of being
//! hardcoded. Every field has a default; an empty file is a valid config.
//!
//! # File format
//!
//! ```yaml
//! # wirebench.yaml
//! default_timeout_secs: 30
//! user_agent: "wirebench/0.1"
//!
//! # Use a protoc binary that is not on PATH.
//! protoc_path: /opt/protobuf/bin/protoc
//!
//! # Extra import roots for filesystem registration.
//! include_paths:
//!   - /srv/protos/vendor
//!
//! # Logical registry name used by the persistence collaborator.
//! registry_name: default
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use wirebench_schema::compiler::Compiler;
use wirebench_schema::SchemaRegistry;

/// Deployment-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Request timeout applied when a spec leaves its own unset or
    /// non-positive.
    pub default_timeout_secs: u64,

    /// `User-Agent` sent with every request.
    pub user_agent: String,

    /// Protoc binary to invoke instead of resolving `protoc` from `PATH`.
    pub protoc_path: Option<PathBuf>,

    /// Extra import roots appended for filesystem registration.
    pub include_paths: Vec<PathBuf>,

    /// Logical registry name used by the persistence collaborator.
    pub registry_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            user_agent: concat!("wirebench/", env!("CARGO_PKG_VERSION")).to_string(),
            protoc_path: None,
            include_paths: Vec::new(),
            registry_name: "default".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Build a [`SchemaRegistry`] honoring this config's compiler settings
    /// and registry name.
    #[must_use]
    pub fn registry(&self) -> SchemaRegistry {
        let compiler = match &self.protoc_path {
            Some(path) => Compiler::with_protoc(path),
            None => Compiler::new(),
        };
        SchemaRegistry::new()
            .with_name(self.registry_name.as_str())
            .with_compiler(compiler)
    }
}
