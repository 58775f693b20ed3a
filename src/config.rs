//! Mirror configuration.
//!
//! Layers, lowest to highest precedence: built-in defaults, a YAML file,
//! `FLIGHT_MIRROR_*` environment variables, then command-line flags (applied
//! by the CLI on top of the loaded value).

use crate::allocator::{IdAllocator, DEFAULT_ID_BASE};
use crate::coordinator::{DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_DELETE_SPAN};
use crate::domain::DomainPolicy;
use crate::engine::Dialect;
use crate::error::{MirrorError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_BATCH_SIZE: &str = "FLIGHT_MIRROR_BATCH_SIZE";
pub const ENV_DELETE_CHUNK_SIZE: &str = "FLIGHT_MIRROR_DELETE_CHUNK_SIZE";
pub const ENV_ID_BASE: &str = "FLIGHT_MIRROR_ID_BASE";
pub const ENV_MAX_DELETE_SPAN: &str = "FLIGHT_MIRROR_MAX_DELETE_SPAN";
pub const ENV_ENGINE_A: &str = "FLIGHT_MIRROR_ENGINE_A";
pub const ENV_ENGINE_B: &str = "FLIGHT_MIRROR_ENGINE_B";

/// Where one engine lives and which dialect it speaks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    /// Database file; in-memory when absent
    pub path: Option<PathBuf>,
    pub dialect: Dialect,
}

impl EngineConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self { path: None, dialect }
    }
}

/// An engine block as written in YAML; a missing dialect falls back to the
/// engine's own default
#[derive(Deserialize)]
struct EngineSection {
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    dialect: Option<Dialect>,
}

impl EngineSection {
    fn into_config(self, default_dialect: Dialect) -> EngineConfig {
        EngineConfig {
            path: self.path,
            dialect: self.dialect.unwrap_or(default_dialect),
        }
    }
}

fn default_engine_a() -> EngineConfig {
    EngineConfig::new(Dialect::Literal)
}

fn default_engine_b() -> EngineConfig {
    EngineConfig::new(Dialect::Parameterized)
}

fn engine_a_section<'de, D>(deserializer: D) -> std::result::Result<EngineConfig, D::Error>
where
    D: Deserializer<'de>,
{
    EngineSection::deserialize(deserializer).map(|s| s.into_config(Dialect::Literal))
}

fn engine_b_section<'de, D>(deserializer: D) -> std::result::Result<EngineConfig, D::Error>
where
    D: Deserializer<'de>,
{
    EngineSection::deserialize(deserializer).map(|s| s.into_config(Dialect::Parameterized))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Lowest synthetic identifier number
    pub id_base: u64,
    /// Rows per transaction in batched writes
    pub batch_size: usize,
    /// Identifiers per `IN (...)` group in chunked deletes
    pub delete_chunk_size: usize,
    /// Deletes refuse to run when the current max exceeds `id_base` by more
    pub max_delete_span: u64,
    pub domain_policy: DomainPolicy,
    #[serde(default = "default_engine_a", deserialize_with = "engine_a_section")]
    pub engine_a: EngineConfig,
    #[serde(default = "default_engine_b", deserialize_with = "engine_b_section")]
    pub engine_b: EngineConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            id_base: DEFAULT_ID_BASE,
            batch_size: DEFAULT_BATCH_SIZE,
            delete_chunk_size: DEFAULT_CHUNK_SIZE,
            max_delete_span: DEFAULT_MAX_DELETE_SPAN,
            domain_policy: DomainPolicy::default(),
            engine_a: default_engine_a(),
            engine_b: default_engine_b(),
        }
    }
}

impl MirrorConfig {
    /// Load a YAML file over the defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).map_err(|e| MirrorError::Config(e.to_string()))
    }

    /// Apply `FLIGHT_MIRROR_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_BATCH_SIZE) {
            self.batch_size = parse_var(ENV_BATCH_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_DELETE_CHUNK_SIZE) {
            self.delete_chunk_size = parse_var(ENV_DELETE_CHUNK_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_ID_BASE) {
            self.id_base = parse_var(ENV_ID_BASE, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_DELETE_SPAN) {
            self.max_delete_span = parse_var(ENV_MAX_DELETE_SPAN, &v)?;
        }
        if let Some(v) = lookup(ENV_ENGINE_A).filter(|v| !v.trim().is_empty()) {
            self.engine_a.path = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = lookup(ENV_ENGINE_B).filter(|v| !v.trim().is_empty()) {
            self.engine_b.path = Some(PathBuf::from(v.trim()));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(MirrorError::Config("batch_size must be at least 1".into()));
        }
        if self.delete_chunk_size == 0 {
            return Err(MirrorError::Config(
                "delete_chunk_size must be at least 1".into(),
            ));
        }
        if self.engine_a.path.is_some() && self.engine_a.path == self.engine_b.path {
            return Err(MirrorError::Config(
                "engine_a and engine_b must not share a database file".into(),
            ));
        }
        Ok(())
    }

    pub fn allocator(&self) -> IdAllocator {
        IdAllocator::new(self.id_base)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MirrorError::Config(format!("{} is not a valid number: {:?}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = MirrorConfig::default();
        assert_eq!(config.id_base, 10_000);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.delete_chunk_size, 1000);
        assert_eq!(config.max_delete_span, 1_000_000);
        assert_eq!(config.domain_policy, DomainPolicy::Intersection);
        assert_eq!(config.engine_a.dialect, Dialect::Literal);
        assert_eq!(config.engine_b.dialect, Dialect::Parameterized);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = MirrorConfig::from_yaml(
            r#"
batch_size: 50
domain_policy: union
engine_b:
  path: b.duckdb
"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.delete_chunk_size, 1000);
        assert_eq!(config.domain_policy, DomainPolicy::Union);
        assert_eq!(config.engine_a.dialect, Dialect::Literal);
        assert_eq!(config.engine_b.path, Some(PathBuf::from("b.duckdb")));
    }

    #[test]
    fn test_engine_block_without_dialect_keeps_engine_default() {
        let config = MirrorConfig::from_yaml(
            r#"
engine_a:
  path: a.duckdb
engine_b:
  path: b.duckdb
"#,
        )
        .unwrap();
        assert_eq!(config.engine_a.path, Some(PathBuf::from("a.duckdb")));
        assert_eq!(config.engine_a.dialect, Dialect::Literal);
        assert_eq!(config.engine_b.dialect, Dialect::Parameterized);
    }

    #[test]
    fn test_explicit_dialect_overrides_engine_default() {
        let config = MirrorConfig::from_yaml(
            r#"
engine_a: { dialect: parameterized }
engine_b: { dialect: literal }
"#,
        )
        .unwrap();
        assert_eq!(config.engine_a.dialect, Dialect::Parameterized);
        assert_eq!(config.engine_a.path, None);
        assert_eq!(config.engine_b.dialect, Dialect::Literal);
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let err = MirrorConfig::from_yaml("engine_a: { dialect: sqlite }").unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_BATCH_SIZE, "25"),
            (ENV_ID_BASE, "20000"),
            (ENV_ENGINE_A, "/tmp/a.duckdb"),
        ]
        .into_iter()
        .collect();
        let mut config = MirrorConfig::default();
        config
            .apply_env_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.id_base, 20_000);
        assert_eq!(config.engine_a.path, Some(PathBuf::from("/tmp/a.duckdb")));
        assert_eq!(config.engine_b.path, None);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut config = MirrorConfig::default();
        let err = config
            .apply_env_from(|k| (k == ENV_DELETE_CHUNK_SIZE).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_DELETE_CHUNK_SIZE));
    }

    #[test]
    fn test_validate_zero_sizes() {
        let config = MirrorConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = MirrorConfig {
            delete_chunk_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(MirrorConfig::default().validate().is_ok());
    }
}
