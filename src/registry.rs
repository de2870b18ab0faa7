//! Job type configuration and registry.
//!
//! A job type opts into uniqueness either by implementing [`UniqueJob`] and
//! being registered, or by shipping a TOML file with `unique = true`. Lookup
//! is by the type identifier carried in the payload's `class` field.

use crate::error::{Error, Result};
use crate::model::{NO_TTL, RELEASE_IMMEDIATELY};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Capability marker for job types that allow at most one pending instance.
pub trait UniqueJob {
    /// Type identifier as it appears in the payload's `class` field.
    const JOB_TYPE: &'static str;

    /// Seconds the lock lives while queued. [`NO_TTL`] keeps it until released.
    const LONER_TTL: i64 = NO_TTL;

    /// Seconds the lock survives after the job leaves the queue.
    const LOCK_AFTER_EXECUTION_PERIOD: i64 = RELEASE_IMMEDIATELY;
}

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct JobTypeFile {
    job: JobTypeConfig,
}

/// Per-type uniqueness settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobTypeConfig {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default = "default_loner_ttl")]
    pub loner_ttl: i64,
    #[serde(default = "default_lock_after_execution_period")]
    pub loner_lock_after_execution_period: i64,
}

fn default_loner_ttl() -> i64 {
    NO_TTL
}

fn default_lock_after_execution_period() -> i64 {
    RELEASE_IMMEDIATELY
}

impl JobTypeConfig {
    /// A registered type that is not unique and uses default TTLs.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            loner_ttl: NO_TTL,
            loner_lock_after_execution_period: RELEASE_IMMEDIATELY,
        }
    }

    /// Settings for a [`UniqueJob`] implementor.
    pub fn of<J: UniqueJob>() -> Self {
        Self {
            name: J::JOB_TYPE.to_string(),
            unique: true,
            loner_ttl: J::LONER_TTL,
            loner_lock_after_execution_period: J::LOCK_AFTER_EXECUTION_PERIOD,
        }
    }
}

/// Registry of known job types, indexed by type identifier.
#[derive(Debug, Default, Clone)]
pub struct JobTypeRegistry {
    types: HashMap<String, JobTypeConfig>,
}

impl JobTypeRegistry {
    /// Create an empty registry. Every lookup fails, so only `uniq`-flagged
    /// payloads are unique.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a [`UniqueJob`] type. Re-registering replaces the settings.
    pub fn register<J: UniqueJob>(&mut self) -> &mut Self {
        self.insert(JobTypeConfig::of::<J>())
    }

    /// Insert explicit settings for a type identifier.
    pub fn insert(&mut self, config: JobTypeConfig) -> &mut Self {
        self.types.insert(config.name.clone(), config);
        self
    }

    /// Load all `.toml` files from a directory and build the registry.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::empty();

        let entries = std::fs::read_dir(dir).map_err(|e| {
            Error::Config(format!("cannot read job type dir {}: {e}", dir.display()))
        })?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                let content = std::fs::read_to_string(&path)?;
                let file: JobTypeFile = toml::from_str(&content).map_err(|e| {
                    Error::Config(format!("bad job type config {}: {e}", path.display()))
                })?;
                registry.insert(file.job);
            }
        }

        tracing::debug!(dir = %dir.display(), types = registry.len(), "loaded job types");
        Ok(registry)
    }

    /// Resolve a type identifier to its settings.
    pub fn resolve(&self, job_type: &str) -> Result<&JobTypeConfig> {
        self.types
            .get(job_type)
            .ok_or_else(|| Error::UnresolvableType(job_type.to_string()))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
