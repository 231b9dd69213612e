//! Process-wide table of miner backends, keyed by type name.
//!
//! Registration happens on an owned [`MinerRegistry`] which is then installed
//! once; after that the table is read-only.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::{debug, info};

use crate::miner::{CpuMiner, MinerBackend};

static REGISTRY: OnceLock<MinerRegistry> = OnceLock::new();

/// Produces a fresh backend instance.
pub type BackendFactory = fn() -> Box<dyn MinerBackend>;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinerError {
    #[error("no miner backend registered as {0:?}")]
    BackendNotFound(String),

    #[error("miner backend {0:?} is already registered")]
    DuplicateBackend(&'static str),

    #[error("miner registry has not been installed")]
    RegistryNotInitialized,

    #[error("miner registry is already installed")]
    RegistryAlreadyInitialized,
}

/// Backend name to factory table.
#[derive(Debug, Clone, Default)]
pub struct MinerRegistry {
    factories: BTreeMap<&'static str, BackendFactory>,
}

impl MinerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every backend shipped with this crate.
    pub fn with_builtin_backends() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(CpuMiner::NAME, cpu_backend);
        registry
    }

    /// Associate `name` with `factory`. Each name can be registered once.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) -> Result<(), MinerError> {
        if self.factories.contains_key(name) {
            return Err(MinerError::DuplicateBackend(name));
        }
        self.factories.insert(name, factory);
        debug!(backend = name, "registered miner backend");
        Ok(())
    }

    /// Build a new instance of the backend registered as `name`.
    pub fn create_instance(&self, name: &str) -> Result<Box<dyn MinerBackend>, MinerError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| MinerError::BackendNotFound(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn types(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Make this the process-wide registry.
    pub fn install(self) -> Result<&'static MinerRegistry, MinerError> {
        let types = self.types();
        REGISTRY
            .set(self)
            .map_err(|_| MinerError::RegistryAlreadyInitialized)?;
        info!(?types, "installed miner registry");
        Self::global()
    }

    /// The installed process-wide registry.
    pub fn global() -> Result<&'static MinerRegistry, MinerError> {
        REGISTRY.get().ok_or(MinerError::RegistryNotInitialized)
    }
}

fn cpu_backend() -> Box<dyn MinerBackend> {
    Box::new(CpuMiner::new())
}
