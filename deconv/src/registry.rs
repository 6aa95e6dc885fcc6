//! Algorithm registry
//!
//! Maps algorithm identifiers to factories producing stateless algorithm instances.
//! Registration order is preserved for listing. The process-wide default registry is
//! built on first use and is read-only afterwards.

use once_cell::sync::Lazy;

use crate::algorithms::{DeconvolutionAlgorithm, RichardsonLucy};
use crate::error::{DeconvError, Result};

/// Builds a fresh algorithm instance
pub type AlgorithmFactory = Box<dyn Fn() -> Box<dyn DeconvolutionAlgorithm> + Send + Sync>;

/// Identifier and description of a registered algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    pub id: String,
    pub description: &'static str,
}

/// Ordered, string-keyed collection of algorithm factories
#[derive(Default)]
pub struct AlgorithmRegistry {
    entries: Vec<(String, AlgorithmFactory)>,
}

impl AlgorithmRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in algorithm
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(RichardsonLucy::NAME, || Box::new(RichardsonLucy::new()));
        registry
    }

    /// Register a factory under `id`
    ///
    /// Registering an existing id replaces its factory but keeps its position.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn DeconvolutionAlgorithm> + Send + Sync + 'static,
    {
        let id = id.into();
        let factory: AlgorithmFactory = Box::new(factory);

        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((id, factory)),
        }
    }

    /// Instantiate the algorithm registered under `id`
    ///
    /// # Errors
    /// * [`DeconvError::UnknownAlgorithm`] listing the registered ids
    pub fn get(&self, id: &str) -> Result<Box<dyn DeconvolutionAlgorithm>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, factory)| factory())
            .ok_or_else(|| DeconvError::UnknownAlgorithm {
                id: id.to_string(),
                available: self.list().into_iter().map(String::from).collect(),
            })
    }

    /// Registered ids in registration order
    pub fn list(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == id)
    }

    /// Id and description of every registered algorithm, in registration order
    pub fn descriptors(&self) -> Vec<AlgorithmDescriptor> {
        self.entries
            .iter()
            .map(|(id, factory)| AlgorithmDescriptor {
                id: id.clone(),
                description: factory().description(),
            })
            .collect()
    }
}

impl std::fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("algorithms", &self.list())
            .finish()
    }
}

static DEFAULT_REGISTRY: Lazy<AlgorithmRegistry> = Lazy::new(AlgorithmRegistry::with_builtin);

/// The process-wide registry of built-in algorithms
pub fn default_registry() -> &'static AlgorithmRegistry {
    &DEFAULT_REGISTRY
}

/// Ids of the built-in algorithms, in registration order
pub fn list_algorithms() -> Vec<String> {
    DEFAULT_REGISTRY.list().into_iter().map(String::from).collect()
}

/// Instantiate a built-in algorithm by id
pub fn get_algorithm(id: &str) -> Result<Box<dyn DeconvolutionAlgorithm>> {
    DEFAULT_REGISTRY.get(id)
}
