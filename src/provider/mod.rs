//! Value providers and the registry that names them.
//!
//! A provider turns its own configuration node into a [`Value`]. Samplers
//! draw random values, getters read the live scene or echo configuration.
//! Providers are looked up by the string under the reserved `provider`
//! key, so new variants only need registering; the resolution engine never
//! changes.

mod getter;
mod sampler;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{ConfigError, SynthResult};
use crate::selector::EntityGetter;
use crate::value::Value;

pub use getter::{AttributeGetter, AttributeMerger, ContentGetter};
pub use sampler::{
    random_quaternion, ColorSampler, DiskSampler, PathSampler, Uniform3d, UniformSO3,
    ValueSampler,
};

/// A unit of computation producing a value from a configuration.
///
/// `run` is invoked on every resolution; implementations must not assume
/// they run once per pipeline.
pub trait Provider: Send + Sync {
    /// Computes the value for one resolution of a declaration.
    fn run(&self, config: &Config) -> SynthResult<Value>;
}

/// Name → provider mapping.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in provider.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("sampler.Uniform3d", Uniform3d);
        registry.register("sampler.UniformSO3", UniformSO3);
        registry.register("sampler.Path", PathSampler);
        registry.register("sampler.Value", ValueSampler);
        registry.register("sampler.Color", ColorSampler);
        registry.register("sampler.Disk", DiskSampler);
        registry.register("getter.Entity", EntityGetter);
        registry.register("getter.Content", ContentGetter);
        registry.register("getter.Attribute", AttributeGetter);
        registry.register("getter.AttributeMerger", AttributeMerger);
        registry
    }

    /// Registers `provider` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, provider: impl Provider + 'static) {
        self.providers.insert(name.into(), Arc::new(provider));
    }

    /// Looks up a provider.
    ///
    /// # Errors
    /// `UnknownProvider` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, ConfigError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProvider {
                name: name.to_string(),
            })
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names, unordered.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}
