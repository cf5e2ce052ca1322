//! Pipeline modules.
//!
//! A module is one step of a pipeline. It is bound to its [`Config`] when
//! constructed and does all its work in [`Module::run`], reading values
//! through the config (which resolves providers as they are reached) and
//! mutating the scene through the [`crate::scene::Scene`] handle.

mod camera_loader;
mod entity_manipulator;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::error::{ConfigError, SynthResult};
use crate::selector::{CUSTOM_FUNCTION_PREFIX, CUSTOM_PROPERTY_PREFIX};

pub use camera_loader::CameraLoader;
pub use entity_manipulator::EntityManipulator;

/// One pipeline step.
pub trait Module {
    /// Registry name of the module, for logs.
    fn name(&self) -> &str;

    /// Executes the step.
    ///
    /// # Errors
    /// Any error aborts the step and the pipeline.
    fn run(&self) -> SynthResult<()>;
}

/// Builds a module from its configuration.
pub type ModuleConstructor = fn(Config) -> SynthResult<Box<dyn Module>>;

/// How provider-valued settings are shared across target entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Resolve once per entity; each entity gets its own draw.
    #[default]
    OnceForEach,
    /// Resolve once and apply the same value to every entity.
    OnceForAll,
}

impl ResolutionMode {
    /// The configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnceForEach => "once_for_each",
            Self::OnceForAll => "once_for_all",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once_for_each" => Ok(Self::OnceForEach),
            "once_for_all" => Ok(Self::OnceForAll),
            other => Err(ConfigError::conversion(
                "mode",
                "one of once_for_each, once_for_all",
                other,
            )),
        }
    }
}

/// What a settable key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey<'a> {
    /// Built-in attribute, assigned directly.
    Attribute(&'a str),
    /// `cp_` custom property, created if absent.
    CustomProperty(&'a str),
    /// `cf_` custom function, dispatched by the module.
    CustomFunction(&'a str),
}

impl<'a> SettingKey<'a> {
    /// Classifies `key` by its prefix; the returned name has it stripped.
    #[must_use]
    pub fn parse(key: &'a str) -> Self {
        if let Some(name) = key.strip_prefix(CUSTOM_PROPERTY_PREFIX) {
            Self::CustomProperty(name)
        } else if let Some(name) = key.strip_prefix(CUSTOM_FUNCTION_PREFIX) {
            Self::CustomFunction(name)
        } else {
            Self::Attribute(key)
        }
    }
}

fn build_entity_manipulator(config: Config) -> SynthResult<Box<dyn Module>> {
    Ok(Box::new(EntityManipulator::new(config)))
}

fn build_camera_loader(config: Config) -> SynthResult<Box<dyn Module>> {
    Ok(Box::new(CameraLoader::new(config)))
}

/// Name → module constructor mapping.
#[derive(Debug, Default, Clone)]
pub struct ModuleRegistry {
    constructors: HashMap<String, ModuleConstructor>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in modules.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("manipulators.EntityManipulator", build_entity_manipulator);
        registry.register("camera.CameraLoader", build_camera_loader);
        registry
    }

    /// Registers a constructor under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, constructor: ModuleConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Instantiates the module registered under `name`.
    ///
    /// # Errors
    /// `UnknownModule` if nothing is registered under `name`, or whatever
    /// the constructor reports.
    pub fn create(&self, name: &str, config: Config) -> SynthResult<Box<dyn Module>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ConfigError::UnknownModule {
                name: name.to_string(),
            })?;
        constructor(config)
    }
}
