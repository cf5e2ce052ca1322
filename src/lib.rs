//! # synthscene - Declarative Scene Randomization
//!
//! synthscene resolves declarative pipeline configuration against a live
//! scene. Configuration values may be provider declarations that sample
//! random values or select scene entities; they are resolved lazily, each
//! time a module reads them.
//!
//! ## Core Concepts
//!
//! - **Config**: Typed, fail-fast access to one configuration node
//! - **Provider**: A named computation turning its own config into a value
//! - **getter.Entity**: OR-of-ANDs predicate selection over scene entities
//! - **Module**: One pipeline step, bound to its config
//! - **ItemCollection**: Repeated items from inline mappings or text files
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use synthscene::{
//!     Config, EntityManipulator, InMemoryScene, Module, ObjectType, ProviderRegistry, Resolver,
//!     Scene, SceneObject,
//! };
//!
//! let scene = Arc::new(InMemoryScene::new());
//! let cube = scene.insert(SceneObject::new("Cube", ObjectType::Mesh)).unwrap();
//! let resolver = Resolver::new(scene.clone(), Arc::new(ProviderRegistry::with_defaults()));
//!
//! let config = Config::from_json(json!({
//!     "selector": {"provider": "getter.Entity", "conditions": {"name": "Cu.*", "type": "MESH"}},
//!     "location": {"provider": "sampler.Uniform3d", "min": [0, 0, 1], "max": [0, 0, 1]},
//!     "cp_physics": true
//! }), resolver).unwrap();
//!
//! EntityManipulator::new(config).run().unwrap();
//! assert_eq!(scene.location(cube).unwrap(), [0.0, 0.0, 1.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod entity;
pub mod error;
pub mod value;

// Scene, configuration, and resolution
pub mod config;
pub mod provider;
pub mod rotation;
pub mod scene;
pub mod selector;

// Execution
pub mod item_collection;
pub mod module;
pub mod pipeline;

// Re-export primary types at crate root for convenience
pub use config::{merge_nodes, Config, ConfigNode, Resolver, PROVIDER_KEY};
pub use entity::{EntityId, Modifier, ObjectType, SceneObject};
pub use error::{ConfigError, ExecutionError, SelectionError, SynthError, SynthResult};
pub use item_collection::ItemCollection;
pub use module::{CameraLoader, EntityManipulator, Module, ModuleRegistry, ResolutionMode};
pub use pipeline::Pipeline;
pub use provider::{Provider, ProviderRegistry};
pub use scene::{InMemoryScene, Keyframe, Scene, SceneDocument, SceneError};
pub use selector::{select_entities, EntityGetter, PredicateList};
pub use value::{Value, ValueMap};
