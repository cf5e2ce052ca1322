//! Host scene capability trait.
//!
//! This is the whole surface the engine needs from the host application:
//! enumerate entities, read and write attributes and custom properties,
//! read positions, and the two side-effecting operations the shipped
//! modules request. Predicate matching and value assignment are written
//! purely against it.

use thiserror::Error;

use crate::entity::{EntityId, Modifier};
use crate::value::Value;

/// Errors reported by a host implementation.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Entity handle is not (or no longer) in the scene.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Object does not carry the attribute.
    #[error("Object '{object}' has no attribute '{attribute}'")]
    AttributeNotFound {
        object: String,
        attribute: String,
    },

    /// Attribute cannot be written.
    #[error("Attribute '{attribute}' is read-only")]
    ReadOnly {
        attribute: String,
    },

    /// Value cannot take the attribute's type.
    #[error("Cannot assign {found} to '{attribute}' of type {expected}")]
    TypeMismatch {
        attribute: String,
        expected: String,
        found: String,
    },

    /// Backend error.
    #[error("Scene backend error: {0}")]
    Backend(String),
}

/// Query/mutate surface of the host object graph.
///
/// Methods take `&self`; implementations synchronize internally so a
/// configuration can hold a scene handle while a module mutates the same
/// scene between two resolutions.
pub trait Scene: Send + Sync {
    /// Lists all entities in a stable order.
    fn entities(&self) -> Result<Vec<EntityId>, SceneError>;

    /// Reads built-in attribute `name`. `Ok(None)` if the entity has none.
    fn get_attribute(&self, id: EntityId, name: &str) -> Result<Option<Value>, SceneError>;

    /// Writes built-in attribute `name`, coercing into its stored type.
    fn set_attribute(&self, id: EntityId, name: &str, value: Value) -> Result<(), SceneError>;

    /// Reads custom property `key`. `Ok(None)` if absent.
    fn custom_property(&self, id: EntityId, key: &str) -> Result<Option<Value>, SceneError>;

    /// Writes custom property `key`, creating it if absent.
    fn set_custom_property(&self, id: EntityId, key: &str, value: Value) -> Result<(), SceneError>;

    /// Current world position.
    fn location(&self, id: EntityId) -> Result<[f64; 3], SceneError>;

    /// Attaches a modifier to the entity.
    fn add_modifier(&self, id: EntityId, modifier: Modifier) -> Result<(), SceneError>;

    /// Records the listed attributes of `id` as a new keyframe and returns
    /// its frame number.
    fn insert_keyframe(&self, id: EntityId, attributes: &[&str]) -> Result<u32, SceneError>;

    /// Returns true if the entity carries built-in attribute `name`.
    fn has_attribute(&self, id: EntityId, name: &str) -> Result<bool, SceneError> {
        Ok(self.get_attribute(id, name)?.is_some())
    }

    /// Finds the first entity whose name equals `name` exactly.
    fn find_by_name(&self, name: &str) -> Result<Option<EntityId>, SceneError> {
        for id in self.entities()? {
            if let Some(Value::String(n)) = self.get_attribute(id, "name")? {
                if n == name {
                    return Ok(Some(id));
                }
            }
        }
        Ok(None)
    }
}
