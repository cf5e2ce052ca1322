//! Entity handles and the host object model.
//!
//! The engine only ever holds [`EntityId`] handles; the objects behind them
//! belong to the host. [`SceneObject`] is the shape the in-memory host uses
//! and the shape scene documents are written in.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scene::SceneError;
use crate::value::Value;

/// Stable handle of a live host entity.
///
/// # Examples
///
/// ```
/// use synthscene::EntityId;
///
/// let id = EntityId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Creates a nil entity ID (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Host object type tag, exposed to predicates as the `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Mesh,
    Camera,
    Light,
    Armature,
    Empty,
    Curve,
}

impl ObjectType {
    /// Returns the tag as the host spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mesh => "MESH",
            Self::Camera => "CAMERA",
            Self::Light => "LIGHT",
            Self::Armature => "ARMATURE",
            Self::Empty => "EMPTY",
            Self::Curve => "CURVE",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object modifiers the engine knows how to request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Modifier {
    /// Gives a surface thickness.
    Solidify {
        /// Shell thickness in scene units.
        thickness: f64,
    },
}

/// An object as stored by the in-memory host.
///
/// Built-in attributes are `name`, `type`, `location`, `rotation_euler`
/// and `scale`; `attributes` holds any further host attributes (e.g. a
/// camera's `fov`). Custom properties are the open-ended `cp_` namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    #[serde(default)]
    pub id: EntityId,

    pub name: String,

    #[serde(rename = "type")]
    pub object_type: ObjectType,

    #[serde(default)]
    pub location: [f64; 3],

    #[serde(default)]
    pub rotation_euler: [f64; 3],

    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_properties: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<Modifier>,
}

const fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

fn to_array3(value: &Value, template: &Value, attribute: &str) -> Result<[f64; 3], SceneError> {
    value
        .coerce_like(template)
        .and_then(|v| v.as_numbers())
        .and_then(|v| <[f64; 3]>::try_from(v).ok())
        .ok_or_else(|| SceneError::TypeMismatch {
            attribute: attribute.to_string(),
            expected: template.type_name().to_string(),
            found: value.to_string(),
        })
}

impl SceneObject {
    /// Creates an object at the origin with unit scale.
    ///
    /// # Examples
    ///
    /// ```
    /// use synthscene::{ObjectType, SceneObject};
    ///
    /// let cube = SceneObject::new("Cube", ObjectType::Mesh).with_location([0.0, 0.0, 1.0]);
    /// assert_eq!(cube.location, [0.0, 0.0, 1.0]);
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            object_type,
            location: [0.0; 3],
            rotation_euler: [0.0; 3],
            scale: unit_scale(),
            attributes: BTreeMap::new(),
            custom_properties: BTreeMap::new(),
            modifiers: Vec::new(),
        }
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: [f64; 3]) -> Self {
        self.location = location;
        self
    }

    /// Sets the XYZ Euler rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation_euler: [f64; 3]) -> Self {
        self.rotation_euler = rotation_euler;
        self
    }

    /// Adds a host attribute beyond the built-in ones.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Adds a custom property.
    #[must_use]
    pub fn with_custom_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_properties.insert(key.into(), value.into());
        self
    }

    /// Reads an attribute with its semantic type.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::String(self.name.clone())),
            "type" => Some(Value::String(self.object_type.to_string())),
            "location" => Some(Value::Vector(self.location.to_vec())),
            "rotation_euler" => Some(Value::Euler(self.rotation_euler)),
            "scale" => Some(Value::Vector(self.scale.to_vec())),
            other => self.attributes.get(other).cloned(),
        }
    }

    /// Returns true if the attribute exists.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        matches!(name, "name" | "type" | "location" | "rotation_euler" | "scale")
            || self.attributes.contains_key(name)
    }

    /// Writes an attribute, coercing the value into the stored type.
    ///
    /// # Errors
    /// - `ReadOnly` for `type`
    /// - `AttributeNotFound` for an attribute the object does not carry
    /// - `TypeMismatch` when the value cannot take the stored type
    pub fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), SceneError> {
        match name {
            "name" => match value {
                Value::String(s) => self.name = s,
                other => {
                    return Err(SceneError::TypeMismatch {
                        attribute: name.to_string(),
                        expected: "string".to_string(),
                        found: other.to_string(),
                    })
                }
            },
            "type" => {
                return Err(SceneError::ReadOnly {
                    attribute: name.to_string(),
                })
            }
            "location" => {
                self.location = to_array3(&value, &Value::Vector(vec![0.0; 3]), name)?;
            }
            "rotation_euler" => {
                self.rotation_euler = to_array3(&value, &Value::Euler([0.0; 3]), name)?;
            }
            "scale" => {
                self.scale = to_array3(&value, &Value::Vector(vec![0.0; 3]), name)?;
            }
            other => {
                let Some(current) = self.attributes.get_mut(other) else {
                    return Err(SceneError::AttributeNotFound {
                        object: self.name.clone(),
                        attribute: other.to_string(),
                    });
                };
                let coerced = value.coerce_like(current).ok_or_else(|| SceneError::TypeMismatch {
                    attribute: other.to_string(),
                    expected: current.type_name().to_string(),
                    found: value.to_string(),
                })?;
                *current = coerced;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_creation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
        assert!(!id1.is_nil());
        assert!(EntityId::nil().is_nil());
    }

    #[test]
    fn test_entity_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = EntityId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
    }

    #[test]
    fn test_object_type_display() {
        assert_eq!(format!("{}", ObjectType::Mesh), "MESH");
        assert_eq!(format!("{}", ObjectType::Light), "LIGHT");
    }

    #[test]
    fn test_builtin_attributes() {
        let obj = SceneObject::new("Cube", ObjectType::Mesh)
            .with_location([1.0, 2.0, 3.0])
            .with_rotation([0.0, 0.5, 0.0]);

        assert_eq!(obj.attribute("name"), Some(Value::from("Cube")));
        assert_eq!(obj.attribute("type"), Some(Value::from("MESH")));
        assert_eq!(obj.attribute("location"), Some(Value::Vector(vec![1.0, 2.0, 3.0])));
        assert_eq!(obj.attribute("rotation_euler"), Some(Value::Euler([0.0, 0.5, 0.0])));
        assert_eq!(obj.attribute("scale"), Some(Value::Vector(vec![1.0, 1.0, 1.0])));
        assert!(obj.attribute("fov").is_none());
        assert!(!obj.has_attribute("fov"));
    }

    #[test]
    fn test_set_location_from_literal_list() {
        let mut obj = SceneObject::new("Cube", ObjectType::Mesh);
        obj.set_attribute("location", Value::from_json(&serde_json::json!([1, 2, 3])))
            .unwrap();
        assert_eq!(obj.location, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_set_rotation_rejects_wrong_arity() {
        let mut obj = SceneObject::new("Cube", ObjectType::Mesh);
        let err = obj
            .set_attribute("rotation_euler", Value::from_json(&serde_json::json!([1, 2])))
            .unwrap_err();
        assert!(matches!(err, SceneError::TypeMismatch { .. }));
    }

    #[test]
    fn test_type_is_read_only() {
        let mut obj = SceneObject::new("Cube", ObjectType::Mesh);
        let err = obj.set_attribute("type", Value::from("LIGHT")).unwrap_err();
        assert!(matches!(err, SceneError::ReadOnly { .. }));
    }

    #[test]
    fn test_set_extra_attribute() {
        let mut obj = SceneObject::new("Camera", ObjectType::Camera).with_attribute("fov", 0.69);
        obj.set_attribute("fov", Value::Int(1)).unwrap();
        assert_eq!(obj.attribute("fov"), Some(Value::Float(1.0)));

        let err = obj.set_attribute("lens", Value::Float(35.0)).unwrap_err();
        assert!(matches!(err, SceneError::AttributeNotFound { .. }));
    }

    #[test]
    fn test_scene_object_deserializes_with_defaults() {
        let obj: SceneObject =
            serde_json::from_str(r#"{"name": "Lamp", "type": "LIGHT", "location": [0, 0, 5]}"#)
                .unwrap();
        assert_eq!(obj.object_type, ObjectType::Light);
        assert_eq!(obj.location, [0.0, 0.0, 5.0]);
        assert_eq!(obj.scale, [1.0, 1.0, 1.0]);
        assert!(!obj.id.is_nil());
    }
}
