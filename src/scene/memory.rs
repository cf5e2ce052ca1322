//! In-memory scene backend.
//!
//! A thread-safe stand-in for the host application. It is intended for
//! embedded usage, tests, and the command-line runner, and serves as the
//! reference implementation of [`Scene`].

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, Modifier, SceneObject};
use crate::scene::traits::{Scene, SceneError};
use crate::value::Value;

fn lock_err(context: &'static str) -> SceneError {
    SceneError::Backend(format!("poisoned lock: {context}"))
}

/// Attribute snapshot of one entity at one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Frame index, starting at 0.
    pub frame: u32,
    /// Keyed entity.
    pub entity: EntityId,
    /// Attribute values captured at this frame.
    pub values: BTreeMap<String, Value>,
}

/// Serialized form of a whole scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Objects in scene order.
    pub objects: Vec<SceneObject>,

    /// Recorded keyframes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Default)]
struct SceneState {
    order: Vec<EntityId>,
    objects: HashMap<EntityId, SceneObject>,
    keyframes: Vec<Keyframe>,
    frame_end: u32,
}

impl SceneState {
    fn object(&self, id: EntityId) -> Result<&SceneObject, SceneError> {
        self.objects.get(&id).ok_or(SceneError::EntityNotFound(id))
    }

    fn object_mut(&mut self, id: EntityId) -> Result<&mut SceneObject, SceneError> {
        self.objects.get_mut(&id).ok_or(SceneError::EntityNotFound(id))
    }
}

/// In-memory [`Scene`] keeping objects in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryScene {
    state: RwLock<SceneState>,
}

impl InMemoryScene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a scene from a document, keeping object order.
    ///
    /// # Errors
    /// `Backend` if two objects share an ID.
    pub fn from_document(document: SceneDocument) -> Result<Self, SceneError> {
        let scene = Self::new();
        for object in document.objects {
            scene.insert(object)?;
        }
        {
            let mut state = scene.state.write().map_err(|_| lock_err("scene"))?;
            state.frame_end = document
                .keyframes
                .iter()
                .map(|k| k.frame + 1)
                .max()
                .unwrap_or(0);
            state.keyframes = document.keyframes;
        }
        Ok(scene)
    }

    /// Snapshots the scene as a document.
    pub fn to_document(&self) -> Result<SceneDocument, SceneError> {
        let state = self.state.read().map_err(|_| lock_err("scene"))?;
        Ok(SceneDocument {
            objects: state
                .order
                .iter()
                .filter_map(|id| state.objects.get(id).cloned())
                .collect(),
            keyframes: state.keyframes.clone(),
        })
    }

    /// Adds an object and returns its handle.
    ///
    /// # Errors
    /// `Backend` if the object's ID is already present.
    pub fn insert(&self, object: SceneObject) -> Result<EntityId, SceneError> {
        let mut state = self.state.write().map_err(|_| lock_err("scene"))?;
        let id = object.id;
        if state.objects.contains_key(&id) {
            return Err(SceneError::Backend(format!("duplicate entity id: {id}")));
        }
        state.order.push(id);
        state.objects.insert(id, object);
        Ok(id)
    }

    /// Returns a copy of the object behind `id`.
    pub fn get(&self, id: EntityId) -> Result<Option<SceneObject>, SceneError> {
        let state = self.state.read().map_err(|_| lock_err("scene"))?;
        Ok(state.objects.get(&id).cloned())
    }

    /// Returns all recorded keyframes in insertion order.
    pub fn keyframes(&self) -> Result<Vec<Keyframe>, SceneError> {
        let state = self.state.read().map_err(|_| lock_err("scene"))?;
        Ok(state.keyframes.clone())
    }

    /// Number of objects.
    pub fn len(&self) -> Result<usize, SceneError> {
        let state = self.state.read().map_err(|_| lock_err("scene"))?;
        Ok(state.order.len())
    }

    /// Returns true if the scene holds no objects.
    pub fn is_empty(&self) -> Result<bool, SceneError> {
        Ok(self.len()? == 0)
    }
}

impl Scene for InMemoryScene {
    fn entities(&self) -> Result<Vec<EntityId>, SceneError> {
        let state = self.state.read().map_err(|_| lock_err("scene"))?;
        Ok(state.order.clone())
    }

    fn get_attribute(&self, id: EntityId, name: &str) -> Result<Option<Value>, SceneError> {
        let state = self.state.read().map_err(|_| lock_err("scene"))?;
        Ok(state.object(id)?.attribute(name))
    }

    fn set_attribute(&self, id: EntityId, name: &str, value: Value) -> Result<(), SceneError> {
        let mut state = self.state.write().map_err(|_| lock_err("scene"))?;
        state.object_mut(id)?.set_attribute(name, value)
    }

    fn custom_property(&self, id: EntityId, key: &str) -> Result<Option<Value>, SceneError> {
        let state = self.state.read().map_err(|_| lock_err("scene"))?;
        Ok(state.object(id)?.custom_properties.get(key).cloned())
    }

    fn set_custom_property(&self, id: EntityId, key: &str, value: Value) -> Result<(), SceneError> {
        let mut state = self.state.write().map_err(|_| lock_err("scene"))?;
        state
            .object_mut(id)?
            .custom_properties
            .insert(key.to_string(), value);
        Ok(())
    }

    fn location(&self, id: EntityId) -> Result<[f64; 3], SceneError> {
        let state = self.state.read().map_err(|_| lock_err("scene"))?;
        Ok(state.object(id)?.location)
    }

    fn add_modifier(&self, id: EntityId, modifier: Modifier) -> Result<(), SceneError> {
        let mut state = self.state.write().map_err(|_| lock_err("scene"))?;
        state.object_mut(id)?.modifiers.push(modifier);
        Ok(())
    }

    fn insert_keyframe(&self, id: EntityId, attributes: &[&str]) -> Result<u32, SceneError> {
        let mut state = self.state.write().map_err(|_| lock_err("scene"))?;
        let object = state.object(id)?;
        let mut values = BTreeMap::new();
        for &name in attributes {
            let value = object.attribute(name).ok_or_else(|| SceneError::AttributeNotFound {
                object: object.name.clone(),
                attribute: name.to_string(),
            })?;
            values.insert(name.to_string(), value);
        }
        let frame = state.frame_end;
        state.keyframes.push(Keyframe {
            frame,
            entity: id,
            values,
        });
        state.frame_end = frame + 1;
        Ok(frame)
    }

    fn has_attribute(&self, id: EntityId, name: &str) -> Result<bool, SceneError> {
        let state = self.state.read().map_err(|_| lock_err("scene"))?;
        Ok(state.object(id)?.has_attribute(name))
    }
}
