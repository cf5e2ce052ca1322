//! Host scene interface and the in-memory backend.

mod memory;
mod traits;

pub use memory::{InMemoryScene, Keyframe, SceneDocument};
pub use traits::{Scene, SceneError};
