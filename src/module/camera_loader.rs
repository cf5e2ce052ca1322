//! `camera.CameraLoader`: keyframes camera poses from config or a file.
//!
//! Each pose sets the camera's `location` and `rotation_euler` and becomes
//! the next keyframe. Poses come from `cam_poses` first, then from the file
//! at `path`, whose lines follow `file_format`:
//!
//! Rotations are Euler angles by default; `rotation/format` may instead be
//! `forward_vec` or `look_at`. A pose without `fov` keeps the camera's
//! current angle.
//!
//! ```json
//! {
//!   "module": "camera.CameraLoader",
//!   "config": {
//!     "path": "<args:0>",
//!     "file_format": "location rotation/value",
//!     "default_cam_param": {"fov": 1}
//!   }
//! }
//! ```

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::{Config, ConfigNode};
use crate::entity::EntityId;
use crate::error::{ConfigError, SelectionError, SynthResult};
use crate::item_collection::ItemCollection;
use crate::module::Module;
use crate::rotation::{euler_to_matrix, look_along, matrix_to_euler, mul};
use crate::scene::Scene;
use crate::value::Value;

const DEFAULT_CAMERA: &str = "Camera";
/// Used when the camera's stored fov is not numeric.
const DEFAULT_FOV: f64 = 0.691_111;

/// Axis permutation and sign taking a point from a source frame into the
/// scene frame.
type SourceFrame = [(usize, f64); 3];

const IDENTITY_FRAME: SourceFrame = [(0, 1.0), (1, 1.0), (2, 1.0)];

fn parse_source_frame(axes: &[Value]) -> SynthResult<SourceFrame> {
    let invalid = || {
        ConfigError::conversion(
            "source_frame",
            "three of X, Y, Z, -X, -Y, -Z",
            Value::List(axes.to_vec()),
        )
    };
    if axes.len() != 3 {
        return Err(invalid().into());
    }
    let mut frame = IDENTITY_FRAME;
    for (slot, axis) in frame.iter_mut().zip(axes) {
        *slot = match axis.as_str().ok_or_else(invalid)? {
            "X" => (0, 1.0),
            "Y" => (1, 1.0),
            "Z" => (2, 1.0),
            "-X" => (0, -1.0),
            "-Y" => (1, -1.0),
            "-Z" => (2, -1.0),
            _ => return Err(invalid().into()),
        };
    }
    Ok(frame)
}

fn to_scene_frame(point: [f64; 3], frame: SourceFrame) -> [f64; 3] {
    frame.map(|(axis, sign)| sign * point[axis])
}

/// Loads camera poses into the scene camera.
#[derive(Debug)]
pub struct CameraLoader {
    config: Config,
}

impl CameraLoader {
    /// Binds the module to its configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    fn arities() -> HashMap<String, usize> {
        HashMap::from([("location".to_string(), 3), ("rotation/value".to_string(), 3)])
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Euler rotation of one pose, in the scene frame.
///
/// `euler` takes the value as angles. `forward_vec` looks along the value,
/// `look_at` looks from `location` toward it; both then roll by
/// `rotation/inplane_rot` around the view axis.
fn pose_rotation(pose: &Config, location: [f64; 3], frame: SourceFrame) -> SynthResult<[f64; 3]> {
    let format = pose.get_string_or("rotation/format", "euler")?;
    let value = to_scene_frame(pose.get_vector3d_or("rotation/value", [0.0; 3])?, frame);

    let forward = match format.as_str() {
        "euler" => return Ok(value),
        "forward_vec" => value,
        "look_at" => sub(value, location),
        other => {
            return Err(ConfigError::conversion(
                "rotation/format",
                "one of euler, forward_vec, look_at",
                other,
            )
            .into())
        }
    };
    let view = look_along(forward).ok_or_else(|| {
        ConfigError::conversion("rotation/value", "a non-degenerate view direction", format!("{forward:?}"))
    })?;
    let inplane = pose.get_float_or("rotation/inplane_rot", 0.0)?;
    Ok(matrix_to_euler(&mul(&view, &euler_to_matrix([0.0, 0.0, inplane]))))
}

fn add_cam_pose(
    scene: &dyn Scene,
    camera: EntityId,
    frame: SourceFrame,
    pose: &Config,
) -> SynthResult<u32> {
    let mut keyed = vec!["location", "rotation_euler"];

    // A pose without `fov` keeps the camera's current angle.
    if let Some(current) = scene.get_attribute(camera, "fov")? {
        let fov = if pose.data().contains_key("fov") {
            let fov = pose.get_float("fov")?;
            if pose.get_bool_or("fov_is_half", false)? {
                fov * 2.0
            } else {
                fov
            }
        } else {
            current.as_float().unwrap_or(DEFAULT_FOV)
        };
        scene.set_attribute(camera, "fov", Value::Float(fov))?;
        keyed.push("fov");
    }

    let location = to_scene_frame(pose.get_vector3d_or("location", [0.0; 3])?, frame);
    let rotation = pose_rotation(pose, location, frame)?;

    scene.set_attribute(camera, "location", Value::Vector(location.to_vec()))?;
    scene.set_attribute(camera, "rotation_euler", Value::Euler(rotation))?;
    let frame_id = scene.insert_keyframe(camera, &keyed)?;
    debug!(frame = frame_id, ?location, ?rotation, "Added camera pose");
    Ok(frame_id)
}

impl Module for CameraLoader {
    fn name(&self) -> &str {
        "camera.CameraLoader"
    }

    fn run(&self) -> SynthResult<()> {
        let camera_name = self.config.get_string_or("camera", DEFAULT_CAMERA)?;
        let scene = self.config.scene().clone();
        let camera = scene
            .find_by_name(&camera_name)?
            .ok_or_else(|| SelectionError::NoMatch {
                what: format!("no camera named '{camera_name}'"),
            })?;

        let frame = match self.config.get_list_or("source_frame", Vec::new())? {
            axes if axes.is_empty() => IDENTITY_FRAME,
            axes => parse_source_frame(&axes)?,
        };
        let defaults = self.config.get_node_or("default_cam_param", ConfigNode::new())?;
        let poses = self.config.get_node_list_or("cam_poses", Vec::new())?;
        let path = self.config.get_string_or("path", "")?;
        let file_format = self.config.get_string_or("file_format", "")?;

        let mut collection = ItemCollection::new(self.config.resolver().clone(), defaults, |pose| {
            add_cam_pose(scene.as_ref(), camera, frame, &pose).map(|_| ())
        });
        let added = collection.add_items_from_dicts(&poses)?
            + collection.add_items_from_file(&path, &file_format, &Self::arities())?;

        info!(camera = %camera_name, poses = added, "Loaded camera poses");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;
    use std::io::Write;
    use std::sync::Arc;

    use serde_json::json;

    use crate::config::Resolver;
    use crate::entity::{ObjectType, SceneObject};
    use crate::provider::ProviderRegistry;
    use crate::scene::InMemoryScene;

    fn setup() -> (Arc<InMemoryScene>, Resolver, EntityId) {
        let scene = Arc::new(InMemoryScene::new());
        let camera = scene
            .insert(SceneObject::new("Camera", ObjectType::Camera).with_attribute("fov", 0.8))
            .unwrap();
        let resolver = Resolver::new(scene.clone(), Arc::new(ProviderRegistry::with_defaults()));
        (scene, resolver, camera)
    }

    fn loader(resolver: &Resolver, data: serde_json::Value) -> CameraLoader {
        CameraLoader::new(Config::from_json(data, resolver.clone()).unwrap())
    }

    #[test]
    fn test_poses_from_dicts() {
        let (scene, resolver, camera) = setup();
        loader(
            &resolver,
            json!({
                "default_cam_param": {"fov": 1.2},
                "cam_poses": [
                    {"location": [1, 0, 0], "rotation": {"value": [0.5, 0, 0]}},
                    {"location": [0, 2, 0], "fov": 0.4}
                ]
            }),
        )
        .run()
        .unwrap();

        let frames = scene.keyframes().unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|k| k.entity == camera));
        assert_eq!(frames[0].values["location"], Value::Vector(vec![1.0, 0.0, 0.0]));
        assert_eq!(frames[0].values["rotation_euler"], Value::Euler([0.5, 0.0, 0.0]));
        assert_eq!(frames[0].values["fov"], Value::Float(1.2));
        assert_eq!(frames[1].values["fov"], Value::Float(0.4));
        assert_eq!(scene.location(camera).unwrap(), [0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_poses_from_file_follow_dicts() {
        let (scene, resolver, _) = setup();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 2 3 0.1 0.2 0.3").unwrap();
        writeln!(file, "4 5 6 0 0 0").unwrap();

        loader(
            &resolver,
            json!({
                "cam_poses": [{"location": [9, 9, 9]}],
                "path": file.path().display().to_string(),
                "file_format": "location rotation/value"
            }),
        )
        .run()
        .unwrap();

        let frames = scene.keyframes().unwrap();
        let frame_ids = frames.iter().map(|k| k.frame).collect::<Vec<_>>();
        assert_eq!(frame_ids, vec![0, 1, 2]);
        assert_eq!(frames[0].values["location"], Value::Vector(vec![9.0, 9.0, 9.0]));
        assert_eq!(frames[1].values["rotation_euler"], Value::Euler([0.1, 0.2, 0.3]));
        assert_eq!(frames[2].values["location"], Value::Vector(vec![4.0, 5.0, 6.0]));
        assert!(frames.iter().all(|k| k.values["fov"] == Value::Float(0.8)));
    }

    #[test]
    fn test_pose_without_fov_keeps_camera_angle() {
        let (scene, resolver, camera) = setup();
        loader(
            &resolver,
            json!({"cam_poses": [{"location": [1, 2, 3]}, {"fov": 0.3, "fov_is_half": true}, {}]}),
        )
        .run()
        .unwrap();

        let fovs = scene
            .keyframes()
            .unwrap()
            .iter()
            .map(|k| k.values["fov"].clone())
            .collect::<Vec<_>>();
        assert_eq!(fovs, vec![Value::Float(0.8), Value::Float(0.6), Value::Float(0.6)]);
        assert_eq!(scene.get_attribute(camera, "fov").unwrap(), Some(Value::Float(0.6)));
    }

    fn stored_rotation(scene: &InMemoryScene, camera: EntityId) -> [f64; 3] {
        match scene.get_attribute(camera, "rotation_euler").unwrap() {
            Some(Value::Euler(e)) => e,
            other => panic!("expected euler rotation, got {other:?}"),
        }
    }

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_forward_vec_and_look_at_rotations() {
        let (scene, resolver, camera) = setup();
        loader(
            &resolver,
            json!({"cam_poses": [{"rotation": {"format": "forward_vec", "value": [0, 3, 0]}}]}),
        )
        .run()
        .unwrap();
        assert!(close(stored_rotation(&scene, camera), [FRAC_PI_2, 0.0, 0.0]));

        loader(
            &resolver,
            json!({"cam_poses": [{"location": [0, -5, 1], "rotation": {"format": "look_at", "value": [0, 0, 1]}}]}),
        )
        .run()
        .unwrap();
        assert!(close(stored_rotation(&scene, camera), [FRAC_PI_2, 0.0, 0.0]));
    }

    #[test]
    fn test_inplane_rotation_rolls_view() {
        let (scene, resolver, camera) = setup();
        loader(
            &resolver,
            json!({"cam_poses": [{"rotation": {
                "format": "forward_vec",
                "value": [0, 1, 0],
                "inplane_rot": FRAC_PI_2
            }}]}),
        )
        .run()
        .unwrap();
        let m = euler_to_matrix(stored_rotation(&scene, camera));
        assert!(close(crate::rotation::transform(&m, [0.0, 0.0, -1.0]), [0.0, 1.0, 0.0]));
        assert!(close(crate::rotation::transform(&m, [1.0, 0.0, 0.0]), [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_look_at_own_location_is_rejected() {
        let (_, resolver, _) = setup();
        let err = loader(
            &resolver,
            json!({"cam_poses": [{"location": [1, 1, 1], "rotation": {"format": "look_at", "value": [1, 1, 1]}}]}),
        )
        .run()
        .unwrap_err();
        assert!(err.is_type_conversion());
    }

    #[test]
    fn test_source_frame_transform() {
        let (scene, resolver, camera) = setup();
        loader(
            &resolver,
            json!({"source_frame": ["X", "-Z", "Y"], "cam_poses": [{"location": [1, 2, 3]}]}),
        )
        .run()
        .unwrap();
        assert_eq!(scene.location(camera).unwrap(), [1.0, -3.0, 2.0]);

        let err = loader(&resolver, json!({"source_frame": ["X", "W", "Y"]}))
            .run()
            .unwrap_err();
        assert!(err.is_type_conversion());
    }

    #[test]
    fn test_missing_camera() {
        let (_, resolver, _) = setup();
        let err = loader(&resolver, json!({"camera": "Camera.001", "cam_poses": [{}]}))
            .run()
            .unwrap_err();
        assert!(err.is_no_match());
        assert!(err.to_string().contains("Camera.001"));
    }

    #[test]
    fn test_unknown_rotation_format() {
        let (_, resolver, _) = setup();
        let err = loader(
            &resolver,
            json!({"cam_poses": [{"rotation": {"value": [0, 0, 1], "format": "quaternion"}}]}),
        )
        .run()
        .unwrap_err();
        assert!(err.is_type_conversion());
    }

    #[test]
    fn test_sampled_pose_parameters() {
        let (scene, resolver, camera) = setup();
        loader(
            &resolver,
            json!({"cam_poses": [{
                "location": {"provider": "sampler.Uniform3d", "min": [-1, -1, 2], "max": [1, 1, 2]},
                "rotation": {"value": {"provider": "sampler.UniformSO3"}}
            }]}),
        )
        .run()
        .unwrap();
        let location = scene.location(camera).unwrap();
        assert!((location[2] - 2.0).abs() < f64::EPSILON);
    }
}
