use std::io::Write;
use std::sync::Arc;

use synthscene::{
    InMemoryScene, ModuleRegistry, ObjectType, Pipeline, ProviderRegistry, Resolver, Scene,
    SceneObject, Value,
};

fn studio() -> Arc<InMemoryScene> {
    let scene = InMemoryScene::new();
    scene
        .insert(SceneObject::new("Camera", ObjectType::Camera).with_attribute("fov", 0.69))
        .unwrap();
    for i in 0..3 {
        scene
            .insert(
                SceneObject::new(format!("Chair.{i:03}"), ObjectType::Mesh)
                    .with_location([f64::from(i), 0.0, 0.0]),
            )
            .unwrap();
    }
    Arc::new(scene)
}

#[test]
fn camera_poses_and_manipulation_from_pipeline_file() {
    let dir = tempfile::tempdir().unwrap();
    let poses = dir.path().join("poses.txt");
    let mut file = std::fs::File::create(&poses).unwrap();
    writeln!(file, "0 -5 2 1.2 0 0").unwrap();
    writeln!(file, "5 0 2 1.2 0 1.57").unwrap();

    let pipeline_path = dir.path().join("pipeline.json");
    std::fs::write(
        &pipeline_path,
        r#"{
            "global": {"default_cam_param": {"fov": 1}},
            "modules": [
                {
                    "module": "camera.CameraLoader",
                    "config": {"path": "<args:0>", "file_format": "location rotation/value"}
                },
                {
                    "module": "manipulators.EntityManipulator",
                    "config": {
                        "selector": {
                            "provider": "getter.Entity",
                            "conditions": {"name": "Chair.*", "cf_inside": {"x_max": 1.5}}
                        },
                        "cp_physics": true,
                        "cf_add_modifier": {"name": "Solidify", "thickness": 0.01}
                    }
                }
            ]
        }"#,
    )
    .unwrap();

    let scene = studio();
    let resolver = Resolver::new(scene.clone(), Arc::new(ProviderRegistry::with_defaults()));
    let pipeline = Pipeline::from_file(
        &pipeline_path,
        &[poses.display().to_string()],
        &resolver,
        &ModuleRegistry::with_defaults(),
    )
    .unwrap();
    assert_eq!(pipeline.len(), 2);
    pipeline.run().unwrap();

    let keyframes = scene.keyframes().unwrap();
    assert_eq!(keyframes.len(), 2);
    assert_eq!(keyframes[1].values["location"], Value::Vector(vec![5.0, 0.0, 2.0]));
    assert_eq!(keyframes[1].values["fov"], Value::Float(1.0));

    let tagged = ["Chair.000", "Chair.001", "Chair.002"]
        .iter()
        .map(|name| {
            let id = scene.find_by_name(name).unwrap().unwrap();
            scene.custom_property(id, "physics").unwrap().is_some()
        })
        .collect::<Vec<_>>();
    assert_eq!(tagged, vec![true, true, false]);
}

#[test]
fn failing_module_aborts_pipeline() {
    let scene = studio();
    let resolver = Resolver::new(scene.clone(), Arc::new(ProviderRegistry::with_defaults()));
    let pipeline = Pipeline::from_json_str(
        r#"{"modules": [
            {"module": "manipulators.EntityManipulator", "config": {
                "selector": {"provider": "getter.Entity", "conditions": {"name": "Sofa"}},
                "cp_physics": true
            }},
            {"module": "manipulators.EntityManipulator", "config": {
                "selector": {"provider": "getter.Entity", "conditions": {"type": "MESH"}},
                "cp_reached": true
            }}
        ]}"#,
        "inline",
        &[],
        &resolver,
        &ModuleRegistry::with_defaults(),
    )
    .unwrap();

    let err = pipeline.run().unwrap_err();
    assert!(err.is_no_match());
    let chair = scene.find_by_name("Chair.000").unwrap().unwrap();
    assert!(scene.custom_property(chair, "reached").unwrap().is_none());
}

#[test]
fn missing_placeholder_argument_is_reported() {
    let scene = studio();
    let resolver = Resolver::new(scene, Arc::new(ProviderRegistry::with_defaults()));
    let err = Pipeline::from_json_str(
        r#"{"modules": [{"module": "camera.CameraLoader", "config": {"path": "<args:1>"}}]}"#,
        "inline",
        &["only-one".to_string()],
        &resolver,
        &ModuleRegistry::with_defaults(),
    )
    .unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("<args:1>"));
}
