use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use synthscene::{
    Config, EntityId, EntityManipulator, InMemoryScene, Module, ObjectType, Provider,
    ProviderRegistry, Resolver, Scene, SceneObject, SynthResult, Value,
};

/// Returns a fresh integer on every run and counts invocations.
struct CountingProvider(Arc<AtomicUsize>);

impl Provider for CountingProvider {
    fn run(&self, _config: &Config) -> SynthResult<Value> {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Int(i64::try_from(n).unwrap()))
    }
}

fn five_cubes() -> (Arc<InMemoryScene>, Vec<EntityId>) {
    let scene = InMemoryScene::new();
    let ids = (0..5)
        .map(|i| {
            scene
                .insert(SceneObject::new(format!("Cube.{i:03}"), ObjectType::Mesh))
                .unwrap()
        })
        .collect();
    (Arc::new(scene), ids)
}

fn run_manipulator(mode: &str) -> (Arc<InMemoryScene>, Vec<EntityId>, usize) {
    let (scene, ids) = five_cubes();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ProviderRegistry::with_defaults();
    registry.register("test.Counting", CountingProvider(calls.clone()));
    let resolver = Resolver::new(scene.clone(), Arc::new(registry));

    let config = Config::from_json(
        json!({
            "selector": {"provider": "getter.Entity", "conditions": {"name": "Cube.*"}},
            "mode": mode,
            "cp_draw": {"provider": "test.Counting"}
        }),
        resolver,
    )
    .unwrap();
    EntityManipulator::new(config).run().unwrap();
    (scene, ids, calls.load(Ordering::SeqCst))
}

fn draws(scene: &InMemoryScene, ids: &[EntityId]) -> Vec<Value> {
    ids.iter()
        .map(|id| scene.custom_property(*id, "draw").unwrap().unwrap())
        .collect()
}

#[test]
fn once_for_all_invokes_provider_once() {
    let (scene, ids, calls) = run_manipulator("once_for_all");
    assert_eq!(calls, 1);
    let values = draws(&scene, &ids);
    assert!(values.iter().all(|v| *v == values[0]));
}

#[test]
fn once_for_each_invokes_provider_per_entity() {
    let (scene, ids, calls) = run_manipulator("once_for_each");
    assert_eq!(calls, 5);
    let distinct = draws(&scene, &ids)
        .into_iter()
        .map(|v| v.as_int().unwrap())
        .collect::<HashSet<_>>();
    assert_eq!(distinct.len(), 5);
}

#[test]
fn uniform_samples_shared_or_independent() {
    let (scene, ids) = five_cubes();
    let resolver = Resolver::new(scene.clone(), Arc::new(ProviderRegistry::with_defaults()));
    let location = json!({"provider": "sampler.Uniform3d", "min": [-10, -10, -10], "max": [10, 10, 10]});
    let selector = json!({"provider": "getter.Entity", "conditions": {"type": "MESH"}});

    let config = Config::from_json(
        json!({"selector": selector, "mode": "once_for_all", "location": location}),
        resolver.clone(),
    )
    .unwrap();
    EntityManipulator::new(config).run().unwrap();
    let shared = scene.location(ids[0]).unwrap();
    for id in &ids {
        assert_eq!(scene.location(*id).unwrap(), shared);
        assert!(shared.iter().all(|c| (-10.0..=10.0).contains(c)));
    }

    let config = Config::from_json(
        json!({"selector": selector, "location": location}),
        resolver,
    )
    .unwrap();
    EntityManipulator::new(config).run().unwrap();
    let locations = ids
        .iter()
        .map(|id| scene.location(*id).unwrap())
        .collect::<Vec<_>>();
    assert!(locations.iter().any(|l| *l != locations[0]));
}

#[test]
fn later_selectors_see_earlier_mutations() {
    let (scene, ids) = five_cubes();
    let resolver = Resolver::new(scene.clone(), Arc::new(ProviderRegistry::with_defaults()));

    let tag = Config::from_json(
        json!({
            "selector": {"provider": "getter.Entity", "conditions": {"name": "Cube.00[01]"}},
            "cp_physics": true
        }),
        resolver.clone(),
    )
    .unwrap();
    EntityManipulator::new(tag).run().unwrap();

    let lift = Config::from_json(
        json!({
            "selector": {"provider": "getter.Entity", "conditions": {"cp_physics": true}},
            "location": [0, 0, 5]
        }),
        resolver,
    )
    .unwrap();
    EntityManipulator::new(lift).run().unwrap();

    assert_eq!(scene.location(ids[0]).unwrap(), [0.0, 0.0, 5.0]);
    assert_eq!(scene.location(ids[1]).unwrap(), [0.0, 0.0, 5.0]);
    assert_eq!(scene.location(ids[2]).unwrap(), [0.0, 0.0, 0.0]);
}
