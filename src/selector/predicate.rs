//! OR-of-ANDs predicates over scene entities.
//!
//! A [`PredicateList`] is parsed once from resolved configuration and then
//! evaluated against the live scene. Parsing compiles regular expressions
//! and validates bounding regions, so malformed predicates fail before any
//! entity is looked at.

use std::collections::HashSet;

use regex::Regex;

use crate::entity::EntityId;
use crate::error::{ConfigError, SelectionError, SynthResult};
use crate::scene::Scene;
use crate::value::Value;

/// Prefix marking a custom property key.
pub const CUSTOM_PROPERTY_PREFIX: &str = "cp_";

/// Prefix marking a custom function key.
pub const CUSTOM_FUNCTION_PREFIX: &str = "cf_";

const AXES: [char; 3] = ['x', 'y', 'z'];

/// A value to compare against, with its full-match pattern when textual.
///
/// String targets are regular expressions matched against the whole
/// attribute text; a literal equal string matches as well.
#[derive(Debug, Clone)]
pub struct Target {
    value: Value,
    pattern: Option<Regex>,
}

impl Target {
    fn new(key: &str, value: Value) -> SynthResult<Self> {
        let pattern = match &value {
            Value::String(s) => Some(Regex::new(&format!("^(?:{s})$")).map_err(|e| {
                SelectionError::InvalidPredicate {
                    reason: format!("'{key}' is not a valid pattern: {e}"),
                }
            })?),
            _ => None,
        };
        Ok(Self { value, pattern })
    }

    /// The target value as written.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    fn matches_text(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text)) || self.value.as_str() == Some(text)
    }
}

/// Bounding region of a spatial condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// Axis-aligned box; the position must lie strictly inside.
    Box {
        /// Lower corner.
        min: [f64; 3],
        /// Upper corner.
        max: [f64; 3],
    },
    /// Intersection of half-spaces, one optional bound per axis and side.
    /// Unlike the strict box test, a position on a bounding plane counts as
    /// inside; only positions beyond a bound are rejected.
    HalfSpaces {
        /// `x_min`, `y_min`, `z_min`.
        min: [Option<f64>; 3],
        /// `x_max`, `y_max`, `z_max`.
        max: [Option<f64>; 3],
    },
}

impl Region {
    /// Parses `{min, max}` or any subset of `{x,y,z}_{min,max}`.
    ///
    /// # Errors
    /// `InvalidPredicate` if the two forms are mixed, `TypeConversion` for
    /// malformed bounds.
    pub fn from_value(key: &str, value: &Value) -> SynthResult<Self> {
        let map = value
            .as_map()
            .ok_or_else(|| ConfigError::conversion(key, "mapping", value))?;

        let has_box_key = map.contains_key("min") || map.contains_key("max");
        let has_axis_key = AXES
            .iter()
            .any(|a| map.contains_key(&format!("{a}_min")) || map.contains_key(&format!("{a}_max")));

        if has_box_key {
            if has_axis_key || !(map.contains_key("min") && map.contains_key("max")) {
                return Err(SelectionError::InvalidPredicate {
                    reason: format!(
                        "'{key}' cannot mix the min/max vector syntax with the x_min/x_max/y_min/... syntax"
                    ),
                }
                .into());
            }
            return Ok(Self::Box {
                min: corner(key, "min", &map["min"])?,
                max: corner(key, "max", &map["max"])?,
            });
        }

        let mut min = [None; 3];
        let mut max = [None; 3];
        for (i, axis) in AXES.iter().enumerate() {
            min[i] = bound(key, map.get(&format!("{axis}_min")), &format!("{axis}_min"))?;
            max[i] = bound(key, map.get(&format!("{axis}_max")), &format!("{axis}_max"))?;
        }
        Ok(Self::HalfSpaces { min, max })
    }

    /// Returns true if `position` is inside the region.
    #[must_use]
    pub fn contains(&self, position: [f64; 3]) -> bool {
        match self {
            Self::Box { min, max } => (0..3).all(|i| min[i] < position[i] && position[i] < max[i]),
            Self::HalfSpaces { min, max } => (0..3).all(|i| {
                min[i].map_or(true, |m| position[i] >= m) && max[i].map_or(true, |m| position[i] <= m)
            }),
        }
    }
}

fn corner(key: &str, side: &str, value: &Value) -> SynthResult<[f64; 3]> {
    value
        .parse_numbers()
        .and_then(|v| <[f64; 3]>::try_from(v).ok())
        .ok_or_else(|| ConfigError::conversion(format!("{key}/{side}"), "3d vector", value).into())
}

fn bound(key: &str, value: Option<&Value>, name: &str) -> SynthResult<Option<f64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_float(),
    };
    parsed
        .map(Some)
        .ok_or_else(|| ConfigError::conversion(format!("{key}/{name}"), "float", value).into())
}

/// One key of an AND-group.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Built-in attribute equality.
    Attribute {
        /// Attribute name.
        name: String,
        /// Expected value.
        target: Target,
    },
    /// Custom property equality; the key is stored without its prefix.
    CustomProperty {
        /// Property key.
        key: String,
        /// Expected value.
        target: Target,
    },
    /// `cf_inside` or `cf_outside`.
    Spatial {
        /// True for `inside`.
        inside: bool,
        /// Region tested against the entity position.
        region: Region,
    },
    /// A `cf_` function the selector does not know. Never matches.
    Unsupported(String),
}

impl Condition {
    /// Parses one `key: target` pair.
    pub fn parse(key: &str, target: &Value) -> SynthResult<Self> {
        if let Some(property) = key.strip_prefix(CUSTOM_PROPERTY_PREFIX) {
            return Ok(Self::CustomProperty {
                key: property.to_string(),
                target: Target::new(key, target.clone())?,
            });
        }
        if let Some(function) = key.strip_prefix(CUSTOM_FUNCTION_PREFIX) {
            return Ok(match function {
                "inside" | "outside" => Self::Spatial {
                    inside: function == "inside",
                    region: Region::from_value(key, target)?,
                },
                other => Self::Unsupported(other.to_string()),
            });
        }
        Ok(Self::Attribute {
            name: key.to_string(),
            target: Target::new(key, target.clone())?,
        })
    }

    /// Evaluates the condition for one entity.
    ///
    /// # Errors
    /// `TypeMismatch` if the target cannot be compared with the stored
    /// value, and any scene error.
    pub fn matches(&self, scene: &dyn Scene, id: EntityId) -> SynthResult<bool> {
        match self {
            Self::Attribute { name, target } => match scene.get_attribute(id, name)? {
                Some(stored) => attribute_matches(name, &stored, target),
                None => Ok(false),
            },
            Self::CustomProperty { key, target } => match scene.custom_property(id, key)? {
                Some(stored) => property_matches(key, &stored, target),
                None => Ok(false),
            },
            Self::Spatial { inside, region } => {
                Ok(region.contains(scene.location(id)?) == *inside)
            }
            Self::Unsupported(_) => Ok(false),
        }
    }
}

fn mismatch(key: &str, stored: &Value, target: &Value) -> SelectionError {
    SelectionError::TypeMismatch {
        key: key.to_string(),
        expected: stored.type_name().to_string(),
        found: target.type_name().to_string(),
    }
}

/// Bools compare as 0/1 against ints in either direction.
fn is_bool_int_pair(a: &Value, b: &Value) -> bool {
    matches!((a, b), (Value::Int(_), Value::Bool(_)) | (Value::Bool(_), Value::Int(_)))
}

fn attribute_matches(name: &str, stored: &Value, target: &Target) -> SynthResult<bool> {
    if let Value::String(text) = stored {
        return match target.value() {
            Value::String(_) => Ok(target.matches_text(text)),
            other => Err(mismatch(name, stored, other).into()),
        };
    }
    if stored.same_kind(target.value()) {
        return Ok(stored.loosely_equals(target.value()));
    }
    if (stored.is_number() && target.value().is_number())
        || is_bool_int_pair(stored, target.value())
    {
        return Ok(stored.loosely_equals(target.value()));
    }
    match target.value().coerce_like(stored) {
        Some(coerced) if matches!(stored, Value::Vector(_) | Value::Euler(_) | Value::Color(_)) => {
            Ok(stored.loosely_equals(&coerced))
        }
        _ => Err(mismatch(name, stored, target.value()).into()),
    }
}

fn property_matches(key: &str, stored: &Value, target: &Target) -> SynthResult<bool> {
    let comparable = stored.same_kind(target.value())
        || (stored.is_number() && target.value().is_number())
        || is_bool_int_pair(stored, target.value());
    if !comparable {
        return Err(mismatch(key, stored, target.value()).into());
    }
    match stored {
        Value::String(text) => Ok(target.matches_text(text)),
        _ => Ok(stored.loosely_equals(target.value())),
    }
}

/// Conjunction of conditions.
#[derive(Debug, Clone, Default)]
pub struct AndGroup {
    conditions: Vec<Condition>,
}

impl AndGroup {
    /// Parses a mapping of conditions, keeping their declaration order.
    pub fn from_value(value: &Value) -> SynthResult<Self> {
        let map = value
            .as_map()
            .ok_or_else(|| ConfigError::conversion("conditions", "mapping", value))?;
        let conditions = map
            .iter()
            .map(|(key, target)| Condition::parse(key, target))
            .collect::<SynthResult<Vec<_>>>()?;
        Ok(Self { conditions })
    }

    /// The parsed conditions.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns true if every condition holds. Stops at the first failure.
    pub fn matches(&self, scene: &dyn Scene, id: EntityId) -> SynthResult<bool> {
        for condition in &self.conditions {
            if !condition.matches(scene, id)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Disjunction of AND-groups with first-match-wins deduplication.
#[derive(Debug, Clone, Default)]
pub struct PredicateList {
    groups: Vec<AndGroup>,
}

impl PredicateList {
    /// Parses a single AND-group mapping or a list of them.
    ///
    /// # Errors
    /// `TypeConversion` if the value is neither, `InvalidPredicate` for
    /// malformed conditions.
    pub fn from_value(value: &Value) -> SynthResult<Self> {
        let groups = match value {
            Value::Map(_) => vec![AndGroup::from_value(value)?],
            Value::List(items) => items
                .iter()
                .map(AndGroup::from_value)
                .collect::<SynthResult<Vec<_>>>()?,
            other => {
                return Err(
                    ConfigError::conversion("conditions", "mapping or list of mappings", other).into(),
                )
            }
        };
        Ok(Self { groups })
    }

    /// The parsed groups in evaluation order.
    #[must_use]
    pub fn groups(&self) -> &[AndGroup] {
        &self.groups
    }

    /// Selects matching entities in scene order, group by group.
    ///
    /// An entity accepted by an earlier group is not evaluated again, so it
    /// appears once, at the position its first matching group gave it.
    pub fn select(&self, scene: &dyn Scene) -> SynthResult<Vec<EntityId>> {
        let entities = scene.entities()?;
        let mut selected = Vec::new();
        let mut taken = HashSet::new();

        for group in &self.groups {
            let mut accepted = Vec::new();
            for &id in &entities {
                if taken.contains(&id) {
                    continue;
                }
                if group.matches(scene, id)? {
                    accepted.push(id);
                }
            }
            for id in accepted {
                taken.insert(id);
                selected.push(id);
            }
        }
        Ok(selected)
    }
}

/// Parses `conditions` and selects against `scene`.
pub fn select_entities(scene: &dyn Scene, conditions: &Value) -> SynthResult<Vec<EntityId>> {
    PredicateList::from_value(conditions)?.select(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::entity::{ObjectType, SceneObject};
    use crate::scene::InMemoryScene;

    fn conditions(json: serde_json::Value) -> Value {
        Value::from_json(&json)
    }

    struct Fixture {
        scene: InMemoryScene,
        cube1: EntityId,
        cube2: EntityId,
        sphere: EntityId,
    }

    fn fixture() -> Fixture {
        let scene = InMemoryScene::new();
        let cube1 = scene
            .insert(
                SceneObject::new("Cube1", ObjectType::Mesh)
                    .with_location([0.5, 0.5, 0.5])
                    .with_custom_property("physics", 1)
                    .with_custom_property("category", "furniture"),
            )
            .unwrap();
        let cube2 = scene
            .insert(SceneObject::new("Cube2", ObjectType::Light).with_location([2.0, 0.0, 0.0]))
            .unwrap();
        let sphere = scene
            .insert(
                SceneObject::new("Sphere", ObjectType::Mesh)
                    .with_location([1.0, 0.0, 0.0])
                    .with_custom_property("physics", 0),
            )
            .unwrap();
        Fixture {
            scene,
            cube1,
            cube2,
            sphere,
        }
    }

    #[test]
    fn test_name_regex_and_type() {
        let f = fixture();
        let selected =
            select_entities(&f.scene, &conditions(json!({"name": "Cube.*", "type": "MESH"})))
                .unwrap();
        assert_eq!(selected, vec![f.cube1]);
    }

    #[test]
    fn test_regex_is_anchored() {
        let f = fixture();
        let selected = select_entities(&f.scene, &conditions(json!({"name": "Cube"}))).unwrap();
        assert!(selected.is_empty());
        let selected = select_entities(&f.scene, &conditions(json!({"name": "ube1"}))).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_or_groups_deduplicate_first_match_wins() {
        let f = fixture();
        let selected = select_entities(
            &f.scene,
            &conditions(json!([{"name": "Sphere"}, {"type": "MESH"}])),
        )
        .unwrap();
        assert_eq!(selected, vec![f.sphere, f.cube1]);
    }

    #[test]
    fn test_custom_property_bool_matches_int() {
        let f = fixture();
        let selected = select_entities(&f.scene, &conditions(json!({"cp_physics": true}))).unwrap();
        assert_eq!(selected, vec![f.cube1]);
        let selected = select_entities(&f.scene, &conditions(json!({"cp_physics": false}))).unwrap();
        assert_eq!(selected, vec![f.sphere]);
    }

    #[test]
    fn test_custom_property_int_target_matches_stored_bool() {
        let scene = InMemoryScene::new();
        let on = scene
            .insert(SceneObject::new("On", ObjectType::Mesh).with_custom_property("physics", true))
            .unwrap();
        let off = scene
            .insert(SceneObject::new("Off", ObjectType::Mesh).with_custom_property("physics", false))
            .unwrap();
        let plain = scene
            .insert(SceneObject::new("Plain", ObjectType::Mesh).with_attribute("visible", true))
            .unwrap();

        let selected = select_entities(&scene, &conditions(json!({"cp_physics": 1}))).unwrap();
        assert_eq!(selected, vec![on]);
        let selected = select_entities(&scene, &conditions(json!({"cp_physics": 0}))).unwrap();
        assert_eq!(selected, vec![off]);
        let selected = select_entities(&scene, &conditions(json!({"visible": 1}))).unwrap();
        assert_eq!(selected, vec![plain]);
    }

    #[test]
    fn test_conditions_evaluate_in_declaration_order() {
        let f = fixture();
        // `name` rejects Cube1 before its string category meets the int target.
        let selected = select_entities(
            &f.scene,
            &conditions(json!({"name": "Sphere", "cp_category": 3})),
        )
        .unwrap();
        assert!(selected.is_empty());

        let err = select_entities(
            &f.scene,
            &conditions(json!({"cp_category": 3, "name": "Sphere"})),
        )
        .unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn test_custom_property_regex_and_absent() {
        let f = fixture();
        let selected =
            select_entities(&f.scene, &conditions(json!({"cp_category": "furn.*"}))).unwrap();
        assert_eq!(selected, vec![f.cube1]);
        let selected = select_entities(&f.scene, &conditions(json!({"cp_missing": 1}))).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_custom_property_type_mismatch() {
        let f = fixture();
        let err = select_entities(&f.scene, &conditions(json!({"cp_category": 3}))).unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn test_vector_attribute_coerced_from_list() {
        let f = fixture();
        let selected =
            select_entities(&f.scene, &conditions(json!({"location": [2, 0, 0]}))).unwrap();
        assert_eq!(selected, vec![f.cube2]);
    }

    #[test]
    fn test_vector_attribute_wrong_arity_mismatches() {
        let f = fixture();
        let err = select_entities(&f.scene, &conditions(json!({"location": [2, 0, 0, 1]})))
            .unwrap_err();
        assert!(err.is_type_mismatch());
        let err = select_entities(&f.scene, &conditions(json!({"name": 5}))).unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn test_unknown_attribute_rejects() {
        let f = fixture();
        let selected = select_entities(&f.scene, &conditions(json!({"fov": 0.5}))).unwrap();
        assert!(selected.is_empty());
        let selected = select_entities(&f.scene, &conditions(json!({"cf_hidden": true}))).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_inside_box() {
        let f = fixture();
        let selected = select_entities(
            &f.scene,
            &conditions(json!({"cf_inside": {"min": [0, 0, 0], "max": [1, 1, 1]}})),
        )
        .unwrap();
        assert_eq!(selected, vec![f.cube1]);

        let selected = select_entities(
            &f.scene,
            &conditions(json!({"cf_outside": {"min": [0, 0, 0], "max": [1, 1, 1]}})),
        )
        .unwrap();
        assert_eq!(selected, vec![f.cube2, f.sphere]);
    }

    #[test]
    fn test_inside_half_spaces_include_boundary() {
        let f = fixture();
        let selected =
            select_entities(&f.scene, &conditions(json!({"cf_inside": {"x_max": 1.0}}))).unwrap();
        assert_eq!(selected, vec![f.cube1, f.sphere]);

        // The same plane as a box face excludes the sphere sitting on it.
        let selected = select_entities(
            &f.scene,
            &conditions(json!({"cf_inside": {"min": [0, -1, -1], "max": [1, 1, 1]}})),
        )
        .unwrap();
        assert_eq!(selected, vec![f.cube1]);

        let selected =
            select_entities(&f.scene, &conditions(json!({"cf_outside": {"x_min": "1.5"}})))
                .unwrap();
        assert_eq!(selected, vec![f.cube1, f.sphere]);
    }

    #[test]
    fn test_mixed_region_syntax_is_invalid() {
        let f = fixture();
        let err = select_entities(
            &f.scene,
            &conditions(json!({"cf_inside": {"min": [0, 0, 0], "max": [1, 1, 1], "x_min": 0}})),
        )
        .unwrap_err();
        assert!(err.is_invalid_predicate());

        let err = select_entities(&f.scene, &conditions(json!({"cf_inside": {"min": [0, 0, 0]}})))
            .unwrap_err();
        assert!(err.is_invalid_predicate());
    }

    #[test]
    fn test_mixed_region_syntax_fails_on_empty_scene() {
        let scene = InMemoryScene::new();
        let err = select_entities(
            &scene,
            &conditions(json!({"cf_inside": {"min": [0, 0, 0], "max": [1, 1, 1], "z_max": 0}})),
        )
        .unwrap_err();
        assert!(err.is_invalid_predicate());
    }

    #[test]
    fn test_invalid_regex_is_invalid_predicate() {
        let f = fixture();
        let err = select_entities(&f.scene, &conditions(json!({"name": "Cube("}))).unwrap_err();
        assert!(err.is_invalid_predicate());
    }

    #[test]
    fn test_empty_group_matches_all() {
        let f = fixture();
        let selected = select_entities(&f.scene, &conditions(json!({}))).unwrap();
        assert_eq!(selected, vec![f.cube1, f.cube2, f.sphere]);
    }

    #[test]
    fn test_conditions_must_be_mappings() {
        let f = fixture();
        let err = select_entities(&f.scene, &conditions(json!("Cube"))).unwrap_err();
        assert!(err.is_type_conversion());
        let err = select_entities(&f.scene, &conditions(json!([{"name": "Cube1"}, 3]))).unwrap_err();
        assert!(err.is_type_conversion());
    }
}
