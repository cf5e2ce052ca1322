//! Entity selection.
//!
//! `getter.Entity` evaluates an OR-of-ANDs predicate over the live scene.
//! String targets are full-match regular expressions, not literals:
//! `{"name": "Cube"}` does not select `Cube.001`, while `{"name": "Cube.*"}`
//! does.

mod entity;
mod predicate;

pub use entity::EntityGetter;
pub use predicate::{
    select_entities, AndGroup, Condition, PredicateList, Region, Target, CUSTOM_FUNCTION_PREFIX,
    CUSTOM_PROPERTY_PREFIX,
};
