//! The `getter.Entity` provider.

use tracing::debug;

use crate::config::Config;
use crate::entity::EntityId;
use crate::error::{SelectionError, SynthResult};
use crate::provider::Provider;
use crate::selector::predicate::PredicateList;
use crate::value::Value;

/// Returns the entities matching `conditions`, group by group and in scene
/// order within each group.
///
/// ```json
/// {
///   "provider": "getter.Entity",
///   "conditions": [{"name": "Cube.*", "type": "MESH"}, {"cp_physics": true}],
///   "index": 0
/// }
/// ```
///
/// `index`, when present, narrows the result to the single entity at that
/// position; negative values count from the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityGetter;

impl Provider for EntityGetter {
    fn run(&self, config: &Config) -> SynthResult<Value> {
        let conditions = config.get_raw_dict("conditions")?;
        let predicates = PredicateList::from_value(&conditions)?;
        let mut selected = predicates.select(config.scene().as_ref())?;

        if config.has_param("index")? {
            let index = config.get_int("index")?;
            selected = vec![pick(&selected, index)?];
        }

        debug!(
            groups = predicates.groups().len(),
            selected = selected.len(),
            "Selected entities"
        );
        Ok(Value::List(selected.into_iter().map(Value::Entity).collect()))
    }
}

fn pick(selected: &[EntityId], index: i64) -> SynthResult<EntityId> {
    let len = selected.len();
    let position = if index < 0 {
        usize::try_from(index.unsigned_abs())
            .ok()
            .and_then(|back| len.checked_sub(back))
    } else {
        usize::try_from(index).ok()
    };
    position
        .and_then(|i| selected.get(i).copied())
        .ok_or_else(|| SelectionError::IndexOutOfRange { index, len }.into())
}
