//! `manipulators.EntityManipulator`: assigns settings to selected entities.
//!
//! ```json
//! {
//!   "module": "manipulators.EntityManipulator",
//!   "config": {
//!     "selector": {"provider": "getter.Entity", "conditions": {"name": "Suzanne"}},
//!     "mode": "once_for_each",
//!     "location": {"provider": "sampler.Uniform3d", "min": [-1, -1, 0], "max": [1, 1, 2]},
//!     "cp_physics": true,
//!     "cf_add_modifier": {"name": "Solidify", "thickness": 0.001}
//!   }
//! }
//! ```

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::entity::{EntityId, Modifier};
use crate::error::{ConfigError, ExecutionError, SelectionError, SynthResult};
use crate::module::{Module, ResolutionMode, SettingKey};
use crate::scene::Scene;
use crate::value::Value;

const SELECTOR_KEY: &str = "selector";
const MODE_KEY: &str = "mode";

/// Sets attributes, custom properties, or applies custom functions on every
/// entity returned by `selector`.
#[derive(Debug)]
pub struct EntityManipulator {
    config: Config,
}

impl EntityManipulator {
    /// Binds the module to its configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    fn apply(&self, scene: &dyn Scene, id: EntityId, key: &str, value: Value) -> SynthResult<()> {
        match SettingKey::parse(key) {
            SettingKey::Attribute(name) => {
                if scene.has_attribute(id, name)? {
                    scene.set_attribute(id, name, value)?;
                } else {
                    warn!(entity = %id, attribute = name, "Entity has no such attribute, skipping");
                }
            }
            SettingKey::CustomProperty(name) => scene.set_custom_property(id, name, value)?,
            SettingKey::CustomFunction(name) => self.apply_function(scene, id, name, &value)?,
        }
        Ok(())
    }

    fn apply_function(
        &self,
        scene: &dyn Scene,
        id: EntityId,
        name: &str,
        value: &Value,
    ) -> SynthResult<()> {
        match name {
            "add_modifier" => {
                let serde_json::Value::Object(map) = value.to_json() else {
                    return Err(ConfigError::conversion("cf_add_modifier", "mapping", value).into());
                };
                let params = self.config.with_data(map);
                let modifier = params.get_string("name")?;
                if !modifier.eq_ignore_ascii_case("solidify") {
                    return Err(ExecutionError::UnknownFunction {
                        name: format!("modifier '{modifier}'"),
                    }
                    .into());
                }
                let thickness = params.get_float("thickness")?;
                scene.add_modifier(id, Modifier::Solidify { thickness })?;
                debug!(entity = %id, thickness, "Added solidify modifier");
                Ok(())
            }
            other => Err(ExecutionError::UnknownFunction {
                name: other.to_string(),
            }
            .into()),
        }
    }
}

impl Module for EntityManipulator {
    fn name(&self) -> &str {
        "manipulators.EntityManipulator"
    }

    fn run(&self) -> SynthResult<()> {
        let entities = self.config.get_entities(SELECTOR_KEY)?;
        let mode: ResolutionMode = self
            .config
            .get_string_or(MODE_KEY, ResolutionMode::OnceForEach.as_str())?
            .parse()?;

        if entities.is_empty() {
            return Err(SelectionError::NoMatch {
                what: "selector returned no entities, check the defined conditions".to_string(),
            }
            .into());
        }
        info!(count = entities.len(), mode = %mode, "Manipulating entities");

        let scene = self.config.scene().clone();
        let keys = self
            .config
            .keys()
            .filter(|key| *key != SELECTOR_KEY && *key != MODE_KEY)
            .map(str::to_string)
            .collect::<Vec<_>>();

        for key in &keys {
            let shared = match mode {
                ResolutionMode::OnceForAll => Some(self.config.get_raw_value(key)?),
                ResolutionMode::OnceForEach => None,
            };
            for &id in &entities {
                let value = match &shared {
                    Some(value) => value.clone(),
                    None => self.config.get_raw_value(key)?,
                };
                self.apply(scene.as_ref(), id, key, value)?;
            }
        }
        Ok(())
    }
}
