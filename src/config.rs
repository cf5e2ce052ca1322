//! Typed configuration access with lazy provider resolution.
//!
//! A [`Config`] wraps one configuration node. Any value inside it may be a
//! provider declaration, i.e. a mapping with a reserved `provider` key.
//! Declarations are never evaluated when a config is built; they are run
//! each time a getter reaches them, and results are not cached. That is what
//! lets a module choose between sampling a value once for all entities or
//! once for each of them.
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use synthscene::{Config, InMemoryScene, ProviderRegistry, Resolver};
//!
//! let resolver = Resolver::new(Arc::new(InMemoryScene::new()), Arc::new(ProviderRegistry::with_defaults()));
//! let config = Config::from_json(json!({
//!     "samples": 8,
//!     "location": {"provider": "sampler.Uniform3d", "min": [0, 0, 0], "max": [1, 1, 1]}
//! }), resolver).unwrap();
//!
//! assert_eq!(config.get_int("samples").unwrap(), 8);
//! let location = config.get_vector3d("location").unwrap();
//! assert!(location.iter().all(|c| (0.0..=1.0).contains(c)));
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::entity::EntityId;
use crate::error::{ConfigError, SynthResult};
use crate::provider::ProviderRegistry;
use crate::scene::Scene;
use crate::value::{Value, ValueMap};

/// Reserved key that marks a mapping as a provider declaration.
pub const PROVIDER_KEY: &str = "provider";

/// Ordered mapping from key to raw configuration value.
pub type ConfigNode = serde_json::Map<String, serde_json::Value>;

/// Returns true if `raw` is a provider declaration.
#[must_use]
pub fn is_provider_declaration(raw: &serde_json::Value) -> bool {
    raw.as_object()
        .is_some_and(|map| map.contains_key(PROVIDER_KEY))
}

/// Merges `source` over `destination`; `source` wins on conflicts and
/// nested mappings are merged key by key.
#[must_use]
pub fn merge_nodes(source: &ConfigNode, mut destination: ConfigNode) -> ConfigNode {
    for (key, value) in source {
        match (value, destination.get_mut(key)) {
            (serde_json::Value::Object(src), Some(serde_json::Value::Object(dst)))
                if !is_provider_declaration(value) =>
            {
                let merged = merge_nodes(src, std::mem::take(dst));
                *dst = merged;
            }
            _ => {
                destination.insert(key.clone(), value.clone());
            }
        }
    }
    destination
}

/// Everything provider resolution needs: the scene handle and the provider
/// registry. Cheap to clone; every config built during a run shares one.
#[derive(Clone)]
pub struct Resolver {
    scene: Arc<dyn Scene>,
    providers: Arc<ProviderRegistry>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Creates a resolver over a scene and a provider registry.
    #[must_use]
    pub fn new(scene: Arc<dyn Scene>, providers: Arc<ProviderRegistry>) -> Self {
        Self { scene, providers }
    }

    /// The live scene.
    #[must_use]
    pub fn scene(&self) -> &Arc<dyn Scene> {
        &self.scene
    }

    /// The provider registry.
    #[must_use]
    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// Resolves a raw value, running every provider declaration in it.
    ///
    /// Recursion reaches into lists and mappings, and a provider's own
    /// parameters are resolved by the provider through its [`Config`].
    pub fn resolve(&self, raw: &serde_json::Value) -> SynthResult<Value> {
        match raw {
            serde_json::Value::Object(map) if map.contains_key(PROVIDER_KEY) => {
                self.run_provider(map)
            }
            serde_json::Value::Object(map) => {
                let mut out = ValueMap::new();
                for (key, value) in map {
                    out.insert(key.clone(), self.resolve(value)?);
                }
                Ok(Value::Map(out))
            }
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<SynthResult<Vec<_>>>()
                .map(Value::List),
            literal => Ok(Value::from_json(literal)),
        }
    }

    fn run_provider(&self, declaration: &ConfigNode) -> SynthResult<Value> {
        let name = declaration
            .get(PROVIDER_KEY)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                ConfigError::conversion(PROVIDER_KEY, "provider name", &declaration[PROVIDER_KEY])
            })?;
        let provider = self.providers.get(name)?;
        debug!(provider = name, "Resolving provider");
        let config = Config::new(declaration.clone(), self.clone());
        provider.run(&config)
    }
}

/// Read-only typed accessor over a configuration node.
///
/// Keys may be `/`-separated paths into nested mappings
/// (`"rotation/value"`). Getters without a default fail with `MissingKey`
/// when the key is absent; every `_or` variant returns the default instead.
/// Values that are present but have the wrong shape fail with
/// `TypeConversion` in both cases.
#[derive(Debug, Clone)]
pub struct Config {
    data: ConfigNode,
    resolver: Resolver,
}

impl Config {
    /// Wraps a node.
    #[must_use]
    pub fn new(data: ConfigNode, resolver: Resolver) -> Self {
        Self { data, resolver }
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_json(data: serde_json::Value, resolver: Resolver) -> SynthResult<Self> {
        match data {
            serde_json::Value::Object(map) => Ok(Self::new(map, resolver)),
            other => Err(ConfigError::conversion("<root>", "mapping", other).into()),
        }
    }

    /// Builds a sibling config over another node, sharing the resolver.
    #[must_use]
    pub fn with_data(&self, data: ConfigNode) -> Self {
        Self::new(data, self.resolver.clone())
    }

    /// The raw node.
    #[must_use]
    pub const fn data(&self) -> &ConfigNode {
        &self.data
    }

    /// Top-level keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// The resolver this config resolves providers with.
    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The live scene.
    #[must_use]
    pub fn scene(&self) -> &Arc<dyn Scene> {
        self.resolver.scene()
    }

    fn lookup(&self, key: &str) -> Option<&serde_json::Value> {
        let mut parts = key.split('/');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    fn require(&self, key: &str) -> Result<&serde_json::Value, ConfigError> {
        self.lookup(key).ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
        })
    }

    /// Returns true if `key` is present.
    ///
    /// A provider declaration under `key` is run as part of the check, so
    /// this is not side-effect free for selectors.
    pub fn has_param(&self, key: &str) -> SynthResult<bool> {
        match self.lookup(key) {
            None => Ok(false),
            Some(raw) if is_provider_declaration(raw) => {
                self.resolver.resolve(raw)?;
                Ok(true)
            }
            Some(_) => Ok(true),
        }
    }

    /// Value at `key` after provider resolution, without coercion.
    pub fn get_raw_value(&self, key: &str) -> SynthResult<Value> {
        self.resolver.resolve(self.require(key)?)
    }

    /// Like [`Config::get_raw_value`], with a default for absent keys.
    pub fn get_raw_value_or(&self, key: &str, default: Value) -> SynthResult<Value> {
        match self.lookup(key) {
            Some(raw) => self.resolver.resolve(raw),
            None => Ok(default),
        }
    }

    /// Mapping or list at `key` after provider resolution.
    pub fn get_raw_dict(&self, key: &str) -> SynthResult<Value> {
        let value = self.get_raw_value(key)?;
        match value {
            Value::Map(_) | Value::List(_) => Ok(value),
            other => Err(ConfigError::conversion(key, "mapping", other).into()),
        }
    }

    /// Unresolved mapping at `key`, for callers that build configs from it.
    pub fn get_node_or(&self, key: &str, default: ConfigNode) -> SynthResult<ConfigNode> {
        match self.lookup(key) {
            None => Ok(default),
            Some(serde_json::Value::Object(map)) if !map.contains_key(PROVIDER_KEY) => {
                Ok(map.clone())
            }
            Some(raw) => match self.resolver.resolve(raw)?.to_json() {
                serde_json::Value::Object(map) => Ok(map),
                other => Err(ConfigError::conversion(key, "mapping", other).into()),
            },
        }
    }

    /// Like [`Config::get_node_list_or`], but `key` must be present.
    pub fn get_node_list(&self, key: &str) -> SynthResult<Vec<ConfigNode>> {
        self.require(key)?;
        self.get_node_list_or(key, Vec::new())
    }

    /// Unresolved list of mappings at `key`. Each item stays a node so
    /// providers inside it resolve lazily once it is wrapped in a config.
    pub fn get_node_list_or(&self, key: &str, default: Vec<ConfigNode>) -> SynthResult<Vec<ConfigNode>> {
        let Some(raw) = self.lookup(key) else {
            return Ok(default);
        };
        let items = match raw {
            serde_json::Value::Array(items) => items.clone(),
            _ if is_provider_declaration(raw) => match self.resolver.resolve(raw)?.to_json() {
                serde_json::Value::Array(items) => items,
                other => return Err(ConfigError::conversion(key, "list of mappings", other).into()),
            },
            other => return Err(ConfigError::conversion(key, "list of mappings", other).into()),
        };
        items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::Object(map) => Ok(map),
                other => Err(ConfigError::conversion(key, "list of mappings", other).into()),
            })
            .collect()
    }

    /// Integer at `key`. Floats truncate, bools read as 0/1, and integer
    /// strings are parsed.
    pub fn get_int(&self, key: &str) -> SynthResult<i64> {
        let value = self.get_raw_value(key)?;
        to_int(key, &value)
    }

    /// Like [`Config::get_int`], with a default for absent keys.
    pub fn get_int_or(&self, key: &str, default: i64) -> SynthResult<i64> {
        match self.lookup(key) {
            Some(_) => self.get_int(key),
            None => Ok(default),
        }
    }

    /// Float at `key`. Ints widen and numeric strings are parsed.
    pub fn get_float(&self, key: &str) -> SynthResult<f64> {
        let value = self.get_raw_value(key)?;
        to_float(key, &value)
    }

    /// Like [`Config::get_float`], with a default for absent keys.
    pub fn get_float_or(&self, key: &str, default: f64) -> SynthResult<f64> {
        match self.lookup(key) {
            Some(_) => self.get_float(key),
            None => Ok(default),
        }
    }

    /// Boolean at `key`. Numbers are true when non-zero and the strings
    /// `"true"`/`"false"` are accepted.
    pub fn get_bool(&self, key: &str) -> SynthResult<bool> {
        let value = self.get_raw_value(key)?;
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(ConfigError::conversion(key, "bool", other).into()),
        }
    }

    /// Like [`Config::get_bool`], with a default for absent keys.
    pub fn get_bool_or(&self, key: &str, default: bool) -> SynthResult<bool> {
        match self.lookup(key) {
            Some(_) => self.get_bool(key),
            None => Ok(default),
        }
    }

    /// String at `key`. Scalars are rendered; containers are rejected.
    pub fn get_string(&self, key: &str) -> SynthResult<String> {
        match self.get_raw_value(key)? {
            Value::String(s) => Ok(s),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            // Debug keeps the fraction, so 1.0 reads back as a float.
            Value::Float(f) => Ok(format!("{f:?}")),
            other => Err(ConfigError::conversion(key, "string", other).into()),
        }
    }

    /// Like [`Config::get_string`], with a default for absent keys.
    pub fn get_string_or(&self, key: &str, default: &str) -> SynthResult<String> {
        match self.lookup(key) {
            Some(_) => self.get_string(key),
            None => Ok(default.to_string()),
        }
    }

    /// List at `key`. Vector-typed provider results count as lists of
    /// floats.
    pub fn get_list(&self, key: &str) -> SynthResult<Vec<Value>> {
        match self.get_raw_value(key)? {
            Value::List(items) => Ok(items),
            Value::Vector(v) | Value::Color(v) => Ok(v.into_iter().map(Value::Float).collect()),
            Value::Euler(v) => Ok(v.into_iter().map(Value::Float).collect()),
            other => Err(ConfigError::conversion(key, "list", other).into()),
        }
    }

    /// Like [`Config::get_list`], with a default for absent keys.
    pub fn get_list_or(&self, key: &str, default: Vec<Value>) -> SynthResult<Vec<Value>> {
        match self.lookup(key) {
            Some(_) => self.get_list(key),
            None => Ok(default),
        }
    }

    /// List at `key` that must have exactly `size` items.
    pub fn get_list_sized(&self, key: &str, size: usize) -> SynthResult<Vec<Value>> {
        let items = self.get_list(key)?;
        if items.len() != size {
            return Err(ConfigError::conversion(
                key,
                format!("list of length {size}"),
                format!("list of length {}", items.len()),
            )
            .into());
        }
        Ok(items)
    }

    /// Numeric vector of 3 or 4 components at `key`.
    pub fn get_vector(&self, key: &str) -> SynthResult<Vec<f64>> {
        let value = self.get_raw_value(key)?;
        match value.parse_numbers() {
            Some(v) if v.len() == 3 || v.len() == 4 => Ok(v),
            _ => Err(ConfigError::conversion(key, "3d or 4d vector", value).into()),
        }
    }

    /// 3-component vector at `key`.
    pub fn get_vector3d(&self, key: &str) -> SynthResult<[f64; 3]> {
        self.get_fixed_vector(key)
    }

    /// Like [`Config::get_vector3d`], with a default for absent keys.
    pub fn get_vector3d_or(&self, key: &str, default: [f64; 3]) -> SynthResult<[f64; 3]> {
        match self.lookup(key) {
            Some(_) => self.get_vector3d(key),
            None => Ok(default),
        }
    }

    /// 4-component vector at `key`.
    pub fn get_vector4d(&self, key: &str) -> SynthResult<[f64; 4]> {
        self.get_fixed_vector(key)
    }

    fn get_fixed_vector<const N: usize>(&self, key: &str) -> SynthResult<[f64; N]> {
        let value = self.get_raw_value(key)?;
        value
            .parse_numbers()
            .and_then(|v| <[f64; N]>::try_from(v).ok())
            .ok_or_else(|| ConfigError::conversion(key, format!("{N}d vector"), value).into())
    }

    /// Entity handles at `key`, typically the result of a selector.
    pub fn get_entities(&self, key: &str) -> SynthResult<Vec<EntityId>> {
        let value = self.get_raw_value(key)?;
        match &value {
            Value::Entity(id) => Ok(vec![*id]),
            Value::List(items) => items
                .iter()
                .map(|item| {
                    item.as_entity()
                        .ok_or_else(|| ConfigError::conversion(key, "list of entities", item).into())
                })
                .collect(),
            other => Err(ConfigError::conversion(key, "list of entities", other).into()),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_int(key: &str, value: &Value) -> SynthResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::conversion(key, "int", value).into()),
        other => Err(ConfigError::conversion(key, "int", other).into()),
    }
}

fn to_float(key: &str, value: &Value) -> SynthResult<f64> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(value.as_float().unwrap_or_default()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::conversion(key, "float", value).into()),
        other => Err(ConfigError::conversion(key, "float", other).into()),
    }
}
