//! Resolved values.
//!
//! Configuration literals, provider results, and host attributes all meet
//! as a [`Value`]. Literals from a configuration tree only ever produce the
//! JSON-shaped variants; the semantic vector types (`Vector`, `Euler`,
//! `Color`) come from samplers and from the host, and a literal list is
//! coerced into them on demand.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Mapping in declaration order.
pub type ValueMap = IndexMap<String, Value>;

/// Possible values flowing through the configuration engine.
///
/// # Examples
///
/// ```
/// use synthscene::Value;
///
/// let location = Value::Vector(vec![1.0, 2.0, 3.0]);
/// let literal = Value::from_json(&serde_json::json!([1, 2, 3]));
///
/// assert!(location.is_vector());
/// assert_eq!(literal.coerce_like(&location), Some(location));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Free-length numeric vector (locations, scales).
    Vector(Vec<f64>),
    /// XYZ Euler rotation in radians.
    Euler([f64; 3]),
    /// RGB or RGBA color.
    Color(Vec<f64>),
    List(Vec<Value>),
    /// Keys stay in declaration order, which selectors evaluate in.
    Map(ValueMap),
    /// Handle of a live host entity.
    Entity(EntityId),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_vector(&self) -> bool {
        matches!(self, Self::Vector(_))
    }

    pub const fn is_entity(&self) -> bool {
        matches!(self, Self::Entity(_))
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the components of a numeric sequence.
    ///
    /// Accepts the semantic vector types and literal lists whose items are
    /// all numbers. Strings are not parsed here.
    #[must_use]
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        match self {
            Self::Vector(v) | Self::Color(v) => Some(v.clone()),
            Self::Euler(v) => Some(v.to_vec()),
            Self::List(items) => items.iter().map(Self::as_float).collect(),
            _ => None,
        }
    }

    /// Like [`Value::as_numbers`], but also reads a JSON array written as a
    /// string (`"[-5, -5, -5]"`), which configuration files use for bounds.
    #[must_use]
    pub fn parse_numbers(&self) -> Option<Vec<f64>> {
        match self {
            Self::String(s) => serde_json::from_str::<Vec<f64>>(s.trim()).ok(),
            other => other.as_numbers(),
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Vector(_) => "vector",
            Self::Euler(_) => "euler",
            Self::Color(_) => "color",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Entity(_) => "entity",
        }
    }

    /// Converts a configuration literal. Provider declarations are not
    /// recognized here; see [`crate::config::Resolver::resolve`].
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts back into a plain JSON value.
    ///
    /// Vector types become arrays and entity handles become their UUID
    /// string, so the result is a valid configuration node again.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => Json::from(*f),
            Self::String(s) => Json::String(s.clone()),
            Self::Vector(v) | Self::Color(v) => Json::from(v.clone()),
            Self::Euler(v) => Json::from(v.to_vec()),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Entity(id) => Json::String(id.to_string()),
        }
    }

    /// Returns true if both values have the same variant.
    #[must_use]
    pub fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Coerces `self` into the semantic type of `template`.
    ///
    /// Returns `None` when no coercion exists. A numeric sequence must have
    /// exactly the template's arity; an `Euler` always takes three and a
    /// `Color` keeps the arity of the stored color, so a four-element list
    /// never silently becomes an RGB color.
    #[must_use]
    pub fn coerce_like(&self, template: &Self) -> Option<Self> {
        if self.same_kind(template) {
            return Some(self.clone());
        }
        match template {
            Self::Float(_) => self.as_float().map(Self::Float),
            Self::Vector(t) => self
                .as_numbers()
                .filter(|v| v.len() == t.len())
                .map(Self::Vector),
            Self::Euler(_) => self
                .as_numbers()
                .and_then(|v| <[f64; 3]>::try_from(v).ok())
                .map(Self::Euler),
            Self::Color(t) => self
                .as_numbers()
                .filter(|v| v.len() == t.len())
                .map(Self::Color),
            _ => None,
        }
    }

    /// Equality with numeric cross-comparison.
    ///
    /// Ints, floats, and bools compare by numeric value, so a custom
    /// property stored as `1` equals the target `true`. Everything else
    /// falls back to structural equality.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn loosely_equals(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return a == b;
        }
        match (self.as_numbers(), other.as_numbers()) {
            (Some(a), Some(b)) if self.same_kind(other) || self.is_semantic_vector() => a == b,
            _ => self == other,
        }
    }

    const fn is_semantic_vector(&self) -> bool {
        matches!(self, Self::Vector(_) | Self::Euler(_) | Self::Color(_))
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            other => other.as_float(),
        }
    }
}

fn fmt_numbers(f: &mut std::fmt::Formatter<'_>, v: &[f64]) -> std::fmt::Result {
    write!(f, "[")?;
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{x}")?;
    }
    write!(f, "]")
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Vector(v) => {
                write!(f, "vector")?;
                fmt_numbers(f, v)
            }
            Self::Euler(v) => {
                write!(f, "euler")?;
                fmt_numbers(f, v)
            }
            Self::Color(v) => {
                write!(f, "color")?;
                fmt_numbers(f, v)
            }
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => write!(f, "map{{{} keys}}", map.len()),
            Self::Entity(v) => write!(f, "entity:{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Self::Entity(v)
    }
}

impl From<[f64; 3]> for Value {
    fn from(v: [f64; 3]) -> Self {
        Self::Vector(v.to_vec())
    }
}
