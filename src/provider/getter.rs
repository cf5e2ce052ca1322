//! Providers that read configuration or scene state without sampling.

use tracing::debug;

use crate::config::{Config, PROVIDER_KEY};
use crate::error::{ConfigError, SelectionError, SynthResult};
use crate::provider::Provider;
use crate::value::Value;

/// Returns its `content` value after resolution.
///
/// Used where a custom function wants a whole mapping as its argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentGetter;

impl Provider for ContentGetter {
    fn run(&self, config: &Config) -> SynthResult<Value> {
        config.get_raw_value("content")
    }
}

/// Reads one attribute or custom property from each of `entities`.
///
/// Exactly one of `parameter` (built-in attribute) and `cp_parameter`
/// (custom property) must be given. With `output_type` set to `sum` or
/// `avg` the values are folded into one; otherwise the list is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeGetter;

enum Source {
    Attribute(String),
    CustomProperty(String),
}

impl Source {
    fn from_config(config: &Config) -> SynthResult<Self> {
        let attribute = config.data().contains_key("parameter");
        let custom = config.data().contains_key("cp_parameter");
        match (attribute, custom) {
            (true, false) => Ok(Self::Attribute(config.get_string("parameter")?)),
            (false, true) => Ok(Self::CustomProperty(config.get_string("cp_parameter")?)),
            _ => Err(SelectionError::InvalidPredicate {
                reason: "exactly one of 'parameter' and 'cp_parameter' must be given".to_string(),
            }
            .into()),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Attribute(name) | Self::CustomProperty(name) => name,
        }
    }
}

impl Provider for AttributeGetter {
    fn run(&self, config: &Config) -> SynthResult<Value> {
        let entities = config.get_entities("entities")?;
        let source = Source::from_config(config)?;
        let scene = config.scene();

        let mut values = Vec::with_capacity(entities.len());
        for id in entities {
            let value = match &source {
                Source::Attribute(name) => scene.get_attribute(id, name)?,
                Source::CustomProperty(key) => scene.custom_property(id, key)?,
            };
            let value = value.ok_or_else(|| SelectionError::NoMatch {
                what: format!("entity {id} has no parameter '{}'", source.name()),
            })?;
            values.push(value);
        }
        debug!(parameter = source.name(), count = values.len(), "Read entity parameter");

        let output_type = config.get_string_or("output_type", "")?;
        match output_type.as_str() {
            "" => Ok(Value::List(values)),
            "sum" => aggregate(source.name(), &values, false),
            "avg" => aggregate(source.name(), &values, true),
            other => Err(ConfigError::conversion("output_type", "one of sum, avg", other).into()),
        }
    }
}

/// Returns every value's components if all are vectors of one length.
fn vector_components(values: &[Value]) -> Option<Vec<Vec<f64>>> {
    let vectors = values
        .iter()
        .map(|v| match v {
            Value::Vector(_) | Value::Euler(_) | Value::Color(_) => v.as_numbers(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    let len = vectors.first()?.len();
    vectors.iter().all(|v| v.len() == len).then_some(vectors)
}

/// Folds `values` into their sum or average.
///
/// The values must be all ints, all floats, or all vectors of one length.
/// Int sums stay ints; averages are always floats.
#[allow(clippy::cast_precision_loss)]
fn aggregate(key: &str, values: &[Value], average: bool) -> SynthResult<Value> {
    if values.is_empty() {
        return Err(SelectionError::NoMatch {
            what: format!("no values of '{key}' to aggregate"),
        }
        .into());
    }
    let count = values.len() as f64;

    if values.iter().all(Value::is_int) {
        let sum: i64 = values.iter().filter_map(Value::as_int).sum();
        return Ok(if average {
            Value::Float(sum as f64 / count)
        } else {
            Value::Int(sum)
        });
    }

    if values.iter().all(Value::is_float) {
        let sum: f64 = values.iter().filter_map(Value::as_float).sum();
        return Ok(Value::Float(if average { sum / count } else { sum }));
    }

    if let Some(vectors) = vector_components(values) {
        let mut total = vec![0.0; vectors[0].len()];
        for v in &vectors {
            for (t, c) in total.iter_mut().zip(v) {
                *t += c;
            }
        }
        if average {
            total.iter_mut().for_each(|t| *t /= count);
        }
        return Ok(Value::Vector(total));
    }

    Err(SelectionError::TypeMismatch {
        key: key.to_string(),
        expected: "all ints, all floats, or equal-length vectors".to_string(),
        found: values
            .iter()
            .map(Value::type_name)
            .collect::<Vec<_>>()
            .join(", "),
    }
    .into())
}

/// Sums or averages the results of several provider declarations.
///
/// ```json
/// {
///   "provider": "getter.AttributeMerger",
///   "elements": [
///     {"provider": "sampler.Uniform3d", "min": [0, 0, 0], "max": [1, 1, 1]},
///     {"provider": "sampler.Uniform3d", "min": [2, 2, 2], "max": [3, 3, 3]}
///   ],
///   "transform_by": "avg"
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeMerger;

impl Provider for AttributeMerger {
    fn run(&self, config: &Config) -> SynthResult<Value> {
        let transform_by = config.get_string("transform_by")?;
        let average = match transform_by.as_str() {
            "sum" => false,
            "avg" => true,
            other => {
                return Err(ConfigError::conversion("transform_by", "one of sum, avg", other).into())
            }
        };

        let elements = config.get_node_list("elements")?;
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            if !element.contains_key(PROVIDER_KEY) {
                return Err(ConfigError::conversion(
                    "elements",
                    "provider declarations",
                    serde_json::Value::Object(element),
                )
                .into());
            }
            values.push(config.resolver().resolve(&serde_json::Value::Object(element))?);
        }
        debug!(elements = values.len(), transform_by = %transform_by, "Merged provider outputs");
        aggregate("elements", &values, average)
    }
}
