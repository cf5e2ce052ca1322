//! Repeated config-declared items.
//!
//! An [`ItemCollection`] turns inline mappings or the lines of a text file
//! into [`Config`]s, merges each over a set of default parameters, and hands
//! them to a callback. Camera poses are the typical item.
//!
//! A file line is split on whitespace and consumed field by field following
//! `line_format`. With format `"location rotation/value"` and arities
//! `{location: 3, rotation/value: 3}` the line `1 2 3 0.1 0.2 0.3` becomes
//! `{"location": [1, 2, 3], "rotation": {"value": [0.1, 0.2, 0.3]}}`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::config::{merge_nodes, Config, ConfigNode, Resolver};
use crate::error::{ConfigError, ExecutionError, SynthResult};

type AddItem<'a> = Box<dyn FnMut(Config) -> SynthResult<()> + 'a>;

/// Builds items from dicts or files and passes each to a callback.
pub struct ItemCollection<'a> {
    add_item: AddItem<'a>,
    defaults: ConfigNode,
    resolver: Resolver,
}

impl fmt::Debug for ItemCollection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemCollection")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl<'a> ItemCollection<'a> {
    /// Creates a collection. Every item is merged over `defaults`, with the
    /// item's own values winning.
    pub fn new(
        resolver: Resolver,
        defaults: ConfigNode,
        add_item: impl FnMut(Config) -> SynthResult<()> + 'a,
    ) -> Self {
        Self {
            add_item: Box::new(add_item),
            defaults,
            resolver,
        }
    }

    fn add(&mut self, item: &ConfigNode) -> SynthResult<()> {
        let merged = merge_nodes(item, self.defaults.clone());
        (self.add_item)(Config::new(merged, self.resolver.clone()))
    }

    /// Adds one item per mapping, in order. Returns the number added.
    pub fn add_items_from_dicts(&mut self, items: &[ConfigNode]) -> SynthResult<usize> {
        for item in items {
            self.add(item)?;
        }
        Ok(items.len())
    }

    /// Adds one item per non-empty, non-comment line of the file at `path`.
    ///
    /// An empty `path` adds nothing. Returns the number of items added.
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `LineFormat` naming the 1-based line
    /// if a line has the wrong number of tokens.
    pub fn add_items_from_file(
        &mut self,
        path: &str,
        line_format: &str,
        arities: &HashMap<String, usize>,
    ) -> SynthResult<usize> {
        if path.is_empty() {
            return Ok(0);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: Path::new(path).to_path_buf(),
            source,
        })?;
        let fields = line_format.split_whitespace().collect::<Vec<_>>();

        let mut added = 0;
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let item = parse_line(line, &fields, arities).map_err(|reason| {
                ExecutionError::LineFormat {
                    path: path.to_string(),
                    line: index + 1,
                    reason,
                }
            })?;
            self.add(&item)?;
            added += 1;
        }
        debug!(path, items = added, "Read items from file");
        Ok(added)
    }
}

/// Parses one line into a node following `fields`.
///
/// Fields with arity 1 become scalars, longer ones lists. Tokens are read as
/// ints, then floats, and otherwise kept as strings.
///
/// # Errors
/// A description of the mismatch when the token count is wrong.
pub fn parse_line(
    line: &str,
    fields: &[&str],
    arities: &HashMap<String, usize>,
) -> Result<ConfigNode, String> {
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    let expected: usize = fields
        .iter()
        .map(|f| arities.get(*f).copied().unwrap_or(1))
        .sum();
    if tokens.len() != expected {
        return Err(format!(
            "expected {expected} values for format '{}', found {}",
            fields.join(" "),
            tokens.len()
        ));
    }

    let mut node = ConfigNode::new();
    let mut rest = tokens.as_slice();
    for field in fields {
        let arity = arities.get(*field).copied().unwrap_or(1);
        let (taken, remaining) = rest.split_at(arity);
        rest = remaining;
        let value = if arity == 1 {
            parse_token(taken[0])
        } else {
            serde_json::Value::Array(taken.iter().map(|t| parse_token(t)).collect())
        };
        insert_path(&mut node, field, value);
    }
    Ok(node)
}

fn parse_token(token: &str) -> serde_json::Value {
    if let Ok(i) = token.parse::<i64>() {
        return serde_json::Value::from(i);
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or_else(|| serde_json::Value::String(token.to_string()), serde_json::Value::Number)
}

fn insert_path(node: &mut ConfigNode, path: &str, value: serde_json::Value) {
    match path.split_once('/') {
        None => {
            node.insert(path.to_string(), value);
        }
        Some((head, tail)) => {
            let child = node
                .entry(head.to_string())
                .or_insert_with(|| serde_json::Value::Object(ConfigNode::new()));
            if !child.is_object() {
                *child = serde_json::Value::Object(ConfigNode::new());
            }
            if let serde_json::Value::Object(map) = child {
                insert_path(map, tail, value);
            }
        }
    }
}
