//! Pipeline loading and execution.
//!
//! A pipeline document lists modules in execution order and a `global`
//! block merged under every module config:
//!
//! ```json
//! {
//!   "global": {"mode": "once_for_each"},
//!   "modules": [
//!     {"module": "camera.CameraLoader", "config": {"path": "<args:0>", "file_format": "location rotation/value"}},
//!     {"module": "manipulators.EntityManipulator", "config": {"selector": {"provider": "getter.Entity", "conditions": {"name": "Cube"}}, "cp_physics": true}}
//!   ]
//! }
//! ```
//!
//! `<args:N>` placeholders are replaced with the N-th command-line argument
//! before the document is parsed.

use std::path::Path;
use std::time::Instant;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::config::{merge_nodes, Config, ConfigNode, Resolver};
use crate::error::{ConfigError, SynthResult};
use crate::module::{Module, ModuleRegistry};

#[derive(Debug, Deserialize)]
struct PipelineDocument {
    #[serde(default)]
    global: ConfigNode,
    modules: Vec<ModuleDeclaration>,
}

#[derive(Debug, Deserialize)]
struct ModuleDeclaration {
    module: String,
    #[serde(default)]
    config: ConfigNode,
}

/// Replaces every `<args:N>` in `text` with `args[N]`.
///
/// # Errors
/// `MissingArgument` if a placeholder points past the end of `args`.
pub fn substitute_args(text: &str, args: &[String]) -> Result<String, ConfigError> {
    let placeholder = Regex::new(r"<args:(\d+)>").map_err(|e| ConfigError::Parse {
        origin: "placeholder pattern".to_string(),
        message: e.to_string(),
    })?;

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for captures in placeholder.captures_iter(text) {
        let whole = captures.get(0).map_or(0..0, |m| m.range());
        let index = captures[1].parse::<usize>().unwrap_or(usize::MAX);
        let arg = args.get(index).ok_or(ConfigError::MissingArgument {
            index,
            available: args.len(),
        })?;
        out.push_str(&text[last..whole.start]);
        out.push_str(arg);
        last = whole.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// An ordered list of instantiated modules.
pub struct Pipeline {
    modules: Vec<Box<dyn Module>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("modules", &self.module_names())
            .finish()
    }
}

impl Pipeline {
    /// Wraps already-built modules.
    #[must_use]
    pub fn new(modules: Vec<Box<dyn Module>>) -> Self {
        Self { modules }
    }

    /// Reads and instantiates the pipeline document at `path`.
    pub fn from_file(
        path: impl AsRef<Path>,
        args: &[String],
        resolver: &Resolver,
        registry: &ModuleRegistry,
    ) -> SynthResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, &path.display().to_string(), args, resolver, registry)
    }

    /// Instantiates a pipeline from document text. `origin` names the
    /// document in parse errors.
    pub fn from_json_str(
        text: &str,
        origin: &str,
        args: &[String],
        resolver: &Resolver,
        registry: &ModuleRegistry,
    ) -> SynthResult<Self> {
        let text = substitute_args(text, args)?;
        let document: PipelineDocument =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                origin: origin.to_string(),
                message: e.to_string(),
            })?;

        let modules = document
            .modules
            .into_iter()
            .map(|declaration| {
                let data = merge_nodes(&declaration.config, document.global.clone());
                registry.create(&declaration.module, Config::new(data, resolver.clone()))
            })
            .collect::<SynthResult<Vec<_>>>()?;
        info!(origin, modules = modules.len(), "Loaded pipeline");
        Ok(Self { modules })
    }

    /// Runs every module in order. The first error aborts the run.
    pub fn run(&self) -> SynthResult<()> {
        let start = Instant::now();
        for module in &self.modules {
            let module_start = Instant::now();
            info!(module = module.name(), "Running module");
            module.run()?;
            info!(
                module = module.name(),
                elapsed_ms = module_start.elapsed().as_millis(),
                "Finished module"
            );
        }
        info!(
            modules = self.modules.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Finished pipeline"
        );
        Ok(())
    }

    /// Module names in execution order.
    #[must_use]
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if the pipeline has no modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
