//! synthscene CLI - run a randomization pipeline against a scene document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use synthscene::{
    InMemoryScene, ModuleRegistry, Pipeline, ProviderRegistry, Resolver, SceneDocument,
    SceneObject,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "synthscene")]
#[command(version)]
#[command(about = "Resolve a declarative randomization pipeline against a scene")]
struct Cli {
    /// Path to the pipeline document (JSON)
    pipeline: PathBuf,

    /// Scene document to load: an object list or {"objects": [...]}
    #[arg(short, long)]
    scene: PathBuf,

    /// Where to write the resulting scene; stdout if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Values for <args:N> placeholders in the pipeline
    args: Vec<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn load_scene(path: &Path) -> Result<InMemoryScene> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene from {}", path.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse scene {}", path.display()))?;

    let document = if raw.is_array() {
        SceneDocument {
            objects: serde_json::from_value::<Vec<SceneObject>>(raw)?,
            keyframes: Vec::new(),
        }
    } else {
        serde_json::from_value(raw)?
    };
    Ok(InMemoryScene::from_document(document)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let scene = Arc::new(load_scene(&cli.scene)?);
    info!(objects = scene.len()?, "Loaded scene");

    let resolver = Resolver::new(scene.clone(), Arc::new(ProviderRegistry::with_defaults()));
    let pipeline = Pipeline::from_file(
        &cli.pipeline,
        &cli.args,
        &resolver,
        &ModuleRegistry::with_defaults(),
    )
    .with_context(|| format!("Failed to load pipeline {}", cli.pipeline.display()))?;
    pipeline.run()?;

    let json = serde_json::to_string_pretty(&scene.to_document()?)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write scene to {}", path.display()))?;
            info!(path = %path.display(), "Wrote scene");
        }
        None => println!("{json}"),
    }
    Ok(())
}
