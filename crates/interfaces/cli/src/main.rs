//! Thin REPL around `golem-engine` (§6 "outer collaborators, ambient, not
//! under test"). Directory/zip discovery and CLI exit codes are explicitly
//! out of scope for the core — this binary owns exactly enough of that to
//! be runnable: walk a content directory, feed each file to the matching
//! `Engine::load_*` call, then loop stdin lines through `Engine::respond`.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use golem_config::{AppConfig, SraixConfig};
use golem_engine::Engine;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "golem", version, about = "AIML 2.0 chatbot interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load an AIML content directory and report what was loaded, then exit.
    Load {
        aiml_dir: PathBuf,
    },
    /// Load an AIML content directory and drop into a stdin/stdout chat loop.
    Chat {
        aiml_dir: PathBuf,
        /// Engine/telemetry TOML config (defaults used if omitted).
        #[arg(long)]
        config: Option<PathBuf>,
        /// `sraix` service descriptor TOML (no external services if omitted).
        #[arg(long)]
        sraix_config: Option<PathBuf>,
        #[arg(long, default_value = "cli")]
        session: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Load { aiml_dir } => run_load(&aiml_dir).await,
        Commands::Chat { aiml_dir, config, sraix_config, session } => {
            run_chat(&aiml_dir, config.as_deref(), sraix_config.as_deref(), &session).await
        }
    }
}

async fn run_load(aiml_dir: &Path) -> Result<()> {
    let engine = Engine::default();
    let discovery = discover(aiml_dir)?;
    load_discovery(&engine, &discovery).await?;
    println!(
        "loaded {} categories, {} sets, {} maps, {} properties files from {}",
        engine.category_count().await,
        discovery.sets.len(),
        discovery.maps.len(),
        discovery.properties.len(),
        aiml_dir.display(),
    );
    Ok(())
}

async fn run_chat(aiml_dir: &Path, config_path: Option<&Path>, sraix_config_path: Option<&Path>, session_id: &str) -> Result<()> {
    let app_config = match config_path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::default(),
    };
    let sraix_config = match sraix_config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SraixConfig::default(),
    };

    let engine = Engine::new(app_config.engine, sraix_config);
    let discovery = discover(aiml_dir)?;
    load_discovery(&engine, &discovery).await?;
    println!("golem: loaded {} categories. type 'quit' to exit.", engine.category_count().await);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.is_empty() {
            continue;
        }
        let response = engine.respond(input, session_id).await?;
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Content files discovered under an AIML directory, grouped by the loader
/// each extension feeds.
#[derive(Debug, Default)]
struct Discovery {
    aiml: Vec<PathBuf>,
    sets: Vec<PathBuf>,
    maps: Vec<PathBuf>,
    properties: Vec<PathBuf>,
}

fn discover(root: &Path) -> Result<Discovery> {
    let mut found = Discovery::default();
    walk(root, &mut found)?;
    found.aiml.sort();
    found.sets.sort();
    found.maps.sort();
    found.properties.sort();
    Ok(found)
}

fn walk(dir: &Path, found: &mut Discovery) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, found)?;
            continue;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("aiml") | Some("xml") => found.aiml.push(path),
            Some("set") => found.sets.push(path),
            Some("map") => found.maps.push(path),
            Some("properties") => found.properties.push(path),
            _ => {}
        }
    }
    Ok(())
}

async fn load_discovery(engine: &Engine, discovery: &Discovery) -> Result<()> {
    for path in &discovery.properties {
        engine.load_properties_file(path).await.with_context(|| format!("loading {}", path.display()))?;
    }
    for path in &discovery.sets {
        engine.load_set_file(path).await.with_context(|| format!("loading {}", path.display()))?;
    }
    for path in &discovery.maps {
        engine.load_map_file(path).await.with_context(|| format!("loading {}", path.display()))?;
    }
    for path in &discovery.aiml {
        engine.load_aiml_file(path).await.with_context(|| format!("loading {}", path.display()))?;
    }
    Ok(())
}
