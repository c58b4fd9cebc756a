//! Plugin relay CLI
//!
//! Entry point for the `relay` command-line tool.

use clap::{Parser, Subcommand};
use plugin_relay::config::{merge_layers, parse_override, EffectiveConfig, PROJECT_CONFIG_FILE};
use plugin_relay::{CacheKey, FailureKind, FileTask};
use relay_cache::{CacheBackend, DirBackend};
use serde_json::Value;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Plugin invocation relay for file compilation pipelines", version)]
struct Cli {
    /// Path to project config file (default: relay.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Override a config value, e.g. --set cache.enabled=false
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    overrides: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cache key of each file for a plugin
    Key {
        /// Plugin definition hashed into the key
        #[arg(long, short = 'p')]
        plugin: String,

        /// Plugin options as a JSON object
        #[arg(long, default_value = "{}")]
        options: String,

        /// Also look the key up in the directory cache
        #[arg(long)]
        cached: bool,

        /// Files to key
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_config(cli.config, &cli.overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(FailureKind::Configuration.exit_code());
        }
    };

    match cli.command {
        Commands::Key {
            plugin,
            options,
            cached,
            files,
        } => run_key(&config, &plugin, &options, cached, files).await,
        Commands::Config => run_config(&config),
    }
}

/// Log filter from `RELAY_LOG`, then `RUST_LOG`, defaulting to warnings.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("RELAY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>, overrides: &[String]) -> Result<EffectiveConfig, String> {
    let path = path.unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    let cli = if overrides.is_empty() {
        None
    } else {
        let layers = overrides
            .iter()
            .map(|o| parse_override(o))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;
        Some(merge_layers(layers))
    };
    EffectiveConfig::build(Some(&path), cli).map_err(|e| e.to_string())
}

fn run_config(config: &EffectiveConfig) {
    match config.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

async fn run_key(
    config: &EffectiveConfig,
    plugin: &str,
    options: &str,
    cached: bool,
    files: Vec<PathBuf>,
) {
    let options: Value = match serde_json::from_str(options) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Invalid --options JSON: {}", e);
            process::exit(FailureKind::Configuration.exit_code());
        }
    };

    let build = config.build_config();
    let namespace = format!("{}/{}", build.product_or_default(), plugin);
    let cache = if cached {
        match DirBackend::new(build.cache_dir.clone()).open(&namespace) {
            Ok(client) => Some(client),
            Err(e) => {
                eprintln!("Error opening cache {}: {}", namespace, e);
                process::exit(FailureKind::Cache.exit_code());
            }
        }
    } else {
        None
    };

    let mut output = Vec::with_capacity(files.len());
    for path in files {
        let file = FileTask::from_disk(&path);
        let key = match CacheKey::for_file(plugin, &options, &file).await {
            Ok(k) => k,
            Err(e) => {
                eprintln!("Error keying {}: {}", path.display(), e);
                process::exit(FailureKind::File.exit_code());
            }
        };

        let mut entry = serde_json::json!({
            "file": path.display().to_string(),
            "namespace": namespace,
            "key": key.as_str(),
        });
        if let Some(cache) = &cache {
            match cache.get(key.as_str()).await {
                Ok(value) => entry["cached"] = Value::Bool(value.is_some()),
                Err(e) => {
                    eprintln!("Error reading cache for {}: {}", path.display(), e);
                    process::exit(FailureKind::Cache.exit_code());
                }
            }
        }
        output.push(entry);
    }

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
