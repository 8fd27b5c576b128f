//! # Provisioner Configuration Validator
//!
//! Command-line tool for validating provisioner configuration across
//! environments before starting the engine.

use clap::{Parser, Subcommand};
use provisioner_core::config::ConfigManager;
use serde_json::Value;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate provisioner configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: config/provisioner)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format for `show` (json, yaml)
    #[arg(long, default_value = "json")]
    format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the configuration
    Validate,

    /// Print the effective configuration
    Show,

    /// List environments with an override file
    Environments,

    /// Compare effective configurations of two environments
    Compare {
        /// Base environment for comparison
        #[arg(short, long, default_value = "development")]
        base: String,

        /// Target environment for comparison
        #[arg(short, long)]
        target: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::Validate) | None => validate(&cli),
        Some(Commands::Show) => show(&cli),
        Some(Commands::Environments) => list_environments(&cli),
        Some(Commands::Compare { base, target }) => compare(&cli, base, target),
    };

    match result {
        Ok(()) => {
            info!("Configuration check completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration check failed: {}", e);
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli, environment: &str) -> provisioner_core::Result<Arc<ConfigManager>> {
    ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), environment)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating provisioner configuration");
    println!("Environment: {}", cli.environment);

    let manager = load(cli, &cli.environment)?;
    let config = manager.config();

    println!("Config Directory: {}", manager.config_directory().display());
    println!();
    println!("  max concurrent jobs:   {}", config.orchestrator.max_concurrent_jobs);
    println!("  development env:       {}", config.environments.development);
    println!("  managed workspaces:    {}", config.workspace.managed);
    println!("  region:                {}", config.workspace.region);
    println!("  git provider:          {}", config.git.provider);
    println!(
        "  templates:             {} job, {} pipeline, {} workflow, {} output port",
        config.templates.job.len(),
        config.templates.pipeline.len(),
        config.templates.workflow.len(),
        config.templates.output_port.len()
    );
    println!();
    println!("All configuration validation checks passed");
    Ok(())
}

fn show(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let manager = load(cli, &cli.environment)?;
    let effective = manager.debug_config()?;

    match cli.format.to_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&effective)?),
        "yaml" => print!("{}", serde_yaml::to_string(&effective)?),
        other => return Err(format!("Unknown output format: {other}").into()),
    }
    Ok(())
}

fn list_environments(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("config/provisioner"));

    if !dir.exists() {
        println!("Configuration directory not found: {}", dir.display());
        return Ok(());
    }

    let mut environments = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        let is_yaml = path.extension().and_then(|e| e.to_str()) == Some("yaml");
        if let (true, Some(stem)) = (is_yaml, path.file_stem().and_then(|s| s.to_str())) {
            if stem != "base" {
                environments.push(stem.to_string());
            }
        }
    }
    environments.sort();

    println!("Available environments in {}:", dir.display());
    for env in environments {
        println!("  - {env}");
    }
    Ok(())
}

fn compare(cli: &Cli, base: &str, target: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("Comparing configurations: {base} vs {target}");

    let base_config = load(cli, base)?.debug_config()?;
    let target_config = load(cli, target)?.debug_config()?;

    let mut differences = Vec::new();
    diff("", &base_config, &target_config, &mut differences);

    if differences.is_empty() {
        println!("No differences");
    } else {
        for (path, left, right) in differences {
            println!("  {path}: {left} -> {right}");
        }
    }
    Ok(())
}

fn diff(path: &str, left: &Value, right: &Value, out: &mut Vec<(String, Value, Value)>) {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut keys: Vec<&String> = l.keys().chain(r.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                diff(
                    &child,
                    l.get(key).unwrap_or(&Value::Null),
                    r.get(key).unwrap_or(&Value::Null),
                    out,
                );
            }
        }
        _ if left != right => out.push((path.to_string(), left.clone(), right.clone())),
        _ => {}
    }
}
