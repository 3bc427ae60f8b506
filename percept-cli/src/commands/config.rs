//! Configuration CLI commands.
//!
//! `config validate` checks a config file without starting a session;
//! `config show` prints the effective settings after defaults are applied.

use std::path::PathBuf;

use clap::Subcommand;
use percept::config::ConfigFile;

use crate::error::CliError;

/// Starter configuration written by `config init`.
const DEFAULT_CONFIG: &str = r#"{
    "mode": "dynamic",
    "approach": "landmark",
    "capture": { "interval_ms": 1000 },
    "dynamic": {
        "enabled": true,
        "performance_thresholds": {
            "max_latency_ms": 1000.0,
            "max_cpu_percent": 80.0,
            "max_memory_mb": 2000.0,
            "min_fps": 0.8
        },
        "evaluation_window": 5,
        "switch_cooldown_seconds": 10.0
    },
    "approaches": {
        "landmark": { "kind": "landmark" },
        "vlm": { "kind": "vlm", "endpoint": "http://127.0.0.1:8080" }
    }
}
"#;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a starter configuration file
    Init {
        /// Where to write the file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a configuration file for errors
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Print the effective configuration after defaults
    Show {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { config, force } => run_init(&config, force),
        ConfigCommands::Validate { config } => run_validate(&config),
        ConfigCommands::Show { config } => run_show(&config),
    }
}

fn run_init(path: &PathBuf, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Usage(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        )));
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_validate(path: &PathBuf) -> Result<(), CliError> {
    let file = ConfigFile::load(path)?;
    file.to_engine_config()?;
    println!("{} is valid", path.display());
    Ok(())
}

fn run_show(path: &PathBuf) -> Result<(), CliError> {
    let file = ConfigFile::load(path)?;
    let config = file.to_engine_config()?;

    println!("Effective Configuration");
    println!("=======================");
    println!();
    println!("mode:               {}", config.mode);
    println!("starting approach:  {}", config.starting_approach);
    println!(
        "frame interval:     {}ms",
        config.frame_interval.as_millis()
    );
    println!(
        "approach order:     {}",
        config
            .approach_order
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("[dynamic]");
    println!(
        "  evaluation window:  {} samples",
        config.dynamic.evaluation_window
    );
    println!(
        "  switch cooldown:    {:.1}s",
        config.dynamic.switch_cooldown.as_secs_f64()
    );
    let t = config.dynamic.thresholds;
    println!("  max latency:        {:.0}ms", t.max_latency_ms);
    println!("  max cpu:            {:.0}%", t.max_cpu_percent);
    println!("  max memory:         {:.0}MB", t.max_memory_mb);
    println!("  min fps:            {:.2}", t.min_fps);

    Ok(())
}
