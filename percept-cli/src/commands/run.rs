//! Run command: drive a recognition session from a config file.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Args;
use percept::backend::{Backend, LandmarkBackend, ReqwestClient, VlmBackend, VlmConfig};
use percept::config::{ApproachSpec, ConfigFile};
use percept::engine::SessionSummary;
use percept::{ApproachId, BackendRegistry, Engine};

use crate::error::CliError;
use crate::sink::SessionSink;
use crate::source::{ReplaySource, SyntheticSource};

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Stop after this many frames (default: run until interrupted)
    #[arg(long)]
    pub frames: Option<u64>,

    /// Replay recorded frame payloads from a JSON-lines file instead of
    /// generating synthetic frames
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Append per-frame metrics to a CSV file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,
}

/// Run a recognition session.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let file = ConfigFile::load(&args.config)?;
    let config = file.to_engine_config()?;
    let registry = build_registry(&file, &config.approach_order)?;

    println!("Percept v{}", percept::VERSION);
    println!("==========");
    println!();
    println!("Mode:      {}", config.mode);
    println!("Approach:  {}", config.starting_approach);
    println!("Interval:  {}ms", config.frame_interval.as_millis());
    println!();
    println!("Press Ctrl+C to end the session");
    println!();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, ending session...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Usage(format!("failed to set signal handler: {e}")))?;

    let engine = Engine::new(&config, registry)?;
    let mut sink = match &args.csv {
        Some(path) => SessionSink::with_csv(path)?,
        None => SessionSink::new(),
    };

    let summary = match &args.input {
        Some(path) => {
            let mut source = ReplaySource::open(path, args.frames)?;
            engine.run(&mut source, &mut sink, shutdown)
        }
        None => {
            let mut source = SyntheticSource::new(args.frames);
            engine.run(&mut source, &mut sink, shutdown)
        }
    };

    print_summary(&summary);
    Ok(())
}

/// Instantiate a factory for every configured approach, in fallback order.
fn build_registry(
    file: &ConfigFile,
    order: &[ApproachId],
) -> Result<BackendRegistry, CliError> {
    let mut registry = BackendRegistry::new();
    for id in order {
        let Some(spec) = file.approach_spec(id) else {
            // to_engine_config already validated the starting approach; a
            // hole here means the order and the map disagree.
            return Err(CliError::Usage(format!(
                "approach '{id}' has no definition under 'approaches'"
            )));
        };
        match spec.clone() {
            ApproachSpec::Landmark => {
                registry.register(
                    id.clone(),
                    Box::new(|| Ok(Box::new(LandmarkBackend::new()) as Box<dyn Backend>)),
                )?;
            }
            ApproachSpec::Vlm {
                endpoint,
                model,
                timeout_secs,
            } => {
                registry.register(
                    id.clone(),
                    Box::new(move || {
                        let mut config = VlmConfig::new(endpoint.clone());
                        if let Some(model) = &model {
                            config = config.with_model(model.clone());
                        }
                        let client = match timeout_secs {
                            Some(secs) => ReqwestClient::with_timeout(secs)?,
                            None => ReqwestClient::new()?,
                        };
                        Ok(Box::new(VlmBackend::new(config, client)) as Box<dyn Backend>)
                    }),
                )?;
            }
        }
    }
    Ok(registry)
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Session Summary");
    println!("===============");
    println!("Frames processed:  {}", summary.frames_processed);
    println!("Frames skipped:    {}", summary.frames_failed);
    println!("Deadline misses:   {}", summary.deadline_misses);
    println!(
        "Worst frame:       {:.1}ms",
        summary.worst_frame.as_secs_f64() * 1000.0
    );
    println!(
        "Elapsed:           {:.1}s ({:.2} fps effective)",
        summary.elapsed.as_secs_f64(),
        summary.effective_fps()
    );
    println!("Final approach:    {}", summary.final_approach);
    if summary.switches.is_empty() {
        println!("Switches:          none");
    } else {
        println!("Switches:          {}", summary.switches.len());
        for event in &summary.switches {
            let fields: Vec<String> = event
                .violated_fields
                .iter()
                .map(|f| f.to_string())
                .collect();
            println!(
                "  {} -> {} (violated: {})",
                event.from,
                event.to,
                fields.join(", ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(json: &str) -> ConfigFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        ConfigFile::load(file.path()).unwrap()
    }

    #[test]
    fn test_registry_built_in_fallback_order() {
        let file = config_file(
            r#"{
                "mode": "dynamic",
                "approach": "vlm",
                "dynamic": { "enabled": true },
                "approaches": {
                    "landmark": { "kind": "landmark" },
                    "vlm": { "kind": "vlm", "endpoint": "http://127.0.0.1:8080" }
                }
            }"#,
        );
        let config = file.to_engine_config().unwrap();
        let registry = build_registry(&file, &config.approach_order).unwrap();

        let ids: Vec<_> = registry.ids().cloned().collect();
        assert_eq!(
            ids,
            vec![ApproachId::new("vlm"), ApproachId::new("landmark")]
        );
    }

    #[test]
    fn test_landmark_factory_produces_working_backend() {
        let file = config_file(
            r#"{
                "mode": "static",
                "approach": "landmark",
                "approaches": { "landmark": { "kind": "landmark" } }
            }"#,
        );
        let config = file.to_engine_config().unwrap();
        let registry = build_registry(&file, &config.approach_order).unwrap();

        let mut backend = registry.create(&ApproachId::new("landmark")).unwrap();
        backend.start().unwrap();
        assert_eq!(backend.name(), "landmark");
    }
}
