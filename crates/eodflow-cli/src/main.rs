//! eodflow CLI: run the end-of-day batch over two semicolon-separated tables.

mod logging;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eodflow_core::config::EngineConfig;
use eodflow_exec::{write_manifest, Engine};
use eodflow_operators::Registry;
use eodflow_planner::{parse_yaml_pipeline, reconcile, ParsedPipeline, PipelineConfig, StagePlan};

#[derive(Parser)]
#[command(name = "eodflow")]
#[command(about = "End-of-day balance batch over a staged worker-pool pipeline", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one EOD batch
    Run {
        /// Input table
        #[arg(short, long, default_value = "Before Eod.csv")]
        input: PathBuf,

        /// Output table; an existing file is used as the template
        #[arg(short, long, default_value = "After Eod.csv")]
        output: PathBuf,

        /// Stage chain YAML (defaults to the standard chain)
        #[arg(short, long)]
        pipeline: Option<PathBuf>,

        /// Worker count for stages without a pinned parallelism
        #[arg(long)]
        parallelism: Option<usize>,

        /// Batch deadline in ms (0 disables)
        #[arg(long)]
        deadline_ms: Option<u64>,

        /// Write the run manifest as JSON to this path
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Read both tables and reconcile them without running any stage
    Validate {
        /// Input table
        #[arg(short, long, default_value = "Before Eod.csv")]
        input: PathBuf,

        /// Output table (template)
        #[arg(short, long, default_value = "After Eod.csv")]
        output: PathBuf,
    },

    /// Show the resolved stage chain
    Explain {
        /// Stage chain YAML (defaults to the standard chain)
        #[arg(short, long)]
        pipeline: Option<PathBuf>,
    },
}

/// CLI flags; they override the YAML `config:` block, which overrides env.
#[derive(Debug, Default, Clone, Copy)]
struct Overrides {
    parallelism: Option<usize>,
    deadline_ms: Option<u64>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            input,
            output,
            pipeline,
            parallelism,
            deadline_ms,
            manifest,
        } => {
            let overrides = Overrides {
                parallelism,
                deadline_ms,
            };
            if let Err(e) = run_batch(
                &input,
                &output,
                pipeline.as_deref(),
                overrides,
                manifest.as_deref(),
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { input, output } => {
            if let Err(e) = validate_tables(&input, &output) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Explain { pipeline } => {
            if let Err(e) = explain_chain(pipeline.as_deref()) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_pipeline(path: Option<&Path>) -> Result<ParsedPipeline, Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            let yaml_content = fs::read_to_string(p)?;
            Ok(parse_yaml_pipeline(&yaml_content)?)
        }
        None => Ok(ParsedPipeline {
            plan: StagePlan::standard(),
            config: PipelineConfig::default(),
        }),
    }
}

fn resolve_config(base: EngineConfig, doc: &PipelineConfig, overrides: Overrides) -> EngineConfig {
    let mut cfg = base;
    doc.apply(&mut cfg);
    if let Some(n) = overrides.parallelism {
        cfg.parallelism = Some(n);
    }
    if let Some(ms) = overrides.deadline_ms {
        cfg.deadline_ms = if ms == 0 { None } else { Some(ms) };
    }
    cfg
}

fn build_engine(
    pipeline: Option<&Path>,
    overrides: Overrides,
) -> Result<Engine, Box<dyn std::error::Error>> {
    let parsed = load_pipeline(pipeline)?;
    let config = resolve_config(EngineConfig::from_env(), &parsed.config, overrides);
    config.validate()?;
    Ok(Engine::with_plan(config, parsed.plan, Registry::new()))
}

fn run_batch(
    input: &Path,
    output: &Path,
    pipeline: Option<&Path>,
    overrides: Overrides,
    manifest_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(pipeline, overrides)?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        stages = engine.plan().stages.len(),
        "running EOD batch"
    );
    let manifest = engine.run_files(input, output)?;

    if let Some(path) = manifest_path {
        write_manifest(path, &manifest)?;
    }

    let stats = manifest.stats;
    println!("✓ EOD batch finished");
    println!("  Records: {}", stats.records);
    println!("  Failed: {}", stats.failed);
    println!("  Synthesized rows: {}", stats.synthesized);
    println!("  Output rows: {}", stats.output_rows);
    println!("  Duration: {}ms", manifest.duration_ms());
    println!("  Plan hash: {}", manifest.plan_hash);
    println!("  Output: {}", output.display());

    Ok(())
}

fn validate_tables(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let input_rows = eodflow_io::read_table(input)?;
    let template = eodflow_io::read_template(output)?;
    let reconciled = reconcile(input_rows, template)?;

    println!("✓ Tables are valid");
    println!("  Input rows: {}", reconciled.input.num_rows());
    println!(
        "  Template rows: {}",
        reconciled.output.num_rows() - reconciled.synthesized
    );
    println!("  Rows to synthesize: {}", reconciled.synthesized);
    Ok(())
}

fn explain_chain(pipeline: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(pipeline, Overrides::default())?;
    let stages = engine.resolve()?;
    let cfg = engine.config();

    println!("Stage Chain");
    println!("===========");
    println!();
    match cfg.deadline_ms {
        Some(ms) => println!("Deadline: {} ms", ms),
        None => println!("Deadline: none"),
    }
    println!("Queue factor: {}", cfg.queue_factor);
    println!("Plan hash: {}", engine.plan().hash()?);
    println!();
    for (i, cs) in stages.iter().enumerate() {
        println!(
            "  {}. {} - {} workers, queue {}",
            i + 1,
            cs.stage.name(),
            cs.workers,
            cs.workers * cfg.queue_factor
        );
    }
    let sink = engine.sink_workers();
    println!(
        "  {}. sink - {} workers, queue {}",
        stages.len() + 1,
        sink,
        sink * cfg.queue_factor
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{resolve_config, EngineConfig, Overrides};
    use eodflow_planner::PipelineConfig;

    #[test]
    fn pipeline_config_overrides_env_defaults() {
        let pipeline = PipelineConfig {
            queue_factor: Some(5),
            deadline_ms: Some(1000),
            ..Default::default()
        };
        let cfg = resolve_config(EngineConfig::default(), &pipeline, Overrides::default());
        assert_eq!(cfg.queue_factor, 5);
        assert_eq!(cfg.deadline_ms, Some(1000));
    }

    #[test]
    fn cli_overrides_higher_priority_than_config() {
        let pipeline = PipelineConfig {
            parallelism: Some(2),
            deadline_ms: Some(1000),
            ..Default::default()
        };
        let overrides = Overrides {
            parallelism: Some(6),
            deadline_ms: Some(0),
        };
        let cfg = resolve_config(EngineConfig::default(), &pipeline, overrides);
        assert_eq!(cfg.parallelism, Some(6));
        assert_eq!(cfg.deadline_ms, None);
    }
}
