//! pbf CLI - slice meshes and generate scan vectors for powder-bed builds.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pbf_export::{build_layer_records, ExportMetadata, HatchStatistics, JsonLayerWriter, LayerWriter};
use pbf_hatch::{HatchPattern, HatchRegistry};
use pbf_pipeline::{
    load_mesh, JobSupervisor, ModelConfig, ModelInput, OperationKind, Pipeline, PipelineConfig,
    PipelineIssue, Progress, RunReport, SlicedModel,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pbf")]
#[command(about = "Slice meshes and generate scan vectors for powder-bed fusion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Slice models and print the section summary
    Slice {
        #[command(flatten)]
        job: JobArgs,
    },
    /// Slice and hatch models, writing per-layer scan vectors as JSON
    Hatch {
        #[command(flatten)]
        job: JobArgs,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Slice and hatch models and print build statistics
    Stats {
        #[command(flatten)]
        job: JobArgs,
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the available hatching strategies
    Strategies,
}

#[derive(Args)]
struct JobArgs {
    /// TOML job file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Extra mesh hand-off files, placed with the default transform
    #[arg(short, long)]
    mesh: Vec<PathBuf>,
    /// Override the layer thickness (mm)
    #[arg(short = 't', long)]
    layer_thickness: Option<f64>,
    /// Override the hatching strategy
    #[arg(short, long)]
    pattern: Option<HatchPattern>,
}

impl JobArgs {
    fn load(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("loading job {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        config.models.extend(self.mesh.iter().map(|mesh| ModelConfig {
            mesh: mesh.clone(),
            transform: Default::default(),
        }));
        if let Some(thickness) = self.layer_thickness {
            config.layer_thickness = thickness;
        }
        if let Some(pattern) = self.pattern {
            config.pattern = pattern;
        }
        config.validate()?;
        if config.models.is_empty() {
            bail!("no models given; pass --mesh or a job file with [[models]]");
        }
        Ok(config)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_models(config: &PipelineConfig) -> Result<Vec<ModelInput>> {
    config
        .models
        .iter()
        .map(|m| {
            let mesh = load_mesh(&m.mesh)
                .with_context(|| format!("loading mesh {}", m.mesh.display()))?;
            Ok(ModelInput {
                mesh,
                transform: m.transform,
            })
        })
        .collect()
}

/// Forward progress events to the log until the sender is dropped.
fn log_progress() -> (Progress, tokio::task::JoinHandle<()>) {
    let (progress, mut rx) = Progress::channel();
    let task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::debug!(current = event.current, total = event.total, "{}", event.message);
        }
    });
    (progress, task)
}

fn print_issues(issues: &[PipelineIssue]) {
    for issue in issues {
        eprintln!("warning: {issue}");
    }
}

async fn run_pipeline(config: &PipelineConfig) -> Result<RunReport> {
    let models = load_models(config)?;
    let pipeline = Pipeline::from_config(config);
    let (progress, listener) = log_progress();

    let supervisor = JobSupervisor::new();
    let job = supervisor.submit(0, OperationKind::Hatch, move |cancel| {
        pipeline.run(&models, &cancel, &progress)
    });
    let report = job.join().await?;
    listener.await?;
    print_issues(&report.issues);
    Ok(report)
}

async fn slice_models(config: &PipelineConfig) -> Result<Vec<SlicedModel>> {
    let models = load_models(config)?;
    let pipeline = Pipeline::from_config(config);
    let (progress, listener) = log_progress();

    let supervisor = JobSupervisor::new();
    let job = supervisor.submit(0, OperationKind::Slice, move |cancel| {
        let mut issues = Vec::new();
        let sliced = models
            .iter()
            .enumerate()
            .map(|(i, model)| pipeline.slice_model(i, model, &cancel, &progress, &mut issues))
            .collect::<pbf_pipeline::Result<Vec<_>>>()?;
        Ok((sliced, issues))
    });
    let (sliced, issues) = job.join().await?;
    listener.await?;
    print_issues(&issues);
    Ok(sliced)
}

fn print_sections(config: &PipelineConfig, sliced: &[SlicedModel]) {
    for (model, result) in config.models.iter().zip(sliced) {
        let b = &result.world_bounds;
        println!("Model: {}", model.mesh.display());
        println!(
            "  Bounds: [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
            b.min[0], b.min[1], b.min[2], b.max[0], b.max[1], b.max[2]
        );
        println!("  Layers: {}", result.layers.len());
        println!("  Sections: {}", result.sections.len());
        for section in &result.sections {
            println!(
                "    layers {:>5}-{:<5} z {:.4}-{:.4}  {} segments",
                section.start_layer,
                section.end_layer,
                section.z_start,
                section.z_end,
                section.segments.len()
            );
        }
    }
}

fn write_records(
    config: &PipelineConfig,
    report: &RunReport,
    output: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let records = build_layer_records(&report.combined_hatching(), config.layer_thickness);
    let metadata = ExportMetadata::from_parameters(config.layer_thickness, &config.hatching);
    let writer = JsonLayerWriter { pretty };
    match output {
        Some(path) => writer
            .write_to_path(&records, &metadata, path)
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let stdout = std::io::stdout();
            writer.write_layers(&records, &metadata, &mut stdout.lock())?;
            println!();
        }
    }
    Ok(())
}

fn print_stats(stats: &HatchStatistics) {
    println!("Layers: {}", stats.total_layers);
    println!(
        "Lines: {} ({} contour, {} infill)",
        stats.total_lines, stats.contour_lines, stats.infill_lines
    );
    println!(
        "Scan length: {:.1} mm ({:.1} contour, {:.1} infill)",
        stats.total_scan_length, stats.contour_length, stats.infill_length
    );
    println!("Jump length: {:.1} mm", stats.jump_length);
    println!("Estimated scan time: {:.1} s", stats.estimated_time_seconds);
    println!("Average lines per layer: {:.1}", stats.avg_lines_per_layer);
}

fn list_strategies() {
    let registry = HatchRegistry::with_builtins();
    for pattern in registry.patterns() {
        if let Some(strategy) = registry.get(pattern) {
            println!("{:<12} {:<22} {}", pattern, strategy.name(), strategy.description());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Slice { job } => {
            let config = job.load()?;
            let sliced = slice_models(&config).await?;
            print_sections(&config, &sliced);
        }
        Commands::Hatch {
            job,
            output,
            pretty,
        } => {
            let config = job.load()?;
            let report = run_pipeline(&config).await?;
            write_records(&config, &report, output.as_deref(), pretty)?;
        }
        Commands::Stats { job, json } => {
            let config = job.load()?;
            let report = run_pipeline(&config).await?;
            let stats = HatchStatistics::from_hatching(&report.combined_hatching());
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
        Commands::Strategies => list_strategies(),
    }

    Ok(())
}
