//! tlight - command line front end for the traffic light lab
//!
//! Single mode labels one file, batch mode walks files and folders
//! sequentially and reports accuracy against manual annotations.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::annotation::{AnnotationBook, ManualAnnotation};
use crate::batch::{CancelToken, FileResult, FileStatus, Orchestrator};
use crate::config::LabConfig;
use crate::dataset::{validate_dataset, validate_label_dir};
use crate::detect::{LabelerRegistry, LightState};
use crate::export::{
    accuracy_csv, batch_accuracy_file_name, batch_csv, batch_results_file_name,
    single_accuracy_file_name, today, write_export, BatchReport,
};
use crate::media::{collect_inputs, MediaFile};
use crate::metrics::Metrics;
use crate::store::{Action, Store};
use crate::ui::Ui;

#[derive(Parser, Debug)]
#[command(name = "tlight", author, version, about = "Simulated traffic light detection lab")]
struct Args {
    /// Config file (JSON, or TOML by extension). Overrides TLIGHT_CONFIG.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Labeler backend to use.
    #[arg(long, global = true, env = "TLIGHT_BACKEND")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Label a single image or video
    Detect {
        file: PathBuf,
        /// Ground-truth label for an accuracy comparison
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        export_dir: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Label files and folders one after another
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Annotations file (.json map or file_name,label CSV)
        #[arg(long)]
        annotations: Option<PathBuf>,
        #[arg(long)]
        export_dir: Option<PathBuf>,
        /// Also write a JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,
        /// Skip CSV exports
        #[arg(long)]
        no_export: bool,
        /// UI mode for stderr progress (auto|plain|pretty)
        #[arg(long, value_name = "MODE")]
        ui: Option<String>,
    },

    /// Check YOLO labels under a dataset root (labels/<split>, images/<split>)
    ValidateLabels {
        dir: PathBuf,
        /// Treat DIR as a single label directory checked against these images
        #[arg(long, value_name = "DIR")]
        images: Option<PathBuf>,
    },

    /// List labeler backends
    Backends,
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LabConfig::load_from(path)?,
        None => LabConfig::load()?,
    };
    if let Some(backend) = &args.backend {
        config.backend = backend.clone();
    }

    match args.command {
        Command::Detect {
            file,
            label,
            export_dir,
            json,
        } => cmd_detect(&config, &file, label.as_deref(), export_dir, json),
        Command::Batch {
            inputs,
            annotations,
            export_dir,
            report,
            no_export,
            ui,
        } => cmd_batch(
            &config,
            BatchArgs {
                inputs,
                annotations,
                export_dir,
                report,
                no_export,
                ui,
            },
        ),
        Command::ValidateLabels { dir, images } => cmd_validate_labels(&dir, images.as_deref()),
        Command::Backends => cmd_backends(&config),
    }
}

struct BatchArgs {
    inputs: Vec<PathBuf>,
    annotations: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    report: Option<PathBuf>,
    no_export: bool,
    ui: Option<String>,
}

fn build_orchestrator(config: &LabConfig) -> Result<Orchestrator> {
    let mut registry = LabelerRegistry::with_builtin();
    registry.set_default(&config.backend)?;
    registry.warm_up()?;
    log::info!(
        "labeler backend: {} (available: {})",
        config.backend,
        registry.list().join(", ")
    );
    Ok(Orchestrator::new(registry, config.batch.options()))
}

fn cmd_detect(
    config: &LabConfig,
    path: &Path,
    label: Option<&str>,
    export_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let file = MediaFile::open(path)?;
    let mut store = Store::new();
    store.dispatch(Action::SelectFile(file.clone()));
    if let Some(label) = label {
        let state: LightState = label.parse()?;
        store.dispatch(Action::Annotate(ManualAnnotation::new(&file.name, state)));
    }
    let result = store
        .run_single(&orchestrator)
        .cloned()
        .ok_or_else(|| anyhow!("no file selected"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if label.is_none() {
        return Ok(());
    }
    let Some(comparison) = store.state().single_comparison() else {
        println!("no comparison data: no traffic lights detected in {}", file.name);
        return Ok(());
    };
    println!(
        "human: {}  model: {} ({:.1}%)  {}",
        comparison.human_label,
        comparison.model_prediction,
        comparison.model_confidence * 100.0,
        if comparison.is_correct { "✓ match" } else { "✗ mismatch" }
    );
    let dir = export_dir.unwrap_or_else(|| config.export_dir.clone());
    let path = write_export(
        &dir,
        &single_accuracy_file_name(&file.name, today()),
        &accuracy_csv(std::slice::from_ref(&comparison)),
    )?;
    println!("accuracy export written to {}", path.display());
    Ok(())
}

fn cmd_batch(config: &LabConfig, args: BatchArgs) -> Result<()> {
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui_mode = args.ui.as_deref().unwrap_or(&config.ui);
    let ui = Ui::from_args(Some(ui_mode), is_tty, !stdout_is_tty);

    let orchestrator = build_orchestrator(config)?;
    let files = {
        let _stage = ui.stage("Collect media");
        collect_inputs(&args.inputs)?
    };
    let annotations = match &args.annotations {
        Some(path) => {
            let _stage = ui.stage("Load annotations");
            AnnotationBook::load(path)?
        }
        None => AnnotationBook::new(),
    };

    let mut store = Store::new();
    store.dispatch(Action::SelectFolder(files));
    for annotation in &annotations {
        store.dispatch(Action::Annotate(annotation.clone()));
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, stopping after the current file");
        handler_token.cancel();
    })
    .context("failed to install Ctrl-C handler")?;

    let progress = ui.batch_progress(store.state().batch_files.len());
    store.run_batch_with(&orchestrator, &cancel, |event| progress.observe(event));

    let state = store.state();
    for result in &state.results {
        print_result(result);
    }
    match state.metrics() {
        Some(metrics) => print_metrics(&metrics),
        None => println!("no comparison data: annotate files to see accuracy"),
    }
    if let Some(notice) = &state.notice {
        println!("{notice}");
    }

    if !args.no_export {
        let dir = args
            .export_dir
            .clone()
            .unwrap_or_else(|| config.export_dir.clone());
        let date = today();
        let _stage = ui.stage("Write exports");
        let path = write_export(&dir, &batch_results_file_name(date), &batch_csv(&state.results))?;
        println!("batch export written to {}", path.display());
        if !state.comparisons.is_empty() {
            let path = write_export(
                &dir,
                &batch_accuracy_file_name(date),
                &accuracy_csv(&state.comparisons),
            )?;
            println!("accuracy export written to {}", path.display());
        }
    }
    if let Some(report_path) = &args.report {
        let cancelled = state.results.iter().any(|r| r.status == FileStatus::Pending);
        let report = BatchReport::new(&state.results, &state.comparisons, cancelled);
        std::fs::write(report_path, report.to_json()?)
            .with_context(|| format!("writing report to {}", report_path.display()))?;
        println!("report written to {}", report_path.display());
    }
    Ok(())
}

fn cmd_validate_labels(dir: &Path, images: Option<&Path>) -> Result<()> {
    let issues = match images {
        Some(images) => validate_label_dir(dir, images)?,
        None => validate_dataset(dir)?,
    };
    if issues.is_empty() {
        println!("all annotations are valid");
        return Ok(());
    }
    println!("annotation issues found:");
    for issue in issues.iter().take(10) {
        println!("- {issue}");
    }
    if issues.len() > 10 {
        println!("... and {} more issues", issues.len() - 10);
    }
    Err(anyhow!("{} label issues in {}", issues.len(), dir.display()))
}

fn cmd_backends(config: &LabConfig) -> Result<()> {
    let registry = LabelerRegistry::with_builtin();
    for name in registry.list() {
        let marker = if name == config.backend { "*" } else { " " };
        println!("{marker} {name}");
    }
    Ok(())
}

fn print_result(result: &FileResult) {
    let status = match result.status {
        FileStatus::Error => format!(
            "error: {}",
            result.error.as_deref().unwrap_or("unknown failure")
        ),
        FileStatus::Pending => "pending".to_string(),
        FileStatus::Processing => "processing".to_string(),
        FileStatus::Completed => format!("{:.2}s", result.processing_time_secs),
    };
    println!("{} ({} bytes, {}) [{}]", result.name, result.size, result.media_type, status);
    if result.status != FileStatus::Completed {
        return;
    }
    if result.detections.is_empty() {
        println!("  no traffic lights detected");
    }
    for det in &result.detections {
        let [x1, y1, x2, y2] = det.bbox();
        println!(
            "  {:<14} {:>5.1}%  [{}, {}, {}, {}]",
            det.light_state(),
            det.confidence() * 100.0,
            x1,
            y1,
            x2,
            y2
        );
    }
}

fn print_metrics(metrics: &Metrics) {
    println!(
        "accuracy: {:.1}% ({}/{} correct)",
        metrics.accuracy, metrics.correct, metrics.total
    );
    for (state, stats) in &metrics.per_class {
        match stats.accuracy() {
            Some(accuracy) => println!(
                "  {:<14} {:>5.1}% ({}/{})",
                state, accuracy, stats.correct, stats.total
            ),
            None => println!("  {:<14}   n/a", state),
        }
    }
}
