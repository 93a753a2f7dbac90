pub mod checks;
pub mod checksum;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod process;
pub mod shutdown;
pub mod validate;

pub use checks::{CheckOutcome, RuleChecker};
pub use checksum::{ChecksumManifest, ChecksumStore};
pub use config::{CliArgs, Command, GateConfig, OutputFormat};
pub use engine::{
    DependencyInstaller, Engine, ExportOrchestrator, ExportTarget, TestOrchestrator, TestReport,
    TestRunConfig,
};
pub use error::FailureKind;
pub use logging::{LoggingConfig, init_logging};
pub use process::{ProcessRequest, ProcessResult, ProcessRunner, SystemProcessRunner};
pub use validate::{ValidationAggregator, ValidationSummary};

use anyhow::{Context, Result};
use config::{ExportArgs, IntegrityArgs, RunTestsArgs, ValidateArgs};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Executes one CLI command. `Ok(false)` means the command ran and failed;
/// `Err` means it could not run at all. Both map to exit code 1.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config = Arc::new(GateConfig::from_args(&args)?);

    let cancel = CancellationToken::new();
    let watcher = shutdown::cancel_on_signal(cancel.clone());

    let mut runner = SystemProcessRunner::new().with_cancellation(cancel.clone());
    if let Some(secs) = args.deadline_secs {
        runner = runner.with_deadline(Instant::now() + Duration::from_secs(secs));
    }
    let runner: Arc<dyn ProcessRunner> = Arc::new(runner);

    tracing::debug!(
        project = %config.project_dir.display(),
        godot = %config.godot_executable.display(),
        "configuration resolved"
    );

    let result = match args.command {
        Command::Validate(cmd) => run_validation(config, runner, cmd).await,
        Command::Export(cmd) => export(config, runner, cmd).await,
        Command::RunTests(cmd) => run_tests(config, runner, cmd).await,
        Command::CheckIntegrity(cmd) => check_integrity(&config, cmd),
        Command::ImportAssets => import_assets(&config, runner).await,
        Command::EngineInfo => engine_info(&config, runner).await,
    };

    cancel.cancel();
    let _ = watcher.await;
    result
}

async fn run_validation(
    config: Arc<GateConfig>,
    runner: Arc<dyn ProcessRunner>,
    cmd: ValidateArgs,
) -> Result<bool> {
    let config = if cmd.parallel {
        Arc::new((*config).clone().with_parallel_checks(true))
    } else {
        config
    };
    let root = config.project_dir.clone();
    let summary = ValidationAggregator::new(config, runner).run_all(&root).await;

    let rendered = match cmd.format {
        OutputFormat::Text => validate::render_text(&summary),
        OutputFormat::Json => validate::render_json(&summary).context("Failed to render summary")?,
        OutputFormat::Markdown => validate::render_markdown(&summary),
    };
    println!("{}", rendered.trim_end());

    if let Some(path) = cmd.report {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, validate::render_markdown(&summary))
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        tracing::info!(path = %path.display(), "validation report written");
    }

    Ok(summary.overall_passed)
}

async fn export(
    config: Arc<GateConfig>,
    runner: Arc<dyn ProcessRunner>,
    cmd: ExportArgs,
) -> Result<bool> {
    let orchestrator = ExportOrchestrator::new(config, runner);

    let project = orchestrator.validate_project();
    if !project.passed() {
        for issue in project.issues() {
            eprintln!("{}", issue);
        }
        return Ok(false);
    }
    orchestrator.prepare()?;

    let targets = if cmd.all {
        orchestrator.default_targets(cmd.debug)
    } else {
        let preset = cmd.preset.context("--preset is required unless --all is given")?;
        let output = cmd.output.context("--output is required with --preset")?;
        vec![ExportTarget::new(preset, output).debug(cmd.debug)]
    };

    let failures = orchestrator.export_all(&targets).await;
    for failure in &failures {
        eprintln!("{}", failure);
    }
    if failures.is_empty() {
        println!("Exported {} target(s)", targets.len());
    }
    Ok(failures.is_empty())
}

async fn run_tests(
    config: Arc<GateConfig>,
    runner: Arc<dyn ProcessRunner>,
    cmd: RunTestsArgs,
) -> Result<bool> {
    let run = TestRunConfig {
        filter: cmd.filter,
        generate_report: cmd.report,
    };

    match TestOrchestrator::new(config, runner).run_tests(&run).await {
        Ok(report) => {
            if let Some(warning) = &report.import_warning {
                eprintln!("warning: asset import failed ({}); tests ran anyway", warning);
            }
            if report.passed {
                println!("All tests passed");
            } else {
                println!("Tests failed");
                for line in report.failure_tail() {
                    println!("  {}", line);
                }
            }
            if let Some(path) = &report.report_path {
                println!("Reports: {}", path.display());
            }
            Ok(report.passed)
        }
        Err(err) => {
            eprintln!("{}", err);
            Ok(false)
        }
    }
}

fn check_integrity(config: &GateConfig, cmd: IntegrityArgs) -> Result<bool> {
    let root = cmd
        .root
        .map(|root| config.resolve_path(root))
        .unwrap_or_else(|| config.assets_dir());
    let dest = cmd
        .output
        .map(|out| config.resolve_path(out))
        .unwrap_or_else(|| ChecksumStore::default_destination(&config.temp_dir()));

    let store = ChecksumStore::new();
    let manifest = store.compute_manifest(&root);
    store.persist(&manifest, &dest)?;

    println!(
        "Checksums for {} file(s) written to {}",
        manifest.len(),
        dest.display()
    );
    if !manifest.skipped.is_empty() {
        eprintln!("{} file(s) skipped", manifest.skipped.len());
    }
    Ok(true)
}

async fn import_assets(config: &GateConfig, runner: Arc<dyn ProcessRunner>) -> Result<bool> {
    let result = Engine::from_config(config)
        .import_assets(runner.as_ref(), config.timeouts.import_secs)
        .await;
    if let Some(reason) = result.failure_reason() {
        eprintln!("Asset import failed: {}", reason);
        for line in result.tail_lines(10) {
            eprintln!("  {}", line);
        }
        return Ok(false);
    }
    println!("Asset import successful");
    Ok(true)
}

async fn engine_info(config: &GateConfig, runner: Arc<dyn ProcessRunner>) -> Result<bool> {
    let version = Engine::from_config(config)
        .query_version(
            runner.as_ref(),
            &config.expected_engine_version,
            config.timeouts.version_secs,
        )
        .await?;

    println!("Godot {}", version.raw);
    if !version.matches_expected {
        println!(
            "warning: expected a version starting with '{}'",
            config.expected_engine_version
        );
    }
    Ok(true)
}
