use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_GODOT_EXECUTABLE: &str = "godot";
const DEFAULT_ENGINE_VERSION_PREFIX: &str = "4.";
const DEFAULT_BUILD_TOOL: &str = "scons";
const DEFAULT_TEST_RUNNER_SCRIPT: &str = "run_tests.sh";
const DEFAULT_ARTIFACT_NAME: &str = "game";

/// Directory names relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    pub scripts_dir: PathBuf,
    pub scenes_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("scripts"),
            scenes_dir: PathBuf::from("scenes"),
            assets_dir: PathBuf::from("assets"),
            temp_dir: PathBuf::from("build/tmp"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

/// gdUnit4 locations inside the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestFrameworkConfig {
    /// Presence of this file means the framework is installed
    pub marker: PathBuf,
    pub installer: PathBuf,
    /// Script passed to the engine with `-s`
    pub entry_point: String,
    /// Suite selector used when no filter is given
    pub default_suite: String,
}

impl Default for TestFrameworkConfig {
    fn default() -> Self {
        Self {
            marker: PathBuf::from("addons/gdUnit4/plugin.cfg"),
            installer: PathBuf::from("tools/install_gdunit4.sh"),
            entry_point: "res://addons/gdUnit4/bin/GdUnitCmdTool.gd".to_string(),
            default_suite: "res://test".to_string(),
        }
    }
}

/// Per-step subprocess budgets, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub version_secs: u64,
    pub build_tool_secs: u64,
    pub import_secs: u64,
    pub export_secs: u64,
    pub install_secs: u64,
    pub tests_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            version_secs: 10,
            build_tool_secs: 10,
            import_secs: 120,
            export_secs: 300,
            install_secs: 300,
            tests_secs: 600,
        }
    }
}

/// Immutable settings shared by every gate component
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub project_dir: PathBuf,
    pub layout: ProjectLayout,
    pub godot_executable: PathBuf,
    pub expected_engine_version: String,
    pub build_tool: PathBuf,
    pub test_runner_script: PathBuf,
    pub test_framework: TestFrameworkConfig,
    pub timeouts: TimeoutConfig,
    pub parallel_checks: bool,
    pub artifact_name: String,
}

impl GateConfig {
    /// Defaults rooted at `project_dir`
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            layout: ProjectLayout::default(),
            godot_executable: PathBuf::from(DEFAULT_GODOT_EXECUTABLE),
            expected_engine_version: DEFAULT_ENGINE_VERSION_PREFIX.to_string(),
            build_tool: PathBuf::from(DEFAULT_BUILD_TOOL),
            test_runner_script: PathBuf::from(DEFAULT_TEST_RUNNER_SCRIPT),
            test_framework: TestFrameworkConfig::default(),
            timeouts: TimeoutConfig::default(),
            parallel_checks: false,
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
        }
    }

    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let file_config = match args.config.as_ref() {
            Some(path) => load_config_file(path)?,
            None => PartialConfig::default(),
        };

        let PartialConfig {
            project_dir: file_project_dir,
            layout,
            godot_executable: file_godot,
            expected_engine_version,
            build_tool,
            test_runner_script,
            test_framework,
            timeouts,
            parallel_checks,
            artifact_name,
        } = file_config;

        let project_dir = args
            .project
            .clone()
            .or(file_project_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = Self::for_project(project_dir);
        if let Some(layout) = layout {
            config.layout = layout;
        }
        if let Some(godot) = args.godot.clone().or(file_godot) {
            config.godot_executable = godot;
        }
        if let Some(prefix) = expected_engine_version {
            config.expected_engine_version = prefix;
        }
        if let Some(tool) = build_tool {
            config.build_tool = tool;
        }
        if let Some(script) = test_runner_script {
            config.test_runner_script = script;
        }
        if let Some(framework) = test_framework {
            config.test_framework = framework;
        }
        if let Some(timeouts) = timeouts {
            config.timeouts = timeouts;
        }
        if let Some(parallel) = parallel_checks {
            config.parallel_checks = parallel;
        }
        if let Some(name) = artifact_name {
            anyhow::ensure!(!name.trim().is_empty(), "artifact_name cannot be empty");
            config.artifact_name = name;
        }

        Ok(config)
    }

    pub fn with_parallel_checks(mut self, enabled: bool) -> Self {
        self.parallel_checks = enabled;
        self
    }

    pub fn resolve_path<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.project_dir.join(relative)
        }
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.resolve_path(&self.layout.scripts_dir)
    }

    pub fn scenes_dir(&self) -> PathBuf {
        self.resolve_path(&self.layout.scenes_dir)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.resolve_path(&self.layout.assets_dir)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.resolve_path(&self.layout.temp_dir)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.resolve_path(&self.layout.reports_dir)
    }

    /// Same configuration re-rooted at another project directory
    pub fn rooted_at(&self, project_dir: impl Into<PathBuf>) -> Self {
        let mut config = self.clone();
        config.project_dir = project_dir.into();
        config
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "godot-gate",
    about = "Build and validation gate for Godot projects",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "GODOT_GATE_PROJECT",
        value_name = "DIR",
        help = "Project root containing project.godot",
        global = true
    )]
    pub project: Option<PathBuf>,

    #[arg(
        long,
        env = "GODOT_EXECUTABLE",
        value_name = "PATH",
        help = "Godot executable used for headless runs",
        global = true
    )]
    pub godot: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Overall deadline; caps every subprocess timeout",
        global = true
    )]
    pub deadline_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run every validation category and print a summary
    Validate(ValidateArgs),
    /// Export the project with a named preset
    Export(ExportArgs),
    /// Install test dependencies, import assets and run the test suite
    RunTests(RunTestsArgs),
    /// Compute and persist the asset checksum manifest
    CheckIntegrity(IntegrityArgs),
    /// Run the headless asset import step on its own
    ImportAssets,
    /// Report the engine version and whether it matches the expected major version
    EngineInfo,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write a markdown report to this path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Run the rule checkers concurrently
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(long, required_unless_present = "all", requires = "output")]
    pub preset: Option<String>,

    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub debug: bool,

    /// Export every default preset
    #[arg(long, conflicts_with_all = ["preset", "output"])]
    pub all: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunTestsArgs {
    /// Restrict the run to a suite or test path
    #[arg(long)]
    pub filter: Option<String>,

    /// Generate test reports under the reports directory
    #[arg(long)]
    pub report: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IntegrityArgs {
    /// Tree to hash (defaults to the assets directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Manifest destination (defaults to <temp_dir>/asset_checksums.json)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    project_dir: Option<PathBuf>,
    layout: Option<ProjectLayout>,
    godot_executable: Option<PathBuf>,
    expected_engine_version: Option<String>,
    build_tool: Option<PathBuf>,
    test_runner_script: Option<PathBuf>,
    test_framework: Option<TestFrameworkConfig>,
    timeouts: Option<TimeoutConfig>,
    parallel_checks: Option<bool>,
    artifact_name: Option<String>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
