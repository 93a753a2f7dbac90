#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use godot_gate::checks::StructureManifest;
use godot_gate::{GateConfig, ProcessRequest, ProcessResult, ProcessRunner};
use tempfile::{TempDir, tempdir};

pub const SOUND_MANAGER: &str = "extends Node\n\n\
func generate_sound(freq: float) -> AudioStreamWAV:\n\treturn null\n\n\
func play_sound(name: String) -> void:\n\tpass\n\n\
func create_laser_shot() -> AudioStreamWAV:\n\treturn generate_sound(880.0)\n\n\
func create_explosion() -> AudioStreamWAV:\n\treturn generate_sound(60.0)\n";

/// A project tree that passes every rule checker
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    pub fn complete() -> Self {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();

        let manifest = StructureManifest::default();
        for d in &manifest.directories {
            fs::create_dir_all(root.join(d)).expect("create dir");
        }
        for f in &manifest.files {
            fs::write(root.join(f), "").expect("write file");
        }

        for scene in ["main/Main.tscn", "main/Game.tscn", "player/Player.tscn"] {
            fs::write(root.join("scenes").join(scene), "[gd_scene format=3]\n").expect("scene");
        }
        for sub in ["textures", "audio", "fonts"] {
            fs::create_dir_all(root.join("assets").join(sub)).expect("asset dir");
        }
        fs::write(root.join("scripts/autoloads/SynthSoundManager.gd"), SOUND_MANAGER)
            .expect("sound manager");
        fs::write(
            root.join("scripts/player/Player.gd"),
            "extends CharacterBody2D\n\nfunc _ready() -> void:\n\tprint(\"DEBUG: ready\")\n",
        )
        .expect("player script");
        fs::write(root.join("run_tests.sh"), "#!/bin/sh\nexit 0\n").expect("runner script");
        make_executable(&root.join("run_tests.sh"));

        fs::create_dir_all(root.join("addons/gdUnit4")).expect("addon dir");
        fs::write(root.join("addons/gdUnit4/plugin.cfg"), "[plugin]\n").expect("marker");

        Self { dir }
    }

    pub fn empty() -> Self {
        Self {
            dir: tempdir().expect("tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, content).expect("write");
        path
    }

    /// Writes an executable shell script
    pub fn script(&self, relative: &str, body: &str) -> PathBuf {
        let path = self.write(relative, &format!("#!/bin/sh\n{}", body));
        make_executable(&path);
        path
    }

    /// Config rooted here; the engine is a path that resolves to a file
    pub fn config(&self) -> GateConfig {
        let mut config = GateConfig::for_project(self.root());
        let engine = self.path("bin/godot");
        if !engine.exists() {
            self.write("bin/godot", "");
        }
        config.godot_executable = engine;
        config
    }
}

/// Engine stand-in: `--version` prints a 4.x version, the import step exits
/// with `import_exit`, anything else is a test run exiting with `test_exit`.
/// A test run given `-rd <dir>` writes an HTML report there.
pub fn stub_engine_body(import_exit: i32, test_exit: i32) -> String {
    format!(
        "prev=\"\"\n\
         report_dir=\"\"\n\
         for arg in \"$@\"; do\n\
         \tcase \"$arg\" in\n\
         \t\t--version) echo \"4.2.1.stable.official\"; exit 0 ;;\n\
         \t\t--quit-after) echo \"import failed\" >&2; exit {import_exit} ;;\n\
         \tesac\n\
         \tif [ \"$prev\" = \"-rd\" ]; then report_dir=\"$arg\"; fi\n\
         \tprev=\"$arg\"\n\
         done\n\
         echo \"Overall Summary: 3 test cases | 0 errors | 0 failures\"\n\
         if [ -n \"$report_dir\" ]; then\n\
         \tmkdir -p \"$report_dir/report_1\" && echo \"<html></html>\" > \"$report_dir/report_1/index.html\"\n\
         fi\n\
         exit {test_exit}\n"
    )
}

/// Engine stand-in whose import succeeds and whose test run prints progress,
/// then hangs
pub fn hanging_engine_body() -> String {
    "for arg in \"$@\"; do\n\
     \tcase \"$arg\" in\n\
     \t\t--quit-after) exit 0 ;;\n\
     \tesac\n\
     done\n\
     echo \"Running suite res://test\"\n\
     echo \"test_player_moves PASSED\"\n\
     sleep 30\n"
        .to_string()
}

#[cfg(unix)]
pub fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) {}

/// Counts calls and delegates to an inner runner
pub struct CountingRunner {
    inner: Arc<dyn ProcessRunner>,
    calls: AtomicUsize,
}

impl CountingRunner {
    pub fn new(inner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for CountingRunner {
    async fn run(&self, request: ProcessRequest) -> ProcessResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.run(request).await
    }
}

/// Succeeds every request, reporting a 4.x version on stdout
pub struct HealthyToolchain;

#[async_trait]
impl ProcessRunner for HealthyToolchain {
    async fn run(&self, _request: ProcessRequest) -> ProcessResult {
        ProcessResult::exited(0, "4.2.1.stable", "")
    }
}
