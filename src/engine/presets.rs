//! Default `export_presets.cfg` for a fresh project
//!
//! The file is opaque to the gate: it is written once if absent and never read.

use crate::error::ExportError;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const PRESETS_FILE: &str = "export_presets.cfg";

/// One built-in export preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetDefinition {
    pub name: &'static str,
    pub platform: &'static str,
    /// Appended to the artifact name to form `build/<artifact><suffix>`
    pub output_suffix: &'static str,
    options: &'static [(&'static str, &'static str)],
}

const COMMON_OPTIONS: &[(&str, &str)] = &[
    ("custom_template/debug", "\"\""),
    ("custom_template/release", "\"\""),
    ("debug/export_console_wrapper", "1"),
];

pub const DEFAULT_PRESETS: &[PresetDefinition] = &[
    PresetDefinition {
        name: "Desktop",
        platform: "Linux/X11",
        output_suffix: "-linux",
        options: &[
            ("binary_format/embed_pck", "false"),
            ("texture_format/bptc", "true"),
            ("texture_format/s3tc", "true"),
            ("texture_format/etc", "false"),
            ("texture_format/etc2", "false"),
            ("binary_format/architecture", "\"x86_64\""),
            ("ssh_remote_deploy/enabled", "false"),
        ],
    },
    PresetDefinition {
        name: "Windows Desktop",
        platform: "Windows Desktop",
        output_suffix: "-windows.exe",
        options: &[
            ("binary_format/embed_pck", "false"),
            ("texture_format/bptc", "true"),
            ("texture_format/s3tc", "true"),
            ("binary_format/architecture", "\"x86_64\""),
            ("codesign/enable", "false"),
            ("application/modify_resources", "true"),
            ("application/icon", "\"\""),
            ("application/product_name", "\"\""),
            ("application/export_angle", "0"),
            ("ssh_remote_deploy/enabled", "false"),
        ],
    },
    PresetDefinition {
        name: "macOS",
        platform: "macOS",
        output_suffix: "-macos.zip",
        options: &[
            ("binary_format/architecture", "\"universal\""),
            ("application/icon", "\"\""),
            ("application/bundle_identifier", "\"\""),
            ("application/app_category", "\"Games\""),
            ("display/high_res", "true"),
            ("codesign/codesign", "1"),
            ("codesign/identity", "\"\""),
        ],
    },
];

impl PresetDefinition {
    pub fn output_path(&self, artifact_name: &str) -> PathBuf {
        Path::new("build").join(format!("{}{}", artifact_name, self.output_suffix))
    }
}

/// Renders the preset file body for `artifact_name`
pub fn render_presets(artifact_name: &str) -> String {
    let mut out = String::new();
    for (index, preset) in DEFAULT_PRESETS.iter().enumerate() {
        let export_path = preset.output_path(artifact_name);
        // writing to a String cannot fail
        let _ = write!(
            out,
            "[preset.{index}]\n\n\
             name=\"{name}\"\n\
             platform=\"{platform}\"\n\
             runnable=true\n\
             dedicated_server=false\n\
             custom_features=\"\"\n\
             export_filter=\"all_resources\"\n\
             include_filter=\"\"\n\
             exclude_filter=\"\"\n\
             export_path=\"{path}\"\n\
             encrypt_pck=false\n\
             encrypt_directory=false\n\n\
             [preset.{index}.options]\n\n",
            index = index,
            name = preset.name,
            platform = preset.platform,
            path = export_path.display().to_string().replace('\\', "/"),
        );
        for (key, value) in COMMON_OPTIONS.iter().chain(preset.options) {
            let _ = writeln!(out, "{}={}", key, value);
        }
        out.push('\n');
    }
    out
}

/// Writes the default presets unless the file already exists.
/// Returns whether a file was created.
pub fn ensure_presets(project_dir: &Path, artifact_name: &str) -> Result<bool, ExportError> {
    let path = project_dir.join(PRESETS_FILE);
    if path.exists() {
        return Ok(false);
    }

    tracing::info!(path = %path.display(), "creating default export presets");
    fs::write(&path, render_presets(artifact_name))
        .map_err(|source| ExportError::Presets { path, source })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_file_names_three_presets() {
        let body = render_presets("continuum");
        assert!(body.contains("[preset.0]\n\nname=\"Desktop\""));
        assert!(body.contains("name=\"Windows Desktop\""));
        assert!(body.contains("[preset.2.options]"));
        assert!(body.contains("export_path=\"build/continuum-macos.zip\""));
        assert!(body.contains("binary_format/architecture=\"universal\""));
    }

    #[test]
    fn existing_presets_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PRESETS_FILE);
        fs::write(&path, "[preset.0]\nname=\"Custom\"\n").unwrap();

        assert!(!ensure_presets(dir.path(), "game").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[preset.0]\nname=\"Custom\"\n");
    }

    #[test]
    fn missing_presets_are_created() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_presets(dir.path(), "game").unwrap());
        let body = fs::read_to_string(dir.path().join(PRESETS_FILE)).unwrap();
        assert!(body.contains("build/game-linux"));
    }

    #[test]
    fn missing_project_dir_is_an_io_error() {
        let err = ensure_presets(Path::new("/nonexistent/project"), "game").unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Io);
    }
}
