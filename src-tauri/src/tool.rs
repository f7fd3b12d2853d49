//! Conversion tool capability.
//!
//! The actual height-to-normal math lives in an external script; this
//! module models one invocation of it behind [`ConversionTool`] so the
//! batch runner can be exercised without spawning processes.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;

use crate::params::{OutputFormat, Strength};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("cannot resolve input path {}: {source}", .path.display())]
    Resolve { path: PathBuf, source: io::Error },
    #[error("conversion tool failed to start: {0}")]
    Spawn(io::Error),
    #[error("conversion tool exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("conversion tool reported success but wrote no output at {}", .0.display())]
    MissingOutput(PathBuf),
}

pub trait ConversionTool {
    /// Whether the tool's entry point is present. Checked once per batch
    /// before any job is attempted.
    fn is_available(&self) -> bool;

    fn convert(
        &self,
        input: &Path,
        strength: Strength,
        format: OutputFormat,
    ) -> Result<PathBuf, ToolError>;
}

/// Canonical output naming contract shared with the external script:
/// `{source_dir}/{source_stem}_normal.{format}`, next to the source image.
pub fn expected_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}_normal.{}", format.as_str()))
}

/// Interpreter the external script runs under.
pub fn python_interpreter() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("python")
    } else {
        PathBuf::from("python3")
    }
}

/// The real tool: `interpreter script <abs_input> <strength> <format>`.
pub struct ScriptTool {
    interpreter: PathBuf,
    script: PathBuf,
}

impl ScriptTool {
    pub fn new(interpreter: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.script
    }
}

impl ConversionTool for ScriptTool {
    fn is_available(&self) -> bool {
        self.script.is_file()
    }

    fn convert(
        &self,
        input: &Path,
        strength: Strength,
        format: OutputFormat,
    ) -> Result<PathBuf, ToolError> {
        let input = input.canonicalize().map_err(|source| ToolError::Resolve {
            path: input.to_path_buf(),
            source,
        })?;

        // The child inherits our working directory on purpose: the script
        // writes its output relative to the absolute input path, never
        // relative to the install directory.
        let output = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(&input)
            .arg(strength.to_string())
            .arg(format.as_str())
            .output()
            .map_err(ToolError::Spawn)?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Exit code 0 alone is not trusted; the artifact must be there.
        let expected = expected_output_path(&input, format);
        if !expected.is_file() {
            return Err(ToolError::MissingOutput(expected));
        }
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn output_path_sits_next_to_the_source() {
        let out = expected_output_path(Path::new("/assets/rock.png"), OutputFormat::Png);
        assert_eq!(out, PathBuf::from("/assets/rock_normal.png"));
        let out = expected_output_path(Path::new("/assets/bump.height.jpg"), OutputFormat::Exr);
        assert_eq!(out, PathBuf::from("/assets/bump.height_normal.exr"));
    }

    #[test]
    fn availability_tracks_the_script_on_disk() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("bumptonormalmap.py");
        let tool = ScriptTool::new("python3", &script);
        assert!(!tool.is_available());
        fs::write(&script, "pass\n").unwrap();
        assert!(tool.is_available());
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        fn stub_script(dir: &Path, body: &str) -> PathBuf {
            let script = dir.join("stub.sh");
            fs::write(&script, body).unwrap();
            script
        }

        fn stub_input(dir: &Path) -> PathBuf {
            let input = dir.join("height.png");
            fs::write(&input, b"fake image").unwrap();
            input
        }

        #[test]
        fn success_returns_the_canonical_output_path() {
            let dir = tempdir().unwrap();
            // Writes `{stem}_normal.{format}` next to the input, like the
            // real script does.
            let script = stub_script(
                dir.path(),
                "out=\"${1%.*}_normal.$3\"\ncp \"$1\" \"$out\"\n",
            );
            let input = stub_input(dir.path());

            let tool = ScriptTool::new("/bin/sh", script);
            let out = tool
                .convert(&input, Strength::default(), OutputFormat::Png)
                .unwrap();
            assert!(out.is_file());
            assert!(out.to_string_lossy().ends_with("height_normal.png"));
        }

        #[test]
        fn nonzero_exit_surfaces_captured_stderr() {
            let dir = tempdir().unwrap();
            let script = stub_script(dir.path(), "echo 'bad bump data' >&2\nexit 3\n");
            let input = stub_input(dir.path());

            let tool = ScriptTool::new("/bin/sh", script);
            let err = tool
                .convert(&input, Strength::default(), OutputFormat::Png)
                .unwrap_err();
            match err {
                ToolError::Failed { stderr, .. } => assert_eq!(stderr, "bad bump data"),
                other => panic!("expected Failed, got {other:?}"),
            }
        }

        #[test]
        fn clean_exit_without_artifact_is_still_a_failure() {
            let dir = tempdir().unwrap();
            let script = stub_script(dir.path(), "exit 0\n");
            let input = stub_input(dir.path());

            let tool = ScriptTool::new("/bin/sh", script);
            let err = tool
                .convert(&input, Strength::default(), OutputFormat::Exr)
                .unwrap_err();
            match err {
                ToolError::MissingOutput(path) => {
                    assert!(path.to_string_lossy().ends_with("height_normal.exr"))
                }
                other => panic!("expected MissingOutput, got {other:?}"),
            }
        }

        #[test]
        fn strength_and_format_are_passed_as_positional_arguments() {
            let dir = tempdir().unwrap();
            let marker = dir.path().join("args.txt");
            let script = stub_script(
                dir.path(),
                &format!(
                    "printf '%s %s' \"$2\" \"$3\" > \"{}\"\nout=\"${{1%.*}}_normal.$3\"\n: > \"$out\"\n",
                    marker.display()
                ),
            );
            let input = stub_input(dir.path());

            let tool = ScriptTool::new("/bin/sh", script);
            tool.convert(&input, Strength::new(7).unwrap(), OutputFormat::Exr)
                .unwrap();
            assert_eq!(fs::read_to_string(marker).unwrap(), "7 exr");
        }
    }
}
