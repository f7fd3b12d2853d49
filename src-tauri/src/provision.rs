//! Tool provisioning: fetches the external conversion script into the
//! app-managed data directory on first use.
//!
//! Everything here is best-effort and idempotent. A failed fetch is
//! reported to the UI and retried on the next request; the batch runner's
//! own availability check covers the case where the tool never arrived.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tauri::{AppHandle, Manager};
use thiserror::Error;
use tracing::{info, warn};

pub const TOOL_REPO_URL: &str = "https://github.com/MircoWerner/BumpToNormalMap.git";
pub const TOOL_DIR_NAME: &str = "BumpToNormalMap";
pub const TOOL_ENTRY_POINT: &str = "bumptonormalmap.py";

/// Python packages the script needs at run time.
const TOOL_PYTHON_DEPS: [&str; 2] = ["numpy", "opencv-python"];

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to resolve app data dir: {0}")]
    AppData(String),
    #[error("failed to prepare {}: {source}", .path.display())]
    Prepare { path: PathBuf, source: io::Error },
    #[error("failed to run git: {0}")]
    GitSpawn(io::Error),
    #[error("git clone failed: {0}")]
    Clone(String),
}

pub fn app_root(app: &AppHandle) -> Result<PathBuf, ProvisionError> {
    let data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| ProvisionError::AppData(e.to_string()))?;
    Ok(data_dir.join("NormalGenerator"))
}

pub fn tools_dir(root: &Path) -> PathBuf {
    root.join("tools")
}

pub fn tool_install_dir(root: &Path) -> PathBuf {
    tools_dir(root).join(TOOL_DIR_NAME)
}

pub fn tool_entry_point(root: &Path) -> PathBuf {
    tool_install_dir(root).join(TOOL_ENTRY_POINT)
}

pub fn tool_installed(root: &Path) -> bool {
    tool_entry_point(root).is_file()
}

/// Clones the script repository into place and best-effort installs its
/// Python dependencies. Idempotent: an existing install returns
/// immediately. `log` lines go to the UI.
pub fn fetch_tool(root: &Path, log: &mut dyn FnMut(String)) -> Result<(), ProvisionError> {
    if tool_installed(root) {
        log("Conversion tool already present".to_string());
        return Ok(());
    }

    let tools = tools_dir(root);
    fs::create_dir_all(&tools).map_err(|source| ProvisionError::Prepare {
        path: tools.clone(),
        source,
    })?;

    // Clone into a staging dir so an interrupted fetch never looks like a
    // finished install.
    let staging = tools.join(format!("{TOOL_DIR_NAME}.partial"));
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|source| ProvisionError::Prepare {
            path: staging.clone(),
            source,
        })?;
    }

    log(format!("Cloning {TOOL_REPO_URL}"));
    info!(url = TOOL_REPO_URL, "fetching conversion tool");
    let output = Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg(TOOL_REPO_URL)
        .arg(&staging)
        .output()
        .map_err(ProvisionError::GitSpawn)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let _ = fs::remove_dir_all(&staging);
        return Err(ProvisionError::Clone(stderr));
    }

    let install = tool_install_dir(root);
    fs::rename(&staging, &install).map_err(|source| ProvisionError::Prepare {
        path: install.clone(),
        source,
    })?;
    log("Conversion tool installed".to_string());

    install_python_deps(log);
    Ok(())
}

/// A pip failure downgrades to a warning; the user can install the
/// packages by hand and the tool directory is already in place.
fn install_python_deps(log: &mut dyn FnMut(String)) {
    log(format!("Installing Python dependencies: {}", TOOL_PYTHON_DEPS.join(", ")));
    let result = Command::new(crate::tool::python_interpreter())
        .arg("-m")
        .arg("pip")
        .arg("install")
        .arg("--user")
        .args(TOOL_PYTHON_DEPS)
        .output();
    match result {
        Ok(out) if out.status.success() => {
            log("Python dependencies installed".to_string());
        }
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            warn!(%stderr, "pip install failed");
            log(format!(
                "Dependency install failed, install manually: pip install {}",
                TOOL_PYTHON_DEPS.join(" ")
            ));
        }
        Err(e) => {
            warn!(error = %e, "could not run pip");
            log(format!(
                "Could not run pip ({e}), install manually: pip install {}",
                TOOL_PYTHON_DEPS.join(" ")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn install_layout_is_stable() {
        let root = Path::new("/data/NormalGenerator");
        assert_eq!(
            tool_entry_point(root),
            PathBuf::from("/data/NormalGenerator/tools/BumpToNormalMap/bumptonormalmap.py")
        );
    }

    #[test]
    fn installed_means_entry_point_on_disk() {
        let dir = tempdir().unwrap();
        assert!(!tool_installed(dir.path()));

        let install = tool_install_dir(dir.path());
        fs::create_dir_all(&install).unwrap();
        assert!(!tool_installed(dir.path()));

        fs::write(tool_entry_point(dir.path()), "pass\n").unwrap();
        assert!(tool_installed(dir.path()));
    }

    #[test]
    fn fetch_is_a_noop_when_already_installed() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(tool_install_dir(dir.path())).unwrap();
        fs::write(tool_entry_point(dir.path()), "pass\n").unwrap();

        let mut lines = Vec::new();
        fetch_tool(dir.path(), &mut |line| lines.push(line)).unwrap();
        assert_eq!(lines, vec!["Conversion tool already present".to_string()]);
    }
}
