//! Tauri command surface and the managed application state behind it.
//!
//! Commands stay thin: validate, snapshot state, hand off to the domain
//! modules. Long-running work goes to a background thread and reports
//! back through events so the window never freezes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager, State};
use tracing::warn;

use crate::params::{GenParams, OutputFormat, Strength};
use crate::provision;
use crate::runner::{self, BatchGate, ImageJob};
use crate::selection;
use crate::tool::{python_interpreter, ScriptTool};

#[derive(Default)]
pub struct AppState {
    params: Mutex<GenParams>,
    selection: Mutex<Vec<PathBuf>>,
    batch: BatchGate,
    provisioning: AtomicBool,
}

#[derive(Clone, Serialize)]
struct ProvisionDoneEvent {
    ok: bool,
    message: String,
}

// -------------------- Parameters --------------------

#[tauri::command]
pub fn get_params(state: State<AppState>) -> GenParams {
    *state.params.lock().unwrap()
}

#[tauri::command]
pub fn set_strength(state: State<AppState>, strength: u32) -> Result<(), String> {
    let strength = Strength::new(strength).map_err(|e| e.to_string())?;
    state.params.lock().unwrap().strength = strength;
    Ok(())
}

#[tauri::command]
pub fn set_format(state: State<AppState>, format: String) -> Result<(), String> {
    let format: OutputFormat = format.parse().map_err(|e: crate::params::ParamError| e.to_string())?;
    state.params.lock().unwrap().format = format;
    Ok(())
}

// -------------------- Selection --------------------

#[tauri::command]
pub fn select_images(state: State<AppState>, paths: Vec<String>) -> Result<Vec<String>, String> {
    let incoming: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
    let mut current = state.selection.lock().unwrap();
    selection::replace_selection(&mut current, &incoming).map_err(|e| e.to_string())?;
    Ok(current.iter().map(|p| p.to_string_lossy().to_string()).collect())
}

#[tauri::command]
pub fn current_selection(state: State<AppState>) -> Vec<String> {
    state
        .selection
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect()
}

#[tauri::command]
pub fn clear_selection(state: State<AppState>) {
    state.selection.lock().unwrap().clear();
}

// -------------------- Provisioning --------------------

#[tauri::command]
pub fn tool_status(app: AppHandle) -> Result<String, String> {
    let root = provision::app_root(&app).map_err(|e| e.to_string())?;
    if provision::tool_installed(&root) {
        Ok("installed".into())
    } else {
        Ok("missing".into())
    }
}

#[tauri::command]
pub fn ensure_tool(app: AppHandle, state: State<AppState>) -> Result<String, String> {
    let root = provision::app_root(&app).map_err(|e| e.to_string())?;
    if provision::tool_installed(&root) {
        return Ok("Conversion tool already present".into());
    }
    if state.provisioning.swap(true, Ordering::SeqCst) {
        return Ok("Tool download already in progress".into());
    }

    // Fetch in the background so startup and the rest of the UI never
    // wait on the network.
    let app_for_task = app.clone();
    std::thread::spawn(move || {
        let result = provision::fetch_tool(&root, &mut |line| {
            let _ = app_for_task.emit("provision_log", line);
        });
        let done = match result {
            Ok(()) => ProvisionDoneEvent {
                ok: true,
                message: "Conversion tool ready".into(),
            },
            Err(err) => {
                warn!(error = %err, "provisioning failed");
                ProvisionDoneEvent {
                    ok: false,
                    message: err.to_string(),
                }
            }
        };
        app_for_task
            .state::<AppState>()
            .provisioning
            .store(false, Ordering::SeqCst);
        let _ = app_for_task.emit("provision_done", done);
    });

    Ok("Downloading conversion tool in background".into())
}

// -------------------- Batch run --------------------

#[tauri::command]
pub fn generate(app: AppHandle, state: State<AppState>) -> Result<(), String> {
    let sources = state.selection.lock().unwrap().clone();
    if sources.is_empty() {
        return Err("No images selected".into());
    }
    // Parameter snapshot: the batch keeps these values even if the user
    // edits the controls while it runs.
    let params = *state.params.lock().unwrap();
    let root = provision::app_root(&app).map_err(|e| e.to_string())?;

    if !state.batch.try_start() {
        return Err("A batch is already running".into());
    }

    let jobs = ImageJob::build(&sources, params);
    let app_for_task = app.clone();
    std::thread::spawn(move || {
        let tool = ScriptTool::new(python_interpreter(), provision::tool_entry_point(&root));
        let report = runner::run_batch(&jobs, &tool);
        // Re-enable the run action before the report reaches the UI.
        app_for_task.state::<AppState>().batch.finish();
        let _ = app_for_task.emit("batch_done", &report);
    });

    Ok(())
}

#[tauri::command]
pub fn reveal_output(path: String) -> Result<(), String> {
    tauri_plugin_opener::reveal_item_in_dir(PathBuf::from(path)).map_err(|e| e.to_string())
}
