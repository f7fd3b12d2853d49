mod commands;
pub mod params;
pub mod provision;
pub mod runner;
pub mod selection;
pub mod tool;

pub use commands::AppState;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_tracing();
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .manage(AppState::default())
        .invoke_handler(tauri::generate_handler![
            commands::get_params,
            commands::set_strength,
            commands::set_format,
            commands::select_images,
            commands::current_selection,
            commands::clear_selection,
            commands::tool_status,
            commands::ensure_tool,
            commands::generate,
            commands::reveal_output,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
