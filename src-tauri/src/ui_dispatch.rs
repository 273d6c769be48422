use tauri::AppHandle;
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use crate::main_window;

const STARTUP_ERROR_TITLE: &str = "ConvertAPK failed to start";

pub fn run_on_main_thread_dispatch<F>(
    app_handle: &AppHandle,
    task_name: &str,
    mut task: F,
) -> Result<(), String>
where
    F: FnMut(&AppHandle) + Send + 'static,
{
    let app_handle_for_thread = app_handle.clone();
    app_handle
        .run_on_main_thread(move || {
            task(&app_handle_for_thread);
        })
        .map_err(|error| format!("Failed to dispatch '{task_name}' on main thread: {error}"))
}

/// Shows a blocking error dialog, then exits with status 1.
pub fn report_startup_failure(app_handle: &AppHandle, message: &str) {
    main_window::log_runtime(app_handle, &format!("startup error: {message}"));
    eprintln!("ConvertAPK startup failed: {message}");

    let dialog_handle = app_handle.clone();
    let message_owned = message.to_string();
    tauri::async_runtime::spawn_blocking(move || {
        dialog_handle
            .dialog()
            .message(message_owned)
            .title(STARTUP_ERROR_TITLE)
            .kind(MessageDialogKind::Error)
            .blocking_show();
        dialog_handle.exit(1);
    });
}
