use tauri::{AppHandle, Manager, WebviewWindow};
use tauri_plugin_dialog::DialogExt;
use url::Url;

use convertapk_desktop::{
    directory_picker::{self, DirectoryPickerSlot, DIALOG_TITLE},
    origin_policy::{self, NavigationDecision},
};

use crate::main_window;

#[tauri::command]
pub(crate) fn window_minimize(window: WebviewWindow) -> Result<(), String> {
    window
        .minimize()
        .map_err(|error| format!("Failed to minimize window: {error}"))
}

#[tauri::command]
pub(crate) fn window_toggle_maximize(window: WebviewWindow) -> Result<(), String> {
    let is_maximized = window
        .is_maximized()
        .map_err(|error| format!("Failed to read window state: {error}"))?;
    if is_maximized {
        window.unmaximize()
    } else {
        window.maximize()
    }
    .map_err(|error| format!("Failed to toggle maximize: {error}"))
}

#[tauri::command]
pub(crate) fn window_close(window: WebviewWindow) -> Result<(), String> {
    window
        .close()
        .map_err(|error| format!("Failed to close window: {error}"))
}

#[tauri::command]
pub(crate) fn window_is_maximized(window: WebviewWindow) -> Result<bool, String> {
    window
        .is_maximized()
        .map_err(|error| format!("Failed to read window state: {error}"))
}

#[tauri::command]
pub(crate) async fn select_directory(
    app_handle: AppHandle,
    default_path: Option<String>,
) -> String {
    let (ticket, receiver) = app_handle.state::<DirectoryPickerSlot>().begin();
    let documents_dir = app_handle.path().document_dir().ok();

    let mut dialog = app_handle
        .dialog()
        .file()
        .set_title(DIALOG_TITLE)
        .set_can_create_directories(true);
    if let Some(default_dir) =
        directory_picker::resolve_default_directory(default_path.as_deref(), documents_dir)
    {
        dialog = dialog.set_directory(directory_picker::dialog_start_directory(&default_dir));
    }

    let completion_handle = app_handle.clone();
    dialog.pick_folder(move |folder| {
        let selection = folder.and_then(|path| path.into_path().ok());
        if !completion_handle
            .state::<DirectoryPickerSlot>()
            .complete(ticket, selection)
        {
            main_window::log_runtime(
                &completion_handle,
                "dropped result of a superseded directory request",
            );
        }
    });

    tauri::async_runtime::spawn_blocking(move || receiver.recv().unwrap_or_default())
        .await
        .unwrap_or_default()
}

#[tauri::command]
pub(crate) fn open_external(app_handle: AppHandle, url: String) -> Result<(), String> {
    let target = Url::parse(&url).map_err(|error| format!("Invalid url {url}: {error}"))?;
    match origin_policy::new_window_decision(&target) {
        NavigationDecision::OpenExternal => {
            main_window::open_in_system_browser(&app_handle, &target);
            Ok(())
        }
        NavigationDecision::LoadInWindow | NavigationDecision::Ignore => {
            main_window::log_runtime(&app_handle, &format!("blocked popup to {target}"));
            Ok(())
        }
    }
}
