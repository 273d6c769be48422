#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod desktop_bridge;
mod desktop_bridge_commands;
mod exit_events;
mod main_window;
mod startup_task;
mod ui_dispatch;

use convertapk_desktop::{
    client_identity::ClientIdentityStore, directory_picker::DirectoryPickerSlot,
    logging::LogCategory, shutdown_gate::ShutdownGate, Supervisor, SupervisorOptions,
};
use tauri::{Manager, RunEvent};

fn main() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .manage(ShutdownGate::default())
        .manage(DirectoryPickerSlot::default())
        .manage(main_window::WindowStateTracker::default())
        .invoke_handler(tauri::generate_handler![
            desktop_bridge_commands::window_minimize,
            desktop_bridge_commands::window_toggle_maximize,
            desktop_bridge_commands::window_close,
            desktop_bridge_commands::window_is_maximized,
            desktop_bridge_commands::select_directory,
            desktop_bridge_commands::open_external
        ])
        .on_window_event(main_window::handle_window_event)
        .setup(|app| {
            let app_version = app.package_info().version.to_string();
            let resources_root = app.path().resource_dir().ok();
            let supervisor =
                Supervisor::new(SupervisorOptions::from_environment(&app_version, resources_root));
            supervisor.log(LogCategory::Startup, "desktop process starting");
            supervisor.log(
                LogCategory::Startup,
                &format!("desktop log path: {}", supervisor.log_path().display()),
            );

            app.manage(ClientIdentityStore::new(
                supervisor.paths().client_id.clone(),
            ));
            app.manage(supervisor);
            startup_task::spawn_startup_task(app.handle().clone());
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::ExitRequested { code, api, .. } => {
                exit_events::handle_exit_requested(app_handle, code, &api);
            }
            RunEvent::Exit => exit_events::handle_exit_event(app_handle),
            _ => {}
        });
}
