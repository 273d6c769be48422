use tauri::{AppHandle, Manager};

use convertapk_desktop::{
    client_identity::ClientIdentityStore, logging::LogCategory, startup_failure_message,
    BackendEndpoint, Supervisor, SupervisorError,
};

use crate::{main_window, ui_dispatch};

fn open_main_window(app_handle: &AppHandle, endpoint: &BackendEndpoint) -> Result<(), String> {
    let supervisor = app_handle.state::<Supervisor>();
    let identity = app_handle.state::<ClientIdentityStore>();
    let client_id = identity.client_id(|message| supervisor.log(LogCategory::Runtime, message));
    main_window::create_main_window(app_handle, endpoint, client_id)?;
    supervisor.log(
        LogCategory::Startup,
        &format!("main window opened on {}", endpoint.url()),
    );
    Ok(())
}

fn failure_message(app_handle: &AppHandle, error: &SupervisorError) -> String {
    let supervisor = app_handle.state::<Supervisor>();
    let port = supervisor.endpoint().map(|endpoint| endpoint.port);
    let log_path = supervisor.log_path().display().to_string();
    startup_failure_message(error, port, &log_path)
}

pub fn spawn_startup_task(app_handle: AppHandle) {
    let startup_app_handle = app_handle.clone();
    tauri::async_runtime::spawn(async move {
        let startup_worker_handle = startup_app_handle.clone();
        let startup_result = tauri::async_runtime::spawn_blocking(move || {
            let supervisor = startup_worker_handle.state::<Supervisor>();
            supervisor
                .ensure_backend_ready()
                .map_err(|error| failure_message(&startup_worker_handle, &error))
        })
        .await
        .map_err(|error| format!("Backend startup task failed: {error}"))
        .and_then(|result| result);

        match startup_result {
            Ok(endpoint) => {
                if let Err(error) = ui_dispatch::run_on_main_thread_dispatch(
                    &startup_app_handle,
                    "open main window",
                    move |main_app| {
                        if let Err(window_error) = open_main_window(main_app, &endpoint) {
                            ui_dispatch::report_startup_failure(main_app, &window_error);
                        }
                    },
                ) {
                    ui_dispatch::report_startup_failure(&startup_app_handle, &error);
                }
            }
            Err(message) => {
                let supervisor = startup_app_handle.state::<Supervisor>();
                if supervisor.startup_interrupted_by_stop() {
                    supervisor.log(
                        LogCategory::Shutdown,
                        &format!("backend startup abandoned after stop request: {message}"),
                    );
                    return;
                }
                ui_dispatch::report_startup_failure(&startup_app_handle, &message);
            }
        }
    });
}
