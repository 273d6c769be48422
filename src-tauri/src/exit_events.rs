use tauri::{AppHandle, ExitRequestApi, Manager};

use convertapk_desktop::{
    logging::LogCategory,
    shutdown_gate::{self, ExitRequestDecision, ExitTrigger, ShutdownGate},
    Supervisor,
};

fn keeps_running_without_windows() -> bool {
    cfg!(target_os = "macos")
}

pub fn handle_exit_requested(app_handle: &AppHandle, code: Option<i32>, api: &ExitRequestApi) {
    let gate = app_handle.state::<ShutdownGate>();
    let supervisor = app_handle.state::<Supervisor>();

    // A request without a code right after the last window closed is the
    // "all windows closed" signal, not a quit.
    if code.is_none() && gate.take_last_window_closed() && keeps_running_without_windows() {
        api.prevent_exit();
        supervisor.log(
            LogCategory::Shutdown,
            "last window closed, stopping backend and staying alive",
        );
        let worker_handle = app_handle.clone();
        tauri::async_runtime::spawn_blocking(move || {
            let supervisor = worker_handle.state::<Supervisor>();
            shutdown_gate::stop_backend_for_exit(&supervisor, ExitTrigger::AllWindowsClosed);
        });
        return;
    }

    match gate.decide_exit_request() {
        ExitRequestDecision::AllowExit => {
            supervisor.log(
                LogCategory::Shutdown,
                "exit request allowed to pass through after backend cleanup",
            );
            return;
        }
        ExitRequestDecision::AwaitRunningCleanup => {
            api.prevent_exit();
            supervisor.log(
                LogCategory::Shutdown,
                "exit requested while backend cleanup is already running",
            );
            return;
        }
        ExitRequestDecision::RunCleanupFirst => {}
    }

    // Hold the exit while the backend stops on a blocking worker, then exit explicitly.
    api.prevent_exit();
    let exit_code = code.unwrap_or(0);
    supervisor.log(
        LogCategory::Shutdown,
        &format!("exit requested (code={exit_code}), stopping backend"),
    );
    let worker_handle = app_handle.clone();
    tauri::async_runtime::spawn_blocking(move || {
        let supervisor = worker_handle.state::<Supervisor>();
        shutdown_gate::stop_backend_for_exit(&supervisor, ExitTrigger::ExitRequested);
        worker_handle.state::<ShutdownGate>().finish_cleanup();
        worker_handle.exit(exit_code);
    });
}

pub fn handle_exit_event(app_handle: &AppHandle) {
    let gate = app_handle.state::<ShutdownGate>();
    if !gate.try_begin_fallback_cleanup() {
        return;
    }
    let supervisor = app_handle.state::<Supervisor>();
    supervisor.log(
        LogCategory::Shutdown,
        "exit event triggered fallback backend cleanup",
    );
    shutdown_gate::stop_backend_for_exit(&supervisor, ExitTrigger::ExitFallback);
}
