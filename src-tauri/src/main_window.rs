use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tauri::{
    window::Color, AppHandle, Emitter, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder,
    Window, WindowEvent,
};
use tauri_plugin_opener::OpenerExt;
use url::Url;

use convertapk_desktop::{
    logging::LogCategory,
    origin_policy::{self, NavigationDecision},
    shutdown_gate::ShutdownGate,
    BackendEndpoint, Supervisor,
};

use crate::desktop_bridge;

pub const MAIN_WINDOW_LABEL: &str = "main";
pub const WINDOW_STATE_EVENT: &str = "window:state";
const WINDOW_TITLE: &str = "ConvertAPK";
const WINDOW_SIZE: (f64, f64) = (1280.0, 800.0);
const WINDOW_MIN_SIZE: (f64, f64) = (1100.0, 700.0);
const WINDOW_BACKGROUND: Color = Color(0x0b, 0x0f, 0x14, 0xff);

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStatePayload {
    pub is_maximized: bool,
}

#[derive(Debug, Default)]
pub struct WindowStateTracker {
    maximized: AtomicBool,
}

pub fn log_runtime(app_handle: &AppHandle, message: &str) {
    if let Some(supervisor) = app_handle.try_state::<Supervisor>() {
        supervisor.log(LogCategory::Runtime, message);
    }
}

pub fn open_in_system_browser(app_handle: &AppHandle, target: &Url) {
    if let Err(error) = app_handle.opener().open_url(target.as_str(), None::<&str>) {
        log_runtime(
            app_handle,
            &format!("failed to open external url {target}: {error}"),
        );
    }
}

/// Builds the main window on the backend origin. Must run after the backend is ready.
pub fn create_main_window(
    app_handle: &AppHandle,
    endpoint: &BackendEndpoint,
    client_id: &str,
) -> Result<WebviewWindow, String> {
    let backend_url = Url::parse(&endpoint.url())
        .map_err(|error| format!("Invalid backend url {}: {error}", endpoint.url()))?;
    let navigation_origin = backend_url.clone();
    let navigation_app = app_handle.clone();

    WebviewWindowBuilder::new(
        app_handle,
        MAIN_WINDOW_LABEL,
        WebviewUrl::External(backend_url),
    )
    .title(WINDOW_TITLE)
    .inner_size(WINDOW_SIZE.0, WINDOW_SIZE.1)
    .min_inner_size(WINDOW_MIN_SIZE.0, WINDOW_MIN_SIZE.1)
    .decorations(false)
    .background_color(WINDOW_BACKGROUND)
    .initialization_script(desktop_bridge::bootstrap_script(client_id).as_str())
    .on_navigation(move |target| {
        match origin_policy::navigation_decision(&navigation_origin, target) {
            NavigationDecision::LoadInWindow => true,
            NavigationDecision::OpenExternal => {
                open_in_system_browser(&navigation_app, target);
                false
            }
            NavigationDecision::Ignore => {
                log_runtime(
                    &navigation_app,
                    &format!("blocked in-window navigation to {target}"),
                );
                false
            }
        }
    })
    .build()
    .map_err(|error| format!("Failed to create main window: {error}"))
}

pub fn emit_window_state(window: &Window, is_maximized: bool) {
    if let Err(error) = window.emit(WINDOW_STATE_EVENT, WindowStatePayload { is_maximized }) {
        log_runtime(
            window.app_handle(),
            &format!("failed to emit {WINDOW_STATE_EVENT}: {error}"),
        );
    }
}

pub fn handle_window_event(window: &Window, event: &WindowEvent) {
    if window.label() != MAIN_WINDOW_LABEL {
        return;
    }
    let app_handle = window.app_handle();
    match event {
        WindowEvent::Resized(_) => {
            let Ok(is_maximized) = window.is_maximized() else {
                return;
            };
            let tracker = app_handle.state::<WindowStateTracker>();
            if tracker.maximized.swap(is_maximized, Ordering::SeqCst) != is_maximized {
                emit_window_state(window, is_maximized);
            }
        }
        WindowEvent::Destroyed => {
            let others_open = app_handle
                .webview_windows()
                .into_keys()
                .any(|label| label != MAIN_WINDOW_LABEL);
            if !others_open {
                app_handle.state::<ShutdownGate>().note_last_window_closed();
            }
        }
        _ => {}
    }
}
