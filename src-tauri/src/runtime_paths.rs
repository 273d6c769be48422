use std::{
    env,
    path::{Path, PathBuf},
};

use crate::logging::DESKTOP_LOG_FILE;

pub const APP_DIR_NAME: &str = "ConvertAPK";
pub const CLIENT_CONFIG_FILE: &str = "client-config.json";
pub const BACKEND_CONFIG_FILE: &str = "config.json";
pub const CLIENT_ID_FILE: &str = "client-id.txt";

const CONFIG_DIR_ENV: &str = "CONVERTAPK_CONFIG_DIR";
const DESKTOP_LOG_PATH_ENV: &str = "CONVERTAPK_DESKTOP_LOG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub app_dir: PathBuf,
    pub client_config: PathBuf,
    pub backend_config: PathBuf,
    pub client_id: PathBuf,
    pub desktop_log: PathBuf,
}

impl AppPaths {
    pub fn under(app_dir: PathBuf) -> Self {
        Self {
            client_config: app_dir.join(CLIENT_CONFIG_FILE),
            backend_config: app_dir.join(BACKEND_CONFIG_FILE),
            client_id: app_dir.join(CLIENT_ID_FILE),
            desktop_log: app_dir.join(DESKTOP_LOG_FILE),
            app_dir,
        }
    }

    pub fn from_env() -> Self {
        let app_dir = non_blank_env(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| app_data_dir().join(APP_DIR_NAME));
        let mut paths = Self::under(app_dir);
        if let Some(custom_log) = non_blank_env(DESKTOP_LOG_PATH_ENV) {
            paths.desktop_log = PathBuf::from(custom_log);
        }
        paths
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn app_data_dir() -> PathBuf {
    app_data_dir_with(
        non_blank_env("APPDATA").map(PathBuf::from),
        non_blank_env("XDG_CONFIG_HOME").map(PathBuf::from),
        home::home_dir(),
        cfg!(target_os = "macos"),
    )
}

fn app_data_dir_with(
    appdata: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    is_macos: bool,
) -> PathBuf {
    if let Some(appdata) = appdata {
        return appdata;
    }
    if is_macos {
        if let Some(home) = &home_dir {
            return home.join("Library").join("Application Support");
        }
    }
    if let Some(xdg) = xdg_config_home {
        return xdg;
    }
    if let Some(home) = home_dir {
        return home.join(".config");
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn workspace_root_dir() -> PathBuf {
    let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    candidate
        .canonicalize()
        .unwrap_or_else(|_| candidate.to_path_buf())
}

pub fn executable_resources_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn resolve_against(raw: &str, cwd: &Path) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let path = PathBuf::from(trimmed);
    if path.is_absolute() {
        Some(path)
    } else {
        Some(cwd.join(path))
    }
}
