use std::{
    collections::BTreeMap,
    env::consts::EXE_SUFFIX,
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    errors::SupervisorError,
    run_mode::RunMode,
    runtime_config::{ConfigEnv, EffectiveConfig, DATA_DIR_ENV, DEFAULT_PYTHON, PORT_ENV},
};

const BACKEND_EXE_STEM: &str = "convertapk-backend";
const BACKEND_MODE: &str = "local";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub resources_root: PathBuf,
    pub workspace_root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub command: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    /// Added on top of the inherited environment.
    pub extra_env: BTreeMap<&'static str, OsString>,
    pub frontend_dir: PathBuf,
    pub mode: RunMode,
}

impl LaunchPlan {
    pub fn debug_command(&self) -> String {
        let mut parts = vec![self.command.to_string_lossy().to_string()];
        parts.extend(self.args.iter().map(|arg| arg.to_string_lossy().to_string()));
        parts.join(" ")
    }
}

pub fn packaged_backend_candidates(resources_root: &Path) -> (PathBuf, PathBuf) {
    let backend_root = resources_root.join("backend");
    let exe_name = format!("{BACKEND_EXE_STEM}{EXE_SUFFIX}");
    (
        backend_root.join(&exe_name),
        backend_root.join(BACKEND_EXE_STEM).join(&exe_name),
    )
}

pub fn locate_backend<F>(
    mode: RunMode,
    layout: &InstallLayout,
    config: &EffectiveConfig,
    env: &ConfigEnv,
    port: u16,
    log: F,
) -> Result<LaunchPlan, SupervisorError>
where
    F: Fn(&str),
{
    let mut plan = match mode {
        RunMode::Packaged => resolve_packaged_launch(&layout.resources_root, log)?,
        RunMode::Development => resolve_dev_launch(&layout.workspace_root, env),
    };
    apply_backend_env(&mut plan, layout, config, port);
    Ok(plan)
}

fn resolve_packaged_launch<F>(resources_root: &Path, log: F) -> Result<LaunchPlan, SupervisorError>
where
    F: Fn(&str),
{
    let (primary, fallback) = packaged_backend_candidates(resources_root);
    let backend_exe = if primary.is_file() {
        primary
    } else if fallback.is_file() {
        fallback
    } else {
        return Err(SupervisorError::BackendNotFound { primary, fallback });
    };
    let cwd = backend_exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| resources_root.to_path_buf());

    let frontend_dir = resources_root.join("frontend");
    if !frontend_dir.is_dir() {
        log(&format!(
            "frontend dist not found: {}, backend will serve its fallback assets",
            frontend_dir.display()
        ));
    }

    Ok(LaunchPlan {
        command: backend_exe,
        args: Vec::new(),
        cwd,
        extra_env: BTreeMap::new(),
        frontend_dir,
        mode: RunMode::Packaged,
    })
}

fn resolve_dev_launch(workspace_root: &Path, env: &ConfigEnv) -> LaunchPlan {
    let backend_dir = workspace_root.join("web").join("backend");
    let script = backend_dir.join("main.py");
    let python = env.python.as_deref().unwrap_or(DEFAULT_PYTHON);

    LaunchPlan {
        command: PathBuf::from(python),
        args: vec![script.into_os_string()],
        cwd: backend_dir,
        extra_env: BTreeMap::new(),
        frontend_dir: workspace_root.join("web").join("frontend").join("dist"),
        mode: RunMode::Development,
    }
}

fn apply_backend_env(
    plan: &mut LaunchPlan,
    layout: &InstallLayout,
    config: &EffectiveConfig,
    port: u16,
) {
    let extra_env = &mut plan.extra_env;
    extra_env.insert("APK_BUILDER_MODE", BACKEND_MODE.into());
    extra_env.insert(DATA_DIR_ENV, config.data_root.clone().into_os_string());
    extra_env.insert(PORT_ENV, port.to_string().into());
    if !config.admin_api_url.is_empty() {
        extra_env.insert("ADMIN_API_URL", config.admin_api_url.clone().into());
    }
    if !config.admin_client_token.is_empty() {
        extra_env.insert("ADMIN_CLIENT_TOKEN", config.admin_client_token.clone().into());
    }
    extra_env.insert("FRONTEND_DIST_DIR", plan.frontend_dir.clone().into_os_string());
    if plan.mode == RunMode::Packaged {
        // The backend resolves its bundled toolchain through this name.
        extra_env.insert(
            "ELECTRON_RESOURCES",
            layout.resources_root.clone().into_os_string(),
        );
    }
    extra_env.insert("CONVERTAPK_APP_VERSION", config.app_version.clone().into());
}
