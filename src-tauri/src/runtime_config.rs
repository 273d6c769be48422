use std::{
    env,
    path::{Path, PathBuf},
};

use crate::{
    backend_config, client_config::ClientConfig, errors::ConfigDegraded, runtime_paths,
    runtime_paths::AppPaths,
};

pub const BACKEND_HOST: &str = "127.0.0.1";
pub const DEFAULT_PYTHON: &str = "python";

pub const PORT_ENV: &str = "CONVERTAPK_PORT";
pub const DATA_DIR_ENV: &str = "APK_BUILDER_DATA_DIR";
pub const PYTHON_ENV: &str = "CONVERTAPK_PYTHON";
pub const RUN_MODE_ENV: &str = "CONVERTAPK_RUN_MODE";
const ADMIN_URL_ENVS: [&str; 2] = ["CONVERTAPK_ADMIN_URL", "ADMIN_API_URL"];
const ADMIN_TOKEN_ENVS: [&str; 2] = ["CONVERTAPK_CLIENT_TOKEN", "ADMIN_CLIENT_TOKEN"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigEnv {
    pub port: Option<String>,
    pub data_dir: Option<String>,
    pub python: Option<String>,
    pub admin_api_url: Option<String>,
    pub admin_client_token: Option<String>,
    pub run_mode: Option<String>,
    pub backend_timeout_ms: Option<String>,
}

impl ConfigEnv {
    pub fn from_process() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            port: read(PORT_ENV),
            data_dir: read(DATA_DIR_ENV),
            python: read(PYTHON_ENV),
            admin_api_url: ADMIN_URL_ENVS.iter().find_map(|&name| read(name)),
            admin_client_token: ADMIN_TOKEN_ENVS.iter().find_map(|&name| read(name)),
            run_mode: read(RUN_MODE_ENV),
            backend_timeout_ms: read(backend_config::BACKEND_TIMEOUT_ENV),
        }
    }

    /// Port pinned from outside. Zero, non-numeric and out-of-range values are ignored.
    pub fn pinned_port(&self) -> Option<u16> {
        self.port
            .as_deref()
            .and_then(|raw| raw.parse::<u16>().ok())
            .filter(|port| *port != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub backend_host: &'static str,
    pub backend_port: Option<u16>,
    pub data_root: PathBuf,
    pub admin_api_url: String,
    pub admin_client_token: String,
    pub app_version: String,
}

pub fn resolve_backend_runtime_config<F>(
    env: &ConfigEnv,
    client_config: &ClientConfig,
    paths: &AppPaths,
    cwd: &Path,
    app_version: &str,
    log: F,
) -> EffectiveConfig
where
    F: FnMut(ConfigDegraded),
{
    let data_root = env
        .data_dir
        .as_deref()
        .and_then(|raw| runtime_paths::resolve_against(raw, cwd))
        .or_else(|| backend_config::read_configured_data_root(&paths.backend_config, cwd, log))
        .unwrap_or_else(|| paths.app_dir.clone());

    EffectiveConfig {
        backend_host: BACKEND_HOST,
        backend_port: env.pinned_port(),
        data_root,
        admin_api_url: pick_non_blank(
            env.admin_api_url.as_deref(),
            &client_config.admin_api_url,
        ),
        admin_client_token: pick_non_blank(
            env.admin_client_token.as_deref(),
            &client_config.admin_client_token,
        ),
        app_version: app_version.to_string(),
    }
}

fn pick_non_blank(env_value: Option<&str>, file_value: &str) -> String {
    env_value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(file_value)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashMap,
        fs,
        time::{SystemTime, UNIX_EPOCH},
    };

    fn create_temp_case_dir(name: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let dir = env::temp_dir().join(format!(
            "convertapk-runtime-config-test-{}-{}-{}",
            std::process::id(),
            ts,
            name
        ));
        fs::create_dir_all(&dir).expect("create temp case dir");
        dir
    }

    fn env_from(pairs: &[(&str, &str)]) -> ConfigEnv {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ConfigEnv::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn config_env_prefers_first_admin_variable_and_drops_blanks() {
        let env = env_from(&[
            ("CONVERTAPK_ADMIN_URL", "  "),
            ("ADMIN_API_URL", "https://admin"),
            ("CONVERTAPK_CLIENT_TOKEN", "primary"),
            ("ADMIN_CLIENT_TOKEN", "secondary"),
        ]);
        assert_eq!(env.admin_api_url.as_deref(), Some("https://admin"));
        assert_eq!(env.admin_client_token.as_deref(), Some("primary"));
        assert_eq!(env.data_dir, None);
    }

    #[test]
    fn pinned_port_rejects_zero_and_garbage() {
        assert_eq!(env_from(&[(PORT_ENV, "8123")]).pinned_port(), Some(8123));
        assert_eq!(env_from(&[(PORT_ENV, "0")]).pinned_port(), None);
        assert_eq!(env_from(&[(PORT_ENV, "70000")]).pinned_port(), None);
        assert_eq!(env_from(&[(PORT_ENV, "abc")]).pinned_port(), None);
    }

    #[test]
    fn admin_fields_resolve_independently() {
        let dir = create_temp_case_dir("admin");
        let paths = AppPaths::under(dir.clone());
        let client = ClientConfig {
            admin_api_url: "https://file".to_string(),
            admin_client_token: "file-token".to_string(),
        };
        let env = env_from(&[("ADMIN_API_URL", "https://env")]);

        let config = resolve_backend_runtime_config(&env, &client, &paths, &dir, "1.2.3", |_| {});
        assert_eq!(config.admin_api_url, "https://env");
        assert_eq!(config.admin_client_token, "file-token");
        assert_eq!(config.backend_host, BACKEND_HOST);
        assert_eq!(config.app_version, "1.2.3");

        fs::remove_dir_all(&dir).expect("cleanup temp case dir");
    }

    #[test]
    fn data_root_precedence_env_then_backend_config_then_app_dir() {
        let dir = create_temp_case_dir("data-root");
        let paths = AppPaths::under(dir.join("ConvertAPK"));
        let client = ClientConfig::default();
        let cwd = dir.join("cwd");

        let fallback =
            resolve_backend_runtime_config(&ConfigEnv::default(), &client, &paths, &cwd, "1", |_| {});
        assert_eq!(fallback.data_root, paths.app_dir);

        fs::create_dir_all(&paths.app_dir).expect("create app dir");
        fs::write(&paths.backend_config, br#"{"data_root": "relative/data"}"#)
            .expect("write backend config");
        let configured =
            resolve_backend_runtime_config(&ConfigEnv::default(), &client, &paths, &cwd, "1", |_| {});
        assert_eq!(configured.data_root, cwd.join("relative/data"));

        let env = env_from(&[(DATA_DIR_ENV, "override")]);
        let overridden = resolve_backend_runtime_config(&env, &client, &paths, &cwd, "1", |_| {});
        assert_eq!(overridden.data_root, cwd.join("override"));

        fs::remove_dir_all(&dir).expect("cleanup temp case dir");
    }

    #[test]
    fn resolution_is_deterministic() {
        let dir = create_temp_case_dir("deterministic");
        let paths = AppPaths::under(dir.clone());
        let env = env_from(&[(PORT_ENV, "9000"), ("CONVERTAPK_CLIENT_TOKEN", "tok")]);
        let client = ClientConfig::default();

        let first = resolve_backend_runtime_config(&env, &client, &paths, &dir, "1", |_| {});
        let second = resolve_backend_runtime_config(&env, &client, &paths, &dir, "1", |_| {});
        assert_eq!(first, second);
        assert_eq!(first.backend_port, Some(9000));

        fs::remove_dir_all(&dir).expect("cleanup temp case dir");
    }
}
