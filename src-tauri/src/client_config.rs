use std::{fs, io, path::Path};

use serde_json::{Map, Value};

use crate::errors::ConfigDegraded;

pub const DEFAULT_ADMIN_API_URL: &str = "http://8.148.250.84:9001";
pub const DEFAULT_ADMIN_CLIENT_TOKEN: &str = "client-secret";

const ADMIN_API_URL_KEY: &str = "adminApiUrl";
const ADMIN_CLIENT_TOKEN_KEY: &str = "adminClientToken";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub admin_api_url: String,
    pub admin_client_token: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            admin_api_url: DEFAULT_ADMIN_API_URL.to_string(),
            admin_client_token: DEFAULT_ADMIN_CLIENT_TOKEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfigMerge {
    pub config: ClientConfig,
    /// Bytes to write back, present only when the file is missing or incomplete.
    pub persist: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawClientConfig<'a> {
    Missing,
    Present(&'a [u8]),
}

pub fn merge_client_config(
    raw: RawClientConfig<'_>,
) -> Result<ClientConfigMerge, serde_json::Error> {
    let defaults = ClientConfig::default();
    let mut document = match raw {
        RawClientConfig::Missing => Map::new(),
        RawClientConfig::Present(bytes) => match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(map) => map,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )))
            }
        },
    };

    let mut backfilled = matches!(raw, RawClientConfig::Missing);
    let admin_api_url = take_or_default(
        &mut document,
        ADMIN_API_URL_KEY,
        &defaults.admin_api_url,
        &mut backfilled,
    );
    let admin_client_token = take_or_default(
        &mut document,
        ADMIN_CLIENT_TOKEN_KEY,
        &defaults.admin_client_token,
        &mut backfilled,
    );

    let persist = if backfilled {
        Some(serde_json::to_vec_pretty(&Value::Object(document))?)
    } else {
        None
    };

    Ok(ClientConfigMerge {
        config: ClientConfig {
            admin_api_url,
            admin_client_token,
        },
        persist,
    })
}

fn take_or_default(
    document: &mut Map<String, Value>,
    key: &str,
    default: &str,
    backfilled: &mut bool,
) -> String {
    match document.get(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => value.clone(),
        _ => {
            *backfilled = true;
            document.insert(key.to_string(), Value::String(default.to_string()));
            default.to_string()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn resolve_client_config<F>(path: &Path, mut log: F) -> ClientConfig
where
    F: FnMut(ConfigDegraded),
{
    let bytes = match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(error) if error.kind() == io::ErrorKind::NotFound => None,
        Err(source) => {
            log(ConfigDegraded::Unreadable {
                path: path.to_path_buf(),
                source,
            });
            return ClientConfig::default();
        }
    };
    let raw = match &bytes {
        Some(bytes) => RawClientConfig::Present(bytes),
        None => RawClientConfig::Missing,
    };

    let merge = match merge_client_config(raw) {
        Ok(merge) => merge,
        Err(error) => {
            log(ConfigDegraded::Unparseable {
                path: path.to_path_buf(),
                reason: error.to_string(),
            });
            return ClientConfig::default();
        }
    };

    if let Some(contents) = &merge.persist {
        if let Err(source) = write_config_file(path, contents) {
            log(ConfigDegraded::WriteFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    merge.config
}

fn write_config_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}
