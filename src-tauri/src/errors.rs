use std::{io, path::PathBuf};

use thiserror::Error;

use crate::supervisor_state::SupervisorState;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to allocate a loopback port: {0}")]
    PortAllocation(#[source] io::Error),

    #[error(
        "backend executable not found: checked {} and {}",
        .primary.display(),
        .fallback.display()
    )]
    BackendNotFound { primary: PathBuf, fallback: PathBuf },

    #[error("failed to start backend process {command}: {reason}")]
    ProcessSpawn { command: String, reason: String },

    #[error("backend exited before becoming ready ({status})")]
    ProcessExited { status: String },

    #[error("timed out after {timeout_ms}ms waiting for backend at {host}:{port}")]
    Timeout {
        host: String,
        port: u16,
        timeout_ms: u64,
    },

    #[error("backend supervisor cannot start from state {0}")]
    InvalidState(SupervisorState),

    #[error("backend process pid={pid} did not exit within {timeout_ms}ms after stop")]
    StopTimedOut { pid: u32, timeout_ms: u64 },
}

#[derive(Debug, Error)]
pub enum ConfigDegraded {
    #[error("failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ignoring {}: {reason}", .path.display())]
    Unparseable { path: PathBuf, reason: String },

    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backend config {} has no usable data_root", .path.display())]
    BackendConfigIgnored { path: PathBuf },
}

pub fn startup_failure_message(error: &SupervisorError, port: Option<u16>, log_path: &str) -> String {
    let port_text = port
        .map(|port| port.to_string())
        .unwrap_or_else(|| "unassigned".to_string());
    format!(
        "Startup failed: {error}\n\nBackend port: {port_text}\n\nPlease check:\n1. The backend executable exists\n2. The port is not already in use\n3. The log file: {log_path}"
    )
}
