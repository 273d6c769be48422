use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

pub const DESKTOP_LOG_FILE: &str = "desktop.log";
pub const DESKTOP_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const LOG_BACKUP_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Startup,
    Runtime,
    Backend,
    BackendError,
    Shutdown,
}

impl LogCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Runtime => "runtime",
            Self::Backend => "backend",
            Self::BackendError => "backend-error",
            Self::Shutdown => "shutdown",
        }
    }
}

pub fn rotate_log_if_needed(path: &Path, max_bytes: u64, backup_count: usize) {
    if max_bytes == 0 || backup_count == 0 {
        return;
    }

    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    if metadata.len() < max_bytes {
        return;
    }

    let _ = fs::remove_file(rotated_log_path(path, backup_count));
    for index in (1..backup_count).rev() {
        let source = rotated_log_path(path, index);
        if !source.exists() {
            continue;
        }
        let target = rotated_log_path(path, index + 1);
        let _ = fs::remove_file(&target);
        let _ = fs::rename(&source, &target);
    }

    let rotated = rotated_log_path(path, 1);
    let _ = fs::remove_file(&rotated);
    let _ = fs::rename(path, &rotated);
}

fn rotated_log_path(path: &Path, index: usize) -> PathBuf {
    let mut value = OsString::from(path.as_os_str());
    value.push(format!(".{index}"));
    PathBuf::from(value)
}

pub fn format_log_line(category: LogCategory, message: &str) -> String {
    let timestamp = chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.3f %z")
        .to_string();
    format!("[{}] [{}] {}\n", timestamp, category.label(), message)
}

#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    write_lock: Mutex<()>,
}

impl LogSink {
    pub fn new(path: PathBuf) -> Self {
        Self::with_rotation(path, DESKTOP_LOG_MAX_BYTES, LOG_BACKUP_COUNT)
    }

    pub fn with_rotation(path: PathBuf, max_bytes: u64, backup_count: usize) -> Self {
        Self {
            path,
            max_bytes,
            backup_count,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, category: LogCategory, message: &str) {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        rotate_log_if_needed(&self.path, self.max_bytes, self.backup_count);
        let line = format_log_line(category, message);
        let _ = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
    }
}
