use std::{
    io::{self, BufRead, BufReader, Read},
    process::{Child, ExitStatus},
    sync::{mpsc::Sender, Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::logging::{LogCategory, LogSink};

pub const EXIT_WATCH_INTERVAL_MS: u64 = 100;

pub type SharedChild = Arc<Mutex<Option<Child>>>;

#[derive(Debug)]
pub enum ProcessEvent {
    Exited(ExitStatus),
    Failed { command: String, reason: String },
    /// The handle was taken by a stop request before the process exited on its own.
    Detached,
}

pub fn describe_exit_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {signal}");
        }
    }
    status.to_string()
}

pub fn spawn_output_pump<R>(
    stream: R,
    category: LogCategory,
    sink: Arc<LogSink>,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("backend-{}", category.label()))
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut buffer = Vec::new();
            loop {
                buffer.clear();
                match reader.read_until(b'\n', &mut buffer) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buffer);
                        let line = line.trim_end_matches(['\r', '\n']);
                        if !line.trim().is_empty() {
                            sink.append(category, line);
                        }
                    }
                    Err(error) => {
                        sink.append(
                            LogCategory::Runtime,
                            &format!("backend {} stream closed: {error}", category.label()),
                        );
                        break;
                    }
                }
            }
        })
}

pub fn spawn_exit_watcher(
    child: SharedChild,
    pid: u32,
    command: String,
    sink: Arc<LogSink>,
    events: Sender<ProcessEvent>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("backend-exit-watcher".to_string())
        .spawn(move || loop {
            {
                let mut guard = child.lock().unwrap_or_else(PoisonError::into_inner);
                let Some(process) = guard.as_mut().filter(|process| process.id() == pid) else {
                    drop(guard);
                    let _ = events.send(ProcessEvent::Detached);
                    return;
                };
                match process.try_wait() {
                    Ok(Some(status)) => {
                        *guard = None;
                        drop(guard);
                        sink.append(
                            LogCategory::Runtime,
                            &format!(
                                "backend process exited: pid={pid}, {}",
                                describe_exit_status(&status)
                            ),
                        );
                        let _ = events.send(ProcessEvent::Exited(status));
                        return;
                    }
                    Ok(None) => {}
                    Err(error) => {
                        drop(guard);
                        let reason = format!("failed to poll backend process pid={pid}: {error}");
                        sink.append(LogCategory::Runtime, &reason);
                        let _ = events.send(ProcessEvent::Failed { command, reason });
                        return;
                    }
                }
            }
            thread::sleep(Duration::from_millis(EXIT_WATCH_INTERVAL_MS));
        })
}
