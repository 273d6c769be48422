#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;
use std::{
    io,
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

pub const GRACEFUL_STOP_TIMEOUT_MS: u64 = 10_000;
const EXIT_POLL_INTERVAL_MS: u64 = 100;
const FORCE_STOP_WAIT_MIN_MS: u64 = 200;
const FORCE_STOP_WAIT_MAX_MS: u64 = 2_000;
#[cfg(target_os = "windows")]
const WINDOWS_CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    AlreadyExited,
    Terminated,
    Killed,
    Unresponsive,
}

pub fn hide_console_window(command: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        command.creation_flags(WINDOWS_CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    {
        let _ = command;
    }
}

fn wait_for_child_exit(child: &mut Child, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => {
                if start.elapsed() >= timeout {
                    return false;
                }
                thread::sleep(Duration::from_millis(EXIT_POLL_INTERVAL_MS));
            }
            Err(_) => return false,
        }
    }
}

fn send_stop_signal<F>(pid: u32, label: &str, program: &str, args: &[&str], log: F) -> bool
where
    F: Fn(&str),
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .stdin(Stdio::null());
    hide_console_window(&mut command);

    let status: io::Result<ExitStatus> = command.status();
    match status {
        Ok(exit_status) if exit_status.success() => true,
        Ok(exit_status) => {
            log(&format!(
                "{label} returned non-zero: pid={pid}, status={exit_status}"
            ));
            false
        }
        Err(error) => {
            log(&format!("{label} failed to start: pid={pid}, error={error}"));
            false
        }
    }
}

fn followup_wait(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        Duration::ZERO
    } else {
        (timeout / 4)
            .max(Duration::from_millis(FORCE_STOP_WAIT_MIN_MS))
            .min(Duration::from_millis(FORCE_STOP_WAIT_MAX_MS))
    }
}

#[cfg(target_os = "windows")]
fn graceful_signal<F: Fn(&str)>(pid: u32, log: F) -> bool {
    let pid_arg = pid.to_string();
    send_stop_signal(pid, "taskkill graceful stop", "taskkill", &["/pid", &pid_arg, "/t"], log)
}

#[cfg(target_os = "windows")]
fn force_signal<F: Fn(&str)>(pid: u32, log: F) -> bool {
    let pid_arg = pid.to_string();
    send_stop_signal(
        pid,
        "taskkill force stop",
        "taskkill",
        &["/pid", &pid_arg, "/t", "/f"],
        log,
    )
}

#[cfg(not(target_os = "windows"))]
fn graceful_signal<F: Fn(&str)>(pid: u32, log: F) -> bool {
    let pid_arg = pid.to_string();
    send_stop_signal(pid, "kill -TERM", "kill", &["-TERM", &pid_arg], log)
}

#[cfg(not(target_os = "windows"))]
fn force_signal<F: Fn(&str)>(pid: u32, log: F) -> bool {
    let pid_arg = pid.to_string();
    send_stop_signal(pid, "kill -KILL", "kill", &["-KILL", &pid_arg], log)
}

/// Asks the child to terminate, waits up to `timeout`, then forces it down.
pub fn stop_child_process<F>(child: &mut Child, timeout: Duration, log: F) -> StopOutcome
where
    F: Fn(&str) + Copy,
{
    if let Ok(Some(_)) = child.try_wait() {
        return StopOutcome::AlreadyExited;
    }

    let pid = child.id();
    let graceful_sent = graceful_signal(pid, log);
    // A failed signal usually means the process is already gone; don't sit out the full wait.
    let graceful_wait = if graceful_sent {
        timeout
    } else {
        timeout.min(Duration::from_millis(FORCE_STOP_WAIT_MAX_MS))
    };
    if wait_for_child_exit(child, graceful_wait) {
        return StopOutcome::Terminated;
    }

    let force_sent = force_signal(pid, log);
    let followup = followup_wait(timeout);
    log(&format!(
        "graceful stop timed out, force stop issued: pid={pid}, graceful_sent={graceful_sent}, force_sent={force_sent}, followup_wait_ms={}",
        followup.as_millis()
    ));
    if wait_for_child_exit(child, followup) {
        StopOutcome::Killed
    } else {
        StopOutcome::Unresponsive
    }
}
