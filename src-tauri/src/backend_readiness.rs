use std::{
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError},
    thread,
    time::{Duration, Instant},
};

use crate::{
    errors::SupervisorError,
    process_monitor::{describe_exit_status, ProcessEvent},
};

pub const READY_ATTEMPT_TIMEOUT_MS: u64 = 1_000;
pub const READY_BACKOFF_MS: u64 = 500;
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 30_000;

/// TCP readiness poller. Only connection acceptance is checked, never a protocol response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessProbe {
    attempt_timeout: Duration,
    backoff: Duration,
    budget: Duration,
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self::with_budget(Duration::from_millis(DEFAULT_READY_TIMEOUT_MS))
    }
}

impl ReadinessProbe {
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            attempt_timeout: Duration::from_millis(READY_ATTEMPT_TIMEOUT_MS),
            backoff: Duration::from_millis(READY_BACKOFF_MS),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn wait_for_port(&self, host: &str, port: u16) -> Result<(), SupervisorError> {
        self.poll(host, port, None)
    }

    pub fn wait_for_ready(
        &self,
        host: &str,
        port: u16,
        events: &Receiver<ProcessEvent>,
    ) -> Result<(), SupervisorError> {
        self.poll(host, port, Some(events))
    }

    fn poll(
        &self,
        host: &str,
        port: u16,
        events: Option<&Receiver<ProcessEvent>>,
    ) -> Result<(), SupervisorError> {
        let started = Instant::now();
        let mut events = events;
        loop {
            if let Some(receiver) = events {
                match receiver.try_recv() {
                    Ok(event) => return Err(process_event_error(event)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => events = None,
                }
            }

            let remaining = self.budget.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(self.timeout_error(host, port));
            }
            if try_connect(host, port, self.attempt_timeout.min(remaining)) {
                return Ok(());
            }

            let remaining = self.budget.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(self.timeout_error(host, port));
            }
            let pause = self.backoff.min(remaining);
            match events {
                Some(receiver) => match receiver.recv_timeout(pause) {
                    Ok(event) => return Err(process_event_error(event)),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        events = None;
                        thread::sleep(pause);
                    }
                },
                None => thread::sleep(pause),
            }
        }
    }

    fn timeout_error(&self, host: &str, port: u16) -> SupervisorError {
        SupervisorError::Timeout {
            host: host.to_string(),
            port,
            timeout_ms: self.budget.as_millis().try_into().unwrap_or(u64::MAX),
        }
    }
}

fn resolve_addr(host: &str, port: u16) -> Option<SocketAddr> {
    (host, port).to_socket_addrs().ok()?.next()
}

fn try_connect(host: &str, port: u16, timeout: Duration) -> bool {
    let Some(addr) = resolve_addr(host, port) else {
        return false;
    };
    // The stream is dropped right away; a completed handshake is the whole signal.
    TcpStream::connect_timeout(&addr, timeout).is_ok()
}

fn process_event_error(event: ProcessEvent) -> SupervisorError {
    match event {
        ProcessEvent::Exited(status) => SupervisorError::ProcessExited {
            status: describe_exit_status(&status),
        },
        ProcessEvent::Failed { command, reason } => {
            SupervisorError::ProcessSpawn { command, reason }
        }
        ProcessEvent::Detached => SupervisorError::ProcessExited {
            status: "stopped before becoming ready".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port_allocator::allocate_free_port;
    use std::{
        net::{Ipv4Addr, TcpListener},
        sync::mpsc,
    };

    const HOST: &str = "127.0.0.1";

    #[test]
    fn ready_when_port_accepts() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind listener");
        let port = listener.local_addr().expect("listener addr").port();
        let probe = ReadinessProbe::with_budget(Duration::from_secs(5));
        probe.wait_for_port(HOST, port).expect("port should be ready");
    }

    #[test]
    fn ready_once_listener_appears_mid_wait() {
        let port = allocate_free_port().expect("allocate port");
        let binder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(700));
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).expect("late bind");
            thread::sleep(Duration::from_secs(1));
            drop(listener);
        });

        let (_sender, receiver) = mpsc::channel::<ProcessEvent>();
        ReadinessProbe::with_budget(Duration::from_secs(10))
            .wait_for_ready(HOST, port, &receiver)
            .expect("late listener should be detected");
        binder.join().expect("join binder");
    }

    #[test]
    fn closed_port_times_out_within_budget_plus_backoff() {
        let port = allocate_free_port().expect("allocate port");
        let budget = Duration::from_millis(300);
        let started = Instant::now();
        let result = ReadinessProbe::with_budget(budget).wait_for_port(HOST, port);
        let elapsed = started.elapsed();

        match result {
            Err(SupervisorError::Timeout { port: p, timeout_ms, .. }) => {
                assert_eq!(p, port);
                assert_eq!(timeout_ms, 300);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        let slack = Duration::from_millis(500);
        assert!(elapsed < budget + Duration::from_millis(READY_BACKOFF_MS) + slack);
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        std::process::Command::new("sh")
            .args(["-c", &format!("exit {code}")])
            .status()
            .expect("run shell")
    }

    #[cfg(unix)]
    #[test]
    fn process_exit_wins_over_long_budget() {
        let port = allocate_free_port().expect("allocate port");
        let (sender, receiver) = mpsc::channel();
        let notifier = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            sender.send(ProcessEvent::Exited(exit_status(1))).expect("send exit");
        });

        let started = Instant::now();
        let result = ReadinessProbe::with_budget(Duration::from_secs(30))
            .wait_for_ready(HOST, port, &receiver);
        assert!(started.elapsed() < Duration::from_secs(5));
        match result {
            Err(SupervisorError::ProcessExited { status }) => assert_eq!(status, "exit code 1"),
            other => panic!("expected process exit, got {other:?}"),
        }
        notifier.join().expect("join notifier");
    }

    #[cfg(unix)]
    #[test]
    fn clean_exit_before_ready_is_still_a_failure() {
        let port = allocate_free_port().expect("allocate port");
        let (sender, receiver) = mpsc::channel();
        sender.send(ProcessEvent::Exited(exit_status(0))).expect("send exit");

        let result = ReadinessProbe::default().wait_for_ready(HOST, port, &receiver);
        assert!(matches!(result, Err(SupervisorError::ProcessExited { .. })));
    }

    #[test]
    fn process_failure_maps_to_spawn_error() {
        let port = allocate_free_port().expect("allocate port");
        let (sender, receiver) = mpsc::channel();
        sender
            .send(ProcessEvent::Failed {
                command: "backend".to_string(),
                reason: "poll failed".to_string(),
            })
            .expect("send failure");

        let result = ReadinessProbe::default().wait_for_ready(HOST, port, &receiver);
        match result {
            Err(SupervisorError::ProcessSpawn { command, reason }) => {
                assert_eq!(command, "backend");
                assert_eq!(reason, "poll failed");
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[test]
    fn dropped_event_source_falls_back_to_timeout() {
        let port = allocate_free_port().expect("allocate port");
        let (sender, receiver) = mpsc::channel::<ProcessEvent>();
        drop(sender);

        let result = ReadinessProbe::with_budget(Duration::from_millis(300))
            .wait_for_ready(HOST, port, &receiver);
        assert!(matches!(result, Err(SupervisorError::Timeout { .. })));
    }
}
