use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use crate::{logging::LogCategory, supervisor::Supervisor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPhase {
    #[default]
    Running,
    CleanupInProgress,
    ReadyToExit,
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequestDecision {
    AllowExit,
    RunCleanupFirst,
    AwaitRunningCleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    ExitRequested,
    ExitFallback,
    AllWindowsClosed,
}

impl ExitTrigger {
    fn label(self) -> &'static str {
        match self {
            Self::ExitRequested => "exit request",
            Self::ExitFallback => "exit fallback",
            Self::AllWindowsClosed => "all windows closed",
        }
    }
}

#[derive(Debug, Default)]
pub struct ShutdownGate {
    phase: Mutex<ShutdownPhase>,
    last_window_closed: AtomicBool,
}

impl ShutdownGate {
    fn lock(&self) -> MutexGuard<'_, ShutdownPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.lock()
    }

    pub fn decide_exit_request(&self) -> ExitRequestDecision {
        let mut phase = self.lock();
        match *phase {
            ShutdownPhase::Running => {
                *phase = ShutdownPhase::CleanupInProgress;
                ExitRequestDecision::RunCleanupFirst
            }
            ShutdownPhase::CleanupInProgress => ExitRequestDecision::AwaitRunningCleanup,
            ShutdownPhase::ReadyToExit => {
                *phase = ShutdownPhase::Exiting;
                ExitRequestDecision::AllowExit
            }
            ShutdownPhase::Exiting => ExitRequestDecision::AllowExit,
        }
    }

    pub fn try_begin_fallback_cleanup(&self) -> bool {
        let mut phase = self.lock();
        if *phase == ShutdownPhase::Running {
            *phase = ShutdownPhase::Exiting;
            return true;
        }
        false
    }

    pub fn note_last_window_closed(&self) {
        self.last_window_closed.store(true, Ordering::SeqCst);
    }

    pub fn take_last_window_closed(&self) -> bool {
        self.last_window_closed.swap(false, Ordering::SeqCst)
    }

    pub fn finish_cleanup(&self) {
        let mut phase = self.lock();
        if *phase == ShutdownPhase::CleanupInProgress {
            *phase = ShutdownPhase::ReadyToExit;
        }
    }
}

pub fn stop_backend_for_exit(supervisor: &Supervisor, trigger: ExitTrigger) {
    supervisor.log(
        LogCategory::Shutdown,
        &format!("{}: stopping backend", trigger.label()),
    );
    match supervisor.stop() {
        Ok(()) => supervisor.log(
            LogCategory::Shutdown,
            &format!("{}: backend stop finished", trigger.label()),
        ),
        Err(error) => supervisor.log(
            LogCategory::Shutdown,
            &format!("{}: backend stop failed: {error}", trigger.label()),
        ),
    }
}
