use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Idle,
    Starting,
    AwaitingReadiness,
    Ready,
    Stopped,
    Failed,
}

impl SupervisorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::AwaitingReadiness => "awaiting-readiness",
            Self::Ready => "ready",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
pub struct SupervisorStateMachine {
    state: SupervisorState,
}

impl SupervisorStateMachine {
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn try_begin_start(&mut self) -> bool {
        if self.state == SupervisorState::Idle {
            self.state = SupervisorState::Starting;
            return true;
        }
        false
    }

    pub fn mark_spawned(&mut self) -> bool {
        if self.state == SupervisorState::Starting {
            self.state = SupervisorState::AwaitingReadiness;
            return true;
        }
        false
    }

    pub fn mark_ready(&mut self) -> bool {
        if self.state == SupervisorState::AwaitingReadiness {
            self.state = SupervisorState::Ready;
            return true;
        }
        false
    }

    pub fn mark_failed(&mut self) -> bool {
        if matches!(
            self.state,
            SupervisorState::Starting | SupervisorState::AwaitingReadiness
        ) {
            self.state = SupervisorState::Failed;
            return true;
        }
        false
    }

    /// Returns the state that was left. `Failed` stays `Failed`.
    pub fn mark_stopped(&mut self) -> SupervisorState {
        let previous = self.state;
        if previous != SupervisorState::Failed {
            self.state = SupervisorState::Stopped;
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_flows_from_idle_to_stopped() {
        let mut machine = SupervisorStateMachine::default();
        assert_eq!(machine.state(), SupervisorState::Idle);

        assert!(machine.try_begin_start());
        assert_eq!(machine.state(), SupervisorState::Starting);
        assert!(machine.mark_spawned());
        assert_eq!(machine.state(), SupervisorState::AwaitingReadiness);
        assert!(machine.mark_ready());
        assert_eq!(machine.state(), SupervisorState::Ready);

        assert_eq!(machine.mark_stopped(), SupervisorState::Ready);
        assert_eq!(machine.state(), SupervisorState::Stopped);
        assert_eq!(machine.mark_stopped(), SupervisorState::Stopped);
    }

    #[test]
    fn state_machine_rejects_second_start() {
        let mut machine = SupervisorStateMachine::default();
        assert!(machine.try_begin_start());
        assert!(!machine.try_begin_start());

        machine.mark_stopped();
        assert!(!machine.try_begin_start());
    }

    #[test]
    fn failed_is_terminal() {
        let mut machine = SupervisorStateMachine::default();
        assert!(machine.try_begin_start());
        assert!(machine.mark_failed());
        assert!(!machine.mark_ready());
        assert_eq!(machine.mark_stopped(), SupervisorState::Failed);
        assert_eq!(machine.state(), SupervisorState::Failed);
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn stop_during_readiness_wins_over_late_failure() {
        let mut machine = SupervisorStateMachine::default();
        assert!(machine.try_begin_start());
        assert!(machine.mark_spawned());
        machine.mark_stopped();
        assert!(!machine.mark_failed());
        assert!(!machine.mark_ready());
        assert_eq!(machine.state(), SupervisorState::Stopped);
    }
}
