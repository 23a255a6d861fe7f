/// Lifecycle state of a job.
///
/// `Queued -> Running (-> Retrying -> Running)* -> Succeeded | Failed | Canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Running,
    Retrying,
    Succeeded,
    Failed,
    Canceled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Retrying => "retrying",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Canceled => "canceled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Canceled
        )
    }

    /// Whether `self -> next` is a legal lifecycle step.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Queued, Running) | (Queued, Canceled) => true,
            (Running, Retrying) | (Retrying, Running) => true,
            (Running | Retrying, Succeeded | Failed | Canceled) => true,
            _ => false,
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    Succeeded,
    /// Retries exhausted or a non-recoverable error; `error` carries the last diagnostic.
    Failed { error: String },
    Canceled,
}

impl TerminalOutcome {
    pub fn state(&self) -> JobState {
        match self {
            TerminalOutcome::Succeeded => JobState::Succeeded,
            TerminalOutcome::Failed { .. } => JobState::Failed,
            TerminalOutcome::Canceled => JobState::Canceled,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TerminalOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_final() {
        for terminal in [JobState::Succeeded, JobState::Failed, JobState::Canceled] {
            assert!(terminal.is_terminal());
            for next in [
                JobState::Queued,
                JobState::Running,
                JobState::Retrying,
                JobState::Succeeded,
                JobState::Failed,
                JobState::Canceled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn retry_cycle() {
        assert!(JobState::Queued.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::Retrying));
        assert!(JobState::Retrying.can_transition_to(JobState::Running));
        assert!(JobState::Retrying.can_transition_to(JobState::Canceled));
        assert!(!JobState::Queued.can_transition_to(JobState::Succeeded));
    }

    #[test]
    fn outcome_state_and_error() {
        let failed = TerminalOutcome::Failed {
            error: "exit status 1".into(),
        };
        assert_eq!(failed.state(), JobState::Failed);
        assert_eq!(failed.error(), Some("exit status 1"));
        assert_eq!(TerminalOutcome::Canceled.error(), None);
    }
}
