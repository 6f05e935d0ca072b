use crate::models::Task;
use super::scheduler::TimerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
}

impl TrackerState {
    // True while a request or timer can still change the session
    pub fn is_active(&self) -> bool {
        matches!(self, TrackerState::Submitting | TrackerState::Polling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    // Rejected before or while creating the task
    Submission,
    // Backend reported `failed`
    TerminalJob,
    // Too many consecutive transient poll errors
    ConnectivityExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

/// The single client session. Holds at most one task and at most one timer
/// of each kind; only the tracker mutates it.
#[derive(Debug)]
pub struct Session {
    pub(crate) state: TrackerState,
    pub(crate) generation: u64,
    pub(crate) pending_location: Option<String>,
    pub(crate) task: Option<Task>,
    pub(crate) consecutive_errors: u32,
    pub(crate) elapsed_secs: u64,
    pub(crate) poll_timer: Option<TimerId>,
    pub(crate) clock_timer: Option<TimerId>,
    pub(crate) failure: Option<Failure>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: TrackerState::Idle,
            generation: 0,
            pending_location: None,
            task: None,
            consecutive_errors: 0,
            elapsed_secs: 0,
            poll_timer: None,
            clock_timer: None,
            failure: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    #[cfg(test)]
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn has_timers(&self) -> bool {
        self.poll_timer.is_some() || self.clock_timer.is_some()
    }

    // A failed submission keeps the form usable so the user can retry
    pub fn input_enabled(&self) -> bool {
        match self.state {
            TrackerState::Idle => true,
            TrackerState::Failed => matches!(
                self.failure,
                Some(Failure { kind: FailureKind::Submission, .. })
            ),
            _ => false,
        }
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub(crate) fn clear(&mut self) {
        self.generation += 1;
        self.state = TrackerState::Idle;
        self.pending_location = None;
        self.task = None;
        self.consecutive_errors = 0;
        self.elapsed_secs = 0;
        self.failure = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
