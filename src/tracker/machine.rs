use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing;
use crate::config::Config;
use crate::errors::{ApiError, ApiResult};
use crate::models::{CreateResearchResponse, StatusResponse, Task, TaskResult, TaskStatus};
use crate::presentation::{elapsed_between, format_elapsed, ProgressModel, TrackerView};
use super::scheduler::{Scheduler, TimerKind, TimerTick};
use super::session::{Failure, FailureKind, Session, TrackerState};

const CLOCK_INTERVAL: Duration = Duration::from_secs(1);

const SUBMISSION_FALLBACK: &str = "Failed to start research. Please try again.";
const JOB_FAILED_FALLBACK: &str = "Research failed";
const TASK_LOST_MESSAGE: &str =
    "Task not found. The research may have been interrupted; please start a new search.";
const CONNECTION_LOST_MESSAGE: &str =
    "Lost connection to the server. Please check your connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_consecutive_errors: u32,
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            max_consecutive_errors: config.polling.max_consecutive_errors,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_consecutive_errors: 3,
        }
    }
}

// Network work the tracker asks its driver to perform. The generation ties
// the eventual response back to the session that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Create { generation: u64, location: String },
    Status { generation: u64, task_id: String },
}

/// The task-tracking state machine. Owns the session and the scheduler;
/// every input arrives through one of the `on_*` methods or `submit`/`reset`.
pub struct Tracker<S: Scheduler> {
    session: Session,
    scheduler: S,
    policy: PollPolicy,
    progress: ProgressModel,
}

impl<S: Scheduler> Tracker<S> {
    pub fn new(scheduler: S, policy: PollPolicy, progress: ProgressModel) -> Self {
        Self {
            session: Session::new(),
            scheduler,
            policy,
            progress,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn view(&self) -> TrackerView {
        TrackerView::project(&self.session, &self.progress)
    }

    /// Starts a new research task. Blank input and input while a task is
    /// being tracked are refused without issuing a request.
    pub fn submit(&mut self, input: &str) -> Option<Request> {
        let location = input.trim();
        if location.is_empty() {
            tracing::debug!("Ignoring blank location");
            return None;
        }
        if !self.session.input_enabled() {
            tracing::warn!("Submission refused while session is {:?}", self.session.state);
            return None;
        }

        // Retrying after a failed submission starts from a clean session
        self.teardown();
        self.session.state = TrackerState::Submitting;
        self.session.pending_location = Some(location.to_string());

        tracing::info!("Submitting research for {}", location);
        Some(Request::Create {
            generation: self.session.generation,
            location: location.to_string(),
        })
    }

    /// Handles the creation response. On success the session enters polling
    /// and the first status check is returned right away.
    pub fn on_created(
        &mut self,
        generation: u64,
        result: ApiResult<CreateResearchResponse>,
        now: DateTime<Utc>,
    ) -> Option<Request> {
        if !self.session.is_current(generation) || self.session.state != TrackerState::Submitting {
            tracing::debug!("Discarding stale creation response (generation {})", generation);
            return None;
        }

        let resp = match result {
            Ok(resp) if !resp.task_id.trim().is_empty() => resp,
            Ok(_) => {
                tracing::error!("Creation response carried no task id");
                self.fail(FailureKind::Submission, SUBMISSION_FALLBACK.to_string());
                return None;
            }
            Err(e) => {
                tracing::error!("Failed to start research: {}", e);
                let message = e.server_message().unwrap_or(SUBMISSION_FALLBACK).to_string();
                self.fail(FailureKind::Submission, message);
                return None;
            }
        };

        if let Some(message) = &resp.message {
            tracing::debug!("Backend: {}", message);
        }

        let location = self.session.pending_location.take().unwrap_or_default();
        let status = resp.status.unwrap_or(TaskStatus::Pending);
        let task_id = resp.task_id;

        tracing::info!("Research task {} accepted, polling every {:?}", task_id, self.policy.interval);

        self.session.task = Some(Task::new(task_id.clone(), location, status, now));
        self.session.state = TrackerState::Polling;
        self.session.consecutive_errors = 0;
        self.session.elapsed_secs = 0;
        self.start_timers();

        Some(Request::Status { generation, task_id })
    }

    /// Handles a timer tick. Ticks from timers that are no longer active
    /// (cancelled after the tick was queued) are dropped.
    pub fn on_tick(&mut self, tick: TimerTick, now: DateTime<Utc>) -> Option<Request> {
        match tick.kind {
            TimerKind::Poll if self.session.poll_timer == Some(tick.id) => {
                let task = self.session.task.as_ref()?;
                tracing::debug!("Poll tick for task {}", task.id);
                Some(Request::Status {
                    generation: self.session.generation,
                    task_id: task.id.clone(),
                })
            }
            TimerKind::Clock if self.session.clock_timer == Some(tick.id) => {
                self.update_elapsed(now);
                None
            }
            _ => {
                tracing::trace!("Ignoring tick from inactive timer {:?}", tick.id);
                None
            }
        }
    }

    /// Handles a status check result.
    pub fn on_status(
        &mut self,
        generation: u64,
        result: ApiResult<StatusResponse>,
        now: DateTime<Utc>,
    ) {
        if !self.session.is_current(generation) || self.session.state != TrackerState::Polling {
            tracing::debug!("Discarding stale status response (generation {})", generation);
            return;
        }

        match result {
            Ok(resp) => self.apply_status(resp, now),
            Err(e) => self.record_poll_error(e),
        }
    }

    /// Returns the session to idle, clearing timers and identifiers.
    /// Returns `false` when there was nothing to reset.
    pub fn reset(&mut self) -> bool {
        if self.session.state == TrackerState::Idle && !self.session.has_timers() {
            return false;
        }
        tracing::info!("Resetting session");
        self.teardown();
        true
    }

    fn apply_status(&mut self, resp: StatusResponse, now: DateTime<Utc>) {
        self.session.consecutive_errors = 0;
        self.update_elapsed(now);

        let elapsed = format_elapsed(self.session.elapsed_secs);
        let Some(task) = self.session.task.as_mut() else {
            return;
        };

        if let Some(location) = resp.location.filter(|l| !l.trim().is_empty()) {
            task.location = location;
        }

        if task.status != resp.status {
            tracing::info!("[{}] status: {}", elapsed, resp.status);
        }
        task.status = resp.status.clone();
        if task.status.is_terminal() {
            task.finished_at = Some(now);
        }

        match resp.status {
            TaskStatus::Completed => {
                task.result = Some(TaskResult {
                    report_length: resp.report_length.unwrap_or(0),
                    document_path: resp.document_path,
                    sentiment: resp.sentiment,
                });
                tracing::info!("Research task {} completed after {}", task.id, elapsed);
                self.stop_timers();
                self.session.state = TrackerState::Completed;
            }
            TaskStatus::Failed => {
                let message = resp
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| JOB_FAILED_FALLBACK.to_string());
                self.fail(FailureKind::TerminalJob, message);
            }
            _ => {}
        }
    }

    fn record_poll_error(&mut self, err: ApiError) {
        self.session.consecutive_errors += 1;
        let count = self.session.consecutive_errors;
        tracing::warn!(
            "Status check failed ({}/{}): {}",
            count,
            self.policy.max_consecutive_errors,
            err
        );

        if count >= self.policy.max_consecutive_errors {
            let message = if err.is_not_found() {
                TASK_LOST_MESSAGE
            } else {
                CONNECTION_LOST_MESSAGE
            };
            self.fail(FailureKind::ConnectivityExhausted, message.to_string());
        }
    }

    // Single exit for every user-visible failure; always stops the timers
    fn fail(&mut self, kind: FailureKind, message: String) {
        tracing::error!("Session failed ({:?}): {}", kind, message);
        self.stop_timers();
        if let Some(task) = self.session.task.as_mut() {
            task.error = Some(message.clone());
        }
        self.session.pending_location = None;
        self.session.failure = Some(Failure { kind, message });
        self.session.state = TrackerState::Failed;
    }

    fn update_elapsed(&mut self, now: DateTime<Utc>) {
        if let Some(task) = &self.session.task {
            let elapsed = elapsed_between(task.submitted_at, now);
            // Never let a clock adjustment move the bar backwards
            self.session.elapsed_secs = self.session.elapsed_secs.max(elapsed);
        }
    }

    fn start_timers(&mut self) {
        self.stop_timers();
        self.session.poll_timer = Some(
            self.scheduler
                .start_recurring(TimerKind::Poll, self.policy.interval),
        );
        self.session.clock_timer = Some(
            self.scheduler
                .start_recurring(TimerKind::Clock, CLOCK_INTERVAL),
        );
    }

    fn stop_timers(&mut self) {
        if let Some(id) = self.session.poll_timer.take() {
            self.scheduler.cancel(id);
        }
        if let Some(id) = self.session.clock_timer.take() {
            self.scheduler.cancel(id);
        }
    }

    fn teardown(&mut self) {
        self.stop_timers();
        self.session.clear();
    }
}
