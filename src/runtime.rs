use std::io::BufRead;
use std::sync::Arc;
use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing;
use crate::config::Config;
use crate::errors::{ApiResult, AppResult};
use crate::models::{CreateResearchResponse, StatusResponse};
use crate::presentation::{ProgressModel, TrackerView};
use crate::render;
use crate::services::ResearchApi;
use crate::tracker::{PollPolicy, Request, TimerTick, TokioScheduler, Tracker, TrackerState};

// Everything except timer ticks that can wake the event loop
#[derive(Debug)]
pub enum Event {
    Input(String),
    InputClosed,
    Created {
        generation: u64,
        result: ApiResult<CreateResearchResponse>,
    },
    Status {
        generation: u64,
        result: ApiResult<StatusResponse>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Single-owner event loop: the tracker is only ever touched from `run`.
pub struct Runtime {
    tracker: Tracker<TokioScheduler>,
    api: Arc<dyn ResearchApi>,
    events_tx: UnboundedSender<Event>,
    events: UnboundedReceiver<Event>,
    ticks: UnboundedReceiver<TimerTick>,
    shutdown: CancellationToken,
    input_closed: bool,
    last_view: Option<TrackerView>,
}

impl Runtime {
    pub fn new(config: &Config, api: Arc<dyn ResearchApi>, shutdown: CancellationToken) -> Self {
        let (ticks_tx, ticks) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(ticks_tx, shutdown.child_token());

        Self {
            tracker: Tracker::new(
                scheduler,
                PollPolicy::from_config(config),
                ProgressModel::from_config(config),
            ),
            api,
            events_tx,
            events,
            ticks,
            shutdown,
            input_closed: false,
            last_view: None,
        }
    }

    pub fn sender(&self) -> UnboundedSender<Event> {
        self.events_tx.clone()
    }

    /// Runs until `/quit`, shutdown, or closed input with no task in flight.
    /// Returns the last view before the session was torn down.
    pub async fn run(mut self) -> AppResult<TrackerView> {
        tracing::info!("Tracker event loop started");
        self.render_changes();

        loop {
            let flow = tokio::select! {
                _ = self.shutdown.cancelled() => Flow::Exit,
                Some(tick) = self.ticks.recv() => {
                    if let Some(request) = self.tracker.on_tick(tick, Utc::now()) {
                        self.dispatch(request);
                    }
                    Flow::Continue
                }
                Some(event) = self.events.recv() => self.handle_event(event),
            };

            if flow == Flow::Exit {
                break;
            }
            self.render_changes();

            if self.input_closed && !self.tracker.session().state().is_active() {
                tracing::debug!("Input closed and no task in flight");
                break;
            }
        }

        let view = self.tracker.view();
        self.tracker.reset();
        tracing::info!("Tracker event loop stopped");
        Ok(view)
    }

    fn handle_event(&mut self, event: Event) -> Flow {
        match event {
            Event::Input(line) => return self.handle_input(line.trim()),
            Event::InputClosed => {
                tracing::debug!("Input closed");
                self.input_closed = true;
            }
            Event::Created { generation, result } => {
                if let Some(request) = self.tracker.on_created(generation, result, Utc::now()) {
                    self.dispatch(request);
                }
            }
            Event::Status { generation, result } => {
                self.tracker.on_status(generation, result, Utc::now());
            }
        }
        Flow::Continue
    }

    fn handle_input(&mut self, line: &str) -> Flow {
        if line.is_empty() {
            return Flow::Continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match command {
                "quit" | "exit" => return Flow::Exit,
                "help" => render::help(),
                "reset" => {
                    if !self.tracker.reset() {
                        render::info("Nothing to reset.");
                    }
                }
                "status" => {
                    // Forces a full redraw on the next render pass
                    self.last_view = None;
                }
                other => render::error(&format!("unknown command: /{}", other)),
            }
            return Flow::Continue;
        }

        match self.tracker.submit(line) {
            Some(request) => self.dispatch(request),
            None => render::info("A research task is already being tracked. Type /reset to start over."),
        }
        Flow::Continue
    }

    // Requests run concurrently and report back through the event queue.
    // Overlapping status checks are allowed; stale answers are dropped by
    // the tracker based on their generation.
    fn dispatch(&self, request: Request) {
        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let event = match request {
                Request::Create { generation, location } => Event::Created {
                    generation,
                    result: api.create_research(&location).await,
                },
                Request::Status { generation, task_id } => Event::Status {
                    generation,
                    result: api.get_status(&task_id).await,
                },
            };
            // The loop may already have exited
            let _ = events.send(event);
        });
    }

    fn render_changes(&mut self) {
        let view = self.tracker.view();
        let previous = self.last_view.replace(view.clone());

        match previous {
            Some(prev) if prev.state == view.state => {
                let moved = prev.elapsed != view.elapsed || prev.status_text != view.status_text;
                if view.state == TrackerState::Polling && moved {
                    render::progress(&view);
                }
            }
            _ => {
                let download_url = match (view.state, &view.task_id) {
                    (TrackerState::Completed, Some(id)) => Some(self.api.download_url(id)),
                    _ => None,
                };
                render::transition(&view, download_url.as_deref());
            }
        }
    }
}

// Blocking stdin reader on its own thread, as tokio recommends for
// interactive input
pub fn spawn_input_reader(events: UnboundedSender<Event>) -> AppResult<()> {
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if events.send(Event::Input(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
            let _ = events.send(Event::InputClosed);
        })?;
    Ok(())
}
