//! Widget runtime: one owned polling task per widget instance.
//!
//! The task fetches immediately, then every `interval`. A request that is
//! still pending when the next tick arrives is dropped and a fresh one is
//! issued, so there is never more than one request in flight. Failures pause
//! the interval and retry with a doubling delay; the first success afterwards
//! re-arms the interval from that moment.
//!
//! Cancellation is always done by dropping the request future. A dropped
//! request never touches `FetchState`.
//!
//! A pipeline may ask to re-project its last rows at a later instant (e.g. a
//! highlight expiring). The task does that between fetches, and while one is
//! pending, without touching the request.

use crate::backoff::Backoff;
use crate::config::RuntimeConfig;
use crate::request::WidgetRequest;
use crate::source::DataSource;
use crate::state::FetchState;
use crate::RawRecord;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Render callback: a projection of the current state, invoked on every change
pub type RenderFn<T> = Arc<dyn Fn(&FetchState<T>) + Send + Sync>;

/// Transformation applied to every successful batch of raw records.
///
/// Any `FnMut(Vec<RawRecord>) -> Vec<T>` closure is a pipeline. Stateful
/// pipelines whose rows change with time alone also implement the refresh
/// pair.
pub trait RowPipeline<T>: Send {
    fn process(&mut self, records: Vec<RawRecord>) -> Vec<T>;

    /// When the rows last returned stop being current without new data
    fn refresh_at(&self) -> Option<Instant> {
        None
    }

    /// Rows from the last batch re-projected for the current instant
    fn refresh(&mut self) -> Option<Vec<T>> {
        None
    }
}

impl<T, F> RowPipeline<T> for F
where
    F: FnMut(Vec<RawRecord>) -> Vec<T> + Send,
{
    fn process(&mut self, records: Vec<RawRecord>) -> Vec<T> {
        self(records)
    }
}

type BoxedPipeline<T> = Box<dyn RowPipeline<T>>;

/// Everything needed to mount a widget
pub struct WidgetDescriptor<T> {
    name: String,
    source: Option<Arc<dyn DataSource>>,
    request: WidgetRequest,
    interval: Option<Duration>,
    pipeline: BoxedPipeline<T>,
    render: Option<RenderFn<T>>,
}

impl WidgetDescriptor<RawRecord> {
    /// Descriptor that hands raw records straight to the render callback
    pub fn raw(name: impl Into<String>, request: WidgetRequest) -> Self {
        Self::new(name, request, |records: Vec<RawRecord>| records)
    }
}

impl<T> WidgetDescriptor<T> {
    pub fn new<P>(name: impl Into<String>, request: WidgetRequest, pipeline: P) -> Self
    where
        P: RowPipeline<T> + 'static,
    {
        Self {
            name: name.into(),
            source: None,
            request,
            interval: None,
            pipeline: Box::new(pipeline),
            render: None,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Polling period; `None` or zero means fetch once
    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn with_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&FetchState<T>) + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(render));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    RetryNow,
    Stop,
}

/// Handle to a mounted widget. Dropping it unmounts the widget.
pub struct WidgetHandle<T> {
    name: String,
    state: watch::Receiver<FetchState<T>>,
    commands: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
    // Keeps the channel open for widgets that never run a task
    _idle: Option<watch::Sender<FetchState<T>>>,
}

impl<T: Clone> WidgetHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current state
    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.clone()
    }

    /// User-triggered retry: shows loading, resets backoff, fetches now
    pub fn retry_now(&self) {
        let _ = self.commands.send(Command::RetryNow);
    }

    /// Stop polling and wait for the task to finish
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Stop);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!(target: "widget", widget = %self.name, "Widget unmounted");
    }
}

impl<T> Drop for WidgetHandle<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Entry point for mounting widgets
pub struct Widget;

impl Widget {
    /// Mount a widget. Must be called from within a tokio runtime.
    pub fn spawn<T>(descriptor: WidgetDescriptor<T>, config: &RuntimeConfig) -> WidgetHandle<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let WidgetDescriptor {
            name,
            source,
            request,
            interval,
            pipeline,
            render,
        } = descriptor;
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let Some(source) = source else {
            // Compute-only widget: settled immediately, no network activity.
            let state = FetchState::idle();
            if let Some(render) = &render {
                render(&state);
            }
            let (tx, rx) = watch::channel(state);
            debug!(target: "widget", widget = %name, "Mounted widget without a source");
            return WidgetHandle {
                name,
                state: rx,
                commands: cmd_tx,
                task: None,
                _idle: Some(tx),
            };
        };

        let state = FetchState::initial();
        if let Some(render) = &render {
            render(&state);
        }
        let (tx, rx) = watch::channel(state.clone());

        info!(
            target: "widget",
            widget = %name,
            query = %request.query(),
            interval_ms = interval.map(|d| d.as_millis() as u64).unwrap_or(0),
            "Mounting widget"
        );

        let runner = Runner {
            name: name.clone(),
            source,
            request,
            interval,
            pipeline,
            render,
            state,
            tx,
            commands: cmd_rx,
            refresh_deadline: None,
            backoff: Backoff::from_millis(config.backoff_base_ms, config.backoff_max_ms),
            countdown_tick: config.countdown_tick(),
        };
        let task = tokio::spawn(runner.run());

        WidgetHandle {
            name,
            state: rx,
            commands: cmd_tx,
            task: Some(task),
            _idle: None,
        }
    }
}

enum Phase {
    /// Issue a request; `next_tick` supersedes it if still pending
    Fetch { next_tick: Option<Instant> },
    WaitInterval(Instant),
    WaitRetry(Instant),
    /// Fetch-once widget that has settled; only commands wake it
    Idle,
}

enum Outcome {
    Done(crate::Result<Vec<RawRecord>>),
    Superseded,
    Command(Option<Command>),
}

struct Runner<T> {
    name: String,
    source: Arc<dyn DataSource>,
    request: WidgetRequest,
    interval: Option<Duration>,
    pipeline: BoxedPipeline<T>,
    render: Option<RenderFn<T>>,
    state: FetchState<T>,
    tx: watch::Sender<FetchState<T>>,
    commands: mpsc::UnboundedReceiver<Command>,
    /// Next instant the pipeline wants its rows re-projected
    refresh_deadline: Option<Instant>,
    backoff: Backoff,
    countdown_tick: Duration,
}

impl<T: Clone + Send + Sync + 'static> Runner<T> {
    async fn run(mut self) {
        let mut phase = Phase::Fetch {
            next_tick: self.interval.map(|i| Instant::now() + i),
        };

        loop {
            let next = match phase {
                Phase::Fetch { next_tick } => self.fetch(next_tick).await,
                Phase::WaitInterval(deadline) => self.wait_interval(deadline).await,
                Phase::WaitRetry(deadline) => self.wait_retry(deadline).await,
                Phase::Idle => self.wait_idle().await,
            };
            match next {
                Some(p) => phase = p,
                None => break,
            }
        }

        debug!(target: "widget", widget = %self.name, "Polling task stopped");
    }

    async fn fetch(&mut self, mut next_tick: Option<Instant>) -> Option<Phase> {
        loop {
            let source = Arc::clone(&self.source);
            let request = self.request.clone();
            debug!(target: "widget", widget = %self.name, "Issuing request");

            let pending = async move { source.fetch(&request).await };
            tokio::pin!(pending);
            let outcome = loop {
                tokio::select! {
                    res = &mut pending => break Outcome::Done(res),
                    _ = wait_for(next_tick) => break Outcome::Superseded,
                    cmd = self.commands.recv() => break Outcome::Command(cmd),
                    _ = wait_for(self.refresh_deadline) => self.refresh_rows(),
                }
            };

            match outcome {
                Outcome::Done(Ok(records)) => return Some(self.on_success(records, next_tick)),
                Outcome::Done(Err(err)) => return Some(self.on_failure(err.display_message())),
                Outcome::Superseded => {
                    debug!(target: "widget", widget = %self.name, "Request superseded by next tick");
                    next_tick = self.following_tick(next_tick);
                }
                Outcome::Command(cmd) => return self.on_command(cmd),
            }
        }
    }

    async fn wait_interval(&mut self, deadline: Instant) -> Option<Phase> {
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => {
                    return Some(Phase::Fetch {
                        next_tick: self.following_tick(Some(deadline)),
                    });
                }
                cmd = self.commands.recv() => return self.on_command(cmd),
                _ = wait_for(self.refresh_deadline) => self.refresh_rows(),
            }
        }
    }

    async fn wait_idle(&mut self) -> Option<Phase> {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => return self.on_command(cmd),
                _ = wait_for(self.refresh_deadline) => self.refresh_rows(),
            }
        }
    }

    async fn wait_retry(&mut self, deadline: Instant) -> Option<Phase> {
        let mut ticker = interval_at(Instant::now() + self.countdown_tick, self.countdown_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = sleep_until(deadline) => {
                    self.set_countdown(None);
                    // Retries run with the normal interval paused.
                    return Some(Phase::Fetch { next_tick: None });
                }
                cmd = self.commands.recv() => return self.on_command(cmd),
                _ = wait_for(self.refresh_deadline) => self.refresh_rows(),
                _ = ticker.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let secs = Backoff::countdown_seconds(remaining);
                    self.set_countdown((secs > 0).then_some(secs));
                }
            }
        }
    }

    fn on_success(&mut self, records: Vec<RawRecord>, next_tick: Option<Instant>) -> Phase {
        let recovered = self.state.error.is_some();
        let rows = self.pipeline.process(records);
        debug!(target: "widget", widget = %self.name, rows = rows.len(), "Fetch succeeded");

        self.backoff.reset();
        self.state.data = Some(rows);
        self.state.error = None;
        self.state.loading = false;
        self.state.retry_countdown_seconds = None;
        self.publish();
        self.refresh_deadline = self.pipeline.refresh_at();

        if recovered {
            info!(target: "widget", widget = %self.name, "Widget recovered");
        }

        match (self.interval, next_tick) {
            (Some(_), Some(tick)) => Phase::WaitInterval(tick),
            // Back from a retry sequence: interval restarts now
            (Some(interval), None) => Phase::WaitInterval(Instant::now() + interval),
            (None, _) => Phase::Idle,
        }
    }

    fn on_failure(&mut self, message: String) -> Phase {
        let delay = self.backoff.next_delay();
        warn!(
            target: "widget",
            widget = %self.name,
            error = %message,
            delay_ms = delay.as_millis() as u64,
            "Fetch failed; scheduling retry"
        );

        // Last good data stays in place.
        self.state.error = Some(message);
        self.state.loading = false;
        self.state.retry_countdown_seconds = Some(Backoff::countdown_seconds(delay));
        self.publish();

        Phase::WaitRetry(Instant::now() + delay)
    }

    fn on_command(&mut self, cmd: Option<Command>) -> Option<Phase> {
        match cmd {
            Some(Command::RetryNow) => {
                info!(target: "widget", widget = %self.name, "Manual retry");
                self.backoff.reset();
                self.state.loading = true;
                self.state.retry_countdown_seconds = None;
                self.publish();
                Some(Phase::Fetch {
                    next_tick: self.interval.map(|i| Instant::now() + i),
                })
            }
            Some(Command::Stop) | None => None,
        }
    }

    fn following_tick(&self, previous: Option<Instant>) -> Option<Instant> {
        let interval = self.interval?;
        let now = Instant::now();
        let next = previous.map_or(now + interval, |p| p + interval);
        Some(if next <= now { now + interval } else { next })
    }

    /// Re-project the last rows without fetching; errors and countdown stay
    fn refresh_rows(&mut self) {
        if let Some(rows) = self.pipeline.refresh() {
            debug!(target: "widget", widget = %self.name, rows = rows.len(), "Rows refreshed");
            self.state.data = Some(rows);
            self.publish();
        }
        self.refresh_deadline = self.pipeline.refresh_at();
    }

    fn set_countdown(&mut self, value: Option<u64>) {
        if self.state.retry_countdown_seconds != value {
            self.state.retry_countdown_seconds = value;
            self.publish();
        }
    }

    fn publish(&self) {
        if let Some(render) = &self.render {
            render(&self.state);
        }
        self.tx.send_replace(self.state.clone());
    }
}

fn wait_for(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(d) => sleep_until(d).await,
            None => std::future::pending::<()>().await,
        }
    }
}
