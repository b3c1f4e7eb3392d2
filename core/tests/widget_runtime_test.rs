//! Widget Runtime Tests
//!
//! Drives mounted widgets against a scripted in-memory source on a paused
//! tokio clock:
//! - Immediate fetch, interval cadence and single-flight supersession
//! - Exponential retry delays, countdown and reset after success
//! - Stale data retention, manual retry, sourceless widgets, unmount
//! - Time-driven re-projection of rows (highlight expiry)

use async_trait::async_trait;
use chrono::{Duration as Days, Local};
use pulseboard_core::widgets::{DailyDueInConfig, DailyDueInPipeline};
use pulseboard_core::{
    DataSource, FetchState, ProcessedRow, RawRecord, RuntimeConfig, Widget, WidgetDescriptor,
    WidgetError, WidgetHandle, WidgetRequest,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration, Instant};

// =============================================================================
// Scripted source
// =============================================================================

#[derive(Clone)]
enum Reply {
    Rows(Vec<RawRecord>),
    Fail(&'static str),
}

#[derive(Clone)]
struct Step {
    delay: Duration,
    reply: Reply,
}

impl Step {
    fn ok(rows: Vec<RawRecord>) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Rows(rows),
        }
    }

    fn fail(message: &'static str) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Fail(message),
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct ScriptedSource {
    start: Instant,
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: Mutex<Vec<u64>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Milliseconds since creation at which each request started
    fn call_times(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn fetch(&self, _request: &WidgetRequest) -> pulseboard_core::Result<Vec<RawRecord>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        self.calls
            .lock()
            .unwrap()
            .push(self.start.elapsed().as_millis() as u64);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if !step.delay.is_zero() {
            sleep(step.delay).await;
        }
        match step.reply {
            Reply::Rows(rows) => Ok(rows),
            Reply::Fail(message) => Err(WidgetError::Api(message.to_string())),
        }
    }
}

fn row(id: u64) -> RawRecord {
    json!({ "id": id }).as_object().cloned().unwrap()
}

type Renders = Arc<Mutex<Vec<FetchState<RawRecord>>>>;

fn test_config() -> RuntimeConfig {
    RuntimeConfig {
        backoff_base_ms: 2_000,
        backoff_max_ms: 60_000,
        countdown_tick_ms: 1_000,
        ..RuntimeConfig::default()
    }
}

fn mount(
    source: &Arc<ScriptedSource>,
    interval: Option<Duration>,
) -> (WidgetHandle<RawRecord>, Renders) {
    let renders: Renders = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&renders);
    let descriptor = WidgetDescriptor::raw("test", WidgetRequest::get("TestWidget"))
        .with_source(Arc::clone(source) as Arc<dyn DataSource>)
        .with_interval(interval)
        .with_render(move |state: &FetchState<RawRecord>| sink.lock().unwrap().push(state.clone()));
    (Widget::spawn(descriptor, &test_config()), renders)
}

// =============================================================================
// Polling cadence
// =============================================================================

#[tokio::test(start_paused = true)]
async fn fetches_on_mount_and_every_interval() {
    let source = ScriptedSource::new(vec![], Step::ok(vec![row(1)]).slow(Duration::from_secs(1)));
    let (handle, renders) = mount(&source, Some(Duration::from_secs(5)));

    assert!(handle.state().loading);
    assert_eq!(renders.lock().unwrap()[0], FetchState::initial());

    sleep(Duration::from_millis(10_500)).await;

    // Ticks follow the mount time, not request completion.
    assert_eq!(source.call_times(), vec![0, 5_000, 10_000]);
    let state = handle.state();
    assert_eq!(state.data, Some(vec![row(1)]));
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[tokio::test(start_paused = true)]
async fn slow_request_is_superseded_by_next_tick() {
    let source = ScriptedSource::new(vec![], Step::ok(vec![row(1)]).slow(Duration::from_secs(3)));
    let (handle, _renders) = mount(&source, Some(Duration::from_secs(1)));

    sleep(Duration::from_millis(5_500)).await;

    assert_eq!(source.call_times(), vec![0, 1_000, 2_000, 3_000, 4_000, 5_000]);
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    // No superseded response ever landed.
    let state = handle.state();
    assert_eq!(state.data, None);
    assert!(state.loading);
}

#[tokio::test(start_paused = true)]
async fn fetch_once_without_interval() {
    let source = ScriptedSource::new(vec![], Step::ok(vec![row(7)]));
    let (handle, _renders) = mount(&source, None);

    sleep(Duration::from_secs(60)).await;

    assert_eq!(source.call_count(), 1);
    assert_eq!(handle.state().data, Some(vec![row(7)]));
}

// =============================================================================
// Retry and backoff
// =============================================================================

#[tokio::test(start_paused = true)]
async fn failures_back_off_exponentially() {
    let source = ScriptedSource::new(vec![], Step::fail("Database unavailable"));
    let (handle, _renders) = mount(&source, Some(Duration::from_secs(60)));

    sleep(Duration::from_millis(14_500)).await;

    // Retry delays 2s, 4s, 8s; the normal interval is paused meanwhile.
    assert_eq!(source.call_times(), vec![0, 2_000, 6_000, 14_000]);
    let state = handle.state();
    assert_eq!(state.error.as_deref(), Some("Database unavailable"));
    assert!(!state.loading);
    assert_eq!(state.data, None);
    assert!(state.is_retrying());
}

#[tokio::test(start_paused = true)]
async fn success_resets_backoff_and_rearms_interval() {
    let source = ScriptedSource::new(
        vec![
            Step::fail("a"),
            Step::fail("b"),
            Step::ok(vec![row(1)]),
            Step::fail("c"),
        ],
        Step::ok(vec![row(2)]),
    );
    let (handle, _renders) = mount(&source, Some(Duration::from_secs(10)));

    sleep(Duration::from_millis(19_000)).await;

    // 0 fail, +2s fail, +4s ok, interval restarts at 6s, 16s fail, +2s (reset) ok
    assert_eq!(source.call_times(), vec![0, 2_000, 6_000, 16_000, 18_000]);
    let state = handle.state();
    assert_eq!(state.data, Some(vec![row(2)]));
    assert_eq!(state.error, None);
    assert_eq!(state.retry_countdown_seconds, None);
}

#[tokio::test(start_paused = true)]
async fn retry_countdown_ticks_down() {
    let source = ScriptedSource::new(vec![Step::fail("down")], Step::ok(vec![row(1)]));
    let (handle, _renders) = mount(&source, Some(Duration::from_secs(30)));

    sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.state().retry_countdown_seconds, Some(2));

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(handle.state().retry_countdown_seconds, Some(1));

    sleep(Duration::from_millis(1_000)).await;
    let state = handle.state();
    assert_eq!(state.retry_countdown_seconds, None);
    assert_eq!(state.data, Some(vec![row(1)]));
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_last_good_data() {
    let source = ScriptedSource::new(
        vec![Step::ok(vec![row(1), row(2)]), Step::fail("timeout")],
        Step::ok(vec![row(3)]),
    );
    let (handle, _renders) = mount(&source, Some(Duration::from_secs(5)));

    sleep(Duration::from_millis(5_500)).await;
    let state = handle.state();
    assert_eq!(state.data, Some(vec![row(1), row(2)]));
    assert_eq!(state.error.as_deref(), Some("timeout"));
    assert!(!state.loading);

    sleep(Duration::from_secs(2)).await;
    let state = handle.state();
    assert_eq!(state.data, Some(vec![row(3)]));
    assert_eq!(state.error, None);
}

#[tokio::test(start_paused = true)]
async fn manual_retry_fetches_now_and_resets_backoff() {
    let source = ScriptedSource::new(vec![Step::fail("x"), Step::fail("y")], Step::fail("z"));
    let (handle, renders) = mount(&source, Some(Duration::from_secs(60)));

    sleep(Duration::from_millis(500)).await;
    handle.retry_now();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(source.call_times(), vec![0, 500]);
    {
        let renders = renders.lock().unwrap();
        assert!(renders
            .iter()
            .any(|s| s.loading && s.error.as_deref() == Some("x")));
    }
    let state = handle.state();
    assert_eq!(state.error.as_deref(), Some("y"));
    // Backoff was reset, so the next delay is the base delay again.
    assert_eq!(state.retry_countdown_seconds, Some(2));

    sleep(Duration::from_millis(2_000)).await;
    assert_eq!(source.call_times(), vec![0, 500, 2_500]);
}

#[tokio::test(start_paused = true)]
async fn manual_retry_cancels_pending_request() {
    let source = ScriptedSource::new(
        vec![Step::ok(vec![row(1)]).slow(Duration::from_secs(10))],
        Step::ok(vec![row(2)]).slow(Duration::from_secs(10)),
    );
    let (handle, _renders) = mount(&source, Some(Duration::from_secs(60)));

    sleep(Duration::from_secs(1)).await;
    handle.retry_now();

    // The first request would have answered at 10s.
    sleep(Duration::from_millis(9_500)).await;
    assert_eq!(source.call_times(), vec![0, 1_000]);
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    let state = handle.state();
    assert_eq!(state.data, None);
    assert!(state.loading);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.state().data, Some(vec![row(2)]));
    assert_eq!(source.call_times(), vec![0, 1_000]);
}

// =============================================================================
// Time-driven refresh
// =============================================================================

fn due_line(status: &str) -> Vec<RawRecord> {
    let today = Local::now().date_naive();
    let ordered = (today - Days::days(5)).format("%Y-%m-%d").to_string();
    let promised = (today - Days::days(1)).format("%Y-%m-%d").to_string();
    vec![json!({
        "po_number": "5001", "item_no": 1, "po_status": status, "vend_code": "ACME",
        "vend_name": "Acme Foods", "part_code": "1130", "unit_price": 12.5,
        "date_orderd": ordered, "vend_prom_date": promised
    })
    .as_object()
    .cloned()
    .unwrap()]
}

#[tokio::test(start_paused = true)]
async fn highlight_expires_while_backend_is_down() {
    let source = ScriptedSource::new(
        vec![Step::ok(due_line("R")), Step::ok(due_line("V"))],
        Step::fail("down"),
    );
    let descriptor = WidgetDescriptor::new(
        "daily_due_in",
        WidgetRequest::get("DailyDueInTable"),
        DailyDueInPipeline::new(DailyDueInConfig::default()),
    )
    .with_source(Arc::clone(&source) as Arc<dyn DataSource>)
    .with_interval(Some(Duration::from_secs(5)));
    let handle: WidgetHandle<ProcessedRow> = Widget::spawn(descriptor, &test_config());

    let highlighted = |handle: &WidgetHandle<ProcessedRow>| {
        handle.state().data.unwrap()[0]["highlighted"].clone()
    };

    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(highlighted(&handle), json!(true));

    // Received at 5s; held for 30s while every later fetch fails.
    sleep(Duration::from_secs(29)).await;
    assert_eq!(highlighted(&handle), json!(true));
    assert_eq!(handle.state().error.as_deref(), Some("down"));

    sleep(Duration::from_secs(1)).await;
    let state = handle.state();
    assert_eq!(state.data.as_ref().map(Vec::len), Some(1));
    assert_eq!(highlighted(&handle), json!(false));
    assert_eq!(state.error.as_deref(), Some("down"));
    assert!(state.is_retrying());
}

// =============================================================================
// Mount / unmount
// =============================================================================

#[tokio::test(start_paused = true)]
async fn widget_without_source_settles_immediately() {
    let renders: Arc<Mutex<Vec<FetchState<RawRecord>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&renders);
    let handle = Widget::spawn(
        WidgetDescriptor::raw("clock", WidgetRequest::get(""))
            .with_interval(Some(Duration::from_secs(1)))
            .with_render(move |s: &FetchState<RawRecord>| sink.lock().unwrap().push(s.clone())),
        &RuntimeConfig::default(),
    );

    sleep(Duration::from_secs(5)).await;

    assert_eq!(*renders.lock().unwrap(), vec![FetchState::idle()]);
    let state = handle.state();
    assert!(!state.loading);
    assert_eq!(state.data, None);
    assert!(state.is_empty());
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_polling() {
    let source = ScriptedSource::new(vec![], Step::ok(vec![row(1)]));
    let (handle, _renders) = mount(&source, Some(Duration::from_secs(1)));

    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(source.call_count(), 3);

    handle.shutdown().await;
    sleep(Duration::from_secs(10)).await;
    assert_eq!(source.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_cancels_in_flight_request() {
    let source = ScriptedSource::new(vec![], Step::ok(vec![row(1)]).slow(Duration::from_secs(30)));
    let (handle, _renders) = mount(&source, Some(Duration::from_secs(60)));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(source.in_flight.load(Ordering::SeqCst), 1);

    drop(handle);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(source.in_flight.load(Ordering::SeqCst), 0);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(source.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_updates() {
    let source = ScriptedSource::new(vec![], Step::ok(vec![row(4)]));
    let (handle, _renders) = mount(&source, None);
    let mut rx = handle.subscribe();

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().data, Some(vec![row(4)]));
}
