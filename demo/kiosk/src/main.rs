mod config;
use config::{KioskConfig, WidgetConfig};
use pulseboard_core::pipeline::ChangeNotifier;
use pulseboard_core::widgets::{
    sales_trend, top_products, DailyDueInConfig, DailyDueInPipeline, OutstandingOrdersPipeline,
    ProductTotal, SalesTrend,
};
use pulseboard_core::{
    telemetry, DataSource, FetchState, HttpSource, ProcessedRow, RawRecord, RowPipeline, Widget,
    WidgetDescriptor, WidgetRequest,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Logs every batch of lines that became received/closed
struct LogNotifier;

impl ChangeNotifier for LogNotifier {
    fn notify(&self, changed: &[String]) {
        info!(target: "kiosk", count = changed.len(), keys = ?changed, "Orders received");
    }
}

fn log_render<T: Serialize>(widget: &'static str) -> impl Fn(&FetchState<T>) + Send + Sync {
    move |state| {
        let rows = state.data.as_ref().map(Vec::len);
        match &state.error {
            Some(error) => warn!(
                target: "kiosk",
                widget,
                rows = ?rows,
                error = %error,
                retry_in_s = ?state.retry_countdown_seconds,
                "render"
            ),
            None => info!(target: "kiosk", widget, loading = state.loading, rows = ?rows, "render"),
        }
        if let Some(first) = state.data.as_ref().and_then(|d| d.first()) {
            if let Ok(json) = serde_json::to_string(first) {
                tracing::debug!(target: "kiosk", widget, first_row = %json, "render detail");
            }
        }
    }
}

fn describe<T>(
    name: &'static str,
    widget: &WidgetConfig,
    source: &Arc<dyn DataSource>,
    pipeline: impl RowPipeline<T> + 'static,
) -> WidgetDescriptor<T>
where
    T: Serialize + 'static,
{
    WidgetDescriptor::new(name, WidgetRequest::get(widget.query.clone()), pipeline)
        .with_source(Arc::clone(source))
        .with_interval(widget.interval())
        .with_render(log_render::<T>(name))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing (RUST_LOG overrides the default filter)
    if let Err(e) = telemetry::init_tracing() {
        eprintln!("tracing already initialized: {e}");
    }

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = KioskConfig::load();
    info!(
        target: "kiosk",
        api = %cfg.runtime.api_base_url,
        module = %cfg.module,
        "Starting kiosk board"
    );

    let source: Arc<dyn DataSource> =
        Arc::new(HttpSource::new(&cfg.runtime)?.with_module(cfg.module.clone()));

    // Clock tile has no source: rendered once, never polls.
    let clock = Widget::spawn(
        WidgetDescriptor::new("clock", WidgetRequest::get(""), |_| Vec::<String>::new())
            .with_render(|_: &FetchState<String>| {
                info!(target: "kiosk", widget = "clock", now = %chrono::Local::now().format("%m/%d/%Y %H:%M"), "render");
            }),
        &cfg.runtime,
    );

    let due_in = cfg.due_in.enabled.then(|| {
        let pipeline = DailyDueInPipeline::new(DailyDueInConfig {
            vendor_policy: cfg.vendor_policy.clone(),
            ..DailyDueInConfig::default()
        })
        .with_notifier(Arc::new(LogNotifier));
        Widget::spawn(
            describe::<ProcessedRow>("daily_due_in", &cfg.due_in, &source, pipeline),
            &cfg.runtime,
        )
    });

    let outstanding = cfg.outstanding.enabled.then(|| {
        let pipeline = OutstandingOrdersPipeline {
            vendor_policy: cfg.vendor_policy.clone(),
        };
        Widget::spawn(
            describe::<ProcessedRow>(
                "outstanding_orders",
                &cfg.outstanding,
                &source,
                move |records: Vec<RawRecord>| pipeline.process(records),
            ),
            &cfg.runtime,
        )
    });

    let sales = cfg.sales.enabled.then(|| {
        Widget::spawn(
            describe::<SalesTrend>("sales_by_month", &cfg.sales, &source, sales_trend),
            &cfg.runtime,
        )
    });

    let products = cfg.top_products.enabled.then(|| {
        let limit = cfg.top_products_limit;
        Widget::spawn(
            describe::<ProductTotal>(
                "top_products",
                &cfg.top_products,
                &source,
                move |records: Vec<RawRecord>| top_products(records, limit),
            ),
            &cfg.runtime,
        )
    });

    info!(target: "kiosk", "Board running; press Ctrl+C to exit");
    signal::ctrl_c().await?;
    info!(target: "kiosk", "Shutting down");

    clock.shutdown().await;
    if let Some(h) = due_in {
        h.shutdown().await;
    }
    if let Some(h) = outstanding {
        h.shutdown().await;
    }
    if let Some(h) = sales {
        h.shutdown().await;
    }
    if let Some(h) = products {
        h.shutdown().await;
    }
    Ok(())
}
