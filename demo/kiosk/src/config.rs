use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use pulseboard_core::pipeline::VendorPolicy;
use pulseboard_core::RuntimeConfig;

/// Board layout and runtime settings for the kiosk demo
#[derive(Clone, Debug)]
pub struct KioskConfig {
    pub runtime: RuntimeConfig,
    /// Sent as the `module` header on every request
    pub module: String,
    pub due_in: WidgetConfig,
    pub outstanding: WidgetConfig,
    pub sales: WidgetConfig,
    pub top_products: WidgetConfig,
    pub top_products_limit: usize,
    pub vendor_policy: VendorPolicy,
}

#[derive(Clone, Debug)]
pub struct WidgetConfig {
    pub enabled: bool,
    pub query: String,
    /// Zero means fetch once
    pub interval_ms: u64,
}

impl WidgetConfig {
    fn new(query: &str, interval_ms: u64) -> Self {
        Self {
            enabled: true,
            query: query.to_string(),
            interval_ms,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        (self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            module: std::env::var("KIOSK_MODULE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "kiosk".to_string()),
            due_in: WidgetConfig::new("daily_due_in", 30_000),
            outstanding: WidgetConfig::new("outstanding_orders", 60_000),
            sales: WidgetConfig::new("sales_by_month", 300_000),
            top_products: WidgetConfig::new("top_products_by_units", 300_000),
            top_products_limit: 10,
            vendor_policy: VendorPolicy::KeepAll,
        }
    }
}

impl KioskConfig {
    /// Load configuration from a TOML file (path via KIOSK_CONFIG or ./kiosk.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("KIOSK_CONFIG").unwrap_or_else(|_| "kiosk.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "kiosk", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => Self::from_toml_str(&s, default),
            Err(e) => {
                tracing::warn!(target: "kiosk", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    fn from_toml_str(s: &str, default: Self) -> Self {
        match toml::from_str::<KioskToml>(s) {
            Ok(t) => t.overlay(default),
            Err(e) => {
                tracing::warn!(target: "kiosk", error = %e, "Failed to parse TOML; using defaults");
                default
            }
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct KioskToml {
    pub module: Option<String>,
    pub runtime: Option<RuntimeToml>,
    pub due_in: Option<WidgetToml>,
    pub outstanding: Option<WidgetToml>,
    pub sales: Option<WidgetToml>,
    pub top_products: Option<WidgetToml>,
    pub top_products_limit: Option<usize>,
    pub vendors: Option<VendorToml>,
}

impl KioskToml {
    fn overlay(self, mut base: KioskConfig) -> KioskConfig {
        if let Some(m) = self.module {
            base.module = m;
        }
        if let Some(r) = self.runtime {
            r.apply(&mut base.runtime);
        }
        if let Some(w) = self.due_in {
            w.apply(&mut base.due_in);
        }
        if let Some(w) = self.outstanding {
            w.apply(&mut base.outstanding);
        }
        if let Some(w) = self.sales {
            w.apply(&mut base.sales);
        }
        if let Some(w) = self.top_products {
            w.apply(&mut base.top_products);
        }
        if let Some(n) = self.top_products_limit {
            base.top_products_limit = n.max(1);
        }
        if let Some(v) = self.vendors {
            base.vendor_policy = v.into_policy();
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct RuntimeToml {
    pub api_base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub backoff_base_ms: Option<u64>,
    pub backoff_max_ms: Option<u64>,
    pub countdown_tick_ms: Option<u64>,
    pub user_agent: Option<String>,
}
impl RuntimeToml {
    fn apply(self, r: &mut RuntimeConfig) {
        if let Some(x) = self.api_base_url {
            r.api_base_url = x;
        }
        if let Some(x) = self.request_timeout_ms {
            r.request_timeout_ms = x;
        }
        if let Some(x) = self.backoff_base_ms {
            r.backoff_base_ms = x;
        }
        if let Some(x) = self.backoff_max_ms {
            r.backoff_max_ms = x;
        }
        if let Some(x) = self.countdown_tick_ms {
            r.countdown_tick_ms = x;
        }
        if let Some(x) = self.user_agent {
            r.user_agent = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct WidgetToml {
    pub enabled: Option<bool>,
    pub query: Option<String>,
    pub interval_ms: Option<u64>,
}
impl WidgetToml {
    fn apply(self, w: &mut WidgetConfig) {
        if let Some(x) = self.enabled {
            w.enabled = x;
        }
        if let Some(x) = self.query {
            w.query = x;
        }
        if let Some(x) = self.interval_ms {
            w.interval_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct VendorToml {
    /// "keep", "exclude" or "merge"
    pub mode: Option<String>,
    pub codes: Option<Vec<String>>,
}
impl VendorToml {
    fn into_policy(self) -> VendorPolicy {
        let codes: BTreeSet<String> = self
            .codes
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        match self.mode.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("exclude") => VendorPolicy::Exclude(codes),
            Some("merge") => VendorPolicy::Merge(codes),
            _ => VendorPolicy::KeepAll,
        }
    }
}
