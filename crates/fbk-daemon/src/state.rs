//! Shared runtime state for fbk-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself. The database pool is optional: when the connect
//! attempt at boot fails (and demo fallback is enabled) the daemon serves
//! the static catalog instead of refusing to start.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;

use fbk_schemas::demo::DEMO_RECEIPT_BASE;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    /// Emitted on order placement and on every status change, so an admin
    /// dashboard can refresh without polling.
    Order {
        order_id: i64,
        status: String,
        demo: bool,
    },
    LogLine { level: String, msg: String },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared (Arc) handle across all Axum handlers.
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// None = demo mode: the DB was unreachable at boot.
    pub db: Option<PgPool>,
    /// Counter for synthetic ids handed out by demo-mode creates.
    demo_receipts: AtomicI64,
}

impl AppState {
    pub fn new(db: Option<PgPool>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        Self {
            bus,
            build: BuildInfo {
                service: "fbk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            db,
            demo_receipts: AtomicI64::new(DEMO_RECEIPT_BASE),
        }
    }

    /// A state with no database pool — what boot produces when the DB is
    /// down, and what the in-process router tests use.
    pub fn demo() -> Self {
        Self::new(None)
    }

    /// Next synthetic id for a demo-mode create. Monotonic within the
    /// process so tests (and support staff reading logs) can line receipts
    /// up with requests.
    pub fn next_demo_receipt(&self) -> i64 {
        self.demo_receipts.fetch_add(1, Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
