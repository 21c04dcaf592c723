//! Request and response types for all fbk-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here. Create
//! payloads reuse `fbk_schemas::NewProduct` / `NewOrder` directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fbk_schemas::{Order, Product};

// ---------------------------------------------------------------------------
// /v1/health  /v1/status
// ---------------------------------------------------------------------------

/// Serialize-only: the static strs come from build metadata.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub daemon_uptime_secs: u64,
    /// Whether a pool exists at all (false = booted in demo mode).
    pub db_configured: bool,
    /// Live probe result; false whenever the DB is unreachable right now.
    pub db_connected: bool,
    pub demo_mode: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/products
// ---------------------------------------------------------------------------

/// `demo: true` means the rows came from the static fallback catalog, not
/// the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub demo: bool,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreatedResponse {
    /// true = synthetic receipt; nothing was written anywhere durable.
    pub demo: bool,
    pub product: Product,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDeletedResponse {
    pub deleted: bool,
    pub id: i64,
}

// ---------------------------------------------------------------------------
// /v1/orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub demo: bool,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedResponse {
    /// true = demo receipt; the order id is synthetic and not trackable.
    pub demo: bool,
    pub order_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    /// Must be one of: "Pending" | "In Progress" | "Delivered".
    pub status: String,
}

// ---------------------------------------------------------------------------
// /v1/db/*
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbPingResponse {
    pub ok: bool,
    pub now_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbTablesResponse {
    pub ok: bool,
    pub existing: Vec<String>,
    pub missing: Vec<String>,
    pub initialized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbInitializeResponse {
    pub ok: bool,
    /// Products in the table after migrate + seed.
    pub product_count: i64,
    /// Rows inserted by this call (0 when the catalog already had data).
    pub seeded: u64,
}
