//! Axum router and all HTTP handlers for fbk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.
//!
//! Demo-mode rules (mirrors the storefront this replaces):
//! - catalog/order LISTING and CREATE fall back to static data or synthetic
//!   receipts when the DB is unreachable — reads never fail, creates always
//!   hand the buyer a receipt, flagged `demo: true`;
//! - id-specific lookups and admin mutations do NOT fall back: absence is
//!   404, an unreachable DB is 503.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, warn};

use fbk_schemas::{demo::demo_catalog, NewOrder, NewProduct, OrderStatus, Product};

use crate::{
    api_types::{
        DbInitializeResponse, DbPingResponse, DbTablesResponse, ErrorResponse, HealthResponse,
        OrderListResponse, OrderPlacedResponse, ProductCreatedResponse, ProductDeletedResponse,
        ProductListResponse, StatusResponse, UpdateOrderStatusRequest,
    },
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/products", get(products_list).post(products_create))
        .route(
            "/v1/products/:id",
            get(products_get).put(products_update).delete(products_delete),
        )
        .route("/v1/orders", get(orders_list).post(orders_create))
        .route("/v1/orders/:id", get(orders_get).put(orders_set_status))
        .route("/v1/db/initialize", post(db_initialize))
        .route("/v1/db/tables", get(db_tables))
        .route("/v1/db/ping", get(db_ping))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn err_json(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

fn db_unavailable() -> Response {
    err_json(
        StatusCode::SERVICE_UNAVAILABLE,
        "database unavailable; daemon is running in demo mode",
    )
}

/// Mirror a degraded-path warning onto the SSE bus so a connected dashboard
/// sees the fallback happen, not just the server log.
fn bus_warn(st: &AppState, msg: impl Into<String>) {
    let _ = st.bus.send(BusMsg::LogLine {
        level: "warn".to_string(),
        msg: msg.into(),
    });
}

fn validate_product(p: &NewProduct) -> Result<(), &'static str> {
    if p.name.trim().is_empty() {
        return Err("name is required");
    }
    if p.price_cents <= 0 {
        return Err("price_cents must be a positive integer");
    }
    Ok(())
}

fn validate_order(o: &NewOrder) -> Result<(), &'static str> {
    if o.buyer_name.trim().is_empty()
        || o.contact_info.trim().is_empty()
        || o.delivery_address.trim().is_empty()
        || o.items.is_empty()
    {
        return Err(
            "buyer_name, contact_info, delivery_address, and at least one item are required",
        );
    }
    if o.items.iter().any(|i| i.quantity < 1) {
        return Err("every item quantity must be at least 1");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let db_configured = st.db.is_some();
    let db_connected = match &st.db {
        Some(pool) => fbk_db::status(pool).await.map(|s| s.ok).unwrap_or(false),
        None => false,
    };

    (
        StatusCode::OK,
        Json(StatusResponse {
            daemon_uptime_secs: uptime_secs(),
            db_configured,
            db_connected,
            demo_mode: !db_connected,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/products
// ---------------------------------------------------------------------------

fn demo_product_list() -> Response {
    (
        StatusCode::OK,
        Json(ProductListResponse {
            demo: true,
            products: demo_catalog(),
        }),
    )
        .into_response()
}

pub(crate) async fn products_list(State(st): State<Arc<AppState>>) -> Response {
    let Some(pool) = &st.db else {
        return demo_product_list();
    };

    match fbk_db::list_products(pool).await {
        Ok(products) => (
            StatusCode::OK,
            Json(ProductListResponse {
                demo: false,
                products,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!(error = ?e, "products query failed; serving demo catalog");
            bus_warn(&st, "products query failed; serving demo catalog");
            demo_product_list()
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/products
// ---------------------------------------------------------------------------

pub(crate) async fn products_create(
    State(st): State<Arc<AppState>>,
    Json(req): Json<NewProduct>,
) -> Response {
    if let Err(msg) = validate_product(&req) {
        return err_json(StatusCode::BAD_REQUEST, msg);
    }

    if let Some(pool) = &st.db {
        match fbk_db::insert_product(pool, &req).await {
            Ok(product) => {
                info!(product_id = product.id, "product created");
                return (
                    StatusCode::CREATED,
                    Json(ProductCreatedResponse {
                        demo: false,
                        product,
                    }),
                )
                    .into_response();
            }
            Err(e) => {
                warn!(error = ?e, "product insert failed; issuing demo receipt");
                bus_warn(&st, "product insert failed; issuing demo receipt");
            }
        }
    }

    // Demo receipt: nothing durable was written, but the admin flow keeps
    // working against the unreachable DB exactly like the catalog reads.
    let product = Product {
        id: st.next_demo_receipt(),
        name: req.name,
        price_cents: req.price_cents,
        description: req.description,
        image_url: req.image_url,
        created_at_utc: Utc::now(),
    };
    bus_warn(
        &st,
        format!(
            "demo product receipt {} issued; nothing was persisted",
            product.id
        ),
    );
    (
        StatusCode::CREATED,
        Json(ProductCreatedResponse {
            demo: true,
            product,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/products/:id
// ---------------------------------------------------------------------------

pub(crate) async fn products_get(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Response {
    let Some(pool) = &st.db else {
        return db_unavailable();
    };

    match fbk_db::fetch_product(pool, id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(product)).into_response(),
        Ok(None) => err_json(StatusCode::NOT_FOUND, "product not found"),
        Err(e) => {
            error!(error = ?e, product_id = id, "product fetch failed");
            err_json(StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch product")
        }
    }
}

// ---------------------------------------------------------------------------
// PUT /v1/products/:id
// ---------------------------------------------------------------------------

pub(crate) async fn products_update(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<NewProduct>,
) -> Response {
    if let Err(msg) = validate_product(&req) {
        return err_json(StatusCode::BAD_REQUEST, msg);
    }
    let Some(pool) = &st.db else {
        return db_unavailable();
    };

    match fbk_db::update_product(pool, id, &req).await {
        Ok(Some(product)) => {
            info!(product_id = id, "product updated");
            (StatusCode::OK, Json(product)).into_response()
        }
        Ok(None) => err_json(StatusCode::NOT_FOUND, "product not found"),
        Err(e) => {
            error!(error = ?e, product_id = id, "product update failed");
            err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to update product",
            )
        }
    }
}

// ---------------------------------------------------------------------------
// DELETE /v1/products/:id
// ---------------------------------------------------------------------------

pub(crate) async fn products_delete(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Response {
    let Some(pool) = &st.db else {
        return db_unavailable();
    };

    match fbk_db::delete_product(pool, id).await {
        Ok(true) => {
            info!(product_id = id, "product deleted");
            (
                StatusCode::OK,
                Json(ProductDeletedResponse { deleted: true, id }),
            )
                .into_response()
        }
        Ok(false) => err_json(StatusCode::NOT_FOUND, "product not found"),
        Err(e) => {
            error!(error = ?e, product_id = id, "product delete failed");
            err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to delete product",
            )
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/orders
// ---------------------------------------------------------------------------

fn demo_order_list() -> Response {
    // There is no demo order book — placement hands out receipts, but
    // nothing is tracked. The admin dashboard just shows an empty list.
    (
        StatusCode::OK,
        Json(OrderListResponse {
            demo: true,
            orders: Vec::new(),
        }),
    )
        .into_response()
}

pub(crate) async fn orders_list(State(st): State<Arc<AppState>>) -> Response {
    let Some(pool) = &st.db else {
        return demo_order_list();
    };

    let mut orders = match fbk_db::list_orders(pool).await {
        Ok(orders) => orders,
        Err(e) => {
            warn!(error = ?e, "orders query failed; serving demo (empty) list");
            bus_warn(&st, "orders query failed; serving demo (empty) list");
            return demo_order_list();
        }
    };

    // One order with a broken item query degrades to an empty item list
    // rather than failing the whole admin listing.
    for order in &mut orders {
        match fbk_db::list_order_items(pool, order.id).await {
            Ok(items) => order.items = items,
            Err(e) => {
                warn!(error = ?e, order_id = order.id, "items query failed; listing order without items");
            }
        }
    }

    (
        StatusCode::OK,
        Json(OrderListResponse {
            demo: false,
            orders,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/orders
// ---------------------------------------------------------------------------

pub(crate) async fn orders_create(
    State(st): State<Arc<AppState>>,
    Json(req): Json<NewOrder>,
) -> Response {
    if let Err(msg) = validate_order(&req) {
        return err_json(StatusCode::BAD_REQUEST, msg);
    }

    if let Some(pool) = &st.db {
        match fbk_db::create_order(pool, &req).await {
            Ok(order_id) => {
                info!(order_id, "order placed");
                let _ = st.bus.send(BusMsg::Order {
                    order_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    demo: false,
                });
                return (
                    StatusCode::CREATED,
                    Json(OrderPlacedResponse {
                        demo: false,
                        order_id,
                    }),
                )
                    .into_response();
            }
            Err(e) => {
                warn!(error = ?e, "order insert failed; issuing demo receipt");
                bus_warn(&st, "order insert failed; issuing demo receipt");
            }
        }
    }

    let order_id = st.next_demo_receipt();
    bus_warn(
        &st,
        format!("demo order receipt {order_id} issued; nothing was persisted"),
    );
    let _ = st.bus.send(BusMsg::Order {
        order_id,
        status: OrderStatus::Pending.as_str().to_string(),
        demo: true,
    });
    (
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            demo: true,
            order_id,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/orders/:id   (order tracking)
// ---------------------------------------------------------------------------

pub(crate) async fn orders_get(State(st): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    let Some(pool) = &st.db else {
        return db_unavailable();
    };

    let order = match fbk_db::fetch_order(pool, id).await {
        Ok(Some(order)) => order,
        Ok(None) => return err_json(StatusCode::NOT_FOUND, "order not found"),
        Err(e) => {
            error!(error = ?e, order_id = id, "order fetch failed");
            return err_json(StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch order");
        }
    };

    match fbk_db::list_order_items(pool, id).await {
        Ok(items) => {
            let mut order = order;
            order.items = items;
            (StatusCode::OK, Json(order)).into_response()
        }
        Err(e) => {
            error!(error = ?e, order_id = id, "order items fetch failed");
            err_json(StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch order")
        }
    }
}

// ---------------------------------------------------------------------------
// PUT /v1/orders/:id   (admin: advance status)
// ---------------------------------------------------------------------------

pub(crate) async fn orders_set_status(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Response {
    let Some(status) = OrderStatus::parse(&req.status) else {
        return err_json(
            StatusCode::BAD_REQUEST,
            "invalid status. must be one of: Pending, In Progress, Delivered",
        );
    };
    let Some(pool) = &st.db else {
        return db_unavailable();
    };

    match fbk_db::update_order_status(pool, id, status).await {
        Ok(Some(_)) => {}
        Ok(None) => return err_json(StatusCode::NOT_FOUND, "order not found"),
        Err(e) => {
            error!(error = ?e, order_id = id, "order status update failed");
            return err_json(StatusCode::INTERNAL_SERVER_ERROR, "failed to update order");
        }
    }

    info!(order_id = id, status = status.as_str(), "order status updated");
    let _ = st.bus.send(BusMsg::Order {
        order_id: id,
        status: status.as_str().to_string(),
        demo: false,
    });

    // Return the refreshed order with items so the admin view can render
    // the row without a second round trip.
    match fbk_db::fetch_order(pool, id).await {
        Ok(Some(mut order)) => {
            order.items = fbk_db::list_order_items(pool, id).await.unwrap_or_default();
            (StatusCode::OK, Json(order)).into_response()
        }
        Ok(None) => err_json(StatusCode::NOT_FOUND, "order not found"),
        Err(e) => {
            error!(error = ?e, order_id = id, "order refetch failed");
            err_json(StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch order")
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/db/initialize
// ---------------------------------------------------------------------------

pub(crate) async fn db_initialize(State(st): State<Arc<AppState>>) -> Response {
    let Some(pool) = &st.db else {
        return db_unavailable();
    };

    if let Err(e) = fbk_db::migrate(pool).await {
        error!(error = ?e, "migrate failed");
        return err_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to initialize database",
        );
    }

    let seeded = match fbk_db::seed_demo_products(pool).await {
        Ok(n) => n,
        Err(e) => {
            error!(error = ?e, "seed failed");
            return err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to seed sample products",
            );
        }
    };

    match fbk_db::count_products(pool).await {
        Ok(product_count) => {
            info!(product_count, seeded, "database initialized");
            (
                StatusCode::OK,
                Json(DbInitializeResponse {
                    ok: true,
                    product_count,
                    seeded,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = ?e, "count failed");
            err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to initialize database",
            )
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/db/tables
// ---------------------------------------------------------------------------

pub(crate) async fn db_tables(State(st): State<Arc<AppState>>) -> Response {
    let Some(pool) = &st.db else {
        return db_unavailable();
    };

    match fbk_db::check_tables(pool).await {
        Ok(report) => {
            let initialized = report.is_initialized();
            (
                StatusCode::OK,
                Json(DbTablesResponse {
                    ok: initialized,
                    existing: report.existing,
                    missing: report.missing,
                    initialized,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = ?e, "check tables failed");
            err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to check database tables",
            )
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/db/ping
// ---------------------------------------------------------------------------

pub(crate) async fn db_ping(State(st): State<Arc<AppState>>) -> Response {
    let Some(pool) = &st.db else {
        return db_unavailable();
    };

    match fbk_db::ping(pool).await {
        Ok(now_utc) => (StatusCode::OK, Json(DbPingResponse { ok: true, now_utc })).into_response(),
        Err(e) => {
            error!(error = ?e, "ping failed");
            err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "database connection failed",
            )
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Order { .. } => "order",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
