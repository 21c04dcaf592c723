//! Full storefront flow through the router against a real database:
//! initialize -> browse catalog -> place order -> track it -> admin advances
//! status.
//!
//! DB-backed test. Skips if FRESHBULK_DATABASE_URL is not set.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use fbk_daemon::{routes, state};
use tower::ServiceExt;

async fn call(
    router: axum::Router,
    req: Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn json_req(method: &str, uri: &str, body: &serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn place_track_and_advance_an_order() -> anyhow::Result<()> {
    let url = match std::env::var(fbk_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: FRESHBULK_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = fbk_db::connect(&url, 2).await?;
    let st = Arc::new(state::AppState::new(Some(pool.clone())));

    // Initialize: migrate + seed. Idempotent on a shared DB.
    let (status, init) = call(
        routes::build_router(Arc::clone(&st)),
        json_req("POST", "/v1/db/initialize", &serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(init["ok"], true);
    assert!(init["product_count"].as_i64().unwrap() > 0);

    // Status now reports a live DB, not demo mode.
    let (_, daemon_status) = call(routes::build_router(Arc::clone(&st)), get("/v1/status")).await;
    assert_eq!(daemon_status["db_connected"], true);
    assert_eq!(daemon_status["demo_mode"], false);

    // Create a product for this test run (unique name, real row).
    let new_product = fbk_testkit::sample_new_product("e2e");
    let (status, created) = call(
        routes::build_router(Arc::clone(&st)),
        json_req(
            "POST",
            "/v1/products",
            &serde_json::json!({
                "name": new_product.name,
                "price_cents": new_product.price_cents,
                "description": new_product.description,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["demo"], false, "live DB creates are not demo receipts");
    let product_id = created["product"]["id"].as_i64().unwrap();

    // The catalog serves it back, demo: false.
    let (status, listing) = call(routes::build_router(Arc::clone(&st)), get("/v1/products")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["demo"], false);
    assert!(listing["products"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["id"].as_i64() == Some(product_id)));

    // Place an order for two of them.
    let order = fbk_testkit::sample_new_order(&[product_id]);
    let mut body = fbk_testkit::order_request_json(&order);
    body["items"][0]["quantity"] = serde_json::json!(2);

    let (status, placed) = call(
        routes::build_router(Arc::clone(&st)),
        json_req("POST", "/v1/orders", &body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["demo"], false);
    let order_id = placed["order_id"].as_i64().unwrap();

    // Track it: items joined with product display fields, status Pending.
    let (status, tracked) = call(
        routes::build_router(Arc::clone(&st)),
        get(&format!("/v1/orders/{order_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tracked["status"], "Pending");
    assert_eq!(tracked["buyer_name"], order.buyer_name);
    let items = tracked["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_id"].as_i64(), Some(product_id));
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[0]["price_cents"], 499);

    // Admin advances the status; response carries the refreshed order and
    // the change lands on the event bus for any /v1/stream subscriber.
    let mut bus_rx = st.bus.subscribe();
    let (status, advanced) = call(
        routes::build_router(Arc::clone(&st)),
        json_req(
            "PUT",
            &format!("/v1/orders/{order_id}"),
            &serde_json::json!({ "status": "In Progress" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advanced["status"], "In Progress");
    assert_eq!(advanced["items"].as_array().unwrap().len(), 1);

    match bus_rx.recv().await? {
        state::BusMsg::Order {
            order_id: event_order_id,
            status,
            demo,
        } => {
            assert_eq!(event_order_id, order_id);
            assert_eq!(status, "In Progress");
            assert!(!demo);
        }
        other => anyhow::bail!("expected an order event, got {other:?}"),
    }

    // Tracking an id that cannot exist is a 404, not a fallback.
    let (status, _) = call(
        routes::build_router(Arc::clone(&st)),
        get(&format!("/v1/orders/{}", i64::MAX)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}
