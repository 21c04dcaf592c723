//! Shared fixtures for DB-backed scenario tests.
//!
//! DB tests run against whatever database FRESHBULK_DATABASE_URL points at
//! (and SKIP when it is unset), so every fixture name is uniquified — tests
//! must tolerate pre-existing rows and never assume a clean database.

use std::sync::atomic::{AtomicU64, Ordering};

use fbk_schemas::{NewOrder, NewOrderItem, NewProduct};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A label unique across processes and across calls within one process.
pub fn unique(label: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
    format!("{label}_{nanos}_{n}")
}

/// A valid product payload with a uniquified name.
pub fn sample_new_product(label: &str) -> NewProduct {
    NewProduct {
        name: unique(label),
        price_cents: 499,
        description: Some("test fixture produce".to_string()),
        image_url: None,
    }
}

/// A valid order payload, one unit of each given product.
pub fn sample_new_order(product_ids: &[i64]) -> NewOrder {
    NewOrder {
        buyer_name: unique("buyer"),
        contact_info: "buyer@example.com".to_string(),
        delivery_address: "1 Market St".to_string(),
        items: product_ids
            .iter()
            .map(|&product_id| NewOrderItem {
                product_id,
                quantity: 1,
            })
            .collect(),
    }
}

/// JSON body for POST /v1/orders.
pub fn order_request_json(order: &NewOrder) -> serde_json::Value {
    serde_json::json!({
        "buyer_name": order.buyer_name,
        "contact_info": order.contact_info,
        "delivery_address": order.delivery_address,
        "items": order.items.iter().map(|i| {
            serde_json::json!({ "product_id": i.product_id, "quantity": i.quantity })
        }).collect::<Vec<_>>(),
    })
}
