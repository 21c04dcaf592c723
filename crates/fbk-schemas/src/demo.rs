//! Static sample data served when the database is unreachable ("demo mode").
//!
//! Catalog reads fall back to these rows; demo order/product creation hands
//! out synthetic receipts instead. Nothing here ever touches the database.

use chrono::Utc;

use crate::Product;

/// First id handed out for demo-mode receipts. Real serial ids start at 1,
/// so anything >= this value is recognizably synthetic.
pub const DEMO_RECEIPT_BASE: i64 = 1000;

/// The static fallback catalog. Ids 1..=4 intentionally mirror a freshly
/// seeded database so a preselected product id keeps working in demo mode.
pub fn demo_catalog() -> Vec<Product> {
    let now = Utc::now();
    sample_rows()
        .into_iter()
        .enumerate()
        .map(|(i, (name, price_cents, description, image_url))| Product {
            id: i as i64 + 1,
            name: name.to_string(),
            price_cents,
            description: Some(description.to_string()),
            image_url: Some(image_url.to_string()),
            created_at_utc: now,
        })
        .collect()
}

/// Raw sample rows, shared by the demo catalog and DB seeding.
pub fn sample_rows() -> Vec<(&'static str, i64, &'static str, &'static str)> {
    vec![
        (
            "Apples",
            299,
            "Fresh red apples, perfect for snacking or baking",
            "https://images.unsplash.com/photo-1567306226416-28f0efdc88ce?w=800&auto=format&fit=crop",
        ),
        (
            "Bananas",
            149,
            "Ripe yellow bananas, rich in potassium and natural sweetness",
            "https://images.unsplash.com/photo-1571771894821-ce9b6c11b08e?w=800&auto=format&fit=crop",
        ),
        (
            "Carrots",
            199,
            "Organic carrots, crisp and full of nutrients",
            "https://images.unsplash.com/photo-1598170845058-32b9d6a5da37?w=800&auto=format&fit=crop",
        ),
        (
            "Potatoes",
            99,
            "Russet potatoes, versatile for mashing, baking, or frying",
            "https://images.unsplash.com/photo-1518977676601-b53f82aba655?w=800&auto=format&fit=crop",
        ),
    ]
}
