use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod demo;

/// Order fulfillment status. Flat three-value set; advanced only by explicit
/// admin action, never by timers or derived transitions.
///
/// The wire/DB representation is the human-readable string ("In Progress",
/// not "in_progress") so rows and JSON stay readable in psql and curl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InProgress => "In Progress",
            OrderStatus::Delivered => "Delivered",
        }
    }

    /// Set-membership parse. Returns `None` for anything outside the three
    /// valid statuses; callers turn that into a 400 / CLI usage error.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(OrderStatus::Pending),
            "In Progress" => Some(OrderStatus::InProgress),
            "Delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Integer cents. Money never travels as floating point.
    pub price_cents: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at_utc: DateTime<Utc>,
}

/// Payload for product create/update. The id and timestamp are assigned by
/// the database (or by the demo receipt counter in demo mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One line of an order, joined against products for display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub price_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub buyer_name: String,
    pub contact_info: String,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub created_at_utc: DateTime<Utc>,
    /// Populated by callers that also fetch items; listing endpoints may
    /// degrade this to empty when the item query fails.
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub buyer_name: String,
    pub contact_info: String,
    pub delivery_address: String,
    pub items: Vec<NewOrderItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_accepts_only_the_three_values() {
        assert_eq!(OrderStatus::parse("Pending"), Some(OrderStatus::Pending));
        assert_eq!(
            OrderStatus::parse("In Progress"),
            Some(OrderStatus::InProgress)
        );
        assert_eq!(
            OrderStatus::parse("Delivered"),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(OrderStatus::parse("Shipped"), None);
        assert_eq!(OrderStatus::parse("pending"), None, "case-sensitive");
        assert_eq!(OrderStatus::parse(""), None);
    }

    #[test]
    fn status_serde_uses_display_strings() {
        let json = serde_json::to_string(&OrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let back: OrderStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(back, OrderStatus::InProgress);
    }

    #[test]
    fn status_roundtrips_through_as_str_and_parse() {
        for s in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
    }
}
