//! Order Model
//!
//! Orders carry denormalized line-item snapshots: the product name, unit
//! price and image are copied at order time and never re-joined, so later
//! catalog edits cannot change a past order.

use serde::{Deserialize, Serialize};

/// Order status
///
/// Transitions are admin-driven. `can_transition` encodes the full machine;
/// moving into `cancelled` restores stock, moving out of it re-subtracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum OrderStatus {
    AwaitingPayment,
    Paid,
    Processing,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingPayment => "awaiting-payment",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            AwaitingPayment => matches!(next, Paid | Cancelled),
            Paid => matches!(next, Processing | Cancelled),
            Processing => matches!(next, Shipped | Cancelled),
            Shipped => matches!(next, Completed | Cancelled),
            Completed => matches!(next, Cancelled),
            // Reactivation: back to any non-cancelled status
            Cancelled => next != Cancelled,
        }
    }
}

/// Order line item - a snapshot, not a live join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub image: String,
}

/// Pickup contact info attached to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupInfo {
    pub name: String,
    pub phone: String,
    pub note: Option<String>,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub member_id: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: OrderStatus,
    pub pickup_info: PickupInfo,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create order payload
///
/// Line items reference products by id; name/price/image snapshots are
/// taken server-side from the product rows inside the creation transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreate {
    pub member_id: String,
    pub items: Vec<OrderCreateItem>,
    pub total: f64,
    pub pickup_info: PickupInfo,
}

/// One requested line of an order creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateItem {
    pub product_id: String,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_machine_forward_path() {
        use OrderStatus::*;
        assert!(AwaitingPayment.can_transition(Paid));
        assert!(Paid.can_transition(Processing));
        assert!(Processing.can_transition(Shipped));
        assert!(Shipped.can_transition(Completed));
    }

    #[test]
    fn every_active_status_can_cancel() {
        use OrderStatus::*;
        for s in [AwaitingPayment, Paid, Processing, Shipped, Completed] {
            assert!(s.can_transition(Cancelled), "{s:?} should cancel");
        }
    }

    #[test]
    fn cancelled_reactivates_to_anything_but_itself() {
        use OrderStatus::*;
        for s in [AwaitingPayment, Paid, Processing, Shipped, Completed] {
            assert!(Cancelled.can_transition(s));
        }
        assert!(!Cancelled.can_transition(Cancelled));
    }

    #[test]
    fn illegal_jumps_are_rejected() {
        use OrderStatus::*;
        assert!(!AwaitingPayment.can_transition(Shipped));
        assert!(!Paid.can_transition(Completed));
        assert!(!Shipped.can_transition(Paid));
        assert!(!AwaitingPayment.can_transition(AwaitingPayment));
    }

    #[test]
    fn status_serializes_kebab_case() {
        let s = serde_json::to_string(&OrderStatus::AwaitingPayment).unwrap();
        assert_eq!(s, "\"awaiting-payment\"");
        let back: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn item_snapshot_round_trips_through_json() {
        let items = vec![
            OrderItem {
                product_id: "p1".into(),
                name: "Minimal Desk Lamp".into(),
                price: 89.0,
                quantity: 2,
                image: "/images/desk-lamp.jpg".into(),
            },
            OrderItem {
                product_id: "p5".into(),
                name: "Concrete Planter".into(),
                price: 34.0,
                quantity: 1,
                image: "/images/concrete-planter.jpg".into(),
            },
        ];
        let json = serde_json::to_string(&items).unwrap();
        let back: Vec<OrderItem> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, items);
    }
}
