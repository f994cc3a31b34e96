//! Order Repository
//!
//! Order creation, cancellation, reactivation and deletion all adjust
//! product stock. Every multi-row mutation runs in one SQLite transaction
//! and decrements use a conditional `WHERE stock >= qty` update, so a
//! failure on any line item rolls the whole operation back and stock can
//! never go negative even under concurrent checkouts.

use sqlx::{Sqlite, SqlitePool, Transaction};

use super::{RepoError, RepoResult};
use crate::db::models::{Order, OrderCreate, OrderItem, OrderStatus, PickupInfo};
use crate::utils::{id, time};

/// Tolerance when comparing a client-submitted total against the snapshot sum
const TOTAL_EPSILON: f64 = 0.005;

const ORDER_SELECT: &str = "SELECT id, member_id, items, total, status, pickup_name, pickup_phone, pickup_note, created_at, updated_at FROM orders";

/// Raw order row; `items` is a JSON column
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    member_id: String,
    items: String,
    total: f64,
    status: OrderStatus,
    pickup_name: String,
    pickup_phone: String,
    pickup_note: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl OrderRow {
    fn into_order(self) -> RepoResult<Order> {
        let items: Vec<OrderItem> = serde_json::from_str(&self.items)?;
        Ok(Order {
            id: self.id,
            member_id: self.member_id,
            items,
            total: self.total,
            status: self.status,
            pickup_info: PickupInfo {
                name: self.pickup_name,
                phone: self.pickup_phone,
                note: self.pickup_note,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Order>> {
    let sql = format!("{ORDER_SELECT} ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, OrderRow>(&sql).fetch_all(pool).await?;
    rows.into_iter().map(OrderRow::into_order).collect()
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(OrderRow::into_order).transpose()
}

pub async fn find_by_member(pool: &SqlitePool, member_id: &str) -> RepoResult<Vec<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE member_id = ? ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(member_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(OrderRow::into_order).collect()
}

/// Conditionally subtract `qty` from a product's stock, recomputing the
/// in-stock flag in the same statement. Returns false when the row exists
/// but lacks stock (or does not exist; callers distinguish via a fetch).
async fn try_decrement_stock(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    qty: i64,
) -> RepoResult<bool> {
    let now = time::now_millis();
    let rows = sqlx::query(
        "UPDATE products SET stock = stock - ?1, in_stock = (stock - ?1) > 0, updated_at = ?2 \
         WHERE id = ?3 AND stock >= ?1",
    )
    .bind(qty)
    .bind(now)
    .bind(product_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Add `qty` back to a product's stock (cancellation / deletion compensation)
async fn restore_stock(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    qty: i64,
) -> RepoResult<()> {
    let now = time::now_millis();
    // qty >= 1, so the product is necessarily in stock afterwards. A product
    // deleted since the order was placed is skipped; there is nothing left
    // to restore onto.
    sqlx::query(
        "UPDATE products SET stock = stock + ?1, in_stock = 1, updated_at = ?2 WHERE id = ?3",
    )
    .bind(qty)
    .bind(now)
    .bind(product_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Place an order.
///
/// Inside one transaction, per line item: fetch the product (snapshot
/// source), then conditionally decrement its stock. Any missing product,
/// insufficient stock, or total mismatch aborts the whole order; nothing
/// is partially applied. The order starts in `awaiting-payment`.
pub async fn place(pool: &SqlitePool, data: OrderCreate) -> RepoResult<Order> {
    if data.items.is_empty() {
        return Err(RepoError::Validation("Order items are required".into()));
    }
    for item in &data.items {
        if item.quantity <= 0 {
            return Err(RepoError::Validation(format!(
                "Invalid quantity for product {}",
                item.product_id
            )));
        }
    }

    let mut tx = pool.begin().await?;

    let mut snapshots: Vec<OrderItem> = Vec::with_capacity(data.items.len());
    let mut computed_total = 0.0_f64;

    for item in &data.items {
        let product: Option<(String, f64, String)> =
            sqlx::query_as("SELECT name, price, image FROM products WHERE id = ?")
                .bind(&item.product_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((name, price, image)) = product else {
            return Err(RepoError::NotFound(format!(
                "Product {} not found",
                item.product_id
            )));
        };

        if !try_decrement_stock(&mut tx, &item.product_id, item.quantity).await? {
            return Err(RepoError::BusinessRule(format!(
                "Insufficient stock for product '{name}'"
            )));
        }

        computed_total += price * item.quantity as f64;
        snapshots.push(OrderItem {
            product_id: item.product_id.clone(),
            name,
            price,
            quantity: item.quantity,
            image,
        });
    }

    if (computed_total - data.total).abs() > TOTAL_EPSILON {
        return Err(RepoError::Validation(format!(
            "Order total {:.2} does not match item prices {:.2}",
            data.total, computed_total
        )));
    }

    let now = time::now_millis();
    let order_id = id::next_id('o');
    let items_json = serde_json::to_string(&snapshots)?;

    sqlx::query(
        "INSERT INTO orders (id, member_id, items, total, status, pickup_name, pickup_phone, pickup_note, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    )
    .bind(&order_id)
    .bind(&data.member_id)
    .bind(&items_json)
    .bind(computed_total)
    .bind(OrderStatus::AwaitingPayment)
    .bind(&data.pickup_info.name)
    .bind(&data.pickup_info.phone)
    .bind(&data.pickup_info.note)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    find_by_id(pool, &order_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create order".into()))
}

/// Apply an admin-driven status transition.
///
/// Into `cancelled`: restore every line item's stock. Out of `cancelled`:
/// conditionally re-subtract every item, failing the whole update (naming
/// the product) when any lacks stock. Both run in one transaction with the
/// status write, so a mid-loop failure leaves neither stock nor status
/// half-applied. Other transitions just write the status.
pub async fn update_status(
    pool: &SqlitePool,
    order_id: &str,
    new_status: OrderStatus,
) -> RepoResult<Order> {
    let mut tx = pool.begin().await?;

    let sql = format!("{ORDER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
    let order = row
        .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))?
        .into_order()?;

    if !order.status.can_transition(new_status) {
        return Err(RepoError::BusinessRule(format!(
            "Cannot change order status from '{}' to '{}'",
            order.status.as_str(),
            new_status.as_str()
        )));
    }

    if new_status == OrderStatus::Cancelled {
        for item in &order.items {
            restore_stock(&mut tx, &item.product_id, item.quantity).await?;
        }
    } else if order.status == OrderStatus::Cancelled {
        // Reactivation re-subtracts every line item
        for item in &order.items {
            if !try_decrement_stock(&mut tx, &item.product_id, item.quantity).await? {
                return Err(RepoError::BusinessRule(format!(
                    "Insufficient stock for product '{}', order cannot be reactivated",
                    item.name
                )));
            }
        }
    }

    let now = time::now_millis();
    sqlx::query("UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(new_status)
        .bind(now)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))
}

/// Delete an order.
///
/// Deleting an order that has not been cancelled restores its stock first
/// (same compensation as cancellation), in the same transaction as the row
/// removal; deleting a cancelled order removes the row only.
pub async fn delete(pool: &SqlitePool, order_id: &str) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;

    let sql = format!("{ORDER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(order) = row.map(OrderRow::into_order).transpose()? else {
        return Ok(false);
    };

    if order.status != OrderStatus::Cancelled {
        for item in &order.items {
            restore_stock(&mut tx, &item.product_id, item.quantity).await?;
        }
    }

    sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{MemberRegister, OrderCreateItem, ProductCreate, ProductUpdate};
    use crate::db::repository::{member, product};
    use crate::db::test_pool;

    async fn seed_member(pool: &SqlitePool) -> String {
        member::create(
            pool,
            MemberRegister {
                name: "Alex".into(),
                email: Some("a@example.com".into()),
                phone: None,
                password: Some("longenough".into()),
                google_id: None,
                avatar: None,
                role: None,
            },
            None,
        )
        .await
        .unwrap()
        .id
    }

    async fn seed_product(pool: &SqlitePool, name: &str, price: f64, stock: i64) -> String {
        product::create(
            pool,
            ProductCreate {
                name: name.into(),
                description: None,
                price,
                image: Some("/images/item.jpg".into()),
                category: "Lighting".into(),
                stock: Some(stock),
            },
        )
        .await
        .unwrap()
        .id
    }

    fn order_for(member_id: &str, product_id: &str, qty: i64, total: f64) -> OrderCreate {
        OrderCreate {
            member_id: member_id.into(),
            items: vec![OrderCreateItem {
                product_id: product_id.into(),
                quantity: qty,
            }],
            total,
            pickup_info: PickupInfo {
                name: "Alex".into(),
                phone: "0911222333".into(),
                note: None,
            },
        }
    }

    #[tokio::test]
    async fn placing_an_order_decrements_stock() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Minimal Desk Lamp", 89.0, 5).await;

        let order = place(&pool, order_for(&m, &p, 2, 178.0)).await.unwrap();
        assert_eq!(order.status, OrderStatus::AwaitingPayment);
        assert_eq!(order.total, 178.0);
        assert_eq!(order.items[0].name, "Minimal Desk Lamp");

        let left = product::find_by_id(&pool, &p).await.unwrap().unwrap();
        assert_eq!(left.stock, 3);
        assert!(left.in_stock);
    }

    #[tokio::test]
    async fn last_unit_clears_in_stock_flag() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Lamp", 89.0, 1).await;

        place(&pool, order_for(&m, &p, 1, 89.0)).await.unwrap();

        let left = product::find_by_id(&pool, &p).await.unwrap().unwrap();
        assert_eq!(left.stock, 0);
        assert!(!left.in_stock);
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_everything_untouched() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let lamp = seed_product(&pool, "Lamp", 89.0, 5).await;
        let vase = seed_product(&pool, "Vase", 45.0, 1).await;

        let err = place(
            &pool,
            OrderCreate {
                member_id: m.clone(),
                items: vec![
                    OrderCreateItem {
                        product_id: lamp.clone(),
                        quantity: 2,
                    },
                    OrderCreateItem {
                        product_id: vase.clone(),
                        quantity: 3,
                    },
                ],
                total: 313.0,
                pickup_info: PickupInfo {
                    name: "Alex".into(),
                    phone: "0911".into(),
                    note: None,
                },
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(msg) if msg.contains("Vase")));

        // First item's decrement must have rolled back
        let lamp_row = product::find_by_id(&pool, &lamp).await.unwrap().unwrap();
        assert_eq!(lamp_row.stock, 5);
        assert!(find_all(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mismatched_total_is_rejected() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Lamp", 89.0, 5).await;

        let err = place(&pool, order_for(&m, &p, 2, 100.0)).await.unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));

        let left = product::find_by_id(&pool, &p).await.unwrap().unwrap();
        assert_eq!(left.stock, 5);
    }

    #[tokio::test]
    async fn snapshot_survives_later_price_change() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Lamp", 89.0, 5).await;
        let order = place(&pool, order_for(&m, &p, 1, 89.0)).await.unwrap();

        product::update(
            &pool,
            &p,
            ProductUpdate {
                price: Some(129.0),
                name: Some("Premium Desk Lamp".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let reloaded = find_by_id(&pool, &order.id).await.unwrap().unwrap();
        assert_eq!(reloaded.items[0].price, 89.0);
        assert_eq!(reloaded.items[0].name, "Lamp");
        assert_eq!(reloaded.total, 89.0);
    }

    #[tokio::test]
    async fn cancelling_restores_stock() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Lamp", 89.0, 5).await;
        let order = place(&pool, order_for(&m, &p, 3, 267.0)).await.unwrap();

        let cancelled = update_status(&pool, &order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let left = product::find_by_id(&pool, &p).await.unwrap().unwrap();
        assert_eq!(left.stock, 5);
        assert!(left.in_stock);
    }

    #[tokio::test]
    async fn reactivation_resubtracts_or_fails_cleanly() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Lamp", 89.0, 3).await;
        let order = place(&pool, order_for(&m, &p, 3, 267.0)).await.unwrap();
        update_status(&pool, &order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        // Someone else takes the restored stock
        product::update(
            &pool,
            &p,
            ProductUpdate {
                stock: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = update_status(&pool, &order.id, OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));

        // Order stays cancelled, stock stays at 1
        let still = find_by_id(&pool, &order.id).await.unwrap().unwrap();
        assert_eq!(still.status, OrderStatus::Cancelled);
        let left = product::find_by_id(&pool, &p).await.unwrap().unwrap();
        assert_eq!(left.stock, 1);

        // With stock back, reactivation succeeds and re-subtracts
        product::update(
            &pool,
            &p,
            ProductUpdate {
                stock: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let paid = update_status(&pool, &order.id, OrderStatus::Paid)
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        let left = product::find_by_id(&pool, &p).await.unwrap().unwrap();
        assert_eq!(left.stock, 1);
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Lamp", 89.0, 5).await;
        let order = place(&pool, order_for(&m, &p, 1, 89.0)).await.unwrap();

        let err = update_status(&pool, &order.id, OrderStatus::AwaitingPayment)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn deleting_an_active_order_restores_stock() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Lamp", 89.0, 5).await;
        let order = place(&pool, order_for(&m, &p, 2, 178.0)).await.unwrap();

        assert!(delete(&pool, &order.id).await.unwrap());
        let left = product::find_by_id(&pool, &p).await.unwrap().unwrap();
        assert_eq!(left.stock, 5);
        assert!(find_by_id(&pool, &order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_cancelled_order_leaves_stock_alone() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Lamp", 89.0, 5).await;
        let order = place(&pool, order_for(&m, &p, 2, 178.0)).await.unwrap();
        update_status(&pool, &order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        assert!(delete(&pool, &order.id).await.unwrap());
        let left = product::find_by_id(&pool, &p).await.unwrap().unwrap();
        assert_eq!(left.stock, 5);
    }

    #[tokio::test]
    async fn concurrent_checkouts_never_oversell() {
        let pool = test_pool().await;
        let m = seed_member(&pool).await;
        let p = seed_product(&pool, "Lamp", 89.0, 1).await;

        let a = place(&pool, order_for(&m, &p, 1, 89.0));
        let b = place(&pool, order_for(&m, &p, 1, 89.0));
        let (ra, rb) = tokio::join!(a, b);

        let wins = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);

        let left = product::find_by_id(&pool, &p).await.unwrap().unwrap();
        assert_eq!(left.stock, 0);
        assert_eq!(find_all(&pool).await.unwrap().len(), 1);
    }
}
