//! Product Repository

use sqlx::SqlitePool;

use super::{RepoError, RepoResult};
use crate::db::models::{Product, ProductCreate, ProductUpdate};
use crate::utils::{id, time};

const PRODUCT_SELECT: &str = "SELECT id, name, description, price, image, category, stock, in_stock, created_at, updated_at FROM products";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Product>> {
    let sql = format!("{PRODUCT_SELECT} ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Product>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_category(pool: &SqlitePool, category: &str) -> RepoResult<Vec<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE category = ? ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(category)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Case-insensitive substring search over name, description and category
pub async fn search(pool: &SqlitePool, query: &str) -> RepoResult<Vec<Product>> {
    let pattern = format!("%{}%", query.to_lowercase());
    let sql = format!(
        "{PRODUCT_SELECT} WHERE LOWER(name) LIKE ?1 OR LOWER(description) LIKE ?1 OR LOWER(category) LIKE ?1 ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(&pattern)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    let now = time::now_millis();
    let id = id::next_id('p');
    let stock = data.stock.unwrap_or(0);

    sqlx::query(
        "INSERT INTO products (id, name, description, price, image, category, stock, in_stock, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    )
    .bind(&id)
    .bind(&data.name)
    .bind(data.description.unwrap_or_default())
    .bind(data.price)
    .bind(data.image.unwrap_or_default())
    .bind(&data.category)
    .bind(stock)
    .bind(stock > 0)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

/// Partial update; a supplied `stock` recomputes `in_stock` in the same write
pub async fn update(pool: &SqlitePool, id: &str, data: ProductUpdate) -> RepoResult<Product> {
    let now = time::now_millis();
    let rows = sqlx::query(
        "UPDATE products SET \
            name = COALESCE(?1, name), \
            description = COALESCE(?2, description), \
            price = COALESCE(?3, price), \
            image = COALESCE(?4, image), \
            category = COALESCE(?5, category), \
            stock = COALESCE(?6, stock), \
            in_stock = COALESCE(?6, stock) > 0, \
            updated_at = ?7 \
         WHERE id = ?8",
    )
    .bind(data.name)
    .bind(data.description)
    .bind(data.price)
    .bind(data.image)
    .bind(data.category)
    .bind(data.stock)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: &str) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn lamp() -> ProductCreate {
        ProductCreate {
            name: "Minimal Desk Lamp".into(),
            description: Some("Adjustable brightness".into()),
            price: 89.0,
            image: Some("/images/desk-lamp.jpg".into()),
            category: "Lighting".into(),
            stock: Some(5),
        }
    }

    #[tokio::test]
    async fn in_stock_flag_follows_stock_on_create() {
        let pool = test_pool().await;
        let p = create(&pool, lamp()).await.unwrap();
        assert_eq!(p.stock, 5);
        assert!(p.in_stock);

        let empty = create(
            &pool,
            ProductCreate {
                stock: Some(0),
                ..lamp()
            },
        )
        .await
        .unwrap();
        assert!(!empty.in_stock);
    }

    #[tokio::test]
    async fn update_recomputes_in_stock_in_same_write() {
        let pool = test_pool().await;
        let p = create(&pool, lamp()).await.unwrap();

        let updated = update(
            &pool,
            &p.id,
            ProductUpdate {
                stock: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.stock, 0);
        assert!(!updated.in_stock);

        let restocked = update(
            &pool,
            &p.id,
            ProductUpdate {
                stock: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(restocked.in_stock);
    }

    #[tokio::test]
    async fn update_leaves_omitted_fields_alone() {
        let pool = test_pool().await;
        let p = create(&pool, lamp()).await.unwrap();

        let updated = update(
            &pool,
            &p.id,
            ProductUpdate {
                price: Some(99.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.price, 99.0);
        assert_eq!(updated.name, p.name);
        assert_eq!(updated.stock, p.stock);
        assert!(updated.in_stock);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_across_fields() {
        let pool = test_pool().await;
        create(&pool, lamp()).await.unwrap();
        create(
            &pool,
            ProductCreate {
                name: "Ceramic Coffee Set".into(),
                description: Some("Handcrafted pour-over set".into()),
                category: "Kitchenware".into(),
                ..lamp()
            },
        )
        .await
        .unwrap();

        assert_eq!(search(&pool, "LAMP").await.unwrap().len(), 1);
        assert_eq!(search(&pool, "pour-OVER").await.unwrap().len(), 1);
        assert_eq!(search(&pool, "kitchen").await.unwrap().len(), 1);
        assert_eq!(search(&pool, "nothing-here").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn update_missing_product_is_not_found() {
        let pool = test_pool().await;
        let err = update(&pool, "p0", ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }
}
