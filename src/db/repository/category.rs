//! Category Repository

use sqlx::SqlitePool;

use super::{RepoError, RepoResult};
use crate::db::models::{Category, CategoryCreate, CategoryUpdate};
use crate::utils::{id, time};

const CATEGORY_SELECT: &str =
    "SELECT id, name, description, created_at, updated_at FROM categories";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Category>> {
    let sql = format!("{CATEGORY_SELECT} ORDER BY name ASC");
    let rows = sqlx::query_as::<_, Category>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Category>> {
    let sql = format!("{CATEGORY_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<Category>> {
    let sql = format!("{CATEGORY_SELECT} WHERE name = ? LIMIT 1");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: CategoryCreate) -> RepoResult<Category> {
    if find_by_name(pool, &data.name).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Category '{}' already exists",
            data.name
        )));
    }

    let now = time::now_millis();
    let id = id::next_id('c');
    sqlx::query(
        "INSERT INTO categories (id, name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
    )
    .bind(&id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create category".into()))
}

pub async fn update(pool: &SqlitePool, id: &str, data: CategoryUpdate) -> RepoResult<Category> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))?;

    // Check duplicate name if changing
    if let Some(ref new_name) = data.name
        && new_name != &existing.name
        && find_by_name(pool, new_name).await?.is_some()
    {
        return Err(RepoError::Duplicate(format!(
            "Category '{new_name}' already exists"
        )));
    }

    let now = time::now_millis();
    sqlx::query(
        "UPDATE categories SET name = COALESCE(?1, name), description = COALESCE(?2, description), updated_at = ?3 WHERE id = ?4",
    )
    .bind(data.name)
    .bind(data.description)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))
}

/// Delete a category; blocked while any product still references its name
pub async fn delete(pool: &SqlitePool, id: &str) -> RepoResult<bool> {
    let Some(category) = find_by_id(pool, id).await? else {
        return Err(RepoError::NotFound(format!("Category {id} not found")));
    };

    let (in_use,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE category = ? LIMIT 1")
            .bind(&category.name)
            .fetch_one(pool)
            .await?;

    if in_use > 0 {
        return Err(RepoError::Duplicate(format!(
            "Category '{}' is in use by existing products",
            category.name
        )));
    }

    let rows = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ProductCreate;
    use crate::db::repository::product;
    use crate::db::test_pool;

    fn lighting() -> CategoryCreate {
        CategoryCreate {
            name: "Lighting".into(),
            description: Some("Lamps and fixtures".into()),
        }
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let pool = test_pool().await;
        create(&pool, lighting()).await.unwrap();
        let err = create(&pool, lighting()).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn delete_fails_while_category_in_use() {
        let pool = test_pool().await;
        let cat = create(&pool, lighting()).await.unwrap();
        product::create(
            &pool,
            ProductCreate {
                name: "Minimal Desk Lamp".into(),
                description: None,
                price: 89.0,
                image: None,
                category: "Lighting".into(),
                stock: Some(1),
            },
        )
        .await
        .unwrap();

        let err = delete(&pool, &cat.id).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
        // Category must still exist
        assert!(find_by_id(&pool, &cat.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_succeeds_once_unused() {
        let pool = test_pool().await;
        let cat = create(&pool, lighting()).await.unwrap();
        assert!(delete(&pool, &cat.id).await.unwrap());
        assert!(find_by_id(&pool, &cat.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rename_checks_other_names_only() {
        let pool = test_pool().await;
        let cat = create(&pool, lighting()).await.unwrap();
        create(
            &pool,
            CategoryCreate {
                name: "Office".into(),
                description: None,
            },
        )
        .await
        .unwrap();

        // Same name on itself is fine
        let same = update(
            &pool,
            &cat.id,
            CategoryUpdate {
                name: Some("Lighting".into()),
                description: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(same.name, "Lighting");

        // Taking another category's name conflicts
        let err = update(
            &pool,
            &cat.id,
            CategoryUpdate {
                name: Some("Office".into()),
                description: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }
}
