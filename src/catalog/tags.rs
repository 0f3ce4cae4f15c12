//! Tag repository: normalized names, get-or-create, CRUD
use crate::catalog::models::TagRow;
use crate::error::{is_unique_violation, AppError, AppResult};
use sqlx::{SqliteConnection, SqlitePool};

/// Normalize raw tag names from a request: trim, lower-case, drop
/// nulls and blanks, dedup preserving first occurrence.
pub fn normalize_tag_names<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .flatten()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Fetch a tag by normalized name, creating it if missing
///
/// Runs on the caller's transaction so item create/update rolls the
/// tag back together with everything else.
pub async fn get_or_create(conn: &mut SqliteConnection, name: &str) -> AppResult<TagRow> {
    sqlx::query("INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    let tag = sqlx::query_as::<_, TagRow>("SELECT id, name FROM tags WHERE name = ?1")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

    Ok(tag)
}

/// List all tags ordered by name
pub async fn list(pool: &SqlitePool) -> AppResult<Vec<TagRow>> {
    let tags = sqlx::query_as::<_, TagRow>("SELECT id, name FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(tags)
}

/// Create a tag from a raw name
pub async fn create(pool: &SqlitePool, raw_name: &str) -> AppResult<TagRow> {
    let name = raw_name.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::Validation("Tag name cannot be blank".to_string()));
    }

    let result = sqlx::query("INSERT INTO tags (name) VALUES (?1)")
        .bind(&name)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(TagRow {
            id: done.last_insert_rowid(),
            name,
        }),
        Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateName(name)),
        Err(e) => Err(e.into()),
    }
}

/// Rename a tag; the new name is normalized like any other
pub async fn update(pool: &SqlitePool, tag_id: i64, raw_name: &str) -> AppResult<TagRow> {
    let name = raw_name.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::Validation("Tag name cannot be blank".to_string()));
    }

    let result = sqlx::query("UPDATE tags SET name = ?1 WHERE id = ?2")
        .bind(&name)
        .bind(tag_id)
        .execute(pool)
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => {
            Err(AppError::NotFound(format!("Tag {} not found", tag_id)))
        }
        Ok(_) => Ok(TagRow { id: tag_id, name }),
        Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateName(name)),
        Err(e) => Err(e.into()),
    }
}

/// Delete a tag; link rows cascade, items survive
pub async fn delete(pool: &SqlitePool, tag_id: i64) -> AppResult<()> {
    let done = sqlx::query("DELETE FROM tags WHERE id = ?1")
        .bind(tag_id)
        .execute(pool)
        .await?;

    if done.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Tag {} not found", tag_id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;

    #[test]
    fn test_normalize_drops_nulls_and_blanks() {
        let raw = vec![
            None,
            Some("".to_string()),
            Some("Ruby".to_string()),
            Some(" ".to_string()),
        ];
        assert_eq!(normalize_tag_names(raw), vec!["ruby".to_string()]);
    }

    #[test]
    fn test_normalize_trims_lowercases_and_dedups() {
        let raw = vec![
            Some("  Silver ".to_string()),
            Some("SILVER".to_string()),
            Some("2025".to_string()),
        ];
        assert_eq!(
            normalize_tag_names(raw),
            vec!["silver".to_string(), "2025".to_string()]
        );
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_existing_tag() {
        let pool = memory_pool().await;

        let mut conn = pool.acquire().await.unwrap();
        let first = get_or_create(&mut conn, "ruby").await.unwrap();
        let second = get_or_create(&mut conn, "ruby").await.unwrap();
        assert_eq!(first.id, second.id);
        drop(conn);

        let all = list(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_create_normalizes_name() {
        let pool = memory_pool().await;

        let tag = create(&pool, "  GOLD  ").await.unwrap();
        assert_eq!(tag.name, "gold");
    }

    #[tokio::test]
    async fn test_create_blank_name_rejected() {
        let pool = memory_pool().await;

        let result = create(&pool, "   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(list(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_name_rejected() {
        let pool = memory_pool().await;

        create(&pool, "silver").await.unwrap();
        let result = create(&pool, " Silver ").await;
        assert!(matches!(result, Err(AppError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_update_missing_tag_is_not_found() {
        let pool = memory_pool().await;

        let result = update(&pool, 42, "ruby").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let pool = memory_pool().await;

        let tag = create(&pool, "opal").await.unwrap();
        delete(&pool, tag.id).await.unwrap();
        let result = delete(&pool, tag.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_name() {
        let pool = memory_pool().await;

        create(&pool, "zircon").await.unwrap();
        create(&pool, "amber").await.unwrap();
        create(&pool, "pearl").await.unwrap();

        let names: Vec<String> = list(&pool).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["amber", "pearl", "zircon"]);
    }
}
