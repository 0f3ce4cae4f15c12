//! Gallery ordering engine
//!
//! Keeps each item's image positions contiguous and 1-based: appends
//! land at N+1..N+K, explicit reorders assign list indexes, and
//! deletions compact the remaining positions back to 1..M. Every
//! read-then-write sequence runs inside a single transaction so
//! concurrent requests against the same item serialize through SQLite
//! rather than through application locks.

use crate::catalog::models::ImageRow;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

/// List an item's images ordered by gallery position
pub async fn list_images(pool: &SqlitePool, item_id: i64) -> AppResult<Vec<ImageRow>> {
    let images = sqlx::query_as::<_, ImageRow>(
        r#"
        SELECT id, item_id, url, sort_order, uploaded_at
        FROM images
        WHERE item_id = ?1
        ORDER BY sort_order, id
        "#,
    )
    .bind(item_id)
    .fetch_all(pool)
    .await?;

    Ok(images)
}

/// Fetch one image, checking it belongs to the stated item
pub async fn fetch_image(
    pool: &SqlitePool,
    item_id: i64,
    image_id: i64,
) -> AppResult<ImageRow> {
    sqlx::query_as::<_, ImageRow>(
        r#"
        SELECT id, item_id, url, sort_order, uploaded_at
        FROM images
        WHERE id = ?1 AND item_id = ?2
        "#,
    )
    .bind(image_id)
    .bind(item_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Image {} not found", image_id)))
}

/// Append a batch of stored media URLs to an item's gallery
///
/// New images take positions N+1..N+K in submission order, where N is
/// the current maximum position read inside the same transaction.
pub async fn append_images(
    pool: &SqlitePool,
    item_id: i64,
    urls: &[String],
) -> AppResult<Vec<ImageRow>> {
    let mut tx = pool.begin().await?;

    let max_order: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(sort_order), 0) FROM images WHERE item_id = ?1")
            .bind(item_id)
            .fetch_one(&mut *tx)
            .await?;

    let uploaded_at = Utc::now();
    let mut saved = Vec::with_capacity(urls.len());
    for (idx, url) in urls.iter().enumerate() {
        let sort_order = max_order + idx as i64 + 1;
        let done = sqlx::query(
            r#"
            INSERT INTO images (item_id, url, sort_order, uploaded_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(item_id)
        .bind(url)
        .bind(sort_order)
        .bind(uploaded_at)
        .execute(&mut *tx)
        .await?;

        saved.push(ImageRow {
            id: done.last_insert_rowid(),
            item_id,
            url: url.clone(),
            sort_order,
            uploaded_at,
        });
    }

    tx.commit().await?;
    Ok(saved)
}

/// Apply an explicit gallery order
///
/// Each id's position becomes its 1-based index in the supplied list.
/// Ids that don't exist or belong to another item are silently
/// skipped; positions of omitted images are left untouched, so
/// contiguity is only guaranteed when the caller supplies the complete
/// id list for the item.
pub async fn apply_order(pool: &SqlitePool, item_id: i64, ids: &[i64]) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    for (idx, image_id) in ids.iter().enumerate() {
        sqlx::query("UPDATE images SET sort_order = ?1 WHERE id = ?2 AND item_id = ?3")
            .bind(idx as i64 + 1)
            .bind(image_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Delete one image row and compact the remaining positions to 1..M
///
/// The backing file is the caller's responsibility (unlinked best
/// effort before this runs). Row delete and renumbering share one
/// transaction so the contiguity invariant is restored atomically.
pub async fn delete_image_row(pool: &SqlitePool, item_id: i64, image_id: i64) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let done = sqlx::query("DELETE FROM images WHERE id = ?1 AND item_id = ?2")
        .bind(image_id)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

    if done.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Image {} not found", image_id)));
    }

    compact(&mut tx, item_id).await?;

    tx.commit().await?;
    Ok(())
}

/// Rewrite an item's image positions to 1..M in current order
async fn compact(conn: &mut SqliteConnection, item_id: i64) -> AppResult<()> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM images WHERE item_id = ?1 ORDER BY sort_order, id")
            .bind(item_id)
            .fetch_all(&mut *conn)
            .await?;

    for (idx, id) in ids.iter().enumerate() {
        sqlx::query("UPDATE images SET sort_order = ?1 WHERE id = ?2")
            .bind(idx as i64 + 1)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;

    async fn seed_item(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query("INSERT INTO items (name, created_at) VALUES (?1, ?2)")
            .bind(name)
            .bind(Utc::now())
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    fn positions(images: &[ImageRow]) -> Vec<i64> {
        images.iter().map(|i| i.sort_order).collect()
    }

    async fn assert_contiguous(pool: &SqlitePool, item_id: i64) {
        let images = list_images(pool, item_id).await.unwrap();
        let expected: Vec<i64> = (1..=images.len() as i64).collect();
        assert_eq!(positions(&images), expected);
    }

    #[tokio::test]
    async fn test_append_assigns_positions_in_submission_order() {
        let pool = memory_pool().await;
        let item = seed_item(&pool, "ring").await;

        let urls: Vec<String> = (0..3).map(|i| format!("/media/{i}.jpg")).collect();
        let saved = append_images(&pool, item, &urls).await.unwrap();

        assert_eq!(positions(&saved), vec![1, 2, 3]);
        assert_eq!(saved[0].url, "/media/0.jpg");
        assert_eq!(saved[2].url, "/media/2.jpg");
    }

    #[tokio::test]
    async fn test_append_continues_after_existing_images() {
        let pool = memory_pool().await;
        let item = seed_item(&pool, "ring").await;

        append_images(&pool, item, &["/media/a.jpg".to_string(), "/media/b.jpg".to_string()])
            .await
            .unwrap();
        let second =
            append_images(&pool, item, &["/media/c.jpg".to_string(), "/media/d.jpg".to_string()])
                .await
                .unwrap();

        assert_eq!(positions(&second), vec![3, 4]);
        assert_contiguous(&pool, item).await;
    }

    #[tokio::test]
    async fn test_full_reorder_swaps_positions() {
        let pool = memory_pool().await;
        let item = seed_item(&pool, "ring").await;

        let saved = append_images(
            &pool,
            item,
            &["/media/a.jpg".to_string(), "/media/b.jpg".to_string()],
        )
        .await
        .unwrap();

        apply_order(&pool, item, &[saved[1].id, saved[0].id]).await.unwrap();

        let images = list_images(&pool, item).await.unwrap();
        assert_eq!(images[0].id, saved[1].id);
        assert_eq!(images[1].id, saved[0].id);
        assert_contiguous(&pool, item).await;
    }

    #[tokio::test]
    async fn test_reorder_skips_foreign_and_missing_ids() {
        let pool = memory_pool().await;
        let mine = seed_item(&pool, "ring").await;
        let other = seed_item(&pool, "necklace").await;

        let my_images = append_images(&pool, mine, &["/media/a.jpg".to_string()]).await.unwrap();
        let their_images =
            append_images(&pool, other, &["/media/b.jpg".to_string()]).await.unwrap();

        // Foreign id and a non-existent id; only my image may move
        apply_order(&pool, mine, &[their_images[0].id, 9999, my_images[0].id])
            .await
            .unwrap();

        let theirs = list_images(&pool, other).await.unwrap();
        assert_eq!(theirs[0].sort_order, 1, "foreign gallery untouched");

        let ours = list_images(&pool, mine).await.unwrap();
        assert_eq!(ours[0].sort_order, 3, "index in supplied list wins");
    }

    #[tokio::test]
    async fn test_partial_reorder_can_break_contiguity() {
        let pool = memory_pool().await;
        let item = seed_item(&pool, "ring").await;

        let saved = append_images(
            &pool,
            item,
            &[
                "/media/a.jpg".to_string(),
                "/media/b.jpg".to_string(),
                "/media/c.jpg".to_string(),
            ],
        )
        .await
        .unwrap();

        // Permissive by design: only the last image is mentioned, so it
        // collides with position 1 and positions 2,3 keep their holes.
        apply_order(&pool, item, &[saved[2].id]).await.unwrap();

        let images = list_images(&pool, item).await.unwrap();
        let mut got = positions(&images);
        got.sort_unstable();
        assert_eq!(got, vec![1, 1, 2]);
    }

    #[tokio::test]
    async fn test_delete_compacts_positions() {
        let pool = memory_pool().await;
        let item = seed_item(&pool, "ring").await;

        let saved = append_images(
            &pool,
            item,
            &[
                "/media/a.jpg".to_string(),
                "/media/b.jpg".to_string(),
                "/media/c.jpg".to_string(),
            ],
        )
        .await
        .unwrap();

        // Remove the middle image
        delete_image_row(&pool, item, saved[1].id).await.unwrap();

        let images = list_images(&pool, item).await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].id, saved[0].id);
        assert_eq!(images[1].id, saved[2].id);
        assert_contiguous(&pool, item).await;
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let pool = memory_pool().await;
        let item = seed_item(&pool, "ring").await;

        let saved = append_images(&pool, item, &["/media/a.jpg".to_string()]).await.unwrap();
        delete_image_row(&pool, item, saved[0].id).await.unwrap();

        let result = delete_image_row(&pool, item, saved[0].id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_with_wrong_owner_is_not_found() {
        let pool = memory_pool().await;
        let mine = seed_item(&pool, "ring").await;
        let other = seed_item(&pool, "necklace").await;

        let saved = append_images(&pool, mine, &["/media/a.jpg".to_string()]).await.unwrap();

        let result = delete_image_row(&pool, other, saved[0].id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(list_images(&pool, mine).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_contiguity_survives_mixed_operation_sequence() {
        let pool = memory_pool().await;
        let item = seed_item(&pool, "ring").await;

        let first = append_images(
            &pool,
            item,
            &["/media/a.jpg".to_string(), "/media/b.jpg".to_string()],
        )
        .await
        .unwrap();
        assert_contiguous(&pool, item).await;

        delete_image_row(&pool, item, first[0].id).await.unwrap();
        assert_contiguous(&pool, item).await;

        let second = append_images(
            &pool,
            item,
            &["/media/c.jpg".to_string(), "/media/d.jpg".to_string()],
        )
        .await
        .unwrap();
        assert_contiguous(&pool, item).await;

        // Full reorder: reverse everything currently in the gallery
        let all: Vec<i64> = list_images(&pool, item)
            .await
            .unwrap()
            .iter()
            .rev()
            .map(|i| i.id)
            .collect();
        apply_order(&pool, item, &all).await.unwrap();
        assert_contiguous(&pool, item).await;

        delete_image_row(&pool, item, second[1].id).await.unwrap();
        assert_contiguous(&pool, item).await;
    }
}
