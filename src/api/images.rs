//! Gallery image endpoints: multipart upload, listing, reorder, delete
//!
//! Upload pipeline: every file in the request is validated and
//! normalized first, then all files are written to the media store,
//! and only then are the rows appended inside one transaction. On any
//! failure the files already written for this batch are removed, so a
//! rejected upload leaves neither partial rows nor stray files.

use crate::{
    catalog::gallery,
    catalog::items,
    catalog::models::{ImageRow, ReorderRequest},
    config::UploadConfig,
    context::AppContext,
    error::{AppError, AppResult},
    media::{normalize, MediaStore, NormalizedImage, SourceFormat},
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};

/// Room for a full batch of max-size files plus multipart framing
const UPLOAD_BODY_LIMIT: usize = 32 * 1024 * 1024;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/items/:item_id/images",
            get(list_images).post(upload_images),
        )
        .route("/items/:item_id/images/reorder", patch(reorder_images))
        .route("/items/:item_id/images/:image_id", delete(delete_image))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// POST /api/items/{id}/images
async fn upload_images(
    State(ctx): State<AppContext>,
    Path(item_id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Vec<ImageRow>>)> {
    if !items::item_exists(&ctx.db, item_id).await? {
        return Err(AppError::NotFound(format!("Item {} not found", item_id)));
    }

    // Validate and normalize the whole batch before touching disk
    let mut prepared: Vec<NormalizedImage> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart data: {}", e)))?
    {
        if field.file_name().is_none() {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_owned)
            .ok_or_else(|| {
                AppError::UnsupportedMediaType("missing content type".to_string())
            })?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;

        prepared.push(prepare_upload(&ctx.config.upload, &content_type, &data)?);
    }

    if prepared.is_empty() {
        return Err(AppError::Validation(
            "No image files in request".to_string(),
        ));
    }

    // Persist bytes; a write failure aborts before any rows exist
    let mut urls: Vec<String> = Vec::with_capacity(prepared.len());
    for image in &prepared {
        match ctx.media.save(&image.bytes, image.extension).await {
            Ok(url) => urls.push(url),
            Err(e) => {
                cleanup_files(&ctx.media, &urls).await;
                return Err(e);
            }
        }
    }

    // Positions N+1..N+K assigned in submission order, one transaction
    let saved = match gallery::append_images(&ctx.db, item_id, &urls).await {
        Ok(saved) => saved,
        Err(e) => {
            cleanup_files(&ctx.media, &urls).await;
            return Err(e);
        }
    };

    Ok((StatusCode::CREATED, Json(saved)))
}

/// Validate limits and produce the canonical bytes for one upload
///
/// Size and (via a header probe) dimensions are checked before the
/// untrusted bytes are fully decoded. GIF passes through unmodified
/// and never reaches the normalizer.
fn prepare_upload(
    limits: &UploadConfig,
    content_type: &str,
    data: &[u8],
) -> AppResult<NormalizedImage> {
    if data.len() > limits.max_file_bytes {
        return Err(AppError::Validation("Image too large".to_string()));
    }

    let (width, height) = normalize::probe_dimensions(data)?;
    let max_px = limits.max_source_dimension;
    if width > max_px || height > max_px {
        return Err(AppError::Validation(
            "Image dimensions too large".to_string(),
        ));
    }

    if content_type == "image/gif" {
        return Ok(NormalizedImage {
            bytes: data.to_vec(),
            extension: ".gif",
        });
    }

    let format = SourceFormat::from_mime(content_type).ok_or_else(|| {
        AppError::UnsupportedMediaType(format!("Invalid image type: {}", content_type))
    })?;

    normalize::normalize(data, format)
}

/// Best-effort removal of files written for a failed batch
async fn cleanup_files(media: &MediaStore, urls: &[String]) {
    for url in urls {
        media.delete(url).await;
    }
}

/// GET /api/items/{id}/images
async fn list_images(
    State(ctx): State<AppContext>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<Vec<ImageRow>>> {
    if !items::item_exists(&ctx.db, item_id).await? {
        return Err(AppError::NotFound(format!("Item {} not found", item_id)));
    }

    let images = gallery::list_images(&ctx.db, item_id).await?;
    Ok(Json(images))
}

/// PATCH /api/items/{id}/images/reorder
async fn reorder_images(
    State(ctx): State<AppContext>,
    Path(item_id): Path<i64>,
    Json(body): Json<ReorderRequest>,
) -> AppResult<StatusCode> {
    gallery::apply_order(&ctx.db, item_id, &body.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/items/{id}/images/{imageId}
///
/// Unlinks the backing file best effort, then removes the row and
/// compacts the remaining positions in one transaction.
async fn delete_image(
    State(ctx): State<AppContext>,
    Path((item_id, image_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    let image = gallery::fetch_image(&ctx.db, item_id, image_id).await?;

    ctx.media.delete(&image.url).await;
    gallery::delete_image_row(&ctx.db, item_id, image_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn limits() -> UploadConfig {
        UploadConfig {
            max_file_bytes: 2 * 1024 * 1024,
            max_source_dimension: 2000,
        }
    }

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 40, 200])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn test_oversized_file_rejected() {
        let tight = UploadConfig {
            max_file_bytes: 16,
            max_source_dimension: 2000,
        };
        let data = encode(32, 32, ImageFormat::Jpeg);
        assert!(data.len() > 16);

        let result = prepare_upload(&tight, "image/jpeg", &data);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_excessive_dimensions_rejected_by_header_probe() {
        let data = encode(2400, 100, ImageFormat::Jpeg);
        let result = prepare_upload(&limits(), "image/jpeg", &data);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_gif_passes_through_unmodified() {
        let data = encode(40, 30, ImageFormat::Gif);
        let out = prepare_upload(&limits(), "image/gif", &data).unwrap();
        assert_eq!(out.bytes, data);
        assert_eq!(out.extension, ".gif");
    }

    #[test]
    fn test_undeclared_content_type_rejected() {
        let data = encode(40, 30, ImageFormat::Bmp);
        let result = prepare_upload(&limits(), "image/bmp", &data);
        assert!(matches!(result, Err(AppError::UnsupportedMediaType(_))));
    }

    #[test]
    fn test_accepted_upload_is_normalized() {
        let data = encode(40, 30, ImageFormat::Png);
        let out = prepare_upload(&limits(), "image/png", &data).unwrap();
        assert_eq!(out.extension, ".png");
    }

    #[tokio::test]
    async fn test_cleanup_removes_files_from_a_failed_batch() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf());

        let mut urls = Vec::new();
        for _ in 0..2 {
            urls.push(store.save(b"bytes", ".jpg").await.unwrap());
        }
        for url in &urls {
            assert!(store.file_path(url).unwrap().exists());
        }

        cleanup_files(&store, &urls).await;

        for url in &urls {
            assert!(!store.file_path(url).unwrap().exists());
        }
    }
}
