//! Image Upload Handler
//!
//! 处理商品图片上传：校验声明类型与实际字节 (PNG / JPEG / WebP)，
//! 限制 5MB，按时间戳命名存入上传目录。

use axum::Json;
use axum::extract::{Multipart, State};
use image::ImageFormat;
use serde::Serialize;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult, id};

/// Maximum file size (5MB)
const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Supported image formats
const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Upload response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub filename: String,
    pub original_name: String,
    pub size: usize,
    pub format: &'static str,
    pub url: String,
}

/// 校验实际字节是受支持的图片格式，返回格式与扩展名
fn detect_format(data: &[u8]) -> Result<(ImageFormat, &'static str), AppError> {
    if data.is_empty() {
        return Err(AppError::validation("Empty file provided"));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::validation(format!(
            "File too large. Maximum size is {}MB",
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }

    // 以实际字节判断格式，而非客户端声明的 Content-Type
    let format = image::guess_format(data)
        .map_err(|e| AppError::validation(format!("Invalid image: {e}")))?;

    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(AppError::validation(
            "Unsupported file format. Supported: jpeg, png, webp",
        ));
    }

    let ext = match format {
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        _ => unreachable!(),
    };
    Ok((format, ext))
}

/// 声明的文件名扩展是否与图片 MIME 对应 (仅作提示性校验)
fn declared_type_is_image(filename: &str) -> bool {
    mime_guess::from_path(filename)
        .first()
        .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE)
}

/// POST /api/upload - 上传商品图片 (登录会员)
///
/// multipart 字段名 `image` (兼容 `file`)。
pub async fn upload(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let images_dir = format!("{}/images", state.config.upload_dir());
    tokio::fs::create_dir_all(&images_dir)
        .await
        .map_err(|e| AppError::internal(format!("Failed to create images directory: {e}")))?;

    // 找到 image / file 字段
    let mut field_data: Option<Vec<u8>> = None;
    let mut original_name = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" || name == "file" {
            original_name = field.file_name().unwrap_or_default().to_string();
            field_data = Some(field.bytes().await?.to_vec());
            break;
        }
    }

    let data = field_data
        .ok_or_else(|| AppError::validation("No 'image' field found in multipart request"))?;

    if !original_name.is_empty() && !declared_type_is_image(&original_name) {
        return Err(AppError::validation(format!(
            "'{original_name}' does not look like an image file"
        )));
    }

    let (format, ext) = detect_format(&data)?;

    // 时间戳文件名，与商品 ID 同一发号器保证唯一
    let filename = format!("{}.{ext}", id::next_id('u'));
    let file_path = format!("{images_dir}/{filename}");

    tokio::fs::write(&file_path, &data)
        .await
        .map_err(|e| AppError::internal(format!("Failed to save file: {e}")))?;

    tracing::info!(
        original_name = %original_name,
        size = data.len(),
        format = ?format,
        "Image uploaded"
    );

    let url = format!("/uploads/images/{filename}");
    Ok(Json(UploadResponse {
        filename,
        original_name,
        size: data.len(),
        format: ext,
        url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::new(2, 2);
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn png_is_accepted() {
        let (format, ext) = detect_format(&png_bytes()).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(ext, "png");
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = detect_format(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let huge = vec![0u8; MAX_FILE_SIZE + 1];
        let err = detect_format(&huge).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn declared_name_check() {
        assert!(declared_type_is_image("lamp.png"));
        assert!(declared_type_is_image("lamp.webp"));
        assert!(!declared_type_is_image("lamp.pdf"));
    }
}
