//! Proof-of-payment and receipt images.
//!
//! An upload is accepted only if it decodes as a JPEG or PNG. Accepted images
//! are scaled down to fit `MAX_DIMENSION` and re-encoded, so what reaches the
//! store is always a clean image of the declared kind.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::multipart::Field;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    repository::ImageStore,
};

pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;
/// Stored images fit in a `MAX_DIMENSION` square, aspect ratio kept.
pub const MAX_DIMENSION: u32 = 500;
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
        }
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Png => Some(ImageKind::Png),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub field: String,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl UploadedImage {
    /// Checks a raw upload for the given form field and normalizes it for storage.
    pub fn validate(field: &str, filename: Option<&str>, data: Bytes) -> AppResult<Self> {
        if data.is_empty() {
            return Err(AppError::validation(field, "Image is required."));
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::validation(field, "An image cannot greater than 4 Mb."));
        }

        let unsupported = || AppError::validation(field, "Image must be between jpeg, png.");
        if let Some(ext) = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
        {
            let ext = ext.to_ascii_lowercase();
            if !matches!(ext.as_str(), "jpg" | "jpeg" | "png") {
                return Err(unsupported());
            }
        }
        let kind = image::guess_format(&data)
            .ok()
            .and_then(ImageKind::from_format)
            .ok_or_else(unsupported)?;

        let decoded = image::load_from_memory_with_format(&data, kind.format()).map_err(|e| {
            tracing::debug!(field, error = %e, "rejecting undecodable image");
            AppError::validation(field, "Image is corrupted or unreadable.")
        })?;
        let decoded = if decoded.width() > MAX_DIMENSION || decoded.height() > MAX_DIMENSION {
            decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
        } else {
            decoded
        };

        let encoded = encode(&decoded, kind)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("encode {}: {}", field, e)))?;

        Ok(Self {
            field: field.to_string(),
            kind,
            width: decoded.width(),
            height: decoded.height(),
            data: Bytes::from(encoded),
        })
    }

    /// Reads a multipart file field; decoding runs off the async workers.
    pub async fn from_field(field: Field<'_>) -> AppResult<Self> {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
        tokio::task::spawn_blocking(move || Self::validate(&name, filename.as_deref(), data))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("image task: {}", e)))?
    }
}

fn encode(image: &DynamicImage, kind: ImageKind) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    match kind {
        // JPEG has no alpha channel.
        ImageKind::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
            image.to_rgb8().write_with_encoder(encoder)?;
        }
        ImageKind::Png => image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?,
    }
    Ok(buffer)
}

/// Writes images below a root directory and hands out `folder/file` references.
#[derive(Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, folder: &str, image: &UploadedImage) -> AppResult<String> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("create {}: {}", dir.display(), e)))?;

        let filename = format!("{}.{}", Uuid::new_v4(), image.kind.extension());
        let path = dir.join(&filename);
        tokio::fs::write(&path, &image.data)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("write {}: {}", path.display(), e)))?;

        Ok(format!("{}/{}", folder, filename))
    }

    async fn remove(&self, reference: &str) -> AppResult<()> {
        let path = self.root.join(reference);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(anyhow::anyhow!(
                "remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Bytes {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([180, 40, 40])));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        Bytes::from(buffer)
    }

    fn png() -> Bytes {
        encoded(8, 8, ImageFormat::Png)
    }

    #[test]
    fn accepts_png_and_jpeg_by_content() {
        let image = UploadedImage::validate("proof_of_payment", Some("proof.PNG"), png()).unwrap();
        assert_eq!(image.kind, ImageKind::Png);
        assert_eq!((image.width, image.height), (8, 8));

        let jpeg = encoded(16, 12, ImageFormat::Jpeg);
        let image = UploadedImage::validate("no_receipt", None, jpeg).unwrap();
        assert_eq!(image.kind, ImageKind::Jpeg);
        assert!(image::load_from_memory_with_format(&image.data, ImageFormat::Jpeg).is_ok());
    }

    #[test]
    fn rejects_missing_oversized_and_foreign_files() {
        let err = UploadedImage::validate("proof_of_payment", None, Bytes::new()).unwrap_err();
        assert_eq!(err.to_string(), "proof_of_payment: Image is required.");

        let big = Bytes::from(vec![0xffu8; MAX_IMAGE_BYTES + 1]);
        let err = UploadedImage::validate("proof_of_payment", None, big).unwrap_err();
        assert_eq!(err.to_string(), "proof_of_payment: An image cannot greater than 4 Mb.");

        let gif = Bytes::from_static(b"GIF89a.....");
        let err = UploadedImage::validate("proof_of_payment", Some("a.gif"), gif).unwrap_err();
        assert_eq!(err.to_string(), "proof_of_payment: Image must be between jpeg, png.");

        assert!(UploadedImage::validate("proof_of_payment", Some("a.txt"), png()).is_err());
    }

    #[test]
    fn rejects_garbage_behind_an_image_header() {
        let fake_jpeg = Bytes::from_static(b"\xff\xd8\xffnot an image");
        let err = UploadedImage::validate("proof_of_payment", Some("x.jpg"), fake_jpeg).unwrap_err();
        assert_eq!(err.to_string(), "proof_of_payment: Image is corrupted or unreadable.");

        let mut fake_png = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
        fake_png.extend_from_slice(&[0u8; 32]);
        let err =
            UploadedImage::validate("no_receipt", Some("x.png"), Bytes::from(fake_png)).unwrap_err();
        assert_eq!(err.to_string(), "no_receipt: Image is corrupted or unreadable.");

        let real = png();
        let truncated = real.slice(..real.len() / 2);
        assert!(UploadedImage::validate("proof_of_payment", Some("x.png"), truncated).is_err());
    }

    #[test]
    fn large_images_are_scaled_to_fit() {
        let wide = encoded(800, 600, ImageFormat::Png);
        let image = UploadedImage::validate("proof_of_payment", Some("wide.png"), wide).unwrap();
        assert_eq!((image.width, image.height), (500, 375));

        let stored = image::load_from_memory(&image.data).unwrap();
        assert_eq!((stored.width(), stored.height()), (500, 375));
    }

    #[tokio::test]
    async fn local_store_writes_and_removes() {
        let root = std::env::temp_dir().join(format!("storefront-upload-{}", Uuid::new_v4()));
        let store = LocalImageStore::new(&root);
        let image = UploadedImage::validate("proof_of_payment", None, png()).unwrap();

        let reference = store.save("proof_payments", &image).await.unwrap();
        assert!(reference.starts_with("proof_payments/"));
        assert!(reference.ends_with(".png"));
        assert!(root.join(&reference).exists());

        store.remove(&reference).await.unwrap();
        assert!(!root.join(&reference).exists());
        store.remove(&reference).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
