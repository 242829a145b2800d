//! # wh-storage-local
//!
//! Local filesystem implementation of `MediaStore`.
//! Pictures are content-addressed: a file lives at
//! `<kind>/<ab>/<cd>/<sha256>.<ext>` under the media root, next to a
//! `thumb_<sha256>.webp` preview. Identical uploads share one file.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use tokio::fs;
use wh_core::error::AppError;
use wh_core::models::{MediaKind, Rotation};
use wh_core::traits::MediaStore;

const THUMBNAIL_SIZE: u32 = 250;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

/// A decoded picture plus the bytes that will be written for it.
struct Prepared {
    bytes: Vec<u8>,
    extension: &'static str,
    image: DynamicImage,
}

fn not_an_image() -> anyhow::Error {
    anyhow::Error::new(AppError::invalid(
        "picture",
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
    ))
}

fn extension_of(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("img")
}

/// Decodes an upload, keeping its bytes as they are.
fn prepare_upload(data: Vec<u8>) -> anyhow::Result<Prepared> {
    let format = image::guess_format(&data).map_err(|_| not_an_image())?;
    let image = image::load_from_memory_with_format(&data, format).map_err(|_| not_an_image())?;
    Ok(Prepared {
        bytes: data,
        extension: extension_of(format),
        image,
    })
}

/// Decodes a stored picture, turns it and re-encodes it in the same format.
fn prepare_rotation(data: Vec<u8>, rotation: Rotation) -> anyhow::Result<Prepared> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| anyhow::anyhow!("stored picture has an unknown format"))?;
    let image = match rotation {
        Rotation::Left => reader.decode()?.rotate270(),
        Rotation::Right => reader.decode()?.rotate90(),
    };
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format)?;
    Ok(Prepared {
        bytes,
        extension: extension_of(format),
        image,
    })
}

fn hash_of(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Generates a sharded reference: "bird/ab/cd/abcd...hash.jpg"
    fn sharded_id(dir: &str, hash: &str, extension: &str) -> String {
        format!("{dir}/{}/{}/{hash}.{extension}", &hash[0..2], &hash[2..4])
    }

    /// Resolves a reference under the root, refusing anything that escapes it.
    fn resolve(&self, media_id: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(media_id);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            anyhow::bail!("invalid media reference {media_id:?}");
        }
        Ok(self.root_path.join(relative))
    }

    fn thumbnail_id(media_id: &str) -> String {
        let (dir, file) = media_id.rsplit_once('/').unwrap_or(("", media_id));
        let stem = file.split('.').next().unwrap_or(file);
        if dir.is_empty() {
            format!("thumb_{stem}.webp")
        } else {
            format!("{dir}/thumb_{stem}.webp")
        }
    }

    /// Writes a prepared picture and its thumbnail; returns the reference.
    async fn store(&self, dir: &str, prepared: Prepared) -> anyhow::Result<String> {
        let hash = hash_of(&prepared.bytes);
        let media_id = Self::sharded_id(dir, &hash, prepared.extension);
        let target = self.resolve(&media_id)?;

        if fs::try_exists(&target).await? {
            log::debug!("media {media_id} already stored");
            return Ok(media_id);
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &prepared.bytes).await?;

        let thumb_path = self.resolve(&Self::thumbnail_id(&media_id))?;
        let image = prepared.image;
        tokio::task::spawn_blocking(move || generate_thumbnail(&image, &thumb_path)).await??;

        log::info!("stored media {media_id} ({} bytes)", prepared.bytes.len());
        Ok(media_id)
    }
}

/// Writes a 250px WebP preview.
fn generate_thumbnail(image: &DynamicImage, thumb_path: &Path) -> anyhow::Result<()> {
    let thumb = image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    DynamicImage::ImageRgba8(thumb.to_rgba8()).save_with_format(thumb_path, ImageFormat::WebP)?;
    Ok(())
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save_upload(&self, data: Vec<u8>, kind: MediaKind) -> anyhow::Result<String> {
        let prepared = tokio::task::spawn_blocking(move || prepare_upload(data)).await??;
        self.store(kind.dir(), prepared).await
    }

    /// The original stays on disk; other rows may still point at it.
    async fn rotate(&self, media_id: &str, rotation: Rotation) -> anyhow::Result<String> {
        let source = self.resolve(media_id)?;
        let dir = media_id.split('/').next().unwrap_or(MediaKind::Bird.dir()).to_string();
        let data = fs::read(&source).await?;
        let prepared =
            tokio::task::spawn_blocking(move || prepare_rotation(data, rotation)).await??;
        self.store(&dir, prepared).await
    }

    fn get_url(&self, media_id: &str) -> String {
        format!("{}/{}", self.url_prefix, media_id)
    }

    fn get_thumbnail_url(&self, media_id: &str) -> String {
        format!("{}/{}", self.url_prefix, Self::thumbnail_id(media_id))
    }
}
