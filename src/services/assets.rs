use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::info;
use tokio::fs;
use uuid::Uuid;

use crate::error::AssetError;
use crate::models::AssetRef;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(&self, image: &ImageUpload) -> Result<AssetRef, AssetError>;
}

/// Writes images under a local directory that the HTTP layer serves statically.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalAssetStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }
}

fn image_extension(filename: &str) -> Result<String, AssetError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(AssetError::UnsupportedType(filename.to_string()))
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn upload(&self, image: &ImageUpload) -> Result<AssetRef, AssetError> {
        let extension = image_extension(&image.filename)?;

        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
        }

        let id = Uuid::new_v4();
        let file_name = format!("{}.{}", id, extension);
        fs::write(self.dir.join(&file_name), &image.data).await?;
        info!("stored image {} ({} bytes)", file_name, image.data.len());

        Ok(AssetRef {
            asset_id: format!("image-{}-{}", id.simple(), extension),
            url: format!("{}/{}", self.url_prefix, file_name),
        })
    }
}
