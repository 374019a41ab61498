use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::{AssetError, ImageKind, ImagePayload, StorageConfig, MAX_IMAGE_BYTES};

/// Three-way image field contract: a missing key keeps the current image, an
/// empty string deletes it, anything else replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageField {
    #[default]
    Absent,
    Clear,
    Data(String),
}

impl<'de> Deserialize<'de> for ImageField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(match value {
            None => ImageField::Absent,
            Some(s) if s.is_empty() => ImageField::Clear,
            Some(s) => ImageField::Data(s),
        })
    }
}

/// Url/path pair for a stored image; both `None` means "no image set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredImage {
    pub url: Option<String>,
    pub path: Option<String>,
}

impl StoredImage {
    pub fn existing(url: Option<&str>, path: Option<&str>) -> Self {
        Self {
            url: url.map(str::to_string),
            path: path.map(str::to_string),
        }
    }
}

/// Persists banner/avatar images under the public storage root.
#[derive(Debug, Clone)]
pub struct ImageAssetStore {
    config: StorageConfig,
}

impl ImageAssetStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Applies the three-way `ImageField` contract for one `(card, kind)` slot.
    ///
    /// A replacement writes the new file first and removes the old one only
    /// after the write succeeded, so there is never a window with zero valid
    /// files on disk.
    pub async fn store_or_keep(
        &self,
        field: &ImageField,
        card_id: &Uuid,
        kind: ImageKind,
        existing: &StoredImage,
    ) -> Result<StoredImage, AssetError> {
        match field {
            ImageField::Absent => Ok(existing.clone()),
            ImageField::Clear => {
                self.remove_quietly(existing.path.as_deref()).await;
                Ok(StoredImage::default())
            }
            ImageField::Data(raw) => {
                let payload = ImagePayload::decode(raw, MAX_IMAGE_BYTES)?;

                let dir = self.config.public_root.join("cards").join(card_id.to_string());
                tokio::fs::create_dir_all(&dir).await?;

                let filename = format!("{}_{}.{}", kind.as_str(), Uuid::new_v4(), payload.extension);
                let path = dir.join(filename);
                tokio::fs::write(&path, &payload.data).await?;

                self.remove_quietly(existing.path.as_deref()).await;

                Ok(StoredImage {
                    url: Some(self.config.public_url(&path)),
                    path: Some(path.to_string_lossy().into_owned()),
                })
            }
        }
    }

    /// Best-effort file removal. The relational rows are the source of truth
    /// for existence, so filesystem failures here are logged and swallowed.
    pub async fn remove_quietly(&self, path: Option<&str>) {
        let Some(path) = path else { return };
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("[ImageAssetStore] failed to remove '{}': {}", path, e);
        }
    }
}
