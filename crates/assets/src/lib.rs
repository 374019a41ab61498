mod config;
mod error;
mod image_store;
mod payload;
mod qr;

pub use config::{AssetsEnv, StorageConfig};
pub use error::AssetError;
pub use image_store::{ImageAssetStore, ImageField, StoredImage};
pub use payload::{ImageKind, ImagePayload, MAX_IMAGE_BYTES, MAX_LOGO_BYTES};
pub use qr::{QrArtifact, QrCodeGenerator};
