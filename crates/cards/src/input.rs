use serde::Deserialize;
use sqlx::types::Uuid;

use linkcard_assets::ImageField;

/// Validated input payload for Create and Update. Deserialization is done by
/// the calling layer; field-level validation happens in the service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemInput>,
    #[serde(default)]
    pub banner: ImageField,
    #[serde(default)]
    pub avatar: ImageField,
    /// Optional logo composited into the QR code on creation.
    #[serde(default)]
    pub qr_logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    /// Present when the caller is editing an existing item.
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Input payload for RegenerateQr.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QrInput {
    #[serde(default)]
    pub logo: Option<String>,
}
