use image::{imageops, DynamicImage, ImageBuffer, Rgba};
use qrcode::{Color, EcLevel, QrCode};
use uuid::Uuid;

use crate::{AssetError, ImagePayload, StorageConfig, MAX_LOGO_BYTES};

/// Rendered pixels per QR module.
const MODULE_PX: u32 = 16;
/// Quiet-zone width, in modules, on each side.
const QUIET_MODULES: u32 = 4;
/// Corner radius of the rounded module squares.
const MODULE_RADIUS: i32 = 5;
/// Logo edge as a fraction of the rendered image width.
const LOGO_FRACTION: f32 = 0.2;

const MODULE_COLOR: Rgba<u8> = Rgba([17, 24, 39, 255]);
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// The three URLs/paths a QR generation produces.
#[derive(Debug, Clone)]
pub struct QrArtifact {
    pub target_url: String,
    pub image_url: String,
    pub image_path: String,
}

/// Encodes a card's public URL into a stylized QR PNG under the public root.
#[derive(Debug, Clone)]
pub struct QrCodeGenerator {
    config: StorageConfig,
}

impl QrCodeGenerator {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// The URL encoded into the QR matrix. Keyed by card id, not slug, so a
    /// printed code survives slug renames.
    pub fn target_url(&self, card_id: &Uuid) -> String {
        format!("{}/c/{}", self.config.base_url.trim_end_matches('/'), card_id)
    }

    /// Encodes the card's target URL at `EcLevel::H`, optionally overlays a
    /// logo, and persists the PNG under a fresh filename. When
    /// `existing_image_url` is given, that file is removed only after the new
    /// one is confirmed written (cache busting, never zero valid files).
    pub async fn generate(
        &self,
        card_id: &Uuid,
        logo_payload: Option<&str>,
        existing_image_url: Option<&str>,
    ) -> Result<QrArtifact, AssetError> {
        let target_url = self.target_url(card_id);

        // decoded before any rendering so bad logo bytes fail fast as a
        // client error
        let logo = match logo_payload {
            Some(raw) => {
                let payload = ImagePayload::decode(raw, MAX_LOGO_BYTES)?;
                let decoded = image::load_from_memory(&payload.data)
                    .map_err(|e| AssetError::InvalidPayload(format!("logo decode failed: {}", e)))?;
                Some(decoded)
            }
            None => None,
        };

        // H-level redundancy is what makes the blanked logo window scannable
        let code = QrCode::with_error_correction_level(target_url.as_bytes(), EcLevel::H)
            .map_err(|e| AssetError::Encode(format!("qr encode failed: {}", e)))?;

        let canvas = render_modules(&code, logo.as_ref());

        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| AssetError::Encode(e.to_string()))?;

        let dir = self.config.public_root.join("qr");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}_{}.png", card_id, Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await?;

        if let Some(old_url) = existing_image_url {
            if let Some(old_path) = self.config.path_for_url(old_url) {
                if old_path != path {
                    if let Err(e) = tokio::fs::remove_file(&old_path).await {
                        tracing::warn!(
                            "[QrCodeGenerator] failed to remove stale qr '{}': {}",
                            old_path.display(),
                            e
                        );
                    }
                }
            }
        }

        Ok(QrArtifact {
            target_url,
            image_url: self.config.public_url(&path),
            image_path: path.to_string_lossy().into_owned(),
        })
    }
}

fn render_modules(code: &QrCode, logo: Option<&DynamicImage>) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    let width = code.width() as u32;
    let colors = code.to_colors();
    let total = (width + 2 * QUIET_MODULES) * MODULE_PX;
    let logo_px = (total as f32 * LOGO_FRACTION).round() as u32;

    // center modules under the logo stay blank instead of being painted over
    let reserved = logo.map(|_| {
        let span = logo_px.div_ceil(MODULE_PX) + 2;
        let start = (width.saturating_sub(span)) / 2;
        (start, start + span)
    });

    let mut canvas = ImageBuffer::from_pixel(total, total, BACKGROUND);

    for my in 0..width {
        for mx in 0..width {
            if colors[(my * width + mx) as usize] != Color::Dark {
                continue;
            }
            if let Some((lo, hi)) = reserved {
                if mx >= lo && mx < hi && my >= lo && my < hi {
                    continue;
                }
            }
            draw_module(
                &mut canvas,
                (mx + QUIET_MODULES) * MODULE_PX,
                (my + QUIET_MODULES) * MODULE_PX,
            );
        }
    }

    if let Some(logo) = logo {
        // this filter set has no area filter; Triangle is its nearest
        // equivalent for a downscale this small
        let resized = imageops::resize(
            &logo.to_rgba8(),
            logo_px,
            logo_px,
            imageops::FilterType::Triangle,
        );
        let offset = (total - logo_px) / 2;
        overlay_alpha(&mut canvas, &resized, offset, offset);
    }

    canvas
}

fn draw_module(canvas: &mut ImageBuffer<Rgba<u8>, Vec<u8>>, ox: u32, oy: u32) {
    for y in 0..MODULE_PX {
        for x in 0..MODULE_PX {
            if rounded_square_contains(x as i32, y as i32, MODULE_PX as i32, MODULE_RADIUS) {
                canvas.put_pixel(ox + x, oy + y, MODULE_COLOR);
            }
        }
    }
}

fn rounded_square_contains(x: i32, y: i32, edge: i32, r: i32) -> bool {
    if x >= r && x < edge - r {
        return true;
    }
    if y >= r && y < edge - r {
        return true;
    }
    let cx = if x < r { r - 1 } else { edge - r };
    let cy = if y < r { r - 1 } else { edge - r };
    let dx = x - cx;
    let dy = y - cy;
    dx * dx + dy * dy <= r * r
}

fn overlay_alpha(
    base: &mut ImageBuffer<Rgba<u8>, Vec<u8>>,
    over: &ImageBuffer<Rgba<u8>, Vec<u8>>,
    x: u32,
    y: u32,
) {
    for oy in 0..over.height() {
        for ox in 0..over.width() {
            let p = over.get_pixel(ox, oy);
            let a = p.0[3] as f32 / 255.0;
            if a <= 0.0 {
                continue;
            }
            let bx = x + ox;
            let by = y + oy;
            if bx >= base.width() || by >= base.height() {
                continue;
            }
            let dst = base.get_pixel_mut(bx, by);
            let inv = 1.0 - a;
            dst.0[0] = (p.0[0] as f32 * a + dst.0[0] as f32 * inv) as u8;
            dst.0[1] = (p.0[1] as f32 * a + dst.0[1] as f32 * inv) as u8;
            dst.0[2] = (p.0[2] as f32 * a + dst.0[2] as f32 * inv) as u8;
            dst.0[3] = 255;
        }
    }
}
