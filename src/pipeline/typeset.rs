//! The built-in invoice renderer: lays the record out on an A4-proportioned
//! raster page.
//!
//! ## Geometry
//!
//! The page is laid out in base units of 794×1123 px (A4 at screen
//! resolution) and rasterised at `scale×` that size, so all coordinates
//! below are written once and multiplied through. The surface is filled
//! opaque white before anything is drawn — the encoded document must never
//! carry transparency.
//!
//! ## Fonts
//!
//! Text is drawn with `imageproc`/`ab_glyph` from a TrueType font resolved
//! at construction time: an explicit path from config, the
//! `INVOICE2PDF_FONT` env var, or a list of common system locations.
//! Construction fails when nothing usable is found; the render itself can
//! then no longer fail on missing assets.

use crate::config::BatchConfig;
use crate::error::{Invoice2PdfError, RecordError};
use crate::model::{BrandProfile, InvoiceRecord};
use crate::pipeline::render::InvoiceRenderer;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Base page size, A4 proportions at screen resolution.
pub const PAGE_WIDTH: u32 = 794;
pub const PAGE_HEIGHT: u32 = 1123;

const MARGIN: f32 = 57.0;
const TABLE_TOP: f32 = 210.0;
const HEADER_ROW_H: f32 = 30.0;
const ITEM_ROW_H: f32 = 28.0;
/// Item rows may not run past this line; the details block needs the rest.
const TABLE_FLOOR: f32 = 780.0;

const INK: Rgba<u8> = Rgba([31, 41, 55, 255]);
const MUTED: Rgba<u8> = Rgba([107, 114, 128, 255]);
const RULE: Rgba<u8> = Rgba([229, 231, 235, 255]);
const HEADER_BG: Rgba<u8> = Rgba([243, 244, 246, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// System font locations tried when nothing is configured.
const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// The default raster renderer behind the
/// [`InvoiceRenderer`] seam.
pub struct TypesetRenderer {
    font: FontVec,
    scale: u32,
    brand: BrandProfile,
    logo: Option<DynamicImage>,
}

impl TypesetRenderer {
    /// Construct from config: resolve the font, decode the optional logo.
    pub fn from_config(config: &BatchConfig) -> Result<Self, Invoice2PdfError> {
        let font = resolve_font(config.font_path.as_deref())?;
        let logo = config.logo_path.as_ref().and_then(|path| {
            match image::open(path) {
                Ok(img) => Some(img),
                Err(e) => {
                    warn!("Logo '{}' could not be decoded, skipping: {e}", path.display());
                    None
                }
            }
        });
        Ok(Self {
            font,
            scale: config.scale.clamp(1, 4),
            brand: config.brand.clone(),
            logo,
        })
    }

    /// Construct directly from parts (mainly for tests).
    pub fn new(font: FontVec, scale: u32, brand: BrandProfile) -> Self {
        Self {
            font,
            scale: scale.clamp(1, 4),
            brand,
            logo: None,
        }
    }

    fn s(&self, v: f32) -> f32 {
        v * self.scale as f32
    }

    fn text(&self, img: &mut RgbaImage, x: f32, y: f32, px: f32, color: Rgba<u8>, text: &str) {
        draw_text_mut(
            img,
            color,
            self.s(x) as i32,
            self.s(y) as i32,
            PxScale::from(self.s(px)),
            &self.font,
            text,
        );
    }

    /// Faux-bold: the same text twice, one device pixel apart.
    fn text_bold(&self, img: &mut RgbaImage, x: f32, y: f32, px: f32, color: Rgba<u8>, text: &str) {
        self.text(img, x, y, px, color, text);
        draw_text_mut(
            img,
            color,
            self.s(x) as i32 + 1,
            self.s(y) as i32,
            PxScale::from(self.s(px)),
            &self.font,
            text,
        );
    }

    fn text_right(&self, img: &mut RgbaImage, right: f32, y: f32, px: f32, color: Rgba<u8>, text: &str) {
        let w = text_width(&self.font, self.s(px), text);
        let x = (self.s(right) - w).max(0.0);
        draw_text_mut(img, color, x as i32, self.s(y) as i32, PxScale::from(self.s(px)), &self.font, text);
    }

    fn text_center(&self, img: &mut RgbaImage, cx: f32, y: f32, px: f32, color: Rgba<u8>, text: &str) {
        let w = text_width(&self.font, self.s(px), text);
        let x = (self.s(cx) - w / 2.0).max(0.0);
        draw_text_mut(img, color, x as i32, self.s(y) as i32, PxScale::from(self.s(px)), &self.font, text);
    }

    fn fill(&self, img: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, color: Rgba<u8>) {
        let rect = Rect::at(self.s(x) as i32, self.s(y) as i32)
            .of_size(self.s(w).max(1.0) as u32, self.s(h).max(1.0) as u32);
        draw_filled_rect_mut(img, rect, color);
    }

    fn hline(&self, img: &mut RgbaImage, x: f32, y: f32, w: f32, color: Rgba<u8>) {
        let rect = Rect::at(self.s(x) as i32, self.s(y) as i32)
            .of_size(self.s(w).max(1.0) as u32, self.scale.max(1));
        draw_filled_rect_mut(img, rect, color);
    }

    fn draw_header(&self, img: &mut RgbaImage, record: &InvoiceRecord) {
        let mut name_x = MARGIN;
        if let Some(ref logo) = self.logo {
            let target_h = self.s(40.0) as u32;
            let scaled = logo.thumbnail(target_h * 4, target_h);
            imageops::overlay(img, &scaled, self.s(MARGIN) as i64, self.s(47.0) as i64);
            name_x += scaled.width() as f32 / self.scale as f32 + 10.0;
        }
        self.text_bold(img, name_x, 60.0, 15.0, INK, &self.brand.company_name);

        let right = PAGE_WIDTH as f32 - MARGIN;
        self.text_right(img, right, 47.0, 30.0, INK, "INVOICE");

        let mut y = 95.0;
        for (label, value) in [
            ("INVOICE #:", record.invoice_no.as_str()),
            ("INVOICE DATE:", record.invoice_date.as_str()),
            ("BILLING PERIOD:", record.billing_period.as_str()),
        ] {
            self.text_right(img, right, y, 11.0, MUTED, &format!("{label} {value}"));
            y += 16.0;
        }
    }

    /// Draw the item table; returns the y coordinate below the last row.
    fn draw_table(&self, img: &mut RgbaImage, record: &InvoiceRecord) -> f32 {
        let x0 = MARGIN;
        let table_w = PAGE_WIDTH as f32 - 2.0 * MARGIN;
        let date_w = table_w * 0.25;
        let desc_w = table_w * 0.50;
        let right = x0 + table_w;

        self.text(img, x0, TABLE_TOP - 26.0, 12.0, INK, "Bill To:");

        self.fill(img, x0, TABLE_TOP, table_w, HEADER_ROW_H, HEADER_BG);
        let label_y = TABLE_TOP + 8.0;
        self.text(img, x0 + 8.0, label_y, 11.0, INK, "Date");
        self.text_center(img, x0 + date_w + desc_w / 2.0, label_y, 11.0, INK, "Description");
        self.text_right(
            img,
            right - 8.0,
            label_y,
            11.0,
            INK,
            &format!("Amount ({})", record.currency),
        );
        self.hline(img, x0, TABLE_TOP + HEADER_ROW_H, table_w, RULE);

        let mut y = TABLE_TOP + HEADER_ROW_H;
        let fit = ((TABLE_FLOOR - y) / ITEM_ROW_H).max(0.0) as usize;
        let shown = record.items.len().min(fit);

        for item in &record.items[..shown] {
            let text_y = y + 7.0;
            self.text(img, x0 + 8.0, text_y, 11.0, INK, &item.date);
            self.text_center(img, x0 + date_w + desc_w / 2.0, text_y, 11.0, INK, &item.description);
            self.text_right(img, right - 8.0, text_y, 11.0, INK, &item.amount);
            y += ITEM_ROW_H;
            self.hline(img, x0, y, table_w, RULE);
        }

        if shown < record.items.len() {
            let omitted = record.items.len() - shown;
            self.text(
                img,
                x0 + 8.0,
                y + 7.0,
                10.0,
                MUTED,
                &format!("… and {omitted} more items"),
            );
            y += ITEM_ROW_H;
        }

        y
    }

    fn draw_details(&self, img: &mut RgbaImage, record: &InvoiceRecord, table_bottom: f32) {
        let x0 = MARGIN;
        let mut y = table_bottom + 28.0;

        for line in &self.brand.detail_lines {
            self.text(img, x0, y, 10.0, Rgba([55, 65, 81, 255]), line);
            y += 15.0;
        }

        y += 12.0;
        self.text_bold(img, x0, y, 12.0, INK, &format!("Invoice Total: {}", record.total));
        y += 18.0;
        self.text(img, x0, y, 11.0, INK, &format!("Invoice Currency: {}", record.currency));
    }

    fn draw_footer(&self, img: &mut RgbaImage) {
        let cx = PAGE_WIDTH as f32 / 2.0;
        self.text_center(img, cx, PAGE_HEIGHT as f32 - 80.0, 9.0, MUTED, &self.brand.footer_note);
        self.text_center(
            img,
            cx,
            PAGE_HEIGHT as f32 - 55.0,
            11.0,
            INK,
            "THANK YOU FOR YOUR BUSINESS!",
        );
    }

    fn draw_watermark(&self, img: &mut RgbaImage) {
        let Some(ref logo) = self.logo else { return };
        let side = self.s(300.0) as u32;
        let mut faded = logo.thumbnail(side, side).to_rgba8();
        for pixel in faded.pixels_mut() {
            pixel.0[3] = (pixel.0[3] as f32 * 0.05) as u8;
        }
        let x = (img.width().saturating_sub(faded.width())) / 2;
        let y = (img.height().saturating_sub(faded.height())) / 2;
        imageops::overlay(img, &DynamicImage::ImageRgba8(faded), x as i64, y as i64);
    }
}

impl InvoiceRenderer for TypesetRenderer {
    fn render(&self, record: &InvoiceRecord) -> Result<DynamicImage, RecordError> {
        let w = PAGE_WIDTH * self.scale;
        let h = PAGE_HEIGHT * self.scale;
        let mut img = RgbaImage::from_pixel(w, h, WHITE);

        self.draw_watermark(&mut img);
        self.draw_header(&mut img, record);
        let table_bottom = self.draw_table(&mut img, record);
        self.draw_details(&mut img, record, table_bottom);
        self.draw_footer(&mut img);

        debug!("Typeset invoice {} at {w}x{h}", record.invoice_no);
        Ok(DynamicImage::ImageRgba8(img))
    }
}

/// Advance width of `text` at `px`, including kerning.
fn text_width(font: &FontVec, px: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(PxScale::from(px));
    let mut width = 0.0;
    let mut prev = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Resolve a TrueType font: explicit path, env var, then system locations.
fn resolve_font(explicit: Option<&Path>) -> Result<FontVec, Invoice2PdfError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    if let Ok(env_path) = std::env::var("INVOICE2PDF_FONT") {
        if !env_path.is_empty() {
            candidates.push(PathBuf::from(env_path));
        }
    }
    candidates.extend(FONT_SEARCH_PATHS.iter().map(PathBuf::from));

    for candidate in &candidates {
        if let Ok(bytes) = std::fs::read(candidate) {
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    debug!("Using font {}", candidate.display());
                    return Ok(font);
                }
                Err(e) => warn!("Font '{}' unusable: {e}", candidate.display()),
            }
        }
    }

    Err(Invoice2PdfError::RendererUnavailable {
        detail: format!(
            "no usable TrueType font found (tried {} locations)",
            candidates.len()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineItem;

    #[test]
    fn bogus_explicit_font_path_is_unavailable_when_no_fallback() {
        // An explicit bad path may still fall back to a system font; only
        // assert the error shape when nothing on the machine matches.
        let result = resolve_font(Some(Path::new("/no/such/font.ttf")));
        if let Err(e) = result {
            assert!(matches!(e, Invoice2PdfError::RendererUnavailable { .. }));
        }
    }

    #[test]
    fn renders_opaque_page_at_scaled_size() {
        let Ok(font) = resolve_font(None) else {
            println!("SKIP — no system font available");
            return;
        };
        let renderer = TypesetRenderer::new(font, 2, BrandProfile::default());

        let mut record = InvoiceRecord::new("20260101");
        record.invoice_date = "01/01/2026".into();
        record.items = vec![LineItem {
            date: "Jan 2026".into(),
            description: "Advertising services".into(),
            amount: "104,893.06".into(),
        }];
        record.recompute_total();

        let img = renderer.render(&record).expect("render");
        assert_eq!(img.width(), PAGE_WIDTH * 2);
        assert_eq!(img.height(), PAGE_HEIGHT * 2);

        // White background, fully opaque everywhere.
        let rgba = img.to_rgba8();
        assert_eq!(rgba.get_pixel(1, 1).0, [255, 255, 255, 255]);
        assert!(rgba.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn same_record_renders_identically() {
        let Ok(font) = resolve_font(None) else {
            println!("SKIP — no system font available");
            return;
        };
        let renderer = TypesetRenderer::new(font, 1, BrandProfile::default());
        let record = InvoiceRecord::new("A1");
        let a = renderer.render(&record).unwrap().into_rgba8();
        let b = renderer.render(&record).unwrap().into_rgba8();
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
