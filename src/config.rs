//! Configuration types for batch invoice generation.
//!
//! All generation behaviour is controlled through [`BatchConfig`], built via
//! its [`BatchConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config between the eager, streaming and single-invoice
//! entry points, and to diff two runs to understand why their outputs differ.

use crate::error::Invoice2PdfError;
use crate::model::BrandProfile;
use crate::pipeline::render::InvoiceRenderer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Fixed filename of the batch archive delivered to the user.
pub const BATCH_ARCHIVE_NAME: &str = "invoices.zip";

/// Configuration for a batch generation run.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use invoice2pdf::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .scale(2)
///     .settle_timeout_secs(20)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Supersampling factor for rasterisation. Range: 1–4. Default: 2.
    ///
    /// The page is laid out at A4 screen proportions and rendered at
    /// `scale×` that resolution so text stays crisp after the bitmap is
    /// placed full-bleed on the PDF page. 2× is the sweet spot between
    /// sharpness and per-document size; 4× roughly quadruples both.
    pub scale: u32,

    /// Upper bound on a single invoice's render, in seconds. Default: 30.
    ///
    /// The render step is asynchronous relative to the orchestrator; a
    /// bounded wait replaces the fixed settle delay so one slow render
    /// fails that invoice instead of stalling the whole batch indefinitely.
    pub settle_timeout_secs: u64,

    /// What to do when two invoices map to the same archive filename.
    /// Default: [`DuplicatePolicy::Suffix`].
    pub duplicate_policy: DuplicatePolicy,

    /// Path to a TrueType font for the built-in renderer. If `None`, the
    /// `INVOICE2PDF_FONT` env var and common system locations are tried.
    pub font_path: Option<PathBuf>,

    /// Optional logo image drawn in the page header and as a faint
    /// watermark. Skipped silently if the file cannot be decoded.
    pub logo_path: Option<PathBuf>,

    /// Fixed page chrome (company name, bank details, footer).
    pub brand: BrandProfile,

    /// Pre-constructed renderer. Takes precedence over the built-in
    /// typeset renderer; useful in tests or when the host application has
    /// its own visual template.
    pub renderer: Option<Arc<dyn InvoiceRenderer>>,

    /// Progress callback invoked once per invoice. Default: none.
    pub progress_callback: Option<ProgressCallback>,

    /// Filename recorded for the finished archive. Default: `invoices.zip`.
    pub archive_name: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scale: 2,
            settle_timeout_secs: 30,
            duplicate_policy: DuplicatePolicy::default(),
            font_path: None,
            logo_path: None,
            brand: BrandProfile::default(),
            renderer: None,
            progress_callback: None,
            archive_name: BATCH_ARCHIVE_NAME.to_string(),
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("scale", &self.scale)
            .field("settle_timeout_secs", &self.settle_timeout_secs)
            .field("duplicate_policy", &self.duplicate_policy)
            .field("font_path", &self.font_path)
            .field("logo_path", &self.logo_path)
            .field("brand", &self.brand)
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn InvoiceRenderer>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .field("archive_name", &self.archive_name)
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn scale(mut self, scale: u32) -> Self {
        self.config.scale = scale.clamp(1, 4);
        self
    }

    pub fn settle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.settle_timeout_secs = secs.max(1);
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn logo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.logo_path = Some(path.into());
        self
    }

    pub fn brand(mut self, brand: BrandProfile) -> Self {
        self.config.brand = brand;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn InvoiceRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn archive_name(mut self, name: impl Into<String>) -> Self {
        self.config.archive_name = name.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, Invoice2PdfError> {
        let c = &self.config;
        if c.scale < 1 || c.scale > 4 {
            return Err(Invoice2PdfError::InvalidConfig(format!(
                "scale must be 1–4, got {}",
                c.scale
            )));
        }
        if c.settle_timeout_secs == 0 {
            return Err(Invoice2PdfError::InvalidConfig(
                "settle timeout must be ≥ 1 second".into(),
            ));
        }
        if c.archive_name.trim().is_empty() {
            return Err(Invoice2PdfError::InvalidConfig(
                "archive name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Policy for duplicate document filenames within one archive.
///
/// Grouping makes invoice numbers unique per batch, but filename
/// sanitisation can still collapse two distinct numbers onto one name
/// (`"A?1"` and `"A*1"` both sanitise to `A1`). Silent last-write-wins
/// loses documents; the policy is explicit, defaulting to something
/// lossless with overwrite still selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Append a numeric suffix: `Invoice_A1.pdf`, `Invoice_A1_2.pdf`. (default)
    #[default]
    Suffix,
    /// Fail the batch with [`Invoice2PdfError::DuplicateDocument`].
    Reject,
    /// Last write wins: the later document replaces the name.
    Overwrite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_scale() {
        let config = BatchConfig::builder().scale(9).build().unwrap();
        assert_eq!(config.scale, 4);
        let config = BatchConfig::builder().scale(0).build().unwrap();
        assert_eq!(config.scale, 1);
    }

    #[test]
    fn builder_rejects_empty_archive_name() {
        let err = BatchConfig::builder().archive_name("  ").build().unwrap_err();
        assert!(matches!(err, Invoice2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn default_policy_is_suffix() {
        assert_eq!(BatchConfig::default().duplicate_policy, DuplicatePolicy::Suffix);
    }

    #[test]
    fn debug_impl_does_not_require_debug_renderer() {
        let config = BatchConfig::default();
        let dbg = format!("{config:?}");
        assert!(dbg.contains("settle_timeout_secs"));
    }
}
