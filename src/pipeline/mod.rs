//! Pipeline stages for batch invoice generation.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. inject a different renderer) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ingest ──▶ aggregate ──▶ render ──▶ encode ──▶ archive
//! (path)    (group      (totals)     (bitmap)   (PDF)      (zip)
//!            rows)
//! ```
//!
//! 1. [`input`]     — validate the user-supplied path and magic bytes
//! 2. [`ingest`]    — parse the workbook and group rows into invoice
//!    records in first-seen order
//! 3. [`aggregate`] — derive each record's display total from its items
//! 4. [`render`]    — rasterise the record through the renderer seam; runs
//!    in `spawn_blocking` under a bounded settle timeout
//! 5. [`encode`]    — place the bitmap full-bleed on a one-page PDF
//! 6. [`archive`]   — collect documents into a zip with explicit duplicate
//!    handling
//!
//! [`typeset`] is the default implementation behind the [`render`] seam.

pub mod aggregate;
pub mod archive;
pub mod encode;
pub mod ingest;
pub mod input;
pub mod render;
pub mod typeset;
