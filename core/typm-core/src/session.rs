//! Rendering session abstraction (made by FontLab https://www.fontlab.com/)
//!
//! One live handle to the external rendering engine. The engine is the
//! accepted ground truth for this system; the core makes no assumptions
//! about its implementation beyond the four operations below, which also
//! keeps it trivially fakeable in tests.

use std::time::Duration;

use indexmap::IndexMap;

/// Bounding geometry of a rendered element, in device-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A probe that rendered with no ink is omitted from results, never
    /// recorded as zero.
    pub fn has_ink(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Per-operation session failures. All of these are recoverable at the
/// unit-of-work level; only failing to obtain a session at all is fatal.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("document did not become ready within {0:?}")]
    PresentTimeout(Duration),
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("rendering engine error: {0}")]
    Engine(String),
}

/// A live connection to the rendering engine.
///
/// Every `present` replaces the whole document; the session keeps no
/// state between presents beyond the underlying engine connection.
/// Operations on one session are strictly sequential.
#[allow(async_fn_in_trait)]
pub trait RenderSession {
    /// Replace the current document with `markup` and suspend until the
    /// engine reports it structurally ready.
    async fn present(&mut self, markup: &str, load_timeout: Duration) -> Result<(), SessionError>;

    /// Read bounding geometry for the given element selectors in the
    /// currently presented document.
    async fn read_geometry(
        &mut self,
        selectors: &[String],
    ) -> Result<IndexMap<String, Extent>, SessionError>;

    /// Poll until the named font is available for shaping at `size_px`,
    /// up to `max_wait`. Returns `false` on exhaustion; best effort,
    /// callers proceed with possibly degraded measurements.
    async fn await_font_ready(
        &mut self,
        family: &str,
        size_px: f64,
        max_wait: Duration,
    ) -> Result<bool, SessionError>;

    /// Release the underlying engine connection.
    async fn close(&mut self) -> Result<(), SessionError>;
}
