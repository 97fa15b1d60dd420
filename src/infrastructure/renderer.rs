//! Headless render fallback
//!
//! A `PageRenderer` loads a URL in a real browser engine and returns the
//! resulting document HTML. The Chromium implementation is only compiled
//! with the `headless` feature; otherwise `NoopRenderer` reports the
//! fallback as unavailable and the harvester stays HTTP-only.

#[cfg(feature = "headless")]
pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::HarvestResult;

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigate to `url` and return the rendered HTML.
    async fn render(&self, url: &str, timeout_ms: u64) -> Result<String>;

    /// Whether this renderer can actually render anything.
    fn is_available(&self) -> bool;
}

/// Renderer used when no browser is available.
pub struct NoopRenderer;

#[async_trait]
impl PageRenderer for NoopRenderer {
    async fn render(&self, url: &str, _timeout_ms: u64) -> Result<String> {
        Err(anyhow::anyhow!("Browser not available, cannot render {url} (HTTP-only mode)"))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Renderer for a run: Chromium when requested and compiled in, else noop.
pub async fn build_renderer(use_headless: bool) -> HarvestResult<Arc<dyn PageRenderer>> {
    if !use_headless {
        return Ok(Arc::new(NoopRenderer));
    }

    #[cfg(feature = "headless")]
    {
        let renderer = chromium::ChromiumRenderer::launch()
            .await
            .map_err(|e| crate::error::HarvestError::Render(format!("{e:#}")))?;
        Ok(Arc::new(renderer))
    }

    #[cfg(not(feature = "headless"))]
    {
        tracing::warn!("⚠️ Headless fallback requested but this build has no `headless` feature; continuing HTTP-only");
        Ok(Arc::new(NoopRenderer))
    }
}
