//! Chromium-based renderer using chromiumoxide.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use super::PageRenderer;

/// Environment variable pointing at a specific Chrome/Chromium binary
const CHROMIUM_PATH_ENV: &str = "HARVESTER_CHROMIUM_PATH";

pub struct ChromiumRenderer {
    browser: Browser,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn launch() -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");

        if let Some(path) = std::env::var_os(CHROMIUM_PATH_ENV).map(PathBuf::from) {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Chromium handler event error: {}", e);
                }
            }
        });

        info!("🖥️ Headless Chromium launched");
        Ok(Self { browser })
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &str, timeout_ms: u64) -> Result<String> {
        let budget = Duration::from_millis(timeout_ms);
        let page = tokio::time::timeout(budget, self.browser.new_page("about:blank"))
            .await
            .map_err(|_| anyhow!("opening a tab for {url} timed out after {timeout_ms}ms"))?
            .context("failed to open page")?;

        let load = async {
            page.goto(url).await.context("navigation failed")?;
            page.wait_for_navigation().await.context("navigation failed")?;
            page.content().await.context("failed to read page content")
        };
        let result = tokio::time::timeout(budget, load).await;

        // The tab is closed on every path, timed out or not.
        if let Err(e) = page.close().await {
            debug!("Failed to close page for {}: {}", url, e);
        }

        match result {
            Ok(html) => html,
            Err(_) => bail!("navigation to {url} timed out after {timeout_ms}ms"),
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}
