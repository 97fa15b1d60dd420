//! Best-effort HTML captures of blocked and failed pages
//!
//! Written to `<debug_dir>/<site>_<key>.html` with the URL as a leading
//! HTML comment. A failed write is logged and otherwise ignored.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct DebugCapture {
    dir: Option<PathBuf>,
    site: String,
}

impl DebugCapture {
    pub fn new(dir: Option<PathBuf>, site: impl Into<String>) -> Self {
        Self {
            dir,
            site: site.into(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, "")
    }

    /// File a capture with this key would be written to.
    pub fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}_{}.html", self.site, sanitize_key(key))))
    }

    pub async fn save(&self, key: &str, url: &str, body: &str) {
        let Some(path) = self.path_for(key) else {
            return;
        };

        match write_capture(&path, url, body).await {
            Ok(()) => debug!("🧪 Saved debug HTML → {}", path.display()),
            Err(e) => warn!("Failed to save debug capture {}: {}", path.display(), e),
        }
    }
}

async fn write_capture(path: &Path, url: &str, body: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = format!("<!-- URL: {} -->\n{}", url.replace("--", "%2D%2D"), body);
    tokio::fs::write(path, content).await
}

/// Keep keys safe as file names.
fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "unknown".to_string() } else { cleaned }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn capture_starts_with_url_comment() {
        let dir = TempDir::new().unwrap();
        let capture = DebugCapture::new(Some(dir.path().to_path_buf()), "amazon");

        capture
            .save("product_B0TEST0001", "https://www.amazon.in/dp/B0TEST0001", "<html>blocked</html>")
            .await;

        let content = std::fs::read_to_string(dir.path().join("amazon_product_B0TEST0001.html")).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("<!-- URL: https://www.amazon.in/dp/B0TEST0001 -->"));
        assert_eq!(lines.next(), Some("<html>blocked</html>"));
    }

    #[test]
    fn keys_are_sanitized() {
        let capture = DebugCapture::new(Some(PathBuf::from("debug")), "flipkart");
        assert_eq!(
            capture.path_for("search study table/page 1").unwrap(),
            PathBuf::from("debug/flipkart_search_study_table_page_1.html")
        );
        assert!(DebugCapture::disabled().path_for("x").is_none());
    }

    #[tokio::test]
    async fn unwritable_directory_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let capture = DebugCapture::new(Some(blocker.join("sub")), "amazon");
        capture.save("k", "https://example.com", "body").await;
    }
}
