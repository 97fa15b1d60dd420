//! Product page extraction through the retrying fetcher
use std::sync::Arc;

use product_harvester::application::DetailExtractor;
use product_harvester::infrastructure::config::NetworkConfig;
use product_harvester::infrastructure::debug_capture::DebugCapture;
use product_harvester::infrastructure::http_client::{FetchStatus, Fetcher, Retrieval};
use product_harvester::infrastructure::renderer::NoopRenderer;
use product_harvester::infrastructure::sites::SiteProfile;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DESK_PAGE: &str = r#"<html><head>
    <meta property="og:image" content="https://img.example.com/desk-og.jpg">
  </head><body>
    <span id="productTitle"> Oak   Study Desk </span>
    <span class="a-icon-alt">4.4 out of 5 stars</span>
    <span class="a-price"><span class="a-offscreen">₹7,499</span></span>
    <table id="productDetails_techSpec_section_1">
      <tr><th>Product Dimensions</th><td>60 x 120 x 75 cm</td></tr>
    </table>
  </body></html>"#;

fn network() -> NetworkConfig {
    NetworkConfig {
        request_delay_ms: 0,
        jitter_min_ms: 0,
        jitter_max_ms: 0,
        backoff_base_ms: 0,
        max_retries: 3,
        timeout_seconds: 5,
        ..NetworkConfig::default()
    }
}

fn setup(server: &MockServer, captures: DebugCapture) -> (DetailExtractor, Fetcher) {
    let profile = SiteProfile::amazon().with_base_url(server.uri());
    let fetcher = Fetcher::for_site(&profile, &network(), captures, Arc::new(NoopRenderer)).unwrap();
    (DetailExtractor::new(&profile).unwrap(), fetcher)
}

#[tokio::test]
async fn extracts_every_field_from_canonical_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dp/B0DESK0001"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DESK_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let (extractor, fetcher) = setup(&server, DebugCapture::disabled());
    let url = format!("{}/Oak-Study-Desk/dp/B0DESK0001/ref=sr_1_4?keywords=desk", server.uri());
    let record = extractor.extract(&fetcher, &url).await.unwrap();

    assert_eq!(record.id, "B0DESK0001");
    assert_eq!(record.url, format!("{}/dp/B0DESK0001", server.uri()));
    assert_eq!(record.name.as_deref(), Some("Oak Study Desk"));
    assert_eq!(record.rating.as_deref(), Some("4.4 out of 5 stars"));
    assert_eq!(record.price.as_deref(), Some("₹7,499"));
    assert_eq!(record.dimensions.as_deref(), Some("60 x 120 x 75 cm"));
    assert_eq!(record.image_url.as_deref(), Some("https://img.example.com/desk-og.jpg"));
}

#[tokio::test]
async fn transient_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dp/B0DESK0001"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dp/B0DESK0001"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DESK_PAGE))
        .mount(&server)
        .await;

    let (extractor, fetcher) = setup(&server, DebugCapture::disabled());
    let record = extractor
        .extract(&fetcher, &format!("{}/dp/B0DESK0001", server.uri()))
        .await
        .unwrap();

    assert_eq!(record.name.as_deref(), Some("Oak Study Desk"));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn persistent_block_gives_up_and_captures_the_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dp/B0BLOCK001"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>Robot Check</html>"))
        .mount(&server)
        .await;

    let debug_dir = TempDir::new().unwrap();
    let captures = DebugCapture::new(Some(debug_dir.path().to_path_buf()), "amazon");
    let (extractor, fetcher) = setup(&server, captures);

    let url = format!("{}/dp/B0BLOCK001", server.uri());
    assert!(extractor.extract(&fetcher, &url).await.is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);

    let capture = std::fs::read_to_string(debug_dir.path().join("amazon_product_B0BLOCK001.html")).unwrap();
    assert!(capture.starts_with(&format!("<!-- URL: {url} -->")));
    assert!(capture.contains("Robot Check"));
}

#[tokio::test]
async fn gave_up_reports_last_status_and_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&server)
        .await;

    let profile = SiteProfile::amazon().with_base_url(server.uri());
    let fetcher = Fetcher::for_site(&profile, &network(), DebugCapture::disabled(), Arc::new(NoopRenderer)).unwrap();

    match fetcher.fetch_with_retry(&format!("{}/dp/B0GONE0001", server.uri()), "k").await {
        Retrieval::GaveUp { last_status, attempts } => {
            assert_eq!(last_status, FetchStatus::Error);
            assert_eq!(attempts, 3);
        }
        Retrieval::Page(outcome) => panic!("expected to give up, got {:?}", outcome.status),
    }
}

#[tokio::test]
async fn unreachable_host_is_an_error_outcome() {
    let profile = SiteProfile::amazon().with_base_url("http://127.0.0.1:9");
    let fetcher = Fetcher::for_site(&profile, &network(), DebugCapture::disabled(), Arc::new(NoopRenderer)).unwrap();

    let outcome = fetcher.fetch("http://127.0.0.1:9/dp/B0NONE0001").await;
    assert_eq!(outcome.status, FetchStatus::Error);
    assert!(outcome.http_status.is_none());
    assert!(outcome.body.is_empty());
}
