//! End-to-end harvest of one query against a mock storefront
use std::sync::Arc;

use product_harvester::application::{HarvestPipeline, rebuild};
use product_harvester::domain::{NormalizedProductRecord, SearchQuery};
use product_harvester::infrastructure::config::AppConfig;
use product_harvester::infrastructure::renderer::NoopRenderer;
use product_harvester::infrastructure::sites::{Site, SiteProfile};
use product_harvester::infrastructure::storage::read_query_file;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn product_page(name: Option<&str>, rating: Option<&str>, price: &str, dims: &str) -> String {
    let title = name.map(|n| format!(r#"<span id="productTitle">{n}</span>"#)).unwrap_or_default();
    let rating = rating.map(|r| format!(r#"<span class="a-icon-alt">{r}</span>"#)).unwrap_or_default();
    format!(
        r#"<html><body>{title}{rating}
        <span class="a-price"><span class="a-offscreen">{price}</span></span>
        <table id="productDetails_techSpec_section_1"><tr><th>Product Dimensions</th><td>{dims}</td></tr></table>
        </body></html>"#
    )
}

async fn mount(server: &MockServer, url_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn config(output: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.network.request_delay_ms = 0;
    config.network.jitter_min_ms = 0;
    config.network.jitter_max_ms = 0;
    config.network.backoff_base_ms = 0;
    config.paths.output_dir = output.path().to_path_buf();
    config.paths.debug_dir = None;
    config
}

#[tokio::test]
async fn harvest_filters_dedupes_saves_and_aggregates() {
    let server = MockServer::start().await;

    let ids = ["B0AAAAAAA1", "B0AAAAAAA2", "B0AAAAAAA3", "B0AAAAAAA4", "B0AAAAAAA5"];
    let listing: String = ids.iter().map(|id| format!(r#"<div data-asin="{id}"></div>"#)).collect();
    Mock::given(method("GET"))
        .and(path("/s"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("<html><body>{listing}</body></html>")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/s"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>did not match any products</html>"))
        .mount(&server)
        .await;

    mount(&server, "/dp/B0AAAAAAA1", product_page(Some("Oak Desk"), Some("4.5 out of 5 stars"), "₹5,000", "60 x 120 cm")).await;
    mount(&server, "/dp/B0AAAAAAA2", product_page(Some("Oak  desk!"), Some("4.6 out of 5 stars"), "₹4,800", "60 x 120 cm")).await;
    mount(&server, "/dp/B0AAAAAAA3", product_page(Some("Wobbly Desk"), Some("2.0 out of 5 stars"), "₹900", "40 x 40 cm")).await;
    mount(&server, "/dp/B0AAAAAAA4", product_page(None, Some("4.9 out of 5 stars"), "₹1,000", "1 x 1 cm")).await;
    mount(&server, "/dp/B0AAAAAAA5", product_page(Some("Pine Desk"), None, "₹3,250.75", "50 x 100 cm")).await;

    let output = TempDir::new().unwrap();
    let config = config(&output);
    let profile = SiteProfile::amazon().with_base_url(server.uri());
    let mut pipeline = HarvestPipeline::new(profile, &config, Arc::new(NoopRenderer)).unwrap();

    let report = pipeline
        .run(&[SearchQuery::new("Study Table", 10, 3.0)])
        .await
        .unwrap();
    let query = &report.queries[0];

    assert_eq!(query.links_found, 5);
    assert_eq!(query.extracted, 5);
    assert_eq!(query.rejected, 1);
    assert_eq!(query.filtered_by_rating, 1);
    assert_eq!(query.duplicates_removed, 1);
    assert_eq!(query.saved, 2);

    let saved_path = output.path().join("amazon_study_table.json");
    assert_eq!(query.output.as_deref(), Some(saved_path.as_path()));

    let saved: Vec<NormalizedProductRecord> = read_query_file(&saved_path).unwrap();
    assert_eq!(saved[0].id, "B0AAAAAAA1");
    assert_eq!(saved[0].price, Some(5000));
    assert_eq!(saved[0].rating, Some(4.5));
    assert_eq!(saved[1].name, "Pine Desk");
    assert_eq!(saved[1].price, Some(3250));
    assert_eq!(saved[1].rating, None);

    let aggregation = rebuild(output.path(), Site::Amazon).unwrap();
    assert_eq!(aggregation.entries, 2);
    let combined = std::fs::read_to_string(&aggregation.paths.json).unwrap();
    assert!(combined.contains("\"ID\": \"A-0001\""));
    assert!(combined.contains("\"SubType\": \"study_table\""));
    assert!(combined.contains("\"Type\": \"Table\""));
}

#[tokio::test]
async fn query_without_products_is_reported_not_saved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>No results for gold sofa</html>"))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let profile = SiteProfile::amazon().with_base_url(server.uri());
    let mut pipeline = HarvestPipeline::new(profile, &config(&output), Arc::new(NoopRenderer)).unwrap();

    let report = pipeline
        .run(&[SearchQuery::new("gold sofa", 10, 0.0)])
        .await
        .unwrap();

    assert_eq!(report.empty_queries(), vec!["gold sofa"]);
    assert!(report.queries[0].output.is_none());
    assert!(!output.path().join("amazon_gold_sofa.json").exists());
}

#[tokio::test]
async fn invalid_configuration_fails_before_any_request() {
    let output = TempDir::new().unwrap();
    let mut config = config(&output);
    config.network.max_retries = 0;

    let result = HarvestPipeline::new(SiteProfile::amazon(), &config, Arc::new(NoopRenderer));
    assert!(result.err().unwrap().is_configuration());
}
