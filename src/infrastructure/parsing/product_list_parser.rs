//! Search result page parser
//!
//! Two independent strategies over the same document:
//! - primary: result containers tagged with the product id attribute
//! - anchors: any link whose href matches the site's product id pattern
//!
//! The Link Discoverer decides when to consult the second one.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::config::{LinkStyle, ProductListSelectors};
use super::{ParsingResult, compile_pattern, compile_selectors, resolve_url};
use crate::domain::CandidateLink;

/// Candidates found on one page, per strategy, in document order
#[derive(Debug, Clone, Default)]
pub struct ParsedListPage {
    pub primary: Vec<CandidateLink>,
    pub anchors: Vec<CandidateLink>,
}

impl ParsedListPage {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.anchors.is_empty()
    }
}

pub struct ProductListParser {
    base_url: String,
    containers: Vec<Selector>,
    container_id_attr: String,
    container_links: Vec<Selector>,
    valid_id: Option<Regex>,
    anchors: Vec<Selector>,
    anchor_id: Regex,
    link_style: LinkStyle,
}

impl ProductListParser {
    pub fn new(selectors: &ProductListSelectors, base_url: &str) -> ParsingResult<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            containers: compile_selectors("list container", &selectors.container)?,
            container_id_attr: selectors.container_id_attr.clone(),
            container_links: compile_selectors("list container link", &selectors.container_link)?,
            valid_id: selectors.valid_id_pattern.as_deref().map(compile_pattern).transpose()?,
            anchors: compile_selectors("list anchor", &selectors.anchor)?,
            anchor_id: compile_pattern(&selectors.anchor_id_pattern)?,
            link_style: selectors.link_style.clone(),
        })
    }

    pub fn parse(&self, body: &str) -> ParsedListPage {
        let document = Html::parse_document(body);
        let page = ParsedListPage {
            primary: self.primary_links(&document),
            anchors: self.anchor_links(&document),
        };
        debug!(
            "Parsed result page: {} container ids, {} anchor ids",
            page.primary.len(),
            page.anchors.len()
        );
        page
    }

    fn primary_links(&self, document: &Html) -> Vec<CandidateLink> {
        self.containers
            .iter()
            .flat_map(|selector| document.select(selector))
            .filter_map(|container| self.container_candidate(container))
            .collect()
    }

    /// Href-style containers are keyed by the id in their link when it has
    /// one, so they share the anchor strategy's id namespace.
    fn container_candidate(&self, container: ElementRef<'_>) -> Option<CandidateLink> {
        let tagged = container.value().attr(&self.container_id_attr)?.trim();
        if tagged.is_empty() || !self.is_valid_id(tagged) {
            return None;
        }

        match &self.link_style {
            LinkStyle::Canonical { path_template } => {
                Some(CandidateLink::new(tagged, self.canonical(path_template, tagged)))
            }
            LinkStyle::Href => {
                let href = self
                    .container_links
                    .iter()
                    .flat_map(|selector| container.select(selector))
                    .find_map(|anchor| anchor.value().attr("href"))?;
                let id = self
                    .href_id(href)
                    .filter(|id| self.is_valid_id(id))
                    .unwrap_or(tagged);
                Some(CandidateLink::new(id, resolve_url(&self.base_url, href).ok()?))
            }
        }
    }

    fn href_id<'a>(&self, href: &'a str) -> Option<&'a str> {
        Some(self.anchor_id.captures(href)?.get(1)?.as_str())
    }

    fn anchor_links(&self, document: &Html) -> Vec<CandidateLink> {
        self.anchors
            .iter()
            .flat_map(|selector| document.select(selector))
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?;
                let id = self.href_id(href)?;
                if !self.is_valid_id(id) {
                    return None;
                }
                let url = match &self.link_style {
                    LinkStyle::Canonical { path_template } => self.canonical(path_template, id),
                    LinkStyle::Href => resolve_url(&self.base_url, href).ok()?,
                };
                Some(CandidateLink::new(id, url))
            })
            .collect()
    }

    fn is_valid_id(&self, id: &str) -> bool {
        self.valid_id.as_ref().is_none_or(|pattern| pattern.is_match(id))
    }

    fn canonical(&self, path_template: &str, id: &str) -> String {
        format!("{}{}", self.base_url, path_template.replace("{id}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMAZON_PAGE: &str = r#"
        <html><body>
          <div data-asin="B0ABCDEF12"><h2>Desk one</h2></div>
          <div data-asin=""></div>
          <div data-asin="short"></div>
          <div data-asin="B0ZZZZZZ99"></div>
          <a href="/Some-Chair/dp/B0CHAIR001/ref=sr_1_3?keywords=chair">Chair</a>
          <a href="/help">Help</a>
        </body></html>"#;

    const FLIPKART_PAGE: &str = r#"
        <html><body>
          <div data-id="TBLFX123"><a href="/wooden-table/p/itmabc123?pid=TBLFX123">Table</a></div>
          <div data-id="NOLINK"></div>
          <a href="/another-desk/p/itmxyz789?pid=DSK">Desk</a>
        </body></html>"#;

    #[test]
    fn amazon_containers_build_canonical_urls() {
        let parser = ProductListParser::new(&ProductListSelectors::amazon(), "https://www.amazon.in/").unwrap();
        let page = parser.parse(AMAZON_PAGE);

        let ids: Vec<_> = page.primary.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["B0ABCDEF12", "B0ZZZZZZ99"]);
        assert_eq!(page.primary[0].url, "https://www.amazon.in/dp/B0ABCDEF12");

        assert_eq!(page.anchors.len(), 1);
        assert_eq!(page.anchors[0].id, "B0CHAIR001");
        assert_eq!(page.anchors[0].url, "https://www.amazon.in/dp/B0CHAIR001");
    }

    #[test]
    fn flipkart_containers_use_their_first_link() {
        let parser = ProductListParser::new(&ProductListSelectors::flipkart(), "https://www.flipkart.com").unwrap();
        let page = parser.parse(FLIPKART_PAGE);

        assert_eq!(page.primary.len(), 1);
        assert_eq!(page.primary[0].id, "itmabc123");
        assert_eq!(
            page.primary[0].url,
            "https://www.flipkart.com/wooden-table/p/itmabc123?pid=TBLFX123"
        );

        let anchor_ids: Vec<_> = page.anchors.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(anchor_ids, vec!["itmabc123", "itmxyz789"]);
    }

    #[test]
    fn flipkart_container_without_item_link_keeps_tagged_id() {
        let parser = ProductListParser::new(&ProductListSelectors::flipkart(), "https://www.flipkart.com").unwrap();
        let page = parser.parse(r#"<div data-id="TBLFX999"><a href="/deals/table">Table</a></div>"#);

        assert_eq!(page.primary.len(), 1);
        assert_eq!(page.primary[0].id, "TBLFX999");
        assert_eq!(page.primary[0].url, "https://www.flipkart.com/deals/table");
    }

    #[test]
    fn empty_page_yields_nothing() {
        let parser = ProductListParser::new(&ProductListSelectors::amazon(), "https://www.amazon.in").unwrap();
        assert!(parser.parse("<html><body><p>nothing</p></body></html>").is_empty());
    }
}
