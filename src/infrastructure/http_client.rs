//! HTTP fetching with response classification and retry
//!
//! `HttpSession` owns the reqwest clients (one per proxy), the default
//! headers and the current User-Agent. `Fetcher` layers classification,
//! exponential retry, the headless fallback and debug captures on top.
//! Nothing here returns an error for a bad page: failures become a
//! `FetchStatus::Error` outcome or a `Retrieval::GaveUp`.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder, Proxy};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{HarvestError, HarvestResult};
use crate::infrastructure::config::NetworkConfig;
use crate::infrastructure::debug_capture::DebugCapture;
use crate::infrastructure::renderer::PageRenderer;
use crate::infrastructure::retry_calculator::RetryCalculator;
use crate::infrastructure::sites::SiteProfile;

/// How a response was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Ok,
    Blocked,
    NoResults,
    Error,
}

impl FetchStatus {
    /// Blocked and Error are worth retrying; Ok and NoResults are final.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Blocked | Self::Error)
    }
}

/// One classified response
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: FetchStatus,
    pub body: String,
    /// `None` for transport failures and rendered pages
    pub http_status: Option<u16>,
    /// Whether the body came from the headless renderer
    pub rendered: bool,
}

impl FetchOutcome {
    fn transport_failure() -> Self {
        Self {
            status: FetchStatus::Error,
            body: String::new(),
            http_status: None,
            rendered: false,
        }
    }
}

/// Result of `fetch_with_retry`
#[derive(Debug, Clone)]
pub enum Retrieval {
    /// A usable page (`Ok` or `NoResults`)
    Page(FetchOutcome),
    /// Every attempt was blocked or failed
    GaveUp { last_status: FetchStatus, attempts: u32 },
}

/// Transport-level failures
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Reading body of {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Block / no-results detection from a site's phrase sets
#[derive(Debug, Clone)]
pub struct PageClassifier {
    block_phrases: Vec<String>,
    no_results_phrases: Vec<String>,
}

impl PageClassifier {
    pub fn new(block_phrases: &[String], no_results_phrases: &[String]) -> Self {
        Self {
            block_phrases: block_phrases.iter().map(|p| p.to_lowercase()).collect(),
            no_results_phrases: no_results_phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn from_profile(profile: &SiteProfile) -> Self {
        Self::new(&profile.block_phrases, &profile.no_results_phrases)
    }

    /// Block phrases win over no-results phrases, which win over the status code.
    pub fn classify(&self, http_status: Option<u16>, body: &str) -> FetchStatus {
        let lowered = body.to_lowercase();
        if self.block_phrases.iter().any(|p| lowered.contains(p.as_str())) {
            return FetchStatus::Blocked;
        }
        if self.no_results_phrases.iter().any(|p| lowered.contains(p.as_str())) {
            return FetchStatus::NoResults;
        }
        match http_status {
            Some(code) if (200..300).contains(&code) => FetchStatus::Ok,
            Some(_) => FetchStatus::Error,
            None => FetchStatus::Ok,
        }
    }
}

/// Per-site HTTP session: cookie-keeping clients, headers and User-Agent
pub struct HttpSession {
    /// Direct client when no proxies are configured, else one per proxy
    clients: Vec<Client>,
    user_agents: Vec<String>,
    current_user_agent: usize,
}

impl HttpSession {
    pub fn new(network: &NetworkConfig) -> HarvestResult<Self> {
        let headers = build_headers(network)?;

        let clients = if network.proxies.is_empty() {
            vec![build_client(network, headers, None)?]
        } else {
            network
                .proxies
                .iter()
                .map(|proxy| build_client(network, headers.clone(), Some(proxy)))
                .collect::<HarvestResult<Vec<_>>>()?
        };

        let user_agents: Vec<String> = network
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .cloned()
            .collect();
        if user_agents.is_empty() {
            return Err(HarvestError::config("no usable User-Agent configured"));
        }

        Ok(Self {
            clients,
            user_agents,
            current_user_agent: 0,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agents[self.current_user_agent]
    }

    /// Switch to a different User-Agent from the pool, chosen at random.
    pub fn rotate_user_agent(&mut self) {
        if self.user_agents.len() < 2 {
            return;
        }
        let offset = fastrand::usize(1..self.user_agents.len());
        self.current_user_agent = (self.current_user_agent + offset) % self.user_agents.len();
        debug!("🔄 Rotated User-Agent to: {}", self.user_agent());
    }

    /// One GET through a randomly chosen proxy client.
    pub async fn get(&self, url: &str) -> Result<(u16, String), FetchError> {
        let client = &self.clients[fastrand::usize(..self.clients.len())];

        let response = client
            .get(url)
            .header(USER_AGENT, self.user_agent())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
        Ok((status, body))
    }
}

fn build_headers(network: &NetworkConfig) -> HarvestResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &network.extra_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HarvestError::config(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HarvestError::config(format!("invalid value for header {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn build_client(network: &NetworkConfig, headers: HeaderMap, proxy: Option<&String>) -> HarvestResult<Client> {
    let mut builder = ClientBuilder::new()
        .timeout(network.timeout())
        .default_headers(headers)
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::limited(10));

    if let Some(proxy) = proxy {
        let proxy = Proxy::all(proxy.as_str())
            .map_err(|e| HarvestError::config(format!("invalid proxy {proxy:?}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| HarvestError::HttpClient(e.to_string()))
}

/// Classifying fetcher for one site
pub struct Fetcher {
    session: HttpSession,
    classifier: PageClassifier,
    retry: RetryCalculator,
    renderer: Arc<dyn PageRenderer>,
    captures: DebugCapture,
    use_headless_fallback: bool,
    headless_timeout_ms: u64,
}

impl Fetcher {
    pub fn new(
        session: HttpSession,
        classifier: PageClassifier,
        retry: RetryCalculator,
        renderer: Arc<dyn PageRenderer>,
        captures: DebugCapture,
        network: &NetworkConfig,
    ) -> Self {
        Self {
            session,
            classifier,
            retry,
            use_headless_fallback: network.use_headless_fallback && renderer.is_available(),
            renderer,
            captures,
            headless_timeout_ms: network.headless_timeout_ms,
        }
    }

    /// Fetcher for a site profile with the given renderer.
    pub fn for_site(
        profile: &SiteProfile,
        network: &NetworkConfig,
        captures: DebugCapture,
        renderer: Arc<dyn PageRenderer>,
    ) -> HarvestResult<Self> {
        Ok(Self::new(
            HttpSession::new(network)?,
            PageClassifier::from_profile(profile),
            RetryCalculator::from_network_config(network),
            renderer,
            captures,
            network,
        ))
    }

    pub fn headless_enabled(&self) -> bool {
        self.use_headless_fallback
    }

    pub fn retry(&self) -> &RetryCalculator {
        &self.retry
    }

    pub fn rotate_user_agent(&mut self) {
        self.session.rotate_user_agent();
    }

    pub async fn capture(&self, key: &str, url: &str, body: &str) {
        self.captures.save(key, url, body).await;
    }

    /// Single request, classified. Transport failures become `Error`.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        debug!("🌐 HTTP GET: {}", url);
        match self.session.get(url).await {
            Ok((code, body)) => {
                let status = self.classifier.classify(Some(code), &body);
                debug!("{} → {} ({:?}, {} bytes)", url, code, status, body.len());
                FetchOutcome {
                    status,
                    body,
                    http_status: Some(code),
                    rendered: false,
                }
            }
            Err(e) => {
                warn!("⚠️ {}", e);
                FetchOutcome::transport_failure()
            }
        }
    }

    /// Headless fetch of the same URL; `None` when unavailable or failed.
    pub async fn render(&self, url: &str) -> Option<FetchOutcome> {
        if !self.use_headless_fallback {
            return None;
        }
        info!("🖥️ Attempting headless render for {}", url);
        match self.renderer.render(url, self.headless_timeout_ms).await {
            Ok(body) => Some(FetchOutcome {
                status: self.classifier.classify(None, &body),
                body,
                http_status: None,
                rendered: true,
            }),
            Err(e) => {
                warn!("⚠️ Headless render failed for {}: {:#}", url, e);
                None
            }
        }
    }

    /// Fetch with exponential backoff; the headless fallback is tried once,
    /// at the first blocked or failed attempt.
    pub async fn fetch_with_retry(&self, url: &str, capture_key: &str) -> Retrieval {
        let mut last_status = FetchStatus::Error;
        let mut headless_tried = false;
        let max_attempts = self.retry.max_retries().max(1);

        for attempt in 1..=max_attempts {
            let outcome = self.fetch(url).await;
            if !outcome.status.is_retryable() {
                return Retrieval::Page(outcome);
            }

            warn!(
                "⚠️ {:?} on attempt {}/{} for {} (status {:?})",
                outcome.status, attempt, max_attempts, url, outcome.http_status
            );
            self.captures.save(capture_key, url, &outcome.body).await;
            last_status = outcome.status;

            if !headless_tried && self.use_headless_fallback {
                headless_tried = true;
                if let Some(rendered) = self.render(url).await {
                    if !rendered.status.is_retryable() {
                        return Retrieval::Page(rendered);
                    }
                    last_status = rendered.status;
                }
            }

            if self.retry.should_retry(attempt) {
                sleep(self.retry.calculate_delay(attempt)).await;
            }
        }

        warn!("❌ Giving up on {} after {} attempts", url, max_attempts);
        Retrieval::GaveUp {
            last_status,
            attempts: max_attempts,
        }
    }
}
