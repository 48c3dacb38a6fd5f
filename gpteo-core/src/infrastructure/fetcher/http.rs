// gpteo-core/src/infrastructure/fetcher/http.rs

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, redirect};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

use super::classify::classify;
use super::extract::HtmlExtractor;
use crate::domain::scan::{Page, PageType};
use crate::infrastructure::config::FetchSettings;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::{FetchError, FetchErrorKind, FetchOptions, PageFetcher};

/// reqwest-backed fetcher. Redirects are followed by hand so every hop is
/// recorded and the hop limit is ours.
pub struct HttpPageFetcher {
    client: Client,
    extractor: HtmlExtractor,
    user_agent: String,
    max_redirects: usize,
    max_body_bytes: usize,
    probe_timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, InfrastructureError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            extractor: HtmlExtractor::new()?,
            user_agent: settings.user_agent.clone(),
            max_redirects: settings.max_redirects,
            max_body_bytes: settings.max_body_bytes,
            probe_timeout: settings.probe_timeout(),
        })
    }

    /// Status of each site-level path on the page's origin; 0 when the probe
    /// itself failed.
    async fn probe(&self, base: &Url, paths: &[String]) -> BTreeMap<String, u16> {
        let probes = paths.iter().map(|path| async move {
            let status = match base.join(path) {
                Ok(target) => match self
                    .client
                    .get(target)
                    .timeout(self.probe_timeout)
                    .send()
                    .await
                {
                    Ok(resp) => resp.status().as_u16(),
                    Err(e) => {
                        debug!("Probe {} failed: {}", path, e);
                        0
                    }
                },
                Err(_) => 0,
            };
            (path.clone(), status)
        });
        join_all(probes).await.into_iter().collect()
    }
}

fn kind_of(err: &reqwest::Error) -> FetchErrorKind {
    if err.is_timeout() {
        FetchErrorKind::Timeout
    } else if err.is_builder() {
        FetchErrorKind::InvalidUrl
    } else if err.is_body() || err.is_decode() {
        FetchErrorKind::Body
    } else {
        FetchErrorKind::Connect
    }
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Appends as much of `chunk` as fits under `cap`. Returns true when some
/// of it had to be dropped.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(body.len());
    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
    chunk.len() > room
}

impl HttpPageFetcher {
    async fn fetch_page(&self, url: &Url, options: &FetchOptions) -> Result<Page, FetchError> {
        let start = Instant::now();
        let mut page = Page::new(url.as_str(), Utc::now());

        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::new(
                FetchErrorKind::InvalidUrl,
                format!("unsupported scheme '{}'", url.scheme()),
                page,
            ));
        }

        let mut current = url.clone();
        let mut response = loop {
            let Some(remaining) = options.timeout.checked_sub(start.elapsed()) else {
                return Err(FetchError::new(
                    FetchErrorKind::Timeout,
                    format!("no response within {:?}", options.timeout),
                    page,
                ));
            };

            let response = match self
                .client
                .get(current.clone())
                .timeout(remaining)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => return Err(FetchError::new(kind_of(&e), e.to_string(), page)),
            };

            let location = response
                .status()
                .is_redirection()
                .then(|| response.headers().get(LOCATION))
                .flatten()
                .and_then(|v| v.to_str().ok());
            let Some(location) = location else {
                break response;
            };

            if page.redirect_chain.len() >= self.max_redirects {
                page.status_code = Some(response.status().as_u16());
                return Err(FetchError::new(
                    FetchErrorKind::TooManyRedirects,
                    format!("more than {} redirects", self.max_redirects),
                    page,
                ));
            }
            let next = match current.join(location) {
                Ok(next) => next,
                Err(e) => {
                    return Err(FetchError::new(
                        FetchErrorKind::InvalidUrl,
                        format!("bad redirect target '{}': {}", location, e),
                        page,
                    ));
                }
            };
            page.redirect_chain.push(current.to_string());
            current = next;
        };

        let status = response.status();
        page.final_url = Some(current.to_string());
        page.status_code = Some(status.as_u16());
        page.headers = header_map(response.headers());

        if !status.is_success() {
            page.load_time_ms = Some(elapsed_ms(start));
            return Err(FetchError::new(
                FetchErrorKind::Status(status.as_u16()),
                format!("server answered {}", status),
                page,
            ));
        }

        let mut body: Vec<u8> = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if append_capped(&mut body, &chunk, self.max_body_bytes) {
                        warn!("Body of {} truncated at {} bytes", current, self.max_body_bytes);
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    page.load_time_ms = Some(elapsed_ms(start));
                    return Err(FetchError::new(kind_of(&e), e.to_string(), page));
                }
            }
        }
        page.load_time_ms = Some(elapsed_ms(start));
        page.size_bytes = Some(body.len() as u64);

        let html = String::from_utf8_lossy(&body);
        self.extractor.extract(&html, &current, &mut page);
        page.page_type = classify(&current, &page.json_ld);

        if page.page_type == PageType::Homepage && !options.probe_paths.is_empty() {
            page.resources = self.probe(&current, &options.probe_paths).await;
        }

        debug!(
            status = status.as_u16(),
            ms = page.load_time_ms,
            bytes = page.size_bytes,
            page_type = %page.page_type,
            "Fetched page"
        );
        Ok(page)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<Page, FetchError> {
        self.fetch_page(url, options).await.map_err(|mut e| {
            // No usable body: type the page from its URL alone.
            let target = e
                .page
                .final_url
                .as_deref()
                .and_then(|u| Url::parse(u).ok())
                .unwrap_or_else(|| url.clone());
            e.page.page_type = classify(&target, &[]);
            e
        })
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::Router;
    use axum::http::{StatusCode, header};
    use axum::response::{IntoResponse, Redirect};
    use axum::routing::get;

    const HOME: &str = r#"<html><head><title>Acme</title>
<script type="application/ld+json">{"@type": "Organization", "name": "Acme"}</script>
</head><body><h1>Welcome</h1><a href="/pages/returns">Returns</a></body></html>"#;

    const PRODUCT: &str = r#"<html><head><title>Mug</title>
<script type="application/ld+json">{"@type": "Product", "name": "Mug"}</script>
</head><body><h1>Mug</h1></body></html>"#;

    async fn serve() -> Result<Url> {
        let app = Router::new()
            .route("/", get(|| async { ([(header::CONTENT_TYPE, "text/html")], HOME) }))
            .route("/robots.txt", get(|| async { "User-agent: *" }))
            .route("/item", get(|| async { Redirect::permanent("/items/mug") }))
            .route("/items/mug", get(|| async { ([(header::CONTENT_TYPE, "text/html")], PRODUCT) }))
            .route("/loop", get(|| async { Redirect::temporary("/loop") }))
            .route(
                "/gone",
                get(|| async { (StatusCode::NOT_FOUND, [("x-robots-tag", "noindex")], "gone").into_response() }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    "late"
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Url::parse(&format!("http://{}/", addr))?)
    }

    fn fetcher() -> HttpPageFetcher {
        HttpPageFetcher::new(&FetchSettings::default()).unwrap()
    }

    fn options() -> FetchOptions {
        FetchOptions::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_homepage_is_extracted_and_probed() -> Result<()> {
        let base = serve().await?;
        let opts = options().with_probes(vec!["/robots.txt".into(), "/ai-feed.json".into()]);
        let page = fetcher().fetch(&base, &opts).await?;

        assert_eq!(page.status_code, Some(200));
        assert_eq!(page.page_type, PageType::Homepage);
        assert_eq!(page.meta("title"), Some("Acme"));
        assert_eq!(page.h1, vec!["Welcome".to_string()]);
        assert_eq!(page.links, vec![base.join("/pages/returns")?.to_string()]);
        assert_eq!(page.resources.get("/robots.txt"), Some(&200));
        assert_eq!(page.resources.get("/ai-feed.json"), Some(&404));
        assert!(page.size_bytes.unwrap() > 0);
        assert!(page.load_time_ms.is_some());
        assert!(page.headers.contains_key("content-type"));
        Ok(())
    }

    #[tokio::test]
    async fn test_redirects_are_recorded() -> Result<()> {
        let base = serve().await?;
        let start = base.join("/item")?;
        let page = fetcher().fetch(&start, &options()).await?;

        assert_eq!(page.url, start.to_string());
        assert_eq!(page.redirect_chain, vec![start.to_string()]);
        assert_eq!(page.final_url, Some(base.join("/items/mug")?.to_string()));
        assert_eq!(page.page_type, PageType::Product);
        assert!(page.resources.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_redirect_loop_is_bounded() -> Result<()> {
        let base = serve().await?;
        let err = fetcher()
            .fetch(&base.join("/loop")?, &options())
            .await
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::TooManyRedirects);
        assert_eq!(err.page.redirect_chain.len(), FetchSettings::default().max_redirects);
        Ok(())
    }

    #[tokio::test]
    async fn test_error_status_keeps_headers() -> Result<()> {
        let base = serve().await?;
        let err = fetcher()
            .fetch(&base.join("/gone")?, &options())
            .await
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Status(404));

        let page = err.into_page();
        assert_eq!(page.status_code, Some(404));
        assert_eq!(page.header("x-robots-tag"), Some("noindex"));
        assert!(page.fetch_error.unwrap().starts_with("HTTP 404"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_pages_are_typed_from_url() -> Result<()> {
        let base = serve().await?;

        let err = fetcher()
            .fetch(&base.join("/products/gone")?, &options())
            .await
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Status(404));
        assert_eq!(err.page.page_type, PageType::Product);

        let err = fetcher()
            .fetch(&base.join("/pages/shipping-info/missing")?, &options())
            .await
            .unwrap_err();
        assert_eq!(err.page.page_type, PageType::Policy);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_root_is_homepage() -> Result<()> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let url = Url::parse(&format!("http://{}/", addr))?;
        let err = fetcher().fetch(&url, &options()).await.unwrap_err();
        assert_eq!(err.page.page_type, PageType::Homepage);
        Ok(())
    }

    #[test]
    fn test_body_cap() {
        let mut body = Vec::new();
        assert!(!append_capped(&mut body, b"abcd", 8));
        // Exactly filling the cap drops nothing.
        assert!(!append_capped(&mut body, b"efgh", 8));
        assert_eq!(body, b"abcdefgh");
        assert!(!append_capped(&mut body, b"", 8));
        assert!(append_capped(&mut body, b"i", 8));
        assert_eq!(body.len(), 8);

        let mut body = Vec::new();
        assert!(append_capped(&mut body, b"0123456789", 4));
        assert_eq!(body, b"0123");
    }

    #[tokio::test]
    async fn test_timeout() -> Result<()> {
        let base = serve().await?;
        let opts = FetchOptions::new(Duration::from_millis(200));
        let err = fetcher()
            .fetch(&base.join("/slow")?, &opts)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Timeout);
        Ok(())
    }

    #[tokio::test]
    async fn test_connection_refused() -> Result<()> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let url = Url::parse(&format!("http://{}/", addr))?;
        let err = fetcher().fetch(&url, &options()).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Connect);
        assert!(err.page.status_code.is_none());
        Ok(())
    }
}
