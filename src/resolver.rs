//! Profile-id resolution over plain HTTP
//!
//! Listing rows link to an intermediate reference page; the real profile id
//! is the trailing segment of an anchor on that page. This is a cheap,
//! browserless fetch, and any failure here means "skip detail extraction",
//! never an error for the pipeline.

use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::{Config, ScrapeError};

const MARKER_SEGMENT: &str = "profil-sekolah";

/// Resolves listing links to profile-page identifiers using a shared,
/// pooled HTTP client.
#[derive(Clone)]
pub struct LinkResolver {
    client: Client,
    retries: usize,
    base: Url,
}

impl LinkResolver {
    pub fn new(config: &Config) -> Result<Self, ScrapeError> {
        let base = Url::parse(&config.listing_base_url).map_err(|e| {
            ScrapeError::ConfigurationError(format!(
                "invalid listing base URL {}: {}",
                config.listing_base_url, e
            ))
        })?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(config.http_pool_size)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            retries: config.http_retries,
            base,
        })
    }

    /// Absolutizes a listing href. The portal emits both absolute links and
    /// site-relative paths; the latter are joined against the listing base.
    fn absolute_link(&self, listing_link: &str) -> Option<Url> {
        let trimmed = listing_link.trim();
        if trimmed.is_empty() {
            return None;
        }
        Url::parse(trimmed).or_else(|_| self.base.join(trimmed)).ok()
    }

    /// Fetches the listing link and extracts the profile id.
    ///
    /// `None` is the NotFound outcome: transport failure after the retry
    /// budget, an HTTP error status, or no matching anchor in the body.
    /// HTTP error statuses are not retried; only transport failures are.
    pub async fn resolve(&self, listing_link: &str) -> Option<String> {
        let Some(url) = self.absolute_link(listing_link) else {
            debug!("Not a resolvable link: {}", listing_link);
            return None;
        };

        for attempt in 0..=self.retries {
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    if !response.status().is_success() {
                        debug!("Resolution of {} got status {}", url, response.status());
                        return None;
                    }
                    let body = response.text().await.ok()?;
                    return parse_profile_id(&body);
                }
                Err(e) => {
                    debug!(
                        "Resolution of {} failed (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        self.retries + 1,
                        e
                    );
                }
            }
        }
        None
    }
}

/// Finds the first anchor whose target path contains the profile marker
/// segment and returns its trailing path segment.
///
/// Sync on purpose: the parsed DOM is not `Send` and must not live across
/// an await point.
pub fn parse_profile_id(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let anchors = Selector::parse("a[href]").ok()?;

    for anchor in document.select(&anchors) {
        let href = anchor.value().attr("href")?;
        if !href.contains(MARKER_SEGMENT) {
            continue;
        }
        let id = href.trim_end_matches('/').rsplit('/').next()?;
        if !id.is_empty() && id != MARKER_SEGMENT {
            return Some(id.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profile_anchor() {
        let body = r#"
            <html><body>
              <a href="/pendidikan/npsn/20320001">NPSN</a>
              <a href="https://sekolah.data.kemendikdasmen.go.id/profil-sekolah/3F9A2C10-1/">Profil</a>
            </body></html>
        "#;
        assert_eq!(parse_profile_id(body), Some("3F9A2C10-1".to_string()));
    }

    #[test]
    fn ignores_pages_without_marker_anchor() {
        let body = r#"<html><body><a href="/other/path">x</a></body></html>"#;
        assert_eq!(parse_profile_id(body), None);
        assert_eq!(parse_profile_id(""), None);
        assert_eq!(parse_profile_id("not html at all"), None);
    }

    #[test]
    fn trailing_slash_does_not_yield_empty_id() {
        let body = r#"<a href="/profil-sekolah/">empty</a>"#;
        assert_eq!(parse_profile_id(body), None);
    }

    #[test]
    fn relative_href_joins_against_listing_base() {
        let resolver = LinkResolver::new(&Config::default()).unwrap();

        // Site-relative hrefs, as rendered in the listing table, must still
        // reach resolution instead of dying at the parse step.
        let joined = resolver.absolute_link("/pendidikan/npsn/20320001").unwrap();
        assert_eq!(joined.host_str(), Some("referensi.data.kemendikdasmen.go.id"));
        assert_eq!(joined.path(), "/pendidikan/npsn/20320001");

        let absolute = resolver
            .absolute_link("https://other.example/ref/1")
            .unwrap();
        assert_eq!(absolute.host_str(), Some("other.example"));
    }

    #[test]
    fn blank_link_is_not_resolvable() {
        let resolver = LinkResolver::new(&Config::default()).unwrap();
        assert!(resolver.absolute_link("").is_none());
        assert!(resolver.absolute_link("   ").is_none());
    }

    #[test]
    fn invalid_base_url_is_a_configuration_error() {
        let config = Config {
            listing_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            LinkResolver::new(&config),
            Err(ScrapeError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_resolves_to_none() {
        let resolver = LinkResolver::new(&Config {
            http_retries: 0,
            ..Default::default()
        })
        .unwrap();
        // Port 1 is essentially never listening; connection is refused fast.
        assert_eq!(resolver.resolve("http://127.0.0.1:1/ref").await, None);
    }
}
