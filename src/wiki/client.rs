use crate::cache::ArticleCache;
use crate::config::WikipediaConfig;
use crate::error::{Result, WikitreeError};
use crate::wiki::disambiguation::{choose_alternative, links_in_page_order};
use crate::wiki::sections::strip_excluded_sections;
use crate::wiki::{Article, TextRetriever};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Response envelope from the MediaWiki Action API (`formatversion=2`)
#[derive(Deserialize)]
struct QueryResponse {
    query: Option<QueryBody>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

#[derive(Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    extract: Option<String>,
    pageprops: Option<PageProps>,
}

#[derive(Deserialize)]
struct PageProps {
    disambiguation: Option<serde_json::Value>,
}

/// Response envelope for `action=parse`
#[derive(Deserialize)]
struct ParseResponse {
    parse: Option<ParsedPage>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ParsedPage {
    #[serde(default)]
    wikitext: String,
}

/// What a single title lookup produced
#[derive(Debug, PartialEq)]
enum Lookup {
    Missing,
    Article(Article),
    /// Canonical title of a disambiguation page
    Disambiguation(String),
}

fn api_error(error: ApiError) -> WikitreeError {
    WikitreeError::Retrieval(format!("Wikipedia API error {}: {}", error.code, error.info))
}

fn first_page(response: QueryResponse) -> Result<Option<Page>> {
    if let Some(error) = response.error {
        return Err(api_error(error));
    }
    Ok(response.query.and_then(|q| q.pages.into_iter().next()))
}

fn parse_lookup(response: QueryResponse) -> Result<Lookup> {
    let Some(page) = first_page(response)? else {
        return Ok(Lookup::Missing);
    };
    if page.missing || page.invalid {
        return Ok(Lookup::Missing);
    }
    if page
        .pageprops
        .as_ref()
        .is_some_and(|p| p.disambiguation.is_some())
    {
        return Ok(Lookup::Disambiguation(page.title));
    }

    let body = strip_excluded_sections(page.extract.as_deref().unwrap_or(""));
    Ok(Lookup::Article(Article {
        title: page.title,
        body,
    }))
}

/// Article links of a disambiguation page, in the order the page lists them.
fn parse_links(response: ParseResponse) -> Result<Vec<String>> {
    if let Some(error) = response.error {
        return Err(api_error(error));
    }
    Ok(response
        .parse
        .map(|page| links_in_page_order(&page.wikitext))
        .unwrap_or_default())
}

/// Wikipedia client
///
/// Resolves titles through redirects and disambiguation pages and returns
/// cleaned plaintext. Transient HTTP failures are retried with exponential backoff.
pub struct WikipediaClient {
    client: Client,
    api_url: String,
    max_retries: usize,
    cache: Option<Arc<ArticleCache>>,
}

impl WikipediaClient {
    pub fn new(config: &WikipediaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| WikitreeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let cache = if config.cache_capacity > 0 {
            Some(Arc::new(ArticleCache::new(config.cache_capacity)))
        } else {
            None
        };

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            max_retries: config.max_retries,
            cache,
        })
    }

    pub fn cache(&self) -> Option<&Arc<ArticleCache>> {
        self.cache.as_ref()
    }

    /// Single API request
    async fn call<T: DeserializeOwned>(&self, action: &str, params: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("action", action), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(|e| WikitreeError::RetrievalUnavailable(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            let message = format!("Wikipedia API error {}: {}", status, body);
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                WikitreeError::RetrievalUnavailable(message)
            } else {
                WikitreeError::Retrieval(message)
            });
        }

        response
            .json()
            .await
            .map_err(|e| WikitreeError::Retrieval(format!("Failed to parse response: {}", e)))
    }

    async fn call_with_retry<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let mut attempt = 0;
        let mut delay = Duration::from_millis(500);

        loop {
            match self.call(action, params).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    log::warn!("Retry {}/{} after error: {}", attempt + 1, self.max_retries, e);
                    tokio::time::sleep(delay).await;
                    delay *= 2; // Exponential backoff
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn lookup(&self, title: &str) -> Result<Lookup> {
        let response = self
            .call_with_retry(
                "query",
                &[
                    ("prop", "extracts|pageprops"),
                    ("explaintext", "1"),
                    ("exsectionformat", "wiki"),
                    ("ppprop", "disambiguation"),
                    ("redirects", "1"),
                    ("titles", title),
                ],
            )
            .await?;
        parse_lookup(response)
    }

    async fn disambiguation_links(&self, title: &str) -> Result<Vec<String>> {
        // prop=links comes back sorted by title; the page's own order needs the wikitext.
        let response = self
            .call_with_retry(
                "parse",
                &[("prop", "wikitext"), ("redirects", "1"), ("page", title)],
            )
            .await?;
        parse_links(response)
    }

    fn remember(&self, key: &str, article: Option<&Article>) {
        if let Some(cache) = &self.cache {
            cache.put(key.to_string(), article.cloned());
            if let Some(article) = article {
                if article.title != key {
                    cache.put(article.title.clone(), Some(article.clone()));
                }
            }
        }
    }
}

impl TextRetriever for WikipediaClient {
    async fn fetch_article(&self, title: &str, hint: Option<&str>) -> Result<Option<Article>> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(title)) {
            log::debug!("Cache hit for title: {}", title);
            return Ok(cached);
        }

        log::debug!("Fetching: {}", title);
        match self.lookup(title).await? {
            Lookup::Missing => {
                self.remember(title, None);
                Ok(None)
            }
            Lookup::Article(article) => {
                self.remember(title, Some(&article));
                Ok(Some(article))
            }
            Lookup::Disambiguation(page) => {
                let alternatives = self.disambiguation_links(&page).await?;
                let Some(choice) = choose_alternative(&alternatives, hint) else {
                    log::debug!("No usable alternative on disambiguation page {}", page);
                    return Ok(None);
                };
                log::info!("Disambiguating {} to {}", title, choice);

                // Disambiguated results depend on the hint, so only the target is cached.
                match self.lookup(choice).await? {
                    Lookup::Article(article) => {
                        self.remember(&article.title.clone(), Some(&article));
                        Ok(Some(article))
                    }
                    _ => Ok(None),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> QueryResponse {
        serde_json::from_str(json).unwrap()
    }

    fn offline_client(cache_capacity: usize) -> WikipediaClient {
        let config = WikipediaConfig {
            api_url: "http://127.0.0.1:9/w/api.php".to_string(),
            cache_capacity,
            max_retries: 0,
            ..WikipediaConfig::default()
        };
        WikipediaClient::new(&config).unwrap()
    }

    #[test]
    fn test_parse_article_strips_sections() {
        let json = r#"{"batchcomplete":true,"query":{"redirects":[{"from":"Lennon","to":"John Lennon"}],
            "pages":[{"pageid":15865,"ns":0,"title":"John Lennon",
            "extract":"John Lennon was an English singer.\n\n== See also ==\nList"}]}}"#;
        let lookup = parse_lookup(parse(json)).unwrap();
        assert_eq!(
            lookup,
            Lookup::Article(Article {
                title: "John Lennon".to_string(),
                body: "John Lennon was an English singer.".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_missing_and_invalid() {
        let missing = r#"{"query":{"pages":[{"ns":0,"title":"Qwzx","missing":true}]}}"#;
        assert_eq!(parse_lookup(parse(missing)).unwrap(), Lookup::Missing);

        let invalid = r#"{"query":{"pages":[{"title":"<>","invalidreason":"bad","invalid":true}]}}"#;
        assert_eq!(parse_lookup(parse(invalid)).unwrap(), Lookup::Missing);

        assert_eq!(parse_lookup(parse(r#"{"batchcomplete":true}"#)).unwrap(), Lookup::Missing);
    }

    #[test]
    fn test_parse_disambiguation() {
        let json = r#"{"query":{"pages":[{"pageid":1,"ns":0,"title":"George Harrison (disambiguation)",
            "extract":"George Harrison may refer to:","pageprops":{"disambiguation":""}}]}}"#;
        assert_eq!(
            parse_lookup(parse(json)).unwrap(),
            Lookup::Disambiguation("George Harrison (disambiguation)".to_string())
        );
    }

    #[test]
    fn test_parse_api_error() {
        let json = r#"{"error":{"code":"toomanyvalues","info":"Too many values supplied"}}"#;
        let err = parse_lookup(parse(json)).unwrap_err();
        assert!(matches!(err, WikitreeError::Retrieval(_)));
        assert!(err.to_string().contains("toomanyvalues"));
    }

    #[test]
    fn test_parse_links_keeps_page_order() {
        let json = r#"{"parse":{"title":"Harrison","pageid":1,"wikitext":
            "Harrison may refer to:\n* [[Harrison Ford]], actor\n* [[George Harrison|George]], musician\n* [[Benjamin Harrison]]\n== See also ==\n* [[Alfred Harrison]]"}}"#;
        let response: ParseResponse = serde_json::from_str(json).unwrap();
        let links = parse_links(response).unwrap();
        assert_eq!(links, vec!["Harrison Ford", "George Harrison", "Benjamin Harrison"]);
        assert_eq!(choose_alternative(&links, None), Some("Harrison Ford"));
    }

    #[test]
    fn test_parse_links_api_error() {
        let json = r#"{"error":{"code":"missingtitle","info":"The page you specified doesn't exist."}}"#;
        let response: ParseResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(parse_links(response), Err(WikitreeError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_empty_title_short_circuits() {
        let client = offline_client(0);
        assert_eq!(client.fetch_article("   ", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cached_lookup_skips_network() {
        let client = offline_client(8);
        let article = Article {
            title: "Yoko Ono".to_string(),
            body: "Yoko Ono is a Japanese artist.".to_string(),
        };
        client.remember("Ono", Some(&article));

        let fetched = client.fetch_article("Ono", None).await.unwrap();
        assert_eq!(fetched, Some(article.clone()));
        let by_title = client.fetch_article("Yoko Ono", None).await.unwrap();
        assert_eq!(by_title, Some(article));

        client.remember("Nobody", None);
        assert_eq!(client.fetch_article("Nobody", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transient() {
        let client = offline_client(0);
        let err = client.fetch_article("John Lennon", None).await.unwrap_err();
        assert!(err.is_transient());
    }
}
