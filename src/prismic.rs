use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::listing::PageSource;
use crate::richtext::RichTextBlock;

/// A page of search results from the CMS document API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<RawDocument>,
    /// URL of the next result page; `null` on the last page.
    #[serde(default)]
    pub next_page: Option<String>,
}

/// A post document as returned by the CMS.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    pub data: RawPostData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPostData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub banner: Option<RawImage>,
    /// Only present when the query fetched the full document.
    #[serde(default)]
    pub content: Option<Vec<RawSection>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSection {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub body: Vec<RichTextBlock>,
}

/// Set the `ref` query parameter on a listing URL, replacing any existing one.
///
/// Used to resolve draft content in preview mode. Cursor URLs returned by the
/// CMS already carry the ref they were issued for and are never rewritten.
pub fn with_ref(url_str: &str, content_ref: &str) -> Result<String> {
    let mut parsed = url::Url::parse(url_str).context("Invalid listing URL")?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "ref")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("ref", content_ref);
    Ok(parsed.to_string())
}

/// Fetches listing pages with plain HTTP GETs against cursor URLs.
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse> {
        tracing::debug!(cursor, "fetching listing page");
        let resp = self
            .client
            .get(cursor)
            .header("Accept", "application/json")
            .send()
            .await
            .context("HTTP request failed")?;

        if !resp.status().is_success() {
            bail!("Failed to fetch listing page: HTTP {}", resp.status());
        }

        let page: SearchResponse = resp.json().await.context("Failed to parse listing JSON")?;
        Ok(page)
    }
}
