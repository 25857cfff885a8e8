use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ApiFailure, AppError, Service};
use crate::models::{Article, Category, SearchOptions};
use crate::retry::{with_one_retry, RETRY_DELAY};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Minimum number of raw candidates requested before the recency re-sort
const MIN_FETCH: usize = 20;

/// News search backend
#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Articles for `keyword`, newest first, at most `options.max_results`.
    /// An empty vector means the search matched nothing.
    async fn search(
        &self,
        keyword: &str,
        options: &SearchOptions,
    ) -> std::result::Result<Vec<Article>, AppError>;
}

#[derive(Debug, Serialize)]
struct TavilyRequest {
    api_key: String,
    query: String,
    search_depth: String,
    max_results: usize,
    topic: String,
    include_images: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
    country: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TavilyResult {
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    published_date: Option<String>,
    image: Option<String>,
}

pub struct TavilyClient {
    client: Client,
    api_key: String,
    base_url: String,
    domains: Vec<String>,
    retry_delay: Duration,
}

impl TavilyClient {
    pub fn new(api_key: String, domains: Vec<String>) -> Result<Self> {
        Self::with_base_url(api_key, domains, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, domains: Vec<String>, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            domains,
            retry_delay: RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn build_request(&self, keyword: &str, options: &SearchOptions) -> TavilyRequest {
        let include_domains = if options.all_sources || self.domains.is_empty() {
            None
        } else {
            Some(self.domains.clone())
        };

        TavilyRequest {
            api_key: self.api_key.clone(),
            query: build_query(keyword, options.category),
            search_depth: "advanced".to_string(),
            max_results: fetch_size(options.max_results, options.category),
            topic: "news".to_string(),
            include_images: true,
            include_domains,
            days: options.time_range.map(|range| range.days()),
            country: options.language.country().to_string(),
        }
    }

    async fn try_search(&self, request: &TavilyRequest) -> std::result::Result<TavilyResponse, ApiFailure> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(ApiFailure::with_status(
                status.as_u16(),
                format!("Tavily API returned error: {} - {}", status, error_text),
            ));
        }

        Ok(response.json::<TavilyResponse>().await?)
    }
}

#[async_trait]
impl NewsSearch for TavilyClient {
    async fn search(
        &self,
        keyword: &str,
        options: &SearchOptions,
    ) -> std::result::Result<Vec<Article>, AppError> {
        let request = self.build_request(keyword, options);
        tracing::info!(query = %request.query, max_results = request.max_results, "Searching news");

        let response = with_one_retry(Service::Search, self.retry_delay, || self.try_search(&request)).await?;

        let articles = select_articles(response, options);
        tracing::info!(count = articles.len(), "Search returned articles");
        Ok(articles)
    }
}

/// Query text with the category folded in as a prefix
fn build_query(keyword: &str, category: Category) -> String {
    if category.is_filter() {
        format!("[{}] {}", category.label(), keyword)
    } else {
        keyword.to_string()
    }
}

/// Number of raw results to request so the recency re-sort has candidates
fn fetch_size(max_results: usize, category: Category) -> usize {
    let multiplier = if category.is_filter() { 4 } else { 3 };
    max_results.saturating_mul(multiplier).max(MIN_FETCH)
}

/// Parse a published date for ordering. Unparsable dates count as missing.
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Host of `url` without a leading `www.`
fn source_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Blank strings from the API count as absent
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Newest first, truncated to `max_results`, converted to articles
fn select_articles(response: TavilyResponse, options: &SearchOptions) -> Vec<Article> {
    let mut results = response.results;
    // Stable sort keeps API order for ties; missing dates sort last
    results.sort_by(|a, b| {
        let a_date = a.published_date.as_deref().and_then(parse_published);
        let b_date = b.published_date.as_deref().and_then(parse_published);
        b_date.cmp(&a_date)
    });
    results.truncate(options.max_results);

    let category = options
        .category
        .is_filter()
        .then(|| options.category.label().to_string());

    results
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let image_url = non_blank(item.image)
                .or_else(|| non_blank(response.images.get(i).cloned()));
            Article {
                title: item
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| "Untitled".to_string()),
                source: source_of(&item.url),
                url: item.url,
                snippet: item.content,
                pub_date: non_blank(item.published_date),
                image_url,
                category: category.clone(),
            }
        })
        .collect()
}
