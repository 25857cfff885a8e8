use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ApiFailure, AppError, Service};
use crate::models::{Article, Language};
use crate::retry::{with_one_retry, RETRY_DELAY};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Returned instead of calling the model when there is nothing to summarize
pub const NO_ARTICLES_SUMMARY: &str = "There are no articles to summarize.";

/// Language-model operations used by a search cycle
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Bullet-point summary of the articles
    async fn summarize(&self, articles: &[Article], language: Language) -> Result<String, AppError>;

    /// Comma-separated trend keywords for the articles
    async fn extract_keywords(
        &self,
        articles: &[Article],
        language: Language,
    ) -> Result<String, AppError>;

    /// Rewrite `keyword` into a richer search query. Never fails: the
    /// keyword is returned unchanged if the model cannot be reached.
    async fn expand_query(&self, keyword: &str) -> String;

    /// Fix typos in `keyword`. Falls back to the keyword like `expand_query`.
    async fn correct_spelling(&self, keyword: &str) -> String;
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiSummarizer {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry_delay: Duration,
}

impl GeminiSummarizer {
    pub fn new(api_key: String, model: String) -> anyhow::Result<Self> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, model: String, base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_delay: RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    async fn try_generate(&self, prompt: &str) -> Result<String, ApiFailure> {
        let request = GeminiRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
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
                format!("Gemini API error: {} - {}", status, error_text),
            ));
        }

        let gemini_response = response.json::<GeminiResponse>().await?;

        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(ApiFailure::new("Gemini returned an empty response"));
        }

        Ok(text.to_string())
    }

    /// Generate with the retry policy applied
    async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        with_one_retry(Service::Ai, self.retry_delay, || self.try_generate(prompt)).await
    }

    /// Single attempt that falls back to `keyword` on any failure
    async fn rewrite_or_keep(&self, keyword: &str, prompt: &str) -> String {
        match self.try_generate(prompt).await {
            Ok(text) => first_line(&text).unwrap_or_else(|| keyword.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Query rewrite failed, keeping original keyword");
                keyword.to_string()
            }
        }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, articles: &[Article], language: Language) -> Result<String, AppError> {
        if articles.is_empty() {
            return Ok(NO_ARTICLES_SUMMARY.to_string());
        }

        let prompt = format!(
            r#"Summarize the key points of the following news articles in {}.

RULES:
1. Use bullet points with dashes (-)
2. At most 5 bullet points
3. Each bullet is 1-2 sentences
4. Use only information from the articles

[News list]
{}"#,
            language.prompt_name(),
            article_context(articles)
        );

        self.generate(&prompt).await
    }

    async fn extract_keywords(
        &self,
        articles: &[Article],
        language: Language,
    ) -> Result<String, AppError> {
        if articles.is_empty() {
            return Ok(String::new());
        }

        let prompt = format!(
            r#"Extract up to 5 trend keywords from the following news articles, written in {}.
Respond with a single line of keywords separated by commas and nothing else.

[News list]
{}"#,
            language.prompt_name(),
            article_context(articles)
        );

        let text = self.generate(&prompt).await?;
        Ok(normalize_keywords(&text))
    }

    async fn expand_query(&self, keyword: &str) -> String {
        let prompt = format!(
            r#"You are a news search expert. Based on the trend keyword below, write ONE optimized search query that will return the most accurate and rich news results.

[Keyword]: {}

GUIDELINES:
- Combine the core terms with related words or synonyms
- For global trends, append the English keyword as well (e.g. "AI 반도체 기술 NVIDIA")
- Answer with a single line, no commas
- Prefer core nouns over special characters

Optimized query:"#,
            keyword
        );

        self.rewrite_or_keep(keyword, &prompt).await
    }

    async fn correct_spelling(&self, keyword: &str) -> String {
        let prompt = format!(
            r#"Correct any spelling mistakes in the search keyword below. If it is already correct, return it unchanged.
Answer with the keyword only, on a single line, without quotes or explanation.

[Keyword]: {}"#,
            keyword
        );

        self.rewrite_or_keep(keyword, &prompt).await
    }
}

/// Numbered title/content list fed to the model
fn article_context(articles: &[Article]) -> String {
    articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            format!(
                "{}. Title: {}\n   Content: {}\n",
                i + 1,
                article.title,
                truncate_chars(&article.snippet, 1000)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// First non-empty line with surrounding quotes removed
fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(|line| line.trim().trim_matches('"').trim())
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Collapse model output into `a, b, c`
fn normalize_keywords(text: &str) -> String {
    text.split([',', '\n'])
        .map(|k| k.trim().trim_start_matches(['-', '*', '#']).trim())
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
