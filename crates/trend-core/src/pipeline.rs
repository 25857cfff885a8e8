//! One search cycle: keyword → search → summary → history.

use chrono::{Local, NaiveDateTime};

use crate::error::AppError;
use crate::input::preprocess_keyword;
use crate::models::{SearchOptions, SearchResult};
use crate::search::NewsSearch;
use crate::store::SearchStore;
use crate::summarizer::Summarizer;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The search ran but matched nothing; nothing is saved
    NoResults { query: String },
    Completed {
        result: SearchResult,
        /// Query actually sent to the search API
        query: String,
        /// Spelling correction applied to the keyword, if any
        corrected: Option<String>,
        /// `false` when the history file could not be written
        saved: bool,
    },
}

/// Sequences the injected clients and the history store
pub struct TrendTracker {
    search: Box<dyn NewsSearch>,
    summarizer: Box<dyn Summarizer>,
    store: SearchStore,
}

impl TrendTracker {
    pub fn new(
        search: Box<dyn NewsSearch>,
        summarizer: Box<dyn Summarizer>,
        store: SearchStore,
    ) -> Self {
        Self {
            search,
            summarizer,
            store,
        }
    }

    pub fn store(&self) -> &SearchStore {
        &self.store
    }

    pub async fn run(&self, raw_keyword: &str, options: &SearchOptions) -> Result<SearchOutcome, AppError> {
        self.run_at(raw_keyword, options, Local::now().naive_local()).await
    }

    /// Same as [`run`](Self::run) with an explicit search time
    pub async fn run_at(
        &self,
        raw_keyword: &str,
        options: &SearchOptions,
        search_time: NaiveDateTime,
    ) -> Result<SearchOutcome, AppError> {
        let keyword = preprocess_keyword(raw_keyword).ok_or(AppError::EmptyInput)?;

        let mut query = keyword.clone();
        let mut corrected = None;

        if options.spell_check {
            let fixed = self.summarizer.correct_spelling(&query).await;
            if fixed.to_lowercase() != query.to_lowercase() {
                tracing::info!(from = %query, to = %fixed, "Corrected keyword spelling");
                corrected = Some(fixed.clone());
                query = fixed;
            }
        }

        if options.expand_query {
            query = self.summarizer.expand_query(&query).await;
            tracing::info!(%query, "Expanded search query");
        }

        let articles = self.search.search(&query, options).await?;
        if articles.is_empty() {
            return Ok(SearchOutcome::NoResults { query });
        }

        let summary = self.summarizer.summarize(&articles, options.language).await?;
        let keywords = self
            .summarizer
            .extract_keywords(&articles, options.language)
            .await?;

        let mut result = SearchResult::new(keyword, search_time, articles, summary);
        if !keywords.is_empty() {
            result = result.with_keywords(keywords);
        }

        let saved = self.store.append(&result);
        if !saved {
            tracing::warn!(key = %result.search_key, "{}", AppError::FileError);
        }

        Ok(SearchOutcome::Completed {
            result,
            query,
            corrected,
            saved,
        })
    }
}
