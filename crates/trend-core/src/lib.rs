// Public modules
pub mod codec;
pub mod config;
pub mod csv;
pub mod error;
pub mod input;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod retry;
pub mod search;
pub mod store;
pub mod summarizer;

// Re-export commonly used types
pub use codec::{FlatRow, StoreSchema};
pub use config::{Config, StoreConfig};
pub use error::{ApiFailure, AppError, Service, StoreError};
pub use input::preprocess_keyword;
pub use models::{
    generate_search_key, parse_search_key, Article, Category, Language, SearchOptions,
    SearchResult, TimeRange,
};
pub use pipeline::{SearchOutcome, TrendTracker};
pub use search::{NewsSearch, TavilyClient};
pub use store::SearchStore;
pub use summarizer::{GeminiSummarizer, Summarizer};
