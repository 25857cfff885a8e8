use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

/// Timestamp suffix used in search keys, e.g. `202601181430`
pub const KEY_TIME_FORMAT: &str = "%Y%m%d%H%M";

/// One retrieved news item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub pub_date: Option<String>,
    pub image_url: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            pub_date: None,
            image_url: None,
            source: None,
            category: None,
        }
    }

    pub fn with_pub_date(mut self, pub_date: impl Into<String>) -> Self {
        self.pub_date = Some(pub_date.into());
        self
    }
}

/// One completed search + summary transaction
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub search_key: String,
    pub search_time: NaiveDateTime,
    pub keyword: String,
    pub articles: Vec<Article>,
    pub ai_summary: String,
    pub ai_keywords: Option<String>,
}

impl SearchResult {
    /// Build a result whose key is derived from `keyword` and `search_time`
    pub fn new(
        keyword: impl Into<String>,
        search_time: NaiveDateTime,
        articles: Vec<Article>,
        ai_summary: impl Into<String>,
    ) -> Self {
        let keyword = keyword.into();
        Self {
            search_key: generate_search_key(&keyword, search_time),
            search_time,
            keyword,
            articles,
            ai_summary: ai_summary.into(),
            ai_keywords: None,
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.ai_keywords = Some(keywords.into());
        self
    }
}

/// Composite key `"<keyword>-<yyyyMMddHHmm>"`
pub fn generate_search_key(keyword: &str, time: NaiveDateTime) -> String {
    format!("{}-{}", keyword, time.format(KEY_TIME_FORMAT))
}

/// Split a search key into its keyword and timestamp.
///
/// The keyword may itself contain hyphens, so only the last segment is
/// treated as the timestamp. A key without any hyphen is its own keyword.
pub fn parse_search_key(key: &str) -> (String, Option<NaiveDateTime>) {
    match key.rsplit_once('-') {
        Some((keyword, stamp)) => {
            let time = NaiveDateTime::parse_from_str(stamp, KEY_TIME_FORMAT).ok();
            (keyword.to_string(), time)
        }
        None => (key.to_string(), None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    All,
    ScienceTech,
    MedicineBio,
    ItEngineering,
    Society,
    CultureArts,
    Sports,
    EconomyFinance,
    Politics,
    Other,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::All => "All",
            Category::ScienceTech => "Science/Tech",
            Category::MedicineBio => "Medicine/Bio",
            Category::ItEngineering => "IT/Engineering",
            Category::Society => "Society",
            Category::CultureArts => "Culture/Arts",
            Category::Sports => "Sports",
            Category::EconomyFinance => "Economy/Finance",
            Category::Politics => "Politics",
            Category::Other => "Other",
        }
    }

    pub fn is_filter(&self) -> bool {
        *self != Category::All
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Category::All),
            "science" | "tech" | "science-tech" => Ok(Category::ScienceTech),
            "medicine" | "bio" | "medicine-bio" => Ok(Category::MedicineBio),
            "it" | "engineering" | "it-engineering" => Ok(Category::ItEngineering),
            "society" => Ok(Category::Society),
            "culture" | "arts" | "culture-arts" => Ok(Category::CultureArts),
            "sports" => Ok(Category::Sports),
            "economy" | "finance" | "economy-finance" => Ok(Category::EconomyFinance),
            "politics" => Ok(Category::Politics),
            "other" => Ok(Category::Other),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recency window applied by the search API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Day,
    Week,
    Month,
}

impl TimeRange {
    pub fn days(&self) -> u32 {
        match self {
            TimeRange::Day => 1,
            TimeRange::Week => 7,
            TimeRange::Month => 30,
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(TimeRange::Day),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            _ => Err(format!("Unknown time range: {}. Use day, week, or month", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Korean,
    English,
}

impl Language {
    /// Country hint passed to the search API
    pub fn country(&self) -> &'static str {
        match self {
            Language::Korean => "south korea",
            Language::English => "united states",
        }
    }

    /// Name used in model prompts
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::Korean => "Korean",
            Language::English => "English",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ko" | "kr" | "korean" => Ok(Language::Korean),
            "en" | "us" | "english" => Ok(Language::English),
            _ => Err(format!("Unknown language: {}. Use ko or en", s)),
        }
    }
}

/// Options recognised by one search cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub max_results: usize,
    pub category: Category,
    pub time_range: Option<TimeRange>,
    /// Ignore the configured domain allowlist
    pub all_sources: bool,
    pub language: Language,
    pub expand_query: bool,
    pub spell_check: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 12,
            category: Category::All,
            time_range: None,
            all_sources: true,
            language: Language::Korean,
            expand_query: true,
            spell_check: true,
        }
    }
}
