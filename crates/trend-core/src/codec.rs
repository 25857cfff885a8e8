//! Flattening of search results into one row per article, and back.

use chrono::{DateTime, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};

use crate::error::StoreError;
use crate::models::{Article, SearchResult};

/// Format written to the `search_time` column
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const STANDARD_COLUMNS: &[&str] = &[
    "search_key",
    "search_time",
    "keyword",
    "article_index",
    "title",
    "url",
    "snippet",
    "pub_date",
    "ai_summary",
];

const EXTENDED_COLUMNS: &[&str] = &[
    "search_key",
    "search_time",
    "keyword",
    "article_index",
    "title",
    "url",
    "snippet",
    "pub_date",
    "ai_summary",
    "ai_keywords",
    "image_url",
    "source",
    "category",
];

/// Column layout written to disk. Reading accepts either layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreSchema {
    /// The nine standard columns
    #[default]
    Standard,
    /// Standard columns plus keywords, image, source and category
    Extended,
}

impl StoreSchema {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            StoreSchema::Standard => STANDARD_COLUMNS,
            StoreSchema::Extended => EXTENDED_COLUMNS,
        }
    }

    /// Columns to write when rewriting a file that already has `existing`.
    ///
    /// The file's own columns come first and are never dropped; schema
    /// columns the file lacks are added after them.
    pub fn merge_columns(&self, existing: &[String]) -> Vec<String> {
        let mut columns = existing.to_vec();
        for column in self.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
        columns
    }
}

/// One article plus a copy of its parent result's metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlatRow {
    pub search_key: String,
    pub search_time: String,
    pub keyword: String,
    pub article_index: usize,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub pub_date: String,
    pub ai_summary: String,
    pub ai_keywords: String,
    pub image_url: String,
    pub source: String,
    pub category: String,
    /// Columns this crate does not know, carried through rewrites by name
    pub extra: BTreeMap<String, String>,
}

impl FlatRow {
    fn field(&self, column: &str) -> &str {
        match column {
            "search_key" => &self.search_key,
            "search_time" => &self.search_time,
            "keyword" => &self.keyword,
            "title" => &self.title,
            "url" => &self.url,
            "snippet" => &self.snippet,
            "pub_date" => &self.pub_date,
            "ai_summary" => &self.ai_summary,
            "ai_keywords" => &self.ai_keywords,
            "image_url" => &self.image_url,
            "source" => &self.source,
            "category" => &self.category,
            other => self.extra.get(other).map(String::as_str).unwrap_or(""),
        }
    }

    /// Field values in the order of `columns`
    pub fn to_record<S: AsRef<str>>(&self, columns: &[S]) -> Vec<String> {
        columns
            .iter()
            .map(|column| match column.as_ref() {
                "article_index" => self.article_index.to_string(),
                other => self.field(other).to_string(),
            })
            .collect()
    }

    /// Parsed `search_time`, if it is in a recognised format
    pub fn parsed_time(&self) -> Option<NaiveDateTime> {
        parse_search_time(&self.search_time)
    }
}

/// Column positions taken from a file's header line
#[derive(Debug)]
pub struct Header {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Header {
    pub fn new(columns: &[String]) -> Result<Self, StoreError> {
        let columns: Vec<String> = columns.iter().map(|name| name.trim().to_string()).collect();
        let positions: HashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        if !positions.contains_key("search_key") {
            return Err(StoreError::Malformed(
                "header has no search_key column".to_string(),
            ));
        }

        Ok(Self { columns, positions })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Column names in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Build a row from one record. Missing columns read as empty.
    pub fn row(&self, record: &[String]) -> Result<FlatRow, String> {
        let get = |column: &str| -> String {
            self.positions
                .get(column)
                .and_then(|&i| record.get(i))
                .cloned()
                .unwrap_or_default()
        };

        let raw_index = get("article_index");
        let article_index = raw_index
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("article_index {:?} is not a number", raw_index))?;

        let extra = self
            .columns
            .iter()
            .filter(|column| !column.is_empty() && !EXTENDED_COLUMNS.contains(&column.as_str()))
            .map(|column| (column.clone(), get(column.as_str())))
            .collect();

        Ok(FlatRow {
            search_key: get("search_key"),
            search_time: get("search_time"),
            keyword: get("keyword"),
            article_index,
            title: get("title"),
            url: get("url"),
            snippet: get("snippet"),
            pub_date: get("pub_date"),
            ai_summary: get("ai_summary"),
            ai_keywords: get("ai_keywords"),
            image_url: get("image_url"),
            source: get("source"),
            category: get("category"),
            extra,
        })
    }
}

/// Parse a stored `search_time`.
///
/// Accepts the written format, the space-separated variant spreadsheet tools
/// tend to produce, and RFC 3339.
pub fn parse_search_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in [TIME_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(time) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(time);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Flatten a result into one row per article.
///
/// A result without articles yields no rows and is therefore never persisted.
pub fn encode(result: &SearchResult) -> Vec<FlatRow> {
    let search_time = result.search_time.format(TIME_FORMAT).to_string();
    let ai_keywords = result.ai_keywords.clone().unwrap_or_default();

    result
        .articles
        .iter()
        .enumerate()
        .map(|(i, article)| FlatRow {
            search_key: result.search_key.clone(),
            search_time: search_time.clone(),
            keyword: result.keyword.clone(),
            article_index: i + 1,
            title: article.title.clone(),
            url: article.url.clone(),
            snippet: article.snippet.clone(),
            pub_date: article.pub_date.clone().unwrap_or_default(),
            ai_summary: result.ai_summary.clone(),
            ai_keywords: ai_keywords.clone(),
            image_url: article.image_url.clone().unwrap_or_default(),
            source: article.source.clone().unwrap_or_default(),
            category: article.category.clone().unwrap_or_default(),
            extra: BTreeMap::new(),
        })
        .collect()
}

/// Rebuild a result from all rows sharing one search key.
///
/// Rows are ordered by `article_index`; metadata comes from the row with the
/// smallest index. Blank optional fields decode as `None`, so an article
/// stored with `Some("")` comes back without that field.
pub fn decode(mut rows: Vec<FlatRow>) -> Result<SearchResult, StoreError> {
    if rows.is_empty() {
        return Err(StoreError::NotFound("empty row set".to_string()));
    }

    rows.sort_by_key(|row| row.article_index);

    let first = &rows[0];
    let search_time = first.parsed_time().ok_or_else(|| {
        StoreError::Malformed(format!(
            "unparsable search_time {:?} for {}",
            first.search_time, first.search_key
        ))
    })?;

    let search_key = first.search_key.clone();
    let keyword = first.keyword.clone();
    let ai_summary = first.ai_summary.clone();
    let ai_keywords = non_empty(&first.ai_keywords);

    let articles = rows
        .into_iter()
        .map(|row| Article {
            pub_date: non_empty(&row.pub_date),
            image_url: non_empty(&row.image_url),
            source: non_empty(&row.source),
            category: non_empty(&row.category),
            title: row.title,
            url: row.url,
            snippet: row.snippet,
        })
        .collect();

    Ok(SearchResult {
        search_key,
        search_time,
        keyword,
        articles,
        ai_summary,
        ai_keywords,
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_result(count: usize) -> SearchResult {
        let time = NaiveDate::from_ymd_opt(2026, 1, 18)
            .unwrap()
            .and_hms_opt(14, 30, 12)
            .unwrap();
        let articles = (1..=count)
            .map(|i| {
                Article::new(
                    format!("Title {}", i),
                    format!("https://news.example.com/{}", i),
                    format!("Snippet, number {}", i),
                )
                .with_pub_date("2026-01-18")
            })
            .collect();
        SearchResult::new("AI 트렌드", time, articles, "- point one\n- point two")
    }

    #[test]
    fn test_encode_one_row_per_article() {
        let result = sample_result(3);
        let rows = encode(&result);

        assert_eq!(rows.len(), 3);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.article_index, i + 1);
            assert_eq!(row.search_key, "AI 트렌드-202601181430");
            assert_eq!(row.ai_summary, result.ai_summary);
            assert_eq!(row.search_time, "2026-01-18T14:30:12");
        }
        assert_eq!(rows[2].title, "Title 3");
    }

    #[test]
    fn test_encode_empty_result_yields_no_rows() {
        assert!(encode(&sample_result(0)).is_empty());
    }

    #[test]
    fn test_decode_empty_rows_is_not_found() {
        assert!(matches!(decode(Vec::new()), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_round_trip_preserves_result() {
        let result = sample_result(4).with_keywords("AI, chips, NVIDIA");
        let decoded = decode(encode(&result)).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn test_decode_sorts_by_article_index() {
        let mut rows = encode(&sample_result(3));
        rows.reverse();

        let decoded = decode(rows).unwrap();
        let titles: Vec<_> = decoded.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Title 1", "Title 2", "Title 3"]);
    }

    #[test]
    fn test_decode_takes_metadata_from_smallest_index() {
        let mut rows = encode(&sample_result(2));
        rows[1].ai_summary = "stale summary".to_string();
        rows.reverse();

        let decoded = decode(rows).unwrap();
        assert_eq!(decoded.ai_summary, "- point one\n- point two");
    }

    #[test]
    fn test_decode_bad_time_is_malformed() {
        let mut rows = encode(&sample_result(1));
        rows[0].search_time = "yesterday".to_string();
        assert!(matches!(decode(rows), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_parse_search_time_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 18)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_search_time("2026-01-18T14:30:00"), Some(expected));
        assert_eq!(parse_search_time("2026-01-18 14:30:00.000000"), Some(expected));
        assert_eq!(parse_search_time("2026-01-18 14:30"), Some(expected));
        assert_eq!(parse_search_time("2026-01-18T14:30:00+09:00"), Some(expected));
        assert_eq!(parse_search_time("not a time"), None);
    }

    #[test]
    fn test_header_reads_columns_by_name() {
        let header = Header::new(&[
            "title".to_string(),
            "article_index".to_string(),
            "search_key".to_string(),
        ])
        .unwrap();
        let row = header
            .row(&["Hello".to_string(), "2".to_string(), "k-202601010000".to_string()])
            .unwrap();

        assert_eq!(row.title, "Hello");
        assert_eq!(row.article_index, 2);
        assert_eq!(row.search_key, "k-202601010000");
        assert_eq!(row.ai_summary, "");
    }

    #[test]
    fn test_header_requires_search_key() {
        assert!(Header::new(&["title".to_string()]).is_err());
    }

    #[test]
    fn test_to_record_follows_columns() {
        let row = &encode(&sample_result(1))[0];
        assert_eq!(row.to_record(StoreSchema::Standard.columns()).len(), 9);
        assert_eq!(row.to_record(StoreSchema::Extended.columns()).len(), 13);
        assert_eq!(row.to_record(StoreSchema::Standard.columns())[3], "1");
    }

    #[test]
    fn test_merge_columns_keeps_existing_layout() {
        let existing: Vec<String> = EXTENDED_COLUMNS.iter().map(|c| c.to_string()).collect();
        assert_eq!(StoreSchema::Standard.merge_columns(&existing), existing);

        let narrow = vec!["search_key".to_string(), "notes".to_string()];
        let merged = StoreSchema::Standard.merge_columns(&narrow);
        assert_eq!(&merged[..2], &narrow[..]);
        assert_eq!(merged.len(), 10);
        assert!(merged.contains(&"ai_summary".to_string()));
    }

    #[test]
    fn test_header_carries_unknown_columns() {
        let header = Header::new(&[
            "search_key".to_string(),
            "article_index".to_string(),
            " notes ".to_string(),
        ])
        .unwrap();
        let row = header
            .row(&["k-202601010000".to_string(), "1".to_string(), "keep me".to_string()])
            .unwrap();

        assert_eq!(header.columns()[2], "notes");
        assert_eq!(row.extra.get("notes").map(String::as_str), Some("keep me"));
        assert_eq!(row.to_record(header.columns())[2], "keep me");
    }

    #[test]
    fn test_decode_blank_optional_fields_are_none() {
        let mut result = sample_result(1);
        result.articles[0].image_url = Some("  ".to_string());
        let decoded = decode(encode(&result)).unwrap();
        assert!(decoded.articles[0].image_url.is_none());
    }
}
