//! Search history persisted as one comma-separated file.
//!
//! Every operation reloads the file; nothing is cached between calls.
//! `append` rewrites the whole file (read, concatenate, write) without any
//! locking, so two processes appending at the same time can lose one of the
//! updates. The history is single-user and this race is accepted.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::codec::{self, FlatRow, Header, StoreSchema};
use crate::csv;
use crate::error::StoreError;
use crate::models::SearchResult;

/// Default location of the history file
pub fn get_default_store_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join("trendtracker");

    Ok(data_dir.join("search_history.csv"))
}

/// File contents: the header's column names and the parsed rows
#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<FlatRow>,
}

#[derive(Debug, Clone)]
pub struct SearchStore {
    path: PathBuf,
    schema: StoreSchema,
}

impl SearchStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            schema: StoreSchema::Standard,
        }
    }

    pub fn with_schema(mut self, schema: StoreSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored rows in file order.
    ///
    /// A missing file is an empty history. An unreadable or malformed file is
    /// logged and also treated as empty.
    pub fn load(&self) -> Vec<FlatRow> {
        self.load_table().rows
    }

    fn load_table(&self) -> Table {
        match self.try_load() {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to load search history");
                Table::default()
            }
        }
    }

    fn try_load(&self) -> Result<Table, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Table::default()),
            Err(e) => return Err(e.into()),
        };

        let text = String::from_utf8(bytes)
            .map_err(|e| StoreError::Malformed(format!("not valid UTF-8: {}", e)))?;

        let mut records = csv::parse(&text)?.into_iter();
        let header = match records.next() {
            Some(columns) => Header::new(&columns)?,
            None => return Ok(Table::default()),
        };

        let mut rows = Vec::new();
        for (i, record) in records.enumerate() {
            if record.len() > header.width() {
                return Err(StoreError::Malformed(format!(
                    "record {} has {} fields, header has {}",
                    i + 1,
                    record.len(),
                    header.width()
                )));
            }
            match header.row(&record) {
                Ok(row) => rows.push(row),
                Err(reason) => {
                    tracing::warn!(record = i + 1, "Skipping history row: {}", reason);
                }
            }
        }

        Ok(Table {
            columns: header.columns().to_vec(),
            rows,
        })
    }

    /// Append a result's rows to the history.
    ///
    /// Existing rows are written back with every column the file already
    /// has, whatever this store's schema. Returns `false` if the file could
    /// not be written. The caller keeps the result in memory in that case.
    pub fn append(&self, result: &SearchResult) -> bool {
        match self.try_append(result) {
            Ok(()) => true,
            Err(e) => {
                let error = format!("{:#}", e);
                tracing::error!(path = %self.path.display(), %error, "Failed to save search result");
                false
            }
        }
    }

    fn try_append(&self, result: &SearchResult) -> Result<()> {
        let mut table = self.load_table();
        table.rows.extend(codec::encode(result));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create history directory")?;
            }
        }

        fs::write(&self.path, self.serialize(&table))
            .with_context(|| format!("Failed to write history file: {}", self.path.display()))?;

        tracing::debug!(key = %result.search_key, rows = result.articles.len(), "Saved search result");
        Ok(())
    }

    /// Distinct search keys, newest first.
    ///
    /// Rows whose `search_time` cannot be parsed do not take part in the
    /// ordering; keys only found on such rows follow in file order.
    pub fn list_keys(&self) -> Vec<String> {
        let rows = self.load();

        let mut timed: Vec<_> = rows
            .iter()
            .filter_map(|row| row.parsed_time().map(|time| (time, &row.search_key)))
            .collect();
        // Stable: rows with equal times keep file order
        timed.sort_by(|a, b| b.0.cmp(&a.0));

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let ordered = timed
            .into_iter()
            .map(|(_, key)| key)
            .chain(rows.iter().map(|row| &row.search_key));
        for key in ordered {
            if seen.insert(key.as_str()) {
                keys.push(key.clone());
            }
        }

        keys
    }

    /// Rebuild the saved result for `key`
    pub fn find_by_key(&self, key: &str) -> Result<SearchResult, StoreError> {
        let rows: Vec<FlatRow> = self
            .load()
            .into_iter()
            .filter(|row| row.search_key == key)
            .collect();

        if rows.is_empty() {
            return Err(StoreError::NotFound(key.to_string()));
        }

        codec::decode(rows)
    }

    /// The whole history in the on-disk text format, for download
    pub fn export_all(&self) -> String {
        self.serialize(&self.load_table())
    }

    fn serialize(&self, table: &Table) -> String {
        let columns = self.schema.merge_columns(&table.columns);

        let mut out = String::new();
        out.push(csv::BOM);
        csv::write_record(&mut out, &columns);
        for row in &table.rows {
            csv::write_record(&mut out, &row.to_record(&columns));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn result(keyword: &str, time: NaiveDateTime, count: usize) -> SearchResult {
        let articles = (1..=count)
            .map(|i| {
                Article::new(
                    format!("{} story {}", keyword, i),
                    format!("https://example.com/{}/{}", keyword, i),
                    "Snippet with a comma, and \"quotes\"",
                )
            })
            .collect();
        SearchResult::new(keyword, time, articles, format!("Summary of {}", keyword))
    }

    fn store_in(dir: &TempDir) -> SearchStore {
        SearchStore::new(dir.path().join("data").join("search_history.csv"))
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.load().is_empty());
        assert!(store.list_keys().is_empty());
        assert_eq!(
            store.export_all(),
            "\u{feff}search_key,search_time,keyword,article_index,title,url,snippet,pub_date,ai_summary\n"
        );
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.csv");
        fs::write(&path, "search_key,title\n\"never closed,oops\n").unwrap();
        let store = SearchStore::new(&path);

        assert!(store.load().is_empty());
        assert!(store.list_keys().is_empty());
    }

    #[test]
    fn test_binary_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.csv");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x81]).unwrap();

        assert!(SearchStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_append_creates_directory_and_accumulates_rows() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.append(&result("rust", at(1, 9, 0), 3)));
        assert!(store.append(&result("go", at(2, 9, 0), 2)));
        assert!(store.append(&result("zig", at(3, 9, 0), 0)));

        let rows = store.load();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].search_key, "rust-202601010900");
        assert_eq!(rows[4].search_key, "go-202601020900");
        assert_eq!(rows[4].article_index, 2);
    }

    #[test]
    fn test_append_fails_without_panicking() {
        let dir = TempDir::new().unwrap();
        // The store path is an existing directory, so the write must fail
        let store = SearchStore::new(dir.path());

        assert!(!store.append(&result("rust", at(1, 9, 0), 1)));
    }

    #[test]
    fn test_list_keys_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.append(&result("b", at(5, 10, 0), 1));
        store.append(&result("a", at(9, 10, 0), 2));
        store.append(&result("c", at(1, 10, 0), 1));

        assert_eq!(
            store.list_keys(),
            vec!["a-202601091000", "b-202601051000", "c-202601011000"]
        );
    }

    #[test]
    fn test_list_keys_with_unparsable_times() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(
            &path,
            "search_key,search_time,article_index\n\
             old-1,garbage,1\n\
             new-2,2026-01-02T00:00:00,1\n\
             mid-3,2026-01-01T00:00:00,1\n",
        )
        .unwrap();
        let store = SearchStore::new(&path);

        assert_eq!(store.list_keys(), vec!["new-2", "mid-3", "old-1"]);
    }

    #[test]
    fn test_list_keys_all_unparsable_falls_back_to_file_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(
            &path,
            "search_key,search_time,article_index\nx,?,1\ny,?,1\nx,?,2\n",
        )
        .unwrap();

        assert_eq!(SearchStore::new(&path).list_keys(), vec!["x", "y"]);
    }

    #[test]
    fn test_find_by_key_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let saved = result("AI 트렌드", at(18, 14, 30), 4);

        store.append(&result("other", at(17, 8, 0), 2));
        store.append(&saved);

        let found = store.find_by_key("AI 트렌드-202601181430").unwrap();
        assert_eq!(found, saved);
        assert_eq!(found.articles.len(), 4);
    }

    #[test]
    fn test_find_by_key_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append(&result("rust", at(1, 9, 0), 1));

        assert!(matches!(
            store.find_by_key("never-saved"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_same_minute_collision_merges_articles() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let first = result("rust", at(1, 9, 0), 2);
        let mut second = result("rust", at(1, 9, 0), 1);
        second.ai_summary = "second summary".to_string();

        store.append(&first);
        store.append(&second);

        let found = store.find_by_key("rust-202601010900").unwrap();
        assert_eq!(found.articles.len(), 3);
        assert_eq!(found.ai_summary, "Summary of rust");
        assert_eq!(store.list_keys(), vec!["rust-202601010900"]);
    }

    #[test]
    fn test_rows_with_bad_index_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(
            &path,
            "search_key,search_time,article_index,title\n\
             k-1,2026-01-01T00:00:00,one,Bad\n\
             k-1,2026-01-01T00:00:00,2,Good\n",
        )
        .unwrap();

        let rows = SearchStore::new(&path).load();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Good");
    }

    #[test]
    fn test_extended_schema_keeps_superset_fields() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).with_schema(StoreSchema::Extended);
        let mut saved = result("chips", at(4, 12, 0), 1).with_keywords("NVIDIA, HBM");
        saved.articles[0].image_url = Some("https://img.example.com/1.jpg".to_string());
        saved.articles[0].source = Some("example.com".to_string());
        saved.articles[0].category = Some("Science/Tech".to_string());

        store.append(&saved);

        assert_eq!(store.find_by_key(&saved.search_key).unwrap(), saved);
        assert!(store.export_all().contains("ai_keywords,image_url,source,category"));
    }

    #[test]
    fn test_standard_schema_drops_superset_fields() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let saved = result("chips", at(4, 12, 0), 1).with_keywords("NVIDIA, HBM");

        store.append(&saved);

        let found = store.find_by_key(&saved.search_key).unwrap();
        assert!(found.ai_keywords.is_none());
        assert_eq!(found.articles, saved.articles);
    }

    #[test]
    fn test_standard_store_keeps_extended_columns() {
        let dir = TempDir::new().unwrap();
        let extended = store_in(&dir).with_schema(StoreSchema::Extended);
        let mut saved = result("chips", at(4, 12, 0), 1).with_keywords("HBM");
        saved.articles[0].source = Some("example.com".to_string());
        extended.append(&saved);

        // Same file opened with the default layout
        let standard = store_in(&dir);
        assert!(standard.export_all().contains("HBM"));
        assert!(standard.append(&result("rust", at(5, 9, 0), 1)));

        let found = extended.find_by_key(&saved.search_key).unwrap();
        assert_eq!(found, saved);
        assert_eq!(found.ai_keywords.as_deref(), Some("HBM"));
        assert_eq!(found.articles[0].source.as_deref(), Some("example.com"));
        assert_eq!(standard.list_keys().len(), 2);
    }

    #[test]
    fn test_unknown_columns_survive_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(
            &path,
            "search_key,search_time,article_index,title,notes
             k-1,2026-01-01T00:00:00,1,Hand edited,keep me
",
        )
        .unwrap();
        let store = SearchStore::new(&path);

        assert!(store.append(&result("rust", at(5, 9, 0), 1)));

        let text = fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("\u{feff}search_key,search_time,article_index,title,notes,"));
        assert!(text.contains("Hand edited,keep me"));
        assert_eq!(store.load()[1].extra.get("notes").map(String::as_str), Some(""));
    }

    #[test]
    fn test_export_all_matches_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append(&result("rust", at(1, 9, 0), 2));

        let exported = store.export_all();
        assert_eq!(exported, fs::read_to_string(store.path()).unwrap());
        assert!(exported.starts_with('\u{feff}'));
        assert_eq!(exported.lines().count(), 3);
    }
}
