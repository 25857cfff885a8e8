use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{parse_search_key, Article, SearchResult};

/// Human-readable publication date, or the raw text if it can't be parsed
pub fn format_pub_date(date_str: &str) -> String {
    // Tavily usually sends RFC 2822 (e.g., "Sat, 17 Jan 2026 10:00:00 GMT")
    if let Ok(dt) = DateTime::parse_from_rfc2822(date_str.trim()) {
        return dt.with_timezone(&Utc).format("%-d-%b-%Y %-I:%M%p").to_string();
    }
    if let Ok(dt) = date_str.parse::<DateTime<Utc>>() {
        return dt.format("%-d-%b-%Y %-I:%M%p").to_string();
    }
    if let Ok(nd) = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d") {
        return nd.format("%-d-%b-%Y").to_string();
    }
    date_str.to_string()
}

/// History entry label: `"<keyword> (MM/DD HH:MM)"`
pub fn history_label(search_key: &str) -> String {
    let (keyword, time) = parse_search_key(search_key);
    let display_time = time
        .map(|t| t.format("%m/%d %H:%M").to_string())
        .unwrap_or_else(|| "Unk".to_string());
    format!("{} ({})", keyword, display_time)
}

/// File name offered for the full-history export
pub fn export_file_name(date: NaiveDate) -> String {
    format!("trendtracker_{}.csv", date.format("%Y%m%d"))
}

/// Summary followed by the numbered article list
pub fn render_result(result: &SearchResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("🤖 Trend summary for '{}'\n\n", result.keyword));
    out.push_str(result.ai_summary.trim());
    out.push('\n');

    if let Some(keywords) = result.ai_keywords.as_deref().filter(|k| !k.is_empty()) {
        out.push_str(&format!("\n🏷  Keywords: {}\n", keywords));
    }

    out.push_str("\n📰 Related news\n");
    if result.articles.is_empty() {
        out.push_str("  No related articles.\n");
        return out;
    }

    for (index, article) in result.articles.iter().enumerate() {
        out.push_str(&render_article(index + 1, article));
    }

    out
}

fn render_article(number: usize, article: &Article) -> String {
    let mut out = format!("\n{}. {}\n", number, article.title);

    let mut meta = Vec::new();
    if let Some(source) = &article.source {
        meta.push(source.clone());
    }
    if let Some(date) = &article.pub_date {
        meta.push(format_pub_date(date));
    }
    if let Some(category) = &article.category {
        meta.push(category.clone());
    }
    if !meta.is_empty() {
        out.push_str(&format!("   {}\n", meta.join(" · ")));
    }

    out.push_str(&format!("   {}\n", article.url));

    let snippet = article.snippet.split_whitespace().collect::<Vec<_>>().join(" ");
    if !snippet.is_empty() {
        let preview: String = snippet.chars().take(200).collect();
        let ellipsis = if preview.len() < snippet.len() { "…" } else { "" };
        out.push_str(&format!("   {}{}\n", preview, ellipsis));
    }

    out
}
