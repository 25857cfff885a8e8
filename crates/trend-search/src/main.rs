use anyhow::Result;
use clap::Parser;
use std::io::{self as stdio, Write};
use trend_core::render::render_result;
use trend_core::{
    preprocess_keyword, AppError, Category, Config, GeminiSummarizer, Language, SearchOptions,
    SearchOutcome, TavilyClient, TimeRange, TrendTracker,
};

fn prompt_keyword() -> Result<String> {
    print!("Trend keyword to analyze (e.g. generative AI, NYSE, vegan recipes): ");
    stdio::stdout().flush()?;

    let mut input = String::new();
    stdio::stdin().read_line(&mut input)?;

    preprocess_keyword(&input).ok_or_else(|| AppError::EmptyInput.into())
}

#[derive(Parser)]
#[command(name = "trend-search")]
#[command(about = "Search recent news for a keyword and summarize the trend with AI")]
struct Args {
    /// Keyword to analyze (prompted for if omitted)
    keyword: Option<String>,

    /// Number of articles to keep (3-30)
    #[arg(short = 'n', long, default_value = "12", value_parser = clap::value_parser!(u8).range(3..=30))]
    count: u8,

    /// Category filter (all, science, medicine, it, society, culture, sports, economy, politics, other)
    #[arg(short, long, default_value = "all")]
    category: Category,

    /// Only include news from the past day, week, or month
    #[arg(short, long)]
    time_range: Option<TimeRange>,

    /// Language of the news and the summary (ko, en)
    #[arg(short, long, default_value = "ko")]
    language: Language,

    /// Restrict the search to the domains listed in SEARCH_DOMAINS
    #[arg(long)]
    restrict_sources: bool,

    /// Skip AI query optimization
    #[arg(long)]
    no_expand: bool,

    /// Skip automatic spelling correction
    #[arg(long)]
    no_spell_check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    trend_core::logging::init_logging();

    let args = Args::parse();
    let config = Config::from_env()?;

    let keyword = match args.keyword {
        Some(keyword) => keyword,
        None => prompt_keyword()?,
    };

    let options = SearchOptions {
        max_results: args.count as usize,
        category: args.category,
        time_range: args.time_range,
        all_sources: !args.restrict_sources,
        language: args.language,
        expand_query: !args.no_expand,
        spell_check: !args.no_spell_check,
    };

    let search = TavilyClient::new(config.tavily_api_key.clone(), config.search_domains.clone())
        .map_err(|e| AppError::Unknown(format!("{:#}", e)))?;
    let summarizer = GeminiSummarizer::new(config.gemini_api_key.clone(), config.gemini_model.clone())
        .map_err(|e| AppError::Unknown(format!("{:#}", e)))?;
    let tracker = TrendTracker::new(Box::new(search), Box::new(summarizer), config.store.open());

    println!("\n🔎 Analyzing \"{}\"...", keyword.trim());
    println!("  (This may take a minute...)");

    let outcome = match tracker.run(&keyword, &options).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::debug!(kind = e.code(), "Search cycle failed");
            anyhow::bail!("{}", e);
        }
    };

    match outcome {
        SearchOutcome::NoResults { query } => {
            println!("\n⚠ {} for \"{}\".", AppError::NoResults, query);
        }
        SearchOutcome::Completed {
            result,
            query,
            corrected,
            saved,
        } => {
            if let Some(corrected) = corrected {
                println!("💡 Searching with corrected keyword '{}'", corrected);
            }
            if options.expand_query {
                println!("✓ Optimized query: {}", query);
            }

            println!("\n{}", render_result(&result));

            if saved {
                println!(
                    "✅ Analysis complete: captured {} articles (saved as {})",
                    result.articles.len(),
                    result.search_key
                );
            } else {
                println!("⚠ {}. The result above was not saved.", AppError::FileError);
            }
        }
    }

    Ok(())
}
