use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::fs;
use std::io::{self, Write as _};
use std::path::PathBuf;
use trend_core::render::{export_file_name, history_label, render_result};
use trend_core::{SearchStore, StoreConfig, StoreError};

#[derive(Parser)]
#[command(name = "trend-history")]
#[command(about = "Browse saved trend searches and export the full history as CSV")]
struct Args {
    /// Search key to show (if not provided, will list saved searches)
    #[arg(short, long)]
    key: Option<String>,

    /// Export the whole history as CSV instead of showing a search
    #[arg(short, long)]
    export: bool,

    /// Where to write the export (defaults to ~/Documents/trendtracker_YYYYMMDD.csv)
    #[arg(short, long, requires = "export")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    trend_core::logging::init_logging();

    let args = Args::parse();
    let store = StoreConfig::from_env()?.open();

    if args.export {
        return export(&store, args.output);
    }

    let key = match args.key {
        Some(key) => key,
        None => match select_key(&store)? {
            Some(key) => key,
            None => return Ok(()),
        },
    };

    match store.find_by_key(&key) {
        Ok(result) => {
            println!("\n{}", render_result(&result));
            Ok(())
        }
        Err(StoreError::NotFound(_)) => anyhow::bail!("No saved search with key: {}", key),
        Err(e) => Err(e).context("Failed to load saved search"),
    }
}

fn export(store: &SearchStore, output: Option<PathBuf>) -> Result<()> {
    let keys = store.list_keys();
    if keys.is_empty() {
        println!("No search history to export yet.");
        return Ok(());
    }

    let filepath = match output {
        Some(path) => path,
        None => {
            let documents_dir = dirs::document_dir().unwrap_or_else(|| PathBuf::from("."));
            documents_dir.join(export_file_name(Local::now().date_naive()))
        }
    };

    fs::write(&filepath, store.export_all())
        .with_context(|| format!("Failed to write export file: {}", filepath.display()))?;

    println!(
        "✅ Exported {} saved searches to: {}",
        keys.len(),
        filepath.display()
    );
    Ok(())
}

fn select_key(store: &SearchStore) -> Result<Option<String>> {
    let keys = store.list_keys();
    if keys.is_empty() {
        println!("No search history yet. Run trend-search first.");
        return Ok(None);
    }

    println!("Saved searches (newest first):\n");
    for (i, key) in keys.iter().enumerate() {
        println!("  {}) {}", i + 1, history_label(key));
    }

    print!("\nEnter your choice (1-{}): ", keys.len());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let choice: usize = input
        .trim()
        .parse()
        .context("Invalid selection. Please enter a number.")?;

    if choice == 0 || choice > keys.len() {
        anyhow::bail!("Invalid selection. Please choose 1-{}.", keys.len());
    }

    Ok(Some(keys[choice - 1].clone()))
}
