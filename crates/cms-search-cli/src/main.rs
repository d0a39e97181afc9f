//! cms-search CLI
//!
//! Builds an embedded index from JSON-lines documents and runs searches
//! against the configured backend.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use cms_search::{
    Category, IndexedDocument, LocalIndexer, SearchConfig, SearchQuery, create_backend,
};
use tracing_subscriber::EnvFilter;

/// cms-search - content index administration and search
#[derive(Parser, Debug)]
#[command(name = "cms-search")]
#[command(about = "Index and search CMS content", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CMS_SEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Index directory (overrides the configuration)
    #[arg(long)]
    index: Option<PathBuf>,

    /// Taxonomy directory (overrides the configuration)
    #[arg(long)]
    taxonomy: Option<PathBuf>,

    /// Log more (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add documents from a JSON-lines file to the embedded index
    Index {
        /// One JSON document per line
        file: PathBuf,
        /// Remove every document first
        #[arg(long)]
        clear: bool,
    },
    /// Search and print ranked identifiers and facet counts
    Search {
        /// Language field to search
        #[arg(short, long, default_value = "en")]
        lang: String,
        /// Groups the caller belongs to
        #[arg(short, long, value_delimiter = ',')]
        groups: Vec<String>,
        /// Categories to count
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Words to look for
        words: Vec<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(args: &Args) -> Result<SearchConfig> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::load(path)?,
        None => SearchConfig::default(),
    };
    if let Some(index) = &args.index {
        config.index_path = Some(index.display().to_string());
    }
    if let Some(taxonomy) = &args.taxonomy {
        config.taxonomy_path = Some(taxonomy.display().to_string());
    }
    config.validate()?;
    Ok(config)
}

fn parse_documents(text: &str) -> Result<Vec<IndexedDocument>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}: invalid document", n + 1))
        })
        .collect()
}

fn run_index(config: &SearchConfig, file: &Path, clear: bool) -> Result<usize> {
    let (Some(index), Some(taxonomy)) = (&config.index_path, &config.taxonomy_path) else {
        bail!("indexing needs both an index and a taxonomy directory");
    };
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let docs = parse_documents(&text)?;

    let mut indexer = LocalIndexer::open(
        Path::new(index),
        Path::new(taxonomy),
        config.languages.as_slice(),
    )?;
    if clear {
        indexer.clear()?;
    }
    for doc in &docs {
        indexer.add_document(doc)?;
    }
    indexer.commit()?;
    log::info!("Indexed {} documents into {index}", docs.len());
    Ok(docs.len())
}

async fn run_search(
    config: &SearchConfig,
    lang: &str,
    words: &[String],
    groups: &[String],
    categories: &[String],
) -> Result<()> {
    let mut query = SearchQuery::word(lang, &words.join(" "), groups.iter().cloned());
    for category in categories {
        query = query.with_category(Category::parse(category)?);
    }

    let backend = create_backend(config).await?;
    let outcome = backend.search(&query).await;
    backend.close().await?;
    let outcome = outcome?;

    for id in &outcome.ids {
        println!("{id}");
    }
    if !outcome.facets.is_empty() {
        println!();
        for (category, count) in outcome.facets.iter() {
            println!("{category}\t{count}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let config = load_config(&args)?;

    match &args.command {
        Command::Index { file, clear } => {
            let count = run_index(&config, file, *clear)?;
            println!("indexed {count} documents");
        }
        Command::Search {
            lang,
            groups,
            categories,
            words,
        } => run_search(&config, lang, words, groups, categories).await?,
    }
    Ok(())
}
