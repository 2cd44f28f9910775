// src/main.rs

use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bookwhisperer::config::Config;
use bookwhisperer::db::{create_connection_pool, initialize_database};
use bookwhisperer::integrations::{CalibreClient, CatalogSource};
use bookwhisperer::repositories::{
    BookRepository, RecommendationRepository, SqliteBookRepository,
    SqliteRecommendationRepository,
};
use bookwhisperer::services::{CatalogService, Method, RecommenderService, ScoredBook};
use bookwhisperer::Book;

/// bookwhisperer - pick the next book to read from a Calibre library
///
/// Caches the catalog locally, tracks what has already been recommended
/// and never repeats a book until the whole catalog has been cycled.
#[derive(Parser)]
#[command(name = "bookwhisperer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Only list the cached catalog
    #[arg(short, long)]
    list: bool,

    /// Recommend; optional free-text query
    #[arg(short, long, value_name = "QUERY", num_args = 0..=1, default_missing_value = "")]
    recommend: Option<String>,

    /// Recommendation method: tfidf, fuzzy or query
    #[arg(short, long, default_value = "tfidf")]
    method: String,

    /// Number of top recommendations
    #[arg(short = 'x', long, default_value_t = 1)]
    top: usize,

    /// Clear the recommendation history
    #[arg(long)]
    clear: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // 1. INFRASTRUCTURE
    let pool = Arc::new(create_connection_pool()?);

    // Initialize schema (idempotent)
    {
        let conn = pool.get()?;
        initialize_database(&conn)?;
    }

    // 2. REPOSITORIES
    let book_repo: Arc<dyn BookRepository> = Arc::new(SqliteBookRepository::new(pool.clone()));
    let history_repo: Arc<dyn RecommendationRepository> =
        Arc::new(SqliteRecommendationRepository::new(pool.clone()));

    // 3. SERVICES
    let recommender = RecommenderService::new(history_repo);

    if cli.clear {
        recommender.clear_history()?;
        println!("Recommendation history cleared.");
        return Ok(());
    }

    let config = Config::from_env()?;
    let source: Arc<dyn CatalogSource> = Arc::new(CalibreClient::new(&config)?);
    let catalog = CatalogService::new(source, book_repo);

    let books = catalog.refresh()?;

    if cli.list {
        print_catalog(&books);
        return Ok(());
    }

    let method = Method::from_str(&cli.method)?;
    let query = cli.recommend.as_deref().filter(|q| !q.is_empty());

    let outcome = recommender.recommend(&books, method, query, cli.top)?;

    if outcome.cycle_reset {
        println!("Every book in the catalog has been recommended; starting a new cycle.");
    }
    match query {
        Some(q) => println!("Top {} for '{}':", outcome.picks.len(), q),
        None => println!("Top {} recommendations today:", outcome.picks.len()),
    }
    for pick in &outcome.picks {
        print_pick(pick);
    }

    Ok(())
}

fn print_catalog(books: &[Book]) {
    let title_width = books
        .iter()
        .map(|b| b.title.chars().count())
        .max()
        .unwrap_or(5)
        .max(5);
    let author_width = books
        .iter()
        .map(|b| b.author.chars().count())
        .max()
        .unwrap_or(6)
        .max(6);

    println!(
        "{:>6}  {:<title_width$}  {:<author_width$}  {}",
        "ID", "Title", "Author", "Topics"
    );
    for book in books {
        println!(
            "{:>6}  {:<title_width$}  {:<author_width$}  {}",
            book.id,
            book.title,
            book.author,
            book.topics.join(", ")
        );
    }
}

fn print_pick(pick: &ScoredBook) {
    if pick.book.author.is_empty() {
        println!(" - {} (score {:.2})", pick.book.title, pick.score);
    } else {
        println!(
            " - {} by {} (score {:.2})",
            pick.book.title, pick.book.author, pick.score
        );
    }
}
