//! CLI smoke entry point.
//!
//! Opens and migrates the catalog, then prints the version and entity counts.

use clap::Parser;
use quotebook_core::config::IN_MEMORY_DB;
use quotebook_core::{
    default_log_level, AuthorRepository, BookRepository, CatalogConfig, CategoryRepository,
    QuoteRepository, SqliteAuthorRepository, SqliteBookRepository, SqliteCategoryRepository,
    SqliteQuoteRepository,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Inspect a quotebook catalog database.
#[derive(Debug, Parser)]
#[command(name = "quotebook", version)]
struct Cli {
    /// Catalog database file; omitted or `:memory:` uses a private in-memory database
    db_path: Option<PathBuf>,

    /// Directory for rolling log files; logging stays off when omitted
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, default_value = default_log_level())]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> CatalogConfig {
        CatalogConfig {
            db_path: self
                .db_path
                .filter(|path| path.as_os_str() != IN_MEMORY_DB),
            log_level: self.log_level,
            log_dir: self.log_dir,
        }
    }
}

fn main() -> ExitCode {
    let config = Cli::parse().into_config();
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("quotebook error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &CatalogConfig) -> Result<(), Box<dyn Error>> {
    if config.init_logging()? {
        log::info!("event=cli_start module=cli status=ok");
    }

    let conn = config.open_database()?;
    let authors = SqliteAuthorRepository::try_new(&conn)?.count()?;
    let books = SqliteBookRepository::try_new(&conn)?.count()?;
    let categories = SqliteCategoryRepository::try_new(&conn)?.count()?;
    let quotes = SqliteQuoteRepository::try_new(&conn)?.count()?;

    println!("quotebook_core version={}", quotebook_core::core_version());
    println!(
        "database={}",
        config
            .db_path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "memory".to_string())
    );
    println!("authors={authors} books={books} categories={categories} quotes={quotes}");
    Ok(())
}
