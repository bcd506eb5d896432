//! Vilibrity CLI - Browse the anime catalog from the terminal
//!
//! Fetches listings from the catalog backend, caching successful responses
//! on disk so repeated lookups within the TTL never touch the network.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;

use vilibrity::catalog::{Anime, HomeFeed};
use vilibrity::cli::{log_level, CacheAction, Cli, Command};
use vilibrity::config::{ClientConfig, BASE_URL_ENV};
use vilibrity::output;

/// Prints a list of titles, one per line
fn print_list(list: &[Anime]) {
    if list.is_empty() {
        println!("No anime found.");
        return;
    }
    for anime in list {
        println!("{}", output::format_anime_line(anime));
    }
}

/// Prints every section of the home feed, noting sections that failed
fn print_home(feed: &HomeFeed) {
    if let Some(banner) = &feed.banner {
        println!("== Featured ==");
        println!("{}", output::format_anime_detail(banner));
        println!();
    }

    println!("== Trending ==");
    match &feed.trending {
        Ok(list) => print_list(list),
        Err(e) => println!("unavailable: {}", e),
    }
    println!();

    println!("== Popular ==");
    match &feed.popular {
        Ok(list) => print_list(list),
        Err(e) => println!("unavailable: {}", e),
    }
    println!();

    println!("== Genres ==");
    match &feed.genres {
        Ok(genres) => {
            for genre in genres {
                println!("{}", output::format_genre_line(genre));
            }
        }
        Err(e) => println!("unavailable: {}", e),
    }
}

fn run_cache(action: CacheAction, config: &ClientConfig) -> Result<(), Box<dyn Error>> {
    let cache = config.open_cache();
    match action {
        CacheAction::Stats => println!("{}", output::format_stats(&cache.stats()?)),
        CacheAction::Sweep => {
            // Opening the cache already swept once
            let mut report = cache.startup_sweep();
            let again = cache.sweep();
            report.removed += again.removed;
            report.failed += again.failed;
            println!("{}", output::format_sweep(&report));
        }
        CacheAction::Clear => println!("Removed {} entries", cache.clear()?),
    }
    Ok(())
}

async fn run(command: Command, config: &ClientConfig) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Cache { action } => run_cache(action, config)?,
        Command::Home => print_home(&config.build_client()?.home().await),
        Command::Trending { page } => print_list(&config.build_client()?.trending(page).await?),
        Command::Popular { page } => print_list(&config.build_client()?.popular(page).await?),
        Command::Genres => {
            for genre in config.build_client()?.popular_genres().await? {
                println!("{}", output::format_genre_line(&genre));
            }
        }
        Command::Genre { name } => print_list(&config.build_client()?.by_genre(&name).await?),
        Command::Search { query } => {
            print_list(&config.build_client()?.search(&query.join(" ")).await?)
        }
        Command::Show { id } => {
            let anime = config.build_client()?.anime_by_id(&id).await?;
            println!("{}", output::format_anime_detail(&anime));
        }
        Command::Banner => {
            let anime = config.build_client()?.banner().await?;
            println!("{}", output::format_anime_detail(&anime));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .init();

    let config = match cli.client_config(std::env::var(BASE_URL_ENV).ok()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
