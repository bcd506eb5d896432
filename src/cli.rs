//! Command-line interface parsing for the Vilibrity catalog CLI
//!
//! This module handles parsing of CLI arguments using clap and turns them
//! into a [`ClientConfig`].

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use thiserror::Error;

use crate::config::ClientConfig;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The base URL is not an http(s) URL
    #[error("Invalid base URL: '{0}'. Expected an http:// or https:// URL")]
    InvalidBaseUrl(String),

    /// A zero timeout would fail every request
    #[error("Invalid timeout: {0}. Timeout must be at least 1 second")]
    InvalidTimeout(u64),
}

/// Vilibrity - Browse the anime catalog from the terminal
#[derive(Parser, Debug)]
#[command(name = "vilibrity")]
#[command(about = "Browse the Vilibrity anime catalog from the terminal")]
#[command(version)]
pub struct Cli {
    /// Base URL of the catalog API (overrides VILIBRITY_API_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory for the response cache
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Do not read or write the response cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Ignore cached responses and fetch again
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// What to show
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Banner, trending, popular and genres in one view
    Home,
    /// Currently trending anime
    Trending {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Most popular anime
    Popular {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Popular genres
    Genres,
    /// Anime in a genre
    Genre {
        /// Genre name, e.g. Action
        name: String,
    },
    /// Search anime by title
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Details of a single anime
    Show {
        /// Numeric anime id
        id: String,
    },
    /// The featured anime of the home feed
    Banner,
    /// Inspect or maintain the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache maintenance actions
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Count cached entries
    Stats,
    /// Remove expired entries
    Sweep,
    /// Remove every cached entry
    Clear,
}

/// Validates a base URL argument
pub fn parse_base_url_arg(s: &str) -> Result<String, CliError> {
    let trimmed = s.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(CliError::InvalidBaseUrl(s.to_string()))
    }
}

/// Maps the `-v` count to a log level
pub fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

impl Cli {
    /// Builds the client configuration from parsed arguments.
    ///
    /// Precedence is flag, then `env_base_url`, then the built-in default.
    ///
    /// # Returns
    /// * `Ok(ClientConfig)` with appropriate settings
    /// * `Err(CliError)` if the base URL or timeout is invalid
    pub fn client_config(&self, env_base_url: Option<String>) -> Result<ClientConfig, CliError> {
        let mut config = ClientConfig::default().with_env_base_url(env_base_url);
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        config.base_url = parse_base_url_arg(&config.base_url)?;

        if let Some(secs) = self.timeout {
            if secs == 0 {
                return Err(CliError::InvalidTimeout(secs));
            }
            config.timeout = Duration::from_secs(secs);
        }

        config.cache_dir = self.cache_dir.clone();
        config.use_cache = !self.no_cache;
        config.refresh = self.refresh;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_arg_accepts_http_and_https() {
        assert_eq!(
            parse_base_url_arg("http://localhost:8000/api/v1/").unwrap(),
            "http://localhost:8000/api/v1"
        );
        assert_eq!(
            parse_base_url_arg("https://example.com").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_parse_base_url_arg_invalid() {
        let err = parse_base_url_arg("ftp://example.com").unwrap_err();
        assert!(err.to_string().contains("Invalid base URL"));
        assert!(err.to_string().contains("ftp://example.com"));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), LevelFilter::Warn);
        assert_eq!(log_level(1), LevelFilter::Info);
        assert_eq!(log_level(2), LevelFilter::Debug);
        assert_eq!(log_level(9), LevelFilter::Trace);
    }

    #[test]
    fn test_cli_parse_subcommands() {
        let cli = Cli::parse_from(["vilibrity", "trending"]);
        assert_eq!(cli.command, Command::Trending { page: 1 });

        let cli = Cli::parse_from(["vilibrity", "popular", "--page", "3"]);
        assert_eq!(cli.command, Command::Popular { page: 3 });

        let cli = Cli::parse_from(["vilibrity", "search", "attack", "on", "titan"]);
        assert_eq!(
            cli.command,
            Command::Search {
                query: vec!["attack".into(), "on".into(), "titan".into()]
            }
        );

        let cli = Cli::parse_from(["vilibrity", "cache", "clear"]);
        assert_eq!(
            cli.command,
            Command::Cache {
                action: CacheAction::Clear
            }
        );
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["vilibrity"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["vilibrity", "show", "21", "--no-cache", "-vv"]);
        assert!(cli.no_cache);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.command, Command::Show { id: "21".into() });
    }

    #[test]
    fn test_client_config_defaults() {
        let cli = Cli::parse_from(["vilibrity", "genres"]);
        let config = cli.client_config(None).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/api/v1");
        assert!(config.use_cache);
        assert!(!config.refresh);
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_client_config_flag_beats_env() {
        let cli = Cli::parse_from(["vilibrity", "genres", "--base-url", "https://flag.example"]);
        let config = cli
            .client_config(Some("https://env.example".to_string()))
            .unwrap();
        assert_eq!(config.base_url, "https://flag.example");

        let cli = Cli::parse_from(["vilibrity", "genres"]);
        let config = cli
            .client_config(Some("https://env.example".to_string()))
            .unwrap();
        assert_eq!(config.base_url, "https://env.example");
    }

    #[test]
    fn test_client_config_maps_cache_flags_and_timeout() {
        let cli = Cli::parse_from([
            "vilibrity",
            "banner",
            "--no-cache",
            "--refresh",
            "--timeout",
            "3",
            "--cache-dir",
            "/tmp/vilibrity-test",
        ]);
        let config = cli.client_config(None).unwrap();
        assert!(!config.use_cache);
        assert!(config.refresh);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/vilibrity-test")));
    }

    #[test]
    fn test_client_config_rejects_zero_timeout() {
        let cli = Cli::parse_from(["vilibrity", "genres", "--timeout", "0"]);
        assert!(matches!(
            cli.client_config(None),
            Err(CliError::InvalidTimeout(0))
        ));
    }

    #[test]
    fn test_client_config_rejects_bad_env_url() {
        let cli = Cli::parse_from(["vilibrity", "genres"]);
        assert!(matches!(
            cli.client_config(Some("localhost".to_string())),
            Err(CliError::InvalidBaseUrl(_))
        ));
    }
}
