use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://d-r-framework-03171bbf61e6.herokuapp.com/";

const TIMESTAMP_FILE: &str = "refresh_timestamp.json";

/// Largest refresh window a time delta can hold, in seconds
pub const MAX_REFRESH_WINDOW: u64 = i64::MAX as u64 / 1000;

/// DRF Social - command line client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// API origin
    #[arg(short = 'u', long, env = "API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Seconds after the last refresh before requests refresh again
    #[arg(long, env = "TOKEN_REFRESH_WINDOW", default_value = "240")]
    pub refresh_window: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Directory for persisted client state
    #[arg(long, env = "STATE_DIR")]
    pub state_dir: Option<String>,

    /// Run one command and exit instead of starting the shell
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Commands understood on the command line and in the shell
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the signed-in user
    Whoami,
    /// Sign in (prompts for the password)
    Login { username: String },
    /// Create an account (prompts for the password)
    Signup { username: String },
    /// Sign out
    Logout,
    /// Most followed profiles
    Leaderboard,
    /// Show a profile
    Profile { id: u64 },
    /// Follow a profile
    Follow { id: u64 },
    /// Unfollow a profile
    Unfollow { id: u64 },
    /// Navigation links for the current session
    Nav,
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Clone, Debug)]
pub struct Config {
    // API
    pub base_url: String,

    // Session
    pub token_refresh_window: u64,
    pub state_dir: PathBuf,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV > .env > defaults
    /// Also returns the one-shot command, if any.
    pub fn load() -> Result<(Self, Option<Command>)> {
        dotenvy::dotenv().ok();
        Ok(Self::from_args(CliArgs::parse()))
    }

    pub fn from_args(args: CliArgs) -> (Self, Option<Command>) {
        let config = Config {
            base_url: args.base_url,

            token_refresh_window: args.refresh_window,

            state_dir: args
                .state_dir
                .map(|s| expand_tilde(&s))
                .unwrap_or_else(default_state_dir),

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_request_timeout: args.http_timeout,

            log_level: args.log_level,
        };

        (config, args.command)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("API_BASE_URL is not a valid URL: {}", self.base_url))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("API_BASE_URL must be http or https: {}", self.base_url);
        }

        if self.token_refresh_window == 0 {
            anyhow::bail!("TOKEN_REFRESH_WINDOW must be greater than zero");
        }

        if self.token_refresh_window > MAX_REFRESH_WINDOW {
            anyhow::bail!(
                "TOKEN_REFRESH_WINDOW must be at most {} seconds",
                MAX_REFRESH_WINDOW
            );
        }

        Ok(())
    }

    /// Where the refresh timestamp is persisted
    pub fn timestamp_path(&self) -> PathBuf {
        self.state_dir.join(TIMESTAMP_FILE)
    }
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("drf-social"))
        .unwrap_or_else(|| PathBuf::from(".drf-social"))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
