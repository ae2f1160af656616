use crate::aggregator::ScanLimits;
use crate::executor::ExecutorConfig;
use crate::types::{ReposterError, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const MAX_FEEDS: usize = 10;
pub const MAX_LISTS: usize = 10;
pub const MAX_EXEMPTIONS: usize = 10;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "media_reposter=info";

/// Log filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[derive(Parser, Debug, Clone)]
#[command(name = "media-reposter")]
#[command(about = "Reposts and likes recent media posts from configured feeds and lists")]
pub struct Cli {
    /// Account handle or email used to log in
    #[arg(long, env = "BSKY_USERNAME")]
    pub username: Option<String>,

    /// App password for the account
    #[arg(long, env = "BSKY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Base URL of the account's server
    #[arg(long, env = "BSKY_SERVICE", default_value = "https://bsky.social")]
    pub service: String,

    /// Only posts created within this many hours are eligible
    #[arg(long, env = "HOURS_BACK", default_value_t = 3)]
    pub hours_back: u32,

    /// Maximum reposts per run
    #[arg(long, env = "MAX_PER_RUN", default_value_t = 100)]
    pub max_per_run: u32,

    /// Maximum reposts per author per run
    #[arg(long, env = "MAX_PER_USER", default_value_t = 5)]
    pub max_per_user: u32,

    /// Maximum members scanned per list
    #[arg(long, env = "LIST_MEMBER_LIMIT", default_value_t = 50)]
    pub list_member_limit: usize,

    /// Posts scanned per list member
    #[arg(long, env = "AUTHOR_POSTS_PER_MEMBER", default_value_t = 10)]
    pub author_posts_per_member: usize,

    /// Maximum items scanned per feed
    #[arg(long, env = "MAX_FEED_ITEMS", default_value_t = 1000)]
    pub max_feed_items: usize,

    /// Ledger of already reposted posts
    #[arg(long, env = "REPOST_LOG_FILE", default_value = "reposted.txt")]
    pub ledger: PathBuf,

    /// TOML file listing feeds, lists and exempted handles
    #[arg(long, env = "SOURCES_FILE", default_value = "sources.toml")]
    pub sources: PathBuf,
}

impl Cli {
    /// Username and password, if both are set and non-blank.
    pub fn credentials(&self) -> Option<(String, String)> {
        let username = self.username.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
        Some((username.to_string(), password.to_string()))
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            hours_back: self.hours_back,
            ledger_path: self.ledger.clone(),
            scan: ScanLimits {
                max_feed_items: self.max_feed_items,
                list_member_limit: self.list_member_limit,
                author_posts_per_member: self.author_posts_per_member,
            },
            executor: ExecutorConfig {
                max_per_run: self.max_per_run,
                max_per_user: self.max_per_user,
                ..ExecutorConfig::default()
            },
        }
    }
}

/// Everything a run needs besides the client and the sources.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub hours_back: u32,
    pub ledger_path: PathBuf,
    pub scan: ScanLimits,
    pub executor: ExecutorConfig,
}

impl RunConfig {
    pub fn new(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            hours_back: 3,
            ledger_path: ledger_path.into(),
            scan: ScanLimits::default(),
            executor: ExecutorConfig::default(),
        }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(i64::from(self.hours_back))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceEntry {
    pub key: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// The static source list: feeds, lists and reply-exempted handles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub exemptions: Vec<String>,
    #[serde(default)]
    pub feeds: Vec<SourceEntry>,
    #[serde(default)]
    pub lists: Vec<SourceEntry>,
}

impl SourcesConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReposterError::Config(format!("sources file not found: {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: SourcesConfig = toml::from_str(content)?;
        Ok(raw.normalized())
    }

    /// Drop blank entries, tidy notes and handles, and enforce the upper counts.
    pub fn normalized(self) -> Self {
        let feeds = tidy_entries(self.feeds, MAX_FEEDS, "feeds");
        let lists = tidy_entries(self.lists, MAX_LISTS, "lists");

        let mut exemptions: Vec<String> = Vec::new();
        for handle in self.exemptions {
            let handle = handle.trim().to_lowercase();
            if !handle.is_empty() && !exemptions.contains(&handle) {
                exemptions.push(handle);
            }
        }
        if exemptions.len() > MAX_EXEMPTIONS {
            warn!("{} exempted handles configured, keeping the first {}", exemptions.len(), MAX_EXEMPTIONS);
            exemptions.truncate(MAX_EXEMPTIONS);
        }

        Self {
            exemptions,
            feeds,
            lists,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty() && self.lists.is_empty()
    }

    pub fn exemption_set(&self) -> HashSet<String> {
        self.exemptions.iter().map(|h| h.to_lowercase()).collect()
    }
}

fn tidy_entries(entries: Vec<SourceEntry>, max: usize, what: &str) -> Vec<SourceEntry> {
    let mut kept: Vec<SourceEntry> = entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.link.trim().to_string();
            if link.is_empty() {
                return None;
            }
            let note = entry
                .note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty());
            Some(SourceEntry {
                key: entry.key.trim().to_string(),
                link,
                note,
            })
        })
        .collect();

    if kept.len() > max {
        warn!("{} {} configured, keeping the first {}", kept.len(), what, max);
        kept.truncate(max);
    }
    kept
}
