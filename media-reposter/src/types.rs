use chrono::{DateTime, Utc};
// The wire-level payloads and the client boundary live in the interfaces crate
pub use interfaces::defs::{Embed, FeedViewPost, ListItemView, Page, PostRecord, PostView, ProfileView, SocialClient, StrongRef};

pub const AT_URI_SCHEME: &str = "at://";

/// Which kind of collection a configured source points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Feed,
    List,
}

impl SourceKind {
    /// Collection segment of the canonical `at://` identifier.
    pub fn collection(&self) -> &'static str {
        match self {
            SourceKind::Feed => "app.bsky.feed.generator",
            SourceKind::List => "app.bsky.graph.list",
        }
    }

    /// Path segment of the shareable web link (`/profile/<actor>/<segment>/<rkey>`).
    pub fn web_segment(&self) -> &'static str {
        match self {
            SourceKind::Feed => "feed",
            SourceKind::List => "lists",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Feed => "feed",
            SourceKind::List => "list",
        }
    }
}

/// A configured feed or list. Built once at run start and never mutated.
#[derive(Debug, Clone)]
pub struct Source {
    pub kind: SourceKind,
    pub key: String,
    pub note: Option<String>,
    pub link: String,
    /// Canonical identifier, `None` when the link could not be resolved.
    pub uri: Option<String>,
}

impl Source {
    pub fn label(&self) -> String {
        match &self.note {
            Some(note) => format!("{} ({})", self.key, note),
            None => self.key.clone(),
        }
    }
}

/// A post that passed the content filter and may be acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub uri: String,
    pub cid: String,
    pub created_at: DateTime<Utc>,
    /// Stable id, else lowercase handle, else the post uri. Never empty.
    pub author_key: String,
}

impl Candidate {
    pub fn subject(&self) -> StrongRef {
        StrongRef {
            uri: self.uri.clone(),
            cid: self.cid.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "media-reposter/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReposterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReposterError {
    /// Whether a read-only request that failed this way is worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ReposterError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ReposterError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReposterError>;
