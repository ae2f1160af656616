use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a feed or author timeline as the network returns it.
///
/// Every field is optional: payloads are read as-is and the content filter
/// decides what an absent field means.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedViewPost {
    pub post: Option<PostView>,
    /// Set when the entry is a reshare of `post` by somebody else.
    pub reason: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostView {
    pub uri: Option<String>,
    pub cid: Option<String>,
    pub author: Option<ProfileView>,
    pub record: Option<PostRecord>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileView {
    pub did: Option<String>,
    pub handle: Option<String>,
}

/// The content record the author wrote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostRecord {
    /// Parent/root references; present only on replies.
    pub reply: Option<Value>,
    pub embed: Option<Embed>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Timestamp fields that may appear on a record or a post view.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Timestamps {
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "indexedAt")]
    pub indexed_at: Option<String>,
    #[serde(rename = "created_at")]
    pub created_at_snake: Option<String>,
    pub timestamp: Option<String>,
}

/// A record embed. Images, video, link previews and quotes all share this shape;
/// `media` carries the attachment of a quote-with-media embed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Embed {
    #[serde(rename = "$type")]
    pub kind: Option<String>,
    pub images: Option<Vec<Value>>,
    pub video: Option<Value>,
    pub external: Option<Value>,
    pub record: Option<Value>,
    pub media: Option<Box<Embed>>,
}

/// One membership entry of a curated list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListItemView {
    pub subject: Option<ProfileView>,
}

/// A page of a cursor-paginated enumeration.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
}

/// Address of a post an action refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

// Callers await each request before issuing the next one.

#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Map a handle to its stable identity id.
    async fn resolve_identity(&self, handle: &str) -> Result<String>;

    async fn fetch_feed_page(&self, feed_uri: &str, limit: usize, cursor: Option<&str>) -> Result<Page<FeedViewPost>>;

    async fn fetch_list_page(&self, list_uri: &str, limit: usize, cursor: Option<&str>) -> Result<Page<ListItemView>>;

    /// The actor's own recent timeline, newest first.
    async fn fetch_author_page(&self, actor: &str, limit: usize) -> Result<Vec<FeedViewPost>>;

    async fn submit_repost(&self, subject: &StrongRef) -> Result<()>;

    async fn submit_like(&self, subject: &StrongRef) -> Result<()>;
}
