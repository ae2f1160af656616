#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use media_reposter::{FeedViewPost, ListItemView, Page, SocialClient, StrongRef};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Fixed clock used across tests.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - chrono::Duration::hours(hours)
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - chrono::Duration::minutes(minutes)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn images_embed() -> Value {
    json!({
        "$type": "app.bsky.embed.images",
        "images": [{ "alt": "", "image": { "$type": "blob", "mimeType": "image/jpeg", "size": 1024 } }]
    })
}

pub fn video_embed() -> Value {
    json!({
        "$type": "app.bsky.embed.video",
        "video": { "$type": "blob", "mimeType": "video/mp4", "size": 4096 }
    })
}

pub fn external_embed() -> Value {
    json!({
        "$type": "app.bsky.embed.external",
        "external": { "uri": "https://example.com", "title": "Example", "description": "" }
    })
}

pub fn quote_embed() -> Value {
    json!({
        "$type": "app.bsky.embed.record",
        "record": { "uri": "at://did:plc:other/app.bsky.feed.post/q1", "cid": "bafyquote" }
    })
}

pub fn quote_with_media_embed() -> Value {
    json!({
        "$type": "app.bsky.embed.recordWithMedia",
        "record": { "record": { "uri": "at://did:plc:other/app.bsky.feed.post/q2", "cid": "bafyquote2" } },
        "media": images_embed()
    })
}

/// Builds feed entries through the same JSON shape the network returns.
#[derive(Debug, Clone)]
pub struct PostFixture {
    uri: String,
    cid: String,
    handle: Option<String>,
    did: Option<String>,
    created_at: Option<String>,
    created_at_snake: Option<String>,
    post_indexed_at: Option<String>,
    embed: Option<Value>,
    reply: bool,
    boosted: bool,
}

impl PostFixture {
    pub fn new(rkey: &str) -> Self {
        Self {
            uri: format!("at://did:plc:alice/app.bsky.feed.post/{}", rkey),
            cid: format!("bafy{}", rkey),
            handle: Some("alice.test".to_string()),
            did: Some("did:plc:alice".to_string()),
            created_at: Some(stamp(minutes_ago(60))),
            created_at_snake: None,
            post_indexed_at: None,
            embed: Some(images_embed()),
            reply: false,
            boosted: false,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    pub fn by(mut self, handle: Option<&str>, did: Option<&str>) -> Self {
        self.handle = handle.map(str::to_string);
        self.did = did.map(str::to_string);
        self
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(stamp(at));
        self
    }

    pub fn created_raw(mut self, value: &str) -> Self {
        self.created_at = Some(value.to_string());
        self
    }

    pub fn created_snake(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = None;
        self.created_at_snake = Some(stamp(at));
        self
    }

    pub fn indexed(mut self, at: DateTime<Utc>) -> Self {
        self.post_indexed_at = Some(stamp(at));
        self
    }

    pub fn no_timestamp(mut self) -> Self {
        self.created_at = None;
        self.created_at_snake = None;
        self.post_indexed_at = None;
        self
    }

    pub fn embed(mut self, embed: Option<Value>) -> Self {
        self.embed = embed;
        self
    }

    pub fn reply(mut self) -> Self {
        self.reply = true;
        self
    }

    pub fn boosted(mut self) -> Self {
        self.boosted = true;
        self
    }

    pub fn to_json(&self) -> Value {
        let mut author = serde_json::Map::new();
        if let Some(did) = &self.did {
            author.insert("did".into(), json!(did));
        }
        if let Some(handle) = &self.handle {
            author.insert("handle".into(), json!(handle));
        }

        let mut record = serde_json::Map::new();
        record.insert("$type".into(), json!("app.bsky.feed.post"));
        record.insert("text".into(), json!("look at this"));
        if let Some(created_at) = &self.created_at {
            record.insert("createdAt".into(), json!(created_at));
        }
        if let Some(created_at) = &self.created_at_snake {
            record.insert("created_at".into(), json!(created_at));
        }
        if let Some(embed) = &self.embed {
            record.insert("embed".into(), embed.clone());
        }
        if self.reply {
            record.insert(
                "reply".into(),
                json!({
                    "root": { "uri": "at://did:plc:root/app.bsky.feed.post/r", "cid": "bafyroot" },
                    "parent": { "uri": "at://did:plc:root/app.bsky.feed.post/r", "cid": "bafyroot" }
                }),
            );
        }

        let mut post = serde_json::Map::new();
        post.insert("uri".into(), json!(self.uri));
        post.insert("cid".into(), json!(self.cid));
        post.insert("author".into(), Value::Object(author));
        post.insert("record".into(), Value::Object(record));
        if let Some(indexed_at) = &self.post_indexed_at {
            post.insert("indexedAt".into(), json!(indexed_at));
        }

        let mut item = serde_json::Map::new();
        item.insert("post".into(), Value::Object(post));
        if self.boosted {
            item.insert(
                "reason".into(),
                json!({
                    "$type": "app.bsky.feed.defs#reasonRepost",
                    "by": { "did": "did:plc:booster", "handle": "booster.test" }
                }),
            );
        }
        Value::Object(item)
    }

    pub fn build(&self) -> FeedViewPost {
        serde_json::from_value(self.to_json()).expect("post fixture should deserialize")
    }
}

pub fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn member(handle: &str, did: Option<&str>) -> ListItemView {
    let mut subject = serde_json::Map::new();
    subject.insert("handle".into(), json!(handle));
    if let Some(did) = did {
        subject.insert("did".into(), json!(did));
    }
    serde_json::from_value(json!({
        "uri": format!("at://did:plc:curator/app.bsky.graph.listitem/{}", handle),
        "subject": Value::Object(subject)
    }))
    .expect("list item fixture should deserialize")
}

/// Scripted in-memory client. Pages are addressed by index; the cursor of
/// page `i` is `i + 1` while more pages remain.
#[derive(Default)]
pub struct FakeClient {
    handles: HashMap<String, String>,
    feeds: HashMap<String, Vec<Vec<FeedViewPost>>>,
    lists: HashMap<String, Vec<Vec<ListItemView>>>,
    authors: HashMap<String, Vec<FeedViewPost>>,
    feed_failures: HashMap<String, usize>,
    list_failures: HashMap<String, usize>,
    failing_authors: HashSet<String>,
    failing_reposts: HashSet<String>,
    failing_likes: HashSet<String>,

    pub resolved: Mutex<Vec<String>>,
    pub feed_calls: Mutex<Vec<(String, Option<String>)>>,
    pub list_calls: Mutex<Vec<(String, Option<String>)>>,
    pub author_calls: Mutex<Vec<(String, usize)>>,
    pub repost_attempts: Mutex<Vec<StrongRef>>,
    pub reposts: Mutex<Vec<StrongRef>>,
    pub likes: Mutex<Vec<StrongRef>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handle(mut self, handle: &str, did: &str) -> Self {
        self.handles.insert(handle.to_string(), did.to_string());
        self
    }

    pub fn with_feed(mut self, feed_uri: &str, pages: Vec<Vec<FeedViewPost>>) -> Self {
        self.feeds.insert(feed_uri.to_string(), pages);
        self
    }

    pub fn with_list(mut self, list_uri: &str, pages: Vec<Vec<ListItemView>>) -> Self {
        self.lists.insert(list_uri.to_string(), pages);
        self
    }

    pub fn with_author(mut self, actor: &str, items: Vec<FeedViewPost>) -> Self {
        self.authors.insert(actor.to_string(), items);
        self
    }

    pub fn fail_feed_page(mut self, feed_uri: &str, page: usize) -> Self {
        self.feed_failures.insert(feed_uri.to_string(), page);
        self
    }

    pub fn fail_list_page(mut self, list_uri: &str, page: usize) -> Self {
        self.list_failures.insert(list_uri.to_string(), page);
        self
    }

    pub fn fail_author(mut self, actor: &str) -> Self {
        self.failing_authors.insert(actor.to_string());
        self
    }

    pub fn fail_repost(mut self, uri: &str) -> Self {
        self.failing_reposts.insert(uri.to_string());
        self
    }

    pub fn fail_like(mut self, uri: &str) -> Self {
        self.failing_likes.insert(uri.to_string());
        self
    }

    pub fn reposted_uris(&self) -> Vec<String> {
        self.reposts.lock().unwrap().iter().map(|s| s.uri.clone()).collect()
    }

    pub fn liked_uris(&self) -> Vec<String> {
        self.likes.lock().unwrap().iter().map(|s| s.uri.clone()).collect()
    }
}

fn page_of<T: Clone>(pages: &[Vec<T>], cursor: Option<&str>) -> Result<(usize, Page<T>)> {
    let index = match cursor {
        Some(c) => c.parse::<usize>()?,
        None => 0,
    };
    let items = pages.get(index).cloned().unwrap_or_default();
    let cursor = (index + 1 < pages.len()).then(|| (index + 1).to_string());
    Ok((index, Page { items, cursor }))
}

#[async_trait]
impl SocialClient for FakeClient {
    async fn resolve_identity(&self, handle: &str) -> Result<String> {
        self.resolved.lock().unwrap().push(handle.to_string());
        self.handles
            .get(handle)
            .cloned()
            .ok_or_else(|| anyhow!("Unable to resolve handle: {}", handle))
    }

    async fn fetch_feed_page(&self, feed_uri: &str, _limit: usize, cursor: Option<&str>) -> Result<Page<FeedViewPost>> {
        self.feed_calls
            .lock()
            .unwrap()
            .push((feed_uri.to_string(), cursor.map(str::to_string)));
        let pages = self.feeds.get(feed_uri).ok_or_else(|| anyhow!("unknown feed {}", feed_uri))?;
        let (index, page) = page_of(pages, cursor)?;
        if self.feed_failures.get(feed_uri) == Some(&index) {
            return Err(anyhow!("feed page {} unavailable", index));
        }
        Ok(page)
    }

    async fn fetch_list_page(&self, list_uri: &str, _limit: usize, cursor: Option<&str>) -> Result<Page<ListItemView>> {
        self.list_calls
            .lock()
            .unwrap()
            .push((list_uri.to_string(), cursor.map(str::to_string)));
        let pages = self.lists.get(list_uri).ok_or_else(|| anyhow!("unknown list {}", list_uri))?;
        let (index, page) = page_of(pages, cursor)?;
        if self.list_failures.get(list_uri) == Some(&index) {
            return Err(anyhow!("list page {} unavailable", index));
        }
        Ok(page)
    }

    async fn fetch_author_page(&self, actor: &str, limit: usize) -> Result<Vec<FeedViewPost>> {
        self.author_calls.lock().unwrap().push((actor.to_string(), limit));
        if self.failing_authors.contains(actor) {
            return Err(anyhow!("author feed for {} unavailable", actor));
        }
        let mut items = self.authors.get(actor).cloned().unwrap_or_default();
        items.truncate(limit);
        Ok(items)
    }

    async fn submit_repost(&self, subject: &StrongRef) -> Result<()> {
        self.repost_attempts.lock().unwrap().push(subject.clone());
        if self.failing_reposts.contains(&subject.uri) {
            return Err(anyhow!("repost rejected"));
        }
        self.reposts.lock().unwrap().push(subject.clone());
        Ok(())
    }

    async fn submit_like(&self, subject: &StrongRef) -> Result<()> {
        if self.failing_likes.contains(&subject.uri) {
            return Err(anyhow!("like rejected"));
        }
        self.likes.lock().unwrap().push(subject.clone());
        Ok(())
    }
}
