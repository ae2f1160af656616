//! Content policy applied to every enumerated post.
//!
//! Only original posts with image or video attachments qualify. Quotes and
//! reshares never do; replies only when the author is exempted. Rules run in a
//! fixed order and the first one that matches decides the [`ExclusionReason`].

use crate::ledger::Ledger;
use crate::types::{Candidate, Embed, FeedViewPost, PostRecord, PostView};
use chrono::{DateTime, NaiveDateTime, Utc};
use interfaces::defs::Timestamps;
use std::collections::HashSet;
use std::fmt;

const QUOTE_EMBED_TYPES: [&str; 2] = ["app.bsky.embed.record", "app.bsky.embed.recordWithMedia"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExclusionReason {
    /// Post, record, uri or cid missing.
    Malformed,
    Boost,
    Reply,
    Quote,
    NoMedia,
    AlreadyHandled,
    NoTimestamp,
    TooOld,
}

impl ExclusionReason {
    pub const ALL: [ExclusionReason; 8] = [
        ExclusionReason::Malformed,
        ExclusionReason::Boost,
        ExclusionReason::Reply,
        ExclusionReason::Quote,
        ExclusionReason::NoMedia,
        ExclusionReason::AlreadyHandled,
        ExclusionReason::NoTimestamp,
        ExclusionReason::TooOld,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::Malformed => "malformed",
            ExclusionReason::Boost => "boost",
            ExclusionReason::Reply => "reply",
            ExclusionReason::Quote => "quote",
            ExclusionReason::NoMedia => "no_media",
            ExclusionReason::AlreadyHandled => "already_handled",
            ExclusionReason::NoTimestamp => "no_timestamp",
            ExclusionReason::TooOld => "too_old",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether `item` may be acted on.
///
/// `exemptions` must hold lowercase handles; membership only lifts the reply rule.
pub fn eligible(
    item: &FeedViewPost,
    ledger: &Ledger,
    cutoff: DateTime<Utc>,
    exemptions: &HashSet<String>,
) -> std::result::Result<Candidate, ExclusionReason> {
    let post = item.post.as_ref().ok_or(ExclusionReason::Malformed)?;
    let record = post.record.as_ref().ok_or(ExclusionReason::Malformed)?;
    let uri = non_empty(post.uri.as_deref()).ok_or(ExclusionReason::Malformed)?;
    let cid = non_empty(post.cid.as_deref()).ok_or(ExclusionReason::Malformed)?;

    if item.reason.is_some() {
        return Err(ExclusionReason::Boost);
    }

    let author = post.author.as_ref();
    let handle = author
        .and_then(|a| non_empty(a.handle.as_deref()))
        .map(str::to_lowercase);
    let did = author.and_then(|a| non_empty(a.did.as_deref()));

    let exempt = handle.as_ref().is_some_and(|h| exemptions.contains(h));
    if record.reply.is_some() && !exempt {
        return Err(ExclusionReason::Reply);
    }

    let embed = record.embed.as_ref();
    if embed.is_some_and(is_quote) {
        return Err(ExclusionReason::Quote);
    }
    if !embed.is_some_and(has_media) {
        return Err(ExclusionReason::NoMedia);
    }

    if ledger.contains(uri) {
        return Err(ExclusionReason::AlreadyHandled);
    }

    let created_at = created_time(record, post).ok_or(ExclusionReason::NoTimestamp)?;
    if created_at < cutoff {
        return Err(ExclusionReason::TooOld);
    }

    let author_key = did
        .map(str::to_string)
        .or(handle)
        .unwrap_or_else(|| uri.to_string());

    Ok(Candidate {
        uri: uri.to_string(),
        cid: cid.to_string(),
        created_at,
        author_key,
    })
}

/// Embeds another post, with or without attached media.
pub fn is_quote(embed: &Embed) -> bool {
    embed.record.is_some()
        || embed
            .kind
            .as_deref()
            .is_some_and(|kind| QUOTE_EMBED_TYPES.contains(&kind))
}

/// Carries at least one image or a video. Link previews do not count.
pub fn has_media(embed: &Embed) -> bool {
    if embed.images.as_ref().is_some_and(|images| !images.is_empty()) {
        return true;
    }
    if embed.video.is_some() {
        return true;
    }
    if embed.external.is_some() {
        return false;
    }
    embed.media.as_deref().is_some_and(has_media)
}

/// First parseable timestamp, trying the record before the post view for
/// each field in turn.
pub fn created_time(record: &PostRecord, post: &PostView) -> Option<DateTime<Utc>> {
    let record_fields = timestamp_fields(&record.timestamps);
    let post_fields = timestamp_fields(&post.timestamps);

    record_fields
        .into_iter()
        .zip(post_fields)
        .flat_map(|(r, p)| [r, p])
        .flatten()
        .find_map(parse_timestamp)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // Timestamps without an offset are taken as UTC
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn timestamp_fields(ts: &Timestamps) -> [Option<&str>; 4] {
    [
        ts.created_at.as_deref(),
        ts.indexed_at.as_deref(),
        ts.created_at_snake.as_deref(),
        ts.timestamp.as_deref(),
    ]
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
