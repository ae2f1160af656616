use crate::filter::eligible;
use crate::ledger::Ledger;
use crate::state::RunContext;
use crate::types::{Candidate, FeedViewPost, SocialClient, Source, SourceKind};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Page size requested from paginated enumerations.
pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ScanLimits {
    pub max_feed_items: usize,
    pub list_member_limit: usize,
    pub author_posts_per_member: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_feed_items: 1000,
            list_member_limit: 50,
            author_posts_per_member: 10,
        }
    }
}

/// A member of a curated list. `handle` is lowercase and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMember {
    pub handle: String,
    pub did: Option<String>,
}

impl ListMember {
    /// Token used to fetch the member's timeline: stable id first, then handle.
    pub fn actor(&self) -> Option<&str> {
        self.did
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(Some(self.handle.as_str()).filter(|h| !h.is_empty()))
    }
}

/// Pulls posts from every resolved source and reduces them to an ordered,
/// duplicate-free candidate list.
pub struct CandidateAggregator<'a> {
    client: &'a dyn SocialClient,
    limits: ScanLimits,
    cutoff: DateTime<Utc>,
    exemptions: HashSet<String>,
}

impl<'a> CandidateAggregator<'a> {
    pub fn new(
        client: &'a dyn SocialClient,
        limits: ScanLimits,
        cutoff: DateTime<Utc>,
        exemptions: HashSet<String>,
    ) -> Self {
        Self {
            client,
            limits,
            cutoff,
            exemptions,
        }
    }

    pub async fn collect(&self, sources: &[Source], ledger: &Ledger, ctx: &mut RunContext) -> Vec<Candidate> {
        let mut all_candidates = Vec::new();

        for source in sources {
            let Some(uri) = source.uri.as_deref() else {
                debug!("Skipping unresolved {} {}: {}", source.kind.label(), source.key, source.link);
                continue;
            };

            match source.kind {
                SourceKind::Feed => {
                    info!("Processing feed: {}", source.label());
                    match self.fetch_feed_items(uri).await {
                        Ok(items) => {
                            let candidates = self.filter_items(&items, ledger, ctx);
                            debug!("Feed {}: {} items, {} eligible", source.key, items.len(), candidates.len());
                            all_candidates.extend(candidates);
                        }
                        Err(e) => warn!("Feed fetch error ({}): {}", source.key, e),
                    }
                }
                SourceKind::List => {
                    info!("Processing list: {}", source.label());
                    let members = self.fetch_list_members(uri).await;
                    debug!("List {}: {} members", source.key, members.len());

                    for member in &members {
                        let items = self.fetch_member_items(member).await;
                        all_candidates.extend(self.filter_items(&items, ledger, ctx));
                    }
                }
            }
        }

        let candidates = dedupe_candidates(all_candidates);
        info!("Candidates total: {} (after dedupe)", candidates.len());
        ctx.log_exclusions();
        candidates
    }

    /// Page through a feed until the cursor runs out or the item cap is met.
    /// Any page failure fails the whole feed.
    pub async fn fetch_feed_items(&self, feed_uri: &str) -> anyhow::Result<Vec<FeedViewPost>> {
        let max_items = self.limits.max_feed_items;
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        while max_items > 0 {
            let page = self.client.fetch_feed_page(feed_uri, PAGE_SIZE, cursor.as_deref()).await?;
            let page_was_empty = page.items.is_empty();
            items.extend(page.items);
            cursor = page.cursor;

            if cursor.is_none() || page_was_empty || items.len() >= max_items {
                break;
            }
        }

        items.truncate(max_items);
        Ok(items)
    }

    /// Collect up to `list_member_limit` members. A failing page ends the scan
    /// but keeps the members gathered so far.
    pub async fn fetch_list_members(&self, list_uri: &str) -> Vec<ListMember> {
        let limit = self.limits.list_member_limit;
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;

        while members.len() < limit {
            let page = match self.client.fetch_list_page(list_uri, PAGE_SIZE, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("List fetch error ({}): {}", list_uri, e);
                    break;
                }
            };
            let page_was_empty = page.items.is_empty();

            for item in page.items {
                let Some(subject) = item.subject else {
                    continue;
                };
                let handle = subject.handle.unwrap_or_default().to_lowercase();
                let did = subject.did.filter(|d| !d.is_empty());
                if handle.is_empty() && did.is_none() {
                    continue;
                }

                members.push(ListMember { handle, did });
                if members.len() >= limit {
                    break;
                }
            }

            cursor = page.cursor;
            if cursor.is_none() || page_was_empty {
                break;
            }
        }

        members.truncate(limit);
        members
    }

    /// A member's own recent posts. Failures yield nothing for this member only.
    pub async fn fetch_member_items(&self, member: &ListMember) -> Vec<FeedViewPost> {
        let Some(actor) = member.actor() else {
            return Vec::new();
        };
        if self.limits.author_posts_per_member == 0 {
            return Vec::new();
        }

        match self.client.fetch_author_page(actor, self.limits.author_posts_per_member).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Author feed error ({}): {}", actor, e);
                Vec::new()
            }
        }
    }

    pub fn filter_items(&self, items: &[FeedViewPost], ledger: &Ledger, ctx: &mut RunContext) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for item in items {
            ctx.scanned += 1;
            match eligible(item, ledger, self.cutoff, &self.exemptions) {
                Ok(candidate) => candidates.push(candidate),
                Err(reason) => ctx.record_exclusion(reason),
            }
        }
        candidates
    }
}

/// Keep the first candidate per uri, then order by creation time. The sort is
/// stable so ties keep their encounter order.
pub fn dedupe_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| seen.insert(c.uri.clone()))
        .collect();
    unique.sort_by_key(|c| c.created_at);
    unique
}
