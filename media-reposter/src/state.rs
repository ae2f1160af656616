use crate::filter::ExclusionReason;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Mutable bookkeeping for a single run. Created at run start, threaded by
/// `&mut` through aggregation and execution, then discarded.
#[derive(Debug, Default)]
pub struct RunContext {
    exclusions: BTreeMap<ExclusionReason, usize>,
    per_author: HashMap<String, u32>,
    pub scanned: usize,
    pub reposted: u32,
    pub liked: u32,
    pub failed: u32,
    pub author_capped: u32,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_exclusion(&mut self, reason: ExclusionReason) {
        *self.exclusions.entry(reason).or_insert(0) += 1;
    }

    pub fn exclusions(&self, reason: ExclusionReason) -> usize {
        self.exclusions.get(&reason).copied().unwrap_or(0)
    }

    pub fn actions_for(&self, author_key: &str) -> u32 {
        self.per_author.get(author_key).copied().unwrap_or(0)
    }

    /// Count a successful primary action against the run and its author.
    pub fn record_repost(&mut self, author_key: &str) {
        self.reposted += 1;
        *self.per_author.entry(author_key.to_string()).or_insert(0) += 1;
    }

    pub fn log_exclusions(&self) {
        debug!("Scanned {} items", self.scanned);
        for reason in ExclusionReason::ALL {
            let count = self.exclusions(reason);
            if count > 0 {
                debug!("  excluded {}: {}", reason, count);
            }
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            scanned: self.scanned,
            excluded: self.exclusions.values().sum(),
            reposted: self.reposted,
            liked: self.liked,
            failed: self.failed,
            author_capped: self.author_capped,
        }
    }
}

/// Outcome of a run as reported to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub scanned: usize,
    pub excluded: usize,
    pub reposted: u32,
    pub liked: u32,
    pub failed: u32,
    pub author_capped: u32,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            "Done: {} reposts ({} liked), {} failed, {} skipped by author cap",
            self.reposted, self.liked, self.failed, self.author_capped
        );
    }
}
