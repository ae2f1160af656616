use crate::ledger::Ledger;
use crate::state::RunContext;
use crate::types::{Candidate, SocialClient};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_per_run: u32,
    pub max_per_user: u32,
    /// Pause after a successful repost.
    pub success_delay: Duration,
    /// Pause after a failed repost.
    pub failure_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_per_run: 100,
            max_per_user: 5,
            success_delay: Duration::from_secs(2),
            failure_delay: Duration::from_secs(8),
        }
    }
}

/// Drains the ordered candidate list once, front to back, under the run and
/// per-author budgets.
pub struct ActionExecutor<'a> {
    client: &'a dyn SocialClient,
    config: ExecutorConfig,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(client: &'a dyn SocialClient, config: ExecutorConfig) -> Self {
        Self { client, config }
    }

    pub async fn execute(&self, candidates: &[Candidate], ledger: &mut Ledger, ctx: &mut RunContext) {
        for candidate in candidates {
            if ctx.reposted >= self.config.max_per_run {
                info!("Reached {} reposts for this run, stopping", self.config.max_per_run);
                break;
            }

            if ctx.actions_for(&candidate.author_key) >= self.config.max_per_user {
                debug!("Author cap reached for {}, skipping {}", candidate.author_key, candidate.uri);
                ctx.author_capped += 1;
                continue;
            }

            let subject = candidate.subject();
            match self.client.submit_repost(&subject).await {
                Ok(()) => {
                    ctx.record_repost(&candidate.author_key);
                    ledger.insert(candidate.uri.clone());
                    info!("Reposted {}", candidate.uri);

                    // The repost stands whether or not the like goes through
                    match self.client.submit_like(&subject).await {
                        Ok(()) => ctx.liked += 1,
                        Err(e) => warn!("Like error ({}): {}", candidate.uri, e),
                    }

                    pause(self.config.success_delay).await;
                }
                Err(e) => {
                    ctx.failed += 1;
                    warn!("Repost error ({}): {}", candidate.uri, e);
                    pause(self.config.failure_delay).await;
                }
            }
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
