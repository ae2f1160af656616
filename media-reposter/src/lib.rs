pub mod types;
pub mod normalizer;
pub mod ledger;
pub mod filter;
pub mod state;
pub mod aggregator;
pub mod executor;
pub mod config;
pub mod fetcher;
pub mod pipeline;

pub use types::*;
pub use aggregator::CandidateAggregator;
pub use config::{Cli, RunConfig, SourcesConfig};
pub use executor::ActionExecutor;
pub use fetcher::XrpcClient;
pub use filter::{eligible, ExclusionReason};
pub use ledger::Ledger;
pub use state::{RunContext, RunSummary};
