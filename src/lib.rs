//! Autoretest: re-runs failed CI on approved pull requests.
//!
//! Searches GitHub for open pull requests by a given author that carry
//! both the `approved` and `lgtm` labels, inspects the commit statuses of
//! each head commit, and posts a `/retest` comment wherever the latest
//! report of some check is a failure.

pub mod cli;
pub mod failures;
pub mod github;
pub mod report;
pub mod retest;
pub mod search;
pub mod types;

pub use cli::parse_args;
pub use failures::find_latest_failures;
pub use github::GitHub;
pub use report::display_candidates;
pub use retest::{find_retest_candidates, run, trigger_retests};
pub use search::{DEFAULT_ORG, KnownLabel, SearchQueryBuilder, SearchState, build_search_query};
pub use types::{
    CommitStatus, Forge, PullRequest, ReactionKind, Repo, RepoError, RetestCandidate,
    RetestOutcome, RunResult, RunSpec, StatusState,
};
