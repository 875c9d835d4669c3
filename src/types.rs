use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Errors produced while parsing repository identifiers and URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    EmptyOwner,
    EmptyName,
    InvalidFormat(String),
    InvalidUrl(String),
    NotGitHub(String),
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::EmptyOwner => write!(f, "repository owner cannot be empty"),
            RepoError::EmptyName => write!(f, "repository name cannot be empty"),
            RepoError::InvalidFormat(s) => {
                write!(f, "repository must be in format 'owner/repo', got: '{s}'")
            }
            RepoError::InvalidUrl(s) => write!(f, "not a repository URL: '{s}'"),
            RepoError::NotGitHub(s) => write!(f, "URL must point at github.com, got: '{s}'"),
        }
    }
}

impl std::error::Error for RepoError {}

/// A GitHub repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo {
    owner: String,
    name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoError> {
        let owner = owner.into();
        let name = name.into();
        if owner.trim().is_empty() {
            return Err(RepoError::EmptyOwner);
        }
        if name.trim().is_empty() {
            return Err(RepoError::EmptyName);
        }
        Ok(Self { owner, name })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parses an `owner/name` pair.
    pub fn parse(s: &str) -> Result<Self, RepoError> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] => Repo::new(*owner, *name),
            _ => Err(RepoError::InvalidFormat(s.to_string())),
        }
    }

    /// Extracts the repository from a GitHub HTML URL such as
    /// `https://github.com/openshift/installer/pull/42`.
    ///
    /// The number is returned when the path continues with `pull/<n>` or
    /// `issues/<n>`.
    pub fn parse_url(s: &str) -> Result<(Self, Option<u64>), RepoError> {
        let url = url::Url::parse(s).map_err(|_| RepoError::InvalidUrl(s.to_string()))?;

        if url.host_str() != Some("github.com") {
            return Err(RepoError::NotGitHub(s.to_string()));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let [owner, name, rest @ ..] = segments.as_slice() else {
            return Err(RepoError::InvalidUrl(s.to_string()));
        };

        let number = match rest {
            ["pull" | "issues", number, ..] => number.parse().ok(),
            _ => None,
        };

        Ok((Repo::new(*owner, *name)?, number))
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Pull request found by the search.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub repo: Repo,
    pub number: u64,
    pub title: String,
    pub url: String,
}

/// State of a commit status report as reported by the statuses API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Error,
    Failure,
    Pending,
    Success,
    #[serde(other)]
    Unknown,
}

/// A single status report attached to a commit. The `context` names the
/// check (e.g. `ci/prow/e2e-aws`); a check may report many times.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitStatus {
    pub context: String,
    pub state: StatusState,
    #[serde(default)]
    pub target_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A pull request whose head commit has at least one failing check.
#[derive(Debug, Clone)]
pub struct RetestCandidate {
    pub pr: PullRequest,
    pub failures: Vec<CommitStatus>,
}

/// What happened when a retest was triggered for a candidate.
#[derive(Debug, Clone)]
pub struct RetestOutcome {
    pub candidate: RetestCandidate,
    /// Id of the posted comment; `None` when nothing was posted.
    pub comment_id: Option<u64>,
    pub reaction_error: Option<String>,
}

/// Result of one complete run.
#[derive(Debug)]
pub struct RunResult {
    pub candidates_found: usize,
    pub outcomes: Vec<RetestOutcome>,
}

/// Reactions the API accepts on an issue comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReactionKind {
    #[value(name = "+1")]
    PlusOne,
    #[value(name = "-1")]
    MinusOne,
    Laugh,
    Confused,
    Heart,
    Hooray,
    Rocket,
    Eyes,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::PlusOne => "+1",
            ReactionKind::MinusOne => "-1",
            ReactionKind::Laugh => "laugh",
            ReactionKind::Confused => "confused",
            ReactionKind::Heart => "heart",
            ReactionKind::Hooray => "hooray",
            ReactionKind::Rocket => "rocket",
            ReactionKind::Eyes => "eyes",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved settings for a single run.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub org: String,
    pub author: String,
    pub comment: String,
    pub reaction: ReactionKind,
    pub dry_run: bool,
    pub limit: usize,
}

/// The hosted code-review service the pipeline talks to.
#[async_trait]
pub trait Forge {
    /// Searches issues and pull requests, most recently updated first.
    async fn search_pull_requests(
        &self,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<PullRequest>>;

    /// Lists commit SHAs of a pull request in the order they were added.
    async fn list_commits(&self, repo: &Repo, number: u64) -> anyhow::Result<Vec<String>>;

    async fn list_statuses(&self, repo: &Repo, sha: &str) -> anyhow::Result<Vec<CommitStatus>>;

    /// Posts a comment on an issue or pull request and returns its id.
    async fn create_comment(&self, repo: &Repo, number: u64, body: &str) -> anyhow::Result<u64>;

    async fn create_comment_reaction(
        &self,
        repo: &Repo,
        comment_id: u64,
        reaction: ReactionKind,
    ) -> anyhow::Result<()>;
}
