use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{CommitStatus, Forge, PullRequest, ReactionKind, Repo};

/// Page size for the REST endpoints; 100 is the API maximum.
const PER_PAGE: u8 = 100;

const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Returns the first non-blank token among `TOKEN_VARS`.
fn token_from_env<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    TOKEN_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

pub fn get_github_token() -> Result<String> {
    // Prefer environment variables over gh CLI to avoid subprocess overhead.
    if let Some(token) = token_from_env(|var| std::env::var(var).ok()) {
        return Ok(token);
    }

    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("Neither GITHUB_TOKEN nor GH_TOKEN is set and 'gh' could not be run")?;

    if !output.status.success() {
        anyhow::bail!("Failed to get GitHub token from gh CLI. Please run 'gh auth login' first");
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("Empty token returned from gh CLI");
    }

    Ok(token)
}

/// Creates an authenticated GitHub client using available credentials.
pub fn setup_github_client() -> Result<Octocrab> {
    let token = get_github_token().context("Failed to obtain GitHub authentication token")?;
    Octocrab::builder()
        .personal_token(token)
        .build()
        .context("Failed to create GitHub client")
}

#[derive(Debug, Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CreatedComment {
    id: u64,
}

/// [`Forge`] backed by the GitHub REST API.
pub struct GitHub {
    client: Octocrab,
}

impl GitHub {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Builds a client from `GITHUB_TOKEN`, `GH_TOKEN` or the gh CLI.
    pub fn from_env() -> Result<Self> {
        setup_github_client().map(Self::new)
    }

    /// Fetches every page of a list endpoint.
    async fn get_all_pages<T>(&self, route: &str) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let params = PageParams {
                per_page: PER_PAGE,
                page,
            };
            let batch: Vec<T> = self
                .client
                .get(route, Some(&params))
                .await
                .with_context(|| format!("GET {route} (page {page}) failed"))?;

            let done = batch.len() < usize::from(PER_PAGE);
            items.extend(batch);

            if done {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

#[async_trait]
impl Forge for GitHub {
    async fn search_pull_requests(&self, query: &str, limit: usize) -> Result<Vec<PullRequest>> {
        debug!("Searching: {}", query);

        let mut prs = Vec::new();
        let mut page_num = 1u32;

        while prs.len() < limit {
            let page = self
                .client
                .search()
                .issues_and_pull_requests(query)
                .sort("updated")
                .order("desc")
                .per_page(PER_PAGE)
                .page(page_num)
                .send()
                .await
                .with_context(|| format!("Search failed for query '{query}'"))?;

            let has_next = page.next.is_some() && !page.items.is_empty();

            for issue in page.items.into_iter().take(limit - prs.len()) {
                let url = issue.html_url.to_string();
                let (repo, _) = Repo::parse_url(&url)
                    .with_context(|| format!("Unexpected search result URL: '{url}'"))?;
                prs.push(PullRequest {
                    repo,
                    number: issue.number,
                    title: issue.title,
                    url,
                });
            }

            if !has_next {
                break;
            }
            page_num += 1;
        }

        debug!("Search returned {} pull requests", prs.len());
        Ok(prs)
    }

    async fn list_commits(&self, repo: &Repo, number: u64) -> Result<Vec<String>> {
        debug!("Listing commits for {}#{}", repo, number);
        let route = format!("/repos/{}/{}/pulls/{}/commits", repo.owner(), repo.name(), number);
        let commits: Vec<CommitPayload> = self.get_all_pages(&route).await?;
        Ok(commits.into_iter().map(|c| c.sha).collect())
    }

    async fn list_statuses(&self, repo: &Repo, sha: &str) -> Result<Vec<CommitStatus>> {
        debug!("Listing statuses for {} @ {}", repo, sha);
        let route = format!("/repos/{}/{}/commits/{}/statuses", repo.owner(), repo.name(), sha);
        self.get_all_pages(&route).await
    }

    async fn create_comment(&self, repo: &Repo, number: u64, body: &str) -> Result<u64> {
        debug!("Commenting on {}#{}: {}", repo, number, body);
        let route = format!("/repos/{}/{}/issues/{}/comments", repo.owner(), repo.name(), number);
        let comment: CreatedComment = self
            .client
            .post(&route, Some(&serde_json::json!({ "body": body })))
            .await
            .with_context(|| format!("Failed to comment on {repo}#{number}"))?;
        Ok(comment.id)
    }

    async fn create_comment_reaction(
        &self,
        repo: &Repo,
        comment_id: u64,
        reaction: ReactionKind,
    ) -> Result<()> {
        debug!("Reacting '{}' to comment {} in {}", reaction, comment_id, repo);
        let route = format!(
            "/repos/{}/{}/issues/comments/{}/reactions",
            repo.owner(),
            repo.name(),
            comment_id
        );
        let _: serde_json::Value = self
            .client
            .post(&route, Some(&serde_json::json!({ "content": reaction.as_str() })))
            .await
            .with_context(|| format!("Failed to add reaction to comment {comment_id}"))?;
        Ok(())
    }
}
