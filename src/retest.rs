use std::io::Write;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    failures::find_latest_failures,
    report::display_candidates,
    search::build_search_query,
    types::{Forge, RetestCandidate, RetestOutcome, RunResult, RunSpec},
};

/// Finds the pull requests whose head commit has a check whose latest
/// report is a failure.
///
/// Pull requests are inspected in search order. Any API error aborts the
/// whole search.
pub async fn find_retest_candidates<F>(
    spec: &RunSpec,
    forge: &F,
) -> anyhow::Result<Vec<RetestCandidate>>
where
    F: Forge + Sync,
{
    let query = build_search_query(&spec.org, &spec.author);
    let prs = forge.search_pull_requests(&query, spec.limit).await?;
    info!("Inspecting {} pull requests", prs.len());

    let mut candidates = Vec::new();

    for pr in prs {
        let commits = forge
            .list_commits(&pr.repo, pr.number)
            .await
            .with_context(|| format!("Failed to list commits for {}", pr.url))?;
        let head = commits
            .last()
            .with_context(|| format!("Pull request {} has no commits", pr.url))?;

        let statuses = forge
            .list_statuses(&pr.repo, head)
            .await
            .with_context(|| format!("Failed to list statuses for {} @ {}", pr.url, head))?;

        let failures = find_latest_failures(&statuses);
        if failures.is_empty() {
            debug!("{}: no failing checks", pr.url);
            continue;
        }

        candidates.push(RetestCandidate { pr, failures });
    }

    Ok(candidates)
}

/// Posts the retest comment on each candidate and reacts to it.
///
/// A failed comment aborts the run; a failed reaction is only logged.
pub async fn trigger_retests<F>(
    spec: &RunSpec,
    candidates: Vec<RetestCandidate>,
    forge: &F,
) -> anyhow::Result<Vec<RetestOutcome>>
where
    F: Forge + Sync,
{
    let mut outcomes = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if spec.dry_run {
            outcomes.push(RetestOutcome {
                candidate,
                comment_id: None,
                reaction_error: None,
            });
            continue;
        }

        let pr = &candidate.pr;
        let comment_id = forge
            .create_comment(&pr.repo, pr.number, &spec.comment)
            .await
            .with_context(|| format!("Failed to make comment on {}", pr.url))?;

        let reaction_error = match forge
            .create_comment_reaction(&pr.repo, comment_id, spec.reaction)
            .await
        {
            Ok(()) => None,
            Err(err) => {
                warn!("Can't add {} reaction on {}: {:#}", spec.reaction, pr.url, err);
                Some(format!("{err:#}"))
            }
        };

        outcomes.push(RetestOutcome {
            candidate,
            comment_id: Some(comment_id),
            reaction_error,
        });
    }

    Ok(outcomes)
}

/// Runs the whole pipeline: every pull request is inspected and reported
/// to `writer` before any comment is posted.
pub async fn run<F, W>(
    spec: &RunSpec,
    forge: &F,
    now: DateTime<Utc>,
    writer: &mut W,
) -> anyhow::Result<RunResult>
where
    F: Forge + Sync,
    W: Write,
{
    let candidates = find_retest_candidates(spec, forge).await?;
    let candidates_found = candidates.len();

    display_candidates(&candidates, spec.dry_run, now, writer)?;
    writer.flush()?;

    let outcomes = trigger_retests(spec, candidates, forge).await?;

    info!(
        "{} pull requests need a retest, {} comments posted",
        candidates_found,
        outcomes.iter().filter(|o| o.comment_id.is_some()).count()
    );

    Ok(RunResult {
        candidates_found,
        outcomes,
    })
}
