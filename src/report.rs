use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_humanize::HumanTime;

use crate::types::{CommitStatus, RetestCandidate};

const FAILURE_INDENT: &str = "         ";

fn format_age(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    HumanTime::from(updated_at - now).to_string()
}

fn write_failure<W: Write>(
    failure: &CommitStatus,
    now: DateTime<Utc>,
    writer: &mut W,
) -> Result<()> {
    writeln!(
        writer,
        "{FAILURE_INDENT}FAILED: {} - {} ({})",
        failure.context,
        failure.target_url.as_deref().unwrap_or(""),
        format_age(failure.updated_at, now)
    )?;
    Ok(())
}

/// Writes one block per retest candidate: a header naming the repository
/// and title, then one line per failing check with its age relative to
/// `now`.
pub fn display_candidates<W: Write>(
    candidates: &[RetestCandidate],
    dry_run: bool,
    now: DateTime<Utc>,
    writer: &mut W,
) -> Result<()> {
    let tag = if dry_run { "dry-run" } else { "retest" };

    for candidate in candidates {
        let pr = &candidate.pr;
        writeln!(writer, "[{tag}] {} - {}", pr.repo.name(), pr.title)?;

        for failure in &candidate.failures {
            write_failure(failure, now, writer)?;
        }
    }

    Ok(())
}
