use anyhow::Result;
use clap::Parser;

use crate::{
    search::DEFAULT_ORG,
    types::{ReactionKind, RunSpec},
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

const DEFAULT_COMMENT: &str = "/retest";

#[derive(Parser, Debug)]
#[command(
    about = "Find approved, lgtm'd pull requests whose latest CI status is failing and post /retest on them"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CliArgs {
    /// Author of the pull requests to retest
    #[arg(short = 'a', long, env = "GITHUB_USER", value_name = "USERNAME")]
    pub author: String,

    /// Organisation or user owning the repositories to search
    #[arg(long, env = "AUTORETEST_ORG", default_value = DEFAULT_ORG, value_name = "ORG")]
    pub org: String,

    /// Comment posted to trigger the retest
    #[arg(short = 'c', long, default_value = DEFAULT_COMMENT, value_name = "TEXT")]
    pub comment: String,

    /// Reaction added to the posted comment
    #[arg(
        long,
        value_enum,
        default_value_t = ReactionKind::Laugh,
        allow_hyphen_values = true
    )]
    pub reaction: ReactionKind,

    /// Report what would be retested without posting anything
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Limit the number of PRs to inspect
    #[arg(short = 'L', long, default_value = "30", value_name = "NUM")]
    pub limit: usize,
}

impl CliArgs {
    pub fn validate(&self) -> Result<()> {
        if self.author.trim().is_empty() {
            anyhow::bail!("--author (or GITHUB_USER) must not be empty");
        }

        if self.org.trim().is_empty() {
            anyhow::bail!("--org must not be empty");
        }

        if self.comment.trim().is_empty() {
            anyhow::bail!("--comment must not be empty");
        }

        if self.limit == 0 {
            anyhow::bail!("--limit must be at least 1");
        }

        Ok(())
    }
}

fn create_run_spec(cli: CliArgs) -> Result<RunSpec> {
    cli.validate()?;

    Ok(RunSpec {
        org: cli.org.trim().to_string(),
        author: cli.author.trim().to_string(),
        comment: cli.comment,
        reaction: cli.reaction,
        dry_run: cli.dry_run,
        limit: cli.limit,
    })
}

/// Parses command-line arguments, falling back to `GITHUB_USER` and
/// `AUTORETEST_ORG` from the environment, into a validated run
/// specification.
pub fn parse_args<I, T>(args: I) -> Result<RunSpec>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    create_run_spec(cli)
}
