use std::{collections::HashMap, sync::Mutex};

use anyhow::Result;
use async_trait::async_trait;
use autoretest::{
    CommitStatus, Forge, PullRequest, ReactionKind, Repo, RunResult, RunSpec, StatusState,
    find_retest_candidates, parse_args, run,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Calls that change state on the forge, in the order they were made.
#[derive(Debug, Clone, PartialEq)]
enum Posted {
    Comment { repo: String, number: u64, body: String },
    Reaction { comment_id: u64, reaction: ReactionKind },
}

/// In-memory forge for testing.
#[derive(Default)]
pub struct MockHub {
    prs: Vec<PullRequest>,
    commits: HashMap<u64, Vec<String>>,
    statuses: HashMap<String, Vec<CommitStatus>>,
    queries: Mutex<Vec<String>>,
    posted: Mutex<Vec<Posted>>,
    fail_search: bool,
    fail_commits: bool,
    fail_statuses: bool,
    fail_comments: bool,
    fail_reactions: bool,
}

impl MockHub {
    fn with_pr(mut self, number: u64, title: &str, commits: &[&str]) -> Self {
        self.prs.push(PullRequest {
            repo: test_repo(),
            number,
            title: title.to_string(),
            url: format!("https://github.com/openshift/installer/pull/{number}"),
        });
        self.commits
            .insert(number, commits.iter().map(|s| s.to_string()).collect());
        self
    }

    fn with_statuses(mut self, sha: &str, statuses: Vec<CommitStatus>) -> Self {
        self.statuses.insert(sha.to_string(), statuses);
        self
    }

    fn posted(&self) -> Vec<Posted> {
        self.posted.lock().unwrap().clone()
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forge for MockHub {
    async fn search_pull_requests(&self, query: &str, limit: usize) -> Result<Vec<PullRequest>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail_search {
            anyhow::bail!("search API rate limited");
        }
        Ok(self.prs.iter().take(limit).cloned().collect())
    }

    async fn list_commits(&self, _repo: &Repo, number: u64) -> Result<Vec<String>> {
        if self.fail_commits {
            anyhow::bail!("commits API unavailable");
        }
        Ok(self.commits.get(&number).cloned().unwrap_or_default())
    }

    async fn list_statuses(&self, _repo: &Repo, sha: &str) -> Result<Vec<CommitStatus>> {
        if self.fail_statuses {
            anyhow::bail!("statuses API unavailable");
        }
        Ok(self.statuses.get(sha).cloned().unwrap_or_default())
    }

    async fn create_comment(&self, repo: &Repo, number: u64, body: &str) -> Result<u64> {
        if self.fail_comments {
            anyhow::bail!("403 Forbidden");
        }
        let mut posted = self.posted.lock().unwrap();
        posted.push(Posted::Comment {
            repo: repo.to_string(),
            number,
            body: body.to_string(),
        });
        Ok(1000 + number)
    }

    async fn create_comment_reaction(
        &self,
        _repo: &Repo,
        comment_id: u64,
        reaction: ReactionKind,
    ) -> Result<()> {
        if self.fail_reactions {
            anyhow::bail!("reactions are disabled");
        }
        self.posted.lock().unwrap().push(Posted::Reaction {
            comment_id,
            reaction,
        });
        Ok(())
    }
}

fn test_repo() -> Repo {
    Repo::new("openshift", "installer").unwrap()
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

fn status(context: &str, state: StatusState, minutes: i64) -> CommitStatus {
    CommitStatus {
        context: context.to_string(),
        state,
        target_url: Some(format!("https://prow.ci.openshift.org/view/{context}")),
        updated_at: base_time() + Duration::minutes(minutes),
    }
}

fn spec_from_args(args: &[&str]) -> RunSpec {
    let mut full = vec!["autoretest", "--author", "openshift-bot"];
    full.extend_from_slice(args);
    parse_args(full).unwrap()
}

/// Three PRs: 101 has a check whose latest report failed, 102 recovered
/// after a failure, 103 failed on an old commit but its head is green.
fn create_mock_hub() -> MockHub {
    MockHub::default()
        .with_pr(101, "Bump RHCOS boot images", &["a1", "a2"])
        .with_statuses(
            "a2",
            vec![
                status("ci/prow/e2e-aws", StatusState::Failure, 20),
                status("ci/prow/unit", StatusState::Success, 15),
                status("ci/prow/e2e-aws", StatusState::Pending, 10),
            ],
        )
        .with_pr(102, "Update vendored api", &["b1"])
        .with_statuses(
            "b1",
            vec![
                status("ci/prow/unit", StatusState::Success, 30),
                status("ci/prow/unit", StatusState::Failure, 5),
            ],
        )
        .with_pr(103, "Fix typo in docs", &["c1", "c2"])
        .with_statuses("c1", vec![status("ci/prow/verify", StatusState::Failure, 0)])
        .with_statuses("c2", vec![status("ci/prow/verify", StatusState::Success, 8)])
}

/// Runs the pipeline and returns its result with everything it reported.
async fn run_with_report(args: &[&str], hub: &MockHub) -> (Result<RunResult>, String) {
    let mut output = Vec::new();
    let result = run(&spec_from_args(args), hub, base_time(), &mut output).await;
    (result, String::from_utf8(output).unwrap())
}

async fn run_autoretest_test(args: &[&str], hub: &MockHub) -> Result<RunResult> {
    run_with_report(args, hub).await.0
}

#[tokio::test]
async fn test_search_query_uses_author_and_org() {
    let hub = create_mock_hub();
    run_autoretest_test(&["--org", "openshift-priv", "--dry-run"], &hub)
        .await
        .unwrap();

    assert_eq!(
        hub.queries(),
        vec![
            "user:openshift-priv label:approved label:lgtm -label:hold -label:needs-rebase state:open author:openshift-bot"
        ]
    );
}

#[tokio::test]
async fn test_only_latest_failures_become_candidates() {
    let hub = create_mock_hub();
    let candidates = find_retest_candidates(&spec_from_args(&[]), &hub)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].pr.number, 101);
    assert_eq!(candidates[0].failures.len(), 1);
    assert_eq!(candidates[0].failures[0].context, "ci/prow/e2e-aws");
}

#[tokio::test]
async fn test_head_commit_statuses_are_inspected() {
    // PR 103 failed on c1 but its head c2 is green.
    let hub = create_mock_hub();
    let candidates = find_retest_candidates(&spec_from_args(&[]), &hub)
        .await
        .unwrap();

    assert!(candidates.iter().all(|c| c.pr.number != 103));
}

#[tokio::test]
async fn test_retest_comment_and_reaction_posted() {
    let hub = create_mock_hub();
    let result = run_autoretest_test(&[], &hub).await.unwrap();

    assert_eq!(result.candidates_found, 1);
    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(result.outcomes[0].comment_id, Some(1101));
    assert_eq!(result.outcomes[0].reaction_error, None);

    assert_eq!(
        hub.posted(),
        vec![
            Posted::Comment {
                repo: "openshift/installer".to_string(),
                number: 101,
                body: "/retest".to_string(),
            },
            Posted::Reaction {
                comment_id: 1101,
                reaction: ReactionKind::Laugh,
            },
        ]
    );
}

#[tokio::test]
async fn test_custom_comment_and_reaction() {
    let hub = create_mock_hub();
    run_autoretest_test(&["-c", "/retest-required", "--reaction", "rocket"], &hub)
        .await
        .unwrap();

    assert_eq!(
        hub.posted(),
        vec![
            Posted::Comment {
                repo: "openshift/installer".to_string(),
                number: 101,
                body: "/retest-required".to_string(),
            },
            Posted::Reaction {
                comment_id: 1101,
                reaction: ReactionKind::Rocket,
            },
        ]
    );
}

#[tokio::test]
async fn test_dry_run_posts_nothing() {
    let hub = create_mock_hub();
    let result = run_autoretest_test(&["--dry-run"], &hub).await.unwrap();

    assert_eq!(result.candidates_found, 1);
    assert_eq!(result.outcomes[0].comment_id, None);
    assert!(hub.posted().is_empty());
}

#[tokio::test]
async fn test_every_candidate_commented_in_search_order() {
    let hub = create_mock_hub()
        .with_pr(104, "Drop deprecated flag", &["d1"])
        .with_statuses("d1", vec![status("ci/prow/images", StatusState::Failure, 1)]);
    let result = run_autoretest_test(&[], &hub).await.unwrap();

    let numbers: Vec<u64> = result
        .outcomes
        .iter()
        .map(|o| o.candidate.pr.number)
        .collect();
    assert_eq!(numbers, vec![101, 104]);

    let commented: Vec<u64> = hub
        .posted()
        .into_iter()
        .filter_map(|p| match p {
            Posted::Comment { number, .. } => Some(number),
            Posted::Reaction { .. } => None,
        })
        .collect();
    assert_eq!(commented, vec![101, 104]);
}

#[tokio::test]
async fn test_limit_restricts_inspected_prs() {
    let hub = MockHub::default()
        .with_pr(201, "First", &["e1"])
        .with_statuses("e1", vec![status("ci/prow/unit", StatusState::Success, 0)])
        .with_pr(202, "Second", &["f1"])
        .with_statuses("f1", vec![status("ci/prow/unit", StatusState::Failure, 0)]);

    let result = run_autoretest_test(&["--limit", "1"], &hub).await.unwrap();
    assert_eq!(result.candidates_found, 0);
    assert!(hub.posted().is_empty());
}

#[tokio::test]
async fn test_no_statuses_is_not_a_failure() {
    let hub = MockHub::default().with_pr(301, "Brand new", &["g1"]);
    let result = run_autoretest_test(&[], &hub).await.unwrap();

    assert_eq!(result.candidates_found, 0);
    assert!(result.outcomes.is_empty());
}

#[tokio::test]
async fn test_pr_without_commits_aborts() {
    let hub = MockHub::default().with_pr(401, "Empty", &[]);
    let err = run_autoretest_test(&[], &hub).await.unwrap_err();

    assert!(err.to_string().contains("has no commits"));
}

#[tokio::test]
async fn test_status_error_aborts_before_commenting() {
    let hub = MockHub {
        fail_statuses: true,
        ..create_mock_hub()
    };
    let err = run_autoretest_test(&[], &hub).await.unwrap_err();

    assert!(format!("{err:#}").contains("statuses API unavailable"));
    assert!(hub.posted().is_empty());
}

#[tokio::test]
async fn test_comment_error_aborts() {
    let hub = MockHub {
        fail_comments: true,
        ..create_mock_hub()
    };
    let err = run_autoretest_test(&[], &hub).await.unwrap_err();

    assert!(err.to_string().contains("Failed to make comment on"));
    assert!(format!("{err:#}").contains("403 Forbidden"));
}

#[tokio::test]
async fn test_reaction_error_is_not_fatal() {
    let hub = MockHub {
        fail_reactions: true,
        ..create_mock_hub()
    };
    let result = run_autoretest_test(&[], &hub).await.unwrap();

    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(result.outcomes[0].comment_id, Some(1101));
    assert!(
        result.outcomes[0]
            .reaction_error
            .as_deref()
            .is_some_and(|e| e.contains("reactions are disabled"))
    );
    assert_eq!(hub.posted().len(), 1);
}

#[tokio::test]
async fn test_search_error_aborts() {
    let hub = MockHub {
        fail_search: true,
        ..create_mock_hub()
    };
    let (result, output) = run_with_report(&[], &hub).await;
    let err = result.unwrap_err();

    assert!(err.to_string().contains("search API rate limited"));
    assert!(output.is_empty());
    assert!(hub.posted().is_empty());
}

#[tokio::test]
async fn test_commit_listing_error_aborts() {
    let hub = MockHub {
        fail_commits: true,
        ..create_mock_hub()
    };
    let err = run_autoretest_test(&[], &hub).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to list commits for https://github.com/openshift/installer/pull/101"
    );
    assert!(format!("{err:#}").contains("commits API unavailable"));
    assert!(hub.posted().is_empty());
}

#[tokio::test]
async fn test_report_lists_candidates_and_failures() {
    let hub = create_mock_hub();
    let (result, output) = run_with_report(&[], &hub).await;
    result.unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "[retest] installer - Bump RHCOS boot images");
    assert!(lines[1].starts_with(
        "         FAILED: ci/prow/e2e-aws - https://prow.ci.openshift.org/view/ci/prow/e2e-aws ("
    ));
}

#[tokio::test]
async fn test_dry_run_report_is_tagged() {
    let hub = create_mock_hub();
    let (result, output) = run_with_report(&["--dry-run"], &hub).await;
    result.unwrap();

    assert!(output.starts_with("[dry-run] installer - Bump RHCOS boot images\n"));
}

#[tokio::test]
async fn test_report_written_before_comment_failure() {
    let hub = MockHub {
        fail_comments: true,
        ..create_mock_hub()
    };
    let (result, output) = run_with_report(&[], &hub).await;

    assert!(result.is_err());
    assert!(output.starts_with("[retest] installer - "));
}
