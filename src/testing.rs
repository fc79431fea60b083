//! In-process fakes for handler and router tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::db::KvStore;
use crate::error::{BotError, Result};
use crate::events::default_registry;
use crate::github::{
    CommitData, CommitDetails, Comparison, FileContents, FileUpdate, GitActor, IssueLabel,
    NewPullRequest, NewReview, PullRequestSummary, ReviewRequest, SourceControl, WorkflowRun,
};
use crate::handler::{Collaborators, HandlerOutcome};
use crate::sync::CompareStatus;
use crate::telegram::{MessageOptions, Messenger};
use crate::webhook::{RepositoryRef, WebhookEvent};
use crate::{BotConfig, parse_config};

pub const AUDIT_CHANNEL: &str = "-100";
pub const PUBLIC_CHANNEL: &str = "-200";

pub fn test_config() -> BotConfig {
    parse_config(&format!(
        r#"
        pr_max_age = "P1D"

        [telegram]
        audit_channel_id = "{AUDIT_CHANNEL}"
        broadcast_channel_id = "{PUBLIC_CHANNEL}"
        "#
    ))
    .unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub enum GitHubCall {
    GetCommit {
        repo: String,
        git_ref: String,
    },
    CompareCommits {
        repo: String,
        base: String,
        head: String,
    },
    CreateRef {
        repo: String,
        git_ref: String,
        sha: String,
    },
    DeleteRef {
        repo: String,
        git_ref: String,
    },
    GetFileContents {
        repo: String,
        path: String,
        git_ref: String,
    },
    UpdateFileContents {
        repo: String,
        update: FileUpdate,
    },
    CreatePullRequest {
        repo: String,
        pull: NewPullRequest,
    },
    MergeBranches {
        repo: String,
        base: String,
        head: String,
    },
    AddLabels {
        repo: String,
        issue: u64,
        labels: Vec<String>,
    },
    AddAssignees {
        repo: String,
        issue: u64,
        assignees: Vec<String>,
    },
    ListLabels {
        repo: String,
        issue: u64,
    },
    RequestReviewers {
        repo: String,
        pull: u64,
        request: ReviewRequest,
    },
    CreateReview {
        repo: String,
        pull: u64,
        review: NewReview,
    },
    WorkflowDispatch {
        repo: String,
        workflow_id: String,
        git_ref: String,
        inputs: Value,
    },
    ListWorkflowRuns {
        repo: String,
        workflow_id: String,
        per_page: u32,
    },
    IssueComment {
        repo: String,
        issue: u64,
        body: String,
    },
}

pub fn commit(sha: &str, committer: &str, date: DateTime<Utc>) -> CommitDetails {
    CommitDetails {
        sha: sha.to_string(),
        commit: CommitData {
            committer: Some(GitActor {
                name: committer.to_string(),
                email: format!("{}@example.com", committer),
                date,
            }),
        },
    }
}

/// Scripted `SourceControl` that records every call in order.
#[derive(Default)]
pub struct FakeSourceControl {
    calls: Mutex<Vec<GitHubCall>>,
    commits: HashMap<String, CommitDetails>,
    comparison: Option<(CompareStatus, CommitDetails)>,
    files: HashMap<String, FileContents>,
    existing_labels: Vec<String>,
    workflow_run_url: Option<String>,
    fail_on: Option<&'static str>,
}

impl FakeSourceControl {
    pub fn new() -> Self {
        Self {
            workflow_run_url: Some(
                "https://github.com/daeuniverse/daed/actions/runs/1".to_string(),
            ),
            ..Self::default()
        }
    }

    pub fn with_commit(mut self, git_ref: &str, details: CommitDetails) -> Self {
        self.commits.insert(git_ref.to_string(), details);
        self
    }

    pub fn with_comparison(mut self, status: CompareStatus, merge_base: CommitDetails) -> Self {
        self.comparison = Some((status, merge_base));
        self
    }

    pub fn with_file(mut self, path: &str, sha: &str, content: &str) -> Self {
        self.files.insert(
            path.to_string(),
            FileContents {
                sha: sha.to_string(),
                content: content.to_string(),
            },
        );
        self
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.existing_labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn without_workflow_runs(mut self) -> Self {
        self.workflow_run_url = None;
        self
    }

    /// Makes the named operation fail with a 500.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    pub fn calls(&self) -> Vec<GitHubCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, call: GitHubCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(operation) {
            return Err(BotError::GitHubApi {
                operation: operation.to_string(),
                status: 500,
                message: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn get_commit(&self, repo: &RepositoryRef, git_ref: &str) -> Result<CommitDetails> {
        self.record(
            "get commit",
            GitHubCall::GetCommit {
                repo: repo.to_string(),
                git_ref: git_ref.to_string(),
            },
        )?;
        self.commits
            .get(git_ref)
            .cloned()
            .ok_or_else(|| BotError::GitHubApi {
                operation: "get commit".to_string(),
                status: 404,
                message: format!("no commit for {}", git_ref),
            })
    }

    async fn compare_commits(
        &self,
        repo: &RepositoryRef,
        base: &str,
        head: &str,
    ) -> Result<Comparison> {
        self.record(
            "compare commits",
            GitHubCall::CompareCommits {
                repo: repo.to_string(),
                base: base.to_string(),
                head: head.to_string(),
            },
        )?;
        let (status, merge_base_commit) = self.comparison.clone().ok_or_else(|| {
            BotError::GitHubApi {
                operation: "compare commits".to_string(),
                status: 404,
                message: "no comparison scripted".to_string(),
            }
        })?;
        Ok(Comparison {
            status,
            merge_base_commit,
        })
    }

    async fn create_ref(&self, repo: &RepositoryRef, git_ref: &str, sha: &str) -> Result<()> {
        self.record(
            "create ref",
            GitHubCall::CreateRef {
                repo: repo.to_string(),
                git_ref: git_ref.to_string(),
                sha: sha.to_string(),
            },
        )
    }

    async fn delete_ref(&self, repo: &RepositoryRef, git_ref: &str) -> Result<()> {
        self.record(
            "delete ref",
            GitHubCall::DeleteRef {
                repo: repo.to_string(),
                git_ref: git_ref.to_string(),
            },
        )
    }

    async fn get_file_contents(
        &self,
        repo: &RepositoryRef,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContents> {
        self.record(
            "get file contents",
            GitHubCall::GetFileContents {
                repo: repo.to_string(),
                path: path.to_string(),
                git_ref: git_ref.to_string(),
            },
        )?;
        self.files.get(path).cloned().ok_or_else(|| BotError::GitHubApi {
            operation: "get file contents".to_string(),
            status: 404,
            message: format!("{} not found", path),
        })
    }

    async fn update_file_contents(&self, repo: &RepositoryRef, update: &FileUpdate) -> Result<()> {
        self.record(
            "update file contents",
            GitHubCall::UpdateFileContents {
                repo: repo.to_string(),
                update: update.clone(),
            },
        )
    }

    async fn create_pull_request(
        &self,
        repo: &RepositoryRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequestSummary> {
        self.record(
            "create pull request",
            GitHubCall::CreatePullRequest {
                repo: repo.to_string(),
                pull: pull.clone(),
            },
        )?;
        Ok(PullRequestSummary {
            number: 99,
            title: pull.title.clone(),
            html_url: format!("https://github.com/{}/pull/99", repo),
        })
    }

    async fn merge_branches(&self, repo: &RepositoryRef, base: &str, head: &str) -> Result<()> {
        self.record(
            "merge branches",
            GitHubCall::MergeBranches {
                repo: repo.to_string(),
                base: base.to_string(),
                head: head.to_string(),
            },
        )
    }

    async fn add_labels(&self, repo: &RepositoryRef, issue: u64, labels: &[String]) -> Result<()> {
        self.record(
            "add labels",
            GitHubCall::AddLabels {
                repo: repo.to_string(),
                issue,
                labels: labels.to_vec(),
            },
        )
    }

    async fn add_assignees(
        &self,
        repo: &RepositoryRef,
        issue: u64,
        assignees: &[String],
    ) -> Result<()> {
        self.record(
            "add assignees",
            GitHubCall::AddAssignees {
                repo: repo.to_string(),
                issue,
                assignees: assignees.to_vec(),
            },
        )
    }

    async fn list_labels_on_issue(
        &self,
        repo: &RepositoryRef,
        issue: u64,
    ) -> Result<Vec<IssueLabel>> {
        self.record(
            "list labels on issue",
            GitHubCall::ListLabels {
                repo: repo.to_string(),
                issue,
            },
        )?;
        Ok(self
            .existing_labels
            .iter()
            .map(|name| IssueLabel { name: name.clone() })
            .collect())
    }

    async fn request_reviewers(
        &self,
        repo: &RepositoryRef,
        pull: u64,
        request: &ReviewRequest,
    ) -> Result<()> {
        self.record(
            "request reviewers",
            GitHubCall::RequestReviewers {
                repo: repo.to_string(),
                pull,
                request: request.clone(),
            },
        )
    }

    async fn create_review(
        &self,
        repo: &RepositoryRef,
        pull: u64,
        review: &NewReview,
    ) -> Result<()> {
        self.record(
            "create review",
            GitHubCall::CreateReview {
                repo: repo.to_string(),
                pull,
                review: review.clone(),
            },
        )
    }

    async fn create_workflow_dispatch(
        &self,
        repo: &RepositoryRef,
        workflow_id: &str,
        git_ref: &str,
        inputs: Value,
    ) -> Result<()> {
        self.record(
            "create workflow dispatch",
            GitHubCall::WorkflowDispatch {
                repo: repo.to_string(),
                workflow_id: workflow_id.to_string(),
                git_ref: git_ref.to_string(),
                inputs,
            },
        )
    }

    async fn list_workflow_runs(
        &self,
        repo: &RepositoryRef,
        workflow_id: &str,
        per_page: u32,
    ) -> Result<Vec<WorkflowRun>> {
        self.record(
            "list workflow runs",
            GitHubCall::ListWorkflowRuns {
                repo: repo.to_string(),
                workflow_id: workflow_id.to_string(),
                per_page,
            },
        )?;
        Ok(self
            .workflow_run_url
            .iter()
            .map(|url| WorkflowRun {
                id: 1,
                html_url: url.clone(),
                status: Some("queued".to_string()),
            })
            .collect())
    }

    async fn create_issue_comment(
        &self,
        repo: &RepositoryRef,
        issue: u64,
        body: &str,
    ) -> Result<()> {
        self.record(
            "create issue comment",
            GitHubCall::IssueComment {
                repo: repo.to_string(),
                issue,
                body: body.to_string(),
            },
        )
    }
}

#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn with(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn entries(&self) -> HashMap<String, String> {
        self.entries.lock().unwrap().clone()
    }

    /// Value of the single key starting with `prefix`.
    pub fn find_prefixed(&self, prefix: &str) -> Option<(String, String)> {
        let entries = self.entries.lock().unwrap();
        let mut matches = entries.iter().filter(|(k, _)| k.starts_with(prefix));
        let found = matches.next().map(|(k, v)| (k.clone(), v.clone()));
        assert!(matches.next().is_none(), "several keys start with {prefix}");
        found
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Messenger that keeps `(chat_id, text)` pairs.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        _options: &MessageOptions,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Fake collaborators wired to the default registry.
pub struct Harness {
    pub github: Arc<FakeSourceControl>,
    pub kv: Arc<MemoryKv>,
    pub messenger: Arc<RecordingMessenger>,
    pub config: BotConfig,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(FakeSourceControl::new())
    }
}

impl Harness {
    pub fn new(github: FakeSourceControl) -> Self {
        Self {
            github: Arc::new(github),
            kv: Arc::new(MemoryKv::default()),
            messenger: Arc::new(RecordingMessenger::default()),
            config: test_config(),
        }
    }

    pub fn with_kv(mut self, kv: MemoryKv) -> Self {
        self.kv = Arc::new(kv);
        self
    }

    pub fn clients(&self) -> Collaborators {
        Collaborators {
            github: self.github.clone(),
            kv: self.kv.clone(),
            messenger: self.messenger.clone(),
        }
    }

    /// Parses `body` as an `event` delivery and dispatches it.
    pub async fn deliver(&self, event: &str, body: Value) -> Option<HandlerOutcome> {
        let event =
            WebhookEvent::parse(event, Some("test-delivery".into()), body.to_string().as_bytes())
                .unwrap();
        default_registry()
            .dispatch(&event, &self.clients(), &self.config)
            .await
    }
}

pub fn repository(name: &str) -> Value {
    json!({
        "name": name,
        "owner": { "login": "daeuniverse", "html_url": "https://github.com/daeuniverse" },
        "default_branch": "main",
        "html_url": format!("https://github.com/daeuniverse/{}", name),
        "stargazers_count": 0
    })
}

fn user(login: &str) -> Value {
    json!({ "login": login, "html_url": format!("https://github.com/{}", login) })
}

fn organization() -> Value {
    json!({ "login": "daeuniverse" })
}

pub fn push_payload(repo: &str, git_ref: &str, before: &str) -> Value {
    json!({
        "ref": git_ref,
        "before": before,
        "after": "a1b2c3d",
        "head_commit": {
            "id": "a1b2c3d",
            "message": "feat: something",
            "url": format!("https://github.com/daeuniverse/{}/commit/a1b2c3d", repo)
        },
        "repository": repository(repo),
        "organization": organization(),
        "sender": user("mzz2017")
    })
}

pub fn star_payload(repo: &str, stargazers: u64) -> Value {
    let mut repository = repository(repo);
    repository["stargazers_count"] = json!(stargazers);
    json!({
        "action": "created",
        "repository": repository,
        "organization": organization(),
        "sender": user("stargazer")
    })
}

fn issue(number: u64, state: &str, body: Option<&str>) -> Value {
    json!({
        "number": number,
        "title": "Release v0.2.0",
        "body": body,
        "user": user("yqlbu"),
        "html_url": format!("https://github.com/daeuniverse/daed/issues/{}", number),
        "state": state
    })
}

pub fn issues_payload(action: &str, repo: &str) -> Value {
    json!({
        "action": action,
        "issue": issue(12, "open", None),
        "repository": repository(repo),
        "organization": organization(),
        "sender": user("someone")
    })
}

pub fn issue_comment_payload(
    repo: &str,
    commenter: &str,
    comment: &str,
    issue_state: &str,
    issue_body: &str,
) -> Value {
    json!({
        "action": "created",
        "issue": issue(12, issue_state, Some(issue_body)),
        "comment": {
            "body": comment,
            "user": user(commenter),
            "html_url": format!("https://github.com/daeuniverse/{}/issues/12#issuecomment-1", repo),
            "created_at": "2023-06-09T08:30:00Z"
        },
        "repository": repository(repo),
        "organization": organization(),
        "sender": user(commenter)
    })
}

pub fn pull_request_payload(
    action: &str,
    repo: &str,
    title: &str,
    author: &str,
    head_ref: &str,
    merged: bool,
) -> Value {
    json!({
        "action": action,
        "pull_request": {
            "number": 7,
            "title": title,
            "user": user(author),
            "head": { "ref": head_ref, "sha": "f00dfeed" },
            "html_url": format!("https://github.com/daeuniverse/{}/pull/7", repo),
            "updated_at": "2023-06-09T08:30:00Z",
            "merged": merged
        },
        "repository": repository(repo),
        "organization": organization(),
        "sender": user(author)
    })
}

pub fn labeled_payload(repo: &str, title: &str, label: &str) -> Value {
    let mut payload = pull_request_payload("labeled", repo, title, "alice", "fix-x", false);
    payload["label"] = json!({ "name": label });
    payload
}

pub fn release_payload(repo: &str, tag: &str) -> Value {
    json!({
        "action": "published",
        "release": {
            "tag_name": tag,
            "html_url": format!("https://github.com/daeuniverse/{}/releases/tag/{}", repo, tag),
            "author": user("daebot"),
            "prerelease": false,
            "published_at": "2023-06-10T00:00:00Z"
        },
        "repository": repository(repo),
        "organization": organization(),
        "sender": user("daebot")
    })
}
