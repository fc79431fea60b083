//! Source control collaborator: the subset of the GitHub REST API the
//! handlers use.

pub mod client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sync::CompareStatus;
use crate::webhook::RepositoryRef;

pub use client::GitHubClient;

#[derive(Debug, Clone, Deserialize)]
pub struct GitActor {
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitData {
    pub committer: Option<GitActor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetails {
    pub sha: String,
    pub commit: CommitData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comparison {
    pub status: CompareStatus,
    pub merge_base_commit: CommitDetails,
}

/// Decoded file from the contents API.
#[derive(Debug, Clone, PartialEq)]
pub struct FileContents {
    pub sha: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// Request to replace a file on a branch; `content` is plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpdate {
    pub path: String,
    pub message: String,
    pub content: String,
    pub sha: String,
    pub branch: String,
    pub committer: Identity,
    pub author: Identity,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IssueLabel {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReviewRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub team_reviewers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    Approve,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewReview {
    pub commit_id: String,
    pub body: String,
    pub event: ReviewEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub html_url: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn get_commit(&self, repo: &RepositoryRef, git_ref: &str) -> Result<CommitDetails>;

    async fn compare_commits(
        &self,
        repo: &RepositoryRef,
        base: &str,
        head: &str,
    ) -> Result<Comparison>;

    /// `git_ref` is fully qualified (`refs/heads/x`, `refs/tags/v1`).
    async fn create_ref(&self, repo: &RepositoryRef, git_ref: &str, sha: &str) -> Result<()>;

    /// `git_ref` omits the `refs/` prefix (`heads/x`).
    async fn delete_ref(&self, repo: &RepositoryRef, git_ref: &str) -> Result<()>;

    async fn get_file_contents(
        &self,
        repo: &RepositoryRef,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContents>;

    async fn update_file_contents(&self, repo: &RepositoryRef, update: &FileUpdate) -> Result<()>;

    async fn create_pull_request(
        &self,
        repo: &RepositoryRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequestSummary>;

    /// Merges `head` into `base`.
    async fn merge_branches(&self, repo: &RepositoryRef, base: &str, head: &str) -> Result<()>;

    async fn add_labels(&self, repo: &RepositoryRef, issue: u64, labels: &[String]) -> Result<()>;

    async fn add_assignees(
        &self,
        repo: &RepositoryRef,
        issue: u64,
        assignees: &[String],
    ) -> Result<()>;

    async fn list_labels_on_issue(&self, repo: &RepositoryRef, issue: u64)
    -> Result<Vec<IssueLabel>>;

    async fn request_reviewers(
        &self,
        repo: &RepositoryRef,
        pull: u64,
        request: &ReviewRequest,
    ) -> Result<()>;

    async fn create_review(&self, repo: &RepositoryRef, pull: u64, review: &NewReview)
    -> Result<()>;

    async fn create_workflow_dispatch(
        &self,
        repo: &RepositoryRef,
        workflow_id: &str,
        git_ref: &str,
        inputs: serde_json::Value,
    ) -> Result<()>;

    async fn list_workflow_runs(
        &self,
        repo: &RepositoryRef,
        workflow_id: &str,
        per_page: u32,
    ) -> Result<Vec<WorkflowRun>>;

    async fn create_issue_comment(&self, repo: &RepositoryRef, issue: u64, body: &str)
    -> Result<()>;
}
