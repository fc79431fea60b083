use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{
    CommitDetails, Comparison, FileContents, FileUpdate, IssueLabel, NewPullRequest, NewReview,
    PullRequestSummary, ReviewRequest, SourceControl, WorkflowRun,
};
use crate::GitHubConfig;
use crate::error::{BotError, Result};
use crate::webhook::RepositoryRef;

const API_VERSION: &str = "2022-11-28";
const MAX_ERROR_BODY: usize = 800;

/// GitHub REST client authenticated with a static token.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Deserialize)]
struct RawContents {
    sha: String,
    content: String,
}

#[derive(Deserialize)]
struct WorkflowRuns {
    workflow_runs: Vec<WorkflowRun>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BotError::ConfigError("github.token is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| BotError::ConfigError(format!("Invalid github.user_agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| BotError::ConfigError(format!("Invalid github.token: {}", e)))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, repo: &RepositoryRef, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_base, repo.owner, repo.name, path)
    }

    async fn send(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        debug!("GitHub API {}", operation);
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut message = response.text().await.unwrap_or_default();
        if message.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| message.is_char_boundary(*i))
                .unwrap_or(0);
            message.truncate(cut);
        }
        Err(BotError::GitHubApi {
            operation: operation.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        Ok(self.send(operation, request).await?.json::<T>().await?)
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn get_commit(&self, repo: &RepositoryRef, git_ref: &str) -> Result<CommitDetails> {
        let url = self.repo_url(repo, &format!("commits/{}", git_ref));
        self.request_json("get commit", self.http.get(url)).await
    }

    async fn compare_commits(
        &self,
        repo: &RepositoryRef,
        base: &str,
        head: &str,
    ) -> Result<Comparison> {
        let url = self.repo_url(repo, &format!("compare/{}...{}", base, head));
        self.request_json("compare commits", self.http.get(url)).await
    }

    async fn create_ref(&self, repo: &RepositoryRef, git_ref: &str, sha: &str) -> Result<()> {
        let url = self.repo_url(repo, "git/refs");
        let body = json!({ "ref": git_ref, "sha": sha });
        self.send("create ref", self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn delete_ref(&self, repo: &RepositoryRef, git_ref: &str) -> Result<()> {
        let url = self.repo_url(repo, &format!("git/refs/{}", git_ref));
        self.send("delete ref", self.http.delete(url)).await?;
        Ok(())
    }

    async fn get_file_contents(
        &self,
        repo: &RepositoryRef,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContents> {
        let url = self.repo_url(repo, &format!("contents/{}", path));
        let raw: RawContents = self
            .request_json("get file contents", self.http.get(url).query(&[("ref", git_ref)]))
            .await?;

        // the API wraps base64 at 60 columns
        let packed: String = raw.content.split_whitespace().collect();
        let bytes = BASE64
            .decode(packed)
            .map_err(|e| BotError::MissingData(format!("{} is not valid base64: {}", path, e)))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| BotError::MissingData(format!("{} is not valid UTF-8: {}", path, e)))?;

        Ok(FileContents {
            sha: raw.sha,
            content,
        })
    }

    async fn update_file_contents(&self, repo: &RepositoryRef, update: &FileUpdate) -> Result<()> {
        let url = self.repo_url(repo, &format!("contents/{}", update.path));
        let body = json!({
            "message": update.message,
            "content": BASE64.encode(update.content.as_bytes()),
            "sha": update.sha,
            "branch": update.branch,
            "committer": update.committer,
            "author": update.author,
        });
        self.send("update file contents", self.http.put(url).json(&body)).await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepositoryRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequestSummary> {
        let url = self.repo_url(repo, "pulls");
        self.request_json("create pull request", self.http.post(url).json(pull)).await
    }

    async fn merge_branches(&self, repo: &RepositoryRef, base: &str, head: &str) -> Result<()> {
        let url = self.repo_url(repo, "merges");
        let body = json!({ "base": base, "head": head });
        // 201 with the merge commit, or 204 when base already contains head
        self.send("merge branches", self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn add_labels(&self, repo: &RepositoryRef, issue: u64, labels: &[String]) -> Result<()> {
        let url = self.repo_url(repo, &format!("issues/{}/labels", issue));
        let body = json!({ "labels": labels });
        self.send("add labels", self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn add_assignees(
        &self,
        repo: &RepositoryRef,
        issue: u64,
        assignees: &[String],
    ) -> Result<()> {
        let url = self.repo_url(repo, &format!("issues/{}/assignees", issue));
        let body = json!({ "assignees": assignees });
        self.send("add assignees", self.http.post(url).json(&body))
            .await?;
        Ok(())
    }

    async fn list_labels_on_issue(
        &self,
        repo: &RepositoryRef,
        issue: u64,
    ) -> Result<Vec<IssueLabel>> {
        let url = self.repo_url(repo, &format!("issues/{}/labels", issue));
        self.request_json("list labels on issue", self.http.get(url))
            .await
    }

    async fn request_reviewers(
        &self,
        repo: &RepositoryRef,
        pull: u64,
        request: &ReviewRequest,
    ) -> Result<()> {
        let url = self.repo_url(repo, &format!("pulls/{}/requested_reviewers", pull));
        self.send("request reviewers", self.http.post(url).json(request))
            .await?;
        Ok(())
    }

    async fn create_review(
        &self,
        repo: &RepositoryRef,
        pull: u64,
        review: &NewReview,
    ) -> Result<()> {
        let url = self.repo_url(repo, &format!("pulls/{}/reviews", pull));
        self.send("create review", self.http.post(url).json(review))
            .await?;
        Ok(())
    }

    async fn create_workflow_dispatch(
        &self,
        repo: &RepositoryRef,
        workflow_id: &str,
        git_ref: &str,
        inputs: serde_json::Value,
    ) -> Result<()> {
        let url = self.repo_url(repo, &format!("actions/workflows/{}/dispatches", workflow_id));
        let body = json!({ "ref": git_ref, "inputs": inputs });
        self.send("create workflow dispatch", self.http.post(url).json(&body))
            .await?;
        Ok(())
    }

    async fn list_workflow_runs(
        &self,
        repo: &RepositoryRef,
        workflow_id: &str,
        per_page: u32,
    ) -> Result<Vec<WorkflowRun>> {
        let url = self.repo_url(repo, &format!("actions/workflows/{}/runs", workflow_id));
        let runs: WorkflowRuns = self
            .request_json(
                "list workflow runs",
                self.http.get(url).query(&[("per_page", per_page)]),
            )
            .await?;
        Ok(runs.workflow_runs)
    }

    async fn create_issue_comment(
        &self,
        repo: &RepositoryRef,
        issue: u64,
        body: &str,
    ) -> Result<()> {
        let url = self.repo_url(repo, &format!("issues/{}/comments", issue));
        self.send(
            "create issue comment",
            self.http.post(url).json(&json!({ "body": body })),
        )
        .await?;
        Ok(())
    }
}
