//! Typed webhook deliveries
//!
//! Payloads are decoded once at the HTTP boundary, keyed by the
//! `X-GitHub-Event` name. Only the fields the handlers read are modelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BotError, Result};

/// `before` sha of a push that created the ref.
pub const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: User,
    pub default_branch: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeadCommit {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub before: String,
    #[serde(default)]
    pub after: String,
    pub head_commit: Option<HeadCommit>,
    pub repository: Repository,
    pub organization: Option<Organization>,
    pub sender: User,
}

impl PushPayload {
    /// Third `/` segment of the ref (`sync-upstream` in `refs/heads/sync-upstream`).
    pub fn branch_segment(&self) -> Option<&str> {
        self.git_ref.split('/').nth(2)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub user: User,
    pub html_url: String,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuesPayload {
    pub action: String,
    pub issue: Issue,
    pub repository: Repository,
    pub organization: Option<Organization>,
    pub sender: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub body: String,
    pub user: User,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentPayload {
    pub action: String,
    pub issue: Issue,
    pub comment: Comment,
    pub repository: Repository,
    pub organization: Option<Organization>,
    pub sender: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StarPayload {
    pub action: String,
    pub repository: Repository,
    pub organization: Option<Organization>,
    pub sender: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub user: User,
    pub head: Branch,
    pub html_url: String,
    pub updated_at: String,
    #[serde(default)]
    pub merged: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub pull_request: PullRequest,
    pub label: Option<Label>,
    pub repository: Repository,
    pub organization: Option<Organization>,
    pub sender: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub html_url: String,
    pub author: User,
    #[serde(default)]
    pub prerelease: bool,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleasePayload {
    pub action: String,
    pub release: Release,
    pub repository: Repository,
    pub organization: Option<Organization>,
    pub sender: User,
}

/// Webhook payload, discriminated by event name.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Push(PushPayload),
    Issues(IssuesPayload),
    IssueComment(IssueCommentPayload),
    Star(StarPayload),
    PullRequest(PullRequestPayload),
    Release(ReleasePayload),
    /// An event no handler models (`ping`, `check_run`, ...).
    Other(serde_json::Value),
}

fn decode<T: for<'de> Deserialize<'de>>(event: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| BotError::InvalidPayload(format!("{} payload: {}", event, e)))
}

impl EventPayload {
    pub fn parse(event: &str, body: &[u8]) -> Result<Self> {
        Ok(match event {
            "push" => Self::Push(decode(event, body)?),
            "issues" => Self::Issues(decode(event, body)?),
            "issue_comment" => Self::IssueComment(decode(event, body)?),
            "star" => Self::Star(decode(event, body)?),
            "pull_request" => Self::PullRequest(decode(event, body)?),
            "release" => Self::Release(decode(event, body)?),
            _ => Self::Other(decode(event, body)?),
        })
    }

    pub fn action(&self) -> Option<&str> {
        match self {
            Self::Push(_) => None,
            Self::Issues(p) => Some(&p.action),
            Self::IssueComment(p) => Some(&p.action),
            Self::Star(p) => Some(&p.action),
            Self::PullRequest(p) => Some(&p.action),
            Self::Release(p) => Some(&p.action),
            Self::Other(v) => v.get("action").and_then(|a| a.as_str()),
        }
    }

    fn repository(&self) -> Option<(&Repository, Option<&Organization>)> {
        match self {
            Self::Push(p) => Some((&p.repository, p.organization.as_ref())),
            Self::Issues(p) => Some((&p.repository, p.organization.as_ref())),
            Self::IssueComment(p) => Some((&p.repository, p.organization.as_ref())),
            Self::Star(p) => Some((&p.repository, p.organization.as_ref())),
            Self::PullRequest(p) => Some((&p.repository, p.organization.as_ref())),
            Self::Release(p) => Some((&p.repository, p.organization.as_ref())),
            Self::Other(_) => None,
        }
    }

    pub fn as_push(&self) -> Option<&PushPayload> {
        match self {
            Self::Push(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_issues(&self) -> Option<&IssuesPayload> {
        match self {
            Self::Issues(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_issue_comment(&self) -> Option<&IssueCommentPayload> {
        match self {
            Self::IssueComment(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_star(&self) -> Option<&StarPayload> {
        match self {
            Self::Star(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pull_request(&self) -> Option<&PullRequestPayload> {
        match self {
            Self::PullRequest(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_release(&self) -> Option<&ReleasePayload> {
        match self {
            Self::Release(p) => Some(p),
            _ => None,
        }
    }
}

/// Owner and name of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One inbound delivery.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub name: String,
    pub delivery_id: Option<String>,
    pub payload: EventPayload,
}

impl WebhookEvent {
    pub fn parse(name: &str, delivery_id: Option<String>, body: &[u8]) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            delivery_id,
            payload: EventPayload::parse(name, body)?,
        })
    }

    pub fn action(&self) -> Option<&str> {
        self.payload.action()
    }

    /// Registry key: `name.action`, or just `name` for action-less events.
    pub fn key(&self) -> String {
        match self.action() {
            Some(action) => format!("{}.{}", self.name, action),
            None => self.name.clone(),
        }
    }

    /// The organization login is preferred as owner, falling back to the
    /// repository owner for user-owned repositories.
    pub fn repository_ref(&self) -> Option<RepositoryRef> {
        let (repo, org) = self.payload.repository()?;
        let owner = org.map_or(&repo.owner.login, |o| &o.login);
        Some(RepositoryRef::new(owner.clone(), repo.name.clone()))
    }
}
