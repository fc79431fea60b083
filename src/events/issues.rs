use async_trait::async_trait;
use serde_json::json;
use tracing::{info, info_span};

use crate::error::Result;
use crate::handler::{EventHandler, HandlerContext};
use crate::webhook::IssuesPayload;

const WELCOME_COMMENT: &str = "Thanks for opening this issue!";

/// Greets new issues.
pub struct IssueOpened;

/// Records closed issues in the log.
pub struct IssueClosed;

fn issue_metadata(ctx: &HandlerContext<'_>, payload: &IssuesPayload) -> serde_json::Value {
    json!({
        "repo": ctx.repo.name,
        "owner": ctx.repo.owner,
        "author": payload.sender.login,
        "default_branch": payload.repository.default_branch,
        "issue": {
            "number": payload.issue.number,
            "title": payload.issue.title,
            "author": payload.issue.user.login,
            "html_url": payload.issue.html_url,
        },
    })
}

#[async_trait]
impl EventHandler for IssueOpened {
    fn key(&self) -> &'static str {
        "issues.opened"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = ctx
            .event
            .payload
            .as_issues()
            .ok_or_else(|| ctx.unexpected_payload())?;
        info!(
            "received an issues.opened event: {}",
            issue_metadata(ctx, payload)
        );

        ctx.github()
            .create_issue_comment(&ctx.repo, payload.issue.number, WELCOME_COMMENT)
            .await
    }
}

#[async_trait]
impl EventHandler for IssueClosed {
    fn key(&self) -> &'static str {
        "issues.closed"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = ctx
            .event
            .payload
            .as_issues()
            .ok_or_else(|| ctx.unexpected_payload())?;

        info_span!("event_logging").in_scope(|| {
            info!(
                "received an issues.closed event: {}",
                issue_metadata(ctx, payload)
            )
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerOutcome;
    use crate::testing::{FakeSourceControl, GitHubCall, Harness, issues_payload};

    #[tokio::test]
    async fn opened_issue_gets_a_thank_you() {
        let harness = Harness::default();

        let outcome = harness.deliver("issues", issues_payload("opened", "dae")).await;
        assert_eq!(outcome, Some(HandlerOutcome::ok()));
        assert_eq!(
            harness.github.calls(),
            vec![GitHubCall::IssueComment {
                repo: "daeuniverse/dae".to_string(),
                issue: 12,
                body: WELCOME_COMMENT.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn comment_failure_is_reported() {
        let harness = Harness::new(FakeSourceControl::new().failing_on("create issue comment"));

        let outcome = harness
            .deliver("issues", issues_payload("opened", "dae"))
            .await
            .unwrap();
        assert_eq!(
            outcome.error.as_deref(),
            Some("GitHub API create issue comment failed with status 500: scripted failure")
        );
    }

    #[tokio::test]
    async fn closed_issue_only_logs() {
        let harness = Harness::default();

        let outcome = harness.deliver("issues", issues_payload("closed", "dae")).await;
        assert_eq!(outcome, Some(HandlerOutcome::ok()));
        assert!(harness.github.calls().is_empty());
        assert!(harness.messenger.sent().is_empty());
    }
}
