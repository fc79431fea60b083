//! Per-event handlers

pub mod issue_comment;
pub mod issues;
pub mod pull_request;
pub mod push;
pub mod release;
pub mod star;

use crate::error::{BotError, Result};
use crate::handler::{HandlerContext, HandlerRegistry};
use crate::webhook::RepositoryRef;

/// Label applied to every pull request the bot opens.
pub const AUTOMATED_PR_LABEL: &str = "automated-pr";

/// Registry with every handler the bot ships, in lookup order.
pub fn default_registry() -> HandlerRegistry {
    HandlerRegistry::new(vec![
        Box::new(push::Push),
        Box::new(issues::IssueOpened),
        Box::new(issues::IssueClosed),
        Box::new(issue_comment::ReleaseCommand),
        Box::new(star::StarCreated),
        Box::new(pull_request::Opened),
        Box::new(pull_request::Synchronize),
        Box::new(pull_request::Closed),
        Box::new(pull_request::Labeled),
        Box::new(release::ReleasePublished),
    ])
}

/// URL of the most recent run of `workflow` in `repo`.
async fn latest_run_url(
    ctx: &HandlerContext<'_>,
    repo: &RepositoryRef,
    workflow: &str,
) -> Result<String> {
    ctx.github()
        .list_workflow_runs(repo, workflow, 1)
        .await?
        .into_iter()
        .next()
        .map(|run| run.html_url)
        .ok_or_else(|| BotError::MissingData(format!("no runs of {} in {}", workflow, repo)))
}
