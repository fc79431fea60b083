use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{AUTOMATED_PR_LABEL, latest_run_url};
use crate::error::Result;
use crate::github::NewPullRequest;
use crate::handler::{EventHandler, HandlerContext};
use crate::webhook::{PushPayload, RepositoryRef, ZERO_SHA};

const MAIN_REF: &str = "refs/heads/main";
const SYNC_PR_TITLE: &str = "chore(sync): keep upstream source up-to-date";

/// Keeps the downstream repository in step with the upstream one.
///
/// A push to upstream `main` dispatches the sync workflow downstream. The
/// workflow then pushes a fresh sync branch, and that push opens the sync PR.
pub struct Push;

#[async_trait]
impl EventHandler for Push {
    fn key(&self) -> &'static str {
        "push"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = ctx
            .event
            .payload
            .as_push()
            .ok_or_else(|| ctx.unexpected_payload())?;
        let head_commit = serde_json::to_string(&payload.head_commit)?;
        info!(
            "received a push event: {}; ref: {}; repo: {}",
            head_commit, payload.git_ref, ctx.repo.name
        );

        let rules = &ctx.config.rules;
        if payload.git_ref == MAIN_REF && payload.repository.name == rules.upstream_repo {
            dispatch_sync_workflow(ctx, payload).await?;
        }

        if payload.before == ZERO_SHA
            && payload.repository.name == rules.downstream_repo
            && payload.branch_segment() == Some(rules.sync_branch.as_str())
        {
            open_sync_pull_request(ctx, payload).await?;
        }

        Ok(())
    }
}

async fn dispatch_sync_workflow(ctx: &HandlerContext<'_>, payload: &PushPayload) -> Result<()> {
    let rules = &ctx.config.rules;
    let downstream = RepositoryRef::new(ctx.repo.owner.clone(), rules.downstream_repo.clone());
    let default_branch = &payload.repository.default_branch;

    ctx.github()
        .create_workflow_dispatch(
            &downstream,
            &rules.sync_workflow,
            default_branch,
            json!({
                "wing-head": default_branch,
                "wing-sync-message": format!("chore(sync): upgrade {}", rules.upstream_repo),
                "pr-branch": rules.sync_branch,
            }),
        )
        .await?;
    let run_url = latest_run_url(ctx, &downstream, &rules.sync_workflow).await?;

    let msg = format!(
        "🏗️ a new commit was pushed to {} ({}); dispatched {} workflow for {}; url: {}",
        rules.upstream_repo, default_branch, rules.sync_branch, rules.downstream_repo, run_url
    );
    ctx.notify_audit(&msg).await
}

async fn open_sync_pull_request(ctx: &HandlerContext<'_>, payload: &PushPayload) -> Result<()> {
    let rules = &ctx.config.rules;
    let default_branch = &payload.repository.default_branch;
    let run_url = latest_run_url(ctx, &ctx.repo, &rules.sync_workflow).await?;

    let msg = format!(
        "⏳ {} (origin/{}) is currently out-of-sync to {} (origin/{}); changes are proposed by @{} in actions - {}",
        rules.downstream_repo,
        default_branch,
        rules.upstream_repo,
        default_branch,
        ctx.config.bot.login,
        run_url
    );

    let pr = ctx
        .github()
        .create_pull_request(
            &ctx.repo,
            &NewPullRequest {
                title: SYNC_PR_TITLE.to_string(),
                head: rules.sync_branch.clone(),
                base: default_branch.clone(),
                body: msg.clone(),
            },
        )
        .await?;
    ctx.github()
        .add_labels(&ctx.repo, pr.number, &[AUTOMATED_PR_LABEL.to_string()])
        .await?;
    ctx.github()
        .add_assignees(&ctx.repo, pr.number, &[ctx.config.bot.login.clone()])
        .await?;

    ctx.notify_audit(&msg).await
}
