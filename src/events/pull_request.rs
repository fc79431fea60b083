//! Pull request handlers: triage on open, auto-sync, release tagging and
//! approval once tested.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::latest_run_url;
use crate::error::{BotError, Result};
use crate::github::{NewReview, ReviewEvent, ReviewRequest};
use crate::handler::{EventHandler, HandlerContext};
use crate::labels::{TESTED, classify_title, is_testable_title};
use crate::sync::{self, SyncInputs};
use crate::utils::random_suffix;
use crate::webhook::PullRequestPayload;

const RELEASE_BRANCH_PREFIX: &str = "release-";
const TESTED_REVIEW_BODY: &str =
    "🧪 Since the PR has been fully tested, please consider merging it.";

pub struct Opened;
pub struct Synchronize;
pub struct Closed;
pub struct Labeled;

fn payload<'a>(ctx: &'a HandlerContext<'_>) -> Result<&'a PullRequestPayload> {
    ctx.event
        .payload
        .as_pull_request()
        .ok_or_else(|| ctx.unexpected_payload())
}

fn pr_metadata(ctx: &HandlerContext<'_>, payload: &PullRequestPayload) -> serde_json::Value {
    let pr = &payload.pull_request;
    json!({
        "repo": ctx.repo.name,
        "owner": ctx.repo.owner,
        "default_branch": payload.repository.default_branch,
        "html_url": payload.repository.html_url,
        "pull_request": {
            "ref": pr.head.git_ref,
            "sha": pr.head.sha,
            "title": pr.title,
            "author": pr.user.login,
            "number": pr.number,
            "updated_at": pr.updated_at,
            "html_url": pr.html_url,
            "merged": pr.merged,
        },
    })
}

#[async_trait]
impl EventHandler for Opened {
    fn key(&self) -> &'static str {
        "pull_request.opened"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = payload(ctx)?;
        info!(
            "received a pull_request.opened event: {}",
            pr_metadata(ctx, payload)
        );
        let pr = &payload.pull_request;
        let github = ctx.github();
        let bot = &ctx.config.bot;

        // bots cannot be assignees
        let assignee = if pr.user.login.contains("bot") {
            bot.login.clone()
        } else {
            pr.user.login.clone()
        };
        github
            .add_assignees(&ctx.repo, pr.number, &[assignee.clone()])
            .await?;
        ctx.notify_audit(&format!(
            "👷 PR - [#{}: {}]({}) is raised in {}; assign @{} as the default assignee.",
            pr.number, pr.title, pr.html_url, ctx.repo.name, assignee
        ))
        .await?;

        let classification = classify_title(&pr.title);
        let existing = github.list_labels_on_issue(&ctx.repo, pr.number).await?;
        if let (true, Some(class)) = (existing.is_empty(), classification) {
            let msg = format!(
                "🏷 PR - [#{}]({}) in {} is missing labels; added {}.",
                pr.number,
                pr.html_url,
                ctx.repo.name,
                json!([class.label])
            );

            if class.strict && ctx.config.rules.qa_repos.contains(&ctx.repo.name) {
                github
                    .request_reviewers(
                        &ctx.repo,
                        pr.number,
                        &ReviewRequest {
                            team_reviewers: vec![bot.qa_team.clone()],
                            ..ReviewRequest::default()
                        },
                    )
                    .await?;
            }
            github
                .add_labels(&ctx.repo, pr.number, &class.labels())
                .await?;
            ctx.notify_audit(&msg).await?;
        }

        if classification.is_some() {
            github
                .request_reviewers(
                    &ctx.repo,
                    pr.number,
                    &ReviewRequest {
                        reviewers: vec![bot.reviewer.clone()],
                        ..ReviewRequest::default()
                    },
                )
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for Synchronize {
    fn key(&self) -> &'static str {
        "pull_request.synchronize"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = payload(ctx)?;
        info!(
            "received a pull_request.synchronize event: {}",
            pr_metadata(ctx, payload)
        );
        let pr = &payload.pull_request;
        let default_branch = &payload.repository.default_branch;
        let github = ctx.github();

        let (comparison, head) = tokio::try_join!(
            github.compare_commits(&ctx.repo, default_branch, &pr.head.git_ref),
            github.get_commit(&ctx.repo, &pr.head.git_ref),
        )?;

        let merge_base = comparison
            .merge_base_commit
            .commit
            .committer
            .ok_or_else(|| BotError::MissingData("merge base committer".to_string()))?;
        let pr_head = head
            .commit
            .committer
            .ok_or_else(|| BotError::MissingData("PR head committer".to_string()))?;

        let decision = sync::decide(
            &SyncInputs {
                status: comparison.status,
                merge_base_date: merge_base.date,
                pr_head_date: pr_head.date,
                last_committer: &pr_head.name,
            },
            &ctx.config.pr_max_age,
        )?;
        info!(
            status = %decision.status,
            exceeds_age_timeout = decision.exceeds_age_timeout,
            last_committer = %pr_head.name,
            age_deadline = %decision.age_deadline,
            pr_head_date = %pr_head.date,
            "auto-sync decision: {}",
            decision.should_sync
        );
        if !decision.should_sync {
            return Ok(());
        }

        github
            .create_issue_comment(
                &ctx.repo,
                pr.number,
                &format!(
                    "❌ Your branch is currently out-of-sync to {}. No worry, I will fix it for you.",
                    default_branch
                ),
            )
            .await?;
        github
            .merge_branches(&ctx.repo, &pr.head.git_ref, default_branch)
            .await?;

        ctx.notify_audit(&format!(
            "🚗 PR [#{}: {}]({}) is currently out-of-sync in {}; automatically merge origin/{} to keep it up-to-date; url: {}",
            pr.number, pr.title, pr.html_url, ctx.repo.name, default_branch, pr.html_url
        ))
        .await
    }
}

#[async_trait]
impl EventHandler for Closed {
    fn key(&self) -> &'static str {
        "pull_request.closed"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = payload(ctx)?;
        let metadata = pr_metadata(ctx, payload);
        info!("received a pull_request.closed event: {}", metadata);

        let pr = &payload.pull_request;
        if !pr.merged {
            debug!("PR #{} closed without merging", pr.number);
            return Ok(());
        }
        let default_branch = &payload.repository.default_branch;
        let github = ctx.github();

        let key = format!(
            "pr.merged.{}.{}.{}",
            ctx.repo.name,
            random_suffix(),
            pr.number
        );
        ctx.kv().set(&key, &metadata.to_string()).await?;
        ctx.notify_audit(&format!(
            "🚀 PR - [#{}]({}) in {} has been merged into {}; good job guys, let's keep it up",
            pr.number, pr.html_url, ctx.repo.name, default_branch
        ))
        .await?;

        if let Some(tag) = pr
            .head
            .git_ref
            .strip_prefix(RELEASE_BRANCH_PREFIX)
            .filter(|t| !t.is_empty())
        {
            let rules = &ctx.config.rules;
            let workflow = if tag.contains("rc") {
                &rules.prerelease_workflow
            } else {
                &rules.release_workflow
            };

            let head = github.get_commit(&ctx.repo, default_branch).await?;
            github
                .create_ref(&ctx.repo, &format!("refs/tags/{}", tag), &head.sha)
                .await?;
            github
                .create_workflow_dispatch(
                    &ctx.repo,
                    workflow,
                    default_branch,
                    json!({ "tag": tag }),
                )
                .await?;
            let run_url = latest_run_url(ctx, &ctx.repo, workflow).await?;

            ctx.notify_audit(&format!(
                "🌌 PR - [#{}]({}) associated with {} has been merged; created and pushed a new release tag {}; release build is now kicked off! just chill, we are getting there 💪; workflow run: {}",
                pr.number, pr.html_url, pr.head.git_ref, tag, run_url
            ))
            .await?;
        }

        let rules = &ctx.config.rules;
        if ctx.repo.name == rules.downstream_repo && pr.head.git_ref == rules.sync_branch {
            github
                .delete_ref(&ctx.repo, &format!("heads/{}", rules.sync_branch))
                .await?;
            info!("Deleted merged branch {} in {}", rules.sync_branch, ctx.repo);
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for Labeled {
    fn key(&self) -> &'static str {
        "pull_request.labeled"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = payload(ctx)?;
        let label = payload.label.as_ref().map(|l| l.name.as_str());
        info!(
            "received a pull_request.labeled event: {}; label: {}",
            pr_metadata(ctx, payload),
            label.unwrap_or("-")
        );

        let pr = &payload.pull_request;
        if label != Some(TESTED) || !is_testable_title(&pr.title) {
            return Ok(());
        }

        ctx.github()
            .create_review(
                &ctx.repo,
                pr.number,
                &NewReview {
                    commit_id: pr.head.sha.clone(),
                    body: TESTED_REVIEW_BODY.to_string(),
                    event: ReviewEvent::Approve,
                },
            )
            .await?;

        ctx.notify_audit(&format!(
            "🧪 PR - [#{}: {}]({}) in {} has been fully tested; please consider merging it as soon as possible.",
            pr.number, pr.title, pr.html_url, ctx.repo.name
        ))
        .await
    }
}
