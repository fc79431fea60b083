use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::AUTOMATED_PR_LABEL;
use crate::error::{BotError, Result};
use crate::github::{FileUpdate, Identity, NewPullRequest};
use crate::handler::{EventHandler, HandlerContext};
use crate::release::{
    ReleaseMetadata, extract_release_tag, release_notes_from_issue, splice_changelog,
};
use crate::webhook::IssueCommentPayload;

const RELEASE_LABEL: &str = "release:auto";
const CLOSED: &str = "closed";

/// `@bot ... release-vX.Y.Z` on a closed release issue drafts the release:
/// a release branch, generated changelogs and a pull request.
pub struct ReleaseCommand;

impl ReleaseCommand {
    fn is_release_request(ctx: &HandlerContext<'_>, payload: &IssueCommentPayload) -> bool {
        let rules = &ctx.config.rules;
        let body = &payload.comment.body;

        rules.release_repos.contains(&ctx.repo.name)
            && body.starts_with(&format!("@{}", ctx.config.bot.login))
            && body.contains("release-")
            && payload.issue.state == CLOSED
            && rules.release_maintainers.contains(&payload.comment.user.login)
    }
}

#[async_trait]
impl EventHandler for ReleaseCommand {
    fn key(&self) -> &'static str {
        "issue_comment.created"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = ctx
            .event
            .payload
            .as_issue_comment()
            .ok_or_else(|| ctx.unexpected_payload())?;
        info!(
            "received an issue_comment.created event: {}",
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
                    "state": payload.issue.state,
                },
                "comment": {
                    "user": payload.comment.user.login,
                    "html_url": payload.comment.html_url,
                    "created_at": payload.comment.created_at,
                },
            })
        );

        if !Self::is_release_request(ctx, payload) {
            debug!("Comment is not a release request, skipping");
            return Ok(());
        }

        let tag = extract_release_tag(&payload.comment.body).ok_or_else(|| {
            BotError::MissingData(format!(
                "no release tag in comment {}",
                payload.comment.html_url
            ))
        })?;
        let release = ReleaseMetadata::new(tag, payload.comment.created_at);
        info!("release metadata: {}", serde_json::to_string(&release)?);

        let github = ctx.github();
        let default_branch = &payload.repository.default_branch;
        let changelog_path = &ctx.config.rules.changelog_path;

        let head = github.get_commit(&ctx.repo, default_branch).await?;
        github
            .create_ref(&ctx.repo, &format!("refs/heads/{}", release.branch), &head.sha)
            .await?;

        let original = github
            .get_file_contents(&ctx.repo, changelog_path, &release.branch)
            .await?;
        let notes = release_notes_from_issue(payload.issue.body.as_deref().unwrap_or_default());
        let changelog = splice_changelog(&original.content, &release, notes)?;

        let identity = Identity {
            name: ctx.config.bot.committer_name.clone(),
            email: ctx.config.bot.committer_email.clone(),
        };
        github
            .update_file_contents(
                &ctx.repo,
                &FileUpdate {
                    path: changelog_path.clone(),
                    message: format!("ci: generate changelogs for {}", release.branch),
                    content: changelog,
                    sha: original.sha,
                    branch: release.branch.clone(),
                    committer: identity.clone(),
                    author: identity,
                },
            )
            .await?;

        let mut msg = format!(
            "🛸 Auto release process for {} begins! Changelogs and release notes are generated by @{} automatically. Ref: issue [#{}: {}]({})",
            ctx.repo.name,
            ctx.config.bot.login,
            payload.issue.number,
            payload.issue.title,
            payload.issue.html_url
        );
        let pr = github
            .create_pull_request(
                &ctx.repo,
                &NewPullRequest {
                    title: format!("ci(release): draft release {}", release.tag),
                    head: release.branch.clone(),
                    base: default_branch.clone(),
                    body: msg.clone(),
                },
            )
            .await?;
        github
            .add_labels(
                &ctx.repo,
                pr.number,
                &[AUTOMATED_PR_LABEL.to_string(), RELEASE_LABEL.to_string()],
            )
            .await?;

        msg.push_str(&format!("; PR [#{}: {}]({})", pr.number, pr.title, pr.html_url));
        ctx.notify_audit(&msg).await
    }
}
