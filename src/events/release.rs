use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::handler::{EventHandler, HandlerContext};
use crate::utils::random_suffix;

/// Records published releases and announces them publicly.
pub struct ReleasePublished;

#[async_trait]
impl EventHandler for ReleasePublished {
    fn key(&self) -> &'static str {
        "release.published"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = ctx
            .event
            .payload
            .as_release()
            .ok_or_else(|| ctx.unexpected_payload())?;
        let release = &payload.release;
        let metadata = json!({
            "repo": ctx.repo.name,
            "owner": ctx.repo.owner,
            "default_branch": payload.repository.default_branch,
            "release": {
                "html_url": release.html_url,
                "author": release.author.login,
                "tag": release.tag_name,
                "prerelease": release.prerelease,
                "published_at": release.published_at,
            },
        });
        info!("received a release.published event: {}", metadata);

        let key = format!(
            "released.{}.{}.{}",
            ctx.repo.name,
            random_suffix(),
            release.tag_name
        );
        ctx.kv().set(&key, &metadata.to_string()).await?;

        let msg = format!(
            "🌠 {} published a new release [{}]({}); it's been a long journey, thank you all for contributing to and supporting the [@{}](https://github.com/{}) community!",
            ctx.repo.name, release.tag_name, release.html_url, ctx.repo.owner, ctx.repo.owner
        );
        ctx.notify_public(&msg).await
    }
}
