use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{BotError, Result};
use crate::handler::{EventHandler, HandlerContext};

/// Tracks the star count of a repository and announces new highs.
pub struct StarCreated;

/// KV key holding the last announced star count.
pub fn star_key(repo: &str) -> String {
    format!("stars.{}", repo)
}

#[async_trait]
impl EventHandler for StarCreated {
    fn key(&self) -> &'static str {
        "star.created"
    }

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let payload = ctx
            .event
            .payload
            .as_star()
            .ok_or_else(|| ctx.unexpected_payload())?;
        info!("received a star.created event: {}", ctx.repo);

        let key = star_key(&ctx.repo.name);
        let stored = ctx
            .kv()
            .get(&key)
            .await?
            .ok_or_else(|| BotError::MissingData(format!("key {} does not exist", key)))?;
        let stored: u64 = stored.trim().parse().map_err(|_| {
            BotError::MissingData(format!("key {} holds a non-numeric value {:?}", key, stored))
        })?;

        let total = payload.repository.stargazers_count;
        if total <= stored {
            debug!("Star count {} does not exceed stored {}, skipping", total, stored);
            return Ok(());
        }

        ctx.kv().set(&key, &total.to_string()).await?;
        let msg = format!(
            "⭐ Repo: {} received a new star from [@{}]({})! Total stars: {}",
            payload.repository.name, payload.sender.login, payload.sender.html_url, total
        );
        ctx.notify_audit(&msg).await
    }
}
