//! Handler registry and dispatch

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};

use crate::BotConfig;
use crate::db::KvStore;
use crate::error::{BotError, Result};
use crate::github::SourceControl;
use crate::telegram::{Messenger, broadcast};
use crate::webhook::{RepositoryRef, WebhookEvent};

pub const OK_RESULT: &str = "ok!";
pub const FAILED_RESULT: &str = "Ops something goes wrong.";

/// Result object returned to the webhook sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerOutcome {
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandlerOutcome {
    pub fn ok() -> Self {
        Self {
            result: OK_RESULT.to_string(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            result: FAILED_RESULT.to_string(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Result<()>> for HandlerOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// External services available to handlers.
#[derive(Clone)]
pub struct Collaborators {
    pub github: Arc<dyn SourceControl>,
    pub kv: Arc<dyn KvStore>,
    pub messenger: Arc<dyn Messenger>,
}

/// Everything a handler sees for one delivery.
pub struct HandlerContext<'a> {
    pub event: &'a WebhookEvent,
    pub repo: RepositoryRef,
    pub clients: &'a Collaborators,
    pub config: &'a BotConfig,
}

impl HandlerContext<'_> {
    pub fn github(&self) -> &dyn SourceControl {
        self.clients.github.as_ref()
    }

    pub fn kv(&self) -> &dyn KvStore {
        self.clients.kv.as_ref()
    }

    /// Logs `msg` and sends it to the audit channel.
    pub async fn notify_audit(&self, msg: &str) -> Result<()> {
        info!("{}", msg);
        broadcast(
            self.clients.messenger.as_ref(),
            msg,
            &[self.config.telegram.audit_channel_id.as_str()],
        )
        .await
    }

    /// Logs `msg` and sends it to the audit and public channels.
    pub async fn notify_public(&self, msg: &str) -> Result<()> {
        info!("{}", msg);
        broadcast(
            self.clients.messenger.as_ref(),
            msg,
            &self.config.public_channels(),
        )
        .await
    }

    pub fn unexpected_payload(&self) -> BotError {
        BotError::InvalidPayload(format!(
            "{} delivery does not carry the expected payload",
            self.event.key()
        ))
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// `event.action`, or the bare event name for action-less events.
    fn key(&self) -> &'static str;

    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()>;
}

/// Ordered, immutable set of handlers. The first handler whose key matches
/// the delivery wins.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<Box<dyn EventHandler>>) -> Self {
        Self { handlers }
    }

    pub fn find(&self, key: &str) -> Option<&dyn EventHandler> {
        self.handlers
            .iter()
            .find(|h| h.key() == key)
            .map(|h| h.as_ref())
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.key()).collect()
    }

    /// Runs the handler registered for `event`.
    ///
    /// Returns `None` when no handler is registered for the event key.
    pub async fn dispatch(
        &self,
        event: &WebhookEvent,
        clients: &Collaborators,
        config: &BotConfig,
    ) -> Option<HandlerOutcome> {
        let key = event.key();
        let Some(handler) = self.find(&key) else {
            info!("No handler registered for {} event, skipping", key);
            return None;
        };

        let Some(repo) = event.repository_ref() else {
            error!("{} event has no repository", key);
            return Some(HandlerOutcome::failed(
                BotError::MissingData("repository".to_string()).to_string(),
            ));
        };

        let span = info_span!(
            "app.handler",
            handler = handler.key(),
            repo = %repo.name,
            owner = %repo.owner,
            delivery = event.delivery_id.as_deref().unwrap_or("-"),
        );
        let ctx = HandlerContext {
            event,
            repo,
            clients,
            config,
        };

        let result = handler.handle(&ctx).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| error!("Handler {} failed: {}", key, e));
        }
        Some(result.into())
    }
}
