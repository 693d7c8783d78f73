//! Chat assistant
//!
//! Thin wrapper around an optional on-device language model, with rule-based
//! fallbacks when no model is around.

pub mod format;
pub mod grammar;
pub mod profile;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::model::{DiaryBook, Routine, Settings, Tone};
use crate::storage::{fields, PersistenceManager};

pub use format::format_markdown;
pub use grammar::fix_grammar;
pub use profile::summarize_profile;

/// Reply used when the model fails mid-conversation
pub const OFFLINE_MESSAGE: &str =
    "I'm in offline mode right now and can't think that through. Try again in a moment.";

/// Prefix for grammar-fixer replies
pub const OFFLINE_NOTICE: &str = "(offline mode)";

/// Assistant errors
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Model unavailable")]
    Unavailable,
    #[error("Model error: {0}")]
    Model(String),
}

/// On-device language model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn is_available(&self) -> bool;
    async fn prompt(&self, tone: Tone, text: &str) -> Result<String, AssistantError>;
}

pub struct Assistant {
    model: Option<Arc<dyn LanguageModel>>,
}

impl Assistant {
    pub fn new(model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { model }
    }

    /// Offline-only assistant
    pub fn offline() -> Self {
        Self { model: None }
    }

    async fn live_model(&self) -> Option<&Arc<dyn LanguageModel>> {
        let model = self.model.as_ref()?;
        if model.is_available().await {
            Some(model)
        } else {
            tracing::info!("Language model not available, using offline fallback");
            None
        }
    }

    /// Reply to `text` in the given tone. Never fails.
    pub async fn reply(&self, tone: Tone, text: &str) -> String {
        match self.live_model().await {
            Some(model) => match model.prompt(tone, text).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!("Language model failed: {}", e);
                    OFFLINE_MESSAGE.to_string()
                }
            },
            None => format!("{} {}", OFFLINE_NOTICE, fix_grammar(text)),
        }
    }

    /// [`Assistant::reply`] rendered to HTML
    pub async fn reply_html(&self, tone: Tone, text: &str) -> String {
        format_markdown(&self.reply(tone, text).await)
    }

    /// Rebuild the profile summary from stored data and save it.
    pub async fn refresh_profile(&self, manager: &PersistenceManager) -> String {
        let settings: Settings = manager.load_typed(fields::SETTINGS, Settings::default()).await;
        let routines: Vec<Routine> = manager.load_typed(fields::ROUTINES, Vec::new()).await;
        let diary: DiaryBook = manager.load_typed(fields::DIARY, DiaryBook::new()).await;

        let summary = summarize_profile(&settings, &routines, &diary);
        manager.save_typed(fields::PROFILE_SUMMARY, &summary).await;
        tracing::debug!("Profile summary refreshed ({} chars)", summary.len());
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeModel {
        available: bool,
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn is_available(&self) -> bool {
            self.available
        }

        async fn prompt(&self, tone: Tone, text: &str) -> Result<String, AssistantError> {
            if self.fail {
                return Err(AssistantError::Model("session crashed".into()));
            }
            Ok(format!("[{}] {}", tone.adjective(), text))
        }
    }

    fn assistant(available: bool, fail: bool) -> Assistant {
        Assistant::new(Some(Arc::new(FakeModel { available, fail })))
    }

    #[tokio::test]
    async fn test_model_reply() {
        let reply = assistant(true, false).reply(Tone::Sage, "hello").await;
        assert_eq!(reply, "[reflective] hello");
    }

    #[tokio::test]
    async fn test_model_failure_is_offline_message() {
        let reply = assistant(true, true).reply(Tone::Coach, "hello").await;
        assert_eq!(reply, OFFLINE_MESSAGE);
    }

    #[tokio::test]
    async fn test_unavailable_model_uses_grammar_fixer() {
        let reply = assistant(false, false).reply(Tone::Friend, "i went  running").await;
        assert_eq!(reply, "(offline mode) I went running.");

        let reply = Assistant::offline().reply(Tone::Friend, "ok").await;
        assert_eq!(reply, "(offline mode) Ok.");
    }

    #[tokio::test]
    async fn test_reply_html() {
        let html = assistant(true, false).reply_html(Tone::Assistant, "**done**").await;
        assert_eq!(html, "<p>[formal] <strong>done</strong></p>");
    }
}
