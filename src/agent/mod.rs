//! Translation orchestration for one (source, language) pair.
//!
//! The loop is an explicit bounded state machine:
//!
//! ```text
//! BuildBrief ──▶ Attempt ──▶ Validate ──▶ Success
//!                  ▲            │
//!                  └── Retry ◀──┘ (feedback = last failure)
//!                               │
//!                               ▼
//!                           Exhausted
//! ```
//!
//! Backend errors and validation failures both consume an attempt. A missing translator
//! model or a failed coordinator brief aborts before any attempt is made.

mod prompts;
mod retry;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::checks::{CheckOptions, Checker};
use crate::descriptor::{AgentConfig, FrontmatterMode};
use crate::errors::{AttemptFailure, TranslateError};
use crate::llm::{ChatBackend, ChatMessage};
use crate::plan::Format;
pub use prompts::{default_brief, split_markdown_frontmatter, strip_code_fence};
pub use retry::RetryState;

/// Retries used when neither the run nor the directive sets one.
pub const DEFAULT_RETRIES: u32 = 2;

/// Everything needed to translate one pair.
#[derive(Debug, Clone)]
pub struct TranslationRequest<'a> {
    pub source: &'a str,
    pub target_lang: &'a str,
    pub format: Format,
    /// General and per-language context joined with blank lines
    pub context: &'a str,
    pub frontmatter: FrontmatterMode,
    pub checks: &'a CheckOptions,
    pub retries: u32,
    pub coordinator: &'a AgentConfig,
    pub translator: &'a AgentConfig,
}

impl TranslationRequest<'_> {
    fn splits_frontmatter(&self) -> bool {
        self.format == Format::Markdown && self.frontmatter == FrontmatterMode::Preserve
    }
}

/// Drives the coordinator and translator roles and validates their output.
#[derive(Clone)]
pub struct Agent {
    backend: Arc<dyn ChatBackend>,
    checker: Checker,
}

impl Agent {
    pub fn new(backend: Arc<dyn ChatBackend>, checker: Checker) -> Self {
        Self { backend, checker }
    }

    /// Translate and validate, retrying with feedback until the attempt budget runs out.
    pub async fn translate(&self, req: &TranslationRequest<'_>) -> Result<String, TranslateError> {
        let model = req
            .translator
            .model()
            .ok_or(TranslateError::MissingTranslatorModel)?;

        let (frontmatter, content) = match req
            .splits_frontmatter()
            .then(|| split_markdown_frontmatter(req.source))
            .flatten()
        {
            Some((frontmatter, body)) => (Some(frontmatter), body),
            None => (None, req.source.to_string()),
        };

        let brief = self.build_brief(req).await?;
        let mut state = RetryState::new(req.retries);

        loop {
            let attempt = state.begin();
            debug!(
                lang = req.target_lang,
                attempt,
                max = state.max_attempts(),
                "Translation attempt"
            );

            let result = self
                .attempt(req, model, &brief, &content, frontmatter.as_deref(), state.feedback())
                .await;
            match result {
                Ok(text) => return Ok(text),
                Err(failure) => {
                    warn!(
                        lang = req.target_lang,
                        attempt,
                        tool = failure.tool(),
                        "Attempt failed: {failure}"
                    );
                    if let Some(exhausted) = state.fail(failure) {
                        return Err(exhausted);
                    }
                }
            }
        }
    }

    async fn build_brief(&self, req: &TranslationRequest<'_>) -> Result<String, TranslateError> {
        let Some(model) = req.coordinator.model() else {
            return Ok(default_brief(req.format, req.splits_frontmatter()));
        };

        let messages = [
            ChatMessage::system(prompts::COORDINATOR_SYSTEM),
            ChatMessage::user(prompts::coordinator_prompt(req)),
        ];
        let brief = self
            .backend
            .chat(req.coordinator, model, &messages)
            .await
            .map_err(TranslateError::Brief)?;
        Ok(brief.trim().to_string())
    }

    async fn attempt(
        &self,
        req: &TranslationRequest<'_>,
        model: &str,
        brief: &str,
        content: &str,
        frontmatter: Option<&str>,
        feedback: Option<String>,
    ) -> Result<String, AttemptFailure> {
        let messages = [
            ChatMessage::system(prompts::translator_system(brief)),
            ChatMessage::user(prompts::translator_prompt(
                req.target_lang,
                req.context,
                content,
                feedback.as_deref(),
            )),
        ];
        let response = self.backend.chat(req.translator, model, &messages).await?;

        let mut text = response.trim_end_matches('\n').to_string();
        if req.format.is_structured() {
            text = strip_code_fence(&text);
        }
        if let Some(frontmatter) = frontmatter {
            text = if text.trim().is_empty() {
                format!("{frontmatter}\n")
            } else {
                format!("{frontmatter}\n{text}")
            };
        }

        self.checker
            .validate(req.format, &text, req.source, req.checks)
            .await?;
        Ok(text)
    }
}
