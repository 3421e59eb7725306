//! Resolved chat template plus thin rendering helpers over the backend.

use tessera_abi::backend::{ChatTurn, InferenceBackend, Role};

use crate::error::InitError;

/// Where the active template came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSource {
    /// `chat_template` from configuration (body or built-in name).
    Configured,
    /// Template embedded in the model file.
    Model,
}

#[derive(Debug, Clone)]
pub struct ChatTemplates {
    template: String,
    source: TemplateSource,
}

impl ChatTemplates {
    /// Configured template first, then the model's own. Neither → error.
    pub fn resolve<B: InferenceBackend>(
        backend: &B,
        configured: Option<&str>,
    ) -> Result<Self, InitError> {
        if let Some(t) = configured {
            return Ok(Self {
                template: t.to_string(),
                source: TemplateSource::Configured,
            });
        }
        match backend.model_chat_template() {
            Some(t) if !t.trim().is_empty() => Ok(Self {
                template: t,
                source: TemplateSource::Model,
            }),
            _ => Err(InitError::MissingChatTemplate),
        }
    }

    #[inline]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[inline]
    pub fn source(&self) -> TemplateSource {
        self.source
    }

    pub fn render<B: InferenceBackend>(
        &self,
        backend: &B,
        turns: &[ChatTurn],
        add_assistant: bool,
    ) -> Result<String, String> {
        backend.apply_chat_template(&self.template, turns, add_assistant)
    }

    /// One message rendered on its own, without the assistant prefix.
    pub fn render_single<B: InferenceBackend>(
        &self,
        backend: &B,
        role: Role,
        content: &str,
    ) -> Result<String, String> {
        let turn = ChatTurn {
            role,
            content: content.to_string(),
        };
        self.render(backend, &[turn], false)
    }

    /// Short sample conversation, logged at startup so operators can eyeball the format.
    pub fn format_example<B: InferenceBackend>(&self, backend: &B) -> Result<String, String> {
        let turns = [
            ChatTurn::system("You are a helpful assistant"),
            ChatTurn::user("Hello"),
            ChatTurn::assistant("Hi there"),
            ChatTurn::user("How are you?"),
        ];
        self.render(backend, &turns, true)
    }
}
