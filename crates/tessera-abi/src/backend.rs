use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::sampling::SamplingParams;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    #[inline]
    pub fn system<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::System,
            content: s.into(),
        }
    }
    #[inline]
    pub fn user<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::User,
            content: s.into(),
        }
    }
    #[inline]
    pub fn assistant<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::Assistant,
            content: s.into(),
        }
    }
}

/// Parameters for creating the model and its multi-sequence context.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeParams {
    pub model_path: PathBuf,
    /// Total sequences the context is created with (cache sequences included).
    pub n_seq_max: u32,
    pub n_ctx: u32,
    pub n_batch: u32,
    pub n_threads: i32,
    pub use_gpu: bool,
}

/// Parameters for the multimodal projector.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionParams {
    pub model_path: PathBuf,
    pub use_gpu: bool,
    pub n_threads: i32,
    pub verbose: bool,
    pub print_timings: bool,
}

/// Engine-side contract the scheduler is built on.
///
/// One implementor = one loaded model plus one context able to hold
/// `n_seq_max` independent sequences. Dropping the implementor frees both;
/// the sampler and vision handles it hands out are dropped first by their owner.
pub trait InferenceBackend: Send + Sync {
    /// Sampler chain shared by all sequences.
    type Sampler: Send;
    /// Multimodal projector context.
    type Vision: Send + Sync;

    fn load(params: &RuntimeParams) -> Result<Self, String>
    where
        Self: Sized;

    /// Tokenize `text`. `add_special` prepends BOS where the model wants one;
    /// `parse_special` lets control tokens in `text` map to their ids.
    fn tokenize(
        &self,
        text: &str,
        add_special: bool,
        parse_special: bool,
    ) -> Result<Vec<Token>, String>;

    /// Chat template embedded in the model file, if any.
    fn model_chat_template(&self) -> Option<String>;

    /// Render `turns` through `template` (a template body or a built-in
    /// template name such as `"vicuna"`).
    fn apply_chat_template(
        &self,
        template: &str,
        turns: &[ChatTurn],
        add_assistant: bool,
    ) -> Result<String, String>;

    fn init_sampler(&self, params: &SamplingParams) -> Result<Self::Sampler, String>;

    fn init_vision(&self, params: &VisionParams) -> Result<Self::Vision, String>;
}
