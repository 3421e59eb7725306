//! Tessera core: sequence-slot scheduling around a multimodal LLM engine.
//!
//! Maps completion ids onto a bounded pool of engine sequences, keeps the
//! per-sequence generation state, and derives the prompt constants (media crop
//! boundary, legacy antiprompt) that generation loops consult.

pub mod allocator;
pub mod antiprompt;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod state;

pub use allocator::{CompletionId, SlotAllocator, SlotId};
pub use antiprompt::Antiprompt;
pub use config::EngineConfig;
pub use context::{InferenceContext, SlotStatus};
pub use error::{ConfigError, InitError};
pub use format::{ChatTemplates, TemplateCrop, TemplateSource};
pub use state::{SequenceState, SequenceTable};
