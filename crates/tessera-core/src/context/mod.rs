//! Inference context: owner of the engine handles and of all slot bookkeeping.

use parking_lot::{Mutex, MutexGuard};
use std::ops::Range;
use tracing::{debug, warn};

use crate::allocator::{CompletionId, SlotAllocator, SlotId};
use crate::antiprompt::Antiprompt;
use crate::config::EngineConfig;
use crate::format::{ChatTemplates, TemplateCrop};
use crate::state::{SequenceState, SequenceTable};
use tessera_abi::backend::InferenceBackend;
use tessera_abi::token::Token;

// Child modules add `impl InferenceContext<B>` blocks.
mod init;
mod status;

pub use status::SlotStatus;

/// One loaded model shared by up to `slot_capacity` concurrent completions.
///
/// Fields drop in declaration order: the vision context goes first, then the
/// sampler and templates, and the backend (model + context) last.
pub struct InferenceContext<B: InferenceBackend> {
    vision: Option<B::Vision>,
    sampler: Mutex<B::Sampler>,
    templates: ChatTemplates,
    backend: B,

    states: SequenceTable,
    allocator: SlotAllocator,
    crop: TemplateCrop,
    antiprompt: Antiprompt,
    config: EngineConfig,
}

impl<B: InferenceBackend> InferenceContext<B> {
    // ─────────────────────────────────────────────
    // Slot dispatch
    // ─────────────────────────────────────────────

    /// Lowest free slot for `id`, or the slot it already holds.
    /// `None` when every slot is taken; the caller decides whether to retry.
    pub fn reserve(&self, id: CompletionId) -> Option<SlotId> {
        let slot = self.allocator.reserve(id, &self.states);
        if slot.is_none() {
            debug!(%id, capacity = self.slot_capacity(), "no free slot");
        }
        slot
    }

    pub fn lookup(&self, id: CompletionId) -> Option<SlotId> {
        self.allocator.lookup(id)
    }

    /// Unmap `slot`. Call only after the generation loop writing to it has
    /// stopped; state fields are not reset here.
    pub fn release(&self, slot: SlotId) -> bool {
        let found = self.allocator.release(slot);
        if !found {
            warn!(%slot, "release of unmapped slot");
        }
        found
    }

    /// State record for any engine sequence, cache sequences included.
    pub fn state(&self, slot: SlotId) -> Option<&SequenceState> {
        self.states.get(slot.0)
    }

    /// Completion currently mapped to `slot`.
    pub fn owner(&self, slot: SlotId) -> Option<CompletionId> {
        self.allocator.owner(slot)
    }

    /// Mapped completions right now.
    pub fn active(&self) -> usize {
        self.allocator.len()
    }

    // ─────────────────────────────────────────────
    // Capacity
    // ─────────────────────────────────────────────

    /// Slots available to requests.
    #[inline]
    pub fn slot_capacity(&self) -> usize {
        self.config.slot_capacity()
    }

    #[inline]
    pub fn cache_reservation(&self) -> usize {
        self.config.cache_reservation as usize
    }

    /// Engine sequence indices withheld for the prompt cache.
    pub fn cache_slots(&self) -> Range<usize> {
        self.slot_capacity()..self.config.max_sequences as usize
    }

    // ─────────────────────────────────────────────
    // Prompt helpers
    // ─────────────────────────────────────────────

    pub fn crop_boundary(&self) -> &[Token] {
        self.crop.tokens()
    }

    pub fn antiprompt(&self) -> &Antiprompt {
        &self.antiprompt
    }

    /// Legacy stop check, run after each generated batch.
    pub fn is_stop(&self, generated: &[Token]) -> bool {
        self.antiprompt.is_stop(generated)
    }

    pub fn media_marker(&self) -> &str {
        &self.config.media_marker
    }

    // ─────────────────────────────────────────────
    // Engine handles
    // ─────────────────────────────────────────────

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Exclusive access to the shared sampler for one sampling step.
    pub fn sampler(&self) -> MutexGuard<'_, B::Sampler> {
        self.sampler.lock()
    }

    pub fn vision(&self) -> Option<&B::Vision> {
        self.vision.as_ref()
    }

    pub fn templates(&self) -> &ChatTemplates {
        &self.templates
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn batch_size(&self) -> u32 {
        self.config.batch_size
    }

    #[inline]
    pub fn thread_count(&self) -> i32 {
        self.config.thread_count
    }

    /// Token budget for one request; falls back to the full context window.
    pub fn usable_context(&self) -> u32 {
        match self.config.usable_context {
            0 => self.config.context_size,
            n => n.min(self.config.context_size),
        }
    }
}
