use serde::Serialize;

use super::InferenceContext;
use crate::allocator::{CompletionId, SlotId};
use tessera_abi::backend::InferenceBackend;
use tessera_abi::token::Token;

/// Point-in-time view of one request slot, for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub slot: SlotId,
    pub completion: Option<CompletionId>,
    pub is_inferring: bool,
    pub n_past: usize,
    pub last_token: Option<Token>,
}

impl<B: InferenceBackend> InferenceContext<B> {
    /// Status of every request slot. Each field is read atomically, but the
    /// rows are not a consistent cut across slots.
    pub fn snapshot(&self) -> Vec<SlotStatus> {
        self.allocator
            .owners()
            .into_iter()
            .enumerate()
            .map(|(i, completion)| {
                let slot = SlotId(i);
                let (is_inferring, n_past, last_token) = match self.state(slot) {
                    Some(s) => (s.is_inferring(), s.n_past(), s.last_token()),
                    None => (false, 0, None),
                };
                SlotStatus {
                    slot,
                    completion,
                    is_inferring,
                    n_past,
                    last_token,
                }
            })
            .collect()
    }
}
