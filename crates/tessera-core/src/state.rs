//! Per-sequence generation state and the fixed arena that holds one record per slot.
//!
//! Scalar fields are individually atomic so a status poller never sees a torn
//! value. The response text and attached bitmaps are written only by the
//! generation loop that owns the slot; the short per-field lock exists so an
//! observer can read them once `is_inferring` flips back to false.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use tessera_abi::media::Bitmap;
use tessera_abi::token::Token;

#[derive(Debug)]
pub struct SequenceState {
    last_token: AtomicI32,
    n_past: AtomicUsize,
    is_inferring: AtomicBool,
    response: Mutex<String>,
    bitmaps: Mutex<Vec<Bitmap>>,
}

impl Default for SequenceState {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceState {
    pub fn new() -> Self {
        Self {
            last_token: AtomicI32::new(Token::NONE_RAW),
            n_past: AtomicUsize::new(0),
            is_inferring: AtomicBool::new(false),
            response: Mutex::new(String::new()),
            bitmaps: Mutex::new(Vec::new()),
        }
    }

    // ── scalars ───────────────────────────────────

    pub fn last_token(&self) -> Option<Token> {
        let raw = self.last_token.load(Ordering::Acquire);
        (raw >= 0).then_some(Token(raw))
    }

    pub fn set_last_token(&self, token: Option<Token>) {
        let raw = token.map_or(Token::NONE_RAW, |t| t.0);
        self.last_token.store(raw, Ordering::Release);
    }

    /// Tokens already consumed by this slot's cache.
    #[inline]
    pub fn n_past(&self) -> usize {
        self.n_past.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_n_past(&self, n: usize) {
        self.n_past.store(n, Ordering::Release);
    }

    /// Add `n` evaluated tokens, returning the new position.
    pub fn advance(&self, n: usize) -> usize {
        self.n_past.fetch_add(n, Ordering::AcqRel) + n
    }

    #[inline]
    pub fn is_inferring(&self) -> bool {
        self.is_inferring.load(Ordering::Acquire)
    }

    /// Claim the slot for generation. Returns false if it was already busy.
    pub fn try_begin(&self) -> bool {
        self.is_inferring
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark generation finished; buffered text and bitmaps become readable.
    pub fn finish(&self) {
        self.is_inferring.store(false, Ordering::Release);
    }

    // ── buffers ───────────────────────────────────

    pub fn append_response(&self, piece: &str) {
        self.response.lock().push_str(piece);
    }

    pub fn response(&self) -> String {
        self.response.lock().clone()
    }

    pub fn take_response(&self) -> String {
        std::mem::take(&mut *self.response.lock())
    }

    pub fn push_bitmap(&self, bitmap: Bitmap) {
        self.bitmaps.lock().push(bitmap);
    }

    pub fn bitmap_count(&self) -> usize {
        self.bitmaps.lock().len()
    }

    pub fn take_bitmaps(&self) -> Vec<Bitmap> {
        std::mem::take(&mut *self.bitmaps.lock())
    }

    /// Return every field to its initial value, ready for the next request.
    /// Does not touch `is_inferring`; the owner calls [`finish`](Self::finish).
    pub fn reset(&self) {
        self.set_last_token(None);
        self.set_n_past(0);
        self.response.lock().clear();
        self.bitmaps.lock().clear();
    }
}

/// Fixed-capacity arena of sequence states, one cell per engine sequence.
/// Cells are created on first access and live as long as the table.
#[derive(Debug)]
pub struct SequenceTable {
    cells: Box<[OnceCell<SequenceState>]>,
}

impl SequenceTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: (0..capacity).map(|_| OnceCell::new()).collect(),
        }
    }

    /// State for `index`, created if this is the first touch. `None` past capacity.
    pub fn get(&self, index: usize) -> Option<&SequenceState> {
        self.cells
            .get(index)
            .map(|cell| cell.get_or_init(SequenceState::new))
    }

    /// True if the slot was touched and is currently generating.
    /// Never creates the cell.
    pub fn is_busy(&self, index: usize) -> bool {
        self.cells
            .get(index)
            .and_then(OnceCell::get)
            .is_some_and(SequenceState::is_inferring)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }
}
