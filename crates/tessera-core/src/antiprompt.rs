//! Stop-string detection for legacy chat formats that have no template-aware stopping.

use tessera_abi::backend::InferenceBackend;
use tessera_abi::token::Token;

/// Stop string for the built-in legacy templates that need one.
pub fn legacy_stop_string(template: &str) -> Option<&'static str> {
    match template {
        "vicuna" => Some("ASSISTANT:"),
        "deepseek" => Some("###"),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Antiprompt {
    tokens: Vec<Token>,
}

impl Antiprompt {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Tokenize the stop string for `template`, or return an empty antiprompt.
    pub fn for_template<B: InferenceBackend>(backend: &B, template: &str) -> Result<Self, String> {
        match legacy_stop_string(template) {
            Some(stop) => Ok(Self::new(backend.tokenize(stop, false, true)?)),
            None => Ok(Self::default()),
        }
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True iff `generated` ends with exactly the antiprompt tokens.
    pub fn is_stop(&self, generated: &[Token]) -> bool {
        !self.tokens.is_empty() && generated.ends_with(&self.tokens)
    }
}
