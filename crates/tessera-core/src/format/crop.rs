//! Token prefix of a templated user turn, up to where the content goes.
//!
//! Prompt assembly cuts the rendered template at this boundary and splices
//! media chunks in. An empty boundary means no cropping is available.

use tessera_abi::backend::{InferenceBackend, Role};
use tessera_abi::token::Token;

use super::template::ChatTemplates;

/// Stand-in content used to find where user text lands in the template.
pub const CROP_PLACEHOLDER: &str = "*=*";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateCrop {
    tokens: Vec<Token>,
}

impl TemplateCrop {
    pub fn compute<B: InferenceBackend>(
        backend: &B,
        templates: &ChatTemplates,
    ) -> Result<Self, String> {
        let placeholder = backend.tokenize(CROP_PLACEHOLDER, false, true)?;
        let rendered = templates.render_single(backend, Role::User, CROP_PLACEHOLDER)?;
        let rendered = backend.tokenize(&rendered, false, true)?;
        Ok(Self::from_tokens(&rendered, &placeholder))
    }

    /// Tokens of `rendered` before the first contiguous run of `placeholder`.
    pub fn from_tokens(rendered: &[Token], placeholder: &[Token]) -> Self {
        let tokens = find_subsequence(rendered, placeholder)
            .map(|i| rendered[..i].to_vec())
            .unwrap_or_default();
        Self { tokens }
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True when a non-empty boundary is a prefix of `tokens`.
    pub fn is_prefix_of(&self, tokens: &[Token]) -> bool {
        !self.tokens.is_empty() && tokens.starts_with(&self.tokens)
    }
}

fn find_subsequence(haystack: &[Token], needle: &[Token]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(ids: &[i32]) -> Vec<Token> {
        ids.iter().copied().map(Token).collect()
    }

    #[test]
    fn boundary_is_prefix_before_first_match() {
        let crop = TemplateCrop::from_tokens(&toks(&[1, 2, 9, 9, 3, 9, 9]), &toks(&[9, 9]));
        assert_eq!(crop.tokens(), &toks(&[1, 2])[..]);
        assert!(crop.is_prefix_of(&toks(&[1, 2, 5])));
        assert!(!crop.is_prefix_of(&toks(&[1, 5])));
    }

    #[test]
    fn missing_placeholder_gives_empty() {
        let crop = TemplateCrop::from_tokens(&toks(&[1, 2, 3]), &toks(&[4]));
        assert!(crop.is_empty());
        assert!(!crop.is_prefix_of(&toks(&[1, 2, 3])));
    }

    #[test]
    fn placeholder_longer_than_rendered() {
        let crop = TemplateCrop::from_tokens(&toks(&[1]), &toks(&[1, 2]));
        assert!(crop.is_empty());
    }

    #[test]
    fn placeholder_at_start() {
        let crop = TemplateCrop::from_tokens(&toks(&[4, 5, 6]), &toks(&[4]));
        assert!(crop.is_empty());
    }
}
