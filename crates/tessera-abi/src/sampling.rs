use serde::{Deserialize, Serialize};

/// Sampler settings handed to the backend once, when the shared sampler is built.
/// Backends should treat these as desired knobs and ignore what they can't honor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// If true, pick argmax and ignore other stochastic knobs.
    pub greedy: bool,
    pub temperature: Option<f32>, // > 0.0 enables temperature scaling
    pub top_k: Option<u32>,       // >= 1
    pub top_p: Option<f32>,       // (0, 1]
    pub min_p: Option<f32>,       // (0, 1]
    pub repeat_penalty: Option<f32>,
    pub repeat_last_n: i32,
    pub seed: Option<u32>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            greedy: false,
            temperature: Some(0.8),
            top_k: Some(40),
            top_p: Some(0.95),
            min_p: Some(0.05),
            repeat_penalty: Some(1.0),
            repeat_last_n: 64,
            seed: None,
        }
    }
}

impl SamplingParams {
    /// Returns a conflict-free, clamped copy.
    ///
    /// - `greedy=true` drops every stochastic filter.
    /// - temperature <= 0 → disabled
    /// - top_k < 1 → disabled
    /// - top_p / min_p outside (0, 1] → disabled
    /// - repeat_penalty < 1.0 → 1.0, repeat_last_n < 0 → 0
    pub fn normalized(&self) -> Self {
        let mut p = self.clone();
        if p.greedy {
            p.temperature = None;
            p.top_k = None;
            p.top_p = None;
            p.min_p = None;
            return p;
        }

        p.temperature = p.temperature.filter(|t| *t > 0.0);
        p.top_k = p.top_k.filter(|k| *k >= 1);
        p.top_p = p.top_p.filter(|v| *v > 0.0 && *v <= 1.0);
        p.min_p = p.min_p.filter(|v| *v > 0.0 && *v <= 1.0);
        p.repeat_penalty = p.repeat_penalty.map(|r| r.max(1.0));
        p.repeat_last_n = p.repeat_last_n.max(0);
        p
    }
}
