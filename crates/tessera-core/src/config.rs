//! Engine configuration: serde-loadable, with `TESSERA_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::error::ConfigError;
use tessera_abi::backend::{RuntimeParams, VisionParams};
use tessera_abi::sampling::SamplingParams;

/// Marker the prompt assembler replaces with image embeddings.
pub const DEFAULT_MEDIA_MARKER: &str = "<__media__>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model weights (gguf or whatever the backend loads).
    pub model_path: PathBuf,

    /// Total sequences the engine context holds, cache sequences included.
    #[serde(default = "default_max_sequences")]
    pub max_sequences: u32,

    /// Sequences withheld from request allocation for prompt caching.
    #[serde(default)]
    pub cache_reservation: u32,

    #[serde(default = "default_thread_count")]
    pub thread_count: i32,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Context window (n_ctx) shared by all sequences.
    #[serde(default = "default_context_size")]
    pub context_size: u32,

    /// Upper bound on tokens a single request may occupy; 0 means "whole context".
    #[serde(default)]
    pub usable_context: u32,

    /// Template body or built-in name. Empty uses the model-embedded template.
    #[serde(default)]
    pub chat_template: String,

    /// Multimodal projector; `None` disables image input.
    #[serde(default)]
    pub vision_model_path: Option<PathBuf>,

    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,

    #[serde(default = "default_media_marker")]
    pub media_marker: String,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub sampling: SamplingParams,
}

fn default_max_sequences() -> u32 {
    4
}

fn default_thread_count() -> i32 {
    num_cpus::get_physical().max(1) as i32
}

fn default_batch_size() -> u32 {
    512
}

fn default_context_size() -> u32 {
    8192
}

fn default_use_gpu() -> bool {
    true
}

fn default_media_marker() -> String {
    DEFAULT_MEDIA_MARKER.to_string()
}

impl EngineConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: model_path.into(),
            max_sequences: default_max_sequences(),
            cache_reservation: 0,
            thread_count: default_thread_count(),
            batch_size: default_batch_size(),
            context_size: default_context_size(),
            usable_context: 0,
            chat_template: String::new(),
            vision_model_path: None,
            use_gpu: default_use_gpu(),
            media_marker: default_media_marker(),
            verbose: false,
            sampling: SamplingParams::default(),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Apply `TESSERA_MAX_SEQUENCES`, `TESSERA_CACHE_SEQUENCES`, `TESSERA_N_THREADS`,
    /// `TESSERA_N_BATCH` and `TESSERA_N_CTX` from the process environment.
    /// Unparseable values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with a custom lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse::<T>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(key, value = %raw, "ignoring unparseable override");
                    None
                }
            }
        }

        if let Some(n) = parse("TESSERA_MAX_SEQUENCES", lookup("TESSERA_MAX_SEQUENCES")) {
            self.max_sequences = n;
        }
        if let Some(n) = parse("TESSERA_CACHE_SEQUENCES", lookup("TESSERA_CACHE_SEQUENCES")) {
            self.cache_reservation = n;
        }
        if let Some(n) = parse("TESSERA_N_THREADS", lookup("TESSERA_N_THREADS")) {
            self.thread_count = n;
        }
        if let Some(n) = parse("TESSERA_N_BATCH", lookup("TESSERA_N_BATCH")) {
            self.batch_size = n;
        }
        if let Some(n) = parse("TESSERA_N_CTX", lookup("TESSERA_N_CTX")) {
            self.context_size = n;
        }
        self
    }

    /// Enforce `0 <= cache_reservation < max_sequences`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sequences == 0 {
            return Err(ConfigError::NoSequences);
        }
        if self.cache_reservation >= self.max_sequences {
            return Err(ConfigError::ReservationTooLarge {
                reserved: self.cache_reservation,
                max: self.max_sequences,
            });
        }
        Ok(())
    }

    /// Slots handed out to requests.
    #[inline]
    pub fn slot_capacity(&self) -> usize {
        self.max_sequences.saturating_sub(self.cache_reservation) as usize
    }

    /// Configured chat template, `None` when empty.
    pub fn chat_template_override(&self) -> Option<&str> {
        let t = self.chat_template.trim();
        if t.is_empty() { None } else { Some(t) }
    }

    pub fn runtime_params(&self) -> RuntimeParams {
        RuntimeParams {
            model_path: self.model_path.clone(),
            n_seq_max: self.max_sequences,
            n_ctx: self.context_size,
            n_batch: self.batch_size,
            n_threads: self.thread_count,
            use_gpu: self.use_gpu,
        }
    }

    pub fn vision_params(&self) -> Option<VisionParams> {
        let path = self.vision_model_path.as_ref()?;
        Some(VisionParams {
            model_path: path.clone(),
            use_gpu: self.use_gpu,
            n_threads: self.thread_count,
            verbose: self.verbose,
            print_timings: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn json_fills_defaults() {
        let cfg = EngineConfig::from_json_str(r#"{"model_path": "/models/m.gguf"}"#).unwrap();
        assert_eq!(cfg.max_sequences, 4);
        assert_eq!(cfg.cache_reservation, 0);
        assert_eq!(cfg.media_marker, DEFAULT_MEDIA_MARKER);
        assert!(cfg.vision_model_path.is_none());
        assert!(cfg.chat_template_override().is_none());
    }

    #[test]
    fn json_rejects_missing_model_path() {
        assert!(matches!(
            EngineConfig::from_json_str("{}"),
            Err(ConfigError::Serde(_))
        ));
    }

    #[test]
    fn overrides_apply_and_ignore_garbage() {
        let env: HashMap<&str, &str> = [
            ("TESSERA_MAX_SEQUENCES", "8"),
            ("TESSERA_CACHE_SEQUENCES", "2"),
            ("TESSERA_N_BATCH", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let cfg = EngineConfig::new("m.gguf")
            .with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.max_sequences, 8);
        assert_eq!(cfg.cache_reservation, 2);
        assert_eq!(cfg.batch_size, 512);
        assert_eq!(cfg.slot_capacity(), 6);
    }

    #[test]
    fn validate_capacity_policy() {
        let mut cfg = EngineConfig::new("m.gguf");
        cfg.max_sequences = 4;
        cfg.cache_reservation = 3;
        assert!(cfg.validate().is_ok());

        cfg.cache_reservation = 4;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ReservationTooLarge { reserved: 4, max: 4 })
        ));

        cfg.max_sequences = 0;
        cfg.cache_reservation = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NoSequences)));
    }

    #[test]
    fn vision_params_follow_config() {
        let mut cfg = EngineConfig::new("m.gguf");
        assert!(cfg.vision_params().is_none());
        cfg.vision_model_path = Some("/models/mmproj.gguf".into());
        cfg.use_gpu = false;
        let vp = cfg.vision_params().unwrap();
        assert!(!vp.use_gpu);
        assert!(vp.print_timings);
        assert_eq!(vp.n_threads, cfg.thread_count);
    }
}
