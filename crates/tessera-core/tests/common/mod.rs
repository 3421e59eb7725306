//! Deterministic engine stand-in: one token per `char`, string templates.
#![allow(dead_code)]

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use tessera_abi::backend::{ChatTurn, InferenceBackend, RuntimeParams, VisionParams};
use tessera_abi::sampling::SamplingParams;
use tessera_abi::token::Token;
use tessera_core::EngineConfig;

pub const BOS: Token = Token(1);
pub const ANGLE_TEMPLATE: &str = "<{role}>{content}</{role}>";

pub type DropLog = Arc<Mutex<Vec<&'static str>>>;

pub struct CharBackend {
    pub embedded_template: Option<String>,
    pub fail_vision: bool,
    pub fail_sampler: bool,
    pub drops: DropLog,
}

impl CharBackend {
    pub fn with_template(template: &str) -> Self {
        Self {
            embedded_template: Some(template.to_string()),
            fail_vision: false,
            fail_sampler: false,
            drops: DropLog::default(),
        }
    }

    pub fn without_template() -> Self {
        Self {
            embedded_template: None,
            fail_vision: false,
            fail_sampler: false,
            drops: DropLog::default(),
        }
    }
}

impl Drop for CharBackend {
    fn drop(&mut self) {
        self.drops.lock().push("backend");
    }
}

pub struct CharSampler {
    pub params: SamplingParams,
    drops: DropLog,
}

impl Drop for CharSampler {
    fn drop(&mut self) {
        self.drops.lock().push("sampler");
    }
}

pub struct CharVision {
    pub path: PathBuf,
    pub use_gpu: bool,
    drops: DropLog,
}

impl Drop for CharVision {
    fn drop(&mut self) {
        self.drops.lock().push("vision");
    }
}

pub fn tokenize(text: &str) -> Vec<Token> {
    text.chars().map(|c| Token(c as i32)).collect()
}

fn render_turn(template: &str, turn: &ChatTurn) -> String {
    template
        .replace("{role}", turn.role.as_str())
        .replace("{content}", &turn.content)
}

impl InferenceBackend for CharBackend {
    type Sampler = CharSampler;
    type Vision = CharVision;

    fn load(params: &RuntimeParams) -> Result<Self, String> {
        if params.model_path.to_string_lossy().contains("missing") {
            return Err(format!("no such file: {}", params.model_path.display()));
        }
        Ok(Self::with_template(ANGLE_TEMPLATE))
    }

    fn tokenize(
        &self,
        text: &str,
        add_special: bool,
        _parse_special: bool,
    ) -> Result<Vec<Token>, String> {
        let mut out = Vec::with_capacity(text.len() + 1);
        if add_special {
            out.push(BOS);
        }
        out.extend(tokenize(text));
        Ok(out)
    }

    fn model_chat_template(&self) -> Option<String> {
        self.embedded_template.clone()
    }

    fn apply_chat_template(
        &self,
        template: &str,
        turns: &[ChatTurn],
        add_assistant: bool,
    ) -> Result<String, String> {
        let (per_turn, prefix) = match template {
            "vicuna" => ("{ROLE}: {content}\n", "ASSISTANT:"),
            "deepseek" => ("### {ROLE}: {content}\n", "### ASSISTANT:"),
            t if t.contains("{content}") => (t, "<assistant>"),
            other => return Err(format!("unknown template {other:?}")),
        };
        let mut out = String::new();
        for turn in turns {
            let t = per_turn.replace("{ROLE}", &turn.role.as_str().to_uppercase());
            out.push_str(&render_turn(&t, turn));
        }
        if add_assistant {
            out.push_str(prefix);
        }
        Ok(out)
    }

    fn init_sampler(&self, params: &SamplingParams) -> Result<CharSampler, String> {
        if self.fail_sampler {
            return Err("sampler chain rejected".into());
        }
        Ok(CharSampler {
            params: params.clone(),
            drops: self.drops.clone(),
        })
    }

    fn init_vision(&self, params: &VisionParams) -> Result<CharVision, String> {
        if self.fail_vision {
            return Err("bad mmproj header".into());
        }
        Ok(CharVision {
            path: params.model_path.clone(),
            use_gpu: params.use_gpu,
            drops: self.drops.clone(),
        })
    }
}

pub fn config(max_sequences: u32, cache_reservation: u32) -> EngineConfig {
    let mut cfg = EngineConfig::new("/models/test.gguf");
    cfg.max_sequences = max_sequences;
    cfg.cache_reservation = cache_reservation;
    cfg.thread_count = 2;
    cfg
}
