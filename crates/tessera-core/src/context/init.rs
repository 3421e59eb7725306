use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::InferenceContext;
use crate::allocator::SlotAllocator;
use crate::antiprompt::Antiprompt;
use crate::config::EngineConfig;
use crate::error::{InitError, Result};
use crate::format::{ChatTemplates, TemplateCrop};
use crate::state::SequenceTable;
use tessera_abi::backend::InferenceBackend;

impl<B: InferenceBackend> InferenceContext<B> {
    /// Load the model through `B` and build every derived handle.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            model = %config.model_path.display(),
            n_seq_max = config.max_sequences,
            n_ctx = config.context_size,
            "loading model"
        );
        let backend = B::load(&config.runtime_params()).map_err(|e| {
            error!("model load failed: {e}");
            InitError::ModelLoad(e)
        })?;
        Self::with_backend(backend, config)
    }

    /// Build on an already-loaded backend. On error the backend is dropped.
    pub fn with_backend(backend: B, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let sampler = backend
            .init_sampler(&config.sampling.normalized())
            .map_err(InitError::Sampler)?;

        let templates = ChatTemplates::resolve(&backend, config.chat_template_override())
            .inspect_err(|e| error!("{e}"))?;
        match templates.format_example(&backend) {
            Ok(example) => info!("chat template example:\n{example}"),
            Err(e) => return Err(InitError::Template(e)),
        }

        let crop = TemplateCrop::compute(&backend, &templates).map_err(InitError::Tokenize)?;
        if crop.is_empty() {
            info!("placeholder not found in rendered user turn; media cropping disabled");
        } else {
            debug!(tokens = crop.tokens().len(), "crop boundary computed");
        }

        let vision = match config.vision_params() {
            Some(params) => {
                let handle = backend.init_vision(&params).map_err(|reason| {
                    error!(path = %params.model_path.display(), "vision model load failed: {reason}");
                    InitError::VisionLoad {
                        path: params.model_path.clone(),
                        reason,
                    }
                })?;
                info!(path = %params.model_path.display(), gpu = params.use_gpu, "vision model loaded");
                Some(handle)
            }
            None => None,
        };

        let antiprompt = Antiprompt::for_template(&backend, config.chat_template.trim())
            .map_err(InitError::Tokenize)?;
        if !antiprompt.is_empty() {
            debug!(tokens = antiprompt.tokens().len(), "legacy antiprompt enabled");
        }

        let slots = config.slot_capacity();
        info!(
            slots,
            cache = config.cache_reservation,
            n_batch = config.batch_size,
            n_threads = config.thread_count,
            "inference context ready"
        );

        Ok(Self {
            vision,
            sampler: Mutex::new(sampler),
            templates,
            backend,
            states: SequenceTable::new(config.max_sequences as usize),
            allocator: SlotAllocator::new(slots),
            crop,
            antiprompt,
            config,
        })
    }
}
