//! Shared application state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ragdesk_chat::{ChatBackend, GenerationOptions, HttpChatBackend, LLMConfig};
use ragdesk_core::{Domain, RagDeskConfig, Result, SamplingConfig};
use ragdesk_infer::EmbedderBackend;
use ragdesk_runtime::{Coordinator, Generator, SessionRegistry};
use ragdesk_store::{BuildOptions, KnowledgeBase, SharedKnowledge};
use tracing::info;

/// Read the domain documents from the data directory and index them.
pub fn load_knowledge(
    config: &RagDeskConfig,
    embedder: &Arc<dyn EmbedderBackend>,
) -> Result<KnowledgeBase> {
    let texts = ragdesk_store::load_domain_texts(&config.data_paths)?;
    let options = BuildOptions {
        chunking: config.chunking,
    };
    ragdesk_store::build(&texts, embedder, &options)
}

/// Resolve the LLM provider once and wrap it for the agents.
pub fn resolve_generator(config: &RagDeskConfig) -> Generator {
    let backend = LLMConfig::load(&config.data_paths.llm_config_file)
        .resolve_provider()
        .map(|resolved| Arc::new(HttpChatBackend::new(resolved)) as Arc<dyn ChatBackend>);
    Generator::new(backend, Duration::from_secs(config.llm_timeout_secs))
        .with_options(generation_options(&config.sampling))
}

/// Sampling overrides applied on top of the default options.
pub fn generation_options(sampling: &SamplingConfig) -> GenerationOptions {
    let defaults = GenerationOptions::default();
    GenerationOptions {
        temperature: sampling.temperature.unwrap_or(defaults.temperature),
        max_tokens: sampling.max_tokens.unwrap_or(defaults.max_tokens),
        top_p: sampling.top_p.or(defaults.top_p),
    }
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: RagDeskConfig,
    pub embedder: Arc<dyn EmbedderBackend>,
    pub coordinator: Coordinator,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(
        config: RagDeskConfig,
        embedder: Arc<dyn EmbedderBackend>,
        knowledge: KnowledgeBase,
        generator: Generator,
    ) -> Self {
        let coordinator = Coordinator::new(SharedKnowledge::new(knowledge), generator);
        info!("{}", coordinator.status());
        Self {
            config,
            embedder,
            coordinator,
            sessions: SessionRegistry::new(),
        }
    }

    /// Entry count per domain in the current knowledge base.
    pub fn domain_counts(&self) -> BTreeMap<Domain, usize> {
        self.coordinator.knowledge().snapshot().entry_counts()
    }

    /// Rebuild all indices from disk and swap them in.
    ///
    /// On failure the current knowledge base stays in place.
    pub fn reload_knowledge(&self) -> Result<BTreeMap<Domain, usize>> {
        let base = load_knowledge(&self.config, &self.embedder)?;
        let counts = base.entry_counts();
        self.coordinator.knowledge().replace(base);
        info!("Reloaded knowledge: {:?}", counts);
        Ok(counts)
    }
}
