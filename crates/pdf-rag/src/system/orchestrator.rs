//! RAG orchestrator: owns the active index and session and drives the
//! initialize / rebuild lifecycle

use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RagConfig, RemoteBackend};
use crate::error::{Error, Result};
use crate::generation::RagSession;
use crate::ingestion::{DocumentProcessor, RemoteFetcher};
use crate::policy::timed;
use crate::providers::{
    EmbeddingProvider, HttpObjectStore, LlmProvider, LocalDocumentStore, ObjectStore, OllamaProvider,
};
#[cfg(feature = "gcp")]
use crate::providers::gcp::GcsObjectStore;
use crate::retrieval::{IndexManager, VectorIndex};

use super::state::{FetchPlan, HealthReport, InitializeOptions, ModelInfo, QueryOutcome, SystemState};

/// The RAG system
///
/// Queries run concurrently against the active session. Initialize and
/// rebuild calls are serialized; while one runs, the previous session keeps
/// serving and is replaced in a single swap once the new one is ready.
pub struct RagSystem {
    config: Arc<RagConfig>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    fetcher: Option<RemoteFetcher>,
    documents: LocalDocumentStore,
    processor: DocumentProcessor,
    index_manager: IndexManager,
    /// Held for the whole of an initialize or rebuild
    lifecycle: tokio::sync::Mutex<()>,
    state: RwLock<SystemState>,
    session: RwLock<Option<Arc<RagSession>>>,
    stale: AtomicBool,
}

impl RagSystem {
    /// Create a system from explicit providers
    ///
    /// `object_store` is optional; without one, fetch requests fail with
    /// `Error::Config`.
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        object_store: Option<Arc<dyn ObjectStore>>,
    ) -> Result<Self> {
        config.validate()?;

        let documents = LocalDocumentStore::new(&config.storage.data_dir)?;
        let processor = DocumentProcessor::from_config(&config.chunking)?;
        let index_manager = IndexManager::new(&config.storage.index_dir);
        let fetcher = object_store
            .map(|store| RemoteFetcher::new(store, documents.clone(), config.retry.policy()));

        tracing::info!(
            "RAG system created (embedding: {}, llm: {}, data: {}, index: {})",
            embedder.model(),
            llm.model(),
            config.storage.data_dir.display(),
            config.storage.index_dir.display()
        );

        Ok(Self {
            config: Arc::new(config),
            embedder,
            llm,
            fetcher,
            documents,
            processor,
            index_manager,
            lifecycle: tokio::sync::Mutex::new(()),
            state: RwLock::new(SystemState::Uninitialized),
            session: RwLock::new(None),
            stale: AtomicBool::new(false),
        })
    }

    /// Create a system with Ollama models and the configured remote backend
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;

        let (embedder, llm) = OllamaProvider::new(&config.models, config.retry.policy())?.split();
        let object_store = Self::object_store_for(&config).await?;

        Self::new(config, Arc::new(embedder), Arc::new(llm), Some(object_store))
    }

    async fn object_store_for(config: &RagConfig) -> Result<Arc<dyn ObjectStore>> {
        let timeout = Duration::from_secs(config.models.request_timeout_secs);
        match config.remote.backend {
            RemoteBackend::S3 => Ok(Arc::new(HttpObjectStore::from_config(&config.remote, timeout)?)),
            #[cfg(feature = "gcp")]
            RemoteBackend::Gcs => Ok(Arc::new(GcsObjectStore::new(config.remote.bucket_name.clone()).await?)),
            #[cfg(not(feature = "gcp"))]
            RemoteBackend::Gcs => Err(Error::Config(
                "GCS backend requires the `gcp` feature".to_string(),
            )),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn state(&self) -> SystemState {
        *self.state.read()
    }

    fn set_state(&self, state: SystemState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            tracing::info!("RAG system state: {} -> {}", previous, state);
        }
    }

    /// Initialize from local documents, optionally forcing a rebuild
    pub async fn initialize(&self, force_rebuild: bool) -> Result<()> {
        self.initialize_with(InitializeOptions {
            force_rebuild,
            fetch: FetchPlan::None,
        })
        .await
    }

    /// Initialize or rebuild the system
    ///
    /// A no-op when already ready and neither a rebuild nor a fetch is
    /// requested. Any failure leaves the system `Failed` and is returned.
    pub async fn initialize_with(&self, options: InitializeOptions) -> Result<()> {
        let _guard = self.lifecycle.lock().await;

        let current = self.state();
        if current == SystemState::Ready && !options.force_rebuild && options.fetch == FetchPlan::None {
            tracing::info!("RAG system already ready, skipping initialization");
            return Ok(());
        }

        let has_session = self.session.read().is_some();
        self.set_state(if has_session {
            SystemState::Rebuilding
        } else {
            SystemState::Initializing
        });

        match timed("RAG system initialization", self.run_initialize(&options)).await {
            Ok(session) => {
                *self.session.write() = Some(Arc::new(session));
                self.set_state(SystemState::Ready);
                Ok(())
            }
            Err(e) => {
                tracing::error!("RAG system initialization failed: {}", e);
                self.session.write().take();
                self.set_state(SystemState::Failed);
                Err(e)
            }
        }
    }

    /// Steps of initialize; returns the new session
    async fn run_initialize(&self, options: &InitializeOptions) -> Result<RagSession> {
        tracing::info!("Checking embedding model {}", self.embedder.model());
        self.embedder.ensure_ready().await?;

        self.fetch(&options.fetch).await?;

        let local = self.documents.list_pdfs().await?;
        if local.is_empty() {
            if !options.force_rebuild && self.index_manager.exists().await {
                tracing::info!("No local documents, loading persisted index directly");
                let index = self.index_manager.load(self.embedder.as_ref()).await.map_err(|e| {
                    tracing::warn!("Persisted index unusable: {}", e);
                    Error::NoDocuments(self.documents.dir().display().to_string())
                })?;
                return Ok(self.session_for(index));
            }
            return Err(Error::NoDocuments(self.documents.dir().display().to_string()));
        }
        tracing::info!("Found {} PDF file(s): {:?}", local.len(), local);

        if !options.force_rebuild {
            match self.index_manager.load(self.embedder.as_ref()).await {
                Ok(index) => return Ok(self.session_for(index)),
                Err(e) => tracing::warn!("No usable persisted index ({}), building a new one", e),
            }
        }

        // Anything stored from here on is missing from the new index
        let was_stale = self.stale.swap(false, Ordering::SeqCst);
        let built = self.rebuild(local.len()).await;
        if built.is_err() && was_stale {
            self.stale.store(true, Ordering::SeqCst);
        }
        built.map(|index| self.session_for(index))
    }

    /// Split every local document, then clear and rebuild the index
    async fn rebuild(&self, document_count: usize) -> Result<VectorIndex> {
        let processor = self.processor.clone();
        let data_dir = self.documents.dir().to_path_buf();
        let chunks = tokio::task::spawn_blocking(move || processor.split_all(&data_dir))
            .await
            .map_err(|e| Error::internal(format!("Document processing task failed: {}", e)))??;
        if chunks.is_empty() {
            return Err(Error::NoChunks(document_count));
        }

        self.index_manager.clear().await?;
        timed(
            "Index build",
            self.index_manager.build(chunks, self.embedder.as_ref()),
        )
        .await
    }

    async fn fetch(&self, plan: &FetchPlan) -> Result<()> {
        if *plan == FetchPlan::None {
            tracing::info!("Skipping remote download, using existing local documents");
            return Ok(());
        }

        let fetcher = self
            .fetcher
            .as_ref()
            .ok_or_else(|| Error::Config("No remote object store configured".to_string()))?;

        let fetched = match plan {
            FetchPlan::One(name) => vec![fetcher.fetch_one(name).await?],
            FetchPlan::All => fetcher.fetch_all().await?,
            FetchPlan::None => Vec::new(),
        };

        if !fetched.is_empty() {
            self.stale.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn session_for(&self, index: VectorIndex) -> RagSession {
        RagSession::new(
            Arc::new(index),
            Arc::clone(&self.embedder),
            Arc::clone(&self.llm),
            self.config.retrieval.top_k,
        )
    }

    fn active_session(&self) -> Result<Arc<RagSession>> {
        self.session
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| Error::NotReady(self.state().to_string()))
    }

    /// Answer a question with the active session
    pub async fn query(&self, question: &str) -> Result<String> {
        let session = self.active_session()?;
        timed("Query", session.query(question)).await
    }

    /// Answer a question and return the sources used
    pub async fn answer(&self, question: &str) -> Result<crate::types::Answer> {
        let session = self.active_session()?;
        timed("Query", session.answer(question)).await
    }

    /// Answer several questions; a failing question does not stop the rest
    pub async fn run_queries(&self, questions: &[String]) -> Result<Vec<QueryOutcome>> {
        let session = self.active_session()?;
        tracing::info!("Running {} queries", questions.len());

        let mut outcomes = Vec::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            tracing::info!("[Query {}/{}] {}", i + 1, questions.len(), question);
            let outcome = match session.query(question).await {
                Ok(answer) => QueryOutcome {
                    question: question.clone(),
                    answer: Some(answer),
                    error: None,
                },
                Err(e) => {
                    tracing::error!("Error on question '{}': {}", question, e);
                    QueryOutcome {
                        question: question.clone(),
                        answer: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Current health snapshot
    pub fn health(&self) -> HealthReport {
        let session = self.session.read().clone();
        let (chunk_count, document_count) = session
            .as_ref()
            .map(|s| (s.index().len(), s.index().document_count()))
            .unwrap_or((0, 0));

        HealthReport {
            state: self.state(),
            index_loaded: session.is_some(),
            index_stale: self.stale.load(Ordering::SeqCst),
            chunk_count,
            document_count,
            models: ModelInfo {
                embedding: self.embedder.model().to_string(),
                llm: self.llm.model().to_string(),
            },
        }
    }

    /// Whether the language model answers health checks
    pub async fn llm_available(&self) -> bool {
        match self.llm.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("LLM health check failed: {}", e);
                false
            }
        }
    }

    /// PDF filenames in the local document directory
    pub async fn list_local_documents(&self) -> Result<Vec<String>> {
        self.documents.list_pdfs().await
    }

    /// Store an uploaded PDF; the active index becomes stale
    pub async fn upload_document(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.documents.store(filename, data).await?;
        self.stale.store(true, Ordering::SeqCst);
        Ok(path)
    }
}
