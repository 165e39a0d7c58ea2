//! Thin orchestration layer above three `Collection`s (libraries, documents,
//! chunks): parent-reference validation, cross-deployment dimension
//! establishment, and cascading delete.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::collection::Collection;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::errors::{CoreError, Result};
use crate::index::exact::ExactCosineIndex;
use crate::index::ivf::IvfIndex;
use crate::index::nsw::NswIndex;
use crate::models::{Chunk, Document, IndexType, Library, MetadataFilter, ScoredChunk};
use crate::store::RecordStore;

/// The process-wide handle bundling the three collections and the
/// embedding provider. Built once at `serve`/CLI startup.
pub struct AppState {
    pub libraries: Collection<Library>,
    pub documents: Collection<Document>,
    pub chunks: Collection<Chunk>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl AppState {
    pub fn open(config: &Config, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let base = std::path::Path::new(&config.data_dir);
        let libraries = Collection::new(RecordStore::open(base.join("libraries"))?);
        let documents = Collection::new(RecordStore::open(base.join("documents"))?);
        let chunks = Collection::new(RecordStore::open(base.join("chunks"))?);

        chunks.add_index(IndexType::Cosine, Box::new(ExactCosineIndex::new()))?;
        chunks.add_index(IndexType::Ivf, Box::new(IvfIndex::new(config.ivf_params.clone())))?;
        chunks.add_index(IndexType::Nsw, Box::new(NswIndex::new(config.nsw_params.clone())))?;

        Ok(Self { libraries, documents, chunks, embedder })
    }

    /// Enumerates every store and rebuilds every attached index. Run once at
    /// process start; also exposed as a standalone maintenance operation.
    #[instrument(skip(self))]
    pub fn startup_rebuild(&self) -> Result<()> {
        info!("rebuilding libraries index");
        self.libraries.startup_rebuild()?;
        info!("rebuilding documents index");
        self.documents.startup_rebuild()?;
        info!("rebuilding chunks indexes");
        self.chunks.startup_rebuild()?;
        Ok(())
    }

    pub fn create_library(&self, library: Library) -> Result<()> {
        self.libraries.create(library)
    }

    pub fn create_document(&self, document: Document) -> Result<()> {
        if !self.libraries.exists(&document.library_id)? {
            return Err(CoreError::NotFound(format!("library {}", document.library_id)));
        }
        self.documents.create(document)
    }

    /// Validates that both parents exist before delegating to the chunk
    /// collection, which enforces the embedding-dimension invariant.
    #[instrument(skip(self, chunk), fields(chunk_id = %chunk.id))]
    pub fn create_chunk(&self, chunk: Chunk) -> Result<()> {
        if !self.libraries.exists(&chunk.library_id)? {
            return Err(CoreError::NotFound(format!("library {}", chunk.library_id)));
        }
        if !self.documents.exists(&chunk.document_id)? {
            return Err(CoreError::NotFound(format!("document {}", chunk.document_id)));
        }
        self.chunks.create(chunk)
    }

    /// Deletes a library and cascades to its documents and their chunks.
    /// Cascades are sequential and best-effort: a failure partway through
    /// leaves the remaining children in place for a future retry.
    #[instrument(skip(self))]
    pub fn delete_library(&self, library_id: &str) -> Result<()> {
        let document_ids = self.documents.list()?;
        for doc_id in document_ids {
            let doc: Document = match self.documents.get(&doc_id) {
                Ok(d) => d,
                Err(CoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if doc.library_id == library_id {
                self.delete_document(&doc_id)?;
            }
        }
        self.libraries.delete(library_id)
    }

    /// Deletes a document and cascades to its chunks.
    #[instrument(skip(self))]
    pub fn delete_document(&self, document_id: &str) -> Result<()> {
        let chunk_ids = self.chunks.list()?;
        for chunk_id in chunk_ids {
            let chunk: Chunk = match self.chunks.get(&chunk_id) {
                Ok(c) => c,
                Err(CoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if chunk.document_id == document_id {
                if let Err(e) = self.chunks.delete(&chunk_id) {
                    warn!(%chunk_id, error = %e, "failed to delete chunk during cascade");
                }
            }
        }
        self.documents.delete(document_id)
    }

    /// Embeds `text` via the configured provider. Holds no lock; safe to
    /// await directly on an async worker.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await
    }

    /// Searches the chunk collection's requested index and resolves hits to
    /// full payloads. Synchronous: acquires the collection's lock, so an
    /// async caller must run this via `spawn_blocking` rather than await it
    /// directly.
    pub fn search_chunks(
        &self,
        index_type: IndexType,
        query_vector: &[f32],
        limit: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        if limit == 0 {
            return Err(CoreError::InvalidInput("limit must be positive".to_string()));
        }
        let hits = self.chunks.search(index_type, query_vector, limit, |chunk| {
            filter.as_ref().map(|f| f.matches(&chunk.metadata)).unwrap_or(true)
        })?;
        Ok(hits
            .into_iter()
            .map(|(chunk, score)| ScoredChunk {
                id: chunk.id,
                text: chunk.text,
                score,
                metadata: chunk.metadata,
            })
            .collect())
    }

    /// Embeds `text` via the configured provider, then searches the chunk
    /// collection's requested index, resolving hits to full payloads.
    #[instrument(skip(self, filter))]
    pub async fn query(
        &self,
        index_type: IndexType,
        text: &str,
        limit: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vector = self.embed_query(text).await?;
        self.search_chunks(index_type, &query_vector, limit, filter)
    }
}
