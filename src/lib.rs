//! A single-node vector database: store text chunks with precomputed
//! embeddings under a Library -> Document -> Chunk namespace, and retrieve
//! the top-k most similar chunks under a choice of similarity index.
//!
//! The core of this crate is the indexing and retrieval subsystem
//! ([`index`]) and the collection storage layer ([`collection`], [`store`])
//! that keeps in-memory indexes consistent with on-disk state. Concurrency
//! discipline is one readers-writer lock per [`collection::Collection`]:
//! reads (`get`/`list`/`search`) take shared access, mutations
//! (`create`/`update`/`delete`/`add_index`/`startup_rebuild`) take exclusive
//! access, and no operation holds the lock across embedding-provider I/O.

pub mod collection;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod http;
pub mod index;
pub mod models;
pub mod service;
pub mod store;
pub mod vector;

pub use collection::Collection;
pub use config::Config;
pub use errors::{CoreError, Result};
pub use service::AppState;
