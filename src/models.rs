use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::collection::Embeddable;

/// Root of the containment hierarchy. Carries no embedding of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Library {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, Json>,
}

/// A grouping of chunks under a library. Does not embed its chunks; chunks
/// reference their parent document by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    pub library_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, Json>,
}

/// The smallest indexed unit: text plus its embedding vector and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    #[serde(default)]
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, Json>,
    pub library_id: String,
    pub document_id: String,
}

/// A fully resolved query result: the chunk payload plus its similarity
/// score, ready for serialization to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub metadata: HashMap<String, Json>,
}

/// Which concrete index strategy a `/query` request selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Cosine,
    Ivf,
    Nsw,
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IndexType::Cosine => "cosine",
            IndexType::Ivf => "ivf",
            IndexType::Nsw => "nsw",
        };
        f.write_str(s)
    }
}

/// A post-result predicate over chunk metadata, applied after the index
/// returns its ordered candidate list. Pre-index filtering is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub key: String,
    pub equals: Json,
}

impl MetadataFilter {
    pub fn matches(&self, metadata: &HashMap<String, Json>) -> bool {
        metadata.get(&self.key).map(|v| v == &self.equals).unwrap_or(false)
    }
}

impl Embeddable for Library {
    fn id(&self) -> &str {
        &self.id
    }
    fn embedding(&self) -> &[f32] {
        &[]
    }
}

impl Embeddable for Document {
    fn id(&self) -> &str {
        &self.id
    }
    fn embedding(&self) -> &[f32] {
        &[]
    }
}

impl Embeddable for Chunk {
    fn id(&self) -> &str {
        &self.id
    }
    fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}
