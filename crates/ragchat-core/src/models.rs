//! Core data models for documents and retrieval results.

use serde::{Deserialize, Serialize};

/// Free-form document metadata. Used for display and attribution only;
/// retrieval never looks at it.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A document waiting to be embedded and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewDocument {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A stored document as held by a [`Store`](crate::store::Store) backend.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A document returned from similarity search.
///
/// `similarity` is `1 - cosine_distance` between the query embedding and
/// the stored embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub similarity: f64,
}
