//! Fixed user-facing replies.
//!
//! These strings are part of the service's observable behaviour; clients
//! and tests match on them.

/// The query gate rejected the query.
pub const QUERY_TOO_SHORT: &str =
    "Please ask a more specific question. Your query is too short or unclear.";

/// The store held no documents at all.
pub const EMPTY_KNOWLEDGE_BASE: &str =
    "I don't have any documents in my knowledge base yet. Please add some documents first.";

/// Every retrieved document fell at or below the similarity threshold.
pub const NO_RELEVANT_DOCUMENTS: &str =
    "I don't have any information about that topic in my knowledge base.";

/// The generation backend failed.
pub const GENERATION_FALLBACK: &str =
    "I apologize, but I'm having trouble generating a response right now.";
