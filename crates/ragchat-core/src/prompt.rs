//! Context block and prompt assembly for grounded answers.

use crate::models::ScoredDocument;

/// Separator placed between documents in the context block.
pub const DOCUMENT_DELIMITER: &str = "\n\n---\n\n";

/// Concatenate document contents into a single context block.
///
/// With `show_scores`, each document is prefixed with its similarity as
/// `[Relevance: 0.87]`.
pub fn build_context(documents: &[ScoredDocument], show_scores: bool) -> String {
    documents
        .iter()
        .map(|doc| {
            if show_scores {
                format!("[Relevance: {:.2}]\n{}", doc.similarity, doc.content.trim())
            } else {
                doc.content.trim().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(DOCUMENT_DELIMITER)
}

/// Build the constrained prompt sent to the generation backend.
///
/// The model is told to answer only from `context`, to say so when the
/// context does not match the question, and never to fall back on outside
/// knowledge.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions using ONLY the context documents below.\n\
         \n\
         Rules:\n\
         1. Answer strictly from the context. Do not use outside knowledge.\n\
         2. If the context is not about the topic of the question, reply that you do not have \
         information about that topic in the knowledge base.\n\
         3. Never invent numbers, names, or facts that do not appear in the context.\n\
         4. Keep the answer short and specific.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {query}\n\
         \n\
         Answer:",
        context = context,
        query = query.trim(),
    )
}
