//! Chat pipeline: gate → embed → retrieve → compose.
//!
//! Every outcome other than an embedding or store failure is a normal
//! reply. Rejected, empty, off-topic and failed-generation cases carry one
//! of the fixed strings from [`ragchat_core::messages`].

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use ragchat_core::gate::is_meaningful;
use ragchat_core::generate::Generator;
use ragchat_core::messages;
use ragchat_core::models::ScoredDocument;
use ragchat_core::prompt::{build_context, build_prompt};
use ragchat_core::retrieve::{retrieve, Retrieval};

use crate::config::Config;
use crate::context::AppContext;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("failed to embed query: {0:#}")]
    Embedding(anyhow::Error),
    #[error("document store error: {0:#}")]
    Store(anyhow::Error),
}

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatOutcome {
    QueryRejected,
    EmptyKnowledgeBase,
    NoRelevantDocuments,
    Answered,
    GenerationFallback,
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub answer: String,
    /// Documents the answer was grounded on (empty unless generation ran).
    pub sources: Vec<ScoredDocument>,
    pub outcome: ChatOutcome,
}

impl ChatReply {
    fn fixed(answer: &str, outcome: ChatOutcome) -> Self {
        Self {
            answer: answer.to_string(),
            sources: Vec::new(),
            outcome,
        }
    }
}

/// Answer `query` from the knowledge base.
pub async fn answer_query(ctx: &AppContext, query: &str) -> Result<ChatReply, ChatError> {
    if query.trim().is_empty() {
        return Err(ChatError::EmptyQuery);
    }

    if !is_meaningful(query) {
        tracing::debug!(query, "query rejected by gate");
        return Ok(ChatReply::fixed(
            messages::QUERY_TOO_SHORT,
            ChatOutcome::QueryRejected,
        ));
    }

    let query_vec = ctx
        .query_embedder
        .embed(query.trim())
        .await
        .map_err(ChatError::Embedding)?;

    let params = ctx.config.retrieval.params();
    let retrieval = retrieve(ctx.store.as_ref(), &query_vec, &params)
        .await
        .map_err(ChatError::Store)?;

    match retrieval {
        Retrieval::EmptyKnowledgeBase => {
            tracing::info!("knowledge base is empty");
            Ok(ChatReply::fixed(
                messages::EMPTY_KNOWLEDGE_BASE,
                ChatOutcome::EmptyKnowledgeBase,
            ))
        }
        Retrieval::NoRelevantDocuments { best_similarity } => {
            tracing::info!(
                best_similarity = ?best_similarity,
                threshold = params.similarity_threshold,
                "no document above the relevance threshold"
            );
            Ok(ChatReply::fixed(
                messages::NO_RELEVANT_DOCUMENTS,
                ChatOutcome::NoRelevantDocuments,
            ))
        }
        Retrieval::Relevant(docs) => {
            tracing::debug!(
                count = docs.len(),
                top_similarity = docs[0].similarity,
                "relevant documents found"
            );
            let (answer, generated) = compose_answer(
                ctx.generator.clone(),
                query,
                &docs,
                ctx.config.retrieval.show_scores,
            )
            .await;
            Ok(ChatReply {
                answer,
                sources: docs,
                outcome: if generated {
                    ChatOutcome::Answered
                } else {
                    ChatOutcome::GenerationFallback
                },
            })
        }
    }
}

/// Build the grounded prompt and run generation on its own task.
///
/// Returns the answer and whether it came from the model. Any failure
/// (error, empty text, task panic) yields [`messages::GENERATION_FALLBACK`].
pub async fn compose_answer(
    generator: Arc<dyn Generator>,
    query: &str,
    documents: &[ScoredDocument],
    show_scores: bool,
) -> (String, bool) {
    let context = build_context(documents, show_scores);
    let prompt = build_prompt(query, &context);

    let task = tokio::spawn(async move { generator.generate(&prompt).await });

    match task.await {
        Ok(Ok(text)) if !text.trim().is_empty() => (text.trim().to_string(), true),
        Ok(Ok(_)) => {
            tracing::warn!("generation returned empty text");
            (messages::GENERATION_FALLBACK.to_string(), false)
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "generation failed");
            (messages::GENERATION_FALLBACK.to_string(), false)
        }
        Err(e) => {
            tracing::error!(error = %e, "generation task did not complete");
            (messages::GENERATION_FALLBACK.to_string(), false)
        }
    }
}

/// `ragchat ask`: answer one question and print the sources used.
pub async fn run_ask(config: &Config, query: &str) -> anyhow::Result<()> {
    let ctx = AppContext::from_config(config).await?;
    let reply = answer_query(&ctx, query).await;
    ctx.close().await;
    let reply = reply?;

    println!("{}", reply.answer);
    if !reply.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, doc) in reply.sources.iter().enumerate() {
            let kind = doc
                .metadata
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("-");
            println!(
                "{}. [{:.2}] #{} ({})",
                i + 1,
                doc.similarity,
                doc.id,
                kind
            );
        }
    }
    Ok(())
}
