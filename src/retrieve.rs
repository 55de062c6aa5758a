//! Context retrieval for a chat question.
//!
//! embed query → top-K query in the document's namespace → threshold,
//! order, join and truncate (see [`pdfchat_core::context`]).

use pdfchat_core::context::{assemble_context, match_text};
use pdfchat_core::namespace::sanitize_key;
use pdfchat_core::Result;

use crate::pipeline::Pipeline;

pub(crate) async fn retrieve_context(
    pipeline: &Pipeline,
    query: &str,
    document_key: &str,
) -> Result<String> {
    let settings = &pipeline.settings;
    let namespace = sanitize_key(document_key);

    let vector = pipeline.embedder.embed(query).await?;
    let matches = pipeline
        .vectors
        .query(&namespace, &vector, settings.top_k, true)
        .await?;

    for m in &matches {
        tracing::debug!(id = %m.id, score = m.score, "match");
        if m.score > settings.context.score_threshold && match_text(m).is_empty() {
            tracing::warn!(id = %m.id, %namespace, "match has no usable text in metadata");
        }
    }

    let context = assemble_context(&matches, &settings.context);
    tracing::info!(
        %namespace,
        matches = matches.len(),
        context_chars = context.chars().count(),
        "retrieved context"
    );
    Ok(context)
}
