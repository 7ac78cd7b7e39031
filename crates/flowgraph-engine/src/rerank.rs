// Lexical stand-in for a cross-encoder. No real local cross-encoder crate
// exists in the dependency set this workspace draws from, and fabricating
// one would mean pretending to ship a model that isn't there; this scores
// query/document pairs by token overlap (a BM25-lite count) instead, behind
// the same `RerankProvider` seam so a real model-backed implementation can
// later be swapped in without touching the action handler.

use std::collections::HashSet;

use async_trait::async_trait;
use flowgraph_core::{RerankProvider, RerankScore, Result};

#[derive(Clone, Default)]
pub struct LexicalReranker;

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()).filter(|t| !t.is_empty()).collect()
}

#[async_trait]
impl RerankProvider for LexicalReranker {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankScore>> {
        let query_tokens = tokenize(query);
        let mut scores: Vec<RerankScore> = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let doc_tokens = tokenize(doc);
                let overlap = query_tokens.intersection(&doc_tokens).count() as f32;
                let score = overlap / (query_tokens.len().max(1) as f32).sqrt();
                RerankScore { index, score }
            })
            .collect();
        scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ranks_more_overlapping_document_first() {
        let reranker = LexicalReranker;
        let docs = vec!["cats are great pets".to_string(), "quantum mechanics is hard".to_string()];
        let scores = reranker.rerank("tell me about cats", &docs).await.unwrap();
        assert_eq!(scores[0].index, 0);
    }

    #[tokio::test]
    async fn empty_documents_returns_empty() {
        let reranker = LexicalReranker;
        let scores = reranker.rerank("anything", &[]).await.unwrap();
        assert!(scores.is_empty());
    }
}
