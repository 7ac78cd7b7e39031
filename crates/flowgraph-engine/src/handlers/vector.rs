use flowgraph_contracts::{ActionType, ExecutionEnvelope, Step, StepOutcome};
use flowgraph_core::{resolve_string, resolve_string_mode};
use serde_json::{json, Value};

use crate::services::Services;

fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chunk_size == 0 || chars.len() <= chunk_size {
        return vec![text.to_string()];
    }
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

pub async fn vector_db_ingestion(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::VectorDbIngestion { prompt_template, collection_name, chunk_size, chunk_overlap, embedding_model } = &step.action
    else {
        unreachable!("dispatch guarantees the matching variant");
    };

    let resolved = resolve_string_mode(prompt_template, envelope);
    let texts: Vec<String> = match resolved {
        Value::Array(items) => items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        Value::String(s) => vec![s],
        other => vec![other.to_string()],
    };

    let mut chunks = Vec::new();
    for text in &texts {
        chunks.extend(split_text(text, *chunk_size, *chunk_overlap));
    }

    let Some(embeddings) = &services.embeddings else {
        return StepOutcome::Failure { error: "no embedding provider configured".to_string() };
    };
    let model = embedding_model.clone().unwrap_or_else(|| services.default_embedding_model.clone());
    let vectors = match embeddings.embed(&model, &chunks).await {
        Ok(v) => v,
        Err(e) => return StepOutcome::Failure { error: e.to_string() },
    };

    match services.vectors.ingest(collection_name, chunks.clone(), vectors).await {
        Ok(total) => StepOutcome::Success {
            output: Some(Value::String(format!(
                "Ingested {} chunks into '{collection_name}' ({total} total chunks stored)",
                chunks.len()
            ))),
            next_step_override: None,
        },
        Err(e) => StepOutcome::Failure { error: e.to_string() },
    }
}

pub async fn vector_db_query(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::VectorDbQuery { prompt_template, collection_name, top_k, embedding_model } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };
    let query_text = resolve_string(prompt_template, envelope);

    let Some(embeddings) = &services.embeddings else {
        return StepOutcome::Failure { error: "no embedding provider configured".to_string() };
    };
    let model = embedding_model.clone().unwrap_or_else(|| services.default_embedding_model.clone());
    let embedding = match embeddings.embed(&model, std::slice::from_ref(&query_text)).await {
        Ok(mut v) => v.pop().unwrap_or_default(),
        Err(e) => return StepOutcome::Failure { error: e.to_string() },
    };

    let k = top_k.unwrap_or(5);
    // A missing collection succeeds with empty results; see Open Question decision.
    match services.vectors.query(collection_name, &embedding, k).await {
        Ok(results) => {
            let docs: Vec<Value> = results.into_iter().map(|(text, _score)| Value::String(text)).collect();
            StepOutcome::Success { output: Some(json!({"query": query_text, "retrieved_docs": docs})), next_step_override: None }
        }
        Err(e) => StepOutcome::Failure { error: e.to_string() },
    }
}

pub async fn cross_encoder_rerank(step: &Step, envelope: &ExecutionEnvelope, services: &Services) -> StepOutcome {
    let ActionType::CrossEncoderRerank { prompt_template, rerank_top_n } = &step.action else {
        unreachable!("dispatch guarantees the matching variant");
    };

    let resolved = resolve_string_mode(prompt_template, envelope);
    let Some(obj) = resolved.as_object() else {
        return StepOutcome::Failure {
            error: "cross_encoder_rerank requires prompt_template to resolve to {query, retrieved_docs}".to_string(),
        };
    };
    let query = obj.get("query").and_then(Value::as_str).unwrap_or_default().to_string();
    let Some(Value::Array(items)) = obj.get("retrieved_docs").cloned() else {
        return StepOutcome::Failure { error: "retrieved_docs must be a list".to_string() };
    };
    let docs: Vec<String> = match items.iter().map(|v| v.as_str().map(str::to_string)).collect::<Option<Vec<_>>>() {
        Some(d) => d,
        None => return StepOutcome::Failure { error: "retrieved_docs must be a list of strings".to_string() },
    };

    if docs.is_empty() {
        return StepOutcome::Success { output: Some(Value::Array(Vec::new())), next_step_override: None };
    }

    let scores = match services.rerank.rerank(&query, &docs).await {
        Ok(s) => s,
        Err(e) => return StepOutcome::Failure { error: e.to_string() },
    };
    let top_n = rerank_top_n.unwrap_or(3);
    let ranked: Vec<Value> = scores.into_iter().take(top_n).map(|s| Value::String(docs[s.index].clone())).collect();
    StepOutcome::Success { output: Some(Value::Array(ranked)), next_step_override: None }
}

#[cfg(test)]
mod tests {
    use super::split_text;

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(split_text("hello", 100, 10), vec!["hello".to_string()]);
    }

    #[test]
    fn long_text_splits_with_overlap() {
        let text = "a".repeat(25);
        let chunks = split_text(&text, 10, 3);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 10));
        assert_eq!(chunks.last().unwrap().len(), 4);
    }

    #[test]
    fn zero_chunk_size_does_not_infinite_loop() {
        let chunks = split_text("some text", 0, 0);
        assert_eq!(chunks, vec!["some text".to_string()]);
    }

    #[test]
    fn overlap_equal_to_chunk_size_still_advances() {
        let text = "b".repeat(12);
        let chunks = split_text(&text, 5, 5);
        assert!(chunks.len() >= 3);
    }
}
