//! Semantic-retrieval backend seam.
//!
//! The agent only needs "query in, scored fragments out". Vector indexing is
//! somebody else's job; [`InMemoryRetriever`] is a term-overlap fallback that
//! loads a JSONL corpus so the tools work without an external index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Optional narrowing applied before scoring. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalFilters {
    /// Player or team name that must appear in the text or metadata.
    pub entity: Option<String>,
    pub season: Option<i64>,
    /// Matched against `metadata.category`.
    pub category: Option<String>,
    /// Matched against `metadata.source` (news corpora).
    pub source: Option<String>,
    /// Matched against `metadata.team` or `metadata.teams`.
    pub team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredFragment {
    pub text: String,
    pub score: f32,
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `limit` fragments, best first. No matches is `Ok(vec![])`.
    async fn retrieve(
        &self,
        query: &str,
        filters: &RetrievalFilters,
        limit: usize,
    ) -> Result<Vec<ScoredFragment>, RetrievalError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("failed to read corpus: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid corpus entry on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("retrieval backend error: {0}")]
    Backend(String),
}

/// One line of a JSONL corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug)]
pub struct InMemoryRetriever {
    documents: Vec<CorpusDocument>,
}

impl InMemoryRetriever {
    pub fn new(documents: Vec<CorpusDocument>) -> Self {
        Self { documents }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Load a corpus where each non-blank line is a [`CorpusDocument`].
    pub fn from_jsonl(path: &Path) -> Result<Self, RetrievalError> {
        let content = std::fs::read_to_string(path)?;
        let mut documents = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let doc: CorpusDocument =
                serde_json::from_str(line).map_err(|e| RetrievalError::Parse {
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            documents.push(doc);
        }
        info!(path = %path.display(), count = documents.len(), "Loaded retrieval corpus");
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn retrieve(
        &self,
        query: &str,
        filters: &RetrievalFilters,
        limit: usize,
    ) -> Result<Vec<ScoredFragment>, RetrievalError> {
        let terms = query_terms(query);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &CorpusDocument)> = self
            .documents
            .iter()
            .filter(|doc| matches_filters(doc, filters))
            .filter_map(|doc| {
                let doc_terms = query_terms(&doc.text);
                let hits = terms.iter().filter(|t| doc_terms.contains(*t)).count();
                (hits > 0).then(|| (hits as f32 / terms.len() as f32, doc))
            })
            .collect();

        // Stable sort keeps corpus order for ties.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(score, doc)| ScoredFragment {
                text: doc.text.clone(),
                score,
                metadata: doc.metadata.clone(),
            })
            .collect())
    }
}

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "in", "on", "at", "to", "for", "and", "or", "is", "was", "me",
    "about", "what", "who", "how", "tell", "did", "do", "with",
];

fn query_terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn eq_ignore_case(value: Option<&Value>, expected: &str) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|v| v.eq_ignore_ascii_case(expected))
}

fn matches_filters(doc: &CorpusDocument, filters: &RetrievalFilters) -> bool {
    let meta = &doc.metadata;

    if let Some(season) = filters.season {
        if meta.get("season").and_then(Value::as_i64) != Some(season) {
            return false;
        }
    }
    if let Some(category) = &filters.category {
        if !eq_ignore_case(meta.get("category"), category) {
            return false;
        }
    }
    if let Some(source) = &filters.source {
        if !eq_ignore_case(meta.get("source"), source) {
            return false;
        }
    }
    if let Some(team) = &filters.team {
        let in_list = meta
            .get("teams")
            .and_then(Value::as_array)
            .is_some_and(|teams| teams.iter().any(|t| eq_ignore_case(Some(t), team)));
        if !in_list && !eq_ignore_case(meta.get("team"), team) {
            return false;
        }
    }
    if let Some(entity) = &filters.entity {
        let needle = entity.to_lowercase();
        let in_text = doc.text.to_lowercase().contains(&needle);
        let in_meta = meta.values().any(|v| value_mentions(v, &needle));
        if !in_text && !in_meta {
            return false;
        }
    }
    true
}

fn value_mentions(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|v| value_mentions(v, needle)),
        _ => false,
    }
}
