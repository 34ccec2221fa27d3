//! BM25 (Okapi) lexical retrieval over the selected documents
//!
//! The index is built from a fresh snapshot of the selection on every call and
//! dropped afterwards, so a selection change is always visible to the next
//! query.

use std::cmp::Ordering;
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::storage::Database;
use crate::types::DocumentId;

/// Lowercased Unicode words. Documents and queries go through the same path.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// BM25 tuning constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation
    pub k1: f64,
    /// Length normalization
    pub b: f64,
    /// Negative IDF values are replaced by `epsilon * mean_idf`
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

impl From<&RetrievalConfig> for Bm25Params {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            k1: config.bm25_k1,
            b: config.bm25_b,
            epsilon: config.bm25_epsilon,
        }
    }
}

/// Okapi BM25 model over a tokenized corpus
#[derive(Debug)]
pub struct Bm25Index {
    params: Bm25Params,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn new(corpus: &[Vec<String>], params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;

        for doc in corpus {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for term in doc {
                *freqs.entry(term.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            total_len += doc.len();
            doc_lens.push(doc.len());
            term_freqs.push(freqs);
        }

        let n = corpus.len() as f64;
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_len as f64 / n
        };

        let mut idf: HashMap<String, f64> = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let df = df as f64;
                (term, ((n - df + 0.5) / (df + 0.5)).ln())
            })
            .collect();

        // Terms in more than half the corpus get a negative IDF; floor them
        if !idf.is_empty() {
            let mean = idf.values().sum::<f64>() / idf.len() as f64;
            let floor = params.epsilon * mean;
            for value in idf.values_mut() {
                if *value < 0.0 {
                    *value = floor;
                }
            }
        }

        Self {
            params,
            term_freqs,
            doc_lens,
            avgdl,
            idf,
        }
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    /// Score every document against the query, in corpus order.
    /// Repeated query terms contribute once per occurrence.
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        let Bm25Params { k1, b, .. } = self.params;
        let mut scores = vec![0.0; self.len()];

        for term in query {
            let idf = match self.idf.get(term) {
                Some(idf) => *idf,
                None => continue,
            };
            for (i, freqs) in self.term_freqs.iter().enumerate() {
                let tf = freqs.get(term).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let len_ratio = if self.avgdl > 0.0 {
                    self.doc_lens[i] as f64 / self.avgdl
                } else {
                    0.0
                };
                scores[i] += idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * len_ratio));
            }
        }

        scores
    }
}

/// Rank `docs` (already ordered by id) against `query_terms`: descending score,
/// ties by ascending id. Zero-score documents stay in the ranking.
pub fn rank(
    docs: &[(DocumentId, String)],
    query_terms: &[String],
    params: Bm25Params,
    top_k: usize,
) -> Vec<DocumentId> {
    let corpus: Vec<Vec<String>> = docs.iter().map(|(_, text)| tokenize(text)).collect();
    let index = Bm25Index::new(&corpus, params);
    let scores = index.scores(query_terms);

    let mut ranked: Vec<(DocumentId, f64)> = docs
        .iter()
        .map(|(id, _)| *id)
        .zip(scores)
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.into_iter().take(top_k).map(|(id, _)| id).collect()
}

/// Lexical retriever scoped to the Selection Set
pub struct LexicalRetriever {
    db: Database,
    params: Bm25Params,
}

impl LexicalRetriever {
    pub fn new(db: Database, params: Bm25Params) -> Self {
        Self { db, params }
    }

    /// Up to `top_k` selected documents ranked by BM25 against `query`
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<DocumentId>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let terms = tokenize(query);
        if terms.is_empty() {
            tracing::debug!("BM25 query has no terms");
            return Ok(Vec::new());
        }

        let params = self.params;
        let ranked = self
            .db
            .run(move |db| {
                let docs: Vec<(DocumentId, String)> = db
                    .selected_documents()?
                    .into_iter()
                    .map(|(id, content)| (id, String::from_utf8_lossy(&content).into_owned()))
                    .collect();
                Ok(rank(&docs, &terms, params, top_k))
            })
            .await?;

        tracing::debug!(results = ranked.len(), top_k, "BM25 retrieval");
        Ok(ranked)
    }
}
