//! Textual similarity behind a swappable embedding backend.

use super::preprocess::Preprocessor;
use super::SimilarityMatrix;
use crate::errors::{Error, Result, ResultExt};
use crate::graph::ClassGraph;
use ndarray::{Array2, Axis};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Turns every class of a graph into a feature vector.
///
/// Rows of the returned matrix follow the graph's class ordering.
pub trait EmbeddingBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn embed(&self, graph: &ClassGraph) -> Result<Array2<f64>>;
}

/// Lexical backend: TF-IDF over preprocessed class words.
///
/// Uses smooth idf `ln((1 + n) / (1 + df)) + 1` and L2-normalised rows.
#[derive(Default)]
pub struct TfIdfBackend {
    preprocessor: Preprocessor,
}

impl TfIdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn term_counts(&self, graph: &ClassGraph) -> Vec<BTreeMap<String, usize>> {
        graph
            .records()
            .iter()
            .map(|record| {
                let mut counts = BTreeMap::new();
                for term in self.preprocessor.terms(record.words.iter().map(String::as_str)) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect()
    }
}

impl EmbeddingBackend for TfIdfBackend {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn embed(&self, graph: &ClassGraph) -> Result<Array2<f64>> {
        let documents = self.term_counts(graph);
        let vocabulary: BTreeMap<&str, usize> = documents
            .iter()
            .flat_map(|doc| doc.keys().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(col, term)| (term, col))
            .collect();

        let n_docs = documents.len() as f64;
        let mut document_frequency = vec![0usize; vocabulary.len()];
        for doc in &documents {
            for term in doc.keys() {
                document_frequency[vocabulary[term.as_str()]] += 1;
            }
        }
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let mut features = Array2::zeros((documents.len(), vocabulary.len()));
        for (row, doc) in documents.iter().enumerate() {
            for (term, &count) in doc {
                let col = vocabulary[term.as_str()];
                features[[row, col]] = count as f64 * idf[col];
            }
        }
        normalize_rows(&mut features);

        tracing::debug!(
            classes = documents.len(),
            vocabulary = vocabulary.len(),
            "built tf-idf features"
        );
        Ok(features)
    }
}

/// Vectors computed by an external encoder, keyed by class name.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedBackend {
    vectors: HashMap<String, Vec<f64>>,
}

impl PrecomputedBackend {
    pub fn new(vectors: HashMap<String, Vec<f64>>) -> Self {
        Self { vectors }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let vectors: HashMap<String, Vec<f64>> = serde_json::from_str(&contents)
            .map_err(Error::from)
            .context(format!("reading embeddings from {}", path.display()))?;
        Ok(Self::new(vectors))
    }
}

impl EmbeddingBackend for PrecomputedBackend {
    fn name(&self) -> &'static str {
        "precomputed"
    }

    fn embed(&self, graph: &ClassGraph) -> Result<Array2<f64>> {
        let dims = self.vectors.values().next().map_or(0, Vec::len);
        let mut features = Array2::zeros((graph.len(), dims));
        for (row, record) in graph.records().iter().enumerate() {
            let vector = self.vectors.get(&record.name).ok_or_else(|| {
                Error::input(format!("no embedding for class '{}'", record.name))
            })?;
            if vector.len() != dims {
                return Err(Error::DimensionMismatch {
                    expected: dims,
                    found: vector.len(),
                });
            }
            for (col, value) in vector.iter().enumerate() {
                features[[row, col]] = *value;
            }
        }
        Ok(features)
    }
}

/// Which backend a run embeds classes with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SemanticSource {
    #[default]
    TfIdf,
    /// JSON object of class name to vector.
    Precomputed(PathBuf),
}

impl SemanticSource {
    pub fn load(&self) -> Result<SemanticSimilarity> {
        let backend: Box<dyn EmbeddingBackend> = match self {
            Self::TfIdf => Box::new(TfIdfBackend::new()),
            Self::Precomputed(path) => Box::new(PrecomputedBackend::from_path(path)?),
        };
        Ok(SemanticSimilarity::new(backend))
    }
}

/// Semantic similarity with a chosen backend.
pub struct SemanticSimilarity {
    backend: Box<dyn EmbeddingBackend>,
}

impl Default for SemanticSimilarity {
    fn default() -> Self {
        Self::new(Box::new(TfIdfBackend::new()))
    }
}

impl SemanticSimilarity {
    pub fn new(backend: Box<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Per-class feature vectors.
    pub fn features(&self, graph: &ClassGraph) -> Result<Array2<f64>> {
        let features = self.backend.embed(graph)?;
        if features.nrows() != graph.len() {
            return Err(Error::DimensionMismatch {
                expected: graph.len(),
                found: features.nrows(),
            });
        }
        Ok(features)
    }

    pub fn similarity(&self, graph: &ClassGraph) -> Result<SimilarityMatrix> {
        let _span = tracing::info_span!("semantic_similarity", backend = self.backend.name())
            .entered();
        Ok(cosine_similarity(&self.features(graph)?))
    }
}

/// Pairwise cosine similarity of the rows; negative values clamp to 0 and
/// all-zero rows are dissimilar to everything.
pub fn cosine_similarity(features: &Array2<f64>) -> SimilarityMatrix {
    let mut unit = features.clone();
    normalize_rows(&mut unit);
    SimilarityMatrix::from_upper_triangle(unit.nrows(), |i, j| {
        unit.row(i).dot(&unit.row(j)).max(0.0)
    })
}

fn normalize_rows(features: &mut Array2<f64>) {
    for mut row in features.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ClassRecord;
    use ndarray::array;

    fn graph() -> ClassGraph {
        ClassGraph::from_records(vec![
            ClassRecord::new("Cart").with_words(["shoppingCart", "addItem", "items"]),
            ClassRecord::new("Item").with_words(["item", "price"]),
            ClassRecord::new("Mailer").with_words(["sendEmail", "smtp"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_tfidf_rows_are_unit_length() {
        let features = TfIdfBackend::new().embed(&graph()).unwrap();
        assert_eq!(features.nrows(), 3);
        for row in features.rows() {
            assert!((row.dot(&row) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_shared_terms_make_classes_similar() {
        let sim = SemanticSimilarity::default().similarity(&graph()).unwrap();
        assert!(sim.get(0, 1) > 0.0);
        assert_eq!(sim.get(0, 2), 0.0);
        assert_eq!(sim.get(1, 1), 0.0);
    }

    #[test]
    fn test_negative_cosine_clamped() {
        let sim = cosine_similarity(&array![[1.0, 0.0], [-1.0, 0.0], [0.0, 0.0]]);
        assert_eq!(sim.get(0, 1), 0.0);
        assert_eq!(sim.get(0, 2), 0.0);
    }

    #[test]
    fn test_precomputed_backend_follows_graph_order() {
        let backend = PrecomputedBackend::new(HashMap::from([
            ("Mailer".to_string(), vec![0.0, 1.0]),
            ("Cart".to_string(), vec![1.0, 0.0]),
            ("Item".to_string(), vec![1.0, 1.0]),
        ]));
        let features = backend.embed(&graph()).unwrap();
        assert_eq!(features, array![[1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);

        let sim = SemanticSimilarity::new(Box::new(backend))
            .similarity(&graph())
            .unwrap();
        assert!((sim.get(0, 1) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_precomputed_backend_missing_class() {
        let backend = PrecomputedBackend::new(HashMap::from([("Cart".to_string(), vec![1.0])]));
        assert!(backend.embed(&graph()).is_err());
    }
}
