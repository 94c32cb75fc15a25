//! Class graph built from parser output.
//!
//! The order of classes in the parser's JSON object is the canonical class
//! ordering: every matrix row, membership entry and report column is indexed
//! by it. [`ClassGraph`] fixes that ordering once and never recomputes it.

pub mod ground_truth;

use crate::errors::{Error, Result, ResultExt};
use crate::membership::ClassIndex;
use ndarray::Array2;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

pub use ground_truth::{GroundTruth, GroundTruthSource};

/// One call occurrence as emitted by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawMethodCall {
    pub method_name: String,
    /// Parser's guess at the declaring class; may name a library type.
    #[serde(default)]
    pub class_name: Option<String>,
}

/// Per-class facts as emitted by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RawClass {
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub method_calls: Vec<RawMethodCall>,
    #[serde(default)]
    pub words: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Parser output with the file's key order preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedClasses {
    entries: Vec<(String, RawClass)>,
}

impl ParsedClasses {
    pub fn new(entries: Vec<(String, RawClass)>) -> Self {
        Self { entries }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents).context(format!("parsing {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, RawClass)] {
        &self.entries
    }
}

impl<'de> Deserialize<'de> for ParsedClasses {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = ParsedClasses;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping class names to class records")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<ParsedClasses, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                let mut seen = HashSet::new();
                while let Some((name, class)) = map.next_entry::<String, RawClass>()? {
                    if !seen.insert(name.clone()) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate class name '{name}'"
                        )));
                    }
                    entries.push((name, class));
                }
                Ok(ParsedClasses { entries })
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// A call occurrence inside a [`ClassRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method_name: String,
    pub hint: Option<String>,
    /// Declaring class, `None` until resolved or when unresolvable.
    pub target: Option<ClassIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub name: String,
    pub methods: HashSet<String>,
    pub calls: Vec<MethodCall>,
    pub words: Vec<String>,
    pub source: Option<String>,
}

impl ClassRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashSet::new(),
            calls: Vec::new(),
            words: Vec::new(),
            source: None,
        }
    }

    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }

    /// Append unresolved calls by method name.
    pub fn with_calls<I, S>(mut self, calls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.calls.extend(calls.into_iter().map(|name| MethodCall {
            method_name: name.into(),
            hint: None,
            target: None,
        }));
        self
    }

    pub fn with_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words.extend(words.into_iter().map(Into::into));
        self
    }

    fn from_raw(name: String, raw: RawClass) -> Self {
        Self {
            name,
            methods: raw.methods.into_iter().collect(),
            calls: raw
                .method_calls
                .into_iter()
                .map(|call| MethodCall {
                    method_name: call.method_name,
                    hint: call.class_name,
                    target: None,
                })
                .collect(),
            words: raw.words,
            source: raw.source,
        }
    }
}

/// Resolved call counts: `counts[[i, j]]` is the number of calls in class `i`
/// whose target is class `j`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMatrix {
    counts: Array2<u32>,
}

impl CallMatrix {
    fn from_records(records: &[ClassRecord]) -> Self {
        let n = records.len();
        let mut counts = Array2::zeros((n, n));
        for (caller, record) in records.iter().enumerate() {
            for target in record.calls.iter().filter_map(|call| call.target) {
                counts[[caller, target]] += 1;
            }
        }
        Self { counts }
    }

    /// Calls from `from` to `to`.
    pub fn calls(&self, from: ClassIndex, to: ClassIndex) -> u32 {
        self.counts[[from, to]]
    }

    /// Calls received by `class` from every other class.
    pub fn calls_in(&self, class: ClassIndex) -> u32 {
        self.counts
            .column(class)
            .indexed_iter()
            .filter(|(caller, _)| *caller != class)
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn counts(&self) -> &Array2<u32> {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

/// Arena of class records plus resolved call edges.
#[derive(Debug, Clone)]
pub struct ClassGraph {
    records: Vec<ClassRecord>,
    index: HashMap<String, ClassIndex>,
    calls: CallMatrix,
}

impl ClassGraph {
    /// Build from parser output and resolve calls.
    pub fn from_parsed(parsed: ParsedClasses) -> Result<Self> {
        let records = parsed
            .entries
            .into_iter()
            .map(|(name, raw)| ClassRecord::from_raw(name, raw))
            .collect();
        Self::from_records(records)
    }

    /// Build from records and resolve calls.
    pub fn from_records(records: Vec<ClassRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::EmptyInput("class graph has no classes"));
        }
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.name.clone(), i).is_some() {
                return Err(Error::input(format!(
                    "duplicate class name '{}'",
                    record.name
                )));
            }
        }
        let mut graph = Self {
            calls: CallMatrix::from_records(&[]),
            records,
            index,
        };
        graph.resolve_calls();
        Ok(graph)
    }

    /// Assign every call occurrence to its declaring class.
    ///
    /// The calling class wins when it declares the method. Otherwise the
    /// first class in canonical order that declares it is chosen. Overloads
    /// and overrides are not disambiguated. When no class declares the
    /// method, the parser's hint is kept if it names a known class; the call
    /// stays unresolved otherwise.
    pub fn resolve_calls(&mut self) {
        let declared: Vec<&HashSet<String>> = self.records.iter().map(|r| &r.methods).collect();
        let targets: Vec<Vec<Option<ClassIndex>>> = self
            .records
            .iter()
            .enumerate()
            .map(|(caller, record)| {
                record
                    .calls
                    .iter()
                    .map(|call| {
                        if declared[caller].contains(&call.method_name) {
                            return Some(caller);
                        }
                        declared
                            .iter()
                            .position(|methods| methods.contains(&call.method_name))
                            .or_else(|| {
                                call.hint
                                    .as_ref()
                                    .and_then(|hint| self.index.get(hint).copied())
                            })
                    })
                    .collect()
            })
            .collect();

        for (record, record_targets) in self.records.iter_mut().zip(targets) {
            for (call, target) in record.calls.iter_mut().zip(record_targets) {
                call.target = target;
            }
        }
        self.calls = CallMatrix::from_records(&self.records);

        tracing::debug!(
            classes = self.records.len(),
            resolved = self.calls.total(),
            unresolved = self.unresolved_count(),
            "resolved method calls"
        );
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ClassRecord] {
        &self.records
    }

    pub fn record(&self, class: ClassIndex) -> &ClassRecord {
        &self.records[class]
    }

    pub fn name(&self, class: ClassIndex) -> &str {
        &self.records[class].name
    }

    pub fn index_of(&self, name: &str) -> Option<ClassIndex> {
        self.index.get(name).copied()
    }

    pub fn call_matrix(&self) -> &CallMatrix {
        &self.calls
    }

    /// Every resolved call as `(caller, callee)`, one item per occurrence.
    pub fn resolved_calls(&self) -> impl Iterator<Item = (ClassIndex, ClassIndex)> + '_ {
        self.records
            .iter()
            .enumerate()
            .flat_map(|(caller, record)| {
                record
                    .calls
                    .iter()
                    .filter_map(move |call| call.target.map(|target| (caller, target)))
            })
    }

    pub fn unresolved_count(&self) -> usize {
        self.records
            .iter()
            .flat_map(|r| r.calls.iter())
            .filter(|call| call.target.is_none())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn targets(graph: &ClassGraph, class: &str) -> Vec<Option<ClassIndex>> {
        let idx = graph.index_of(class).unwrap();
        graph.record(idx).calls.iter().map(|c| c.target).collect()
    }

    #[test]
    fn test_parsed_classes_preserve_key_order() {
        let json = indoc! {r#"
            {
                "Zeta": {"methods": ["z"], "method_calls": [], "words": []},
                "Alpha": {"methods": ["a"], "method_calls": [], "words": []},
                "Mid": {"methods": [], "method_calls": [], "words": []}
            }
        "#};
        let parsed = ParsedClasses::from_json(json).unwrap();
        let names: Vec<&str> = parsed.entries().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);

        let graph = ClassGraph::from_parsed(parsed).unwrap();
        assert_eq!(graph.index_of("Alpha"), Some(1));
        assert_eq!(graph.name(2), "Mid");
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let json = r#"{"A": {}, "A": {}}"#;
        assert!(ParsedClasses::from_json(json).is_err());
    }

    #[test]
    fn test_self_declaration_takes_priority() {
        let graph = ClassGraph::from_records(vec![
            ClassRecord::new("A").with_methods(["run"]),
            ClassRecord::new("B").with_methods(["run"]).with_calls(["run"]),
        ])
        .unwrap();
        assert_eq!(targets(&graph, "B"), vec![Some(1)]);
    }

    #[test]
    fn test_first_declaring_class_wins() {
        let graph = ClassGraph::from_records(vec![
            ClassRecord::new("Caller").with_calls(["save"]),
            ClassRecord::new("RepoA").with_methods(["save"]),
            ClassRecord::new("RepoB").with_methods(["save"]),
        ])
        .unwrap();
        assert_eq!(targets(&graph, "Caller"), vec![Some(1)]);
    }

    #[test]
    fn test_unresolved_calls_excluded() {
        let json = indoc! {r#"
            {
                "A": {"methods": ["a"], "method_calls": [
                    {"method_name": "pop", "class_name": "numbers"},
                    {"method_name": "mystery", "class_name": "B"},
                    {"method_name": "b", "class_name": null}
                ]},
                "B": {"methods": ["b"]}
            }
        "#};
        let graph = ClassGraph::from_parsed(ParsedClasses::from_json(json).unwrap()).unwrap();
        // library hint dropped, known-class hint kept, declared method resolved
        assert_eq!(targets(&graph, "A"), vec![None, Some(1), Some(1)]);
        assert_eq!(graph.unresolved_count(), 1);
        assert_eq!(graph.call_matrix().calls(0, 1), 2);
        assert_eq!(graph.resolved_calls().count(), 2);
    }

    #[test]
    fn test_calls_in_excludes_self_calls() {
        let graph = ClassGraph::from_records(vec![
            ClassRecord::new("A").with_methods(["a"]).with_calls(["a", "b"]),
            ClassRecord::new("B").with_methods(["b"]).with_calls(["a"]),
        ])
        .unwrap();
        let calls = graph.call_matrix();
        assert_eq!(calls.calls(0, 0), 1);
        assert_eq!(calls.calls_in(0), 1);
        assert_eq!(calls.calls_in(1), 1);
    }

    #[test]
    fn test_empty_graph_rejected() {
        assert!(matches!(
            ClassGraph::from_records(Vec::new()),
            Err(Error::EmptyInput(_))
        ));
    }
}
