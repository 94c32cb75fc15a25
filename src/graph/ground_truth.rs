//! Reference groupings used by the ground-truth metrics.
//!
//! Three on-disk forms are accepted:
//! - a JSON object mapping each class to a group name or a list of names,
//! - a project directory whose immediate sub-directories are the groups,
//!   every `.java` file below one of them naming a class,
//! - a cluster listing with one `SS(group) = ClassA, ClassB` line per group.

use super::ClassGraph;
use crate::errors::{Error, Result, ResultExt};
use crate::membership::{Membership, MembershipStructure};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a ground truth comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroundTruthSource {
    Mapping(PathBuf),
    Directory(PathBuf),
    Listing(PathBuf),
}

impl GroundTruthSource {
    /// Pick the form from the path: directories are layouts, `.json` files
    /// are mappings, anything else is a cluster listing.
    pub fn detect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::Directory(path)
        } else if path.extension().is_some_and(|ext| ext == "json") {
            Self::Mapping(path)
        } else {
            Self::Listing(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Mapping(p) | Self::Directory(p) | Self::Listing(p) => p,
        }
    }

    pub fn load(&self) -> Result<GroundTruth> {
        let truth = match self {
            Self::Mapping(path) => {
                let contents = std::fs::read_to_string(path)?;
                GroundTruth::from_mapping_json(&contents)
            }
            Self::Directory(path) => GroundTruth::from_directory(path),
            Self::Listing(path) => {
                let contents = std::fs::read_to_string(path)?;
                GroundTruth::from_listing(&contents)
            }
        };
        truth.context(format!("loading ground truth from {}", self.path().display()))
    }
}

static LISTING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*SS\((?P<group>[^)]*)\)\s*=\s*(?P<classes>.*)$").unwrap());

#[derive(Deserialize)]
#[serde(untagged)]
enum GroupNames {
    One(String),
    Many(Vec<String>),
}

/// Class-name to group-name assignments, possibly overlapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroundTruth {
    assignments: Vec<(String, String)>,
}

impl GroundTruth {
    pub fn new(assignments: Vec<(String, String)>) -> Self {
        Self { assignments }
    }

    pub fn from_mapping_json(contents: &str) -> Result<Self> {
        let mapping: BTreeMap<String, GroupNames> = serde_json::from_str(contents)?;
        let assignments = mapping
            .into_iter()
            .flat_map(|(class, groups)| {
                let groups = match groups {
                    GroupNames::One(group) => vec![group],
                    GroupNames::Many(groups) => groups,
                };
                groups.into_iter().map(move |group| (class.clone(), group))
            })
            .collect();
        Ok(Self { assignments })
    }

    pub fn from_directory(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::input_with_path(
                "ground truth directory does not exist",
                root,
            ));
        }
        let mut assignments = Vec::new();
        let groups = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir());

        for group_dir in groups {
            let group = group_dir.file_name().to_string_lossy().into_owned();
            let classes = WalkDir::new(group_dir.path())
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "java"));
            for class_file in classes {
                if let Some(stem) = class_file.path().file_stem() {
                    assignments.push((stem.to_string_lossy().into_owned(), group.clone()));
                }
            }
        }
        Ok(Self { assignments })
    }

    pub fn from_listing(contents: &str) -> Result<Self> {
        let mut assignments = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let caps = LISTING_LINE.captures(line).ok_or_else(|| {
                Error::input(format!(
                    "line {}: expected 'SS(group) = ClassA, ClassB'",
                    number + 1
                ))
            })?;
            let group = caps["group"].trim().to_string();
            assignments.extend(
                caps["classes"]
                    .split(',')
                    .map(str::trim)
                    .filter(|class| !class.is_empty())
                    .map(|class| (class.to_string(), group.clone())),
            );
        }
        Ok(Self { assignments })
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Distinct group names in first-appearance order.
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (_, group) in &self.assignments {
            if !names.contains(&group.as_str()) {
                names.push(group);
            }
        }
        names
    }

    /// Convert to a membership structure over the graph's class ordering.
    ///
    /// Group ids follow the first class (in graph order) that carries the
    /// group. Classes the graph does not know are skipped with a warning and
    /// graph classes missing from the ground truth stay unassigned.
    pub fn to_membership(&self, graph: &ClassGraph) -> MembershipStructure {
        let mut per_class: Vec<Vec<&str>> = vec![Vec::new(); graph.len()];
        for (class, group) in &self.assignments {
            match graph.index_of(class) {
                Some(idx) => per_class[idx].push(group),
                None => tracing::warn!(class = %class, group = %group, "ground truth class not found in class graph, skipping"),
            }
        }

        let mut ids: HashMap<&str, usize> = HashMap::new();
        per_class
            .into_iter()
            .map(|groups| {
                Membership::from_groups(groups.into_iter().map(|group| {
                    let next = ids.len();
                    *ids.entry(group).or_insert(next)
                }))
            })
            .collect()
    }
}
