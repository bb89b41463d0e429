use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use tracing::info;

use super::{Action, build_graph};
use crate::config::{FileCategory, Layout};

/// A single consistency problem. Paths are root-relative for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// A declared input under the raw root that does not exist on disk.
    MissingSource(PathBuf),
    /// An intermediate input no script produces.
    Dangling(PathBuf),
    /// A file reachable from itself through the dependency graph.
    Cyclic(PathBuf),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::MissingSource(path) => {
                write!(f, "Input file {} does not exist", path.display())
            }
            CheckError::Dangling(path) => write!(
                f,
                "Intermediate file {} is not produced by any script",
                path.display()
            ),
            CheckError::Cyclic(path) => {
                write!(f, "Cyclical dependency for file {}", path.display())
            }
        }
    }
}

/// Cross-reference every declared input against the filesystem categories and
/// the set of produced outputs, then scan the full graph for cycles. All
/// problems are collected into one report; nothing is mutated.
pub fn check_pipeline(
    layout: &Layout,
    actions: &[Action],
    crypt_pairs: &[(PathBuf, PathBuf)],
) -> Vec<CheckError> {
    info!("Checking consistency of dependency graph");

    let mut inputs: BTreeSet<PathBuf> = BTreeSet::new();
    let mut outputs: BTreeSet<PathBuf> = BTreeSet::new();
    for action in actions {
        inputs.extend(action.inputs.iter().cloned());
        outputs.extend(action.targets.iter().cloned());
    }

    let mut errors = Vec::new();

    // Every input must be a pre-existing raw file, a decrypted private file,
    // or the output of some other action.
    for input in inputs.difference(&outputs) {
        match layout.classify(input) {
            FileCategory::RawPublic => {
                if !input.is_file() {
                    errors.push(CheckError::MissingSource(layout.display_path(input)));
                }
            }
            FileCategory::RawPrivate => {}
            _ => {
                errors.push(CheckError::Dangling(layout.display_path(input)));
            }
        }
    }

    let graph = build_graph(actions, crypt_pairs);
    for node in graph.cyclic_nodes() {
        errors.push(CheckError::Cyclic(layout.display_path(&node)));
    }

    errors
}
