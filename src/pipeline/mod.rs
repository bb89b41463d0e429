pub mod check;
pub mod discover;
pub mod graph;

pub use check::{CheckError, check_pipeline};
pub use discover::discover_actions;
pub use graph::{DependencyGraph, build_graph};

use std::path::PathBuf;

use crate::header::ScriptHeader;

/// A resolved unit of work: one script with a runnable command line and the
/// files it consumes and produces. Re-derived from disk on every run, never
/// persisted.
#[derive(Debug, Clone)]
pub struct Action {
    /// The script file that owns the header.
    pub file: PathBuf,
    /// Full shell command, including PIPE redirections, environment
    /// activation and the completion marker.
    pub command: String,
    /// Files this action produces (from CREATES).
    pub targets: Vec<PathBuf>,
    /// Files this action requires (from DEPENDS); empty when none declared.
    pub inputs: Vec<PathBuf>,
    /// The parsed header, kept for documentation metadata.
    pub header: ScriptHeader,
}

impl Action {
    pub fn name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file.to_string_lossy().to_string())
    }
}
