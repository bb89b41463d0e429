use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::Result;
use crate::util::{contained_in, parse_timeout, resolve_path};

#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    layout: LayoutSection,
    #[serde(default)]
    scripts: ScriptsSection,
    #[serde(default)]
    commands: CommandsSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LayoutSection {
    raw: String,
    private: String,
    encrypted: String,
    processing: String,
    analysis: String,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            raw: "data/raw".to_string(),
            private: "data/raw-private".to_string(),
            encrypted: "data/raw-private-encrypted".to_string(),
            processing: "src/data-processing".to_string(),
            analysis: "src/analysis".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ScriptsSection {
    extensions: Vec<String>,
    python_env: Option<String>,
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            extensions: [".py", ".R", ".Rmd", ".sh"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            python_env: Some("env".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CommandsSection {
    gpg: String,
    dot: String,
    timeout: Option<String>,
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            gpg: "gpg".to_string(),
            dot: "dot".to_string(),
            timeout: None,
        }
    }
}

/// Classification of every path the task model can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Encrypted,
    RawPublic,
    RawPrivate,
    ProcessingScript,
    AnalysisScript,
    Intermediate,
}

/// Resolved project layout, constructed once at startup and passed by
/// reference into every component.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub raw_dir: PathBuf,
    pub private_dir: PathBuf,
    pub encrypted_dir: PathBuf,
    pub processing_dir: PathBuf,
    pub analysis_dir: PathBuf,
    pub script_extensions: Vec<String>,
    pub python_env: Option<PathBuf>,
    pub gpg: String,
    pub dot: String,
    pub command_timeout: Option<Duration>,
}

/// Load the project layout from `config_path`. A missing config file yields
/// the default compendium layout rooted at the file's parent directory.
pub fn load_layout(config_path: &str) -> Result<Layout> {
    let config = load_and_parse_config(config_path)?;
    let root = config_root(config_path);
    Ok(process_config(config, root))
}

fn load_and_parse_config(config_path: &str) -> Result<Config> {
    if !Path::new(config_path).is_file() {
        tracing::debug!("No config file at {}, using default layout", config_path);
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(config_path)?;
    let config = toml::from_str(&contents)?;
    Ok(config)
}

fn config_root(config_path: &str) -> PathBuf {
    let parent = Path::new(config_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    // Canonicalize once so containment checks are over resolved paths
    // rather than whatever spelling the user invoked us with.
    parent.canonicalize().unwrap_or(parent)
}

fn process_config(config: Config, root: PathBuf) -> Layout {
    let resolve = |dir: &str| resolve_path(&root, Path::new(dir));

    Layout {
        raw_dir: resolve(&config.layout.raw),
        private_dir: resolve(&config.layout.private),
        encrypted_dir: resolve(&config.layout.encrypted),
        processing_dir: resolve(&config.layout.processing),
        analysis_dir: resolve(&config.layout.analysis),
        script_extensions: config.scripts.extensions,
        python_env: config.scripts.python_env.map(PathBuf::from),
        gpg: config.commands.gpg,
        dot: config.commands.dot,
        command_timeout: parse_timeout(config.commands.timeout.as_deref()),
        root,
    }
}

impl Layout {
    /// Resolve a declared path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_path(&self.root, path)
    }

    pub fn classify(&self, path: &Path) -> FileCategory {
        let path = self.resolve(path);
        if contained_in(&self.encrypted_dir, &path) {
            FileCategory::Encrypted
        } else if contained_in(&self.raw_dir, &path) {
            FileCategory::RawPublic
        } else if contained_in(&self.private_dir, &path) {
            FileCategory::RawPrivate
        } else if contained_in(&self.processing_dir, &path) {
            FileCategory::ProcessingScript
        } else if contained_in(&self.analysis_dir, &path) {
            FileCategory::AnalysisScript
        } else {
            FileCategory::Intermediate
        }
    }

    /// Root-relative form for display; falls back to the path as given.
    pub fn display_path(&self, path: &Path) -> PathBuf {
        let resolved = self.resolve(path);
        resolved
            .strip_prefix(&self.root)
            .map(|p| p.to_path_buf())
            .unwrap_or(resolved)
    }
}
