use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;

use crate::config::{FileCategory, Layout};
use crate::error::Result;
use crate::pipeline::Action;
use crate::util::run_checked;

#[derive(ValueEnum, Clone, Debug)]
pub enum DocKind {
    /// Markdown listing of every processing/analysis script.
    Readme,
    /// Rendered image of the dependency graph.
    Process,
}

impl DocKind {
    fn default_filename(&self) -> &'static str {
        match self {
            DocKind::Readme => "README.md",
            DocKind::Process => "process.png",
        }
    }
}

/// Generate the requested document at `filename` (or its default), asking
/// before overwriting unless `overwrite` is set.
pub async fn generate(
    layout: &Layout,
    actions: &[Action],
    crypt_pairs: &[(PathBuf, PathBuf)],
    kind: &DocKind,
    filename: Option<&str>,
    overwrite: bool,
) -> Result<()> {
    let filename = filename.unwrap_or_else(|| kind.default_filename());
    let file = layout.root.join(filename);

    if file.exists() && !overwrite && !confirm_overwrite(&file)? {
        return Ok(());
    }

    match kind {
        DocKind::Readme => {
            fs::write(&file, readme_markdown(layout, actions))?;
        }
        DocKind::Process => {
            let dot = process_dot(layout, actions, crypt_pairs);
            let image = render_graph(layout, &dot).await?;
            fs::write(&file, image)?;
        }
    }
    Ok(())
}

/// Markdown listing of every action: script link, inputs -> targets,
/// description.
pub fn readme_markdown(layout: &Layout, actions: &[Action]) -> String {
    let link = |path: &PathBuf| {
        let relative = layout.display_path(path);
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("[{}]({})", name, relative.display())
    };

    let mut md = String::from("# Data processing scripts");
    md.push_str("\n\nThis folder contains the following scripts:\n\n");
    for action in actions {
        let inputs = action.inputs.iter().map(&link).collect::<Vec<_>>().join(",");
        let targets = action
            .targets
            .iter()
            .map(&link)
            .collect::<Vec<_>>()
            .join(",");
        let description = action.header.description.as_deref().unwrap_or("");
        md.push_str(&format!(
            "- {}: [{} -> {}]  \n  {}  \n  \n",
            link(&action.file),
            inputs,
            targets,
            description
        ));
    }
    md
}

/// Textual DOT description of the dependency graph: one node per distinct
/// file, shaped by category, edges for crypt pairs and for every action's
/// inputs and targets.
pub fn process_dot(
    layout: &Layout,
    actions: &[Action],
    crypt_pairs: &[(PathBuf, PathBuf)],
) -> String {
    let mut nodes: Vec<String> = Vec::new();
    let mut nodemap: HashMap<PathBuf, String> = HashMap::new();
    let mut edges: Vec<String> = Vec::new();

    let mut node = |file: &PathBuf, nodes: &mut Vec<String>| -> String {
        let resolved = layout.resolve(file);
        if let Some(name) = nodemap.get(&resolved) {
            return name.clone();
        }
        let shape = match layout.classify(&resolved) {
            FileCategory::Encrypted => "box3d",
            FileCategory::ProcessingScript => "cds",
            FileCategory::AnalysisScript => "component",
            _ => "note",
        };
        let label = layout
            .display_path(&resolved)
            .to_string_lossy()
            .replace('/', "/\\n");
        let name = format!("n_{}", nodemap.len());
        nodes.push(format!("{} [label=\"{}\", shape=\"{}\"];", name, label, shape));
        nodemap.insert(resolved, name.clone());
        name
    };

    for (encrypted, decrypted) in crypt_pairs {
        let from = node(encrypted, &mut nodes);
        let to = node(decrypted, &mut nodes);
        edges.push(format!("{} -> {};", from, to));
    }

    for action in actions {
        let script = node(&action.file, &mut nodes);
        for input in &action.inputs {
            let from = node(input, &mut nodes);
            edges.push(format!("{} -> {};", from, script));
        }
        for target in &action.targets {
            let to = node(target, &mut nodes);
            edges.push(format!("{} -> {};", script, to));
        }
    }

    format!(
        "digraph G {{\ngraph [rankdir=\"LR\"];\n{}\n\n{}\n}}\n",
        nodes.join("\n"),
        edges.join("\n")
    )
}

/// Pipe the DOT text to the external renderer and return the PNG bytes.
pub async fn render_graph(layout: &Layout, dot: &str) -> Result<Vec<u8>> {
    let command = format!("{} -T png", layout.dot);
    let output = run_checked(
        &command,
        Some(dot.as_bytes().to_vec()),
        layout.command_timeout,
    )
    .await?;
    Ok(output.stdout)
}

fn confirm_overwrite(file: &Path) -> Result<bool> {
    print!("File {} exists, overwrite? [y/N] ", file.display());
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();

    match answer.chars().next() {
        None | Some('y') => Ok(true),
        Some('n') => Ok(false),
        _ => {
            println!("Could not understand answer, sorry");
            Ok(false)
        }
    }
}
