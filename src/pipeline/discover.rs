use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use super::Action;
use crate::config::Layout;
use crate::error::{CompendiumError, Result};
use crate::header::ScriptHeader;
use crate::util::list_files;

/// Discover every script under the processing and analysis directories and
/// build an [`Action`] for each one declaring both COMMAND and CREATES.
pub fn discover_actions(layout: &Layout) -> Result<Vec<Action>> {
    let mut scripts = list_files(&layout.processing_dir, Some(&layout.script_extensions))?;
    scripts.extend(list_files(
        &layout.analysis_dir,
        Some(&layout.script_extensions),
    )?);

    let mut actions = Vec::new();
    for file in scripts {
        let header = ScriptHeader::from_file(&file)?;
        let (Some(_), Some(creates)) = (&header.command, &header.creates) else {
            debug!(
                "Skipping {}: header lacks COMMAND or CREATES",
                layout.display_path(&file).display()
            );
            continue;
        };

        let targets = split_file_list(creates)
            .iter()
            .map(|p| layout.resolve(p))
            .collect::<Vec<_>>();
        let inputs = split_file_list(header.depends.as_deref().unwrap_or(""))
            .iter()
            .map(|p| layout.resolve(p))
            .collect::<Vec<_>>();

        let command = build_command(layout, &file, &header, &targets, &inputs)?;

        actions.push(Action {
            file,
            command,
            targets,
            inputs,
            header,
        });
    }

    Ok(actions)
}

/// Split a CREATES/DEPENDS value on runs of spaces and commas, discarding
/// empty pieces. An absent value yields an empty list.
pub fn split_file_list(text: &str) -> Vec<PathBuf> {
    let separators = Regex::new(r"[ ,]+").unwrap();
    separators
        .split(text.trim())
        .filter(|piece| !piece.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn build_command(
    layout: &Layout,
    file: &Path,
    header: &ScriptHeader,
    targets: &[PathBuf],
    inputs: &[PathBuf],
) -> Result<String> {
    let interpreter = header.command.as_deref().unwrap_or_default();
    let script = layout.display_path(file);
    let mut command = format!("{} {}", interpreter, script.display());

    if header.pipe_enabled() {
        if inputs.len() > 1 || targets.len() > 1 {
            return Err(CompendiumError::Pipeline(format!(
                "File {}: Cannot use PIPE with multiple inputs or outputs",
                script.display()
            )));
        }
        if let Some(input) = inputs.first() {
            command = format!("{} < {}", command, layout.display_path(input).display());
        }
        if let Some(target) = targets.first() {
            command = format!("{} > {}", command, layout.display_path(target).display());
        }
    }

    if file.extension().is_some_and(|ext| ext == "py") {
        if let Some(env) = &layout.python_env {
            // Python scripts run inside the project virtual environment.
            command = format!("(. {}/bin/activate; {})", env.display(), command);
        }
    }

    // Completion marker on stderr so the execution engine can confirm
    // success.
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(format!(
        "{} && echo \"[OK] {} completed\" 1>&2",
        command, name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_layout;
    use std::fs;
    use tempfile::TempDir;

    fn layout_in(dir: &TempDir) -> Layout {
        let config_path = dir.path().join("compendium.toml");
        load_layout(&config_path.to_string_lossy()).unwrap()
    }

    fn write_script(layout: &Layout, name: &str, contents: &str) {
        fs::create_dir_all(&layout.processing_dir).unwrap();
        fs::write(layout.processing_dir.join(name), contents).unwrap();
    }

    #[test]
    fn builds_one_action_per_well_formed_header() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(
            &layout,
            "clean.R",
            "#!/usr/bin/env Rscript\n#CREATES: data/intermediate/clean.csv\n#DEPENDS: data/raw/dirty.csv, data/raw/extra.csv\n",
        );

        let actions = discover_actions(&layout).unwrap();
        assert_eq!(actions.len(), 1);
        let action = &actions[0];
        assert_eq!(action.name(), "clean.R");
        assert_eq!(
            action.targets,
            vec![layout.root.join("data/intermediate/clean.csv")]
        );
        assert_eq!(
            action.inputs,
            vec![
                layout.root.join("data/raw/dirty.csv"),
                layout.root.join("data/raw/extra.csv")
            ]
        );
        assert_eq!(
            action.command,
            "/usr/bin/env Rscript src/data-processing/clean.R \
             && echo \"[OK] clean.R completed\" 1>&2"
        );
    }

    #[test]
    fn header_without_creates_or_command_yields_no_action() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(&layout, "no_creates.sh", "#!/bin/sh\n#DEPENDS: a.csv\n");
        write_script(&layout, "no_command.sh", "#CREATES: b.csv\n");

        let actions = discover_actions(&layout).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn absent_depends_means_no_inputs() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(&layout, "gen.sh", "#!/bin/sh\n#CREATES: out.csv\n");

        let actions = discover_actions(&layout).unwrap();
        assert_eq!(actions.len(), 1);
        assert!(actions[0].inputs.is_empty());
    }

    #[test]
    fn unrecognized_extensions_are_not_scripts() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(&layout, "notes.txt", "#COMMAND: cat\n#CREATES: out.csv\n");

        let actions = discover_actions(&layout).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn pipe_redirects_single_input_and_target() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(
            &layout,
            "filter.sh",
            "#!/bin/sh\n#CREATES: data/intermediate/out.csv\n#DEPENDS: data/raw/in.csv\n#PIPE: T\n",
        );

        let actions = discover_actions(&layout).unwrap();
        assert_eq!(
            actions[0].command,
            "/bin/sh src/data-processing/filter.sh \
             < data/raw/in.csv > data/intermediate/out.csv \
             && echo \"[OK] filter.sh completed\" 1>&2"
        );
    }

    #[test]
    fn pipe_with_multiple_files_is_a_pipeline_error() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(
            &layout,
            "bad.sh",
            "#!/bin/sh\n#CREATES: a.csv b.csv\n#PIPE: T\n",
        );

        let err = discover_actions(&layout).unwrap_err();
        assert!(matches!(err, CompendiumError::Pipeline(_)));
    }

    #[test]
    fn python_scripts_activate_the_virtual_environment() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(
            &layout,
            "process.py",
            "#!/usr/bin/env python3\n#CREATES: out.csv\n",
        );

        let actions = discover_actions(&layout).unwrap();
        assert_eq!(
            actions[0].command,
            "(. env/bin/activate; /usr/bin/env python3 src/data-processing/process.py) \
             && echo \"[OK] process.py completed\" 1>&2"
        );
    }

    #[test]
    fn split_file_list_handles_commas_and_spaces() {
        assert_eq!(
            split_file_list("a.csv, b.csv  c.csv ,d.csv"),
            vec![
                PathBuf::from("a.csv"),
                PathBuf::from("b.csv"),
                PathBuf::from("c.csv"),
                PathBuf::from("d.csv")
            ]
        );
        assert!(split_file_list("").is_empty());
        assert!(split_file_list("   ").is_empty());
    }
}
