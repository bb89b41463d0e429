use std::path::PathBuf;

use serde::Serialize;

use crate::config::Layout;
use crate::crypto::decrypt_command;
use crate::pipeline::Action;

/// One task as the external execution engine consumes it: a shell command,
/// the files it produces, the files whose changes make it stale, and
/// documentation metadata. Serialized to JSON by the `export` subcommand.
#[derive(Debug, Serialize)]
pub struct TaskSpec {
    pub name: String,
    pub actions: Vec<String>,
    pub targets: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_dep: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// `[true]` marks a task as up to date whenever its targets exist; set
    /// exactly for actions with no declared inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptodate: Option<Vec<bool>>,
}

/// Build the full task list: one decrypt task per encrypted file, one
/// process task per action. Paths are root-relative so the engine can run
/// from the project root.
pub fn task_specs(
    layout: &Layout,
    actions: &[Action],
    crypt_pairs: &[(PathBuf, PathBuf)],
    passphrase: Option<&str>,
) -> Vec<TaskSpec> {
    let mut specs = Vec::new();

    for (encrypted, decrypted) in crypt_pairs {
        let encrypted = layout.display_path(encrypted);
        let decrypted = layout.display_path(decrypted);
        let command = match passphrase {
            Some(passphrase) => decrypt_command(
                &layout.gpg,
                passphrase,
                &layout.display_path(&layout.private_dir),
                &encrypted,
                &decrypted,
            ),
            // Decryption must fail loudly at run time when no passphrase was
            // supplied, not silently succeed at export time.
            None => String::from(
                "echo \"Cannot decrypt files as no passphrase is given\" 1>&2 && exit 1",
            ),
        };
        specs.push(TaskSpec {
            name: format!("decrypt:{}", decrypted.display()),
            actions: vec![command],
            targets: vec![decrypted],
            file_dep: vec![encrypted],
            doc: None,
            uptodate: None,
        });
    }

    for action in actions {
        let file_dep: Vec<PathBuf> = action
            .inputs
            .iter()
            .map(|p| layout.display_path(p))
            .collect();
        let uptodate = file_dep.is_empty().then(|| vec![true]);
        specs.push(TaskSpec {
            name: format!("process:{}", action.name()),
            actions: vec![action.command.clone()],
            targets: action
                .targets
                .iter()
                .map(|p| layout.display_path(p))
                .collect(),
            file_dep,
            doc: action.header.description.clone(),
            uptodate,
        });
    }

    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_layout;
    use crate::crypto::encrypted_pairs;
    use crate::pipeline::discover_actions;
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
    fn process_tasks_carry_deps_targets_and_doc() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(
            &layout,
            "clean.sh",
            "#!/bin/sh\n#CREATES: data/intermediate/clean.csv\n#DEPENDS: data/raw/dirty.csv\n#DESCRIPTION: Cleans the data\n",
        );

        let actions = discover_actions(&layout).unwrap();
        let specs = task_specs(&layout, &actions, &[], None);

        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.name, "process:clean.sh");
        assert_eq!(spec.actions, vec![actions[0].command.clone()]);
        assert_eq!(spec.targets, vec![PathBuf::from("data/intermediate/clean.csv")]);
        assert_eq!(spec.file_dep, vec![PathBuf::from("data/raw/dirty.csv")]);
        assert_eq!(spec.doc.as_deref(), Some("Cleans the data"));
        assert!(spec.uptodate.is_none());
    }

    #[test]
    fn inputless_tasks_are_uptodate_when_targets_exist() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(&layout, "download.sh", "#!/bin/sh\n#CREATES: data/raw/x.csv\n");

        let actions = discover_actions(&layout).unwrap();
        let specs = task_specs(&layout, &actions, &[], None);
        assert_eq!(specs[0].uptodate, Some(vec![true]));
        assert!(specs[0].file_dep.is_empty());
    }

    #[test]
    fn decrypt_tasks_fail_loudly_without_a_passphrase() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        fs::create_dir_all(&layout.encrypted_dir).unwrap();
        fs::write(layout.encrypted_dir.join("secrets.csv.gpg"), "x").unwrap();

        let pairs = encrypted_pairs(&layout).unwrap();
        let specs = task_specs(&layout, &[], &pairs, None);

        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.name, "decrypt:data/raw-private/secrets.csv");
        assert_eq!(spec.file_dep, vec![PathBuf::from("data/raw-private-encrypted/secrets.csv.gpg")]);
        assert_eq!(spec.targets, vec![PathBuf::from("data/raw-private/secrets.csv")]);
        assert!(spec.actions[0].contains("exit 1"));
    }

    #[test]
    fn decrypt_tasks_use_gpg_when_passphrase_given() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        fs::create_dir_all(&layout.encrypted_dir).unwrap();
        fs::write(layout.encrypted_dir.join("secrets.csv.gpg"), "x").unwrap();

        let pairs = encrypted_pairs(&layout).unwrap();
        let specs = task_specs(&layout, &[], &pairs, Some("hunter2"));
        let command = &specs[0].actions[0];
        assert!(command.contains("gpg --batch --yes --passphrase \"hunter2\""));
        assert!(command.contains("mkdir -p data/raw-private"));
        assert!(command.contains("-o data/raw-private/secrets.csv"));
        assert!(command.contains("-d data/raw-private-encrypted/secrets.csv.gpg"));
    }

    #[test]
    fn specs_serialize_without_empty_optionals() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        write_script(&layout, "gen.sh", "#!/bin/sh\n#CREATES: out.csv\n");

        let actions = discover_actions(&layout).unwrap();
        let specs = task_specs(&layout, &actions, &[], None);
        let json = serde_json::to_string_pretty(&specs).unwrap();
        assert!(json.contains("\"uptodate\""));
        assert!(!json.contains("\"file_dep\""));
        assert!(!json.contains("\"doc\""));
    }
}
