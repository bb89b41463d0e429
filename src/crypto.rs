use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::config::Layout;
use crate::error::{CompendiumError, Result};
use crate::util::{list_files, modified_time, run_checked};

/// Every `*.gpg` file directly inside the encrypted root, paired with its
/// decrypted counterpart in the private root. The pair list is what the
/// dependency graph and the document generator consume; no decryption
/// happens here.
pub fn encrypted_pairs(layout: &Layout) -> Result<Vec<(PathBuf, PathBuf)>> {
    let suffix = [".gpg".to_string()];
    let gpg_files = list_files(&layout.encrypted_dir, Some(&suffix))?;

    Ok(gpg_files
        .into_iter()
        .map(|encrypted| {
            let stem = encrypted
                .file_stem()
                .map(|s| s.to_os_string())
                .unwrap_or_default();
            let decrypted = layout.private_dir.join(stem);
            (encrypted, decrypted)
        })
        .collect())
}

/// Decrypt every encrypted file into the private root. Pairs whose plaintext
/// is already newer than the ciphertext are skipped.
pub async fn decrypt(layout: &Layout, passphrase: Option<&str>) -> Result<()> {
    let pairs = encrypted_pairs(layout)?;
    if pairs.is_empty() {
        info!(
            "No encrypted files in {}",
            layout.display_path(&layout.encrypted_dir).display()
        );
        return Ok(());
    }

    let passphrase = passphrase.ok_or(CompendiumError::MissingPassphrase)?;

    for (encrypted, decrypted) in &pairs {
        if up_to_date(decrypted, encrypted) {
            debug!(
                "Skipping {}: already decrypted",
                layout.display_path(decrypted).display()
            );
            continue;
        }
        println!(
            "Decrypting {} -> {}",
            layout.display_path(encrypted).display(),
            layout.display_path(decrypted).display()
        );
        let command = decrypt_command(
            &layout.gpg,
            passphrase,
            &layout.private_dir,
            encrypted,
            decrypted,
        );
        run_checked(&command, None, layout.command_timeout).await?;
    }

    Ok(())
}

/// Encrypt `files` (or, when empty, every file directly inside the private
/// root) into the encrypted root. Explicitly named files must live directly
/// inside the private root.
pub async fn encrypt(layout: &Layout, passphrase: &str, files: &[PathBuf]) -> Result<()> {
    let files = if files.is_empty() {
        list_files(&layout.private_dir, None)?
    } else {
        let resolved: Vec<PathBuf> = files.iter().map(|f| layout.resolve(f)).collect();
        for file in &resolved {
            if file.parent() != Some(layout.private_dir.as_path()) {
                return Err(CompendiumError::Encrypt(format!(
                    "File {} not in {}, so will not be encrypted!",
                    file.display(),
                    layout.display_path(&layout.private_dir).display()
                )));
            }
        }
        resolved
    };

    fs::create_dir_all(&layout.encrypted_dir)?;

    for file in &files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let outfile = layout.encrypted_dir.join(format!("{}.gpg", name));
        println!(
            "Encrypting {} -> {}",
            layout.display_path(file).display(),
            layout.display_path(&outfile).display()
        );
        let command = format!(
            "{} --yes --symmetric --batch --passphrase \"{}\" -o {} {}",
            layout.gpg,
            passphrase,
            outfile.display(),
            file.display()
        );
        run_checked(&command, None, layout.command_timeout).await?;
    }

    Ok(())
}

/// The shell command that decrypts one file, creating the private root on
/// the way. Shared with the execution-engine export.
pub fn decrypt_command(
    gpg: &str,
    passphrase: &str,
    private_dir: &Path,
    encrypted: &Path,
    decrypted: &Path,
) -> String {
    format!(
        "mkdir -p {} && {} --batch --yes --passphrase \"{}\" -o {} -d {}",
        private_dir.display(),
        gpg,
        passphrase,
        decrypted.display(),
        encrypted.display()
    )
}

fn up_to_date(target: &Path, source: &Path) -> bool {
    match (modified_time(target), modified_time(source)) {
        (Some(target_time), Some(source_time)) => target_time >= source_time,
        _ => false,
    }
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

    #[test]
    fn pairs_strip_exactly_the_gpg_suffix() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        fs::create_dir_all(&layout.encrypted_dir).unwrap();
        fs::write(layout.encrypted_dir.join("survey.csv.gpg"), "x").unwrap();
        fs::write(layout.encrypted_dir.join("codes.json.gpg"), "x").unwrap();
        fs::write(layout.encrypted_dir.join("README.txt"), "not encrypted").unwrap();

        let pairs = encrypted_pairs(&layout).unwrap();
        assert_eq!(
            pairs,
            vec![
                (
                    layout.encrypted_dir.join("codes.json.gpg"),
                    layout.private_dir.join("codes.json")
                ),
                (
                    layout.encrypted_dir.join("survey.csv.gpg"),
                    layout.private_dir.join("survey.csv")
                ),
            ]
        );
    }

    #[test]
    fn no_encrypted_dir_means_no_pairs() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        assert!(encrypted_pairs(&layout).unwrap().is_empty());
    }

    #[tokio::test]
    async fn decrypt_without_passphrase_is_fatal() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        fs::create_dir_all(&layout.encrypted_dir).unwrap();
        fs::write(layout.encrypted_dir.join("secrets.csv.gpg"), "x").unwrap();

        let err = decrypt(&layout, None).await.unwrap_err();
        assert!(matches!(err, CompendiumError::MissingPassphrase));
    }

    #[tokio::test]
    async fn decrypt_with_nothing_encrypted_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        decrypt(&layout, None).await.unwrap();
    }

    #[tokio::test]
    async fn encrypt_refuses_files_outside_the_private_root() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        fs::create_dir_all(&layout.raw_dir).unwrap();
        fs::write(layout.raw_dir.join("public.csv"), "x").unwrap();

        let err = encrypt(&layout, "hunter2", &[PathBuf::from("data/raw/public.csv")])
            .await
            .unwrap_err();
        assert!(matches!(err, CompendiumError::Encrypt(_)));
    }

    #[tokio::test]
    async fn encrypt_refuses_nested_private_files() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        fs::create_dir_all(layout.private_dir.join("nested")).unwrap();
        fs::write(layout.private_dir.join("nested/deep.csv"), "x").unwrap();

        let err = encrypt(
            &layout,
            "hunter2",
            &[PathBuf::from("data/raw-private/nested/deep.csv")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CompendiumError::Encrypt(_)));
    }
}
