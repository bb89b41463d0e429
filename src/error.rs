use std::fmt;

use crate::util::{CommandError, FileError};

#[derive(Debug)]
pub enum CompendiumError {
    /// A pipeline-authoring mistake in a script header, e.g. PIPE with
    /// multiple inputs or outputs. Aborts the discovery pass.
    Pipeline(String),
    /// A file was explicitly named for encryption but is not located
    /// directly inside the private-raw root.
    Encrypt(String),
    /// Decryption was requested without a passphrase.
    MissingPassphrase,
    Io(std::io::Error),
    File(FileError),
    Command(CommandError),
    Parse(String),
}

impl fmt::Display for CompendiumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompendiumError::Pipeline(msg) => write!(f, "Pipeline error: {}", msg),
            CompendiumError::Encrypt(msg) => write!(f, "Encrypt error: {}", msg),
            CompendiumError::MissingPassphrase => write!(
                f,
                "Cannot decrypt files as no passphrase is given. \
                 Use `compendium decrypt \"Your passphrase\"` to specify"
            ),
            CompendiumError::Io(err) => write!(f, "IO error: {}", err),
            CompendiumError::File(err) => write!(f, "File error: {}", err),
            CompendiumError::Command(err) => write!(f, "Command error: {}", err),
            CompendiumError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for CompendiumError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompendiumError::Io(err) => Some(err),
            CompendiumError::File(err) => Some(err),
            CompendiumError::Command(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CompendiumError {
    fn from(err: std::io::Error) -> Self {
        CompendiumError::Io(err)
    }
}

impl From<FileError> for CompendiumError {
    fn from(err: FileError) -> Self {
        CompendiumError::File(err)
    }
}

impl From<CommandError> for CompendiumError {
    fn from(err: CommandError) -> Self {
        CompendiumError::Command(err)
    }
}

impl From<toml::de::Error> for CompendiumError {
    fn from(err: toml::de::Error) -> Self {
        CompendiumError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for CompendiumError {
    fn from(err: serde_json::Error) -> Self {
        CompendiumError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CompendiumError>;
