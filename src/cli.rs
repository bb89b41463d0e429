use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::document::DocKind;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project configuration file; its directory is the project root
    #[arg(short = 'f', long = "file", default_value = "compendium.toml")]
    pub file: String,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Encrypt private files
    Encrypt {
        /// Passphrase for encryption
        passphrase: String,
        /// Files to encrypt (if blank, encrypt all private files)
        files: Vec<PathBuf>,
    },

    /// Decrypt private files into the private-raw directory
    Decrypt {
        /// Passphrase for decryption
        passphrase: Option<String>,
    },

    /// Generate documentation
    Document {
        /// Which documentation to generate
        #[arg(value_enum)]
        what: DocKind,

        /// Output file name
        #[arg(short = 'f', long = "filename")]
        filename: Option<String>,

        /// Overwrite files
        #[arg(short = 'o', long = "overwrite")]
        overwrite: bool,
    },

    /// Check consistency of the dependency graph
    Check,

    /// Export the task model as JSON for the execution engine
    Export {
        /// Passphrase used to build the decrypt commands
        #[arg(short = 'p', long = "passphrase")]
        passphrase: Option<String>,

        /// Write to a file instead of stdout
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}
