use std::{collections::HashMap, fs, path::Path};

use regex::Regex;

use crate::error::Result;

/// Declarations parsed from the leading comment block of a script.
///
/// The recognized keys get typed fields; anything else lands in `extra` so
/// unknown declarations survive a round through the parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptHeader {
    pub command: Option<String>,
    pub creates: Option<String>,
    pub depends: Option<String>,
    pub pipe: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
    pub extra: HashMap<String, String>,
}

impl ScriptHeader {
    /// Scan the leading comment block of `text`.
    ///
    /// Blank lines are skipped without ending the scan; the scan stops at the
    /// first non-blank line that is not a comment. A `#!` on the very first
    /// line yields a synthetic COMMAND declaration; every `#KEY:value` line
    /// yields a declaration with both sides trimmed. A repeated key keeps the
    /// last value.
    pub fn parse(text: &str) -> ScriptHeader {
        let key_value = Regex::new(r"^#(\w+?):(.*)").unwrap();

        let mut header = ScriptHeader::default();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if !line.starts_with('#') {
                break;
            }
            if i == 0 && line.starts_with("#!") {
                header.set("COMMAND", line[2..].trim().to_string());
            }
            if let Some(caps) = key_value.captures(line) {
                header.set(caps[1].trim(), caps[2].trim().to_string());
            }
        }
        header
    }

    pub fn from_file(path: &Path) -> Result<ScriptHeader> {
        let contents = fs::read_to_string(path)?;
        Ok(ScriptHeader::parse(&contents))
    }

    fn set(&mut self, key: &str, value: String) {
        match key {
            "COMMAND" => self.command = Some(value),
            "CREATES" => self.creates = Some(value),
            "DEPENDS" => self.depends = Some(value),
            "PIPE" => self.pipe = Some(value),
            "DESCRIPTION" => self.description = Some(value),
            "TITLE" => self.title = Some(value),
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
    }

    /// PIPE is truthy when its value starts with 't' or 'T'.
    pub fn pipe_enabled(&self) -> bool {
        self.pipe
            .as_deref()
            .and_then(|v| v.chars().next())
            .map(|c| c.eq_ignore_ascii_case(&'t'))
            .unwrap_or(false)
    }
}
