use glob::{GlobError, PatternError, glob};
use std::process::{Output, Stdio};
use std::{
    fmt, fs,
    io::Error as IoError,
    path::{Component, Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command as TokioCommand;
use tracing::warn;

#[derive(Debug)]
pub enum FileError {
    GlobPattern(PatternError),
    GlobExpansion(GlobError),
    Io(IoError),
}

#[derive(Debug)]
pub enum CommandError {
    Io(IoError),
    Timeout,
    Failed { command: String, status: String },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::GlobPattern(e) => write!(f, "Invalid glob pattern: {}", e),
            FileError::GlobExpansion(e) => write!(f, "Failed to expand glob: {}", e),
            FileError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::GlobPattern(e) => Some(e),
            FileError::GlobExpansion(e) => Some(e),
            FileError::Io(e) => Some(e),
        }
    }
}

impl From<PatternError> for FileError {
    fn from(err: PatternError) -> Self {
        FileError::GlobPattern(err)
    }
}

impl From<GlobError> for FileError {
    fn from(err: GlobError) -> Self {
        FileError::GlobExpansion(err)
    }
}

impl From<IoError> for FileError {
    fn from(err: IoError) -> Self {
        FileError::Io(err)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Io(e) => write!(f, "Command execution error: {}", e),
            CommandError::Timeout => write!(f, "Command timed out"),
            CommandError::Failed { command, status } => {
                write!(f, "Command `{}` failed with {}", command, status)
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Io(e) => Some(e),
            CommandError::Timeout | CommandError::Failed { .. } => None,
        }
    }
}

pub fn parse_timeout(timeout_str: Option<&str>) -> Option<Duration> {
    let timeout_to_parse = timeout_str?;

    if timeout_to_parse == "0" || timeout_to_parse.is_empty() {
        return None;
    }

    match timeout_to_parse.parse::<humantime::Duration>() {
        Ok(duration) => Some(duration.into()),
        Err(e) => {
            warn!(
                "Invalid timeout format '{}': {}; use duration format like '5m', '30s', '1h30m'",
                timeout_to_parse, e
            );
            None
        }
    }
}

/// List the regular files directly inside `dir`, sorted, optionally filtered
/// to file names ending in one of `suffixes` (e.g. ".py", ".gpg").
pub fn list_files(dir: &Path, suffixes: Option<&[String]>) -> Result<Vec<PathBuf>, FileError> {
    if !dir.is_dir() {
        warn!("Skipping non-existent path {}", dir.display());
        return Ok(Vec::new());
    }

    let pattern = dir.join("*");
    let entries = glob(&pattern.to_string_lossy())?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        if let Some(suffixes) = suffixes {
            let name = path.file_name().map(|n| n.to_string_lossy().to_string());
            let matches = name
                .map(|n| suffixes.iter().any(|s| n.ends_with(s.as_str())))
                .unwrap_or(false);
            if !matches {
                continue;
            }
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}

/// Join `path` onto `root` when relative and resolve `.`/`..` components
/// lexically. Declared paths may not exist yet, so this never touches the
/// filesystem.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}

/// True when `descendant` lies strictly below `parent`.
pub fn contained_in(parent: &Path, descendant: &Path) -> bool {
    descendant != parent && descendant.starts_with(parent)
}

pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

/// Run `command` through the shell, feeding `input` to stdin when given and
/// capturing stdout/stderr. Kills the child on timeout.
pub async fn run_command(
    command: &str,
    input: Option<Vec<u8>>,
    timeout: Option<Duration>,
) -> Result<Output, CommandError> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = TokioCommand::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = TokioCommand::new("sh");
        c.args(["-c", command]);
        c
    };

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    if input.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    let mut child = cmd.spawn().map_err(CommandError::Io)?;

    let stdin_handle = input.map(|bytes| {
        let mut pipe = child.stdin.take();
        tokio::spawn(async move {
            if let Some(mut pipe) = pipe.take() {
                pipe.write_all(&bytes).await.map_err(CommandError::Io)?;
                pipe.shutdown().await.map_err(CommandError::Io)?;
            }
            Ok::<(), CommandError>(())
        })
    });

    let mut stdout_pipe = child.stdout.take();
    let stdout_handle = tokio::spawn(async move {
        let mut collected: Vec<u8> = Vec::new();
        if let Some(mut pipe) = stdout_pipe.take() {
            pipe.read_to_end(&mut collected)
                .await
                .map_err(CommandError::Io)?;
        }
        Ok::<Vec<u8>, CommandError>(collected)
    });

    let mut stderr_pipe = child.stderr.take();
    let stderr_handle = tokio::spawn(async move {
        let mut collected: Vec<u8> = Vec::new();
        if let Some(mut pipe) = stderr_pipe.take() {
            pipe.read_to_end(&mut collected)
                .await
                .map_err(CommandError::Io)?;
        }
        Ok::<Vec<u8>, CommandError>(collected)
    });

    let status = match timeout {
        Some(duration) => {
            tokio::select! {
                result = child.wait() => result.map_err(CommandError::Io)?,
                _ = tokio::time::sleep(duration) => {
                    if let Err(kill_err) = child.kill().await {
                        warn!("Failed to kill timed-out process: {}", kill_err);
                    }
                    let _ = child.wait().await;
                    return Err(CommandError::Timeout);
                }
            }
        }
        None => child.wait().await.map_err(CommandError::Io)?,
    };

    if let Some(handle) = stdin_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(CommandError::Io(IoError::other(e))),
        }
    }

    let stdout = match stdout_handle.await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return Err(e),
        Err(e) => return Err(CommandError::Io(IoError::other(e))),
    };

    let stderr = match stderr_handle.await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return Err(e),
        Err(e) => return Err(CommandError::Io(IoError::other(e))),
    };

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Like [`run_command`], but treats a non-zero exit as an error.
pub async fn run_checked(
    command: &str,
    input: Option<Vec<u8>>,
    timeout: Option<Duration>,
) -> Result<Output, CommandError> {
    let output = run_command(command, input, timeout).await?;
    if !output.status.success() {
        return Err(CommandError::Failed {
            command: command.to_string(),
            status: output.status.to_string(),
        });
    }
    Ok(output)
}
