use async_trait::async_trait;
use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::assistant::{AssistantInvoker, ProcessError};
use crate::config::AssistantConfig;

#[cfg(windows)]
const FALLBACK_INTERPRETER: &str = "python";
#[cfg(not(windows))]
const FALLBACK_INTERPRETER: &str = "python3";

/// Interpreter locations in preference order: the virtual environment
/// first, then bare command names left to `PATH` lookup.
#[cfg(windows)]
pub fn candidate_interpreters(venv_dir: &Path) -> Vec<PathBuf> {
    vec![
        venv_dir.join("Scripts").join("python.exe"),
        PathBuf::from("python"),
        PathBuf::from("py"),
    ]
}

#[cfg(not(windows))]
pub fn candidate_interpreters(venv_dir: &Path) -> Vec<PathBuf> {
    vec![
        venv_dir.join("bin").join("python3"),
        venv_dir.join("bin").join("python"),
        PathBuf::from("python3"),
        PathBuf::from("python"),
    ]
}

fn is_bare_command(candidate: &Path) -> bool {
    let mut components = candidate.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Pick the first usable candidate. Absolute paths must exist on disk; bare
/// command names are accepted as-is. Anything else is skipped.
pub fn resolve_interpreter(candidates: &[PathBuf]) -> PathBuf {
    candidates
        .iter()
        .find(|candidate| {
            (candidate.is_absolute() && candidate.exists()) || is_bare_command(candidate)
        })
        .cloned()
        .unwrap_or_else(|| PathBuf::from(FALLBACK_INTERPRETER))
}

/// Everything the script produced before it exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ScriptOutput {
    /// Any stderr output counts as failure, even with a zero exit code.
    pub fn into_reply(self) -> Result<String, ProcessError> {
        if self.code == Some(0) && self.stderr.is_empty() {
            Ok(self.stdout.trim().to_string())
        } else {
            Err(ProcessError::Failed {
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

async fn collect_stdout(mut pipe: ChildStdout) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    pipe.read_to_end(&mut buffer).await?;
    Ok(buffer)
}

async fn collect_stderr(mut pipe: ChildStderr) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = pipe.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        warn!(
            "assistant stderr: {}",
            String::from_utf8_lossy(&chunk[..read]).trim_end()
        );
        buffer.extend_from_slice(&chunk[..read]);
    }
    Ok(buffer)
}

/// Spawn `interpreter script args...` and wait for it, buffering both
/// output streams in memory.
pub async fn run_script(
    interpreter: &Path,
    script: &Path,
    args: &[&OsStr],
    working_dir: Option<&Path>,
) -> Result<ScriptOutput, ProcessError> {
    let mut command = Command::new(interpreter);
    command
        .arg(script)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|e| ProcessError::Spawn {
        message: e.to_string(),
    })?;
    debug!(pid = ?child.id(), "spawned assistant process");

    let stdout = child.stdout.take().ok_or_else(|| ProcessError::Spawn {
        message: "stdout pipe unavailable".to_string(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| ProcessError::Spawn {
        message: "stderr pipe unavailable".to_string(),
    })?;

    let (stdout, stderr, status) =
        tokio::try_join!(collect_stdout(stdout), collect_stderr(stderr), child.wait()).map_err(
            |e| ProcessError::Failed {
                code: None,
                stderr: format!("error while reading assistant output: {}", e),
            },
        )?;

    debug!(code = ?status.code(), "assistant process exited");

    Ok(ScriptOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        code: status.code(),
    })
}

/// Assistant backed by the Python script, one process per question.
#[derive(Debug, Clone)]
pub struct PythonAssistant {
    interpreter: PathBuf,
    script_path: PathBuf,
    working_dir: Option<PathBuf>,
}

impl PythonAssistant {
    pub fn new(interpreter: PathBuf, script_path: PathBuf) -> Self {
        let working_dir = script_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);
        Self {
            interpreter,
            script_path,
            working_dir,
        }
    }

    /// Resolve the interpreter once, up front. A virtual environment created
    /// later is only picked up after a restart.
    pub fn from_config(config: &AssistantConfig) -> io::Result<Self> {
        let base_dir = std::env::current_dir()?;
        let script_path = base_dir.join(&config.script_path);

        let interpreter = match &config.interpreter {
            Some(explicit) => PathBuf::from(explicit),
            None => resolve_interpreter(&candidate_interpreters(&base_dir.join(&config.venv_dir))),
        };

        info!(
            "Using interpreter {} for assistant script {}",
            interpreter.display(),
            script_path.display()
        );

        Ok(Self::new(interpreter, script_path))
    }

    async fn run(&self, args: &[&OsStr]) -> Result<String, ProcessError> {
        run_script(
            &self.interpreter,
            &self.script_path,
            args,
            self.working_dir.as_deref(),
        )
        .await?
        .into_reply()
    }
}

#[async_trait]
impl AssistantInvoker for PythonAssistant {
    async fn ask(&self, text: &str) -> Result<String, ProcessError> {
        self.run(&[OsStr::new(text)]).await
    }

    async fn ask_with_audio(&self, audio_path: &Path) -> Result<String, ProcessError> {
        self.run(&[OsStr::new("--audio"), audio_path.as_os_str()]).await
    }

    fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "interpreter": self.interpreter.display().to_string(),
            "script": self.script_path.display().to_string(),
        })
    }
}
