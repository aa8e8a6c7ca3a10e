use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Outcome of a failed assistant invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The interpreter or script could not be launched at all.
    #[error("failed to start assistant process: {message}")]
    Spawn { message: String },

    /// The process ran but exited non-zero or wrote to stderr.
    #[error("assistant process failed (code {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Capability to ask the external assistant a question.
///
/// The HTTP layer only sees this trait, so handlers can be driven by a fake
/// in tests while production shells out to the assistant script.
#[async_trait]
pub trait AssistantInvoker: Send + Sync {
    /// Ask with free text. Returns the trimmed answer.
    async fn ask(&self, text: &str) -> Result<String, ProcessError>;

    /// Ask with an audio file on disk. Returns the trimmed answer.
    async fn ask_with_audio(&self, audio_path: &Path) -> Result<String, ProcessError>;

    /// Human-readable description of the backing program, for health output.
    fn describe(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
