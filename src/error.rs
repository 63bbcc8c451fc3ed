use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{topology} workflow needs at least {min} tasks, got {got}")]
    TooFewTasks {
        topology: &'static str,
        min: usize,
        got: usize,
    },

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("Output directory '{0}' does not exist")]
    MissingOutputDir(String),

    #[error("No run completion marker found under {0}")]
    MissingRunMarker(String),

    #[error("Subprocess error: {0}")]
    Subprocess(String),

    #[error("Executor not available: {0}")]
    ExecutorNotAvailable(String),

    #[error("Recipe probe failed for {recipe}: {reason}")]
    RecipeProbe { recipe: String, reason: String },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, Error>;
