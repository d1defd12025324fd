use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Cyclic task dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Task '{task}' failed: {cause}")]
    ActionFailure { task: String, cause: String },

    #[error("Tool not found in PATH: {0}")]
    ToolNotFound(String),

    #[error("{program} exited with status {code}")]
    ToolExit { program: String, code: i32 },

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
