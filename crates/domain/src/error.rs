/// Shared error type used across all Herald crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("tool: {0}")]
    Tool(String),

    #[error("plan: {0}")]
    Plan(String),

    #[error("channel: {0}")]
    Channel(String),

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
