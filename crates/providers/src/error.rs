/// Provider-facing error taxonomy.
///
/// Adapters translate wire-level failures into these kinds; the
/// classifier maps them onto stable string codes for the `llm.error`
/// context field.
#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("authentication: {0}")]
    Authentication(String),

    #[error("content filtered: {0}")]
    ContentFiltered(String),

    #[error("internal server error: {0}")]
    InternalServer(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("unsupported feature: {0}")]
    Unsupported(String),

    #[error("unresolved model server: {0}")]
    UnresolvedModelServer(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("retriable: {0}")]
    Retriable(String),

    #[error("non-retriable: {0}")]
    NonRetriable(String),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

pub type LlmResult<T> = std::result::Result<T, LlmError>;
