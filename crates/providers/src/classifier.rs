//! Maps provider errors and diagnostic strings onto stable error
//! codes.
//!
//! The codes end up in the `llm.error` context field and in
//! user-facing fallback selection, so they must stay stable across
//! provider swaps. An embedded `[code]` anywhere in the error chain
//! always wins, which lets adapters thread custom codes through
//! without growing the taxonomy.

use crate::error::LlmError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Codes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod codes {
    pub const RATE_LIMIT: &str = "rate_limit";
    pub const AUTHENTICATION: &str = "authentication";
    pub const TIMEOUT: &str = "timeout";
    pub const INTERNAL_SERVER: &str = "internal_server";
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const HTTP_ERROR: &str = "http_error";
    pub const CONTENT_FILTERED: &str = "content_filtered";
    pub const MODEL_NOT_FOUND: &str = "model_not_found";
    pub const UNSUPPORTED_FEATURE: &str = "unsupported_feature";
    pub const UNRESOLVED_MODEL_SERVER: &str = "unresolved_model_server";
    pub const RETRIABLE: &str = "retriable";
    pub const NON_RETRIABLE: &str = "non_retriable";
    pub const REQUEST_ABORTED: &str = "request_aborted";
    pub const REQUEST_TIMEOUT: &str = "request_timeout";
    pub const LLM_ERROR: &str = "llm_error";
    pub const UNKNOWN: &str = "unknown";
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Classify a provider error into a stable code.
///
/// Precedence: embedded `[code]` anywhere in the cause chain, then
/// HTTP status mapping, then the error kind itself.
pub fn classify_error(err: &LlmError) -> String {
    if let Some(code) = embedded_code_in_chain(err) {
        return code;
    }

    let code = match err {
        LlmError::Http { status, .. } => match status {
            429 => codes::RATE_LIMIT,
            401 | 403 => codes::AUTHENTICATION,
            408 | 504 => codes::TIMEOUT,
            500..=599 => codes::INTERNAL_SERVER,
            400..=499 => codes::INVALID_REQUEST,
            _ => codes::HTTP_ERROR,
        },
        LlmError::RateLimited(_) => codes::RATE_LIMIT,
        LlmError::Authentication(_) => codes::AUTHENTICATION,
        LlmError::ContentFiltered(_) => codes::CONTENT_FILTERED,
        LlmError::InternalServer(_) => codes::INTERNAL_SERVER,
        LlmError::InvalidRequest(_) => codes::INVALID_REQUEST,
        LlmError::ModelNotFound(_) => codes::MODEL_NOT_FOUND,
        LlmError::Unsupported(_) => codes::UNSUPPORTED_FEATURE,
        LlmError::UnresolvedModelServer(_) => codes::UNRESOLVED_MODEL_SERVER,
        LlmError::Timeout(_) => codes::TIMEOUT,
        LlmError::Retriable(_) => codes::RETRIABLE,
        LlmError::NonRetriable(_) => codes::NON_RETRIABLE,
        LlmError::Aborted(_) => codes::REQUEST_ABORTED,
        LlmError::Transport(msg) => {
            if mentions_timeout(msg) {
                codes::REQUEST_TIMEOUT
            } else if mentions_abort(msg) {
                codes::REQUEST_ABORTED
            } else {
                codes::UNKNOWN
            }
        }
        LlmError::Other(_) => codes::LLM_ERROR,
    };
    code.to_string()
}

/// Classify a bare diagnostic string. Blank or missing input maps to
/// `unknown`; a leading `[code]` wins; otherwise a handful of
/// well-known substrings are recognized.
pub fn classify_diagnostic(diagnostic: Option<&str>) -> String {
    let Some(s) = diagnostic else {
        return codes::UNKNOWN.to_string();
    };
    let s = s.trim();
    if s.is_empty() {
        return codes::UNKNOWN.to_string();
    }
    if let Some(code) = extract_code(s) {
        return code;
    }

    let lower = s.to_lowercase();
    let code = if lower.contains("rate limit") || lower.contains("429") {
        codes::RATE_LIMIT
    } else if lower.contains("unauthorized") || lower.contains("forbidden") {
        codes::AUTHENTICATION
    } else if mentions_abort(&lower) {
        codes::REQUEST_ABORTED
    } else if mentions_timeout(&lower) {
        codes::REQUEST_TIMEOUT
    } else {
        codes::UNKNOWN
    };
    code.to_string()
}

// ── Embedded-code helpers ──────────────────────────────────────────

/// Extract an embedded code from a `"[code] message"` string. Returns
/// `None` when the string is not bracketed or the brackets are
/// malformed/empty.
pub fn extract_code(s: &str) -> Option<String> {
    let rest = s.strip_prefix('[')?;
    let end = rest.find(']')?;
    if end == 0 {
        return None;
    }
    Some(rest[..end].to_string())
}

/// Prefix `message` with `[code]`, leaving it untouched when it
/// already starts with that code. Idempotent.
pub fn with_code(code: &str, message: &str) -> String {
    let tag = format!("[{code}]");
    if message.is_empty() {
        return tag;
    }
    if message.starts_with(&tag) {
        return message.to_string();
    }
    format!("{tag} {message}")
}

/// Walk the error chain looking for an embedded `[code]`.
fn embedded_code_in_chain(err: &LlmError) -> Option<String> {
    let mut current: Option<&(dyn std::error::Error)> = Some(err);
    while let Some(e) = current {
        // Variant messages may carry the code mid-string behind the
        // kind prefix; scan from the first bracket.
        let text = e.to_string();
        if let Some(start) = text.find('[') {
            if let Some(code) = extract_code(&text[start..]) {
                return Some(code);
            }
        }
        current = e.source();
    }
    None
}

fn mentions_timeout(s: &str) -> bool {
    let lower = s.to_lowercase();
    lower.contains("timeout") || lower.contains("timed out")
}

fn mentions_abort(s: &str) -> bool {
    let lower = s.to_lowercase();
    lower.contains("cancel") || lower.contains("interrupt") || lower.contains("abort")
}
