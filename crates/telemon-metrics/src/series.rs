//! Series naming scheme shared by recorders, reports and alert evaluators.

/// `api:{METHOD} {path}`; one series per endpoint, tagged with `status`.
pub const API_PREFIX: &str = "api:";
/// All database query timings, tagged with the (truncated) query text.
pub const DB_QUERY: &str = "db:query";
/// `error:{kind}`; value is always 1.
pub const ERROR_PREFIX: &str = "error:";
/// Memory usage percent, tagged with `used_bytes` / `total_bytes`.
pub const MEMORY: &str = "system:memory";
/// Global CPU usage percent.
pub const CPU: &str = "system:cpu";
/// One-minute load average.
pub const LOAD: &str = "system:load";

pub const TAG_METHOD: &str = "method";
pub const TAG_PATH: &str = "path";
pub const TAG_STATUS: &str = "status";
pub const TAG_QUERY: &str = "query";
pub const TAG_MESSAGE: &str = "message";
pub const TAG_USED_BYTES: &str = "used_bytes";
pub const TAG_TOTAL_BYTES: &str = "total_bytes";

const MAX_TAG_CHARS: usize = 200;

pub fn api_series(method: &str, path: &str) -> String {
    format!("{API_PREFIX}{} {path}", method.to_ascii_uppercase())
}

pub fn error_series(kind: &str) -> String {
    format!("{ERROR_PREFIX}{kind}")
}

/// Endpoint label of an `api:` series, or the name unchanged.
pub fn endpoint_of(series: &str) -> &str {
    series.strip_prefix(API_PREFIX).unwrap_or(series)
}

/// Clip free text stored in tags, on a char boundary.
pub fn clip(text: &str) -> String {
    match text.char_indices().nth(MAX_TAG_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
