//! Limits and defaults imposed by the remote file-search service.

/// Default tokens per chunk when the caller does not customize chunking.
pub const DEFAULT_MAX_TOKENS_PER_CHUNK: u32 = 512;

/// Default overlap between consecutive chunks.
pub const DEFAULT_MAX_OVERLAP_TOKENS: u32 = 128;

/// Upper bound accepted by the service for `max_tokens_per_chunk`.
pub const MAX_TOKENS_PER_CHUNK_LIMIT: u32 = 512;

/// Maximum custom metadata entries per document.
pub const MAX_METADATA_ENTRIES: usize = 20;

/// Default per-file upload limit in MiB.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;

/// Maximum number of stores per project.
pub const MAX_STORES_PER_PROJECT: usize = 10;

/// File extensions the service can index (lowercase, with leading dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Documents
    ".pdf", ".docx", ".doc", ".txt", ".rtf", ".md", ".html", ".htm", ".odt", ".odp", ".ods",
    // Spreadsheets
    ".csv", ".xlsx", ".xls", ".tsv",
    // Presentations
    ".pptx",
    // Code
    ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".c", ".cpp", ".h", ".hpp", ".cs", ".go",
    ".rs", ".rb", ".php", ".swift", ".kt", ".scala", ".r", ".m", ".mm", ".sql", ".sh", ".bash",
    ".zsh", ".ps1", ".bat", ".cmd", ".yaml", ".yml", ".toml", ".ini", ".cfg", ".conf",
    // Data
    ".json", ".xml",
    // Other
    ".tex", ".latex", ".ipynb", ".vtt", ".srt",
];

/// Returns `true` if `extension` (with leading dot, any case) is indexable.
pub fn is_supported_extension(extension: &str) -> bool {
    let lower = extension.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&lower.as_str())
}

/// Substrings (lowercase) of remote error messages that indicate a
/// transient condition worth retrying.
pub const RETRYABLE_ERROR_PATTERNS: &[&str] = &[
    TERMINATED_UPLOAD_PATTERN,
    "503",
    "service unavailable",
    "timeout",
    "deadline exceeded",
    "internal error",
    "temporarily unavailable",
];

/// Reported when a resumable upload session was closed by the service.
/// The only failure worth retrying once an import operation has started.
pub const TERMINATED_UPLOAD_PATTERN: &str = "already been terminated";

/// Returns `true` if `message` reports a terminated upload session.
pub fn is_terminated_upload_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains(TERMINATED_UPLOAD_PATTERN)
}

/// Returns `true` if `message` matches a retryable error pattern.
pub fn is_retryable_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    RETRYABLE_ERROR_PATTERNS.iter().any(|p| lower.contains(p))
}
