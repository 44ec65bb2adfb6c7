use std::path::Path;

const FALLBACK: &str = "application/octet-stream";

/// Content type sent with an upload, derived from the file extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" | "text" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "rtf" => "application/rtf",
        "json" | "ipynb" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "toml" | "ini" | "cfg" | "conf" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "tex" | "latex" => "application/x-tex",
        "vtt" => "text/vtt",
        "srt" => "application/x-subrip",
        "py" => "text/x-python",
        "js" | "jsx" => "text/javascript",
        "ts" | "tsx" => "application/typescript",
        "java" => "text/x-java",
        "c" | "h" => "text/x-c",
        "cpp" | "hpp" | "cc" => "text/x-c++",
        "cs" => "text/x-csharp",
        "go" => "text/x-go",
        "rs" => "text/x-rust",
        "rb" => "text/x-ruby",
        "php" => "application/x-php",
        "swift" => "text/x-swift",
        "kt" => "text/x-kotlin",
        "scala" => "text/x-scala",
        "sql" => "application/sql",
        "sh" | "bash" | "zsh" => "application/x-sh",
        "ps1" | "bat" | "cmd" | "r" | "m" | "mm" => "text/plain",
        _ => FALLBACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types() {
        assert_eq!(mime_type_for(Path::new("a.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("notes.md")), "text/markdown");
        assert_eq!(mime_type_for(Path::new("x/y/data.csv")), "text/csv");
    }

    #[test]
    fn unknown_falls_back() {
        assert_eq!(mime_type_for(Path::new("blob.bin")), FALLBACK);
        assert_eq!(mime_type_for(Path::new("Makefile")), FALLBACK);
    }
}
