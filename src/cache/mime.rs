//! MIME type inference based on file extensions.

/// Served for files with no extension or an unrecognized one.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Infers the Content-Type for a file from the suffix after the last `.`,
/// case-insensitively.
pub fn mime_for_path(path: &str) -> &'static str {
    let ext = match path.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => return OCTET_STREAM,
    };

    match ext.to_ascii_lowercase().as_str() {
        "css" => "text/css",
        "docx" => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        "html" => "text/html; charset=UTF-8",
        "ico" => "image/x-icon",
        "jpg" | "jpeg" => "image/jpeg",
        "js" => "application/javascript",
        "md" => "text/markdown",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "webmanifest" => "application/manifest+json",
        "xml" => "text/xml",
        _ => OCTET_STREAM,
    }
}
