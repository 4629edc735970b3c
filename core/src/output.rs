#![deny(missing_docs)]

//! # Serialization & Publishing
//!
//! Renders the finished document to JSON and writes it to its destination.
//! File output goes through a named temp file in the destination directory
//! followed by an atomic persist, so a failed write never leaves a partial
//! document visible at the target path.

use crate::error::{AppError, AppResult};
use crate::oas::OpenApiDocument;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Where the rendered document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Standard output.
    Stdout,
    /// A file path, truncated/created as needed.
    File(PathBuf),
}

impl OutputTarget {
    /// Maps the CLI convention: `-` is stdout, anything else a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(PathBuf::from(arg))
        }
    }
}

/// Renders the document as pretty-printed JSON with a trailing newline.
pub fn render_document(document: &OpenApiDocument) -> AppResult<String> {
    let mut text = serde_json::to_string_pretty(document)?;
    text.push('\n');
    Ok(text)
}

/// Renders and publishes the document. Write failures — stdout included —
/// are surfaced, never swallowed.
pub fn write_document(document: &OpenApiDocument, target: &OutputTarget) -> AppResult<()> {
    let text = render_document(document)?;
    match target {
        OutputTarget::Stdout => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(text.as_bytes())?;
            handle.flush()?;
            Ok(())
        }
        OutputTarget::File(path) => publish_file(path, text.as_bytes()),
    }
}

/// Write-then-publish: the content lands in a temp file next to the target
/// and is renamed into place only once fully flushed.
fn publish_file(path: &Path, content: &[u8]) -> AppResult<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(directory)?;
    staged.write_all(content)?;
    staged.flush()?;
    staged.persist(path).map_err(|error| AppError::Io(error.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oas::Info;
    use pretty_assertions::assert_eq;

    fn document() -> OpenApiDocument {
        OpenApiDocument::new(Info {
            title: "Test API".into(),
            version: "1.0.0".into(),
            ..Info::default()
        })
    }

    #[test]
    fn test_render_is_pretty_json_with_trailing_newline() {
        let text = render_document(&document()).unwrap();
        assert!(text.starts_with("{\n"));
        assert!(text.ends_with("}\n"));
        assert!(text.contains(r#""openapi": "3.0.0""#));
    }

    #[test]
    fn test_file_target_publishes_complete_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openapi.json");
        write_document(&document(), &OutputTarget::File(path.clone())).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_document(&document()).unwrap());
    }

    #[test]
    fn test_file_target_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openapi.json");
        std::fs::write(&path, "stale contents that are longer than the document\n".repeat(64))
            .unwrap();

        write_document(&document(), &OutputTarget::File(path.clone())).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_document(&document()).unwrap());
    }

    #[test]
    fn test_from_arg() {
        assert_eq!(OutputTarget::from_arg("-"), OutputTarget::Stdout);
        assert_eq!(
            OutputTarget::from_arg("out/openapi.json"),
            OutputTarget::File(PathBuf::from("out/openapi.json"))
        );
    }
}
