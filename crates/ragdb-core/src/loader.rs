use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::traits::DocumentSource;
use crate::types::Document;

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// A file the loader skipped, with the reason.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub failures: Vec<LoadFailure>,
}

/// Plain-text and markdown files from a file path or a directory tree.
#[derive(Debug, Clone, Default)]
pub struct FsDocumentSource;

impl FsDocumentSource {
    pub fn new() -> Self { Self }

    fn load_file(&self, path: &Path) -> Result<Document> {
        let format = extension_of(path)
            .filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        let file_size = bytes.len() as u64;
        let content = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Ok(Document::new(content, path.to_string_lossy())
            .with_metadata("format", Value::String(format))
            .with_metadata("file_size", Value::from(file_size)))
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }
}

impl DocumentSource for FsDocumentSource {
    /// A single file must have a supported extension. Directories are walked
    /// recursively; files with another extension or that cannot be read are
    /// reported in [`LoadReport::failures`] instead of aborting.
    fn load(&self, path: &Path) -> Result<LoadReport> {
        if path.is_file() {
            let document = self.load_file(path)?;
            return Ok(LoadReport { documents: vec![document], failures: vec![] });
        }
        if !path.is_dir() {
            return Err(Error::NotFound(path.display().to_string()));
        }

        let mut report = LoadReport::default();
        for file in self.list_files(path) {
            match self.load_file(&file) {
                Ok(doc) => report.documents.push(doc),
                Err(error) => {
                    warn!(path = %file.display(), %error, "skipping document");
                    report.failures.push(LoadFailure { path: file, error });
                }
            }
        }
        info!(root = %path.display(), loaded = report.documents.len(), skipped = report.failures.len(), "loaded documents");
        Ok(report)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase)
}
