//! Loading documents of multiple formats from a flat directory.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{error, info, warn};

use crate::types::RagError;

/// A document extracted to plain text, identified by its source file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDocument {
    /// The file's base name including extension, e.g. `notes.txt`.
    pub id: String,
    pub text: String,
}

/// Reads one file format into plain text.
#[async_trait]
pub trait DocumentHandler: Send + Sync {
    async fn read_document(&self, path: &Path) -> Result<String, RagError>;
}

/// Plain-text files, read as UTF-8.
pub struct TxtDocumentHandler;

#[async_trait]
impl DocumentHandler for TxtDocumentHandler {
    async fn read_document(&self, path: &Path) -> Result<String, RagError> {
        tokio::fs::read_to_string(path).await.map_err(|err| {
            RagError::Document(format!("failed to read {}: {err}", path.display()))
        })
    }
}

/// PDF files; page texts are joined with single spaces.
pub struct PdfDocumentHandler;

#[async_trait]
impl DocumentHandler for PdfDocumentHandler {
    async fn read_document(&self, path: &Path) -> Result<String, RagError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let pages = pdf_extract::extract_text_by_pages(&path).map_err(|err| {
                RagError::Document(format!("failed to parse {}: {err}", path.display()))
            })?;
            Ok(pages.join(" "))
        })
        .await
        .map_err(|err| RagError::Document(err.to_string()))?
    }
}

/// Word documents; paragraph texts are joined with single spaces.
pub struct DocxDocumentHandler;

#[async_trait]
impl DocumentHandler for DocxDocumentHandler {
    async fn read_document(&self, path: &Path) -> Result<String, RagError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_docx_text(&path))
            .await
            .map_err(|err| RagError::Document(err.to_string()))?
    }
}

/// Pulls the `w:t` runs out of `word/document.xml`, one entry per `w:p`.
fn extract_docx_text(path: &Path) -> Result<String, RagError> {
    let document_error =
        |err: &dyn std::fmt::Display| RagError::Document(format!("{}: {err}", path.display()));

    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| document_error(&err))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| document_error(&err))?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                if element.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    if !current.is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
                _ => {}
            },
            Ok(Event::Text(text)) if in_text_run => {
                let unescaped = text.unescape().map_err(|err| document_error(&err))?;
                current.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(document_error(&err)),
            _ => {}
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs.join(" "))
}

/// Scans one flat directory and extracts every supported file.
///
/// Handlers are keyed by lowercase extension; unknown extensions are skipped
/// with a warning, and a file that fails to read or parse is skipped with an
/// error so one bad file cannot abort the scan. A missing or unreadable
/// directory is still a hard error.
pub struct DocumentLoader {
    directory: PathBuf,
    handlers: HashMap<String, Arc<dyn DocumentHandler>>,
}

impl DocumentLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let mut handlers: HashMap<String, Arc<dyn DocumentHandler>> = HashMap::new();
        handlers.insert("txt".to_string(), Arc::new(TxtDocumentHandler));
        handlers.insert("pdf".to_string(), Arc::new(PdfDocumentHandler));
        handlers.insert("docx".to_string(), Arc::new(DocxDocumentHandler));
        Self {
            directory: directory.into(),
            handlers,
        }
    }

    /// Registers or replaces the handler for an extension.
    #[must_use]
    pub fn with_handler(
        mut self,
        extension: impl Into<String>,
        handler: Arc<dyn DocumentHandler>,
    ) -> Self {
        self.handlers
            .insert(extension.into().to_ascii_lowercase(), handler);
        self
    }

    /// Reads every supported file in the directory, in file-name order.
    pub async fn load_documents(&self) -> Result<Vec<RawDocument>, RagError> {
        let mut entries = tokio::fs::read_dir(&self.directory).await.map_err(|err| {
            RagError::Io(format!(
                "failed to read directory {}: {err}",
                self.directory.display()
            ))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| RagError::Io(err.to_string()))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|err| RagError::Io(err.to_string()))?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut documents = Vec::new();
        for path in files {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                warn!(path = %path.display(), "skipping file with non-UTF-8 name");
                continue;
            };
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase);
            let Some(handler) = extension
                .as_deref()
                .and_then(|ext| self.handlers.get(ext))
            else {
                warn!(file = %name, "unsupported file extension, skipping");
                continue;
            };

            match handler.read_document(&path).await {
                Ok(text) => documents.push(RawDocument {
                    id: name.to_string(),
                    text,
                }),
                Err(err) => error!(file = %name, %err, "failed to read document, skipping"),
            }
        }

        info!(
            count = documents.len(),
            directory = %self.directory.display(),
            "loaded documents"
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(bytes).unwrap();
    }

    /// A minimal docx: a zip archive with a `word/document.xml` entry.
    fn write_docx(dir: &Path, name: &str, paragraphs: &[&str]) {
        let body: String = paragraphs
            .iter()
            .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );

        let file = std::fs::File::create(dir.join(name)).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn loads_txt_files_with_file_name_ids() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.txt", b"second document");
        write_file(dir.path(), "a.txt", b"first document");

        let documents = DocumentLoader::new(dir.path()).load_documents().await.unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].id, "a.txt");
        assert_eq!(documents[0].text, "first document");
        assert_eq!(documents[1].id, "b.txt");
    }

    #[tokio::test]
    async fn unsupported_extensions_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.txt", b"kept");
        write_file(dir.path(), "b.dat", b"skipped");
        write_file(dir.path(), "noextension", b"skipped");

        let documents = DocumentLoader::new(dir.path()).load_documents().await.unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "a.txt");
    }

    #[tokio::test]
    async fn corrupt_file_does_not_abort_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "bad.docx", b"this is not a zip archive");
        write_file(dir.path(), "good.txt", b"still loaded");

        let documents = DocumentLoader::new(dir.path()).load_documents().await.unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "good.txt");
    }

    #[tokio::test]
    async fn missing_directory_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = DocumentLoader::new(&missing).load_documents().await.unwrap_err();
        assert!(matches!(err, RagError::Io(_)));
    }

    #[tokio::test]
    async fn docx_paragraphs_are_joined_with_single_spaces() {
        let dir = tempfile::tempdir().unwrap();
        write_docx(dir.path(), "doc.docx", &["First paragraph.", "Second paragraph."]);

        let documents = DocumentLoader::new(dir.path()).load_documents().await.unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "doc.docx");
        assert_eq!(documents[0].text, "First paragraph. Second paragraph.");
    }

    #[tokio::test]
    async fn custom_handlers_can_be_registered() {
        struct UpperHandler;

        #[async_trait]
        impl DocumentHandler for UpperHandler {
            async fn read_document(&self, path: &Path) -> Result<String, RagError> {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|err| RagError::Document(err.to_string()))?;
                Ok(text.to_uppercase())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.note", b"quiet");

        let loader = DocumentLoader::new(dir.path()).with_handler("note", Arc::new(UpperHandler));
        let documents = loader.load_documents().await.unwrap();

        assert_eq!(documents[0].text, "QUIET");
    }

    #[tokio::test]
    async fn extension_matching_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.TXT", b"upper case extension");

        let documents = DocumentLoader::new(dir.path()).load_documents().await.unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "a.TXT");
    }
}
