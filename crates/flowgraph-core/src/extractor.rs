// File text extraction is a pluggable concern: PDF/DOCX/OCR extraction is
// explicitly out of scope (no such dependency exists in this workspace), so
// only the narrowest case — plain UTF-8 text — is implemented against the
// same trait seam a richer extractor would fill later.

use async_trait::async_trait;

use crate::error::{CoreError, Result};

#[async_trait]
pub trait FileExtractor: Send + Sync {
    /// Extracts a single text block from the raw bytes of one uploaded file.
    async fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<String>;
}

#[derive(Clone, Default)]
pub struct PlainTextFileExtractor;

#[async_trait]
impl FileExtractor for PlainTextFileExtractor {
    async fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|_| CoreError::template(format!("'{file_name}' is not valid UTF-8 text")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_utf8_text() {
        let extractor = PlainTextFileExtractor;
        let text = extractor.extract("notes.txt", b"hello world").await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn rejects_non_utf8_bytes() {
        let extractor = PlainTextFileExtractor;
        let result = extractor.extract("bad.bin", &[0xFF, 0xFE, 0x00]).await;
        assert!(result.is_err());
    }
}
