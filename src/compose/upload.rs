//! Local file handling for attachment uploads

use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;

use crate::models::NewAttachment;

/// Read a local file and build the attachment create payload for it.
pub async fn encode_file(path: &Path, order_id: i64) -> Result<NewAttachment> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());

    Ok(NewAttachment {
        mimetype: guess_mimetype(path).to_string(),
        payload_b64: base64::engine::general_purpose::STANDARD.encode(&bytes),
        name,
        order_id,
    })
}

/// Mimetype from the file extension. Unknown extensions upload as a plain
/// binary blob.
pub fn guess_mimetype(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_guess_mimetype() {
        assert_eq!(
            guess_mimetype(Path::new("receipt.PDF")),
            "application/pdf"
        );
        assert_eq!(guess_mimetype(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(
            guess_mimetype(Path::new("mystery.bin")),
            "application/octet-stream"
        );
        assert_eq!(
            guess_mimetype(Path::new("no_extension")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_encode_file_reads_and_encodes() {
        let dir = std::env::temp_dir();
        let path = dir.join("receipt_cli_upload_test.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let attachment = encode_file(&path, 7).await.unwrap();
        assert_eq!(attachment.name, "receipt_cli_upload_test.txt");
        assert_eq!(attachment.mimetype, "text/plain");
        assert_eq!(attachment.payload_b64, "aGVsbG8=");
        assert_eq!(attachment.order_id, 7);

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_encode_file_missing_path_errors() {
        let path = PathBuf::from("/nonexistent/receipt_cli_missing.txt");
        assert!(encode_file(&path, 1).await.is_err());
    }
}
