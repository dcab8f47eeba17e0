//! Knowledge extraction: turns an uploaded document into a single text blob.
//!
//! Supports plain text and PDF. The declared content type decides the
//! format; the file extension is only consulted when the client sent no
//! useful content type (missing or `application/octet-stream`).

/// Errors from document extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Formato no soportado: {0}")]
    UnsupportedFormat(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
}

impl DocumentKind {
    /// Detect the document kind from the declared content type and file name.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Result<Self, ExtractError> {
        let mime = content_type
            .map(|ct| {
                ct.split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase()
            })
            .filter(|ct| !ct.is_empty());

        match mime.as_deref() {
            Some("application/pdf") => Ok(DocumentKind::Pdf),
            Some("text/plain") => Ok(DocumentKind::PlainText),
            None | Some("application/octet-stream") => {
                let name = file_name.unwrap_or_default().to_ascii_lowercase();
                if name.ends_with(".pdf") {
                    Ok(DocumentKind::Pdf)
                } else if name.ends_with(".txt") {
                    Ok(DocumentKind::PlainText)
                } else {
                    Err(ExtractError::UnsupportedFormat(
                        file_name.unwrap_or("unknown").to_string(),
                    ))
                }
            }
            Some(other) => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Extract the text content of an uploaded document.
pub fn extract_knowledge(
    bytes: &[u8],
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<String, ExtractError> {
    let kind = DocumentKind::detect(content_type, file_name)?;

    let text = match kind {
        DocumentKind::PlainText => decode_text(bytes),
        DocumentKind::Pdf => extract_pdf(bytes)?,
    };

    if text.trim().is_empty() {
        tracing::warn!(kind = ?kind, size = bytes.len(), "Document produced no text");
    } else {
        tracing::debug!(kind = ?kind, size = bytes.len(), chars = text.chars().count(), "Document extracted");
    }

    Ok(text)
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        tracing::warn!("PDF extraction failed: {e}");
        ExtractError::Pdf(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_returned_verbatim() {
        let text = extract_knowledge(
            "La tienda abre a las 9am.".as_bytes(),
            Some("text/plain"),
            Some("horario.txt"),
        )
        .unwrap();
        assert_eq!(text, "La tienda abre a las 9am.");
    }

    #[test]
    fn test_plain_text_with_charset_parameter() {
        let text =
            extract_knowledge(b"hola", Some("text/plain; charset=utf-8"), None).unwrap();
        assert_eq!(text, "hola");
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let text = extract_knowledge(&[0x68, 0x6f, 0xff, 0x6c, 0x61], Some("text/plain"), None)
            .unwrap();
        assert!(text.starts_with("ho"));
        assert!(text.ends_with("la"));
        assert!(text.contains('\u{fffd}'));
    }

    #[test]
    fn test_unsupported_content_type() {
        let err = extract_knowledge(b"{}", Some("application/json"), Some("data.json")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(ref ct) if ct == "application/json"));
        assert!(err.to_string().starts_with("Formato no soportado"));
    }

    #[test]
    fn test_declared_type_wins_over_extension() {
        let err = DocumentKind::detect(Some("image/png"), Some("notes.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_octet_stream_falls_back_to_extension() {
        assert_eq!(
            DocumentKind::detect(Some("application/octet-stream"), Some("Manual.PDF")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::detect(None, Some("faq.txt")).unwrap(),
            DocumentKind::PlainText
        );
    }

    #[test]
    fn test_no_type_and_unknown_extension() {
        let err = DocumentKind::detect(None, Some("archive.zip")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(ref n) if n == "archive.zip"));
        assert!(DocumentKind::detect(None, None).is_err());
    }

    #[test]
    fn test_content_type_is_case_insensitive() {
        assert_eq!(
            DocumentKind::detect(Some("Application/PDF"), None).unwrap(),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn test_garbage_pdf_is_pdf_error() {
        let err = extract_knowledge(b"definitely not a pdf", Some("application/pdf"), None)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn test_empty_text_document_is_accepted() {
        let text = extract_knowledge(b"", Some("text/plain"), None).unwrap();
        assert!(text.is_empty());
    }
}
