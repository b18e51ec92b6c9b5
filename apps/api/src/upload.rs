//! Turns an uploaded resume file into plain text for the resume parser.

use tracing::debug;

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Text,
}

/// Decides how to read an upload. A `%PDF` header, a PDF content type or a
/// `.pdf` file name each mark the upload as PDF.
pub fn detect_kind(content_type: Option<&str>, file_name: Option<&str>, data: &[u8]) -> UploadKind {
    let declared_pdf = content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        || file_name.is_some_and(|n| n.to_ascii_lowercase().ends_with(".pdf"));
    if declared_pdf || data.starts_with(PDF_MAGIC) {
        UploadKind::Pdf
    } else {
        UploadKind::Text
    }
}

pub fn extract_text(
    content_type: Option<&str>,
    file_name: Option<&str>,
    data: &[u8],
) -> Result<String, AppError> {
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let text = match detect_kind(content_type, file_name, data) {
        UploadKind::Pdf => pdf_extract::extract_text_from_mem(data).map_err(|e| {
            AppError::UnprocessableEntity(format!("Could not read text from PDF: {e}"))
        })?,
        UploadKind::Text => String::from_utf8(data.to_vec()).map_err(|_| {
            AppError::UnprocessableEntity(
                "Resume must be a PDF or UTF-8 text file".to_string(),
            )
        })?,
    };

    let text = normalize_whitespace(&text);
    if text.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No text could be extracted from the uploaded resume".to_string(),
        ));
    }
    debug!("Extracted {} characters of resume text", text.len());
    Ok(text)
}

/// Trims each line and collapses runs of blank lines to one.
fn normalize_whitespace(text: &str) -> String {
    let mut out = Vec::new();
    let mut blank = false;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            if !blank && !out.is_empty() {
                out.push("");
            }
            blank = true;
        } else {
            out.push(line.trim_start());
            blank = false;
        }
    }
    while out.last() == Some(&"") {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_pdf_by_magic() {
        assert_eq!(
            detect_kind(Some("text/plain"), Some("cv.txt"), b"%PDF-1.7 ..."),
            UploadKind::Pdf
        );
        assert_eq!(
            detect_kind(Some("application/pdf"), None, b"Jane Doe"),
            UploadKind::Pdf
        );
        assert_eq!(detect_kind(None, Some("cv.md"), b"Jane"), UploadKind::Text);
    }

    #[test]
    fn test_plain_text_upload() {
        let text = extract_text(
            Some("text/plain"),
            Some("resume.txt"),
            b"  Acme - Engineer\n\n\n  - Built APIs  \n\n",
        )
        .unwrap();
        assert_eq!(text, "Acme - Engineer\n\n- Built APIs");
    }

    #[test]
    fn test_empty_upload_rejected() {
        assert!(matches!(
            extract_text(None, None, b""),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            extract_text(None, None, b" \n \n"),
            Err(AppError::UnprocessableEntity(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(matches!(
            extract_text(None, Some("cv.bin"), &[0xff, 0xfe, 0x00]),
            Err(AppError::UnprocessableEntity(_))
        ));
    }
}
