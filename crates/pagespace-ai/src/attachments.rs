//! Attachment Validator (C9, spec.md §4.7).
//!
//! Validates the inline `file` parts on a user message: a per-message
//! count cap, a per-part size cap, an explicit MIME allow-list, and a
//! magic-byte cross-check against the declared MIME.

use crate::error::{AiError, AiResult};

/// Maximum file parts allowed on a single message.
pub const MAX_FILE_PARTS: usize = 5;

/// Maximum length of a single part's `data:` URL, in bytes.
pub const MAX_DATA_URL_LEN: usize = 4 * 1024 * 1024;

/// Allowed inline-image MIME types. SVG is explicitly excluded (it is an
/// XML document capable of carrying a script payload, not image bytes).
const ALLOWED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// One file part attached to a user message, as received on the wire.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// The full `data:<mime>;base64,<...>` URL.
    pub data_url: String,
    /// Caller-declared filename, for display only.
    pub filename: String,
}

/// Result of successful attachment validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentValidation {
    /// Always `true`; returned for symmetry with the failure path's
    /// reason string, matching spec.md §4.7's `{valid, filePartCount}`
    /// shape.
    pub valid: bool,
    /// Number of file parts validated.
    pub file_part_count: usize,
}

fn extract_declared_mime(data_url: &str) -> AiResult<&str> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| AiError::InvalidAttachment("attachment is not a data URL".to_string()))?;
    let mime = rest.split(';').next().unwrap_or_default();
    if mime.is_empty() {
        return Err(AiError::InvalidAttachment("attachment data URL has no MIME type".to_string()));
    }
    Ok(mime)
}

fn decode_payload(data_url: &str) -> AiResult<Vec<u8>> {
    use base64::Engine as _;
    let (_, b64) = data_url
        .split_once("base64,")
        .ok_or_else(|| AiError::InvalidAttachment("attachment data URL is not base64-encoded".to_string()))?;
    base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|_| AiError::InvalidAttachment("attachment data URL could not be decoded".to_string()))
}

fn magic_bytes_match(mime: &str, bytes: &[u8]) -> bool {
    match mime {
        "image/png" => bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
        "image/jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/gif" => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
        "image/webp" => bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        _ => false,
    }
}

/// Validate a single file part: MIME allow-list membership and a
/// magic-byte cross-check against the declared MIME.
///
/// # Errors
/// [`AiError::InvalidAttachment`] with a short user-facing reason for any
/// failure.
pub fn validate_file_part(part: &FilePart) -> AiResult<()> {
    if part.data_url.len() > MAX_DATA_URL_LEN {
        return Err(AiError::InvalidAttachment("attachment exceeds the 4 MiB size limit".to_string()));
    }

    let mime = extract_declared_mime(&part.data_url)?;
    if !ALLOWED_MIME_TYPES.contains(&mime) {
        return Err(AiError::InvalidAttachment(format!("attachment MIME type {mime} is not allowed")));
    }

    let bytes = decode_payload(&part.data_url)?;
    if !magic_bytes_match(mime, &bytes) {
        return Err(AiError::InvalidAttachment("attachment magic bytes do not match its declared type".to_string()));
    }

    Ok(())
}

/// Validate every file part on a message.
///
/// # Errors
/// [`AiError::InvalidAttachment`] if there are more than
/// [`MAX_FILE_PARTS`], or if any individual part fails
/// [`validate_file_part`].
pub fn validate_attachments(parts: &[FilePart]) -> AiResult<AttachmentValidation> {
    if parts.len() > MAX_FILE_PARTS {
        return Err(AiError::InvalidAttachment(format!(
            "at most {MAX_FILE_PARTS} file attachments are allowed per message"
        )));
    }

    for part in parts {
        validate_file_part(part)?;
    }

    Ok(AttachmentValidation {
        valid: true,
        file_part_count: parts.len(),
    })
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;

    use super::*;

    fn data_url(mime: &str, bytes: &[u8]) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        format!("data:{mime};base64,{encoded}")
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    #[test]
    fn valid_png_passes() {
        let part = FilePart {
            data_url: data_url("image/png", &png_bytes()),
            filename: "a.png".into(),
        };
        let result = validate_attachments(std::slice::from_ref(&part)).unwrap();
        assert_eq!(result.file_part_count, 1);
    }

    #[test]
    fn svg_is_rejected_even_though_it_is_an_image() {
        let part = FilePart {
            data_url: data_url("image/svg+xml", b"<svg></svg>"),
            filename: "a.svg".into(),
        };
        assert!(validate_file_part(&part).is_err());
    }

    #[test]
    fn mismatched_magic_bytes_rejected() {
        let part = FilePart {
            data_url: data_url("image/png", b"not a real png"),
            filename: "a.png".into(),
        };
        let err = validate_file_part(&part).unwrap_err();
        assert!(matches!(err, AiError::InvalidAttachment(m) if m.contains("magic bytes")));
    }

    #[test]
    fn more_than_five_parts_rejected() {
        let part = FilePart {
            data_url: data_url("image/png", &png_bytes()),
            filename: "a.png".into(),
        };
        let parts: Vec<FilePart> = (0..6).map(|_| part.clone()).collect();
        assert!(validate_attachments(&parts).is_err());
    }

    #[test]
    fn exactly_five_parts_allowed() {
        let part = FilePart {
            data_url: data_url("image/png", &png_bytes()),
            filename: "a.png".into(),
        };
        let parts: Vec<FilePart> = (0..5).map(|_| part.clone()).collect();
        assert!(validate_attachments(&parts).is_ok());
    }

    #[test]
    fn oversized_data_url_rejected() {
        let huge = "a".repeat(MAX_DATA_URL_LEN + 1);
        let part = FilePart {
            data_url: format!("data:image/png;base64,{huge}"),
            filename: "a.png".into(),
        };
        assert!(validate_file_part(&part).is_err());
    }

    #[test]
    fn non_data_url_rejected() {
        let part = FilePart {
            data_url: "https://example.com/a.png".into(),
            filename: "a.png".into(),
        };
        assert!(validate_file_part(&part).is_err());
    }

    #[test]
    fn webp_magic_bytes_validated() {
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(b"WEBP");
        let part = FilePart {
            data_url: data_url("image/webp", &bytes),
            filename: "a.webp".into(),
        };
        assert!(validate_file_part(&part).is_ok());
    }
}
