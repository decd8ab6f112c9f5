//! Avatar upload checks and data URI encoding

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Largest accepted avatar upload (2 MiB)
pub const AVATAR_MAX_BYTES: usize = 2 * 1024 * 1024;

/// Accepted avatar image types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarMime {
    Png,
    Jpeg,
}

impl AvatarMime {
    /// Parse a MIME type, ignoring case and parameters after `;`
    pub fn parse(mime_type: &str) -> Result<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/png" => Ok(AvatarMime::Png),
            "image/jpeg" => Ok(AvatarMime::Jpeg),
            _ => Err(Error::unsupported_type(mime_type)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarMime::Png => "image/png",
            AvatarMime::Jpeg => "image/jpeg",
        }
    }
}

impl std::fmt::Display for AvatarMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check an upload and encode it as a `data:` URI
///
/// Size is checked first, so an oversized file of the wrong type reports
/// `FileTooLarge`.
pub fn encode_avatar(bytes: &[u8], mime_type: &str) -> Result<(AvatarMime, String)> {
    if bytes.len() > AVATAR_MAX_BYTES {
        return Err(Error::file_too_large(bytes.len(), AVATAR_MAX_BYTES));
    }
    let mime = AvatarMime::parse(mime_type)?;

    let uri = format!("data:{};base64,{}", mime.as_str(), STANDARD.encode(bytes));
    Ok((mime, uri))
}

/// Decode a stored avatar data URI back into its type and bytes
pub fn decode_avatar(uri: &str) -> Result<(AvatarMime, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::validation("Avatar is not a data URI"))?;
    let (mime_type, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| Error::validation("Avatar is not base64 encoded"))?;

    let mime = AvatarMime::parse(mime_type)?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| Error::validation(format!("Invalid avatar data: {}", e)))?;
    Ok((mime, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_mime_parse() {
        assert_eq!(AvatarMime::parse("image/png").unwrap(), AvatarMime::Png);
        assert_eq!(AvatarMime::parse("IMAGE/JPEG").unwrap(), AvatarMime::Jpeg);
        assert_eq!(
            AvatarMime::parse("image/jpeg; charset=binary").unwrap(),
            AvatarMime::Jpeg
        );
        assert_eq!(
            AvatarMime::parse("image/gif").unwrap_err().kind(),
            ErrorKind::UnsupportedType
        );
        tokio_test::assert_err!(AvatarMime::parse(""));
    }

    #[test]
    fn test_size_limit_boundary() {
        let exact = vec![0u8; AVATAR_MAX_BYTES];
        tokio_test::assert_ok!(encode_avatar(&exact, "image/png"));

        let over = vec![0u8; AVATAR_MAX_BYTES + 1];
        match encode_avatar(&over, "image/png") {
            Err(Error::FileTooLarge { size, limit }) => {
                assert_eq!(size, 2_097_153);
                assert_eq!(limit, 2_097_152);
            }
            other => panic!("Expected FileTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_size_checked_before_type() {
        let over = vec![0u8; AVATAR_MAX_BYTES + 1];
        let err = encode_avatar(&over, "application/pdf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileTooLarge);
    }

    #[test]
    fn test_encode_decode() {
        let (mime, uri) = encode_avatar(b"\x89PNG", "image/png").unwrap();
        assert_eq!(mime, AvatarMime::Png);
        assert_eq!(uri, "data:image/png;base64,iVBORw==");

        let (mime, bytes) = decode_avatar(&uri).unwrap();
        assert_eq!(mime, AvatarMime::Png);
        assert_eq!(bytes, b"\x89PNG");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_avatar("https://img.example/a.png").is_err());
        assert!(decode_avatar("data:image/png,plain").is_err());
        assert!(decode_avatar("data:image/png;base64,!!!").is_err());
    }
}
