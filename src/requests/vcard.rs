//! # Vcard Packing
//!
//! Packs a display name and an optional avatar file into the small JSON
//! profile attached to account and topic descriptions.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vcard {
    #[serde(rename = "fn", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Base64-encoded image bytes
    pub data: String,
    /// File extension of the source image, leading dot included
    #[serde(rename = "type")]
    pub kind: String,
}

impl Photo {
    /// Read an avatar from disk
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let bytes = fs::read(path).map_err(|source| ClientError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        let kind = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        Ok(Self {
            data: STANDARD.encode(bytes),
            kind,
        })
    }
}

/// Build the serialized vcard, or `None` when there is nothing to pack.
///
/// An unreadable avatar is logged and left out; the rest of the card is
/// still produced.
pub fn make_vcard(full_name: Option<&str>, photo_path: Option<&str>) -> Option<String> {
    let full_name = full_name.map(str::trim).filter(|name| !name.is_empty());
    if full_name.is_none() && photo_path.is_none() {
        return None;
    }

    let photo = photo_path.and_then(|path| match Photo::load(Path::new(path)) {
        Ok(photo) => Some(photo),
        Err(e) => {
            tracing::warn!("Error opening avatar: {e}");
            None
        }
    });

    let card = Vcard {
        full_name: full_name.map(str::to_string),
        photo,
    };
    match serde_json::to_string(&card) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!("Failed to serialize vcard: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn vcard_with_name_only_should_decode_back() {
        let card = make_vcard(Some("  Alice "), None).expect("vcard expected");
        let value: serde_json::Value = serde_json::from_str(&card).unwrap();
        assert_eq!(value, serde_json::json!({"fn": "Alice"}));
    }

    #[test]
    fn vcard_without_name_or_photo_should_be_absent() {
        assert_eq!(make_vcard(None, None), None);
        assert_eq!(make_vcard(Some("   "), None), None);
    }

    #[test]
    fn vcard_should_embed_photo_as_base64() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"\x89PNG").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let card = make_vcard(Some("Bob"), Some(&path)).expect("vcard expected");
        let card: Vcard = serde_json::from_str(&card).unwrap();
        assert_eq!(card.full_name.as_deref(), Some("Bob"));
        let photo = card.photo.expect("photo expected");
        assert_eq!(photo.kind, ".png");
        assert_eq!(STANDARD.decode(photo.data).unwrap(), b"\x89PNG");
    }

    #[test]
    fn unreadable_photo_should_be_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jpg");
        let card = make_vcard(Some("Carol"), Some(&missing.to_string_lossy()))
            .expect("vcard expected");
        let value: serde_json::Value = serde_json::from_str(&card).unwrap();
        assert_eq!(value, serde_json::json!({"fn": "Carol"}));
    }

    #[test]
    fn photo_load_should_report_file_access_error() {
        let result = Photo::load(Path::new("/nonexistent/avatar.gif"));
        assert!(matches!(result, Err(ClientError::FileAccess { .. })));
    }
}
