//! PDF upload validation and decoding.
//!
//! The browser sends files as `{ name, type, data }` where `data` is either a
//! bare base64 string or a `data:` URL. Only `application/pdf` files up to
//! [`MAX_UPLOAD_BYTES`] are accepted.

use std::fmt;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::UploadError;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const REJECTED_NOTICE: &str = "Only PDF files under 5MB are allowed.";

/// A file as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    /// Base64 payload, optionally prefixed with `data:<mime>;base64,`.
    pub data: String,
}

impl UploadedFile {
    /// Wrap raw bytes the way a browser `FileReader.readAsDataURL` would.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = mime_type.into();
        let data = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        Self { name: name.into(), mime_type, data }
    }

    /// Read a file from disk. The MIME type is inferred from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        let mime = if is_pdf { PDF_MIME_TYPE } else { "application/octet-stream" };
        Ok(Self::from_bytes(name, mime, &bytes))
    }

    fn base64_payload(&self) -> &str {
        match self.data.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, payload)| payload).unwrap_or(""),
            None => self.data.as_str(),
        }
    }

    /// Decoded byte length, computed from the base64 length without decoding.
    pub fn decoded_len(&self) -> usize {
        let payload = self.base64_payload().trim();
        let padding = payload.bytes().rev().take_while(|&b| b == b'=').count();
        ((payload.len() / 4) * 3 + (payload.len() % 4).saturating_sub(1)).saturating_sub(padding.min(2))
    }

    /// Check type and size without decoding.
    pub fn check(&self) -> Result<(), UploadError> {
        if self.mime_type != PDF_MIME_TYPE {
            return Err(UploadError::UnsupportedType {
                name: self.name.clone(),
                mime_type: self.mime_type.clone(),
            });
        }
        let size = self.decoded_len();
        if size > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge { name: self.name.clone(), size, limit: MAX_UPLOAD_BYTES });
        }
        Ok(())
    }
}

/// A validated PDF ready to be forwarded to the model.
#[derive(Clone, PartialEq, Eq)]
pub struct PdfDocument {
    pub name: String,
    bytes: Vec<u8>,
}

impl fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfDocument")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl PdfDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    pub fn from_upload(file: &UploadedFile) -> Result<Self, UploadError> {
        file.check()?;
        let bytes = STANDARD
            .decode(file.base64_payload().trim())
            .map_err(|e| UploadError::InvalidEncoding { name: file.name.clone(), reason: e.to_string() })?;
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge { name: file.name.clone(), size: bytes.len(), limit: MAX_UPLOAD_BYTES });
        }
        debug!(name = %file.name, len = bytes.len(), "decoded PDF upload");
        Ok(Self { name: file.name.clone(), bytes })
    }

    /// Only the first submitted file is used; the rest are ignored.
    pub fn from_first(files: &[UploadedFile]) -> Result<Self, UploadError> {
        let first = files.first().ok_or(UploadError::NoFiles)?;
        if files.len() > 1 {
            debug!(ignored = files.len() - 1, "using only the first uploaded file");
        }
        Self::from_upload(first)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Result of filtering a user's file selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub accepted: Vec<UploadedFile>,
    pub rejected: Vec<UploadError>,
    /// Message to show when anything was rejected.
    pub notice: Option<&'static str>,
}

/// Keep the valid PDFs of a selection; anything else is reported and dropped.
pub fn validate_selection(files: Vec<UploadedFile>) -> Selection {
    let mut selection = Selection::default();
    for file in files {
        match file.check() {
            Ok(()) => selection.accepted.push(file),
            Err(e) => {
                warn!(error = %e, "rejected upload");
                selection.rejected.push(e);
            }
        }
    }
    if !selection.rejected.is_empty() {
        selection.notice = Some(REJECTED_NOTICE);
    }
    selection
}
