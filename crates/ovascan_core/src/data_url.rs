//! `data:` URL encoding for image previews.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::DataUrlError;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A self-contained, Base64 encoded representation of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime: String,
    payload: String,
}

impl DataUrl {
    pub fn encode(mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime: mime.into(),
            payload: BASE64.encode(bytes),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` string.
    pub fn parse(input: &str) -> Result<Self, DataUrlError> {
        let rest = input
            .strip_prefix(SCHEME)
            .ok_or(DataUrlError::MissingScheme)?;
        let (mime, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or(DataUrlError::NotBase64)?;
        BASE64
            .decode(payload)
            .map_err(|e| DataUrlError::InvalidPayload(e.to_string()))?;
        Ok(Self {
            mime: mime.to_string(),
            payload: payload.to_string(),
        })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn decode_payload(&self) -> Result<Vec<u8>, DataUrlError> {
        BASE64
            .decode(&self.payload)
            .map_err(|e| DataUrlError::InvalidPayload(e.to_string()))
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}{BASE64_MARKER}{}", self.mime, self.payload)
    }
}

/// MIME type of an image, detected from its leading bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}
