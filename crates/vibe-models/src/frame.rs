//! Extracted frame records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata for one extracted video frame.
///
/// `image_url` references the image bytes (usually a `data:` URL); the raw
/// bytes are never stored in the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    /// Opaque per-frame identifier
    pub id: String,
    /// 0-based position within the video
    pub index: u32,
    /// Human time marker (e.g. "00:04")
    pub timestamp: String,
    /// Reference/URI to the image bytes
    pub image_url: String,
}

impl FrameRecord {
    pub fn new(
        id: impl Into<String>,
        index: u32,
        timestamp: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            index,
            timestamp: timestamp.into(),
            image_url: image_url.into(),
        }
    }

    /// Base64 payload to send to the analysis endpoint.
    ///
    /// For `data:<mime>;base64,<body>` URLs this is `<body>`; any other
    /// reference is returned as-is.
    pub fn payload_base64(&self) -> &str {
        if let Some(rest) = self.image_url.strip_prefix("data:") {
            if let Some((_, body)) = rest.split_once(";base64,") {
                return body;
            }
        }
        &self.image_url
    }
}
