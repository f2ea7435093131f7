use std::collections::BTreeMap;

use serde::Deserialize;

/// One post record from the export's posts JSON.
///
/// The export duplicates `title` and `creation_timestamp` at both the post
/// and the media level; the media entry wins where both are set.
#[derive(Debug, Clone, Deserialize)]
pub struct PostItem {
    #[serde(default)]
    pub media: Vec<MediaEntry>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
}

/// One media file referenced by a post.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaEntry {
    /// Path relative to the archive root
    pub uri: String,
    /// Capture time as UTC epoch seconds
    pub creation_timestamp: i64,
    /// Caption, if the user wrote one
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub media_metadata: Option<MediaMetadata>,
}

/// Capture metadata container. At most one of the two variants is present;
/// when both are absent there are no capture tags to pass through.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaMetadata {
    #[serde(default)]
    pub photo_metadata: Option<ExifBlock>,
    #[serde(default)]
    pub video_metadata: Option<ExifBlock>,
}

/// The export's capture-tag payload: a list of tag-name -> value mappings.
/// Well-formed exports carry at least one element; empty is tolerated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExifBlock {
    #[serde(default)]
    pub exif_data: Vec<BTreeMap<String, serde_json::Value>>,
}

impl MediaMetadata {
    /// First capture-tag mapping, photo taking precedence over video.
    pub fn capture_tags(&self) -> Option<&BTreeMap<String, serde_json::Value>> {
        self.photo_metadata
            .as_ref()
            .or(self.video_metadata.as_ref())
            .and_then(|block| block.exif_data.first())
    }
}
