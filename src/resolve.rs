use std::path::{Path, PathBuf};

use chrono::DateTime;
use filetime::FileTime;

use crate::error::ItemError;
use crate::post::PostItem;

pub const TAG_DATETIME_ORIGINAL: &str = "EXIF:DateTimeOriginal";
pub const TAG_CREATE_DATE: &str = "EXIF:CreateDate";
pub const TAG_IMAGE_DESCRIPTION: &str = "EXIF:ImageDescription";
pub const TAG_GPS_LATITUDE: &str = "EXIF:GPSLatitude";
pub const TAG_GPS_LATITUDE_REF: &str = "EXIF:GPSLatitudeRef";
pub const TAG_GPS_LONGITUDE: &str = "EXIF:GPSLongitude";
pub const TAG_GPS_LONGITUDE_REF: &str = "EXIF:GPSLongitudeRef";

/// Placeholder description for posts without a caption.
pub const DEFAULT_CAPTION: &str = "Instagram Post";

/// EXIF ImageDescription length cap, measured after quote substitution.
const MAX_CAPTION_LEN: usize = 255;

/// Scalar tag value as it goes into a tag assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    Number(f64),
}

impl TagValue {
    /// Convert a JSON scalar; arrays, objects and null have no tag form.
    pub fn from_json(value: &serde_json::Value) -> Option<TagValue> {
        match value {
            serde_json::Value::String(s) => Some(TagValue::Text(s.clone())),
            serde_json::Value::Number(n) => n.as_f64().map(TagValue::Number),
            serde_json::Value::Bool(b) => Some(TagValue::Text(b.to_string())),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TagValue::Text(s) if s.is_empty())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Number(n) => Some(*n),
            TagValue::Text(s) => s.parse().ok(),
        }
    }
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagValue::Text(s) => f.write_str(s),
            TagValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Tag mapping with insertion order preserved; a later write to an existing
/// key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMetadata {
    entries: Vec<(String, TagValue)>,
}

impl ResolvedMetadata {
    pub fn set(&mut self, name: impl Into<String>, value: TagValue) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the applier needs for one media file.
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    /// Absolute path of the media file (not checked for existence here)
    pub path: PathBuf,
    pub tags: ResolvedMetadata,
    /// Capture time for both atime and mtime
    pub file_time: FileTime,
}

/// Map one post record to its media path, tag set and filesystem timestamp.
///
/// Pure function of its inputs. The only failure is an empty media list;
/// missing caption, GPS or capture metadata all degrade to defaults.
pub fn resolve(item: &PostItem, archive_root: &Path) -> Result<ResolvedItem, ItemError> {
    let media = item.media.first().ok_or(ItemError::NoMediaInItem)?;
    let path = archive_root.join(&media.uri);

    let timestamp = exif_timestamp(media.creation_timestamp);
    let file_time = FileTime::from_unix_time(media.creation_timestamp, 0);

    let caption = media
        .title
        .as_deref()
        .or(item.title.as_deref())
        .unwrap_or(DEFAULT_CAPTION);

    let mut tags = ResolvedMetadata::default();
    tags.set(TAG_DATETIME_ORIGINAL, TagValue::Text(timestamp.clone()));
    tags.set(TAG_CREATE_DATE, TagValue::Text(timestamp));
    tags.set(TAG_IMAGE_DESCRIPTION, TagValue::Text(sanitize(caption)));

    // Capture tags pass through under their export names and replace the
    // defaults on key collision.
    if let Some(capture) = media.media_metadata.as_ref().and_then(|m| m.capture_tags()) {
        for (name, value) in capture {
            if let Some(v) = TagValue::from_json(value) {
                tags.set(name.clone(), v);
            }
        }
    }

    // GPS is read post-overlay since the capture tags may carry it. Both
    // coordinates must be present to emit anything; when either is missing
    // the four tags are omitted entirely (zero is a valid coordinate).
    if let Some((lat, lon)) = gps_coordinates(&tags) {
        let (lat_abs, lat_ref) = latitude_exif(lat);
        let (lon_abs, lon_ref) = longitude_exif(lon);
        tags.set(TAG_GPS_LATITUDE, TagValue::Number(lat_abs));
        tags.set(TAG_GPS_LATITUDE_REF, TagValue::Text(lat_ref.to_string()));
        tags.set(TAG_GPS_LONGITUDE, TagValue::Number(lon_abs));
        tags.set(TAG_GPS_LONGITUDE_REF, TagValue::Text(lon_ref.to_string()));
    }

    Ok(ResolvedItem { path, tags, file_time })
}

/// Format a UTC epoch as the EXIF datetime string.
pub fn exif_timestamp(epoch: i64) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%Y:%m:%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Make a caption safe for a tag assignment: double quotes would break the
/// `-TAG=value` syntax, newlines would split the newline-delimited batch,
/// and ImageDescription is capped at 255 characters.
pub fn sanitize(caption: &str) -> String {
    let replaced: String = caption
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\n' | '\r' => ' ',
            _ => c,
        })
        .collect();
    if replaced.chars().count() <= MAX_CAPTION_LEN {
        replaced
    } else {
        replaced.chars().take(MAX_CAPTION_LEN).collect()
    }
}

/// Split a signed latitude into (magnitude, hemisphere ref).
pub fn latitude_exif(lat: f64) -> (f64, char) {
    (lat.abs(), if lat < 0.0 { 'S' } else { 'N' })
}

/// Split a signed longitude into (magnitude, hemisphere ref).
pub fn longitude_exif(lon: f64) -> (f64, char) {
    (lon.abs(), if lon < 0.0 { 'W' } else { 'E' })
}

fn gps_coordinates(tags: &ResolvedMetadata) -> Option<(f64, f64)> {
    let lat = tags.get("latitude")?.as_f64()?;
    let lon = tags.get("longitude")?.as_f64()?;
    Some((lat, lon))
}
