use std::io::Cursor;

use id3::{Tag, TagLike};
use thiserror::Error;

use crate::NewBlob;

pub const DEFAULT_ARTIST: &str = "Unknown Artist";
pub const DEFAULT_ALBUM: &str = "Unknown Album";

/// Whatever could be read out of the file's embedded tags. Every field is
/// optional, [resolve] fills the gaps.
#[derive(Debug, Default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Seconds
    pub duration: Option<i64>,
    pub picture: Option<NewBlob>,
}

/// Tag data with all fallbacks applied, ready for a catalog record
#[derive(Debug)]
pub struct ResolvedMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: i64,
    pub picture: Option<NewBlob>,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("no usable tag data: {0}")]
    Unreadable(String),
}

/// Best-effort extraction of embedded metadata from raw audio bytes
pub fn extract(bytes: &[u8]) -> Result<TrackMetadata, MetadataError> {
    let tag = Tag::read_from(Cursor::new(bytes))
        .map_err(|e| MetadataError::Unreadable(e.to_string()))?;

    let duration = mp3_duration::from_read(&mut Cursor::new(bytes))
        .ok()
        .map(|d| d.as_secs() as i64);

    let picture = tag.pictures().next().map(|picture| NewBlob {
        data: picture.data.clone(),
        content_type: picture.mime_type.clone(),
    });

    Ok(TrackMetadata {
        title: tag.title().map(str::to_string),
        artist: tag.artist().map(str::to_string),
        album: tag.album().map(str::to_string),
        duration,
        picture,
    })
}

/// Applies the upload fallbacks: title from the file name with its extension
/// stripped, "Unknown Artist"/"Unknown Album", zero duration, no cover.
pub fn resolve(
    file_name: &str,
    extracted: Result<TrackMetadata, MetadataError>,
) -> ResolvedMetadata {
    let metadata = extracted.unwrap_or_default();

    ResolvedMetadata {
        title: metadata
            .title
            .unwrap_or_else(|| title_from_file_name(file_name)),
        artist: metadata.artist.unwrap_or_else(|| DEFAULT_ARTIST.to_string()),
        album: metadata.album.unwrap_or_else(|| DEFAULT_ALBUM.to_string()),
        duration: metadata.duration.unwrap_or(0),
        picture: metadata.picture,
    }
}

fn title_from_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn garbage_bytes_fail_extraction() {
        let result = extract(&[0u8; 64]);

        assert!(matches!(result, Err(MetadataError::Unreadable(_))));
    }

    #[test]
    fn failed_extraction_resolves_to_defaults() {
        let resolved = resolve(
            "Sunset Drive.mp3",
            Err(MetadataError::Unreadable("bad tag".to_string())),
        );

        assert_eq!(resolved.title, "Sunset Drive");
        assert_eq!(resolved.artist, DEFAULT_ARTIST);
        assert_eq!(resolved.album, DEFAULT_ALBUM);
        assert_eq!(resolved.duration, 0);
        assert!(resolved.picture.is_none());
    }

    #[test]
    fn extracted_fields_win_over_defaults() {
        let resolved = resolve(
            "raw-upload.mp3",
            Ok(TrackMetadata {
                title: Some("Nightfall".to_string()),
                artist: Some("The Streetlights".to_string()),
                album: None,
                duration: Some(242),
                picture: None,
            }),
        );

        assert_eq!(resolved.title, "Nightfall");
        assert_eq!(resolved.artist, "The Streetlights");
        assert_eq!(resolved.album, DEFAULT_ALBUM);
        assert_eq!(resolved.duration, 242);
    }

    #[test]
    fn title_falls_back_to_the_whole_name_without_extension() {
        assert_eq!(title_from_file_name("track.mp3"), "track");
        assert_eq!(title_from_file_name("archive.tar.gz"), "archive.tar");
        assert_eq!(title_from_file_name("noextension"), "noextension");
        assert_eq!(title_from_file_name(".hidden"), ".hidden");
    }
}
