//! Writes ID3v2 metadata and cover art into downloaded files with `lofty`.
//!
//! Any ID3v1 tag left by the downloader is stripped so readers only see the
//! ID3v2 values.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::tag::{Tag, TagType};

use crate::catalog::TrackRecord;
use crate::error::{Error, Result};
use crate::text::{extract_year, normalize_tag_text};

/// Tag values for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// 0 when unknown; the tag is then omitted
    pub year: u32,
}

impl TrackTags {
    /// Derive tag values from a catalog record, replacing glyphs that tag
    /// readers mangle.
    pub fn from_record(track: &TrackRecord) -> Self {
        TrackTags {
            title: normalize_tag_text(&track.title),
            artist: normalize_tag_text(&track.artists.join(", ")),
            album: normalize_tag_text(&track.album_name),
            year: extract_year(&track.release_date),
        }
    }
}

/// Applies tags to an audio file.
pub trait TagWriter: Sync {
    fn apply_tags(&self, path: &Path, tags: &TrackTags, cover_art: Option<&[u8]>) -> Result<()>;
}

/// [`TagWriter`] that writes an ID3v2 tag with lofty.
pub struct LoftyTagWriter;

impl LoftyTagWriter {
    fn build_tag(tags: &TrackTags, cover_art: Option<&[u8]>) -> Tag {
        let mut tag = Tag::new(TagType::Id3v2);
        tag.set_title(tags.title.clone());
        tag.set_artist(tags.artist.clone());
        tag.set_album(tags.album.clone());
        if tags.year > 0 {
            tag.set_year(tags.year);
        }

        match cover_art {
            Some(bytes) if !bytes.is_empty() => {
                tag.push_picture(Picture::new_unchecked(
                    PictureType::CoverFront,
                    Some(MimeType::Jpeg),
                    Some("Front cover".to_string()),
                    bytes.to_vec(),
                ));
            }
            _ => log::debug!("No album art provided for track: {}", tags.title),
        }
        tag
    }
}

impl TagWriter for LoftyTagWriter {
    fn apply_tags(&self, path: &Path, tags: &TrackTags, cover_art: Option<&[u8]>) -> Result<()> {
        TagType::Id3v1.remove_from_path(path).map_err(|e| {
            Error::TaggingFailed(format!("failed to strip ID3v1 from {}: {}", path.display(), e))
        })?;

        let tag = Self::build_tag(tags, cover_art);
        tag.save_to_path(path, WriteOptions::default()).map_err(|e| {
            Error::TaggingFailed(format!("failed to save tag to {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// MPEG-1 Layer III, 128 kbps, 44.1 kHz, no padding: 417 bytes per frame.
    const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
    const FRAME_LEN: usize = 417;

    /// Silent MP3 frames followed by an ID3v1 tag, like a fresh download.
    fn mp3_with_id3v1() -> Vec<u8> {
        let mut data = Vec::new();
        for _ in 0..20 {
            data.extend_from_slice(&FRAME_HEADER);
            data.resize(data.len() + FRAME_LEN - FRAME_HEADER.len(), 0);
        }
        let mut v1 = vec![0u8; 128];
        v1[..3].copy_from_slice(b"TAG");
        v1[3..6].copy_from_slice(b"Old");
        v1[127] = 255;
        data.extend_from_slice(&v1);
        data
    }

    fn record() -> TrackRecord {
        TrackRecord {
            title: "Don\u{2019}t Stop".to_string(),
            artists: vec!["First".to_string(), "Second".to_string()],
            album_name: "Greatest \u{2014} Hits".to_string(),
            release_date: "1998-07-01".to_string(),
            duration_ms: 180_000,
            album_image_urls: Vec::new(),
        }
    }

    #[test]
    fn test_tags_from_record() {
        let tags = TrackTags::from_record(&record());
        assert_eq!(tags.title, "Don-t Stop");
        assert_eq!(tags.artist, "First, Second");
        assert_eq!(tags.album, "Greatest - Hits");
        assert_eq!(tags.year, 1998);
    }

    #[test]
    fn test_build_tag_sets_fields_and_picture() {
        let tags = TrackTags::from_record(&record());
        let tag = LoftyTagWriter::build_tag(&tags, Some(&[0xFF, 0xD8, 0xFF]));
        assert_eq!(tag.title().as_deref(), Some("Don-t Stop"));
        assert_eq!(tag.artist().as_deref(), Some("First, Second"));
        assert_eq!(tag.year(), Some(1998));
        assert_eq!(tag.pictures().len(), 1);
        assert_eq!(tag.pictures()[0].pic_type(), PictureType::CoverFront);
    }

    #[test]
    fn test_build_tag_omits_unknown_year_and_empty_cover() {
        let mut tags = TrackTags::from_record(&record());
        tags.year = 0;
        let tag = LoftyTagWriter::build_tag(&tags, Some(&[]));
        assert_eq!(tag.year(), None);
        assert!(tag.pictures().is_empty());
    }

    #[test]
    fn test_apply_tags_to_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.mp3");
        let tags = TrackTags::from_record(&record());
        assert!(matches!(
            LoftyTagWriter.apply_tags(&missing, &tags, None),
            Err(Error::TaggingFailed(_))
        ));
    }

    #[test]
    fn test_apply_tags_writes_id3v2_and_strips_id3v1() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("song.mp3");
        fs::write(&path, mp3_with_id3v1()).unwrap();

        let tags = TrackTags::from_record(&record());
        LoftyTagWriter
            .apply_tags(&path, &tags, Some(&[0xFF, 0xD8, 0xFF, 0xE0]))
            .unwrap();

        let tagged = lofty::read_from_path(&path).unwrap();
        assert!(tagged.tag(TagType::Id3v1).is_none());

        let tag = tagged.tag(TagType::Id3v2).unwrap();
        assert_eq!(tag.title().as_deref(), Some("Don-t Stop"));
        assert_eq!(tag.artist().as_deref(), Some("First, Second"));
        assert_eq!(tag.album().as_deref(), Some("Greatest - Hits"));
        assert_eq!(tag.year(), Some(1998));
        assert_eq!(tag.pictures().len(), 1);
    }
}
