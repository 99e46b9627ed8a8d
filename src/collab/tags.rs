//! Tag reading and writing via lofty.
//!
//! Reading keeps raw strings (track-number width matters) and records
//! duplicate fields; writing replaces prior values wholesale with the
//! canonical set.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::file::{FileType, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt, TagItem};

use crate::error::{Error, Result};
use crate::model::ObservedTag;

use super::{CanonicalTagSet, TagStore};

/// The replay-gain fields every finished rip carries.
const REPLAY_GAIN_KEYS: [ItemKey; 4] = [
    ItemKey::ReplayGainTrackGain,
    ItemKey::ReplayGainTrackPeak,
    ItemKey::ReplayGainAlbumGain,
    ItemKey::ReplayGainAlbumPeak,
];

/// metaflac writes this fifth field on FLAC; mp3gain never does.
const REFERENCE_LOUDNESS_KEY: &str = "REPLAYGAIN_REFERENCE_LOUDNESS";

fn has_replay_gain(tag: &Tag, require_reference: bool) -> bool {
    if !REPLAY_GAIN_KEYS
        .iter()
        .all(|key| tag.get_string(key).is_some())
    {
        return false;
    }
    !require_reference
        || tag.items().any(|item| {
            matches!(item.key(), ItemKey::Unknown(k) if k.eq_ignore_ascii_case(REFERENCE_LOUDNESS_KEY))
        })
}

/// Fields checked for duplicate occurrences.
const MANDATORY_KEYS: [(ItemKey, &str); 7] = [
    (ItemKey::TrackTitle, "title"),
    (ItemKey::TrackArtist, "artist"),
    (ItemKey::AlbumTitle, "album"),
    (ItemKey::TrackNumber, "track number"),
    (ItemKey::TrackTotal, "track total"),
    (ItemKey::RecordingDate, "date"),
    (ItemKey::Genre, "genre"),
];

fn is_log_key(item: &TagItem) -> bool {
    matches!(item.key(), ItemKey::Unknown(k) if k.to_uppercase().starts_with("LOG"))
}

pub struct LoftyTagStore;

impl TagStore for LoftyTagStore {
    fn read(&self, path: &Path) -> Result<ObservedTag> {
        let tagged_file = Probe::open(path)?.read()?;
        let require_reference = tagged_file.file_type() == FileType::Flac;
        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return Ok(ObservedTag::default());
        };

        let mut observed = ObservedTag {
            title: tag.title().map(|s| s.to_string()),
            artist: tag.artist().map(|s| s.to_string()),
            album: tag.album().map(|s| s.to_string()),
            composer: tag
                .get_string(&ItemKey::Composer)
                .map(|s| s.to_string()),
            track_number: tag
                .get_string(&ItemKey::TrackNumber)
                .map(|s| s.to_string())
                .or_else(|| tag.track().map(|n| n.to_string())),
            track_total: tag
                .get_string(&ItemKey::TrackTotal)
                .map(|s| s.to_string())
                .or_else(|| tag.track_total().map(|n| n.to_string())),
            date: tag
                .get_string(&ItemKey::RecordingDate)
                .map(|s| s.to_string())
                .or_else(|| tag.year().map(|y| y.to_string())),
            genre: tag.genre().map(|s| s.to_string()),
            has_log_tag: tag.items().any(is_log_key),
            has_replay_gain: has_replay_gain(tag, require_reference),
            ..Default::default()
        };

        for (key, name) in &MANDATORY_KEYS {
            if tag.get_strings(key).count() > 1 {
                observed.duplicates.push(name.to_string());
            }
        }

        if let Some(picture) = tag.pictures().first() {
            observed.has_picture = true;
            observed.picture_dimensions = ::image::load_from_memory(picture.data())
                .ok()
                .map(|img| (img.width(), img.height()));
        }

        Ok(observed)
    }

    fn write(&self, path: &Path, tags: &CanonicalTagSet) -> Result<()> {
        let mut tagged_file = Probe::open(path)?.read()?;
        let tag_type = tagged_file.primary_tag_type();
        let tag = if let Some(tag) = tagged_file.tag_mut(tag_type) {
            tag
        } else {
            tagged_file.insert_tag(Tag::new(tag_type));
            tagged_file
                .tag_mut(tag_type)
                .ok_or_else(|| Error::tag(path, "failed to create tag"))?
        };

        tag.set_title(tags.title.clone());
        tag.set_artist(tags.artist.clone());
        tag.set_album(tags.album.clone());
        if tags.number > 0 {
            tag.insert_text(ItemKey::TrackNumber, tags.number_string());
        } else {
            tag.retain(|item| item.key() != &ItemKey::TrackNumber);
        }
        tag.insert_text(ItemKey::TrackTotal, tags.track_total.to_string());
        if tags.year > 0 {
            tag.set_year(tags.year as u32);
        } else {
            tag.retain(|item| {
                !matches!(item.key(), ItemKey::RecordingDate | ItemKey::Year)
            });
        }
        if tags.genre.is_empty() {
            tag.retain(|item| item.key() != &ItemKey::Genre);
        } else {
            tag.set_genre(tags.genre.clone());
        }
        if let Some(composer) = &tags.composer {
            tag.insert_text(ItemKey::Composer, composer.clone());
        }

        // Parasitic ripping logs never survive a rewrite
        tag.retain(|item| !is_log_key(item));

        tag.save_to_path(path, WriteOptions::default())?;
        Ok(())
    }

    fn embed_picture(&self, path: &Path, jpeg: &[u8]) -> Result<()> {
        let mut tagged_file = Probe::open(path)?.read()?;
        let tag_type = tagged_file.primary_tag_type();
        let tag = if let Some(tag) = tagged_file.tag_mut(tag_type) {
            tag
        } else {
            tagged_file.insert_tag(Tag::new(tag_type));
            tagged_file
                .tag_mut(tag_type)
                .ok_or_else(|| Error::tag(path, "failed to create tag"))?
        };

        while !tag.pictures().is_empty() {
            tag.remove_picture(0);
        }
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Jpeg),
            None,
            jpeg.to_vec(),
        ));

        tag.save_to_path(path, WriteOptions::default())?;
        Ok(())
    }
}
