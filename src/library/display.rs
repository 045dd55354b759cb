use crate::config::TrackDisplayField;

use super::model::Track;

/// Build a display string for a track according to the provided `fields` and separator.
///
/// Empty metadata fields are skipped; when nothing is produced the title (or
/// the file name for unresolved tracks) is used.
pub fn display_from_fields(track: &Track, fields: &[TrackDisplayField], sep: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    let mut push = |s: &str| {
        let s = s.trim();
        if !s.is_empty() {
            parts.push(s.to_string());
        }
    };

    for f in fields {
        match f {
            TrackDisplayField::Display => {
                push(&track.artist);
                push(&track.display_title());
            }
            TrackDisplayField::Title => push(&track.title),
            TrackDisplayField::Artist => push(&track.artist),
            TrackDisplayField::Album => push(&track.album),
            TrackDisplayField::Filename => {
                if let Some(stem) = track.path.file_stem().and_then(|s| s.to_str()) {
                    push(stem);
                }
            }
            TrackDisplayField::Path => push(&track.path.display().to_string()),
        }
    }

    if parts.is_empty() {
        track.display_title()
    } else {
        parts.join(sep)
    }
}

/// Secondary "artist • album" line, with "Unknown" standing in for a missing artist.
pub fn subtitle(track: &Track) -> String {
    let artist = if track.artist.trim().is_empty() {
        "Unknown"
    } else {
        track.artist.trim()
    };
    format!("{} • {}", artist, track.album.trim())
}

