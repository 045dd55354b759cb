use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tempfile::tempdir;

use super::catalog::{Catalog, CatalogError, ItemsChanged};
use super::display::{display_from_fields, subtitle};
use super::filter::FilteredView;
use super::metadata::{ProbeError, decode_cover_bytes, probe, run_with_timeout};
use super::model::{Metadata, Track};
use super::scan::{CancelToken, ScanEvent, Scanner, is_audio_file};
use super::uri::{file_uri, path_from_file_uri};
use crate::config::{LibrarySettings, MetadataSettings, TrackDisplayField};

fn tagged(path: &str, title: &str, artist: &str, album: &str) -> Track {
    let mut t = Track::new(path);
    t.apply_metadata(Metadata {
        title: title.into(),
        artist: artist.into(),
        album: album.into(),
        ..Metadata::default()
    });
    t
}

fn catalog_of(tracks: Vec<Track>) -> Catalog {
    let mut c = Catalog::new();
    for t in tracks {
        c.append(t);
    }
    c
}

/// Minimal PCM WAV: 8 kHz, mono, 16-bit silence.
fn write_wav(path: &Path, secs: u32) {
    let sample_rate = 8000u32;
    let data_len = sample_rate * secs * 2;
    let mut b: Vec<u8> = Vec::new();
    b.extend_from_slice(b"RIFF");
    b.extend_from_slice(&(36 + data_len).to_le_bytes());
    b.extend_from_slice(b"WAVE");
    b.extend_from_slice(b"fmt ");
    b.extend_from_slice(&16u32.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&sample_rate.to_le_bytes());
    b.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    b.extend_from_slice(&2u16.to_le_bytes());
    b.extend_from_slice(&16u16.to_le_bytes());
    b.extend_from_slice(b"data");
    b.extend_from_slice(&data_len.to_le_bytes());
    b.resize(b.len() + data_len as usize, 0);
    fs::write(path, b).unwrap();
}

fn scan_events(root: &Path, library: LibrarySettings, metadata: MetadataSettings) -> Vec<ScanEvent> {
    let (tx, rx) = mpsc::channel();
    let summary = Scanner::new(library, metadata).run(root, &tx, &CancelToken::new());
    tx.send(ScanEvent::Finished(summary)).unwrap();
    drop(tx);
    rx.into_iter().collect()
}

fn discovered_names(events: &[ScanEvent], root: &Path) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Discovered(t) => Some(
                t.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/"),
            ),
            _ => None,
        })
        .collect()
}

// --- track & catalog ---

#[test]
fn new_track_has_empty_defaults() {
    let t = Track::new("/music/a b.mp3");
    assert_eq!(t.title, "");
    assert_eq!(t.artist, "");
    assert_eq!(t.album, "");
    assert_eq!(t.duration, Duration::ZERO);
    assert!(t.cover.is_none());
    assert!(!t.is_resolved());
    assert_eq!(t.uri, "file:///music/a%20b.mp3");
}

#[test]
fn metadata_applies_only_once() {
    let mut t = Track::new("/m/x.flac");
    assert!(t.apply_metadata(Metadata {
        title: "First".into(),
        duration: Duration::from_micros(1_500_000),
        ..Metadata::default()
    }));
    assert!(!t.apply_metadata(Metadata {
        title: "Second".into(),
        ..Metadata::default()
    }));
    assert_eq!(t.title, "First");
    assert_eq!(t.duration.as_micros(), 1_500_000);
}

#[test]
fn catalog_appends_in_order_and_reports_changes() {
    let mut c = Catalog::new();
    assert_eq!(
        c.append(Track::new("/m/a.mp3")),
        ItemsChanged {
            position: 0,
            removed: 0,
            added: 1
        }
    );
    assert_eq!(c.append(Track::new("/m/b.mp3")).position, 1);
    assert_eq!(c.count(), 2);
    assert_eq!(c.get(1).unwrap().path, PathBuf::from("/m/b.mp3"));
    assert_eq!(c.position_of(Path::new("/m/a.mp3")), Some(0));
}

#[test]
fn catalog_get_out_of_range_fails() {
    let c = catalog_of(vec![Track::new("/m/a.mp3")]);
    assert_eq!(
        c.get(1).unwrap_err(),
        CatalogError::OutOfRange { index: 1, count: 1 }
    );
    assert!(Catalog::new().get(0).is_err());
}

#[test]
fn catalog_apply_metadata_targets_matching_record() {
    let mut c = catalog_of(vec![Track::new("/m/a.mp3"), Track::new("/m/b.mp3")]);
    let (idx, applied) = c
        .apply_metadata(
            Path::new("/m/b.mp3"),
            Metadata {
                artist: "Someone".into(),
                ..Metadata::default()
            },
        )
        .unwrap();
    assert_eq!((idx, applied), (1, true));
    assert_eq!(c.get(1).unwrap().artist, "Someone");
    assert_eq!(c.get(0).unwrap().artist, "");

    assert!(matches!(
        c.apply_metadata(Path::new("/m/zzz.mp3"), Metadata::default()),
        Err(CatalogError::UnknownTrack(_))
    ));
}

// --- filter ---

#[test]
fn empty_query_shows_whole_catalog() {
    let c = catalog_of(vec![
        tagged("/m/1.mp3", "One", "X", "A"),
        Track::new("/m/untagged.mp3"),
        tagged("/m/2.mp3", "Two", "Y", "B"),
    ]);
    let mut v = FilteredView::new();
    v.apply(&c, "");
    assert_eq!(v.indices(), &[0, 1, 2]);
}

#[test]
fn query_matches_title_artist_album_case_insensitively() {
    let c = catalog_of(vec![
        tagged("/m/1.mp3", "Song One", "Artist X", "Album"),
        tagged("/m/2.mp3", "Song Two", "Artist Y", "Album"),
        tagged("/m/3.mp3", "Other", "Nobody", "Compilation"),
    ]);
    let mut v = FilteredView::new();

    v.apply(&c, "aRtIsT y");
    assert_eq!(v.indices(), &[1]);

    v.apply(&c, "ALBUM");
    assert_eq!(v.indices(), &[0, 1]);

    v.apply(&c, "pila");
    assert_eq!(v.indices(), &[2]);

    v.apply(&c, "no such thing");
    assert!(v.is_empty());
}

#[test]
fn filename_is_not_part_of_the_predicate() {
    let c = catalog_of(vec![Track::new("/m/needle.mp3")]);
    let mut v = FilteredView::new();
    v.apply(&c, "needle");
    assert!(v.is_empty());
}

#[test]
fn admit_and_refresh_keep_view_in_catalog_order() {
    let mut c = catalog_of(vec![tagged("/m/1.mp3", "Rock", "", "")]);
    let mut v = FilteredView::new();
    v.apply(&c, "rock");

    c.append(tagged("/m/2.mp3", "Jazz", "", ""));
    assert_eq!(v.admit(&c, 1), None);
    c.append(tagged("/m/3.mp3", "Rock Again", "", ""));
    assert_eq!(
        v.admit(&c, 2),
        Some(ItemsChanged {
            position: 1,
            removed: 0,
            added: 1
        })
    );
    assert_eq!(v.indices(), &[0, 2]);
    assert_eq!(v.position_of(2), Some(1));
    assert_eq!(v.position_of(1), None);

    // Nothing changed, so refresh reports nothing.
    assert_eq!(v.refresh(&c), None);

    c.append(Track::new("/m/4.mp3"));
    c.apply_metadata(
        Path::new("/m/4.mp3"),
        Metadata {
            album: "rocksteady".into(),
            ..Metadata::default()
        },
    )
    .unwrap();
    assert!(v.refresh(&c).is_some());
    assert_eq!(v.indices(), &[0, 2, 3]);
}

// --- display ---

#[test]
fn unresolved_track_falls_back_to_filename() {
    let t = Track::new("/music/Some Artist/01 - intro.ogg");
    assert_eq!(t.display_title(), "01 - intro.ogg");
    assert_eq!(
        display_from_fields(&t, &[TrackDisplayField::Artist, TrackDisplayField::Title], " - "),
        "01 - intro.ogg"
    );
    assert_eq!(subtitle(&t), "Unknown • ");
}

#[test]
fn display_from_fields_joins_non_empty_fields() {
    let t = tagged("/m/Song.mp3", "Song", "  Artist  ", "");
    let fields = [
        TrackDisplayField::Artist,
        TrackDisplayField::Title,
        TrackDisplayField::Album,
    ];
    assert_eq!(display_from_fields(&t, &fields, " - "), "Artist - Song");
    assert_eq!(
        display_from_fields(&t, &[TrackDisplayField::Filename], "::"),
        "Song"
    );
    assert_eq!(subtitle(&t), "Artist • ");
}

// --- uri ---

#[test]
fn file_uri_round_trips_awkward_names() {
    for p in [
        "/music/plain.mp3",
        "/music/with space/#1 100%.flac",
        "/music/Björk/Jóga?.m4a",
    ] {
        let uri = file_uri(Path::new(p));
        assert!(uri.starts_with("file:///"));
        assert!(!uri.contains(' '));
        assert_eq!(path_from_file_uri(&uri), Some(PathBuf::from(p)));
    }
}

#[test]
fn path_from_file_uri_rejects_foreign_or_malformed_uris() {
    assert_eq!(path_from_file_uri("http://example.com/a.mp3"), None);
    assert_eq!(path_from_file_uri("file:///a%2"), None);
    assert_eq!(path_from_file_uri("file://server/share/a.mp3"), None);
    assert_eq!(
        path_from_file_uri("file://localhost/a.mp3"),
        Some(PathBuf::from("/a.mp3"))
    );
}

// --- metadata ---

#[test]
fn probe_timeout_is_reported_and_late_result_dropped() {
    let result = run_with_timeout(PathBuf::from("/slow.mp3"), Duration::from_millis(20), |_| {
        thread::sleep(Duration::from_millis(300));
        Ok(Metadata {
            title: "too late".into(),
            ..Metadata::default()
        })
    });
    assert!(matches!(result, Err(ProbeError::TimedOut(_))));
}

#[test]
fn timed_out_track_keeps_defaults() {
    let mut c = catalog_of(vec![Track::new("/m/slow track.mp3")]);
    let outcome = run_with_timeout(
        PathBuf::from("/m/slow track.mp3"),
        Duration::from_millis(10),
        |_| {
            thread::sleep(Duration::from_millis(200));
            Ok(Metadata::default())
        },
    );
    if let Ok(metadata) = outcome {
        c.apply_metadata(Path::new("/m/slow track.mp3"), metadata)
            .unwrap();
    }
    let t = c.get(0).unwrap();
    assert!(!t.is_resolved());
    assert_eq!((t.title.as_str(), t.artist.as_str(), t.album.as_str()), ("", "", ""));
    assert_eq!(t.duration, Duration::ZERO);
    assert_eq!(t.display_title(), "slow track.mp3");
}

#[test]
fn probe_of_garbage_fails_without_panicking() {
    let dir = tempdir().unwrap();
    let p = dir.path().join("broken.flac");
    fs::write(&p, b"definitely not audio").unwrap();
    assert!(probe(&p, true, 64).is_err());

    let resolver = super::MetadataResolver::new(&MetadataSettings::default());
    assert!(resolver.resolve(&p).is_none());
}

#[test]
fn probe_reads_duration_of_untagged_wav() {
    let dir = tempdir().unwrap();
    let p = dir.path().join("tone.wav");
    write_wav(&p, 1);

    let m = probe(&p, true, 64).unwrap();
    assert_eq!(m.title, "");
    assert!(m.cover.is_none());
    let ms = m.duration.as_millis();
    assert!((900..=1100).contains(&ms), "duration was {ms}ms");
}

#[test]
fn cover_bytes_are_decoded_and_downscaled() {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(600, 300));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let cover = decode_cover_bytes(&buf, 256).unwrap();
    assert_eq!((cover.width(), cover.height()), (256, 128));

    let small = decode_cover_bytes(&buf, 1024).unwrap();
    assert_eq!((small.width(), small.height()), (600, 300));

    assert!(decode_cover_bytes(b"not an image", 256).is_none());
}

// --- scanner ---

#[test]
fn is_audio_file_matches_allow_list_case_insensitive() {
    let settings = LibrarySettings::default();
    for ok in [
        "a.mp3", "a.MP3", "a.flac", "a.ogg", "a.oga", "a.Opus", "a.m4a", "a.aac", "a.wav",
        "a.wma", "a.ALAC",
    ] {
        assert!(is_audio_file(Path::new(ok), &settings), "{ok}");
    }
    for bad in ["a.txt", "a", "mp3", "a.mp3.part"] {
        assert!(!is_audio_file(Path::new(bad), &settings), "{bad}");
    }
}

#[test]
fn scan_is_breadth_first_and_sorted_within_a_directory() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("a_dir/deeper")).unwrap();
    fs::write(root.join("b.mp3"), b"x").unwrap();
    fs::write(root.join("c.FLAC"), b"x").unwrap();
    fs::write(root.join("notes.txt"), b"x").unwrap();
    fs::write(root.join("a_dir/x.ogg"), b"x").unwrap();
    fs::write(root.join("a_dir/deeper/y.wav"), b"x").unwrap();

    let events = scan_events(root, LibrarySettings::default(), MetadataSettings::default());
    assert_eq!(
        discovered_names(&events, root),
        vec!["b.mp3", "c.FLAC", "a_dir/x.ogg", "a_dir/deeper/y.wav"]
    );

    match events.last() {
        Some(ScanEvent::Finished(s)) => {
            assert_eq!(s.files, 4);
            assert_eq!(s.directories, 3);
            assert_eq!(s.skipped_directories, 0);
            assert!(!s.cancelled);
        }
        other => panic!("expected Finished last, got {other:?}"),
    }
}

#[test]
fn scan_skips_hidden_files_and_directories() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join(".cache/sub")).unwrap();
    fs::write(root.join(".hidden.mp3"), b"x").unwrap();
    fs::write(root.join(".cache/sub/in_hidden.mp3"), b"x").unwrap();
    fs::write(root.join("visible.mp3"), b"x").unwrap();

    let events = scan_events(root, LibrarySettings::default(), MetadataSettings::default());
    assert_eq!(discovered_names(&events, root), vec!["visible.mp3"]);

    let with_hidden = LibrarySettings {
        include_hidden: true,
        ..LibrarySettings::default()
    };
    let events = scan_events(root, with_hidden, MetadataSettings::default());
    assert_eq!(discovered_names(&events, root).len(), 3);
}

#[test]
fn scan_respects_max_depth() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("d1/d2")).unwrap();
    fs::write(root.join("root.mp3"), b"x").unwrap();
    fs::write(root.join("d1/one.mp3"), b"x").unwrap();
    fs::write(root.join("d1/d2/two.mp3"), b"x").unwrap();

    let settings = LibrarySettings {
        max_depth: Some(1),
        ..LibrarySettings::default()
    };
    let events = scan_events(root, settings, MetadataSettings::default());
    assert_eq!(discovered_names(&events, root), vec!["root.mp3", "d1/one.mp3"]);
}

#[test]
fn unreadable_root_is_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let events = scan_events(&missing, LibrarySettings::default(), MetadataSettings::default());
    assert_eq!(events.len(), 1);
    match &events[0] {
        ScanEvent::Finished(s) => {
            assert_eq!(s.files, 0);
            assert_eq!(s.skipped_directories, 1);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn symlink_cycles_terminate_and_visit_once() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("sub/song.mp3"), b"x").unwrap();
    std::os::unix::fs::symlink(root, root.join("sub/loop")).unwrap();

    let events = scan_events(root, LibrarySettings::default(), MetadataSettings::default());
    assert_eq!(discovered_names(&events, root), vec!["sub/song.mp3"]);
}

#[test]
fn cancelled_scan_posts_nothing_but_the_summary() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), b"x").unwrap();

    let (tx, rx) = mpsc::channel();
    let token = CancelToken::new();
    token.cancel();
    let summary = Scanner::new(LibrarySettings::default(), MetadataSettings::default())
        .run(dir.path(), &tx, &token);
    drop(tx);

    assert!(summary.cancelled);
    assert_eq!(summary.files, 0);
    assert_eq!(rx.into_iter().count(), 0);
}

#[test]
fn spawned_scan_posts_discovery_before_resolution_and_finishes_last() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("album")).unwrap();
    write_wav(&root.join("album/one.wav"), 1);
    write_wav(&root.join("two.wav"), 1);
    fs::write(root.join("junk.flac"), b"x").unwrap();

    for workers in [0, 2] {
        let metadata = MetadataSettings {
            workers,
            ..MetadataSettings::default()
        };
        let (tx, rx) = mpsc::channel();
        let handle = Scanner::new(LibrarySettings::default(), metadata)
            .spawn(root.to_path_buf(), tx)
            .unwrap();
        let events: Vec<ScanEvent> = rx.into_iter().collect();
        // The sender is dropped as the worker returns.
        while !handle.is_finished() {
            std::thread::sleep(Duration::from_millis(1));
        }
        handle.join();

        assert!(matches!(events.last(), Some(ScanEvent::Finished(s)) if s.files == 3));

        let mut seen: Vec<PathBuf> = Vec::new();
        let mut resolved = 0;
        for e in &events {
            match e {
                ScanEvent::Discovered(t) => seen.push(t.path.clone()),
                ScanEvent::Resolved { path, metadata } => {
                    assert!(seen.contains(path), "resolved before discovered: {path:?}");
                    assert!(metadata.duration > Duration::ZERO);
                    resolved += 1;
                }
                ScanEvent::Finished(_) => {}
            }
        }
        // junk.flac fails to probe and posts no update.
        assert_eq!(resolved, 2, "workers = {workers}");
    }
}
