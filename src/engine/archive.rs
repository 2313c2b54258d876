// src/engine/archive.rs
//
// ZIP export of converted results. WebP payloads are already compressed,
// so deflate runs at a moderate level; byte-exact round trips matter more
// than ratio.

use crate::engine::converter::ConversionResult;
use crate::error::ConvertError;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

const DEFLATE_LEVEL: i64 = 6;

/// What to do when two sources map to the same `<stem>.webp` entry name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Append `-1`, `-2`, ... before `.webp` so no entry is lost
    #[default]
    AutoSuffix,
    /// Later entry replaces the earlier one
    LastWins,
}

/// Package converted outputs into a single deflate-compressed ZIP.
///
/// Each result is stored under its source name with the extension replaced
/// by `.webp`. Fails with an archive-class error only; the individual
/// results remain valid and downloadable.
pub fn pack(
    results: &[ConversionResult],
    policy: CollisionPolicy,
) -> Result<Vec<u8>, ConvertError> {
    let mut entries: Vec<(String, &[u8])> = Vec::with_capacity(results.len());
    let mut used: HashSet<String> = HashSet::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for result in results {
        let name = webp_file_name(&result.source_name);
        match policy {
            CollisionPolicy::LastWins => {
                if let Some(&index) = positions.get(&name) {
                    entries[index].1 = &result.output_bytes;
                } else {
                    positions.insert(name.clone(), entries.len());
                    entries.push((name, &result.output_bytes));
                }
            }
            CollisionPolicy::AutoSuffix => {
                let stem = name.strip_suffix(".webp").unwrap_or(&name).to_string();
                let mut candidate = name.clone();
                let mut counter = 1;
                while used.contains(&candidate) {
                    candidate = format!("{stem}-{counter}.webp");
                    counter += 1;
                }
                used.insert(candidate.clone());
                entries.push((candidate, &result.output_bytes));
            }
        }
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(DEFLATE_LEVEL));

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in &entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| ConvertError::archive_failed(e.to_string()))?;
        writer
            .write_all(bytes)
            .map_err(|e| ConvertError::archive_failed(e.to_string()))?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| ConvertError::archive_failed(e.to_string()))?;

    debug!(entries = entries.len(), "archive packed");
    Ok(cursor.into_inner())
}

/// Replace a source file name's extension with `.webp`. Names without an
/// extension (or leading-dot names) are kept whole.
pub fn webp_file_name(source_name: &str) -> String {
    let stem = match source_name.rfind('.') {
        Some(0) | None => source_name,
        Some(index) => &source_name[..index],
    };
    format!("{stem}.webp")
}

/// Download name for an export produced today (UTC).
pub fn archive_file_name() -> String {
    archive_file_name_for(chrono::Utc::now().date_naive())
}

/// Download name for an export produced on the given date.
pub fn archive_file_name_for(date: NaiveDate) -> String {
    format!("converted-images-{}.zip", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ConversionSettings;
    use std::io::Read;

    fn result_named(source_name: &str, payload: &[u8]) -> ConversionResult {
        ConversionResult {
            source_name: source_name.to_string(),
            source_byte_size: payload.len() * 2,
            output_bytes: payload.to_vec(),
            output_byte_size: payload.len(),
            reduction_percent: 50.0,
            settings_used: ConversionSettings::default(),
        }
    }

    fn read_entry(archive: &[u8], name: &str) -> Vec<u8> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pack_round_trips_every_entry() {
        let results = vec![
            result_named("photo.png", b"first-webp-bytes"),
            result_named("scan.jpeg", b"second-webp-bytes"),
            result_named("sticker.gif", b"third-webp-bytes"),
        ];
        let archive = pack(&results, CollisionPolicy::AutoSuffix).unwrap();

        let zip = zip::ZipArchive::new(Cursor::new(archive.clone())).unwrap();
        assert_eq!(zip.len(), 3);
        assert_eq!(read_entry(&archive, "photo.webp"), b"first-webp-bytes");
        assert_eq!(read_entry(&archive, "scan.webp"), b"second-webp-bytes");
        assert_eq!(read_entry(&archive, "sticker.webp"), b"third-webp-bytes");
    }

    #[test]
    fn test_pack_empty_is_valid_archive() {
        let archive = pack(&[], CollisionPolicy::AutoSuffix).unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn test_collision_auto_suffix() {
        let results = vec![
            result_named("photo.png", b"one"),
            result_named("photo.jpeg", b"two"),
            result_named("photo.gif", b"three"),
        ];
        let archive = pack(&results, CollisionPolicy::AutoSuffix).unwrap();
        assert_eq!(read_entry(&archive, "photo.webp"), b"one");
        assert_eq!(read_entry(&archive, "photo-1.webp"), b"two");
        assert_eq!(read_entry(&archive, "photo-2.webp"), b"three");
    }

    #[test]
    fn test_collision_last_wins() {
        let results = vec![
            result_named("photo.png", b"one"),
            result_named("photo.jpeg", b"two"),
        ];
        let archive = pack(&results, CollisionPolicy::LastWins).unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(archive.clone())).unwrap();
        assert_eq!(zip.len(), 1);
        assert_eq!(read_entry(&archive, "photo.webp"), b"two");
    }

    #[test]
    fn test_webp_file_name() {
        assert_eq!(webp_file_name("photo.png"), "photo.webp");
        assert_eq!(webp_file_name("archive.tar.gz"), "archive.tar.webp");
        assert_eq!(webp_file_name("noextension"), "noextension.webp");
        assert_eq!(webp_file_name(".hidden"), ".hidden.webp");
    }

    #[test]
    fn test_archive_file_name_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        assert_eq!(
            archive_file_name_for(date),
            "converted-images-2026-08-23.zip"
        );
        assert!(archive_file_name().starts_with("converted-images-"));
        assert!(archive_file_name().ends_with(".zip"));
    }
}
