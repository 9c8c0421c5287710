use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One row of the external song catalog (Spotify/YouTube export layout).
/// Only the columns the generator uses are declared; the rest are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CatalogRecord {
    #[serde(rename = "Track", default)]
    pub track: Option<String>,
    #[serde(rename = "Artist", default)]
    pub artist: Option<String>,
    #[serde(rename = "Album", default)]
    pub album: Option<String>,
    #[serde(rename = "Album_type", default)]
    pub album_type: Option<String>,
    #[serde(rename = "Duration_ms", default)]
    pub duration_ms: Option<String>,
}

impl CatalogRecord {
    /// Duration in whole seconds, or `None` when the field is missing or
    /// unparseable. Exports often write milliseconds as floats ("222640.0").
    /// Sub-second durations round up to 1 so songs never have zero length.
    pub fn duration_seconds(&self) -> Option<i32> {
        let raw = self.duration_ms.as_deref()?.trim();
        let millis: f64 = raw.parse().ok()?;

        if !millis.is_finite() || millis < 0.0 {
            return None;
        }

        let seconds = (millis / 1000.0).floor().min(i32::MAX as f64) as i32;
        Some(seconds.max(1))
    }
}

/// Read every usable row from the catalog file at `path`.
pub fn read_catalog(path: &Path) -> Result<Vec<CatalogRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open song catalog: {}", path.display()))?;

    let records = parse_catalog(file);
    log::info!(
        "Loaded {} catalog rows from {}",
        records.len(),
        path.display()
    );

    Ok(records)
}

/// Parse catalog CSV from any reader. Rows that cannot be decoded are
/// skipped with a warning; a bad row never aborts the load.
pub fn parse_catalog<R: Read>(reader: R) -> Vec<CatalogRecord> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in csv_reader.deserialize::<CatalogRecord>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping unreadable catalog row {}: {}", line + 2, e);
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} unreadable catalog rows", skipped);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
,Artist,Url_spotify,Track,Album,Album_type,Uri,Duration_ms,Views
0,Gorillaz,https://open.spotify.com/x,Feel Good Inc.,Demon Days,album,spotify:track:1,222640.0,693555221.0
1,Gorillaz,https://open.spotify.com/y,Rhinestone Eyes,Plastic Beach,album,spotify:track:2,,72011645.0
2,Gorillaz,https://open.spotify.com/z,New Gold,New Gold,single,spotify:track:3,not-a-number,8435055.0
";

    #[test]
    fn test_parse_catalog_reads_named_columns() {
        let records = parse_catalog(SAMPLE.as_bytes());

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].track.as_deref(), Some("Feel Good Inc."));
        assert_eq!(records[0].artist.as_deref(), Some("Gorillaz"));
        assert_eq!(records[0].album.as_deref(), Some("Demon Days"));
        assert_eq!(records[0].album_type.as_deref(), Some("album"));
        assert_eq!(records[2].album_type.as_deref(), Some("single"));
    }

    #[test]
    fn test_duration_seconds() {
        let records = parse_catalog(SAMPLE.as_bytes());

        assert_eq!(records[0].duration_seconds(), Some(222));
        // Empty and unparseable durations fall through to the generator fallback
        assert_eq!(records[1].duration_seconds(), None);
        assert_eq!(records[2].duration_seconds(), None);
    }

    #[test]
    fn test_duration_seconds_floors_at_one() {
        let record = CatalogRecord {
            duration_ms: Some("450".to_string()),
            ..Default::default()
        };
        assert_eq!(record.duration_seconds(), Some(1));

        let negative = CatalogRecord {
            duration_ms: Some("-1000".to_string()),
            ..Default::default()
        };
        assert_eq!(negative.duration_seconds(), None);
    }

    #[test]
    fn test_missing_columns_are_tolerated() {
        let csv = "Track,Artist\nOnly Title,Someone\n";
        let records = parse_catalog(csv.as_bytes());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].track.as_deref(), Some("Only Title"));
        assert!(records[0].album.is_none());
        assert!(records[0].duration_ms.is_none());
    }

    #[test]
    fn test_ragged_rows_are_not_fatal() {
        let csv = "Track,Artist,Album,Album_type,Duration_ms\n\
                   Song A,Artist A,Album A,album,180000\n\
                   Song B,Artist B\n";
        let records = parse_catalog(csv.as_bytes());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].duration_seconds(), Some(180));
        assert_eq!(records[1].track.as_deref(), Some("Song B"));
        assert!(records[1].duration_seconds().is_none());
    }

    #[test]
    fn test_read_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let records = read_catalog(file.path()).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_read_catalog_missing_file() {
        let result = read_catalog(Path::new("/nonexistent/catalog.csv"));
        assert!(result.is_err());
    }
}
