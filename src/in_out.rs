//! File input/output: the measurement export reader and JSON persistence.
//!
//! Overview
//! -----------------
//! Two surfaces live here, both thin wrappers around the in-memory types:
//!
//! * [`read_export`] parses the whitespace-delimited text export of the
//!   measurement device into [`Observation`]s, ready for
//!   [`group_by_stage`](crate::observations::group_by_stage).
//! * The `write_*`/`read_*` pairs persist the export-surface maps
//!   ([`CoordinateMap`], [`DistanceMap`]) as JSON. Positions are stored as
//!   plain `[x, y, z]` triples so the files match the historical layout and
//!   stay readable by the downstream plotting tools.
//!
//! The JSON surface is lossy by design: a gap and a real origin point both
//! serialize as `[0.0, 0.0, 0.0]`. Cleaning data read back from JSON
//! therefore goes through the sentinel-equality functions in
//! [`history`](crate::history).

use std::fs::File;
use std::io::{BufReader, BufWriter};

use ahash::RandomState;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{CoordinateMap, DistanceMap, Position};
use crate::observations::{from_export_line, Observation};
use crate::stagetrack_errors::StageTrackError;

/// On-disk shape of one position: a bare `[x, y, z]` triple.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
struct JsonPosition([f64; 3]);

impl From<&Position> for JsonPosition {
    fn from(p: &Position) -> Self {
        JsonPosition([p.x, p.y, p.z])
    }
}

impl From<JsonPosition> for Position {
    fn from(p: JsonPosition) -> Self {
        Position::new(p.0[0], p.0[1], p.0[2])
    }
}

/// Read a displacement export file into observations.
///
/// Every non-blank line must follow the export schema (see
/// [`Observation`]); blank lines are skipped. Rows are returned in file
/// order, which downstream grouping relies on.
///
/// Arguments
/// ---------
/// * `path`: the export text file
///
/// Return
/// ------
/// * `Ok(Vec<Observation>)` - all parsed rows in file order
/// * `Err(StageTrackError)` - I/O failure or a malformed row
pub fn read_export(path: &Utf8Path) -> Result<Vec<Observation>, StageTrackError> {
    let content = std::fs::read_to_string(path)?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(from_export_line)
        .collect()
}

/// Write a coordinate map as JSON, positions as `[x, y, z]` triples.
pub fn write_coordinate_map(
    path: &Utf8Path,
    coordinates: &CoordinateMap,
) -> Result<(), StageTrackError> {
    let encoded: HashMap<&str, Vec<JsonPosition>, RandomState> = coordinates
        .iter()
        .map(|(key, history)| {
            (
                key.as_str(),
                history.iter().map(JsonPosition::from).collect(),
            )
        })
        .collect();

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &encoded)?;
    Ok(())
}

/// Read a coordinate map written by [`write_coordinate_map`].
pub fn read_coordinate_map(path: &Utf8Path) -> Result<CoordinateMap, StageTrackError> {
    let reader = BufReader::new(File::open(path)?);
    let decoded: HashMap<String, Vec<JsonPosition>, RandomState> =
        serde_json::from_reader(reader)?;

    Ok(decoded
        .into_iter()
        .map(|(key, history)| (key, history.into_iter().map(Position::from).collect()))
        .collect())
}

/// Write a distance map as JSON.
pub fn write_distance_map(
    path: &Utf8Path,
    distances: &DistanceMap,
) -> Result<(), StageTrackError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, distances)?;
    Ok(())
}

/// Read a distance map written by [`write_distance_map`].
pub fn read_distance_map(path: &Utf8Path) -> Result<DistanceMap, StageTrackError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod test_in_out {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_export() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "M1 0.0 0.0 P1 10.0 20.0 30.0 0 0 0 0").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "M1 1.0 14.5 P1 10.5 20.0 30.0 0 0 0 0").unwrap();

        let path = Utf8Path::from_path(file.path()).unwrap();
        let observations = read_export(path).unwrap();

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].stage, 0);
        assert_eq!(observations[1].stage, 1);
        assert_eq!(observations[1].position, Position::new(10.5, 20.0, 30.0));
    }

    #[test]
    fn test_read_export_malformed_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "M1 0.0 0.0 P1 10.0 oops 30.0").unwrap();

        let path = Utf8Path::from_path(file.path()).unwrap();
        assert!(matches!(
            read_export(path),
            Err(StageTrackError::InvalidExportField { field: 5, .. })
        ));
    }
}
