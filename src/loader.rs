//! Reads the static study-space datasets from a data directory.
//!
//! - Blocking `std::fs` reads, one file per dataset.
//! - Records keep their source order.
//! - Failures are fatal to the caller; nothing here retries or falls back.

use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::campus::*;

/// The five fixed datasets the dashboard reads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Dataset {
    Buildings,
    Floors,
    Spaces,
    OccupancyLatest,
    Trend15Min,
}

impl Dataset {
    pub const ALL: [Dataset; 5] = [
        Dataset::Buildings,
        Dataset::Floors,
        Dataset::Spaces,
        Dataset::OccupancyLatest,
        Dataset::Trend15Min,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Dataset::Buildings => "buildings.json",
            Dataset::Floors => "floors.json",
            Dataset::Spaces => "spaces.json",
            Dataset::OccupancyLatest => "occupancy_latest.json",
            Dataset::Trend15Min => "trend_15min.json",
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    /// The dataset file is missing or could not be read
    DataUnavailable {
        dataset: Dataset,
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not valid JSON or does not match the record schema
    DataMalformed {
        dataset: Dataset,
        path: PathBuf,
        source: serde_path_to_error::Error<serde_json::Error>,
    },
}

impl core::fmt::Display for LoadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LoadError::DataUnavailable { dataset, path, source } => {
                write!(f, "{} unavailable ({}): {}", dataset.file_name(), path.display(), source)
            }
            LoadError::DataMalformed { dataset, path, source } => {
                let at = source.path().to_string();
                write!(
                    f,
                    "{} malformed ({}) at `{}`: {}",
                    dataset.file_name(),
                    path.display(),
                    at,
                    source.inner()
                )
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::DataUnavailable { source, .. } => Some(source),
            LoadError::DataMalformed { source, .. } => Some(source.inner()),
        }
    }
}

/// Load one dataset as an ordered list of records.
pub fn load<T: DeserializeOwned>(dir: &Path, dataset: Dataset) -> Result<Vec<T>, LoadError> {
    let path = dir.join(dataset.file_name());
    let raw = std::fs::read_to_string(&path).map_err(|source| LoadError::DataUnavailable {
        dataset,
        path: path.clone(),
        source,
    })?;
    parse(&raw).map_err(|source| LoadError::DataMalformed { dataset, path, source })
}

fn parse<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, serde_path_to_error::Error<serde_json::Error>> {
    let de = &mut serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(de)
}

/// Everything the dashboard reads, loaded once and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datasets {
    pub buildings: Vec<Building>,
    pub floors: Vec<Floor>,
    pub spaces: Vec<Space>,
    pub occupancy: Vec<OccupancyRecord>,
    pub trend: Vec<TrendBucket>,
}

impl Datasets {
    pub fn load_all(dir: &Path) -> Result<Self, LoadError> {
        Ok(Datasets {
            buildings: load(dir, Dataset::Buildings)?,
            floors: load(dir, Dataset::Floors)?,
            spaces: load(dir, Dataset::Spaces)?,
            occupancy: load(dir, Dataset::OccupancyLatest)?,
            trend: load(dir, Dataset::Trend15Min)?,
        })
    }

    pub fn record_count(&self, dataset: Dataset) -> usize {
        match dataset {
            Dataset::Buildings => self.buildings.len(),
            Dataset::Floors => self.floors.len(),
            Dataset::Spaces => self.spaces.len(),
            Dataset::OccupancyLatest => self.occupancy.len(),
            Dataset::Trend15Min => self.trend.len(),
        }
    }

    /// Foreign keys that point nowhere. These are ignored by the pipeline; the
    /// report only exists so they can be logged.
    pub fn dangling_references(&self) -> DanglingReferences {
        let building_ids: HashSet<&BuildingId> = self.buildings.iter().map(|b| &b.building_id).collect();
        let floor_ids: HashSet<&FloorId> = self.floors.iter().map(|f| &f.floor_id).collect();
        let space_ids: HashSet<&SpaceId> = self.spaces.iter().map(|s| &s.space_id).collect();

        DanglingReferences {
            floors: self
                .floors
                .iter()
                .filter(|f| !building_ids.contains(&f.building_id))
                .map(|f| f.floor_id.clone())
                .collect(),
            spaces: self
                .spaces
                .iter()
                .filter(|s| !floor_ids.contains(&s.floor_id))
                .map(|s| s.space_id.clone())
                .collect(),
            occupancy: self
                .occupancy
                .iter()
                .filter(|o| !space_ids.contains(&o.space_id))
                .map(|o| o.space_id.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DanglingReferences {
    /// Floors whose building does not exist
    pub floors: Vec<FloorId>,
    /// Spaces whose floor does not exist
    pub spaces: Vec<SpaceId>,
    /// Occupancy records for spaces that do not exist
    pub occupancy: Vec<SpaceId>,
}

impl DanglingReferences {
    pub fn is_empty(&self) -> bool {
        self.floors.is_empty() && self.spaces.is_empty() && self.occupancy.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURES: &str = "tests/data";

    #[test]
    fn loads_fixture_directory_in_source_order() {
        let data = Datasets::load_all(Path::new(FIXTURES)).expect("fixtures load");
        assert_eq!(data.buildings.len(), 2);
        assert_eq!(data.buildings[0].building_id, BuildingId("B1".into()));
        assert_eq!(data.floors[0].floor_id, FloorId("F1".into()));
        assert_eq!(data.spaces[2].space_id, SpaceId("S3".into()));
        assert_eq!(data.trend[0].time_bucket, TimeBucket("2025-03-10 09:00:00".into()));
        assert_eq!(data.record_count(Dataset::OccupancyLatest), data.occupancy.len());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = load::<Building>(Path::new("tests/data/does-not-exist"), Dataset::Buildings).unwrap_err();
        assert!(matches!(err, LoadError::DataUnavailable { dataset: Dataset::Buildings, .. }));
        assert!(err.to_string().starts_with("buildings.json unavailable"));
    }

    #[test]
    fn schema_mismatch_reports_json_path() {
        let err = parse::<Space>(r#"[{"space_id":"S1","floor_id":"F1","space_type":"sofa","x":1,"y":2}]"#)
            .unwrap_err();
        assert_eq!(err.path().to_string(), "[0].space_type");

        let err = parse::<OccupancyRecord>(r#"{"space_id":"S1"}"#).unwrap_err();
        assert!(err.inner().is_data());
    }

    #[test]
    fn dangling_references_are_collected() {
        let mut data = Datasets::load_all(Path::new(FIXTURES)).expect("fixtures load");
        data.occupancy.push(OccupancyRecord {
            space_id: SpaceId("GHOST".into()),
            occupied: Occupancy::Occupied,
        });
        let report = data.dangling_references();
        assert_eq!(report.occupancy, vec![SpaceId("S99".into()), SpaceId("GHOST".into())]);
        assert!(report.floors.is_empty());
        assert!(!report.is_empty());
    }
}
