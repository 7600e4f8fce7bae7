use crate::loader::{Dataset, Datasets};
use crate::models::campus::*;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f64::consts::PI;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const DEFAULT_SEED: u64 = 0x5710_D7_5EA7u64;
const STEP_MINUTES: i64 = 15;
const OPEN_HOUR: u32 = 7;
const CLOSE_HOUR: u32 = 22;
const GRID_COLS: usize = 8;
const GRID_ROWS: usize = 4;
/// Roughly one space in this many has no occupancy record.
const MISSING_RECORD_EVERY: u32 = 12;
const BUILDINGS: [(&str, &str, &[&str]); 2] = [
    ("B1", "Fisher Library", &["Level 2", "Level 3", "Level 4"]),
    ("B2", "Business School", &["Ground", "Level 1"]),
];

pub fn run(dir: &Path) -> Result<(), String> {
    let data = generate(DEFAULT_SEED);
    info!(
        "Demo data: writing {} building(s), {} floor(s), {} space(s), {} occupancy record(s), {} trend bucket(s) to {}",
        data.buildings.len(),
        data.floors.len(),
        data.spaces.len(),
        data.occupancy.len(),
        data.trend.len(),
        dir.display()
    );
    write_all(dir, &data)
}

pub fn generate(seed: u64) -> Datasets {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut data = Datasets::default();

    for (building_id, building_name, floor_names) in BUILDINGS {
        data.buildings.push(Building {
            building_id: BuildingId(building_id.to_string()),
            building_name: building_name.to_string(),
        });

        for (idx, floor_name) in floor_names.iter().enumerate() {
            let floor_id = FloorId(format!("{}-F{}", building_id, idx + 1));
            data.floors.push(Floor {
                floor_id: floor_id.clone(),
                floor_name: floor_name.to_string(),
                building_id: BuildingId(building_id.to_string()),
            });

            // quieter floors further up
            let busyness = (0.95 - 0.12 * idx as f64 + rng.random_range(-0.05..0.05)).clamp(0.2, 1.0);
            push_floor_spaces(&mut rng, &mut data, &floor_id, busyness);
            push_floor_trend(&mut rng, &mut data, &floor_id, busyness);
        }
    }

    data
}

fn space_type_for_row(row: usize) -> SpaceType {
    match row {
        0 => SpaceType::Room,
        r if r == GRID_ROWS - 1 => SpaceType::Pc,
        _ => SpaceType::Desk,
    }
}

fn push_floor_spaces(rng: &mut SmallRng, data: &mut Datasets, floor_id: &FloorId, busyness: f64) {
    let x_step = 100.0 / GRID_COLS as f64;
    let y_step = 100.0 / GRID_ROWS as f64;

    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            let space_type = space_type_for_row(row);
            let space_id = SpaceId(format!("{}-S{:02}", floor_id.0, row * GRID_COLS + col + 1));
            let x = (x_step * (col as f64 + 0.5) + rng.random_range(-2.0..2.0)).clamp(0.0, 100.0);
            // rooms along the top wall
            let y = (100.0 - y_step * (row as f64 + 0.5) + rng.random_range(-2.0..2.0)).clamp(0.0, 100.0);
            data.spaces.push(Space {
                space_id: space_id.clone(),
                floor_id: floor_id.clone(),
                space_type,
                x: round_to(x, 1),
                y: round_to(y, 1),
            });

            if rng.random_ratio(1, MISSING_RECORD_EVERY) {
                continue;
            }
            let occupied = if rng.random_bool(busyness.clamp(0.0, 1.0)) {
                Occupancy::Occupied
            } else {
                Occupancy::Free
            };
            data.occupancy.push(OccupancyRecord { space_id, occupied });
        }
    }
}

fn push_floor_trend(rng: &mut SmallRng, data: &mut Datasets, floor_id: &FloorId, busyness: f64) {
    let Some(day) = NaiveDate::from_ymd_opt(2025, 3, 10) else {
        return;
    };
    let Some(open) = NaiveTime::from_hms_opt(OPEN_HOUR, 0, 0) else {
        return;
    };
    let start = NaiveDateTime::new(day, open);
    let step = Duration::minutes(STEP_MINUTES);
    let day_len_hours = f64::from(CLOSE_HOUR - OPEN_HOUR);

    for space_type in SpaceType::ALL {
        let type_bias = match space_type {
            SpaceType::Room => 0.05,
            SpaceType::Desk => 0.0,
            SpaceType::Pc => -0.15,
        };
        let mut ts = start;
        while ts.hour() < CLOSE_HOUR {
            let hours_open = (ts - start).num_minutes() as f64 / 60.0;
            // single afternoon peak
            let shape = (PI * hours_open / day_len_hours).sin();
            let mean = (busyness * shape + type_bias + rng.random_range(-0.04..0.04)).clamp(0.0, 1.0);
            let p25 = (mean - rng.random_range(0.05..0.2)).clamp(0.0, mean);
            data.trend.push(TrendBucket {
                floor_id: floor_id.clone(),
                space_type,
                time_bucket: TimeBucket(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
                occ_rate_mean: round_to(mean, 3),
                occ_rate_p25: round_to(p25, 3),
            });
            ts += step;
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn write_all(dir: &Path, data: &Datasets) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|e| format!("create {} failed: {}", dir.display(), e))?;
    for dataset in Dataset::ALL {
        match dataset {
            Dataset::Buildings => write_dataset(dir, dataset, &data.buildings)?,
            Dataset::Floors => write_dataset(dir, dataset, &data.floors)?,
            Dataset::Spaces => write_dataset(dir, dataset, &data.spaces)?,
            Dataset::OccupancyLatest => write_dataset(dir, dataset, &data.occupancy)?,
            Dataset::Trend15Min => write_dataset(dir, dataset, &data.trend)?,
        }
    }
    Ok(())
}

fn write_dataset<T: Serialize>(dir: &Path, dataset: Dataset, rows: &[T]) -> Result<(), String> {
    let path = dir.join(dataset.file_name());
    let file = File::create(&path).map_err(|e| format!("create {} failed: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, rows).map_err(|e| format!("write {} failed: {}", path.display(), e))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| format!("write {} failed: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(generate(DEFAULT_SEED), generate(DEFAULT_SEED));
        assert_ne!(generate(1).occupancy, generate(2).occupancy);
    }

    #[test]
    fn generated_data_is_consistent() {
        let data = generate(DEFAULT_SEED);
        assert!(data.dangling_references().is_empty());

        for s in &data.spaces {
            assert!((0.0..=100.0).contains(&s.x) && (0.0..=100.0).contains(&s.y));
        }
        for t in &data.trend {
            assert!((0.0..=1.0).contains(&t.occ_rate_mean));
            assert!(t.occ_rate_p25 <= t.occ_rate_mean && t.occ_rate_p25 >= 0.0);
        }

        let types: HashSet<SpaceType> = data.spaces.iter().map(|s| s.space_type).collect();
        assert_eq!(types.len(), 3);
        // 07:00 .. 21:45 for each floor/type pair
        assert_eq!(data.trend.len(), data.floors.len() * 3 * 60);
    }

    #[test]
    fn some_spaces_have_no_latest_record() {
        let data = generate(DEFAULT_SEED);
        assert!(data.occupancy.len() < data.spaces.len());
    }

    #[test]
    fn written_files_load_back() {
        let dir = std::env::temp_dir().join(format!("study-space-demo-{}", std::process::id()));
        let data = generate(DEFAULT_SEED);
        write_all(&dir, &data).expect("write demo data");
        let loaded = Datasets::load_all(&dir).expect("load demo data");
        let _ = fs::remove_dir_all(&dir);
        assert_eq!(loaded.buildings, data.buildings);
        assert_eq!(loaded.spaces.len(), data.spaces.len());
        assert_eq!(loaded.trend.first(), data.trend.first());
    }
}
