//! Filter-and-aggregate pass behind every dashboard render.
//!
//! `evaluate` is a pure function of the datasets and the selection; the shell
//! calls it again from scratch after every interaction.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::loader::Datasets;
use crate::models::campus::{Floor, FloorId, Occupancy, OccupancyRecord, Space, SpaceId, SpaceType, TrendBucket};
use crate::selection::Selection;

/// Mean occupancy above which students start queueing for a seat.
pub const WAIT_THRESHOLD: f64 = 0.85;
/// Minutes of wait per unit of occupancy above the threshold (full occupancy ≈ 5 min).
pub const WAIT_SCALE_MINUTES: f64 = 30.0;

/// Latest occupancy per space. Lookups are total: unknown spaces are free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OccupancyMap<'a>(BTreeMap<&'a SpaceId, Occupancy>);

impl<'a> OccupancyMap<'a> {
    /// Later records for the same space replace earlier ones.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a OccupancyRecord>,
    {
        OccupancyMap(records.into_iter().map(|r| (&r.space_id, r.occupied)).collect())
    }

    pub fn status(&self, space_id: &SpaceId) -> Occupancy {
        self.0.get(space_id).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total: usize,
    pub occupied: usize,
    pub free: usize,
    pub free_rooms: usize,
    /// occupied / total, 0.0 for an empty floor
    pub occ_rate: f64,
    /// First trend bucket's mean, or `occ_rate` when there is no trend
    pub mean_occ: f64,
    pub wait_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult<'a> {
    /// Floors of the selected building
    pub floors: Vec<&'a Floor>,
    /// Floor the slices below were resolved against; `None` when the selected
    /// floor does not belong to the selected building
    pub floor_id: Option<&'a FloorId>,
    pub space_type: SpaceType,
    pub spaces: Vec<&'a Space>,
    pub occupancy: OccupancyMap<'a>,
    pub trend: Vec<&'a TrendBucket>,
    pub kpis: Kpis,
}

pub fn evaluate<'a>(data: &'a Datasets, selection: &Selection) -> PipelineResult<'a> {
    let floors: Vec<&Floor> = match &selection.building_id {
        Some(building_id) => data.floors.iter().filter(|f| &f.building_id == building_id).collect(),
        None => Vec::new(),
    };

    // A floor left over from a previous building counts as no floor at all.
    let floor_id = selection
        .floor_id
        .as_ref()
        .and_then(|id| floors.iter().copied().find(|f| &f.floor_id == id))
        .map(|f| &f.floor_id);

    let spaces: Vec<&Space> = match floor_id {
        Some(id) => data.spaces.iter().filter(|s| &s.floor_id == id).collect(),
        None => Vec::new(),
    };

    let occupancy = OccupancyMap::from_records(&data.occupancy);

    let trend: Vec<&TrendBucket> = match floor_id {
        Some(id) => data
            .trend
            .iter()
            .filter(|t| &t.floor_id == id && t.space_type == selection.space_type)
            .collect(),
        None => Vec::new(),
    };

    let kpis = compute_kpis(&spaces, &occupancy, &trend);

    PipelineResult {
        floors,
        floor_id,
        space_type: selection.space_type,
        spaces,
        occupancy,
        trend,
        kpis,
    }
}

fn compute_kpis(spaces: &[&Space], occupancy: &OccupancyMap<'_>, trend: &[&TrendBucket]) -> Kpis {
    let total = spaces.len();
    let occupied = spaces
        .iter()
        .filter(|s| occupancy.status(&s.space_id).is_occupied())
        .count();
    let free_rooms = spaces
        .iter()
        .filter(|s| s.space_type == SpaceType::Room && !occupancy.status(&s.space_id).is_occupied())
        .count();
    let occ_rate = if total > 0 { occupied as f64 / total as f64 } else { 0.0 };
    let mean_occ = trend.first().map(|t| t.occ_rate_mean).unwrap_or(occ_rate);

    Kpis {
        total,
        occupied,
        free: total - occupied,
        free_rooms,
        occ_rate,
        mean_occ,
        wait_minutes: estimate_wait_minutes(mean_occ),
    }
}

/// `max(0, round((mean_occ - 0.85) * 30))`, rounding halves to even.
pub fn estimate_wait_minutes(mean_occ: f64) -> u32 {
    let minutes = ((mean_occ - WAIT_THRESHOLD) * WAIT_SCALE_MINUTES).round_ties_even();
    if minutes > 0.0 { minutes as u32 } else { 0 }
}
