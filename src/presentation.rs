//! Chart specifications handed to the renderer.
//!
//! Everything here is a pure mapping from pipeline output; empty input gives
//! empty charts, never an error.

use serde::Serialize;

use crate::models::campus::{Space, SpaceType, TimeBucket, TrendBucket};
use crate::services::pipeline::{OccupancyMap, PipelineResult};

/// Side length of the floor-plan coordinate plane.
pub const MAP_EXTENT: f64 = 100.0;
pub const MAP_HEIGHT: u32 = 420;
pub const MARKER_SIZE: u32 = 12;
pub const TREND_HEIGHT: u32 = 300;
pub const NO_TREND_MESSAGE: &str = "No trend data for this selection.";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Occupied,
    Free,
}

impl MarkerColor {
    pub fn css(self) -> &'static str {
        match self {
            MarkerColor::Occupied => "red",
            MarkerColor::Free => "blue",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerShape {
    Room,
    Other,
}

impl MarkerShape {
    pub fn symbol(self) -> &'static str {
        match self {
            MarkerShape::Room => "square",
            MarkerShape::Other => "circle",
        }
    }
}

/// Caption explaining the marker encoding.
pub fn legend() -> String {
    format!(
        "Colors encode status ({}=occupied, {}=free). Shapes encode type ({}=desk/pc, {}=room).",
        MarkerColor::Occupied.css(),
        MarkerColor::Free.css(),
        MarkerShape::Other.symbol(),
        MarkerShape::Room.symbol()
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub x: f64,
    pub y: f64,
    pub color: MarkerColor,
    pub shape: MarkerShape,
    /// Hover text, e.g. `S1 • room • Occupied`
    pub label: String,
}

pub fn to_markers(spaces: &[&Space], occupancy: &OccupancyMap<'_>) -> Vec<Marker> {
    spaces
        .iter()
        .map(|s| {
            let status = occupancy.status(&s.space_id);
            Marker {
                x: s.x,
                y: s.y,
                color: if status.is_occupied() { MarkerColor::Occupied } else { MarkerColor::Free },
                shape: if s.space_type == SpaceType::Room { MarkerShape::Room } else { MarkerShape::Other },
                label: format!("{} • {} • {}", s.space_id, s.space_type, status.label()),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: &'static str,
    pub points: Vec<(TimeBucket, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendLines {
    pub mean: Series,
    pub p25: Series,
}

pub fn to_series(trend: &[&TrendBucket]) -> TrendLines {
    TrendLines {
        mean: Series {
            name: "mean",
            points: trend.iter().map(|t| (t.time_bucket.clone(), t.occ_rate_mean)).collect(),
        },
        p25: Series {
            name: "p25",
            points: trend.iter().map(|t| (t.time_bucket.clone(), t.occ_rate_p25)).collect(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub range: [f64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_format: Option<&'static str>,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloorMapChart {
    pub x_axis: Axis,
    pub y_axis: Axis,
    /// One unit on x equals one unit on y
    pub lock_aspect: bool,
    pub height: u32,
    pub marker_size: u32,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrendChart {
    Lines { y_axis: Axis, height: u32, series: TrendLines },
    NoData { message: &'static str },
}

pub fn floor_map_chart(result: &PipelineResult<'_>) -> FloorMapChart {
    let plane = Axis {
        range: [0.0, MAP_EXTENT],
        tick_format: None,
        visible: false,
    };
    FloorMapChart {
        x_axis: plane.clone(),
        y_axis: plane,
        lock_aspect: true,
        height: MAP_HEIGHT,
        marker_size: MARKER_SIZE,
        markers: to_markers(&result.spaces, &result.occupancy),
    }
}

pub fn trend_chart(result: &PipelineResult<'_>) -> TrendChart {
    if result.trend.is_empty() {
        return TrendChart::NoData {
            message: NO_TREND_MESSAGE,
        };
    }
    TrendChart::Lines {
        y_axis: Axis {
            range: [0.0, 1.0],
            tick_format: Some(".0%"),
            visible: true,
        },
        height: TREND_HEIGHT,
        series: to_series(&result.trend),
    }
}
