//! Models for the five static study-space datasets.
//!
//! Scope: types only — no loading or filtering code.
//!
//! Notes
//! - Field names match the JSON produced by the data pipeline exactly.
//! - `occupied` is delivered as `0`/`1`; some exports use `1.0` or booleans instead, all are accepted.
//! - `time_bucket` is kept verbatim; `TimeBucket::parse` recovers a timestamp when it has one.

use chrono::{DateTime, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloorId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(pub String);

macro_rules! impl_id_str {
    ($($t:ty),*) => {$(
        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }
    )*};
}

impl_id_str!(BuildingId, FloorId, SpaceId);

// =====================
// Enums
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    #[default]
    Desk,
    Room,
    Pc,
}

impl SpaceType {
    /// Selector order used by the dashboard.
    pub const ALL: [SpaceType; 3] = [SpaceType::Desk, SpaceType::Room, SpaceType::Pc];

    pub fn as_str(self) -> &'static str {
        match self {
            SpaceType::Desk => "desk",
            SpaceType::Room => "room",
            SpaceType::Pc => "pc",
        }
    }
}

impl AsRef<str> for SpaceType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl core::fmt::Display for SpaceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known status of a single space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Occupancy {
    // 0=free, 1=occupied
    #[default]
    Free,
    Occupied,
}

impl Occupancy {
    pub fn is_occupied(self) -> bool {
        matches!(self, Occupancy::Occupied)
    }

    pub fn label(self) -> &'static str {
        match self {
            Occupancy::Free => "Free",
            Occupancy::Occupied => "Occupied",
        }
    }
}

impl serde::Serialize for Occupancy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let n: u8 = match self {
            Occupancy::Free => 0,
            Occupancy::Occupied => 1,
        };
        serializer.serialize_u8(n)
    }
}

impl<'de> serde::Deserialize<'de> for Occupancy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = Occupancy;

            fn expecting(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                write!(f, "0, 1 or a boolean for occupied")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match value {
                    0 => Ok(Occupancy::Free),
                    1 => Ok(Occupancy::Occupied),
                    other => Err(E::invalid_value(serde::de::Unexpected::Signed(other), &self)),
                }
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match value {
                    0 => Ok(Occupancy::Free),
                    1 => Ok(Occupancy::Occupied),
                    other => Err(E::invalid_value(serde::de::Unexpected::Unsigned(other), &self)),
                }
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                // pandas exports integer columns with missing values as floats
                if value == 0.0 {
                    Ok(Occupancy::Free)
                } else if value == 1.0 {
                    Ok(Occupancy::Occupied)
                } else {
                    Err(E::invalid_value(serde::de::Unexpected::Float(value), &self))
                }
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(if value { Occupancy::Occupied } else { Occupancy::Free })
            }
        }

        deserializer.deserialize_any(V)
    }
}

// =====================
// Records
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub building_id: BuildingId,
    pub building_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub floor_id: FloorId,
    pub floor_name: String,
    pub building_id: BuildingId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub space_id: SpaceId,
    pub floor_id: FloorId,
    pub space_type: SpaceType,
    /// Horizontal position on the floor plan, 0..=100.
    pub x: f64,
    /// Vertical position on the floor plan, 0..=100.
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyRecord {
    pub space_id: SpaceId,
    pub occupied: Occupancy,
}

/// Label of a 15-minute trend window as delivered by the producer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeBucket(pub String);

impl TimeBucket {
    /// Best-effort timestamp for the bucket; `None` when the label is free text.
    pub fn parse(&self) -> Option<NaiveDateTime> {
        let raw = self.0.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }
        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }

    /// Short axis label: `HH:MM` for timestamps and times of day, the raw label otherwise.
    pub fn axis_label(&self) -> String {
        if let Some(dt) = self.parse() {
            return dt.format("%H:%M").to_string();
        }
        match NaiveTime::parse_from_str(self.0.trim(), "%H:%M") {
            Ok(t) => t.format("%H:%M").to_string(),
            Err(_) => self.0.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendBucket {
    pub floor_id: FloorId,
    pub space_type: SpaceType,
    pub time_bucket: TimeBucket,
    pub occ_rate_mean: f64,
    pub occ_rate_p25: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_accepts_integers_and_booleans() {
        let rec: OccupancyRecord = serde_json::from_str(r#"{"space_id":"S1","occupied":1}"#).unwrap();
        assert_eq!(rec.occupied, Occupancy::Occupied);
        let rec: OccupancyRecord = serde_json::from_str(r#"{"space_id":"S1","occupied":false}"#).unwrap();
        assert_eq!(rec.occupied, Occupancy::Free);
        assert!(serde_json::from_str::<OccupancyRecord>(r#"{"space_id":"S1","occupied":2}"#).is_err());
    }

    #[test]
    fn occupancy_accepts_whole_floats_only() {
        let rec: OccupancyRecord = serde_json::from_str(r#"{"space_id":"S1","occupied":1.0}"#).unwrap();
        assert_eq!(rec.occupied, Occupancy::Occupied);
        let rec: OccupancyRecord = serde_json::from_str(r#"{"space_id":"S1","occupied":0.0}"#).unwrap();
        assert_eq!(rec.occupied, Occupancy::Free);
        assert!(serde_json::from_str::<OccupancyRecord>(r#"{"space_id":"S1","occupied":0.5}"#).is_err());
    }

    #[test]
    fn occupancy_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Occupancy::Occupied).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Occupancy::Free).unwrap(), "0");
    }

    #[test]
    fn space_type_is_lowercase_on_the_wire() {
        let t: SpaceType = serde_json::from_str(r#""pc""#).unwrap();
        assert_eq!(t, SpaceType::Pc);
        assert!(serde_json::from_str::<SpaceType>(r#""sofa""#).is_err());
        assert_eq!(SpaceType::Room.to_string(), "room");
    }

    #[test]
    fn time_bucket_axis_labels() {
        assert_eq!(TimeBucket("2025-03-10 09:15:00".into()).axis_label(), "09:15");
        assert_eq!(TimeBucket("2025-03-10T13:45:00+11:00".into()).axis_label(), "13:45");
        assert_eq!(TimeBucket("9:00".into()).axis_label(), "09:00");
        assert_eq!(TimeBucket("morning".into()).axis_label(), "morning");
        assert!(TimeBucket("morning".into()).parse().is_none());
    }
}
