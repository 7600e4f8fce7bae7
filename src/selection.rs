//! The building → floor → space type selection cascade.
//!
//! A `Selection` is a plain value. Every user choice produces a new one; the
//! previous value is never edited in place.

use serde::Serialize;

use crate::loader::Datasets;
use crate::models::campus::{BuildingId, FloorId, SpaceType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub building_id: Option<BuildingId>,
    pub floor_id: Option<FloorId>,
    pub space_type: SpaceType,
}

/// One entry of a selector: the key the pipeline filters on and the label shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption<K> {
    pub key: K,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Building,
    Floor,
    SpaceType,
}

impl Level {
    pub fn name(self) -> &'static str {
        match self {
            Level::Building => "building",
            Level::Floor => "floor",
            Level::SpaceType => "space type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChoice {
    pub level: Level,
    pub choice: String,
    /// Keys that would have been accepted
    pub available: Vec<String>,
}

impl core::fmt::Display for UnknownChoice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.available.is_empty() {
            write!(f, "unknown {} `{}` (no options available)", self.level.name(), self.choice)
        } else {
            write!(
                f,
                "unknown {} `{}` (expected one of: {})",
                self.level.name(),
                self.choice,
                self.available.join(", ")
            )
        }
    }
}

impl std::error::Error for UnknownChoice {}

pub fn building_options(data: &Datasets) -> Vec<SelectOption<BuildingId>> {
    data.buildings
        .iter()
        .map(|b| SelectOption {
            key: b.building_id.clone(),
            label: b.building_name.clone(),
        })
        .collect()
}

/// Floors of `building` in source order. Always derived fresh from the datasets.
pub fn floor_options(data: &Datasets, building: Option<&BuildingId>) -> Vec<SelectOption<FloorId>> {
    let Some(building) = building else {
        return Vec::new();
    };
    data.floors
        .iter()
        .filter(|f| &f.building_id == building)
        .map(|f| SelectOption {
            key: f.floor_id.clone(),
            label: f.floor_name.clone(),
        })
        .collect()
}

pub fn space_type_options() -> Vec<SelectOption<SpaceType>> {
    SpaceType::ALL
        .into_iter()
        .map(|t| SelectOption {
            key: t,
            label: t.as_str().to_string(),
        })
        .collect()
}

/// Match a user choice against a selector's options, by key first and then by
/// display label (case-insensitive).
pub fn find_option<'a, K: AsRef<str>>(options: &'a [SelectOption<K>], choice: &str) -> Option<&'a SelectOption<K>> {
    let choice = choice.trim();
    options
        .iter()
        .find(|o| o.key.as_ref() == choice)
        .or_else(|| options.iter().find(|o| o.label.eq_ignore_ascii_case(choice)))
}

fn unknown<K: AsRef<str>>(level: Level, choice: &str, options: &[SelectOption<K>]) -> UnknownChoice {
    UnknownChoice {
        level,
        choice: choice.trim().to_string(),
        available: options.iter().map(|o| o.key.as_ref().to_string()).collect(),
    }
}

impl Selection {
    /// First building, its first floor, and desks.
    pub fn initial(data: &Datasets) -> Selection {
        let building_id = data.buildings.first().map(|b| b.building_id.clone());
        let floor_id = first_floor(data, building_id.as_ref());
        Selection {
            building_id,
            floor_id,
            space_type: SpaceType::default(),
        }
    }

    /// Switch building. The floor is reset to the first floor of the new building.
    pub fn with_building(&self, data: &Datasets, building_id: BuildingId) -> Selection {
        let floor_id = first_floor(data, Some(&building_id));
        Selection {
            building_id: Some(building_id),
            floor_id,
            space_type: self.space_type,
        }
    }

    pub fn with_floor(&self, floor_id: FloorId) -> Selection {
        Selection {
            floor_id: Some(floor_id),
            ..self.clone()
        }
    }

    pub fn with_space_type(&self, space_type: SpaceType) -> Selection {
        Selection {
            space_type,
            ..self.clone()
        }
    }

    pub fn choose_building(&self, data: &Datasets, choice: &str) -> Result<Selection, UnknownChoice> {
        let options = building_options(data);
        match find_option(&options, choice) {
            Some(o) => Ok(self.with_building(data, o.key.clone())),
            None => Err(unknown(Level::Building, choice, &options)),
        }
    }

    pub fn choose_floor(&self, data: &Datasets, choice: &str) -> Result<Selection, UnknownChoice> {
        let options = floor_options(data, self.building_id.as_ref());
        match find_option(&options, choice) {
            Some(o) => Ok(self.with_floor(o.key.clone())),
            None => Err(unknown(Level::Floor, choice, &options)),
        }
    }

    pub fn choose_space_type(&self, choice: &str) -> Result<Selection, UnknownChoice> {
        let options = space_type_options();
        match find_option(&options, choice) {
            Some(o) => Ok(self.with_space_type(o.key)),
            None => Err(unknown(Level::SpaceType, choice, &options)),
        }
    }
}

fn first_floor(data: &Datasets, building: Option<&BuildingId>) -> Option<FloorId> {
    let building = building?;
    data.floors
        .iter()
        .find(|f| &f.building_id == building)
        .map(|f| f.floor_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn fixtures() -> Datasets {
        Datasets::load_all(Path::new("tests/data")).expect("fixtures load")
    }

    #[test]
    fn initial_selection_is_first_building_first_floor_desk() {
        let data = fixtures();
        let sel = Selection::initial(&data);
        assert_eq!(sel.building_id, Some(BuildingId("B1".into())));
        assert_eq!(sel.floor_id, Some(FloorId("F1".into())));
        assert_eq!(sel.space_type, SpaceType::Desk);
    }

    #[test]
    fn initial_selection_on_empty_data_selects_nothing() {
        let sel = Selection::initial(&Datasets::default());
        assert_eq!(sel.building_id, None);
        assert_eq!(sel.floor_id, None);
    }

    #[test]
    fn changing_building_resets_floor() {
        let data = fixtures();
        let sel = Selection::initial(&data).with_floor(FloorId("F2".into()));
        let next = sel.choose_building(&data, "Abercrombie").unwrap();
        assert_eq!(next.building_id, Some(BuildingId("B2".into())));
        assert_eq!(next.floor_id, Some(FloorId("F3".into())));
        // the old value is untouched
        assert_eq!(sel.floor_id, Some(FloorId("F2".into())));
    }

    #[test]
    fn floor_options_follow_building() {
        let data = fixtures();
        let keys = |b: &str| {
            floor_options(&data, Some(&BuildingId(b.into())))
                .into_iter()
                .map(|o| o.key.0)
                .collect::<Vec<_>>()
        };
        assert_eq!(keys("B1"), vec!["F1", "F2"]);
        assert_eq!(keys("B2"), vec!["F3"]);
        assert!(floor_options(&data, None).is_empty());
    }

    #[test]
    fn choices_match_key_or_label() {
        let data = fixtures();
        let sel = Selection::initial(&data);
        assert_eq!(sel.choose_floor(&data, "F2").unwrap().floor_id, Some(FloorId("F2".into())));
        assert_eq!(sel.choose_floor(&data, "level 2").unwrap().floor_id, Some(FloorId("F2".into())));
        assert_eq!(sel.choose_space_type("pc").unwrap().space_type, SpaceType::Pc);
    }

    #[test]
    fn unknown_choices_are_rejected() {
        let data = fixtures();
        let sel = Selection::initial(&data);
        // F3 exists, but not in B1
        let err = sel.choose_floor(&data, "F3").unwrap_err();
        assert_eq!(err.level, Level::Floor);
        assert_eq!(err.available, vec!["F1", "F2"]);
        assert_eq!(err.to_string(), "unknown floor `F3` (expected one of: F1, F2)");
        assert!(sel.choose_space_type("sofa").is_err());
    }

    #[test]
    fn space_type_options_are_fixed() {
        let labels: Vec<_> = space_type_options().into_iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["desk", "room", "pc"]);
    }
}
