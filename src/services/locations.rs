// src/services/locations.rs

//! Synthetic records for communities with several physical locations.

use crate::models::{CommunityRecord, Location, State};

/// Derive one record per entry of `location.additionalLocations`.
///
/// Ids are `<id><index>` in document order. Records from failed fetches have
/// no synthetic entries.
pub fn expand(id: &str, parent: &CommunityRecord) -> Vec<(String, CommunityRecord)> {
    if !parent.is_fresh() {
        return Vec::new();
    }

    parent
        .location
        .as_ref()
        .and_then(|location| location.additional_locations.as_deref())
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(index, location)| (format!("{id}{index}"), at_location(parent, location)))
        .collect()
}

/// Copy of `parent` placed at `location`, without per-location detail.
pub fn at_location(parent: &CommunityRecord, location: &Location) -> CommunityRecord {
    let name = match (&parent.name, &location.city) {
        (Some(name), Some(city)) => Some(format!("{name} ({city})")),
        (name, _) => name.clone(),
    };

    CommunityRecord {
        name,
        location: Some(location.clone()),
        state: parent.state.as_ref().map(|state| State {
            nodes: None,
            ..state.clone()
        }),
        feeds: None,
        node_maps: None,
        services: None,
        timeline: None,
        ..parent.clone()
    }
}
