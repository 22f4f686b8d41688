//! GeoJSON feed of all communities with known coordinates.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{CommunityRecord, Summary};

#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: Point,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct Point {
    #[serde(rename = "type")]
    kind: &'static str,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
}

/// One `Point` feature per record that has coordinates.
pub fn feature_collection(summary: &Summary) -> FeatureCollection {
    let features = summary
        .iter()
        .filter_map(|(id, record)| {
            let feature = feature(id, record);
            if feature.is_none() {
                log::debug!("{} has no coordinates, left out of the GeoJSON feed", id);
            }
            feature
        })
        .collect();

    FeatureCollection {
        kind: "FeatureCollection",
        features,
    }
}

fn feature(id: &str, record: &CommunityRecord) -> Option<Feature> {
    let location = record.location.as_ref()?;
    let coordinates = location.coordinates()?;

    let mut properties: Map<String, Value> = record
        .contact
        .iter()
        .flatten()
        .map(|(channel, value)| (channel.clone(), value.clone()))
        .collect();

    let mut set = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            properties.insert(key.to_string(), value);
        }
    };
    let text = |s: &Option<String>| s.clone().map(Value::String);

    set("name", text(&record.name));
    set("metacommunity", record.extra.get("metacommunity").cloned());
    set("socialprojects", record.extra.get("socialprojects").cloned());
    set("city", text(&location.city));
    set("country", text(&location.country));
    set("address", location.address.clone());
    set("url", text(&record.url));
    set("metadetails", record.extra.get("metadetails").cloned());
    set("feeds", record.feeds.clone());
    set("events", record.events.clone());
    set("nodes", record.state.as_ref().and_then(|s| s.nodes.clone()));
    set("nodeMaps", record.node_maps.clone());
    if let Some(state) = &record.state {
        set("mtime", state.lastchange.clone());
        set("logo", state.logo.clone());
    }
    set("shortname", Some(Value::String(id.to_string())));

    Some(Feature {
        kind: "Feature",
        geometry: Point {
            kind: "Point",
            coordinates,
        },
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(value: Value) -> Summary {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_feature_properties() {
        let summary = summary(json!({
            "alpha": {
                "name": "Alpha",
                "url": "https://alpha.example",
                "location": {"city": "Alphaville", "country": "DE", "lat": 1.0, "lon": 2.0},
                "contact": {"email": "info@alpha.example", "irc": "#alpha"},
                "state": {"nodes": 7, "lastchange": "2024-04-30T10:00:00Z"},
                "metacommunity": "North",
                "mtime": "2024-05-01 12:00:00"
            }
        }));

        let value = serde_json::to_value(feature_collection(&summary)).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [2.0, 1.0]},
                    "properties": {
                        "email": "info@alpha.example",
                        "irc": "#alpha",
                        "name": "Alpha",
                        "metacommunity": "North",
                        "city": "Alphaville",
                        "country": "DE",
                        "url": "https://alpha.example",
                        "nodes": 7,
                        "mtime": "2024-04-30T10:00:00Z",
                        "shortname": "alpha"
                    }
                }]
            })
        );
    }

    #[test]
    fn test_records_without_coordinates_are_skipped() {
        let summary = summary(json!({
            "alpha": {"name": "alpha", "location": {"city": "alpha"}, "state": {}},
            "beta": {"name": "Beta", "location": {"lat": 5.0, "lon": 6.0}}
        }));

        let collection = feature_collection(&summary);

        assert_eq!(collection.features.len(), 1);
        assert_eq!(collection.features[0].properties["shortname"], json!("beta"));
    }
}
