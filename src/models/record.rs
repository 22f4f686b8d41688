//! Community record data structures.
//!
//! A [`CommunityRecord`] is one entry of the summary cache. Fields the
//! collector works with are typed; everything else an endpoint publishes is
//! kept in `extra` and written back untouched. A typed field whose value has
//! an unexpected shape is kept in `extra` as well, so no published document
//! and no cached record is ever rejected over a single field.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::CommunityFetchError;
use crate::utils::time::{self, Timestamp};

/// Keys written by the collector itself, never taken from a document.
const BOOKKEEPING: [&str; 3] = ["mtime", "etime", "error"];

/// One community as cached in the summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Channel name (`email`, `irc`, `twitter`, ...) to raw value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<BTreeMap<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_details: Option<TechDetails>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feeds: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_maps: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Value>,

    /// Time of the last successful fetch
    #[serde(
        serialize_with = "time::stamp::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub mtime: Option<Timestamp>,

    /// Time of the last failed fetch
    #[serde(
        serialize_with = "time::stamp::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub etime: Option<Timestamp>,

    /// `"<kind> <message>"` of the last failed fetch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommunityRecord {
    /// Record for a freshly fetched document. Bookkeeping keys the document
    /// may carry are discarded.
    pub fn from_document(mut document: Map<String, Value>) -> Self {
        for key in BOOKKEEPING {
            document.remove(key);
        }
        Self::from(document)
    }

    /// Minimal record for a community that has never been fetched.
    pub fn stub(id: &str) -> Self {
        Self {
            name: Some(id.to_string()),
            location: Some(Location {
                city: Some(id.to_string()),
                ..Location::default()
            }),
            state: Some(State::default()),
            ..Self::default()
        }
    }

    /// Record for a failed fetch, based on the previous record if there is one.
    pub fn stale(
        id: &str,
        previous: Option<CommunityRecord>,
        at: Timestamp,
        error: &CommunityFetchError,
    ) -> Self {
        let mut record = previous.unwrap_or_else(|| Self::stub(id));
        record.mark_failed(at, error.describe());
        record
    }

    /// Stamp a successful fetch, clearing any earlier failure.
    pub fn mark_fetched(&mut self, at: Timestamp) {
        self.mtime = Some(at);
        self.etime = None;
        self.error = None;
    }

    /// Stamp a failed fetch, clearing the success timestamp.
    pub fn mark_failed(&mut self, at: Timestamp, error: String) {
        self.mtime = None;
        self.etime = Some(at);
        self.error = Some(error);
    }

    /// Whether the last fetch succeeded.
    pub fn is_fresh(&self) -> bool {
        self.mtime.is_some() && self.etime.is_none() && self.error.is_none()
    }

    /// Whether the last fetch failed.
    pub fn is_stale(&self) -> bool {
        self.mtime.is_none() && self.etime.is_some() && self.error.is_some()
    }

    /// Copy `geoCode` coordinates to the top level of every location.
    pub fn normalize_locations(&mut self) {
        if let Some(location) = self.location.as_mut() {
            location.normalize();
        }
    }

    /// City of the main location, if any.
    pub fn city(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.city.as_deref())
    }

    /// Node count reported in `state.nodes`, if it reads as a count.
    pub fn nodes(&self) -> Option<u64> {
        let nodes = self.state.as_ref()?.nodes.as_ref()?;
        match nodes {
            Value::Number(n) if n.is_u64() => n.as_u64(),
            other => number(other).filter(|n| *n >= 0.0).map(|n| n as u64),
        }
    }
}

impl From<Map<String, Value>> for CommunityRecord {
    fn from(object: Map<String, Value>) -> Self {
        let mut fields = Fields(object);
        Self {
            name: fields.take("name"),
            url: fields.take("url"),
            location: fields.take("location"),
            contact: fields.take("contact"),
            tech_details: fields.take("techDetails"),
            state: fields.take("state"),
            feeds: fields.take("feeds"),
            events: fields.take("events"),
            node_maps: fields.take("nodeMaps"),
            services: fields.take("services"),
            timeline: fields.take("timeline"),
            mtime: fields.stamp("mtime"),
            etime: fields.stamp("etime"),
            error: fields.text("error"),
            extra: fields.into_rest(),
        }
    }
}

/// Physical location of a community.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Free-form; endpoints publish both strings and structured addresses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Value>,

    /// As published, a number or a numeric string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_code: Option<GeoCode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_locations: Option<Vec<Location>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    fn normalize(&mut self) {
        if let Some(geo) = &self.geo_code {
            if geo.lat.is_some() {
                self.lat = geo.lat.clone();
            }
            if geo.lon.is_some() {
                self.lon = geo.lon.clone();
            }
        }
        for additional in self.additional_locations.iter_mut().flatten() {
            additional.normalize();
        }
    }

    /// `[lon, lat]` when both coordinates read as numbers.
    pub fn coordinates(&self) -> Option<[f64; 2]> {
        let lon = number(self.lon.as_ref()?)?;
        let lat = number(self.lat.as_ref()?)?;
        Some([lon, lat])
    }
}

impl From<Map<String, Value>> for Location {
    fn from(object: Map<String, Value>) -> Self {
        let mut fields = Fields(object);
        Self {
            city: fields.take("city"),
            country: fields.take("country"),
            address: fields.take("address"),
            lat: fields.take("lat"),
            lon: fields.take("lon"),
            geo_code: fields.take("geoCode"),
            additional_locations: fields.take("additionalLocations"),
            extra: fields.into_rest(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoCode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for GeoCode {
    fn from(object: Map<String, Value>) -> Self {
        let mut fields = Fields(object);
        Self {
            lat: fields.take("lat"),
            lon: fields.take("lon"),
            extra: fields.into_rest(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TechDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<Firmware>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<Routing>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TechDetails {
    pub fn firmware_name(&self) -> Option<&str> {
        self.firmware.as_ref().and_then(|f| f.name.as_deref())
    }
}

impl From<Map<String, Value>> for TechDetails {
    fn from(object: Map<String, Value>) -> Self {
        let mut fields = Fields(object);
        Self {
            firmware: fields.take("firmware"),
            routing: fields.take("routing"),
            extra: fields.into_rest(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Firmware {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for Firmware {
    fn from(object: Map<String, Value>) -> Self {
        let mut fields = Fields(object);
        Self {
            name: fields.take("name"),
            extra: fields.into_rest(),
        }
    }
}

/// Routing protocol(s) a community runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Routing {
    One(String),
    Many(Vec<String>),
    Other(Value),
}

impl Routing {
    /// Protocols joined with `", "`.
    pub fn display(&self) -> String {
        match self {
            Routing::One(s) => s.clone(),
            Routing::Many(list) => list.join(", "),
            Routing::Other(value) => value.to_string(),
        }
    }
}

/// Live state published by a community.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct State {
    /// As published, see [`CommunityRecord::nodes`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastchange: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for State {
    fn from(object: Map<String, Value>) -> Self {
        let mut fields = Fields(object);
        Self {
            nodes: fields.take("nodes"),
            lastchange: fields.take("lastchange"),
            logo: fields.take("logo"),
            extra: fields.into_rest(),
        }
    }
}

/// Any JSON object deserializes; fields go through `From<Map<String, Value>>`.
macro_rules! deserialize_from_object {
    ($($ty:ty),+ $(,)?) => {$(
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
                Map::<String, Value>::deserialize(de).map(Self::from)
            }
        }
    )+};
}

deserialize_from_object!(CommunityRecord, Location, GeoCode, TechDetails, Firmware, State);

/// Remaining fields of a JSON object being split into typed fields.
struct Fields(Map<String, Value>);

impl Fields {
    /// Move `key` into a typed field; a value that does not fit stays behind.
    fn take<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.0.remove(key)?;
        match T::deserialize(&value) {
            Ok(typed) => Some(typed),
            Err(_) => {
                self.0.insert(key.to_string(), value);
                None
            }
        }
    }

    /// Bookkeeping timestamp; an unreadable one is dropped.
    fn stamp(&mut self, key: &str) -> Option<Timestamp> {
        self.0.remove(key)?.as_str().and_then(time::parse)
    }

    /// Bookkeeping text; anything but a string is dropped.
    fn text(&mut self, key: &str) -> Option<String> {
        match self.0.remove(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn into_rest(self) -> Map<String, Value> {
        self.0
    }
}

/// A JSON number or numeric string as a finite `f64`.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite())
}
