use serde::{Deserialize, Serialize, Serializer};

use crate::domain::{
    coordinate, round_coordinate, truncate_chars, LocationId, TourId, COORDINATE_DECIMAL_PLACES,
    MAX_ADDRESS_CHARS, MAX_LOCATION_NAME_CHARS, MAX_TOUR_NAME_CHARS,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTourRequest {
    pub name: String,
}

impl CreateTourRequest {
    pub fn new(name: &str) -> Self {
        Self {
            name: truncate_chars(name, MAX_TOUR_NAME_CHARS),
        }
    }
}

/// Body of the create-location call. Coordinates go out as fixed-precision
/// decimal strings so they fit the backend's decimal columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    #[serde(serialize_with = "decimal_string", deserialize_with = "coordinate")]
    pub latitude: f64,
    #[serde(serialize_with = "decimal_string", deserialize_with = "coordinate")]
    pub longitude: f64,
}

impl From<&SearchResult> for NewLocation {
    fn from(result: &SearchResult) -> Self {
        Self {
            name: truncate_chars(&result.name, MAX_LOCATION_NAME_CHARS),
            address: truncate_chars(&result.address, MAX_ADDRESS_CHARS),
            latitude: round_coordinate(result.latitude),
            longitude: round_coordinate(result.longitude),
        }
    }
}

fn decimal_string<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!(
        "{:.*}",
        COORDINATE_DECIMAL_PLACES,
        round_coordinate(*value)
    ))
}

/// Only the id of a freshly created location matters to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CreatedLocation {
    pub id: LocationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourMembershipRequest {
    pub tour_id: TourId,
    pub location_id: LocationId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<SearchResult>,
}

/// One geocoder candidate. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "display_name", default)]
    pub address: String,
    #[serde(rename = "lat", deserialize_with = "coordinate")]
    pub latitude: f64,
    #[serde(rename = "lon", deserialize_with = "coordinate")]
    pub longitude: f64,
}

impl SearchResult {
    pub fn key(&self) -> CandidateKey {
        CandidateKey::of(self)
    }
}

/// Stable identity of a search candidate: name plus coordinates at stored
/// precision. Survives re-ordering of the result list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateKey {
    pub name: String,
    pub lat_micro: i64,
    pub lon_micro: i64,
}

impl CandidateKey {
    pub fn of(result: &SearchResult) -> Self {
        Self {
            name: result.name.clone(),
            lat_micro: to_micro(result.latitude),
            lon_micro: to_micro(result.longitude),
        }
    }

    pub fn matches(&self, result: &SearchResult) -> bool {
        *self == Self::of(result)
    }
}

// Decoded coordinates are always finite; `as` saturates anything else.
fn to_micro(value: f64) -> i64 {
    (value * 1_000_000.0).round() as i64
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
