use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};

/// Longest tour name the backend stores.
pub const MAX_TOUR_NAME_CHARS: usize = 100;
pub const MAX_LOCATION_NAME_CHARS: usize = 100;
pub const MAX_ADDRESS_CHARS: usize = 250;
/// Coordinates are stored as `Decimal(9, 6)`.
pub const COORDINATE_DECIMAL_PLACES: usize = 6;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(TourId);
id_newtype!(LocationId);

impl TourId {
    /// Ids below 1 never name a stored tour; selecting one clears the selection.
    pub fn is_selectable(self) -> bool {
        self.0 >= 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourSummary {
    pub id: TourId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(deserialize_with = "coordinate")]
    pub latitude: f64,
    #[serde(deserialize_with = "coordinate")]
    pub longitude: f64,
}

impl Location {
    pub fn lat_lon(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub id: TourId,
    pub name: String,
    #[serde(default)]
    pub locations: Vec<Location>,
}

impl Tour {
    pub fn summary(&self) -> TourSummary {
        TourSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }

    pub fn contains_location(&self, location_id: LocationId) -> bool {
        self.locations.iter().any(|loc| loc.id == location_id)
    }
}

/// Cuts `value` to at most `max_chars` characters without splitting a char.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

pub fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMAL_PLACES as i32);
    (value * scale).round() / scale
}

/// Accepts a coordinate encoded either as a JSON number or as a decimal string.
pub fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(value) => value,
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid coordinate {text:?}: {e}")))?,
    };
    if !value.is_finite() {
        return Err(de::Error::custom(format!(
            "invalid coordinate {value}: not a finite number"
        )));
    }
    Ok(value)
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
