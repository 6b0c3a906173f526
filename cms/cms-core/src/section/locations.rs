//! Store locations
//!
//! The map itself is a third-party SDK; this section only provides the
//! records and the center/marker data the map is bootstrapped with.

use serde::{Deserialize, Serialize};

use super::{check_entry_count, check_text, ListSection, SchemaError, SectionSchema};
use crate::constants::MAP_CENTER_DEFAULT;

/// A partner store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreLocation {
    /// Store name
    pub name: String,
    /// Street address
    pub address: String,
    /// Latitude in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl StoreLocation {
    /// Coordinates when both are present.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// Locations document (`locations`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationsContent {
    /// Section heading
    pub title: String,
    /// Section copy
    pub description: String,
    /// Stores in display order
    pub locations: Vec<StoreLocation>,
}

impl Default for LocationsContent {
    fn default() -> Self {
        Self {
            title: "Find a Store".to_string(),
            description: "Visit one of our partner stores to see Tiffany Sparkles in person"
                .to_string(),
            locations: Vec::new(),
        }
    }
}

/// Everything the map widget needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    /// Initial center `(lat, lng)`
    pub center: (f64, f64),
    /// Stores that can be placed on the map
    pub markers: Vec<StoreLocation>,
}

impl LocationsContent {
    /// Map bootstrap: centered on the first located store, Nairobi otherwise.
    #[must_use]
    pub fn map_view(&self) -> MapView {
        let markers: Vec<StoreLocation> = self
            .locations
            .iter()
            .filter(|l| l.coordinates().is_some())
            .cloned()
            .collect();
        let center = markers
            .first()
            .and_then(StoreLocation::coordinates)
            .unwrap_or(MAP_CENTER_DEFAULT);
        MapView { center, markers }
    }
}

impl SectionSchema for LocationsContent {
    const SECTION: &'static str = "locations";
    const MEDIA_PREFIX: &'static str = "location";

    fn validate(&self) -> Result<(), SchemaError> {
        check_text("title", &self.title)?;
        check_text("description", &self.description)?;
        check_entry_count("locations", self.locations.len())?;
        for (i, l) in self.locations.iter().enumerate() {
            check_text(&format!("locations/{i}/address"), &l.address)?;
            if let Some(lat) = l.latitude {
                if !(-90.0..=90.0).contains(&lat) {
                    return Err(SchemaError::invalid(format!("locations/{i}/latitude"), "out of range"));
                }
            }
            if let Some(lng) = l.longitude {
                if !(-180.0..=180.0).contains(&lng) {
                    return Err(SchemaError::invalid(format!("locations/{i}/longitude"), "out of range"));
                }
            }
        }
        Ok(())
    }

    fn media_urls(&self) -> Vec<&str> {
        Vec::new()
    }
}

impl ListSection for LocationsContent {
    type Entry = StoreLocation;

    fn entries(&self) -> &[StoreLocation] {
        &self.locations
    }

    fn entries_mut(&mut self) -> &mut Vec<StoreLocation> {
        &mut self.locations
    }

    fn blank_entry() -> StoreLocation {
        StoreLocation {
            name: String::new(),
            address: String::new(),
            latitude: None,
            longitude: None,
            phone: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str, coords: Option<(f64, f64)>) -> StoreLocation {
        StoreLocation {
            name: name.to_string(),
            address: "Oginga Odinga St".to_string(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            phone: None,
        }
    }

    #[test]
    fn test_map_defaults_to_nairobi() {
        let view = LocationsContent::default().map_view();
        assert_eq!(view.center, MAP_CENTER_DEFAULT);
        assert!(view.markers.is_empty());
    }

    #[test]
    fn test_map_centers_on_first_located_store() {
        let content = LocationsContent {
            locations: vec![store("No coords", None), store("Kisumu", Some((-0.1, 34.75)))],
            ..LocationsContent::default()
        };
        let view = content.map_view();
        assert_eq!(view.center, (-0.1, 34.75));
        assert_eq!(view.markers.len(), 1);
    }

    #[test]
    fn test_latitude_range_checked() {
        let content = LocationsContent {
            locations: vec![store("Bad", Some((123.0, 0.0)))],
            ..LocationsContent::default()
        };
        assert!(content.validate().is_err());
    }
}
