use std::fmt;

use super::filter::FilterError;

// ---------------------------------------------------------------------------
// Property names used by the dataset (police.uk column headers)
// ---------------------------------------------------------------------------

pub const PROP_CRIME_TYPE: &str = "Crime type";
pub const PROP_MONTH: &str = "Month";
pub const PROP_LOCATION: &str = "Location";
pub const PROP_OUTCOME: &str = "Last outcome category";

// ---------------------------------------------------------------------------
// Feature – one geocoded crime record
// ---------------------------------------------------------------------------

/// A single crime record. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Upstream identifier, when the source provides one.
    pub id: Option<String>,
    pub lon: f64,
    pub lat: f64,
    /// Value of the `Crime type` property, e.g. `"Bicycle theft"`.
    pub crime_type: String,
    /// `"YYYY-MM"`.
    pub month: String,
    /// Free-text location, e.g. `"On or near Wood Street"`.
    pub location: String,
    pub outcome: Option<String>,
}

impl Feature {
    /// Look up a property by its dataset name, as a layer filter expression would.
    pub fn property(&self, name: &str) -> Option<&str> {
        match name {
            PROP_CRIME_TYPE => Some(self.crime_type.as_str()),
            PROP_MONTH => Some(self.month.as_str()),
            PROP_LOCATION => Some(self.location.as_str()),
            PROP_OUTCOME => self.outcome.as_deref(),
            _ => None,
        }
    }

    /// Squared planar distance in degrees, longitude scaled by `lon_scale`.
    pub fn distance_sq(&self, lon: f64, lat: f64, lon_scale: f64) -> f64 {
        let dx = (self.lon - lon) * lon_scale;
        let dy = self.lat - lat;
        dx * dx + dy * dy
    }
}

/// Shift `lon` by whole turns until it lies within 180° of `reference`.
///
/// Used when placing a popup so it appears next to the copy of the world the
/// user clicked on.
pub fn wrap_longitude_near(mut lon: f64, reference: f64) -> f64 {
    while (reference - lon).abs() > 180.0 {
        lon += if reference > lon { 360.0 } else { -360.0 };
    }
    lon
}

// ---------------------------------------------------------------------------
// FeatureCollection – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Ordered, read-only sequence of features.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Distinct crime-type labels in order of first appearance.
    pub fn crime_types(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for f in &self.features {
            if !seen.iter().any(|t| t == &f.crime_type) {
                seen.push(f.crime_type.clone());
            }
        }
        seen
    }

    /// Index of the visible feature nearest to `(lon, lat)` within `max_dist` degrees.
    pub fn nearest(
        &self,
        candidates: &[usize],
        lon: f64,
        lat: f64,
        lon_scale: f64,
        max_dist: f64,
    ) -> Option<usize> {
        let limit = max_dist * max_dist;
        candidates
            .iter()
            .filter_map(|&i| {
                let d = self.features.get(i)?.distance_sq(lon, lat, lon_scale);
                (d <= limit).then_some((i, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

// ---------------------------------------------------------------------------
// Month – validated 1..=12
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(u8);

impl Month {
    pub const JANUARY: Month = Month(1);

    pub fn get(self) -> u8 {
        self.0
    }

    /// The `"YYYY-MM"` key stored in the dataset's `Month` property.
    pub fn key(self, year: u16) -> String {
        format!("{year}-{:02}", self.0)
    }
}

impl TryFrom<u8> for Month {
    type Error = FilterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=12).contains(&value) {
            Ok(Month(value))
        } else {
            Err(FilterError::MonthOutOfRange(value))
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CrimeCounts – label → count, insertion ordered
// ---------------------------------------------------------------------------

/// Occurrence count per crime-type label, ordered by first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrimeCounts {
    entries: Vec<(String, usize)>,
}

impl CrimeCounts {
    /// Increment `label`, inserting it at the end with zero when unseen.
    pub fn increment(&mut self, label: &str) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, n)) => *n += 1,
            None => self.entries.push((label.to_string(), 1)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(l, n)| (l.as_str(), *n))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(l, _)| l.as_str()).collect()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(lon: f64, lat: f64, crime_type: &str) -> Feature {
        Feature {
            id: None,
            lon,
            lat,
            crime_type: crime_type.to_string(),
            month: "2024-03".to_string(),
            location: "On or near Wood Street".to_string(),
            outcome: None,
        }
    }

    #[test]
    fn month_rejects_out_of_range() {
        assert!(Month::try_from(0).is_err());
        assert!(Month::try_from(13).is_err());
        assert_eq!(Month::try_from(12).map(Month::get), Ok(12));
    }

    #[test]
    fn month_key_is_zero_padded() {
        let m = Month::try_from(3).unwrap();
        assert_eq!(m.key(2024), "2024-03");
        assert_eq!(Month::try_from(11).unwrap().key(2024), "2024-11");
    }

    #[test]
    fn counts_keep_first_occurrence_order() {
        let mut counts = CrimeCounts::default();
        for label in ["Robbery", "Drugs", "Robbery", "Bicycle theft"] {
            counts.increment(label);
        }
        assert_eq!(
            counts.iter().collect::<Vec<_>>(),
            vec![("Robbery", 2), ("Drugs", 1), ("Bicycle theft", 1)]
        );
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn wrap_longitude_lands_near_reference() {
        assert_eq!(wrap_longitude_near(-0.09, 359.0), 359.91);
        assert_eq!(wrap_longitude_near(10.0, -700.0), -710.0);
        assert_eq!(wrap_longitude_near(10.0, 20.0), 10.0);
    }

    #[test]
    fn nearest_respects_candidates_and_radius() {
        let fc = FeatureCollection::new(vec![
            feature(0.0, 0.0, "Drugs"),
            feature(0.001, 0.0, "Robbery"),
            feature(1.0, 1.0, "Drugs"),
        ]);
        assert_eq!(fc.nearest(&[0, 1, 2], 0.0009, 0.0, 1.0, 0.01), Some(1));
        assert_eq!(fc.nearest(&[0, 2], 0.0009, 0.0, 1.0, 0.01), Some(0));
        assert_eq!(fc.nearest(&[2], 0.0, 0.0, 1.0, 0.01), None);
    }

    #[test]
    fn crime_types_in_first_seen_order() {
        let fc = FeatureCollection::new(vec![
            feature(-0.1, 51.5, "Robbery"),
            feature(-0.05, 51.52, "Drugs"),
            feature(-0.08, 51.49, "Robbery"),
        ]);
        assert_eq!(fc.crime_types(), vec!["Robbery", "Drugs"]);
        assert!(FeatureCollection::default().crime_types().is_empty());
    }
}
