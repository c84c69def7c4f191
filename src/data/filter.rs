use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use super::model::{CrimeCounts, Feature, Month, PROP_CRIME_TYPE, PROP_MONTH};

/// Selector value meaning "every crime type".
pub const ALL_TYPES: &str = "all";

/// Sentinel compared against in the pass-everything type filter. A record
/// whose type is literally this value is hidden under `All`, in the chart too.
const TYPE_PLACEHOLDER: &str = "placeholder";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown crime type selection {0:?}")]
    UnknownCrimeType(String),
    #[error("month {0} is outside 1..=12")]
    MonthOutOfRange(u8),
}

// ---------------------------------------------------------------------------
// Crime-type criterion
// ---------------------------------------------------------------------------

/// One entry of the crime-type selector: the UI value and the dataset label it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrimeTypeOption {
    pub value: String,
    pub label: String,
}

impl CrimeTypeOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// The selector entries offered when configuration does not override them.
pub fn default_crime_types() -> Vec<CrimeTypeOption> {
    vec![
        CrimeTypeOption::new("bicycle_theft", "Bicycle theft"),
        CrimeTypeOption::new("drugs", "Drugs"),
        CrimeTypeOption::new("robbery", "Robbery"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrimeTypeCriterion {
    All,
    /// Exact match against the `Crime type` property.
    Only(String),
}

impl CrimeTypeCriterion {
    /// Resolve a selector value (or an exact dataset label) against the catalogue.
    pub fn parse(selection: &str, catalog: &[CrimeTypeOption]) -> Result<Self, FilterError> {
        if selection == ALL_TYPES {
            return Ok(CrimeTypeCriterion::All);
        }
        catalog
            .iter()
            .find(|opt| opt.value == selection || opt.label == selection)
            .map(|opt| CrimeTypeCriterion::Only(opt.label.clone()))
            .ok_or_else(|| FilterError::UnknownCrimeType(selection.to_string()))
    }

    /// Agrees with the type half of [`FilterState::expression`].
    pub fn matches(&self, crime_type: &str) -> bool {
        match self {
            CrimeTypeCriterion::All => crime_type != TYPE_PLACEHOLDER,
            CrimeTypeCriterion::Only(label) => label == crime_type,
        }
    }

    /// The selector value this criterion corresponds to, for highlighting the active control.
    pub fn selector_value<'a>(&'a self, catalog: &'a [CrimeTypeOption]) -> &'a str {
        match self {
            CrimeTypeCriterion::All => ALL_TYPES,
            CrimeTypeCriterion::Only(label) => catalog
                .iter()
                .find(|opt| &opt.label == label)
                .map(|opt| opt.value.as_str())
                .unwrap_or(label.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter state: immutable, replaced through reducer functions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    year: u16,
    month: Month,
    crime_type: CrimeTypeCriterion,
}

impl FilterState {
    /// Start with every crime type for `month` of `year`.
    pub fn new(year: u16, month: Month) -> Self {
        Self {
            year,
            month,
            crime_type: CrimeTypeCriterion::All,
        }
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn crime_type(&self) -> &CrimeTypeCriterion {
        &self.crime_type
    }

    pub fn month_key(&self) -> String {
        self.month.key(self.year)
    }

    /// A copy of this state with a different month.
    pub fn with_month(&self, month: u8) -> Result<Self, FilterError> {
        Ok(Self {
            month: Month::try_from(month)?,
            ..self.clone()
        })
    }

    /// A copy of this state with a different crime-type criterion.
    pub fn with_crime_type(
        &self,
        selection: &str,
        catalog: &[CrimeTypeOption],
    ) -> Result<Self, FilterError> {
        Ok(Self {
            crime_type: CrimeTypeCriterion::parse(selection, catalog)?,
            ..self.clone()
        })
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        feature.month == self.month_key() && self.crime_type.matches(&feature.crime_type)
    }

    /// The declarative layer filter equivalent to [`FilterState::matches`].
    pub fn expression(&self) -> FilterExpr {
        let type_filter = match &self.crime_type {
            CrimeTypeCriterion::All => FilterExpr::ne(PROP_CRIME_TYPE, TYPE_PLACEHOLDER),
            CrimeTypeCriterion::Only(label) => FilterExpr::eq(PROP_CRIME_TYPE, label),
        };
        FilterExpr::All(vec![FilterExpr::eq(PROP_MONTH, &self.month_key()), type_filter])
    }
}

// ---------------------------------------------------------------------------
// Layer filter expression
// ---------------------------------------------------------------------------

/// A small expression language over feature properties, serialisable in
/// the `["all", ["==", ["get", prop], value], ...]` layer-filter form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    All(Vec<FilterExpr>),
    Eq { property: String, value: String },
    Ne { property: String, value: String },
}

impl FilterExpr {
    pub fn eq(property: &str, value: &str) -> Self {
        FilterExpr::Eq {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn ne(property: &str, value: &str) -> Self {
        FilterExpr::Ne {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    /// A missing property never equals anything.
    pub fn evaluate(&self, feature: &Feature) -> bool {
        match self {
            FilterExpr::All(parts) => parts.iter().all(|p| p.evaluate(feature)),
            FilterExpr::Eq { property, value } => feature.property(property) == Some(value.as_str()),
            FilterExpr::Ne { property, value } => feature.property(property) != Some(value.as_str()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FilterExpr::All(parts) => {
                let mut items = vec![json!("all")];
                items.extend(parts.iter().map(FilterExpr::to_json));
                JsonValue::Array(items)
            }
            FilterExpr::Eq { property, value } => json!(["==", ["get", property], value]),
            FilterExpr::Ne { property, value } => json!(["!=", ["get", property], value]),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Count features passing `filter`, keyed by crime type in first-occurrence order.
pub fn aggregate(features: &[Feature], filter: &FilterState) -> CrimeCounts {
    let key = filter.month_key();
    let mut counts = CrimeCounts::default();
    for f in features
        .iter()
        .filter(|f| f.month == key && filter.crime_type.matches(&f.crime_type))
    {
        counts.increment(&f.crime_type);
    }
    counts
}

/// Indices of features accepted by a layer filter expression.
pub fn visible_indices(features: &[Feature], expr: &FilterExpr) -> Vec<usize> {
    features
        .iter()
        .enumerate()
        .filter(|(_, f)| expr.evaluate(f))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(crime_type: &str, month: &str) -> Feature {
        Feature {
            id: None,
            lon: -0.09,
            lat: 51.51,
            crime_type: crime_type.to_string(),
            month: month.to_string(),
            location: "On or near Cheapside".to_string(),
            outcome: None,
        }
    }

    fn sample() -> Vec<Feature> {
        vec![
            feature("Drugs", "2024-03"),
            feature("Robbery", "2024-03"),
            feature("Drugs", "2024-04"),
        ]
    }

    fn state(month: u8) -> FilterState {
        FilterState::new(2024, Month::try_from(month).unwrap())
    }

    #[test]
    fn all_types_for_month() {
        let counts = aggregate(&sample(), &state(3));
        assert_eq!(counts.iter().collect::<Vec<_>>(), vec![("Drugs", 1), ("Robbery", 1)]);
    }

    #[test]
    fn single_type_for_month() {
        let filter = state(3)
            .with_crime_type("drugs", &default_crime_types())
            .unwrap();
        let counts = aggregate(&sample(), &filter);
        assert_eq!(counts.iter().collect::<Vec<_>>(), vec![("Drugs", 1)]);
    }

    #[test]
    fn month_without_matches_is_empty() {
        assert!(aggregate(&sample(), &state(5)).is_empty());
    }

    #[test]
    fn aggregation_is_deterministic() {
        let features = sample();
        let filter = state(3);
        assert_eq!(aggregate(&features, &filter), aggregate(&features, &filter));
    }

    #[test]
    fn total_equals_matching_features() {
        let mut features = sample();
        features.push(feature("Bicycle theft", "2024-03"));
        features.push(feature("Drugs", "2024-03"));
        let catalog = default_crime_types();

        for month in 1..=12 {
            let all = state(month);
            let month_matches = features.iter().filter(|f| f.month == all.month_key()).count();
            assert_eq!(aggregate(&features, &all).total(), month_matches);

            for opt in &catalog {
                let one = all.with_crime_type(&opt.value, &catalog).unwrap();
                let both = features.iter().filter(|f| one.matches(f)).count();
                assert_eq!(aggregate(&features, &one).total(), both);
            }
        }
    }

    #[test]
    fn unknown_crime_type_is_rejected() {
        let err = state(3)
            .with_crime_type("arson", &default_crime_types())
            .unwrap_err();
        assert_eq!(err, FilterError::UnknownCrimeType("arson".to_string()));
    }

    #[test]
    fn exact_label_is_accepted() {
        let filter = state(3)
            .with_crime_type("Bicycle theft", &default_crime_types())
            .unwrap();
        assert_eq!(
            filter.crime_type(),
            &CrimeTypeCriterion::Only("Bicycle theft".to_string())
        );
        assert_eq!(filter.crime_type().selector_value(&default_crime_types()), "bicycle_theft");
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        assert_eq!(state(3).with_month(13), Err(FilterError::MonthOutOfRange(13)));
        assert_eq!(state(3).with_month(7).map(|s| s.month_key()), Ok("2024-07".to_string()));
    }

    #[test]
    fn expression_serialises_as_layer_filter() {
        let filter = state(3)
            .with_crime_type("robbery", &default_crime_types())
            .unwrap();
        assert_eq!(
            filter.expression().to_json(),
            json!([
                "all",
                ["==", ["get", "Month"], "2024-03"],
                ["==", ["get", "Crime type"], "Robbery"]
            ])
        );
        assert_eq!(
            state(1).expression().to_json(),
            json!([
                "all",
                ["==", ["get", "Month"], "2024-01"],
                ["!=", ["get", "Crime type"], "placeholder"]
            ])
        );
    }

    #[test]
    fn expression_agrees_with_predicate() {
        let features = sample();
        let catalog = default_crime_types();
        for month in [3, 4, 5] {
            for selection in ["all", "drugs", "robbery"] {
                let filter = state(month).with_crime_type(selection, &catalog).unwrap();
                let expected: Vec<usize> = features
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| filter.matches(f))
                    .map(|(i, _)| i)
                    .collect();
                assert_eq!(visible_indices(&features, &filter.expression()), expected);
            }
        }
    }

    #[test]
    fn chart_and_map_agree_on_sentinel_type() {
        let mut features = sample();
        features.push(feature("placeholder", "2024-03"));
        let filter = state(3);

        assert_eq!(visible_indices(&features, &filter.expression()), vec![0, 1]);
        let counts = aggregate(&features, &filter);
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.labels(), vec!["Drugs", "Robbery"]);
    }

    #[test]
    fn missing_property_never_equals() {
        let f = feature("Drugs", "2024-03");
        assert!(!FilterExpr::eq("Last outcome category", "Under investigation").evaluate(&f));
        assert!(FilterExpr::ne("Last outcome category", "Under investigation").evaluate(&f));
    }
}
